//! The block predictors.
//!
//! A predictor is a reversible per-block transform whose output (the
//! residual) has a smaller dynamic range than the input, so the packer can
//! spend fewer than eight bits per symbol. Every predictor leaves behind the
//! side data its inverse needs: nothing, a single byte, a table of binned
//! symbols, or a top-symbol byte with an occupancy bitmap.

use num_traits::ToPrimitive;

use crate::{header, utils, SMALL_BLOCK};

/// Most distinct symbols the binning predictor admits in a 64-byte block.
pub(crate) const MAX_SYMS_SMALL: usize = 16;
/// Most distinct symbols the binning predictor admits in a 4K block.
pub(crate) const MAX_SYMS_BIG: usize = 64;

/// The predictor family. Variants are listed in search order; the cost
/// search breaks ties in favour of the earlier variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Predictor {
    /// Subtract the block minimum.
    Min,
    /// Subtract the signed minimum, then sign-fold.
    MinSigned,
    /// Subtract the rounded signed mean, then sign-fold.
    Mean,
    /// Keep the bytes as they are; only the packed width shrinks.
    Identity,
    /// Sign-fold every byte.
    SignFold,
    /// Subtract the median, then sign-fold.
    Median,
    /// Replace each byte with its index in a table of distinct symbols.
    Bin,
    /// Remove the most frequent symbol; keep a bitmap plus the remainder.
    TopSymbol,
}

/// Search order for 64-byte blocks.
pub(crate) const SMALL_PREDICTORS: [Predictor; 8] = [
    Predictor::Min,
    Predictor::MinSigned,
    Predictor::Mean,
    Predictor::Identity,
    Predictor::SignFold,
    Predictor::Median,
    Predictor::Bin,
    Predictor::TopSymbol,
];

/// Search order for 4K blocks; only the two-level predictors run there.
pub(crate) const BIG_PREDICTORS: [Predictor; 2] = [Predictor::Bin, Predictor::TopSymbol];

impl Predictor {
    /// The 3-bit operation code identifying this predictor's inverse on the
    /// wire.
    pub(crate) fn wire_code(self) -> u8 {
        match self {
            Predictor::Identity => header::NO_PROC,
            Predictor::SignFold => header::SIGN_SHIFT_PROC,
            Predictor::MinSigned | Predictor::Mean | Predictor::Median => {
                header::SIGN_SHIFT_ADD_PROC
            }
            Predictor::Min => header::ADD_PROC,
            Predictor::Bin => header::BIN_EXPAND_PROC,
            Predictor::TopSymbol => header::TOP_EXPAND_PROC,
        }
    }
}

/// Scratch buffers a predictor writes into. Sized for the big block so one
/// workspace serves both levels.
pub(crate) struct Workspace {
    pub residual: [u8; crate::BIG_BLOCK],
    pub bitmap: [u8; crate::BIG_BLOCK],
    pub side: [u8; MAX_SYMS_BIG],
}

impl Workspace {
    pub(crate) fn new() -> Workspace {
        Workspace {
            residual: [0; crate::BIG_BLOCK],
            bitmap: [0; crate::BIG_BLOCK],
            side: [0; MAX_SYMS_BIG],
        }
    }
}

/// What a predictor run reports back about the residual it produced.
pub(crate) struct Analysis {
    /// Packed bits per residual symbol.
    pub bitln: u8,
    /// Entries of `side` that are valid (binning only).
    pub num_syms: usize,
    /// Residual symbols that carry data. The block length for everything but
    /// the top-symbol predictor.
    pub num_bytes: usize,
    /// The binning predictor ran out of table space; the residual is the raw
    /// input and the block must not be emitted through this predictor.
    pub aborted: bool,
}

impl Analysis {
    fn packed(bitln: u8, num_bytes: usize) -> Analysis {
        Analysis {
            bitln,
            num_syms: 0,
            num_bytes,
            aborted: false,
        }
    }
}

/// Runs `predictor` over `input`, filling the workspace residual (and side
/// data and bitmap where the predictor has them).
pub(crate) fn run(
    predictor: Predictor,
    input: &[u8],
    min_fixed: u8,
    ws: &mut Workspace,
) -> Analysis {
    match predictor {
        Predictor::Min => min_predict(input, min_fixed, ws),
        Predictor::MinSigned => min_signed_predict(input, min_fixed, ws),
        Predictor::Mean => mean_predict(input, min_fixed, ws),
        Predictor::Identity => identity_predict(input, min_fixed, ws),
        Predictor::SignFold => sign_fold_predict(input, min_fixed, ws),
        Predictor::Median => median_predict(input, min_fixed, ws),
        Predictor::Bin => bin_predict(input, min_fixed, ws),
        Predictor::TopSymbol => top_symbol_predict(input, ws),
    }
}

fn min_predict(input: &[u8], min_fixed: u8, ws: &mut Workspace) -> Analysis {
    let minimum = input.iter().copied().min().unwrap_or(0);
    for (r, &b) in ws.residual.iter_mut().zip(input) {
        *r = b - minimum;
    }
    ws.side[0] = minimum;
    Analysis::packed(
        utils::bit_length(&ws.residual[..input.len()], min_fixed),
        input.len(),
    )
}

fn min_signed_predict(input: &[u8], min_fixed: u8, ws: &mut Workspace) -> Analysis {
    let minimum = input.iter().map(|&b| b as i8).min().unwrap_or(0);
    for (r, &b) in ws.residual.iter_mut().zip(input) {
        *r = utils::sign_fold((b as i8).wrapping_sub(minimum));
    }
    ws.side[0] = minimum as u8;
    Analysis::packed(
        utils::bit_length(&ws.residual[..input.len()], min_fixed),
        input.len(),
    )
}

fn mean_predict(input: &[u8], min_fixed: u8, ws: &mut Workspace) -> Analysis {
    let sum: f64 = input.iter().map(|&b| f64::from(b as i8)).sum();
    // The rounded mean of signed bytes is itself in signed byte range, so
    // the conversion cannot fail.
    let mean = (sum / input.len() as f64).round().to_i8().unwrap_or(0);
    for (r, &b) in ws.residual.iter_mut().zip(input) {
        *r = utils::sign_fold((b as i8).wrapping_sub(mean));
    }
    ws.side[0] = mean as u8;
    Analysis::packed(
        utils::bit_length(&ws.residual[..input.len()], min_fixed),
        input.len(),
    )
}

fn identity_predict(input: &[u8], min_fixed: u8, ws: &mut Workspace) -> Analysis {
    ws.residual[..input.len()].copy_from_slice(input);
    Analysis::packed(utils::bit_length(input, min_fixed), input.len())
}

fn sign_fold_predict(input: &[u8], min_fixed: u8, ws: &mut Workspace) -> Analysis {
    for (r, &b) in ws.residual.iter_mut().zip(input) {
        *r = utils::sign_fold(b as i8);
    }
    Analysis::packed(
        utils::bit_length(&ws.residual[..input.len()], min_fixed),
        input.len(),
    )
}

fn median_predict(input: &[u8], min_fixed: u8, ws: &mut Workspace) -> Analysis {
    // Sort a copy in the residual buffer, then overwrite it with the actual
    // residual. The median is taken over the unsigned ordering and
    // reinterpreted as signed, the same ordering the inverse relies on.
    ws.residual[..input.len()].copy_from_slice(input);
    let median = utils::median_naive(&mut ws.residual[..input.len()]) as i8;
    for (r, &b) in ws.residual.iter_mut().zip(input) {
        *r = utils::sign_fold((b as i8).wrapping_sub(median));
    }
    ws.side[0] = median as u8;
    Analysis::packed(
        utils::bit_length(&ws.residual[..input.len()], min_fixed),
        input.len(),
    )
}

fn bin_predict(input: &[u8], min_fixed: u8, ws: &mut Workspace) -> Analysis {
    let max_syms = if input.len() > SMALL_BLOCK {
        MAX_SYMS_BIG
    } else {
        MAX_SYMS_SMALL
    };

    ws.side[0] = input[0];
    ws.residual[0] = 0;
    let mut num_syms = 1;
    for (i, &b) in input.iter().enumerate().skip(1) {
        match ws.side[..num_syms].iter().position(|&s| s == b) {
            Some(k) => ws.residual[i] = k as u8,
            None if num_syms == max_syms => {
                // Too many distinct symbols for the table. Hand back the raw
                // block so the cost search can discard this predictor.
                ws.residual[..input.len()].copy_from_slice(input);
                return Analysis {
                    bitln: 8,
                    num_syms,
                    num_bytes: input.len(),
                    aborted: true,
                };
            }
            None => {
                ws.side[num_syms] = b;
                ws.residual[i] = num_syms as u8;
                num_syms += 1;
            }
        }
    }

    Analysis {
        bitln: utils::bit_length(&ws.residual[..input.len()], min_fixed),
        num_syms,
        num_bytes: input.len(),
        aborted: false,
    }
}

fn top_symbol_predict(input: &[u8], ws: &mut Workspace) -> Analysis {
    let mut freq = [0usize; 256];
    for &b in input {
        freq[b as usize] += 1;
    }
    let mut top = 0usize;
    let mut top_freq = 0usize;
    for (sym, &count) in freq.iter().enumerate() {
        if count > top_freq {
            top = sym;
            top_freq = count;
        }
    }

    let mut count = 0;
    for (i, &b) in input.iter().enumerate() {
        if b as usize == top {
            ws.bitmap[i] = 0;
        } else {
            ws.bitmap[i] = 1;
            ws.residual[count] = b;
            count += 1;
        }
    }
    ws.side[0] = top as u8;
    // The remainder is moved as raw bytes.
    Analysis {
        bitln: 8,
        num_syms: 0,
        num_bytes: count,
        aborted: false,
    }
}
