//! Per-block predictor selection.
//!
//! For every enabled predictor the search prices the block as header
//! overhead plus packed payload plus side data, in bits, and keeps the
//! cheapest. A dual-length alternative is priced in parallel for 64-byte
//! blocks. Anything that cannot beat the uncompressed baseline goes out raw.

use crate::dual;
use crate::predict::{self, Predictor, Workspace, BIG_PREDICTORS, SMALL_PREDICTORS};
use crate::Config;

/// Outcome of the search for one block: which predictor to re-run at
/// emission time, whether its payload is dual-length encoded, and the total
/// block cost used when 4K and 64-byte segmentations compete.
#[derive(Copy, Clone)]
pub(crate) struct Choice {
    /// `None` means the block is emitted uncompressed.
    pub predictor: Option<Predictor>,
    pub dual: bool,
    pub cost_bits: usize,
    pub blk_size: usize,
}

impl Choice {
    /// The forced-raw choice used for bypass and trailing short blocks.
    pub(crate) fn uncompressed(blk_size: usize, mixed: bool) -> Choice {
        Choice {
            predictor: None,
            dual: false,
            cost_bits: baseline_bits(blk_size, mixed),
            blk_size,
        }
    }
}

/// Cost of emitting the block uncompressed: the raw bytes plus the header
/// prefix (and size field when mixed sizing is on).
fn baseline_bits(blk_size: usize, mixed: bool) -> usize {
    blk_size * 8 + if mixed { 4 } else { 2 }
}

fn enabled(predictor: Predictor, config: &Config) -> bool {
    match predictor {
        Predictor::Bin => config.proc_bin_en,
        Predictor::TopSymbol => config.proc_btmap_en,
        _ => true,
    }
}

/// Fixed header bits a 64-byte block pays before its side data and payload.
fn overhead_small(predictor: Predictor, config: &Config) -> usize {
    let extra = 2 * config.mixed_blk_size as usize + 2 * config.dual_encode_en as usize;
    match predictor {
        // 8-bit header plus the side byte.
        Predictor::Min | Predictor::MinSigned | Predictor::Mean | Predictor::Median => 16 + extra,
        Predictor::Identity | Predictor::SignFold => 8 + extra,
        // The binned symbol table is priced separately per symbol.
        Predictor::Bin => 12 + extra,
        // 8 header + 8 top symbol + 8 count + 64 bitmap.
        Predictor::TopSymbol => 88 + extra,
    }
}

/// Fixed header bits for the 4K predictors.
fn overhead_big(predictor: Predictor, config: &Config) -> usize {
    let extra = 2 * config.mixed_blk_size as usize;
    match predictor {
        Predictor::Bin => 14 + extra,
        // 8 header + 8 top symbol + 14 count + 4096 bitmap.
        Predictor::TopSymbol => 4126 + extra,
        _ => unreachable!(),
    }
}

/// Finds the cheapest encoding for one full 64-byte block.
pub(crate) fn choose_small(
    input: &[u8],
    config: &Config,
    min_fixed: u8,
    ws: &mut Workspace,
) -> Choice {
    let baseline = baseline_bits(input.len(), config.mixed_blk_size);
    let mut best_cost = baseline;
    let mut best: Option<Predictor> = None;
    let mut best_dual_cost = baseline;
    let mut best_dual: Option<Predictor> = None;

    for &predictor in SMALL_PREDICTORS.iter() {
        if !enabled(predictor, config) {
            continue;
        }
        let analysis = predict::run(predictor, input, min_fixed, ws);

        let mut cost = overhead_small(predictor, config)
            + analysis.num_bytes * analysis.bitln as usize;
        if predictor == Predictor::Bin {
            cost += analysis.num_syms * 8;
        }
        if analysis.aborted {
            // Over-full symbol table: this predictor may not be emitted, so
            // pin it to the uncompressed bound where the strict compare
            // cannot pick it.
            cost = baseline;
        }
        if cost < best_cost {
            best_cost = cost;
            best = Some(predictor);
        }

        // The top-symbol residual is shorter than the block, which the dual
        // bitmap cannot describe, so it never gets a dual alternative.
        if config.dual_encode_en && predictor != Predictor::TopSymbol && !analysis.aborted {
            let split = dual::split(&ws.residual[..input.len()], &mut ws.bitmap);
            // Header, payload, block-length bitmap, 10-bit length field.
            let mut dual_cost =
                overhead_small(predictor, config) + split.cost_bits + input.len() + 10;
            if predictor == Predictor::Bin {
                dual_cost += analysis.num_syms * 8;
            }
            if dual_cost < best_dual_cost {
                best_dual_cost = dual_cost;
                best_dual = Some(predictor);
            }
        }
    }

    if best_dual_cost < best_cost {
        Choice {
            predictor: best_dual,
            dual: true,
            cost_bits: best_dual_cost,
            blk_size: input.len(),
        }
    } else {
        Choice {
            predictor: best,
            dual: false,
            cost_bits: best_cost,
            blk_size: input.len(),
        }
    }
}

/// Finds the cheapest encoding for one full 4K block. Only the two-level
/// predictors compete here, and never in dual mode.
pub(crate) fn choose_big(
    input: &[u8],
    config: &Config,
    min_fixed: u8,
    ws: &mut Workspace,
) -> Choice {
    let baseline = baseline_bits(input.len(), config.mixed_blk_size);
    let mut best_cost = baseline;
    let mut best: Option<Predictor> = None;

    for &predictor in BIG_PREDICTORS.iter() {
        if !enabled(predictor, config) {
            continue;
        }
        let analysis = predict::run(predictor, input, min_fixed, ws);
        let mut cost =
            overhead_big(predictor, config) + analysis.num_bytes * analysis.bitln as usize;
        if predictor == Predictor::Bin {
            cost += analysis.num_syms * 8;
        }
        if analysis.aborted {
            cost = baseline;
        }
        if cost < best_cost {
            best_cost = cost;
            best = Some(predictor);
        }
    }

    Choice {
        predictor: best,
        dual: false,
        cost_bits: best_cost,
        blk_size: input.len(),
    }
}
