//! The encoder: block segmentation, predictor choice, and stream emission.

use tracing::{debug, trace, warn};

use crate::cost::{self, Choice};
use crate::dual;
use crate::header;
use crate::io::BitSink;
use crate::predict::{self, Predictor, Workspace, MAX_SYMS_BIG, MAX_SYMS_SMALL};
use crate::{compressed_size_bound, errors, Config, Result, BIG_BLOCK, SMALL_BLOCK};

/// A reusable compressor.
///
/// The encoder owns the scratch buffers the predictors and the cost search
/// work in, so repeated calls do not reallocate. One instance serves one
/// call at a time; for parallel compression create an encoder per thread.
pub struct Encoder {
    ws: Workspace,
    choices: Vec<Choice>,
}

impl Encoder {
    pub fn new() -> Encoder {
        Encoder {
            ws: Workspace::new(),
            choices: Vec::with_capacity(BIG_BLOCK / SMALL_BLOCK),
        }
    }

    /// Compresses `src` into `dst` and returns the number of bytes written.
    ///
    /// `dst` must hold at least [`compressed_size_bound`] of the source
    /// length; the call fails before writing anything otherwise. The
    /// configuration's stream-shaping fields have to be handed unchanged to
    /// the decompressor, they are not recorded in the output.
    pub fn compress(&mut self, src: &[u8], dst: &mut [u8], config: &Config) -> Result<usize> {
        let bound = compressed_size_bound(src.len());
        if dst.len() < bound {
            warn!(
                needed = bound,
                available = dst.len(),
                "destination below the compressed size bound"
            );
            return errors::insufficient_output(bound, dst.len());
        }
        let min_fixed = config.min_fixed_bitln.min(7);

        let mut sink = BitSink::new(dst);
        let mut pos = 0;
        while pos < src.len() {
            let big_len = BIG_BLOCK.min(src.len() - pos);
            self.compress_big_block(&src[pos..pos + big_len], config, min_fixed, &mut sink);
            pos += big_len;
        }
        header::write_eor(&mut sink, config.align);

        debug!(
            src_len = src.len(),
            dst_len = sink.byte_len(),
            "compression finished"
        );
        Ok(sink.byte_len())
    }

    /// Handles one 4K slice of the input: prices the whole-slice encoding
    /// against the per-64-byte encodings and emits the cheaper of the two.
    fn compress_big_block(
        &mut self,
        big: &[u8],
        config: &Config,
        min_fixed: u8,
        sink: &mut BitSink,
    ) {
        // Bypass keeps the segmentation but skips every search.
        if config.bypass_en && config.mixed_blk_size && big.len() == BIG_BLOCK {
            self.emit_big(big, None, config, min_fixed, sink);
            return;
        }

        let big_choice = if big.len() == BIG_BLOCK && config.mixed_blk_size && !config.bypass_en {
            Some(cost::choose_big(big, config, min_fixed, &mut self.ws))
        } else {
            None
        };

        self.choices.clear();
        let mut small_cost = 0;
        let mut off = 0;
        while off < big.len() {
            let n = SMALL_BLOCK.min(big.len() - off);
            let choice = if n == SMALL_BLOCK && !config.bypass_en {
                cost::choose_small(&big[off..off + n], config, min_fixed, &mut self.ws)
            } else {
                // Trailing short blocks and bypassed blocks go out raw.
                Choice::uncompressed(n, config.mixed_blk_size)
            };
            small_cost += choice.cost_bits;
            self.choices.push(choice);
            off += n;
        }

        if let Some(choice) = big_choice {
            // The whole-slice encoding wins ties.
            if choice.cost_bits <= small_cost {
                trace!(
                    cost = choice.cost_bits,
                    small_cost,
                    "emitting the slice as one 4K block"
                );
                self.emit_big(big, choice.predictor, config, min_fixed, sink);
                return;
            }
        }

        let mut off = 0;
        for i in 0..self.choices.len() {
            let choice = self.choices[i];
            self.emit_small(&big[off..off + choice.blk_size], choice, config, min_fixed, sink);
            off += choice.blk_size;
        }
    }

    /// Emits one 64-byte (or trailing shorter) block.
    fn emit_small(
        &mut self,
        input: &[u8],
        choice: Choice,
        config: &Config,
        min_fixed: u8,
        sink: &mut BitSink,
    ) {
        let predictor = match choice.predictor {
            Some(p) => p,
            None => {
                header::write_block_header(sink, None, 8, input.len(), config.mixed_blk_size);
                for &b in input {
                    sink.append(b as u16, 8);
                }
                return;
            }
        };

        // The search clobbered the workspace; re-run the winner to get its
        // residual and side data back.
        let analysis = predict::run(predictor, input, min_fixed, &mut self.ws);
        let mut bitln = analysis.bitln;
        if choice.dual {
            let split = dual::split(&self.ws.residual[..input.len()], &mut self.ws.bitmap);
            bitln = split.bitln;
        }
        trace!(
            op = predictor.wire_code(),
            bitln,
            dual = choice.dual,
            "emitting 64B block"
        );

        header::write_block_header(
            sink,
            Some(predictor.wire_code()),
            bitln,
            input.len(),
            config.mixed_blk_size,
        );
        if config.dual_encode_en {
            if choice.dual {
                sink.append(1, 2);
                // The payload bit count, for decoders that want to skip the
                // block without walking the bitmap.
                let mut payload_bits: u16 = 0;
                for &flag in self.ws.bitmap[..input.len()].iter() {
                    payload_bits += if flag != 0 { 8 } else { bitln as u16 };
                }
                sink.append(payload_bits, 10);
            } else {
                sink.append(0, 2);
            }
        }
        self.emit_side_data(predictor, &analysis, input.len(), sink);
        if choice.dual {
            for &flag in self.ws.bitmap[..input.len()].iter() {
                sink.append(flag as u16, 1);
            }
        }

        let data_len = if predictor == Predictor::TopSymbol {
            analysis.num_bytes
        } else {
            input.len()
        };
        for i in 0..data_len {
            let width = if choice.dual && self.ws.bitmap[i] != 0 {
                8
            } else {
                bitln as u32
            };
            sink.append(self.ws.residual[i] as u16, width);
        }
    }

    /// Emits one whole 4K block; `predictor` is `None` for the raw form.
    fn emit_big(
        &mut self,
        big: &[u8],
        predictor: Option<Predictor>,
        config: &Config,
        min_fixed: u8,
        sink: &mut BitSink,
    ) {
        let predictor = match predictor {
            Some(p) => p,
            None => {
                header::write_block_header(sink, None, 8, big.len(), config.mixed_blk_size);
                for &b in big {
                    sink.append(b as u16, 8);
                }
                return;
            }
        };

        let analysis = predict::run(predictor, big, min_fixed, &mut self.ws);
        header::write_block_header(
            sink,
            Some(predictor.wire_code()),
            analysis.bitln,
            big.len(),
            config.mixed_blk_size,
        );
        if config.dual_encode_en {
            // Dual encoding never runs at 4K, but the flag keeps the
            // compressed header grammar uniform for the decoder.
            sink.append(0, 2);
        }
        self.emit_side_data(predictor, &analysis, big.len(), sink);

        let data_len = if predictor == Predictor::TopSymbol {
            analysis.num_bytes
        } else {
            big.len()
        };
        for i in 0..data_len {
            sink.append(self.ws.residual[i] as u16, analysis.bitln as u32);
        }
    }

    /// Writes the predictor-specific bytes between the header and the packed
    /// residual.
    fn emit_side_data(
        &self,
        predictor: Predictor,
        analysis: &predict::Analysis,
        blk_size: usize,
        sink: &mut BitSink,
    ) {
        match predictor {
            Predictor::Min | Predictor::MinSigned | Predictor::Mean | Predictor::Median => {
                sink.append(self.ws.side[0] as u16, 8);
            }
            Predictor::Bin => {
                let big = blk_size > SMALL_BLOCK;
                let max_syms = if big { MAX_SYMS_BIG } else { MAX_SYMS_SMALL };
                let field_bits = if big {
                    header::NUM_SYMS_BITS_BIG
                } else {
                    header::NUM_SYMS_BITS_SMALL
                };
                // The all-zero code stands for the full table.
                let field = if analysis.num_syms == max_syms {
                    0
                } else {
                    analysis.num_syms
                };
                sink.append(field as u16, field_bits);
                for &sym in self.ws.side[..analysis.num_syms].iter() {
                    sink.append(sym as u16, 8);
                }
            }
            Predictor::TopSymbol => {
                sink.append(self.ws.side[0] as u16, 8);
                let count_bits = if blk_size > SMALL_BLOCK { 14 } else { 8 };
                sink.append(analysis.num_bytes as u16, count_bits);
                for &flag in self.ws.bitmap[..blk_size].iter() {
                    sink.append(flag as u16, 1);
                }
            }
            Predictor::Identity | Predictor::SignFold => {}
        }
    }
}

impl Default for Encoder {
    fn default() -> Encoder {
        Encoder::new()
    }
}
