//! The decoder: one forward pass over the bitstream, block by block.

use tracing::{debug, trace, warn};

use crate::header::{self, BlockHeader};
use crate::io::BitSource;
use crate::utils;
use crate::{errors, Config, Result, BIG_BLOCK};

/// A reusable decompressor.
///
/// Holds the side-data table and the bitmap and remainder buffers so
/// repeated calls do not reallocate. One instance serves one call at a time;
/// for parallel decompression create a decoder per thread.
pub struct Decoder {
    /// Binned symbol table, also the single add/top byte in slot 0. Sized so
    /// any residual byte indexes in bounds even in a corrupt stream.
    side: [u8; 256],
    bitmap: [u8; BIG_BLOCK],
    remainder: [u8; BIG_BLOCK],
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder {
            side: [0; 256],
            bitmap: [0; BIG_BLOCK],
            remainder: [0; BIG_BLOCK],
        }
    }

    /// Decompresses `src` into `dst` and returns the number of bytes
    /// produced.
    ///
    /// The configuration must carry the same `mixed_blk_size`,
    /// `dual_encode_en` and predictor-enable values the stream was encoded
    /// with; none of them are recorded in the stream. Decoding stops at the
    /// end-of-record marker or the end of `src`, whichever comes first, and
    /// fails with [`Error::DecompressOverflow`](crate::Error) before writing
    /// a block that would not fit `dst`.
    pub fn decompress(&mut self, src: &[u8], dst: &mut [u8], config: &Config) -> Result<usize> {
        let mut source = BitSource::new(src);
        let mut out_len = 0;

        while source.byte_pos() < src.len() {
            let hdr =
                header::read_block_header(&mut source, config.mixed_blk_size, config.dual_encode_en)?;
            if hdr.eor {
                break;
            }
            // A header that drained the source has nothing behind it; the
            // stream ended in alignment padding.
            if source.byte_pos() >= src.len() {
                break;
            }
            trace!(
                compressed = hdr.compressed,
                op = hdr.op,
                blk_size = hdr.blk_size,
                dual = hdr.dual,
                "decoding block"
            );

            let count = self.read_side_data(&mut source, &hdr)?;

            if out_len + hdr.blk_size > dst.len() {
                warn!(
                    needed = out_len + hdr.blk_size,
                    available = dst.len(),
                    "decompressed data exceeds the destination bound"
                );
                return errors::decompress_overflow(out_len + hdr.blk_size, dst.len());
            }
            let out = &mut dst[out_len..out_len + hdr.blk_size];

            if hdr.compressed {
                self.expand_block(&mut source, &hdr, count, out)?;
            } else {
                for b in out.iter_mut() {
                    *b = source.consume(8)? as u8;
                }
            }
            out_len += hdr.blk_size;
        }

        debug!(src_len = src.len(), dst_len = out_len, "decompression finished");
        Ok(out_len)
    }

    /// Pulls the predictor side data (and any bitmap) that sits between the
    /// block header and the packed residual. Returns the remainder count for
    /// top-symbol blocks.
    fn read_side_data(&mut self, source: &mut BitSource, hdr: &BlockHeader) -> Result<usize> {
        let mut count = 0;
        if !hdr.compressed {
            return Ok(count);
        }
        match hdr.op {
            header::ADD_PROC | header::SIGN_SHIFT_ADD_PROC => {
                self.side[0] = source.consume(8)? as u8;
            }
            header::BIN_EXPAND_PROC => {
                let (field_bits, max_syms) = if hdr.blk_size == BIG_BLOCK {
                    (header::NUM_SYMS_BITS_BIG, 64)
                } else {
                    (header::NUM_SYMS_BITS_SMALL, 16)
                };
                let mut num_syms = source.consume(field_bits)? as usize;
                if num_syms == 0 {
                    num_syms = max_syms;
                }
                for slot in self.side[..num_syms].iter_mut() {
                    *slot = source.consume(8)? as u8;
                }
            }
            header::TOP_EXPAND_PROC => {
                self.side[0] = source.consume(8)? as u8;
                count = source.consume(8)? as usize;
                if hdr.blk_size == BIG_BLOCK {
                    count |= (source.consume(6)? as usize) << 8;
                }
                if count > hdr.blk_size {
                    return errors::parse_error("remainder count exceeds the block size");
                }
                for flag in self.bitmap[..hdr.blk_size].iter_mut() {
                    *flag = source.consume(1)? as u8;
                }
            }
            _ => {}
        }
        if hdr.dual {
            for flag in self.bitmap[..hdr.blk_size].iter_mut() {
                *flag = source.consume(1)? as u8;
            }
        }
        Ok(count)
    }

    /// Unpacks a compressed block's residual into `out` and applies the
    /// predictor inverse.
    fn expand_block(
        &mut self,
        source: &mut BitSource,
        hdr: &BlockHeader,
        count: usize,
        out: &mut [u8],
    ) -> Result<()> {
        if hdr.op == header::TOP_EXPAND_PROC {
            // The remainder symbols are always whole bytes; scatter them
            // around the extracted top symbol.
            for slot in self.remainder[..count].iter_mut() {
                *slot = source.consume(8)? as u8;
            }
            let mut next = 0;
            for (flag, b) in self.bitmap[..out.len()].iter().zip(out.iter_mut()) {
                if *flag == 0 {
                    *b = self.side[0];
                } else {
                    *b = self.remainder[next];
                    next += 1;
                }
            }
            return Ok(());
        }

        let short_width = if hdr.bitln == 0 { 8 } else { hdr.bitln as u32 };
        if hdr.dual {
            for (flag, b) in self.bitmap[..out.len()].iter().zip(out.iter_mut()) {
                let width = if *flag != 0 { 8 } else { short_width };
                *b = source.consume(width)? as u8;
            }
        } else {
            for b in out.iter_mut() {
                *b = source.consume(short_width)? as u8;
            }
        }

        match hdr.op {
            header::SIGN_SHIFT_PROC => {
                for b in out.iter_mut() {
                    *b = utils::sign_unfold(*b);
                }
            }
            header::SIGN_SHIFT_ADD_PROC => {
                for b in out.iter_mut() {
                    *b = utils::sign_unfold(*b).wrapping_add(self.side[0]);
                }
            }
            header::ADD_PROC => {
                for b in out.iter_mut() {
                    *b = b.wrapping_add(self.side[0]);
                }
            }
            header::BIN_EXPAND_PROC => {
                for b in out.iter_mut() {
                    *b = self.side[*b as usize];
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Default for Decoder {
    fn default() -> Decoder {
        Decoder::new()
    }
}
