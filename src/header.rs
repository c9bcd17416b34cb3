//! The per-block header grammar.
//!
//! Every block opens with a two-bit prefix:
//!
//! | prefix | meaning |
//! |--------|---------|
//! | `00`   | end of record |
//! | `01`   | trailing partial block, followed by a 6-bit byte count |
//! | `10`   | uncompressed block |
//! | `11`   | compressed block |
//!
//! Compressed headers continue with the operation code and packed width, and
//! when mixed block sizing is on both data prefixes carry a 2-bit size field
//! (`01` for 4K, anything else reads as 64). The predictor-specific side data
//! that follows is owned by the encoder and decoder, not by this module.

use crate::io::{BitSink, BitSource};
use crate::{Align, Result, BIG_BLOCK, SMALL_BLOCK};

const EOR: u16 = 0;
const LAST: u16 = 1;
const UNCOMPRESSED: u16 = 2;
const COMPRESSED: u16 = 3;

// Operation codes carried by compressed headers. They name the inverse the
// decoder applies, not the predictor that produced the block.
pub(crate) const NO_PROC: u8 = 0;
pub(crate) const SIGN_SHIFT_PROC: u8 = 1;
pub(crate) const SIGN_SHIFT_ADD_PROC: u8 = 2;
pub(crate) const ADD_PROC: u8 = 3;
pub(crate) const BIN_EXPAND_PROC: u8 = 4;
pub(crate) const TOP_EXPAND_PROC: u8 = 6;

/// Width of the symbol-count field in binned block headers.
pub(crate) const NUM_SYMS_BITS_SMALL: u32 = 4;
pub(crate) const NUM_SYMS_BITS_BIG: u32 = 6;

/// Writes the header for a data block. `op` is `None` for an uncompressed
/// block; a short trailing block always goes out through the `01` prefix
/// with its explicit byte count.
pub(crate) fn write_block_header(
    sink: &mut BitSink,
    op: Option<u8>,
    bitln: u8,
    blk_size: usize,
    mixed: bool,
) {
    let is_big = blk_size == BIG_BLOCK;
    match op {
        None => {
            if blk_size != SMALL_BLOCK && !is_big {
                sink.append(LAST, 2);
                sink.append(blk_size as u16, 6);
            } else {
                sink.append(UNCOMPRESSED, 2);
                if mixed {
                    sink.append(if is_big { 1 } else { 0 }, 2);
                }
            }
        }
        Some(code) => {
            sink.append(COMPRESSED, 2);
            if mixed {
                sink.append(if is_big { 1 } else { 0 }, 2);
            }
            sink.append(code as u16, 3);
            // A width of 8 goes out as the reserved code 0.
            sink.append(if bitln == 8 { 0 } else { bitln as u16 }, 3);
        }
    }
}

/// Terminates the stream: the end-of-record prefix, optional zero padding up
/// to the requested alignment, and the accumulator flush that byte-aligns the
/// tail. The padding bits are all zero, so anything reading past the marker
/// keeps seeing end-of-record headers.
pub(crate) fn write_eor(sink: &mut BitSink, align: Align) {
    sink.append(EOR, 2);
    if let Some(boundary) = align.byte_boundary() {
        let bits = sink.bits_written();
        let pad_bits = (8 - bits % 8) % 8;
        let bytes_in_buf = (bits + 7) / 8;
        let pad_bytes = (boundary - bytes_in_buf % boundary) % boundary;
        sink.append(0, pad_bits as u32);
        for _ in 0..pad_bytes {
            sink.append(0, 8);
        }
    }
    sink.flush();
}

/// A parsed block header. Side data and payload still sit in the source
/// when this returns.
pub(crate) struct BlockHeader {
    pub eor: bool,
    pub compressed: bool,
    /// Operation code; only meaningful when `compressed` is set.
    pub op: u8,
    /// Packed symbol width from the wire, with 0 standing for 8.
    pub bitln: u8,
    pub blk_size: usize,
    /// The payload is dual-length encoded and a bitmap follows the side data.
    pub dual: bool,
}

/// Parses one block header. `mixed` and `dual_en` must match the encoder's
/// configuration; neither is recorded in the stream.
pub(crate) fn read_block_header(
    source: &mut BitSource,
    mixed: bool,
    dual_en: bool,
) -> Result<BlockHeader> {
    let mut header = BlockHeader {
        eor: false,
        compressed: false,
        op: 0,
        bitln: 8,
        blk_size: SMALL_BLOCK,
        dual: false,
    };

    match source.consume(2)? {
        EOR => {
            header.eor = true;
            return Ok(header);
        }
        LAST => {
            header.blk_size = source.consume(6)? as usize;
            return Ok(header);
        }
        prefix => {
            if mixed {
                header.blk_size = if source.consume(2)? == 1 {
                    BIG_BLOCK
                } else {
                    SMALL_BLOCK
                };
            }
            if prefix == UNCOMPRESSED {
                return Ok(header);
            }
        }
    }

    header.compressed = true;
    header.op = source.consume(3)? as u8;
    header.bitln = source.consume(3)? as u8;
    if dual_en {
        header.dual = source.consume(2)? != 0;
        if header.dual {
            // Total payload bit length, emitted for hardware decoders. The
            // bitmap already determines every symbol width, so the value is
            // skipped here.
            source.consume(10)?;
        }
    }
    Ok(header)
}
