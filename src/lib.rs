//! # BitCompactor
//!
//! A pure rust implementation of the BitCompactor 2.7 lossless byte-stream
//! codec. The input is cut into self-describing blocks of 64 (optionally
//! 4096) bytes, each block runs through a small family of cheap predictors,
//! and the cheapest residual is emitted with fixed-width bit packing. There
//! is no dictionary, no entropy coder and no reference between blocks, so a
//! stream decodes in a single forward pass.
//!
//! The same [`Config`] has to be used on both sides: the block sizing, the
//! dual-length switch and the optional predictors shape the bitstream but are
//! not recorded in it.
//!
//! ```
//! use bitcompactor::{compress_to_vec, decompress_to_vec, Config};
//!
//! let config = Config::default();
//! let data = vec![42u8; 300];
//! let packed = compress_to_vec(&data, &config).unwrap();
//! let unpacked = decompress_to_vec(&packed, data.len(), &config).unwrap();
//! assert_eq!(unpacked, data);
//! ```

pub mod errors;
pub mod io;

mod cost;
mod decode;
mod dual;
mod encode;
mod header;
mod predict;
mod utils;

pub use decode::Decoder;
pub use encode::Encoder;
pub use errors::Error;
pub use utils::{sign_fold, sign_unfold};

/// The result type used by all fallible functions in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Size of a small block. This is the unit the predictor search always runs
/// at; a shorter block can only appear at the very end of the input.
pub const SMALL_BLOCK: usize = 64;

/// Size of a big block, used when [`Config::mixed_blk_size`] is enabled.
pub const BIG_BLOCK: usize = 4096;

/// Tail padding applied after the end-of-record marker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Align {
    /// Byte alignment only.
    None,
    /// Pad the stream to a multiple of 32 bytes.
    B32,
    /// Pad the stream to a multiple of 64 bytes.
    B64,
}

impl Align {
    pub(crate) fn byte_boundary(self) -> Option<usize> {
        match self {
            Align::None => None,
            Align::B32 => Some(32),
            Align::B64 => Some(64),
        }
    }
}

/// Codec configuration.
///
/// `mixed_blk_size`, `dual_encode_en`, `proc_bin_en` and `proc_btmap_en`
/// change the bitstream and must be supplied identically when compressing
/// and decompressing; the format keeps them out of band.
#[derive(Clone, Debug)]
pub struct Config {
    /// Legacy trace threshold. Diagnostics go through the `tracing` facade,
    /// so filtering is the subscriber's job and this knob has no effect.
    pub verbosity: u8,
    /// Let the encoder choose between 4K and 64-byte blocks.
    pub mixed_blk_size: bool,
    /// Enable the symbol-binning predictor.
    pub proc_bin_en: bool,
    /// Enable the top-symbol bitmap predictor.
    pub proc_btmap_en: bool,
    /// Tail padding after the end-of-record marker.
    pub align: Align,
    /// Allow per-block dual-length residual encoding.
    pub dual_encode_en: bool,
    /// Emit every block uncompressed. The output is still a valid stream.
    pub bypass_en: bool,
    /// Lower bound for predictor bit widths, `0..=7`. Values above 7 are
    /// treated as 7.
    pub min_fixed_bitln: u8,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            verbosity: 0,
            mixed_blk_size: false,
            proc_bin_en: false,
            proc_btmap_en: false,
            align: Align::B32,
            dual_encode_en: true,
            bypass_en: false,
            min_fixed_bitln: 3,
        }
    }
}

/// Worst-case compressed size for `src_len` input bytes.
///
/// Deterministic and side-effect free: four header bits per 64-byte block,
/// the end-of-record marker, the raw payload, and room for the flush and the
/// widest tail alignment.
pub fn compressed_size_bound(src_len: usize) -> usize {
    let blocks = (src_len + SMALL_BLOCK - 1) / SMALL_BLOCK;
    (blocks * 4 + 2 + 7) / 8 + src_len + 1 + 64
}

/// Compresses `src` into `dst` with a one-shot [`Encoder`]; returns the
/// number of bytes written.
pub fn compress(src: &[u8], dst: &mut [u8], config: &Config) -> Result<usize> {
    Encoder::new().compress(src, dst, config)
}

/// Decompresses `src` into `dst` with a one-shot [`Decoder`]; returns the
/// number of bytes produced.
pub fn decompress(src: &[u8], dst: &mut [u8], config: &Config) -> Result<usize> {
    Decoder::new().decompress(src, dst, config)
}

/// Compresses `src` into a freshly allocated buffer sized from
/// [`compressed_size_bound`].
pub fn compress_to_vec(src: &[u8], config: &Config) -> Result<Vec<u8>> {
    let mut dst = vec![0u8; compressed_size_bound(src.len())];
    let len = compress(src, &mut dst, config)?;
    dst.truncate(len);
    Ok(dst)
}

/// Decompresses `src` into a freshly allocated buffer. `max_len` bounds the
/// decompressed size; the stream itself does not record it.
pub fn decompress_to_vec(src: &[u8], max_len: usize, config: &Config) -> Result<Vec<u8>> {
    let mut dst = vec![0u8; max_len];
    let len = decompress(src, &mut dst, config)?;
    dst.truncate(len);
    Ok(dst)
}

#[test]
fn test_compressed_size_bound() {
    assert_eq!(compressed_size_bound(0), 66);
    // One block of header overhead plus the raw bytes plus the tail.
    assert_eq!(compressed_size_bound(64), 1 + 64 + 1 + 64);
    assert!(compressed_size_bound(4096) >= 4096 + 65);
}
