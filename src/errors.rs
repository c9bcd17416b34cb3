//! The `errors` module defines the common error types.

use std::error;
use std::fmt;

use super::Result;

/// `Error` provides an enumeration of all possible errors reported by the codec.
#[derive(Debug)]
pub enum Error {
    /// The destination buffer cannot hold the worst-case compressed output.
    ///
    /// Reported before any byte is written; size the destination with
    /// [`compressed_size_bound`](crate::compressed_size_bound).
    InsufficientOutput { needed: usize, available: usize },
    /// The decoded data would exceed the caller-supplied destination buffer.
    ///
    /// Reported mid-stream; the destination contents are unspecified.
    DecompressOverflow { needed: usize, available: usize },
    /// The stream contained malformed data and could not be parsed.
    ParseError(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InsufficientOutput { needed, available } => write!(
                f,
                "Output buffer too small for worst case: need {} bytes, have {}",
                needed, available
            ),
            Error::DecompressOverflow { needed, available } => write!(
                f,
                "Decompressed data exceeds destination bound: need {} bytes, have {}",
                needed, available
            ),
            Error::ParseError(ref msg) => write!(f, "Malformed stream encountered: {}", msg),
        }
    }
}

impl error::Error for Error {}

/// function to create an insufficient-output error.
pub fn insufficient_output<T>(needed: usize, available: usize) -> Result<T> {
    Err(Error::InsufficientOutput { needed, available })
}

/// function to create a decompress-overflow error.
pub fn decompress_overflow<T>(needed: usize, available: usize) -> Result<T> {
    Err(Error::DecompressOverflow { needed, available })
}

/// function to create a parse error.
pub fn parse_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::ParseError(desc))
}
