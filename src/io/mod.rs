//! The `io` module provides the bit-level primitives the codec is built on.
//!
//! Both halves use the same bit order: values are packed LSB-first into the
//! stream, and the stream itself is little-endian when whole words spill out.
//! [`BitSink`] accumulates appended values on the encode side, [`BitSource`]
//! is the matching read cursor on the decode side.

mod sink;
mod source;

pub use sink::BitSink;
pub use source::BitSource;
