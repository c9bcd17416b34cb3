//! Dual-length residual encoding.
//!
//! Instead of one fixed width for the whole block, a residual may use two: a
//! short width below eight bits and full eight-bit symbols, with a
//! block-length bitmap saying which is which. This pays off when a block is
//! mostly small values with a few outliers that would otherwise drag the
//! fixed width up.

use crate::utils;

/// Result of a dual-length split.
pub(crate) struct DualSplit {
    /// The chosen short width.
    pub bitln: u8,
    /// Payload size in bits with that split, bitmap and length field not
    /// included.
    pub cost_bits: usize,
}

/// Bins the residual symbols by their individual bit width, picks the short
/// width that minimises the packed payload, and fills `bitmap` with a 1 for
/// every symbol that stays at eight bits.
///
/// A block must keep at least one long symbol. When the chosen width covers
/// everything, the first symbol is forced long and the cost is corrected for
/// the wider encoding.
pub(crate) fn split(residual: &[u8], bitmap: &mut [u8]) -> DualSplit {
    // Count how many symbols need each width. Dual encoding only runs on
    // 64-byte blocks.
    let mut bins = [0usize; 9];
    let mut widths = [0u8; crate::SMALL_BLOCK];
    for (i, &r) in residual.iter().enumerate() {
        let width = if r == 0 {
            1
        } else {
            utils::CEIL_LOG2[r as usize + 1]
        };
        bins[width as usize] += 1;
        widths[i] = width;
    }

    // For every candidate short width, symbols at or below it cost the short
    // width and the rest cost eight bits. Keep the argmin; ties go to the
    // narrower width.
    let mut bitln = 1u8;
    let mut cost_bits = usize::MAX;
    for w in 1..=8usize {
        let short: usize = bins[1..=w].iter().sum();
        let long: usize = bins[w + 1..9].iter().sum();
        let cost = short * w + long * 8;
        if cost < cost_bits {
            cost_bits = cost;
            bitln = w as u8;
        }
    }

    let mut long_count = 0;
    for (i, &w) in widths[..residual.len()].iter().enumerate() {
        if w > bitln {
            bitmap[i] = 1;
            long_count += 1;
        } else {
            bitmap[i] = 0;
        }
    }

    if long_count == 0 {
        // Every symbol fit the short width. Force the first one long so the
        // two lengths are both in use, and account for its wider encoding.
        bitmap[0] = 1;
        cost_bits += 8 - bitln as usize;
    }

    DualSplit { bitln, cost_bits }
}
