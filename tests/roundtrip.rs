//! End-to-end compression tests: wire-format scenarios and roundtrip
//! invariants across the configuration space.

use bitcompactor::io::BitSource;
use bitcompactor::{
    compress, compress_to_vec, compressed_size_bound, decompress_to_vec, Align, Config, Error,
};

/// Deterministic pseudo-random bytes, so failures reproduce.
fn pseudo_random(len: usize, mut state: u32) -> Vec<u8> {
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 24) as u8
        })
        .collect()
}

/// Compresses, checks the size bound, decompresses, checks equality.
fn assert_roundtrip(data: &[u8], config: &Config) {
    let packed = compress_to_vec(data, config).expect("compression failed");
    assert!(
        packed.len() <= compressed_size_bound(data.len()),
        "bound violated: {} > {} for {} input bytes",
        packed.len(),
        compressed_size_bound(data.len()),
        data.len()
    );
    let unpacked = decompress_to_vec(&packed, data.len(), config).expect("decompression failed");
    assert_eq!(unpacked, data, "roundtrip mismatch for {} bytes", data.len());
}

fn sample_inputs(len: usize) -> Vec<Vec<u8>> {
    let mut inputs = vec![
        vec![0u8; len],
        vec![0xaau8; len],
        (0..len).map(|i| i as u8).collect(),
        pseudo_random(len, 0x1234_5678),
        (0..len).map(|i| [3u8, 94, 170, 255][i % 4]).collect(),
    ];
    // Mostly one symbol with scattered outliers.
    let mut sparse = vec![0x55u8; len];
    for i in (0..len).step_by(17) {
        sparse[i] = (i * 11) as u8;
    }
    inputs.push(sparse);
    inputs
}

fn sample_configs() -> Vec<Config> {
    vec![
        Config::default(),
        Config {
            dual_encode_en: false,
            ..Config::default()
        },
        Config {
            mixed_blk_size: true,
            ..Config::default()
        },
        Config {
            mixed_blk_size: true,
            proc_bin_en: true,
            proc_btmap_en: true,
            ..Config::default()
        },
        Config {
            proc_bin_en: true,
            proc_btmap_en: true,
            dual_encode_en: false,
            align: Align::None,
            ..Config::default()
        },
        Config {
            mixed_blk_size: true,
            proc_bin_en: true,
            proc_btmap_en: true,
            align: Align::B64,
            min_fixed_bitln: 0,
            ..Config::default()
        },
        Config {
            bypass_en: true,
            ..Config::default()
        },
        Config {
            bypass_en: true,
            mixed_blk_size: true,
            align: Align::None,
            ..Config::default()
        },
    ]
}

#[test]
fn roundtrip_holds_across_lengths_and_configs() {
    let lengths = [0usize, 1, 63, 64, 65, 70, 128, 4095, 4096, 4097, 8205];
    for &len in lengths.iter() {
        for data in sample_inputs(len) {
            for config in sample_configs() {
                assert_roundtrip(&data, &config);
            }
        }
    }
}

#[test]
fn empty_input_is_only_the_end_marker() {
    let config = Config::default();
    let packed = compress_to_vec(&[], &config).unwrap();
    // The marker plus 32-byte tail alignment, all zero bits.
    assert_eq!(packed.len(), 32);
    assert!(packed.iter().all(|&b| b == 0));
    assert_eq!(decompress_to_vec(&packed, 0, &config).unwrap(), vec![]);

    let unaligned = Config {
        align: Align::None,
        ..Config::default()
    };
    let packed = compress_to_vec(&[], &unaligned).unwrap();
    assert_eq!(packed, vec![0u8]);
}

#[test]
fn constant_zero_block_packs_at_the_width_floor() {
    let config = Config {
        dual_encode_en: false,
        align: Align::None,
        ..Config::default()
    };
    let data = [0u8; 64];
    let packed = compress_to_vec(&data, &config).unwrap();
    // Identity predictor at the 3-bit floor: prefix 11, op 000, width 011,
    // then 192 zero payload bits and the end marker.
    assert_eq!(packed[0], 0x63);
    assert_eq!(packed.len(), (2 + 3 + 3 + 64 * 3 + 2 + 7) / 8);
    assert_roundtrip(&data, &config);
    assert_roundtrip(&data, &Config::default());
}

#[test]
fn ramp_selects_a_plain_predictor() {
    let data: Vec<u8> = (0..64).collect();
    assert_roundtrip(&data, &Config::default());

    let config = Config {
        dual_encode_en: false,
        align: Align::None,
        ..Config::default()
    };
    let packed = compress_to_vec(&data, &config).unwrap();
    let mut src = BitSource::new(&packed);
    assert_eq!(src.consume(2).unwrap(), 3); // compressed
    assert_eq!(src.consume(3).unwrap(), 0); // identity-class op
    assert_eq!(src.consume(3).unwrap(), 6); // 6-bit symbols
    for expect in 0..64u16 {
        assert_eq!(src.consume(6).unwrap(), expect);
    }
    assert_eq!(src.consume(2).unwrap(), 0); // end of record
}

#[test]
fn trailing_partial_block_uses_the_last_prefix() {
    let data = [0xaau8; 70];
    assert_roundtrip(&data, &Config::default());

    let config = Config {
        dual_encode_en: false,
        align: Align::None,
        ..Config::default()
    };
    let packed = compress_to_vec(&data, &config).unwrap();
    let mut src = BitSource::new(&packed);
    assert_eq!(src.consume(2).unwrap(), 3); // compressed 64-byte block
    assert_eq!(src.consume(3).unwrap(), 3); // add-byte op
    assert_eq!(src.consume(3).unwrap(), 3); // 3-bit symbols
    assert_eq!(src.consume(8).unwrap(), 0xaa); // the subtracted minimum
    for _ in 0..64 {
        assert_eq!(src.consume(3).unwrap(), 0);
    }
    assert_eq!(src.consume(2).unwrap(), 1); // trailing partial block
    assert_eq!(src.consume(6).unwrap(), 6); // its byte count
    for _ in 0..6 {
        assert_eq!(src.consume(8).unwrap(), 0xaa);
    }
    assert_eq!(src.consume(2).unwrap(), 0); // end of record
}

#[test]
fn four_symbol_4k_block_takes_the_binning_path() {
    let symbols = [11u8, 57, 130, 200];
    let data: Vec<u8> = (0..4096usize).map(|i| symbols[i % 4]).collect();
    let config = Config {
        proc_bin_en: true,
        mixed_blk_size: true,
        ..Config::default()
    };
    assert_roundtrip(&data, &config);

    let packed = compress_to_vec(&data, &config).unwrap();
    let mut src = BitSource::new(&packed);
    assert_eq!(src.consume(2).unwrap(), 3); // compressed
    assert_eq!(src.consume(2).unwrap(), 1); // 4K block
    assert_eq!(src.consume(3).unwrap(), 4); // bin-expansion op
    assert_eq!(src.consume(3).unwrap(), 3); // width floor
    assert_eq!(src.consume(2).unwrap(), 0); // dual flag, never set at 4K
    assert_eq!(src.consume(6).unwrap(), 4); // table size
    for &sym in symbols.iter() {
        assert_eq!(src.consume(8).unwrap(), sym as u16);
    }
    for i in 0..4096u16 {
        assert_eq!(src.consume(3).unwrap(), i % 4);
    }
    assert_eq!(src.consume(2).unwrap(), 0); // end of record

    // Below the floor the same path packs two bits per symbol.
    let narrow = Config {
        min_fixed_bitln: 2,
        ..config
    };
    let packed = compress_to_vec(&data, &narrow).unwrap();
    assert!(packed.len() < 1200);
    assert_roundtrip(&data, &narrow);
}

#[test]
fn top_symbol_block_carries_bitmap_and_remainder() {
    let mut data = [0xffu8; 64];
    data[5] = 1;
    data[20] = 2;
    data[40] = 3;
    data[63] = 4;
    let config = Config {
        proc_btmap_en: true,
        align: Align::None,
        ..Config::default()
    };
    assert_roundtrip(&data, &config);

    let packed = compress_to_vec(&data, &config).unwrap();
    let mut src = BitSource::new(&packed);
    assert_eq!(src.consume(2).unwrap(), 3); // compressed
    assert_eq!(src.consume(3).unwrap(), 6); // top-symbol expansion op
    assert_eq!(src.consume(3).unwrap(), 0); // eight-bit remainder symbols
    assert_eq!(src.consume(2).unwrap(), 0); // dual flag
    assert_eq!(src.consume(8).unwrap(), 0xff); // the extracted symbol
    assert_eq!(src.consume(8).unwrap(), 4); // remainder count
    let mut ones = vec![];
    for i in 0..64 {
        if src.consume(1).unwrap() == 1 {
            ones.push(i);
        }
    }
    assert_eq!(ones, vec![5, 20, 40, 63]);
    for expect in 1..=4u16 {
        assert_eq!(src.consume(8).unwrap(), expect);
    }
    assert_eq!(src.consume(2).unwrap(), 0); // end of record
}

#[test]
fn alignment_pads_the_tail() {
    for &len in [0usize, 1, 64, 100, 4096, 5000].iter() {
        let data = pseudo_random(len, 0xdead_beef);
        for (align, boundary) in [(Align::B32, 32), (Align::B64, 64)].iter() {
            let config = Config {
                align: *align,
                mixed_blk_size: true,
                ..Config::default()
            };
            let packed = compress_to_vec(&data, &config).unwrap();
            assert_eq!(
                packed.len() % boundary,
                0,
                "tail not {}-byte aligned for {} input bytes",
                boundary,
                len
            );
            assert_eq!(decompress_to_vec(&packed, len, &config).unwrap(), data);
        }
    }
}

#[test]
fn bypass_emits_raw_blocks() {
    let data = pseudo_random(130, 0x0badf00d);
    let config = Config {
        bypass_en: true,
        align: Align::None,
        ..Config::default()
    };
    let packed = compress_to_vec(&data, &config).unwrap();
    // Two raw 64-byte blocks, a 2-byte trailing block, the end marker.
    let bits = 2 + 512 + 2 + 512 + 8 + 16 + 2;
    assert_eq!(packed.len(), (bits + 7) / 8);
    assert_eq!(decompress_to_vec(&packed, 130, &config).unwrap(), data);
}

#[test]
fn dual_blocks_always_keep_a_long_symbol() {
    // An all-short residual forces the first symbol long; the stream keeps
    // decoding consistently.
    let data = [1u8; 64];
    assert_roundtrip(&data, &Config::default());

    let config = Config {
        align: Align::None,
        ..Config::default()
    };
    let packed = compress_to_vec(&data, &config).unwrap();
    let mut src = BitSource::new(&packed);
    assert_eq!(src.consume(2).unwrap(), 3); // compressed
    assert_eq!(src.consume(3).unwrap(), 0); // identity-class op, no side data
    assert_eq!(src.consume(3).unwrap(), 1); // one-bit short width
    assert_eq!(src.consume(2).unwrap(), 1); // dual flag
    assert_eq!(src.consume(10).unwrap(), 8 + 63); // payload bit length
    assert_eq!(src.consume(1).unwrap(), 1); // the forced long symbol
    for _ in 1..64 {
        assert_eq!(src.consume(1).unwrap(), 0);
    }
    assert_eq!(src.consume(8).unwrap(), 1); // the long symbol's eight bits
    for _ in 1..64 {
        assert_eq!(src.consume(1).unwrap(), 1); // short one-bit symbols
    }
}

#[test]
fn undersized_destination_fails_before_writing() {
    let data = [7u8; 256];
    let mut dst = vec![0u8; 64];
    match compress(&data, &mut dst, &Config::default()) {
        Err(Error::InsufficientOutput { needed, available }) => {
            assert_eq!(needed, compressed_size_bound(256));
            assert_eq!(available, 64);
        }
        other => panic!("expected InsufficientOutput, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn oversized_stream_reports_overflow() {
    let data = pseudo_random(256, 0xfeed_cafe);
    let config = Config::default();
    let packed = compress_to_vec(&data, &config).unwrap();
    match decompress_to_vec(&packed, 128, &config) {
        Err(Error::DecompressOverflow { needed, available }) => {
            assert!(needed > 128);
            assert_eq!(available, 128);
        }
        other => panic!("expected DecompressOverflow, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn truncated_stream_is_rejected() {
    let data = pseudo_random(256, 0x5eed_5eed);
    let config = Config {
        align: Align::None,
        ..Config::default()
    };
    let packed = compress_to_vec(&data, &config).unwrap();
    let cut = &packed[..packed.len() / 2];
    assert!(decompress_to_vec(cut, 256, &config).is_err());
}
