//! Property tests for the match finder, the Huffman builder and the engine.

use oxiflate_deflate::huffman::MAX_CODELEN_LENGTH;
use oxiflate_deflate::lz77::{MAX_MATCH, MIN_MATCH};
use oxiflate_deflate::{
    DeflateConfig, Deflater, FlushMode, FrequencyTable, HuffmanBuilder, HuffmanTree, Lz77Token,
    MatchFinder, deflate,
};
use proptest::prelude::*;
use std::io::Read;

fn inflate(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    flate2::read::DeflateDecoder::new(data)
        .read_to_end(&mut output)
        .unwrap();
    output
}

/// Inputs with enough repetition to produce matches.
fn repetitive_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec((prop::collection::vec(0u8..8, 1..40), 1usize..20), 0..40).prop_map(
        |runs| {
            runs.into_iter()
                .flat_map(|(chunk, times)| chunk.repeat(times))
                .collect()
        },
    )
}

fn kraft_sum(lengths: &[u8], max: usize) -> u64 {
    lengths
        .iter()
        .filter(|&&l| l > 0)
        .map(|&l| 1u64 << (max - l as usize))
        .sum()
}

/// Clamp tree depths to `max`, then restore the Kraft sum the simple way:
/// drop one code from the deepest bucket and split one shorter code in two,
/// until the code is complete. Lengths go to symbols heaviest first.
fn clamp_and_repair(depths: &[u32], counts: &[u32], max: usize) -> Vec<u8> {
    let mut bl_count = vec![0u64; max + 1];
    for &depth in depths.iter().filter(|&&d| d > 0) {
        bl_count[(depth as usize).min(max)] += 1;
    }
    let mut total: u64 = (1..=max).map(|bits| bl_count[bits] << (max - bits)).sum();
    while total != 1 << max {
        bl_count[max] -= 1;
        if let Some(bits) = (1..max).rev().find(|&b| bl_count[b] > 0) {
            bl_count[bits] -= 1;
            bl_count[bits + 1] += 2;
        }
        total -= 1;
    }

    let mut order: Vec<usize> = (0..depths.len()).filter(|&s| depths[s] > 0).collect();
    order.sort_by_key(|&s| (depths[s], std::cmp::Reverse(counts[s]), s));
    let mut lengths = vec![0u8; depths.len()];
    let mut symbols = order.into_iter();
    for (bits, &count) in bl_count.iter().enumerate().skip(1) {
        for symbol in symbols.by_ref().take(count as usize) {
            lengths[symbol] = bits as u8;
        }
    }
    lengths
}

fn cost(lengths: &[u8], counts: &[u32]) -> u64 {
    lengths
        .iter()
        .zip(counts)
        .map(|(&l, &c)| l as u64 * c as u64)
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_any_bytes(data in prop::collection::vec(any::<u8>(), 0..4096), level in 0u8..=9) {
        let compressed = deflate(&data, level).unwrap();
        prop_assert_eq!(inflate(&compressed), data);
    }

    #[test]
    fn roundtrip_repetitive(data in repetitive_bytes(), level in 0u8..=9) {
        let compressed = deflate(&data, level).unwrap();
        prop_assert_eq!(inflate(&compressed), data);
    }

    #[test]
    fn roundtrip_with_flushes(
        data in repetitive_bytes(),
        cuts in prop::collection::vec((1usize..500, 0u8..3), 1..10),
        window_bits in 10u8..=15,
        pending in 1usize..2000,
    ) {
        let config = DeflateConfig::from_level(6)
            .with_window_bits(window_bits)
            .with_pending_symbols(pending);
        let mut deflater = Deflater::with_config(config).unwrap();
        let mut output = Vec::new();
        let mut buf = [0u8; 512];
        let mut pos = 0;

        for (len, mode) in cuts {
            let end = (pos + len).min(data.len());
            let flush = match mode {
                0 => FlushMode::None,
                1 => FlushMode::Sync,
                _ => FlushMode::Full,
            };
            deflater.set_input(&data, pos, end - pos).unwrap();
            deflater.deflate(flush).unwrap();
            pos = end;
            loop {
                let n = deflater.read_output(&mut buf);
                if n == 0 {
                    break;
                }
                output.extend_from_slice(&buf[..n]);
            }
        }
        deflater.set_input(&data, pos, data.len() - pos).unwrap();
        deflater.deflate(FlushMode::Finish).unwrap();
        loop {
            let n = deflater.read_output(&mut buf);
            if n == 0 {
                break;
            }
            output.extend_from_slice(&buf[..n]);
        }

        prop_assert_eq!(inflate(&output), data);
        for block in deflater.blocks() {
            prop_assert!(block.chosen_bits() <= block.static_bits);
            prop_assert!(block.chosen_bits() <= block.dynamic_bits);
            prop_assert!(block.symbols <= pending);
        }
    }

    #[test]
    fn match_finder_tokens_are_valid(data in repetitive_bytes(), level in 1u8..=9, window_bits in 10u32..=15) {
        let window = 1usize << window_bits;
        let tokens = MatchFinder::with_level(window, level).tokenize(&data);

        let mut output: Vec<u8> = Vec::with_capacity(data.len());
        for token in tokens {
            match token {
                Lz77Token::Literal(b) => output.push(b),
                Lz77Token::Match { length, distance } => {
                    let (length, distance) = (length as usize, distance as usize);
                    prop_assert!((MIN_MATCH..=MAX_MATCH).contains(&length));
                    prop_assert!(distance >= 1 && distance <= window);
                    prop_assert!(distance <= output.len());
                    let start = output.len() - distance;
                    for i in 0..length {
                        let byte = output[start + i];
                        output.push(byte);
                    }
                }
            }
        }
        prop_assert_eq!(output, data);
    }

    #[test]
    fn builder_codes_are_complete_and_capped(
        counts in prop::collection::vec(0u32..100_000, 2..286),
        max_length in 7u8..=15,
    ) {
        let freqs = FrequencyTable::from_counts(&counts);
        let used = counts.iter().filter(|&&c| c > 0).count();
        let max = max_length as usize;
        let builder = HuffmanBuilder::new(max_length, 1);

        if used > 1 << max {
            prop_assert!(builder.build(&freqs).is_err());
            return Ok(());
        }

        let table = builder.build(&freqs).unwrap();
        let lengths = table.lengths();
        prop_assert!(lengths.iter().all(|&l| l as usize <= max));
        if used >= 2 {
            for (symbol, &count) in counts.iter().enumerate() {
                prop_assert_eq!(count > 0, lengths[symbol] > 0);
            }
            prop_assert_eq!(kraft_sum(lengths, max), 1u64 << max);
        }
    }

    #[test]
    fn builder_matches_unconstrained_optimum(counts in prop::collection::vec(0u32..1000, 2..40)) {
        let freqs = FrequencyTable::from_counts(&counts);
        prop_assume!(counts.iter().filter(|&&c| c > 0).count() >= 2);

        // 40 symbols never need more than 15 bits unless weights are extreme;
        // skip the rare tables that do.
        let tree = HuffmanTree::build(&freqs);
        prop_assume!(tree.leaf_depths().iter().all(|&d| d <= 15));

        let table = HuffmanBuilder::new(15, 1).build(&freqs).unwrap();
        prop_assert_eq!(table.encoded_length(&freqs), tree.cost());
    }

    #[test]
    fn codelen_builder_never_exceeds_flat_code(counts in prop::collection::vec(1u32..5000, 19)) {
        let freqs = FrequencyTable::from_counts(&counts);
        let tree = HuffmanTree::build(&freqs);
        prop_assume!(tree.leaf_depths().iter().all(|&d| d as usize <= MAX_CODELEN_LENGTH));

        let table = HuffmanBuilder::codelen().build(&freqs).unwrap();
        // A flat 5-bit code covers 19 symbols.
        prop_assert!(table.encoded_length(&freqs) <= freqs.total() * 5);
    }

    #[test]
    fn builder_beats_clamp_and_repair(
        counts in prop::collection::vec(
            prop_oneof![0u32..100_000, (0u32..24).prop_map(|e| 1u32 << e)],
            2..120,
        ),
        max_length in 7u8..=15,
    ) {
        let max = max_length as usize;
        let used = counts.iter().filter(|&&c| c > 0).count();
        prop_assume!(used >= 2 && used <= 1 << max);

        let freqs = FrequencyTable::from_counts(&counts);
        let depths = HuffmanTree::build(&freqs).leaf_depths();
        let baseline = clamp_and_repair(&depths, &counts, max);
        prop_assert_eq!(kraft_sum(&baseline, max), 1u64 << max);

        let table = HuffmanBuilder::new(max_length, 1).build(&freqs).unwrap();
        prop_assert!(table.encoded_length(&freqs) <= cost(&baseline, &counts));
    }
}
