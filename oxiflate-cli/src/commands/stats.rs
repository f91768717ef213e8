//! Stats command implementation.

use crate::utils::space_savings;
use oxiflate_deflate::{BlockSummary, Deflater, FlushMode};
use serde::Serialize;
use std::path::Path;

/// Bytes handed to the engine per call while collecting stats.
const STATS_CHUNK: usize = 64 * 1024;

/// Per-block record for display and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct BlockRecord {
    pub index: usize,
    pub block_type: &'static str,
    pub final_block: bool,
    pub raw_len: usize,
    pub symbols: usize,
    pub stored_bits: u64,
    pub static_bits: u64,
    pub dynamic_bits: u64,
    pub chosen_bits: u64,
}

impl BlockRecord {
    fn new(index: usize, summary: &BlockSummary) -> Self {
        Self {
            index,
            block_type: summary.block_type.name(),
            final_block: summary.final_block,
            raw_len: summary.raw_len,
            symbols: summary.symbols,
            stored_bits: summary.stored_bits,
            static_bits: summary.static_bits,
            dynamic_bits: summary.dynamic_bits,
            chosen_bits: summary.chosen_bits(),
        }
    }
}

/// Whole-stream report.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub input: String,
    pub level: u8,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub adler32: String,
    pub blocks: Vec<BlockRecord>,
}

/// Compress `data` in memory and collect the report.
pub fn collect_stats(
    name: &str,
    data: &[u8],
    level: u8,
) -> Result<StatsReport, Box<dyn std::error::Error>> {
    let mut deflater = Deflater::new(level);
    let mut buf = vec![0u8; 64 * 1024];
    let mut summaries = Vec::new();

    for chunk in data.chunks(STATS_CHUNK) {
        deflater.set_input(chunk, 0, chunk.len())?;
        deflater.deflate(FlushMode::None)?;
        summaries.extend(deflater.take_blocks());
        while deflater.read_output(&mut buf) > 0 {}
    }
    deflater.deflate(FlushMode::Finish)?;
    summaries.extend(deflater.take_blocks());
    while deflater.read_output(&mut buf) > 0 {}

    Ok(StatsReport {
        input: name.to_string(),
        level,
        input_bytes: deflater.total_in(),
        output_bytes: deflater.total_out(),
        adler32: format!("{:08x}", deflater.checksum()),
        blocks: summaries
            .iter()
            .enumerate()
            .map(|(i, summary)| BlockRecord::new(i, summary))
            .collect(),
    })
}

pub fn cmd_stats(input: &Path, level: u8, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    let report = collect_stats(&input.display().to_string(), &data, level)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &StatsReport) {
    println!("Stream Statistics");
    println!("=================");
    println!("File: {}", report.input);
    println!("Level: {}", report.level);
    println!("Input: {} bytes", report.input_bytes);
    println!(
        "Output: {} bytes ({:.1}% saved)",
        report.output_bytes,
        space_savings(report.input_bytes, report.output_bytes)
    );
    println!("Adler-32: {}", report.adler32);
    println!();

    println!(
        "{:>5} {:>8} {:>6} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "Block", "Type", "Final", "Raw", "Symbols", "Stored", "Static", "Dynamic",
    );
    println!("{}", "-".repeat(72));
    for block in &report.blocks {
        println!(
            "{:>5} {:>8} {:>6} {:>8} {:>8} {:>10} {:>10} {:>10}",
            block.index,
            block.block_type,
            if block.final_block { "yes" } else { "" },
            block.raw_len,
            block.symbols,
            block.stored_bits,
            block.static_bits,
            block.dynamic_bits,
        );
    }
    println!("{}", "-".repeat(72));
    println!("{} blocks (costs in bits)", report.blocks.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_stats_empty() {
        let report = collect_stats("empty", b"", 6).unwrap();
        assert_eq!(report.input_bytes, 0);
        assert_eq!(report.output_bytes, 2);
        assert_eq!(report.adler32, "00000001");
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.blocks[0].block_type, "static");
        assert!(report.blocks[0].final_block);
    }

    #[test]
    fn test_collect_stats_json() {
        let data = b"abcabcabcabcabcabcabcabc".repeat(100);
        let report = collect_stats("data", &data, 9).unwrap();
        assert_eq!(report.input_bytes, data.len() as u64);
        assert_eq!(
            report.output_bytes,
            oxiflate_deflate::deflate(&data, 9).unwrap().len() as u64
        );

        let value: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["level"], 9);
        assert_eq!(value["blocks"][0]["index"], 0);
        assert!(value["blocks"][0]["chosen_bits"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_collect_stats_spans_chunks() {
        let data: Vec<u8> = (0..3 * STATS_CHUNK as u32 + 17)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let report = collect_stats("noise", &data, 6).unwrap();

        assert_eq!(report.input_bytes, data.len() as u64);
        assert_eq!(
            report.output_bytes,
            oxiflate_deflate::deflate(&data, 6).unwrap().len() as u64
        );
        let raw: usize = report.blocks.iter().map(|b| b.raw_len).sum();
        assert_eq!(raw, data.len());
        for (i, block) in report.blocks.iter().enumerate() {
            assert_eq!(block.index, i);
        }
        assert!(report.blocks.last().unwrap().final_block);
    }
}
