//! Compress command implementation.

use crate::utils::{create_progress_bar, space_savings};
use clap::ValueEnum;
use indicatif::ProgressBar;
use oxiflate_deflate::{DeflateConfig, DeflateEncoder, Deflater, ZlibEncoder};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stream framing for compressed output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw DEFLATE stream (RFC 1951)
    Raw,
    /// Zlib stream with header and Adler-32 trailer (RFC 1950)
    Zlib,
}

impl OutputFormat {
    /// File extension appended to the input name by default.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Raw => "deflate",
            Self::Zlib => "zz",
        }
    }
}

/// Options for the compress command.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    pub format: OutputFormat,
    pub level: u8,
    pub window_bits: u8,
    pub pending_symbols: usize,
    pub chunk_size: usize,
    pub progress: bool,
}

/// Default output path: the input path with the format extension appended.
pub fn default_output(input: &Path, format: OutputFormat) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

pub fn cmd_compress(
    input: &Path,
    output: Option<&Path>,
    options: &CompressOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if options.chunk_size == 0 {
        return Err("chunk size must be at least 1".into());
    }

    let config = DeflateConfig::from_level(options.level)
        .with_window_bits(options.window_bits)
        .with_pending_symbols(options.pending_symbols);
    config.validate()?;

    let output = output.map_or_else(|| default_output(input, options.format), Path::to_path_buf);
    let total = std::fs::metadata(input)?.len();
    let mut reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(&output)?);

    info!(
        input = %input.display(),
        output = %output.display(),
        format = ?options.format,
        "compressing"
    );

    let pb = create_progress_bar(total, options.progress);
    let (total_in, blocks) = match options.format {
        OutputFormat::Raw => {
            let mut encoder = DeflateEncoder::with_config(writer, config)?;
            pump(&mut reader, &mut encoder, options.chunk_size, &pb)?;
            encoder.try_finish()?;
            let stats = summarize(encoder.deflater());
            encoder.finish()?;
            stats
        }
        OutputFormat::Zlib => {
            let mut encoder = ZlibEncoder::with_config(writer, config)?;
            pump(&mut reader, &mut encoder, options.chunk_size, &pb)?;
            encoder.try_finish()?;
            let stats = summarize(encoder.encoder().deflater());
            encoder.finish()?;
            stats
        }
    };
    pb.finish_with_message("done");

    let compressed = std::fs::metadata(&output)?.len();
    println!(
        "{} -> {}: {} -> {} bytes ({:.1}% saved, {} blocks)",
        input.display(),
        output.display(),
        total_in,
        compressed,
        space_savings(total_in, compressed),
        blocks
    );

    Ok(())
}

/// Copy the reader into the encoder `chunk_size` bytes at a time.
fn pump<R: Read, W: Write>(
    reader: &mut R,
    encoder: &mut W,
    chunk_size: usize,
    pb: &ProgressBar,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        encoder.write_all(&buf[..n])?;
        pb.inc(n as u64);
    }
}

fn summarize(deflater: &Deflater) -> (u64, u64) {
    debug!(
        total_in = deflater.total_in(),
        checksum = %format!("{:08x}", deflater.checksum()),
        "stream finished"
    );
    (deflater.total_in(), deflater.block_count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("dir/data.bin"), OutputFormat::Raw),
            PathBuf::from("dir/data.bin.deflate")
        );
        assert_eq!(
            default_output(Path::new("data"), OutputFormat::Zlib),
            PathBuf::from("data.zz")
        );
    }

    #[test]
    fn test_pump_feeds_encoder() {
        let data = b"pump pump pump pump pump pump".repeat(50);
        let mut encoder = DeflateEncoder::new(Vec::new(), 6);
        pump(&mut &data[..], &mut encoder, 7, &ProgressBar::hidden()).unwrap();
        assert_eq!(encoder.deflater().total_in(), data.len() as u64);

        let compressed = encoder.finish().unwrap();
        assert_eq!(compressed, oxiflate_deflate::deflate(&data, 6).unwrap());
    }
}
