//! OxiFlate CLI - streaming DEFLATE compressor
//!
//! Compresses files to raw DEFLATE (RFC 1951) or zlib (RFC 1950) streams and
//! reports the block decisions the encoder makes.

mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::{CompressOptions, OutputFormat, cmd_compress, cmd_stats};
use oxiflate_deflate::block::DEFAULT_PENDING_SYMBOLS;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oxiflate")]
#[command(author, version, about = "Pure Rust DEFLATE stream compressor")]
#[command(long_about = "
OxiFlate compresses files with LZ77 matching and length-limited canonical
Huffman coding, choosing the smallest of stored, static and dynamic blocks.

Examples:
  oxiflate compress data.bin
  oxiflate compress data.bin -o data.zz --format zlib -l 9
  oxiflate compress big.log --window-bits 12 --chunk-size 65536 -P
  oxiflate stats data.bin
  oxiflate stats data.bin -l 1 --json
  RUST_LOG=oxiflate_deflate=debug oxiflate compress data.bin
")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Output file (defaults to the input name plus .deflate or .zz)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stream framing
        #[arg(short, long, value_enum, default_value = "raw")]
        format: OutputFormat,

        /// Compression level (0-9)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Window size as a power of two (10-15)
        #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u8).range(10..=15))]
        window_bits: u8,

        /// Symbols buffered before a block is forced out
        #[arg(long, default_value_t = DEFAULT_PENDING_SYMBOLS)]
        pending_symbols: usize,

        /// Bytes handed to the encoder per call
        #[arg(long, default_value_t = 1024)]
        chunk_size: usize,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Show the block decisions for a file
    #[command(alias = "s")]
    Stats {
        /// File to analyse
        input: PathBuf,

        /// Compression level (0-9)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            level,
            window_bits,
            pending_symbols,
            chunk_size,
            progress,
        } => cmd_compress(
            &input,
            output.as_deref(),
            &CompressOptions {
                format,
                level,
                window_bits,
                pending_symbols,
                chunk_size,
                progress,
            },
        ),
        Commands::Stats { input, level, json } => cmd_stats(&input, level, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
