// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Robomerge CLI
//!
//! Merge MCAP files into one time-ordered output.
//!
//! ## Usage
//!
//! ```sh
//! # Merge two recordings with default settings (zstd chunks)
//! robomerge -o merged.mcap front.mcap rear.mcap
//!
//! # LZ4 chunks of 8 MiB, reading inputs through their index
//! robomerge --compression lz4 --chunk-size 8388608 --use-index -o out.mcap *.mcap
//!
//! # Flat output to stdout
//! robomerge --no-chunks -o - a.mcap b.mcap > merged.mcap
//! ```

mod common;

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser};
use common::{format_duration, format_size, format_timestamp, init_logging, Result};
use robomerge::{Compression, InputSource, McapMerger, MergeOptions, MergeStats};

/// Robomerge - merge MCAP files
///
/// Messages from all inputs are written in log time order. Schema and
/// channel ids are renumbered so inputs never collide.
#[derive(Parser, Debug)]
#[command(name = "robomerge")]
#[command(about = "Merge MCAP files into a single time-ordered file", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Input MCAP files ("-" reads standard input)
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output file ("-" writes to standard output)
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Chunk compression
    #[arg(long, value_name = "zstd|lz4|none")]
    compression: Option<Compression>,

    /// Uncompressed chunk size in bytes
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<u64>,

    /// Write messages directly into the data section instead of chunks
    #[arg(long, overrides_with = "chunks")]
    no_chunks: bool,

    /// Write messages into compressed chunks (default)
    #[arg(long, overrides_with = "no_chunks")]
    chunks: bool,

    /// Do not compute CRCs
    #[arg(long, overrides_with = "crc")]
    no_crc: bool,

    /// Compute CRCs (default)
    #[arg(long, overrides_with = "no_crc")]
    crc: bool,

    /// Forward metadata records whose name was already seen
    #[arg(long, overrides_with = "reject_duplicate_metadata")]
    allow_duplicate_metadata: bool,

    /// Fail on metadata records whose name was already seen (default)
    #[arg(long, overrides_with = "allow_duplicate_metadata")]
    reject_duplicate_metadata: bool,

    /// Read seekable inputs through their summary index; messages of
    /// overlapping chunks are still yielded in log time order
    #[arg(long, overrides_with = "no_index")]
    use_index: bool,

    /// Read every input front to back (default)
    #[arg(long, overrides_with = "use_index")]
    no_index: bool,

    /// Load options from a TOML file; flags override it in either direction
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print merge statistics as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> Result<MergeOptions> {
        let mut options = match &self.config {
            Some(path) => MergeOptions::from_toml_file(path)?,
            None => MergeOptions::default(),
        };
        if let Some(compression) = self.compression {
            options.compression = compression;
        }
        if let Some(chunk_size) = self.chunk_size {
            options.chunk_size = chunk_size;
        }
        if let Some(chunked) = switch(self.chunks, self.no_chunks) {
            options.chunked = chunked;
        }
        if let Some(include_crc) = switch(self.crc, self.no_crc) {
            options.include_crc = include_crc;
        }
        if let Some(allow) = switch(self.allow_duplicate_metadata, self.reject_duplicate_metadata) {
            options.allow_duplicate_metadata = allow;
        }
        if let Some(use_index) = switch(self.use_index, self.no_index) {
            options.use_index = use_index;
        }
        options.validate()?;
        Ok(options)
    }

    fn sources(&self) -> Result<Vec<InputSource>> {
        let mut stdin_used = false;
        let mut sources = Vec::with_capacity(self.inputs.len());
        for path in &self.inputs {
            if is_stdio(path) {
                if stdin_used {
                    anyhow::bail!("standard input can only be merged once");
                }
                stdin_used = true;
                sources.push(InputSource::stream("<stdin>", io::stdin()));
            } else {
                sources.push(InputSource::open(path)?);
            }
        }
        Ok(sources)
    }
}

/// Value of an `--x` / `--no-x` flag pair, `None` when neither was given.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Merge into a temporary file next to `output` and move it into place
/// only when the merge succeeded.
fn merge_to_file(merger: &McapMerger, inputs: Vec<InputSource>, output: &Path) -> Result<MergeStats> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    let stats = merger.merge_inputs(BufWriter::new(temp.as_file_mut()), inputs)?;
    temp.persist(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(stats)
}

fn print_summary(out: &mut dyn Write, stats: &MergeStats, output: &Path) -> io::Result<()> {
    writeln!(
        out,
        "Merged {} input(s) into {}",
        stats.input_count,
        output.display()
    )?;
    if !stats.profile.is_empty() {
        writeln!(out, "  Profile:     {}", stats.profile)?;
    }
    writeln!(out, "  Messages:    {}", stats.message_count)?;
    writeln!(out, "  Schemas:     {}", stats.schema_count)?;
    writeln!(out, "  Channels:    {}", stats.channel_count)?;
    writeln!(out, "  Attachments: {}", stats.attachment_count)?;
    writeln!(out, "  Metadata:    {}", stats.metadata_count)?;
    writeln!(out, "  Chunks:      {}", stats.chunk_count)?;
    if stats.message_count > 0 {
        writeln!(
            out,
            "  Time range:  {} - {} ({})",
            format_timestamp(stats.message_start_time),
            format_timestamp(stats.message_end_time),
            format_duration(stats.message_end_time - stats.message_start_time)
        )?;
    }
    writeln!(out, "  Size:        {}", format_size(stats.bytes_written))?;
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = cli.options()?;
    let merger = McapMerger::new(options);
    let inputs = cli.sources()?;

    let to_stdout = is_stdio(&cli.output);
    let stats = if to_stdout {
        let stdout = io::stdout();
        merger.merge_inputs(BufWriter::new(stdout.lock()), inputs)?
    } else {
        merge_to_file(&merger, inputs, &cli.output)?
    };

    // Keep the report off stdout when stdout carries the MCAP data
    let mut report: Box<dyn Write> = if to_stdout {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };
    if cli.json {
        writeln!(report, "{}", serde_json::to_string_pretty(&stats)?)?;
    } else {
        print_summary(&mut report, &stats, &cli.output)?;
    }
    Ok(())
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
