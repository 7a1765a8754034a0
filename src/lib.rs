// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Robomerge
//!
//! Streaming merge of MCAP robotics log files.
//!
//! Any number of independently recorded MCAP files are combined into one
//! valid output file:
//! - Schema and channel ids of every input are remapped into one collision
//!   free id space ([`merge::remap`])
//! - Messages from all inputs are interleaved by log time, ties broken by
//!   input order ([`merge::scheduler`])
//! - The output is written chunked (zstd, lz4 or uncompressed) or flat, with
//!   a complete summary section ([`io::formats::mcap::writer`])
//!
//! Memory use is bounded by the number of inputs and the chunk size, not by
//! file sizes.
//!
//! ## Architecture
//!
//! - `core/` - Error type and shared enums
//! - `io/formats/mcap/` - MCAP record types, readers and writer
//! - `merge/` - Merge engine and its configuration
//!
//! ## Example: Merging files
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use robomerge::{Compression, McapMerger, MergeOptions};
//!
//! let options = MergeOptions::default()
//!     .with_compression(Compression::Lz4)
//!     .with_chunk_size(8 * 1024 * 1024);
//! let stats = McapMerger::new(options).merge_files(&["front.mcap", "rear.mcap"], "all.mcap")?;
//! println!("{} messages on {} channels", stats.message_count, stats.channel_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Merging in-memory streams
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::io::Cursor;
//! use robomerge::{InputSource, McapMerger};
//!
//! # let (a, b): (Vec<u8>, Vec<u8>) = (Vec::new(), Vec::new());
//! let inputs = vec![
//!     InputSource::stream("a", Cursor::new(a)),
//!     InputSource::stream("b", Cursor::new(b)),
//! ];
//! let mut output = Vec::new();
//! McapMerger::default().merge_inputs(&mut output, inputs)?;
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{Compression, MergeError, Result};

// Container format I/O
pub mod io;

pub use io::formats::mcap::{
    McapRecordReader, McapWriter, Record, RecordSource, Statistics, WriterOptions,
};

// Merge engine
pub mod merge;

pub use merge::{InputSource, McapMerger, MergeOptions, MergeStats};
