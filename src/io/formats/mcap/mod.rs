// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP format implementation.
//!
//! This module provides the container primitives the merge engine is built on:
//! - Owned record types and their body encoding ([`records`])
//! - Streaming linear and index-assisted record readers ([`reader`])
//! - A chunking writer that produces a complete summary section ([`writer`])

// Re-export constants at module level for convenience
pub use constants::{
    MCAP_MAGIC, OP_CHANNEL, OP_CHUNK, OP_CHUNK_INDEX, OP_DATA_END, OP_FOOTER, OP_HEADER,
    OP_MESSAGE, OP_SCHEMA, OP_STATISTICS, OP_SUMMARY_OFFSET,
};

pub mod constants;
pub mod reader;
pub mod records;
pub mod writer;

// Re-exports
pub use reader::{
    IndexedRecordReader, LinearRecordReader, McapRecordReader, ReadSeek, RecordReader,
    RecordSource,
};
pub use records::{Attachment, Channel, Header, Message, Metadata, Record, Schema, Statistics};
pub use writer::{McapWriter, WriterOptions, DEFAULT_CHUNK_SIZE};
