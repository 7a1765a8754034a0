// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Merge configuration.
//!
//! Options can be built in code with the `with_*` methods or loaded from a
//! TOML file. Missing keys take their default values:
//!
//! ```toml
//! chunked = true
//! chunk_size = 4194304
//! compression = "zstd"    # "zstd", "lz4" or "none"
//! include_crc = true
//! use_index = false
//! allow_duplicate_metadata = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Compression, MergeError, Result};
use crate::io::formats::mcap::writer::{default_library, WriterOptions, DEFAULT_CHUNK_SIZE};

/// Options for a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeOptions {
    /// Write messages into compressed chunks (flat data section when false)
    pub chunked: bool,

    /// Uncompressed chunk size threshold in bytes
    pub chunk_size: u64,

    /// Chunk compression
    pub compression: Compression,

    /// Compute CRCs for chunks, attachments, data and summary sections
    pub include_crc: bool,

    /// Read seekable inputs through their summary index
    pub use_index: bool,

    /// Forward metadata records whose name was already seen
    pub allow_duplicate_metadata: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            chunked: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression: Compression::Zstd,
            include_crc: true,
            use_index: false,
            allow_duplicate_metadata: false,
        }
    }
}

impl MergeOptions {
    /// Parse options from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: Self = toml::from_str(content)
            .map_err(|e| MergeError::invalid_options(format!("failed to parse TOML: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MergeError::io(format!("reading config '{}'", path.display()), e))?;
        Self::from_toml_str(&content)
    }

    /// Check option consistency.
    pub fn validate(&self) -> Result<()> {
        if self.chunked && self.chunk_size == 0 {
            return Err(MergeError::invalid_options("chunk size must be positive"));
        }
        Ok(())
    }

    /// Write chunked or flat output.
    pub fn with_chunked(mut self, chunked: bool) -> Self {
        self.chunked = chunked;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_crc(mut self, include_crc: bool) -> Self {
        self.include_crc = include_crc;
        self
    }

    /// Use summary indexes of seekable inputs.
    pub fn with_index(mut self, use_index: bool) -> Self {
        self.use_index = use_index;
        self
    }

    pub fn with_allow_duplicate_metadata(mut self, allow: bool) -> Self {
        self.allow_duplicate_metadata = allow;
        self
    }

    /// Writer settings derived from these options.
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            chunked: self.chunked,
            chunk_size: self.chunk_size,
            compression: self.compression,
            include_crc: self.include_crc,
            library: default_library(),
        }
    }
}
