// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout robomerge.
//!
//! This module provides the foundational types for the library:
//! - [`MergeError`] - Error taxonomy shared by readers, writer and merge engine
//! - [`Compression`] - Chunk compression identifier

pub mod error;

pub use error::{MergeError, Result};

use serde::{Deserialize, Serialize};

/// Chunk compression format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Zstandard compression
    #[default]
    Zstd,
    /// LZ4 frame compression
    Lz4,
    /// Records stored uncompressed
    None,
}

/// Error returned when parsing a `Compression` from string fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseCompressionError {
    _private: (),
}

impl std::fmt::Display for ParseCompressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid compression name, expected 'zstd', 'lz4', or 'none'"
        )
    }
}

impl std::error::Error for ParseCompressionError {}

impl std::str::FromStr for Compression {
    type Err = ParseCompressionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zstd" => Ok(Compression::Zstd),
            "lz4" => Ok(Compression::Lz4),
            "none" | "" => Ok(Compression::None),
            _ => Err(ParseCompressionError { _private: () }),
        }
    }
}

impl Compression {
    /// Name stored in the chunk record. Uncompressed chunks use the empty string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Zstd => "zstd",
            Compression::Lz4 => "lz4",
            Compression::None => "",
        }
    }

    /// Parse the compression field of a chunk record.
    pub fn from_record(name: &str) -> Option<Self> {
        match name {
            "zstd" => Some(Compression::Zstd),
            "lz4" => Some(Compression::Lz4),
            "" => Some(Compression::None),
            _ => None,
        }
    }
}
