// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for robomerge.
//!
//! Every error is fatal to the merge that raised it:
//! - Structural problems in an input file
//! - Channel/schema reference violations
//! - Identifier space exhaustion
//! - Metadata name collisions
//! - I/O failures on either side of the merge
//! - Invalid configuration

use thiserror::Error;

/// Errors that can occur while reading, merging or writing MCAP data.
#[derive(Debug, Error)]
pub enum MergeError {
    /// An input failed structural validation while being read
    #[error("Malformed input '{input}': {reason}")]
    MalformedInput {
        /// Input name (path or caller-supplied label)
        input: String,
        /// What was wrong
        reason: String,
    },

    /// A channel references a schema that its own input never declared
    #[error("Input '{input}': channel {channel_id} references undeclared schema {schema_id}")]
    SchemaChannelConsistency {
        /// Input name
        input: String,
        /// Local channel ID
        channel_id: u16,
        /// Local schema ID the channel points at
        schema_id: u16,
    },

    /// More global identifiers would be needed than fit in a u16
    #[error("Identifier space exhausted: more than {} {kind} identifiers required", u16::MAX)]
    IdentifierSpaceExhausted {
        /// "schema" or "channel"
        kind: &'static str,
    },

    /// Two metadata records with the same name were forwarded
    #[error("Duplicate metadata record name '{name}'")]
    DuplicateMetadata {
        /// Metadata record name
        name: String,
    },

    /// Read or write failure
    #[error("IO error in {context}: {source}")]
    Io {
        /// Operation that failed
        context: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Rejected configuration
    #[error("Invalid options: {reason}")]
    InvalidOptions {
        /// Why the options were rejected
        reason: String,
    },
}

impl MergeError {
    /// Create a malformed input error.
    pub fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        MergeError::MalformedInput {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema/channel consistency error.
    pub fn schema_channel(input: impl Into<String>, channel_id: u16, schema_id: u16) -> Self {
        MergeError::SchemaChannelConsistency {
            input: input.into(),
            channel_id,
            schema_id,
        }
    }

    /// Create an identifier exhaustion error.
    pub fn exhausted(kind: &'static str) -> Self {
        MergeError::IdentifierSpaceExhausted { kind }
    }

    /// Create a duplicate metadata error.
    pub fn duplicate_metadata(name: impl Into<String>) -> Self {
        MergeError::DuplicateMetadata { name: name.into() }
    }

    /// Wrap an I/O error with the operation that failed.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        MergeError::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid options error.
    pub fn invalid_options(reason: impl Into<String>) -> Self {
        MergeError::InvalidOptions {
            reason: reason.into(),
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            MergeError::MalformedInput { input, reason } => {
                vec![("input", input.clone()), ("reason", reason.clone())]
            }
            MergeError::SchemaChannelConsistency {
                input,
                channel_id,
                schema_id,
            } => vec![
                ("input", input.clone()),
                ("channel_id", channel_id.to_string()),
                ("schema_id", schema_id.to_string()),
            ],
            MergeError::IdentifierSpaceExhausted { kind } => vec![("kind", kind.to_string())],
            MergeError::DuplicateMetadata { name } => vec![("name", name.clone())],
            MergeError::Io { context, source } => {
                vec![("context", context.clone()), ("error", source.to_string())]
            }
            MergeError::InvalidOptions { reason } => vec![("reason", reason.clone())],
        }
    }
}

impl From<std::io::Error> for MergeError {
    fn from(err: std::io::Error) -> Self {
        MergeError::io("IO", err)
    }
}

/// Result type for robomerge operations.
pub type Result<T> = std::result::Result<T, MergeError>;
