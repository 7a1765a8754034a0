// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP merge engine.
//!
//! Merges any number of MCAP inputs into one output:
//! - [`remap`] - Local to global schema/channel id tables
//! - [`input`] - Input sources and per-input reader state
//! - [`scheduler`] - Time-ordered k-way fan-in and record dispatch
//! - [`stats`] - Statistics record accumulation
//! - [`options`] - Merge configuration
//!
//! [`McapMerger`] is the entry point.

pub mod input;
pub mod options;
pub mod remap;
pub mod scheduler;
pub mod stats;

pub use input::{InputAdapter, InputSource};
pub use options::MergeOptions;
pub use remap::IdentifierRemapper;
pub use scheduler::MergeScheduler;
pub use stats::StatisticsAccumulator;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::{MergeError, Result};
use crate::io::formats::mcap::records::{Header, Statistics};
use crate::io::formats::mcap::writer::{default_library, McapWriter};

/// Summary of a finished merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Number of inputs merged
    pub input_count: usize,
    /// Messages written
    pub message_count: u64,
    /// Schemas written
    pub schema_count: u64,
    /// Channels written
    pub channel_count: u64,
    /// Attachments forwarded
    pub attachment_count: u64,
    /// Metadata records forwarded
    pub metadata_count: u64,
    /// Chunks written (0 for flat output)
    pub chunk_count: u64,
    /// Earliest message log time (0 without messages)
    pub message_start_time: u64,
    /// Latest message log time (0 without messages)
    pub message_end_time: u64,
    /// Output profile
    pub profile: String,
    /// Total output size in bytes
    pub bytes_written: u64,
}

impl MergeStats {
    fn from_statistics(
        statistics: &Statistics,
        input_count: usize,
        profile: String,
        bytes_written: u64,
    ) -> Self {
        Self {
            input_count,
            message_count: statistics.message_count,
            schema_count: statistics.schema_count as u64,
            channel_count: statistics.channel_count as u64,
            attachment_count: statistics.attachment_count as u64,
            metadata_count: statistics.metadata_count as u64,
            chunk_count: statistics.chunk_count as u64,
            message_start_time: statistics.message_start_time,
            message_end_time: statistics.message_end_time,
            profile,
            bytes_written,
        }
    }
}

/// Profile for the merged output: the inputs' common profile, or empty when
/// they disagree.
pub fn output_profile<'a, I>(profiles: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut profiles = profiles.into_iter();
    let Some(first) = profiles.next() else {
        return String::new();
    };
    for profile in profiles {
        if profile != first {
            warn!(
                first = first,
                other = profile,
                "Inputs have different profiles, writing output with an empty profile"
            );
            return String::new();
        }
    }
    first.to_string()
}

/// MCAP merger.
///
/// Holds only configuration; every merge call builds fresh id tables,
/// statistics and queue, so one merger can be shared across threads.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use robomerge::{McapMerger, MergeOptions};
///
/// let merger = McapMerger::new(MergeOptions::default());
/// let stats = merger.merge_files(&["a.mcap", "b.mcap"], "merged.mcap")?;
/// println!("{} messages", stats.message_count);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct McapMerger {
    options: MergeOptions,
}

impl McapMerger {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    /// Get the options used for merging.
    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Merge `inputs` into `output`.
    ///
    /// Inputs are ordered: equal timestamps are emitted in input order.
    /// The output is complete only when this returns `Ok`.
    pub fn merge_inputs<W: Write>(
        &self,
        output: W,
        inputs: Vec<InputSource>,
    ) -> Result<MergeStats> {
        self.merge(output, inputs).map_err(|e| {
            error!(fields = ?e.log_fields(), "Merge failed: {}", e);
            e
        })
    }

    fn merge<W: Write>(&self, output: W, inputs: Vec<InputSource>) -> Result<MergeStats> {
        self.options.validate()?;
        if inputs.is_empty() {
            return Err(MergeError::invalid_options("at least one input is required"));
        }
        let input_count = inputs.len();

        let adapters = inputs
            .into_iter()
            .enumerate()
            .map(|(ordinal, source)| InputAdapter::open(ordinal, source, self.options.use_index))
            .collect::<Result<Vec<_>>>()?;

        let profile = output_profile(adapters.iter().map(|a| a.header().profile.as_str()));
        info!(
            inputs = input_count,
            profile = %profile,
            chunked = self.options.chunked,
            compression = self.options.compression.as_str(),
            "Starting merge"
        );

        let mut writer = McapWriter::new(output, self.options.writer_options())?;
        writer.write_header(&Header {
            profile: profile.clone(),
            library: default_library(),
        })?;

        let statistics = MergeScheduler::new(
            adapters,
            &mut writer,
            self.options.allow_duplicate_metadata,
        )
        .run()?;
        let statistics = writer.finish(statistics)?;

        let stats =
            MergeStats::from_statistics(&statistics, input_count, profile, writer.position());
        info!(
            messages = stats.message_count,
            schemas = stats.schema_count,
            channels = stats.channel_count,
            chunks = stats.chunk_count,
            bytes = stats.bytes_written,
            "Merge complete"
        );
        Ok(stats)
    }

    /// Merge the files at `inputs` into a new file at `output`.
    pub fn merge_files<P, Q>(&self, inputs: &[P], output: Q) -> Result<MergeStats>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let sources = inputs
            .iter()
            .map(InputSource::open)
            .collect::<Result<Vec<_>>>()?;
        let output = output.as_ref();
        let file = File::create(output)
            .map_err(|e| MergeError::io(format!("creating '{}'", output.display()), e))?;
        self.merge_inputs(BufWriter::new(file), sources)
    }
}
