// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Statistics accumulation over emitted records.

use std::collections::BTreeMap;

use crate::io::formats::mcap::records::Statistics;

/// Observes every record written to the output and builds its Statistics.
#[derive(Debug, Default)]
pub struct StatisticsAccumulator {
    message_count: u64,
    schema_count: u16,
    channel_count: u32,
    attachment_count: u32,
    metadata_count: u32,
    message_start_time: u64,
    message_end_time: u64,
    channel_message_counts: BTreeMap<u16, u64>,
}

impl StatisticsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_schema(&mut self) {
        self.schema_count = self.schema_count.saturating_add(1);
    }

    /// A channel is listed in the message counts even if it never carries a message.
    pub fn observe_channel(&mut self, channel_id: u16) {
        self.channel_count += 1;
        self.channel_message_counts.entry(channel_id).or_insert(0);
    }

    pub fn observe_message(&mut self, channel_id: u16, log_time: u64) {
        if self.message_count == 0 {
            self.message_start_time = log_time;
            self.message_end_time = log_time;
        } else {
            self.message_start_time = self.message_start_time.min(log_time);
            self.message_end_time = self.message_end_time.max(log_time);
        }
        self.message_count += 1;
        *self.channel_message_counts.entry(channel_id).or_insert(0) += 1;
    }

    pub fn observe_attachment(&mut self) {
        self.attachment_count += 1;
    }

    pub fn observe_metadata(&mut self) {
        self.metadata_count += 1;
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Build the Statistics record. The chunk count is left at 0 for the
    /// writer to fill in.
    pub fn finish(self) -> Statistics {
        Statistics {
            message_count: self.message_count,
            schema_count: self.schema_count,
            channel_count: self.channel_count,
            attachment_count: self.attachment_count,
            metadata_count: self.metadata_count,
            chunk_count: 0,
            message_start_time: self.message_start_time,
            message_end_time: self.message_end_time,
            channel_message_counts: self.channel_message_counts,
        }
    }
}
