// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.
//!
//! Inputs are built with the crate's own writer so that the local schema and
//! channel ids in a fixture are exactly the ones the test asks for. Outputs
//! are decoded with the independent `mcap` crate.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use robomerge::io::formats::mcap::{
    Attachment, Channel, Header, LinearRecordReader, Message, Metadata, RecordReader, Schema,
    Statistics,
};
use robomerge::{
    InputSource, McapMerger, McapWriter, MergeOptions, MergeStats, Result, WriterOptions,
};

// ============================================================================
// Input builder
// ============================================================================

/// Builds an MCAP file in memory with caller-chosen ids.
pub struct McapBuilder {
    writer: McapWriter<Vec<u8>>,
    stats: Statistics,
}

impl McapBuilder {
    /// Chunked (zstd) file with the given profile.
    pub fn new(profile: &str) -> Self {
        Self::with_options(profile, WriterOptions::default())
    }

    pub fn with_options(profile: &str, options: WriterOptions) -> Self {
        let mut writer = McapWriter::new(Vec::new(), options).expect("writer options");
        writer
            .write_header(&Header {
                profile: profile.to_string(),
                library: "fixture".to_string(),
            })
            .expect("header");
        Self {
            writer,
            stats: Statistics::default(),
        }
    }

    pub fn schema(mut self, id: u16, name: &str) -> Self {
        self.writer
            .write_schema(&Schema {
                id,
                name: name.to_string(),
                encoding: "jsonschema".to_string(),
                data: format!("{{\"title\":\"{name}\"}}").into_bytes(),
            })
            .expect("schema");
        self.stats.schema_count += 1;
        self
    }

    pub fn channel(mut self, id: u16, schema_id: u16, topic: &str) -> Self {
        self.writer
            .write_channel(&Channel {
                id,
                schema_id,
                topic: topic.to_string(),
                message_encoding: "json".to_string(),
                metadata: BTreeMap::new(),
            })
            .expect("channel");
        self.stats.channel_count += 1;
        self
    }

    pub fn message(mut self, channel_id: u16, log_time: u64) -> Self {
        self.writer
            .write_message(&Message {
                channel_id,
                sequence: log_time as u32,
                log_time,
                publish_time: log_time,
                data: format!("{{\"t\":{log_time}}}").into_bytes(),
            })
            .expect("message");
        self.stats.message_count += 1;
        self
    }

    /// `count` messages on `channel_id` with log times `0..count`.
    pub fn messages(mut self, channel_id: u16, count: u64) -> Self {
        for t in 0..count {
            self = self.message(channel_id, t);
        }
        self
    }

    pub fn attachment(mut self, name: &str, data: &[u8]) -> Self {
        self.writer
            .write_attachment(&Attachment {
                log_time: 1,
                create_time: 2,
                name: name.to_string(),
                media_type: "application/octet-stream".to_string(),
                data: data.to_vec(),
            })
            .expect("attachment");
        self.stats.attachment_count += 1;
        self
    }

    pub fn metadata(mut self, name: &str, entries: &[(&str, &str)]) -> Self {
        self.writer
            .write_metadata(&Metadata {
                name: name.to_string(),
                metadata: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
            .expect("metadata");
        self.stats.metadata_count += 1;
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.writer.finish(self.stats).expect("finish");
        self.writer.into_inner()
    }
}

/// One schema, one channel on `topic`, 100 messages at log times 0..100.
pub fn prep_input(schema_id: u16, channel_id: u16, topic: &str) -> Vec<u8> {
    let mut builder = McapBuilder::new("testprofile");
    if schema_id != 0 {
        builder = builder.schema(schema_id, "");
    }
    builder
        .channel(channel_id, schema_id, topic)
        .messages(channel_id, 100)
        .build()
}

// ============================================================================
// Merging
// ============================================================================

/// Merge in-memory files, named `input0`, `input1`, ...
pub fn merge_bytes(options: MergeOptions, files: Vec<Vec<u8>>) -> Result<(MergeStats, Vec<u8>)> {
    let inputs = files
        .into_iter()
        .enumerate()
        .map(|(i, bytes)| InputSource::stream(format!("input{i}"), Cursor::new(bytes)))
        .collect();
    let mut output = Vec::new();
    let stats = McapMerger::new(options).merge_inputs(&mut output, inputs)?;
    Ok((stats, output))
}

/// Same as [`merge_bytes`] with seekable sources.
pub fn merge_bytes_seekable(
    options: MergeOptions,
    files: Vec<Vec<u8>>,
) -> Result<(MergeStats, Vec<u8>)> {
    let inputs = files
        .into_iter()
        .enumerate()
        .map(|(i, bytes)| InputSource::seekable(format!("input{i}"), Cursor::new(bytes)))
        .collect();
    let mut output = Vec::new();
    let stats = McapMerger::new(options).merge_inputs(&mut output, inputs)?;
    Ok((stats, output))
}

// ============================================================================
// Output inspection (independent decoder)
// ============================================================================

/// A decoded output message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub topic: String,
    pub channel_id: u16,
    pub schema_id: u16,
    pub sequence: u32,
    pub log_time: u64,
    pub data: Vec<u8>,
}

/// All messages of an output file, in file order.
pub fn read_messages(bytes: &[u8]) -> Vec<DecodedMessage> {
    mcap::MessageStream::new(bytes)
        .expect("mcap crate failed to open output")
        .map(|message| {
            let message = message.expect("mcap crate failed to read message");
            DecodedMessage {
                topic: message.channel.topic.clone(),
                channel_id: message.channel.id,
                schema_id: message.channel.schema.as_ref().map_or(0, |s| s.id),
                sequence: message.sequence,
                log_time: message.log_time,
                data: message.data.to_vec(),
            }
        })
        .collect()
}

/// Message count per topic.
pub fn topic_counts(bytes: &[u8]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for message in read_messages(bytes) {
        *counts.entry(message.topic).or_insert(0) += 1;
    }
    counts
}

/// Summary section of an output file.
pub fn read_summary(bytes: &[u8]) -> mcap::Summary {
    mcap::Summary::read(bytes)
        .expect("mcap crate failed to read summary")
        .expect("output has no summary section")
}

/// Schema id -> schema name from the summary.
pub fn summary_schema_names(bytes: &[u8]) -> BTreeMap<u16, String> {
    read_summary(bytes)
        .schemas
        .iter()
        .map(|(id, schema)| (*id, schema.name.clone()))
        .collect()
}

/// Channel topic -> (channel id, schema id) from the summary.
pub fn summary_channels(bytes: &[u8]) -> BTreeMap<String, (u16, u16)> {
    read_summary(bytes)
        .channels
        .values()
        .map(|c| (c.topic.clone(), (c.id, c.schema.as_ref().map_or(0, |s| s.id))))
        .collect()
}

/// Header profile as read back by the crate's own reader.
pub fn output_profile(bytes: &[u8]) -> String {
    let reader =
        LinearRecordReader::new("output", Cursor::new(bytes.to_vec())).expect("output header");
    reader.header().profile.clone()
}
