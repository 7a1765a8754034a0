// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP writer tests.
//!
//! Files written by [`McapWriter`] must be readable by the `mcap` crate.

mod common;

use std::collections::BTreeMap;
use std::io::{BufWriter, Cursor};

use common::{read_messages, read_summary};
use robomerge::io::formats::mcap::constants::MCAP_MAGIC;
use robomerge::io::formats::mcap::{Channel, Header, Message, Schema, Statistics};
use robomerge::{Compression, McapWriter, WriterOptions};

fn write_sample(options: WriterOptions) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut writer = McapWriter::new(BufWriter::new(cursor), options).unwrap();
    writer
        .write_header(&Header {
            profile: "ros1".to_string(),
            library: "writer-test".to_string(),
        })
        .unwrap();
    writer
        .write_schema(&Schema {
            id: 1,
            name: "test/Type".to_string(),
            encoding: "ros1msg".to_string(),
            data: b"int32 value".to_vec(),
        })
        .unwrap();
    let mut metadata = BTreeMap::new();
    metadata.insert("key".to_string(), "value".to_string());
    writer
        .write_channel(&Channel {
            id: 1,
            schema_id: 1,
            topic: "/test/topic".to_string(),
            message_encoding: "ros1".to_string(),
            metadata,
        })
        .unwrap();
    for t in 0..10u64 {
        writer
            .write_message(&Message {
                channel_id: 1,
                sequence: t as u32,
                log_time: 1000 + t,
                publish_time: 1000 + t,
                data: (t as i32).to_le_bytes().to_vec(),
            })
            .unwrap();
    }
    let mut statistics = Statistics {
        message_count: 10,
        schema_count: 1,
        channel_count: 1,
        message_start_time: 1000,
        message_end_time: 1009,
        ..Default::default()
    };
    statistics.channel_message_counts.insert(1, 10);
    writer.finish(statistics).unwrap();
    writer.into_inner().into_inner().unwrap().into_inner()
}

#[test]
fn test_channel_record_format_readable_by_mcap_crate() {
    let bytes = write_sample(WriterOptions::default());

    assert_eq!(&bytes[0..8], MCAP_MAGIC);
    assert_eq!(&bytes[bytes.len() - 8..], MCAP_MAGIC);

    let summary = read_summary(&bytes);
    assert_eq!(summary.schemas.len(), 1);
    assert_eq!(summary.channels.len(), 1);
    let channel = summary.channels.values().next().unwrap();
    assert_eq!(channel.topic, "/test/topic");
    assert_eq!(channel.metadata.get("key"), Some(&"value".to_string()));
    let schema = channel.schema.as_ref().expect("channel schema");
    assert_eq!(schema.name, "test/Type");
    assert_eq!(&schema.data[..], b"int32 value");
}

#[test]
fn test_statistics_and_chunk_indexes() {
    let bytes = write_sample(WriterOptions::default().with_chunk_size(64));
    let summary = read_summary(&bytes);

    let stats = summary.stats.expect("statistics record");
    assert_eq!(stats.message_count, 10);
    assert_eq!(stats.message_start_time, 1000);
    assert_eq!(stats.message_end_time, 1009);
    assert_eq!(stats.chunk_count as usize, summary.chunk_indexes.len());
    assert!(summary.chunk_indexes.len() > 1);

    let mut previous_end = 0;
    for index in &summary.chunk_indexes {
        assert!(index.message_start_time >= previous_end);
        assert!(index.message_start_time <= index.message_end_time);
        assert_eq!(index.compression, "zstd");
        previous_end = index.message_end_time;
    }
}

#[test]
fn test_messages_readable_in_every_layout() {
    let layouts = [
        WriterOptions::default(),
        WriterOptions::default().with_compression(Compression::Lz4),
        WriterOptions::default().with_compression(Compression::None),
        WriterOptions::default().with_chunked(false),
        WriterOptions::default().with_crc(false),
    ];
    for options in layouts {
        let label = format!("{options:?}");
        let messages = read_messages(&write_sample(options));
        assert_eq!(messages.len(), 10, "{label}");
        for (i, message) in messages.iter().enumerate() {
            assert_eq!(message.log_time, 1000 + i as u64, "{label}");
            assert_eq!(message.data, (i as i32).to_le_bytes().to_vec(), "{label}");
        }
    }
}

#[test]
fn test_flat_layout_has_no_chunks() {
    let bytes = write_sample(WriterOptions::default().with_chunked(false));
    let summary = read_summary(&bytes);
    assert!(summary.chunk_indexes.is_empty());
    assert_eq!(summary.stats.expect("statistics record").chunk_count, 0);
}
