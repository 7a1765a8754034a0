// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! K-way time-ordered fan-in over all inputs.
//!
//! Each input buffers at most one message. The queue holds one
//! `(log_time, ordinal)` key per input with a buffered message; equal
//! timestamps leave in input order. Everything that is not a message is
//! forwarded as soon as it is pulled.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::io::Write;

use tracing::{debug, trace};

use crate::core::{MergeError, Result};
use crate::io::formats::mcap::records::{Channel, Message, Metadata, Record, Schema, Statistics};
use crate::io::formats::mcap::writer::McapWriter;
use crate::merge::input::InputAdapter;
use crate::merge::remap::IdentifierRemapper;
use crate::merge::stats::StatisticsAccumulator;

/// Drives one merge from the inputs into the writer.
pub struct MergeScheduler<'w, W: Write> {
    inputs: Vec<InputAdapter>,
    writer: &'w mut McapWriter<W>,
    remapper: IdentifierRemapper,
    stats: StatisticsAccumulator,
    queue: BinaryHeap<Reverse<(u64, usize)>>,
    metadata_names: HashSet<String>,
    allow_duplicate_metadata: bool,
}

impl<'w, W: Write> MergeScheduler<'w, W> {
    pub fn new(
        inputs: Vec<InputAdapter>,
        writer: &'w mut McapWriter<W>,
        allow_duplicate_metadata: bool,
    ) -> Self {
        let capacity = inputs.len();
        Self {
            inputs,
            writer,
            remapper: IdentifierRemapper::new(),
            stats: StatisticsAccumulator::new(),
            queue: BinaryHeap::with_capacity(capacity),
            metadata_names: HashSet::new(),
            allow_duplicate_metadata,
        }
    }

    /// Merge every input and return the statistics of the emitted records.
    pub fn run(mut self) -> Result<Statistics> {
        for ordinal in 0..self.inputs.len() {
            self.refill(ordinal)?;
        }

        while let Some(Reverse((log_time, ordinal))) = self.queue.pop() {
            let Some(message) = self.inputs[ordinal].take_pending() else {
                continue;
            };
            trace!(input = ordinal, log_time, channel = message.channel_id, "Emit message");
            self.writer.write_message(&message)?;
            self.stats.observe_message(message.channel_id, message.log_time);
            self.refill(ordinal)?;
        }

        debug!(
            inputs = self.inputs.len(),
            schemas = self.remapper.schema_count(),
            channels = self.remapper.channel_count(),
            messages = self.stats.message_count(),
            "All inputs exhausted"
        );
        Ok(self.stats.finish())
    }

    /// Pull records from `ordinal` until a message is buffered or the input ends.
    fn refill(&mut self, ordinal: usize) -> Result<()> {
        if self.inputs[ordinal].is_exhausted() {
            return Ok(());
        }
        loop {
            match self.inputs[ordinal].next_record()? {
                Some(record) => {
                    if let Some(message) = self.dispatch(ordinal, record)? {
                        self.queue.push(Reverse((message.log_time, ordinal)));
                        self.inputs[ordinal].set_pending(message);
                        return Ok(());
                    }
                }
                None => return self.finish_input(ordinal),
            }
        }
    }

    /// Route one record. Returns the message, remapped, when the record is one.
    fn dispatch(&mut self, ordinal: usize, record: Record) -> Result<Option<Message>> {
        match record {
            Record::Schema(schema) => {
                self.inputs[ordinal].declare_schema(schema);
                Ok(None)
            }
            Record::Channel(channel) => {
                self.handle_channel(ordinal, channel)?;
                Ok(None)
            }
            Record::Message(mut message) => {
                let Some(channel_id) = self.remapper.channel_id(ordinal, message.channel_id)
                else {
                    return Err(MergeError::malformed(
                        self.inputs[ordinal].name(),
                        format!(
                            "message references undeclared channel {}",
                            message.channel_id
                        ),
                    ));
                };
                message.channel_id = channel_id;
                Ok(Some(message))
            }
            Record::Attachment(attachment) => {
                self.writer.write_attachment(&attachment)?;
                self.stats.observe_attachment();
                Ok(None)
            }
            Record::Metadata(metadata) => {
                self.handle_metadata(&metadata)?;
                Ok(None)
            }
        }
    }

    fn handle_channel(&mut self, ordinal: usize, channel: Channel) -> Result<()> {
        let input = &self.inputs[ordinal];
        let schema = if channel.schema_id == 0 {
            None
        } else {
            match input.declared_schema(channel.schema_id) {
                Some(schema) => Some(schema.clone()),
                None => {
                    return Err(MergeError::schema_channel(
                        input.name(),
                        channel.id,
                        channel.schema_id,
                    ))
                }
            }
        };

        let registration = self.remapper.register_channel(ordinal, &channel)?;
        if registration.new_schema {
            if let Some(schema) = schema {
                self.emit_schema(Schema {
                    id: registration.schema_id,
                    ..schema
                })?;
            }
        }
        if registration.new_channel {
            debug!(
                input = ordinal,
                topic = %channel.topic,
                local_id = channel.id,
                global_id = registration.channel_id,
                schema_id = registration.schema_id,
                "Registered channel"
            );
            let channel = Channel {
                id: registration.channel_id,
                schema_id: registration.schema_id,
                ..channel
            };
            self.writer.write_channel(&channel)?;
            self.stats.observe_channel(channel.id);
        }
        Ok(())
    }

    fn emit_schema(&mut self, schema: Schema) -> Result<()> {
        self.writer.write_schema(&schema)?;
        self.stats.observe_schema();
        Ok(())
    }

    fn handle_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        if !self.metadata_names.insert(metadata.name.clone()) && !self.allow_duplicate_metadata {
            return Err(MergeError::duplicate_metadata(&metadata.name));
        }
        self.writer.write_metadata(metadata)?;
        self.stats.observe_metadata();
        Ok(())
    }

    /// Mark `ordinal` exhausted and emit the schemas it declared but no
    /// channel referenced.
    fn finish_input(&mut self, ordinal: usize) -> Result<()> {
        self.inputs[ordinal].mark_exhausted();
        for schema in self.inputs[ordinal].take_declared_schemas() {
            let registration = self.remapper.register_schema(ordinal, schema.id)?;
            if registration.is_new {
                self.emit_schema(Schema {
                    id: registration.schema_id,
                    ..schema
                })?;
            }
        }
        debug!(input = ordinal, name = %self.inputs[ordinal].name(), "Input exhausted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::formats::mcap::records::Header;
    use crate::io::formats::mcap::writer::WriterOptions;
    use crate::merge::input::InputSource;
    use std::collections::BTreeMap;
    use std::io::Cursor;

    struct Fixture {
        writer: McapWriter<Vec<u8>>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut writer =
                McapWriter::new(Vec::new(), WriterOptions::default().with_chunked(false)).unwrap();
            writer.write_header(&Header::default()).unwrap();
            Self { writer }
        }

        fn schema(&mut self, id: u16) -> &mut Self {
            self.writer
                .write_schema(&Schema {
                    id,
                    name: format!("schema_{id}"),
                    encoding: "jsonschema".to_string(),
                    data: Vec::new(),
                })
                .unwrap();
            self
        }

        fn channel(&mut self, id: u16, schema_id: u16) -> &mut Self {
            self.writer
                .write_channel(&Channel {
                    id,
                    schema_id,
                    topic: format!("/t{id}"),
                    message_encoding: "json".to_string(),
                    metadata: BTreeMap::new(),
                })
                .unwrap();
            self
        }

        fn message(&mut self, channel_id: u16, log_time: u64) -> &mut Self {
            self.writer
                .write_message(&Message {
                    channel_id,
                    sequence: 0,
                    log_time,
                    publish_time: log_time,
                    data: Vec::new(),
                })
                .unwrap();
            self
        }

        fn metadata(&mut self, name: &str) -> &mut Self {
            self.writer
                .write_metadata(&Metadata {
                    name: name.to_string(),
                    metadata: BTreeMap::new(),
                })
                .unwrap();
            self
        }

        fn build(mut self) -> Vec<u8> {
            self.writer.finish(Statistics::default()).unwrap();
            self.writer.into_inner()
        }
    }

    fn run(files: Vec<Vec<u8>>, allow_duplicate_metadata: bool) -> Result<(Statistics, Vec<u8>)> {
        let inputs = files
            .into_iter()
            .enumerate()
            .map(|(i, bytes)| {
                let source = InputSource::stream(format!("in{i}"), Cursor::new(bytes));
                InputAdapter::open(i, source, false)
            })
            .collect::<Result<Vec<_>>>()?;
        let mut writer =
            McapWriter::new(Vec::new(), WriterOptions::default().with_chunked(false))?;
        let stats = MergeScheduler::new(inputs, &mut writer, allow_duplicate_metadata).run()?;
        writer.finish(stats.clone())?;
        Ok((stats, writer.into_inner()))
    }

    fn emitted_log_times(bytes: Vec<u8>) -> Vec<(u64, u16)> {
        use crate::io::formats::mcap::reader::{LinearRecordReader, RecordReader};
        let mut reader = LinearRecordReader::new("out", Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            if let Record::Message(m) = record {
                out.push((m.log_time, m.channel_id));
            }
        }
        out
    }

    #[test]
    fn test_interleaves_by_time_with_ordinal_tiebreak() {
        let mut a = Fixture::new();
        a.channel(1, 0).message(1, 10).message(1, 20).message(1, 30);
        let mut b = Fixture::new();
        b.channel(1, 0).message(1, 5).message(1, 20).message(1, 40);

        let (stats, out) = run(vec![a.build(), b.build()], false).unwrap();
        assert_eq!(stats.message_count, 6);
        assert_eq!(
            emitted_log_times(out),
            vec![(5, 2), (10, 1), (20, 1), (20, 2), (30, 1), (40, 2)]
        );
    }

    #[test]
    fn test_unreferenced_schema_emitted_at_end_of_input() {
        let mut a = Fixture::new();
        a.schema(1).schema(2).channel(1, 2).message(1, 1);
        let (stats, _) = run(vec![a.build()], false).unwrap();
        assert_eq!(stats.schema_count, 2);
        assert_eq!(stats.channel_count, 1);
    }

    #[test]
    fn test_channel_with_undeclared_schema() {
        let mut a = Fixture::new();
        a.channel(3, 9);
        let err = run(vec![a.build()], false).unwrap_err();
        assert!(matches!(
            err,
            MergeError::SchemaChannelConsistency {
                channel_id: 3,
                schema_id: 9,
                ..
            }
        ));
    }

    #[test]
    fn test_message_on_undeclared_channel() {
        let mut a = Fixture::new();
        a.message(4, 1);
        let err = run(vec![a.build()], false).unwrap_err();
        assert!(matches!(err, MergeError::MalformedInput { .. }), "{err}");
    }

    #[test]
    fn test_duplicate_metadata_policy() {
        let build = || {
            let mut f = Fixture::new();
            f.metadata("calibration");
            f.build()
        };
        let err = run(vec![build(), build()], false).unwrap_err();
        assert!(matches!(err, MergeError::DuplicateMetadata { .. }));

        let (stats, _) = run(vec![build(), build()], true).unwrap();
        assert_eq!(stats.metadata_count, 2);
    }

    #[test]
    fn test_empty_inputs() {
        let (stats, out) = run(vec![Fixture::new().build(), Fixture::new().build()], false).unwrap();
        assert_eq!(stats, Statistics::default());
        assert!(emitted_log_times(out).is_empty());
    }
}
