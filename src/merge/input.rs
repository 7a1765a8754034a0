// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Merge inputs.
//!
//! [`InputSource`] names a byte source to merge. [`InputAdapter`] wraps the
//! record reader opened over it together with the per-input state the
//! scheduler needs: the declared-schema table and the one buffered message.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::core::{MergeError, Result};
use crate::io::formats::mcap::reader::{McapRecordReader, RecordSource};
use crate::io::formats::mcap::records::{Header, Message, Record, Schema};

/// A named MCAP byte source.
#[derive(Debug)]
pub struct InputSource {
    name: String,
    source: RecordSource,
}

impl InputSource {
    /// A forward-only stream. Always read linearly.
    pub fn stream<R: Read + Send + 'static>(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            source: RecordSource::Stream(Box::new(reader)),
        }
    }

    /// A seekable source. Read through its summary index when the merge
    /// enables `use_index`.
    pub fn seekable<R: Read + Seek + Send + 'static>(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            source: RecordSource::Seekable(Box::new(reader)),
        }
    }

    /// Open a file. The path is used as the input name.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| MergeError::io(format!("opening '{}'", path.display()), e))?;
        Ok(Self::seekable(
            path.display().to_string(),
            BufReader::new(file),
        ))
    }

    /// Input name used in errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One input of a running merge.
pub struct InputAdapter {
    ordinal: usize,
    reader: McapRecordReader,
    /// Schemas declared by this input, in declaration order
    declared: Vec<Schema>,
    declared_index: HashMap<u16, usize>,
    /// Next message of this input, channel already remapped
    pending: Option<Message>,
    exhausted: bool,
}

impl InputAdapter {
    /// Open the reader for the input at position `ordinal`.
    pub fn open(ordinal: usize, source: InputSource, use_index: bool) -> Result<Self> {
        let reader = McapRecordReader::open(source.name, source.source, use_index)?;
        Ok(Self {
            ordinal,
            reader,
            declared: Vec::new(),
            declared_index: HashMap::new(),
            pending: None,
            exhausted: false,
        })
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &str {
        self.reader.name()
    }

    pub fn header(&self) -> &Header {
        self.reader.header()
    }

    /// Pull the next record from the reader.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        self.reader.next_record()
    }

    /// Record a schema declaration. Re-declarations of a known id keep the
    /// first definition.
    pub fn declare_schema(&mut self, schema: Schema) {
        if self.declared_index.contains_key(&schema.id) {
            return;
        }
        self.declared_index.insert(schema.id, self.declared.len());
        self.declared.push(schema);
    }

    /// A schema this input declared.
    pub fn declared_schema(&self, id: u16) -> Option<&Schema> {
        self.declared_index.get(&id).map(|&i| &self.declared[i])
    }

    /// Hand over all declared schemas, in declaration order.
    pub fn take_declared_schemas(&mut self) -> Vec<Schema> {
        self.declared_index.clear();
        std::mem::take(&mut self.declared)
    }

    pub fn set_pending(&mut self, message: Message) {
        self.pending = Some(message);
    }

    pub fn take_pending(&mut self) -> Option<Message> {
        self.pending.take()
    }

    /// Queue key of the buffered message: `(log_time, ordinal)`.
    pub fn pending_key(&self) -> Option<(u64, usize)> {
        self.pending.as_ref().map(|m| (m.log_time, self.ordinal))
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }
}

impl std::fmt::Debug for InputAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputAdapter")
            .field("ordinal", &self.ordinal)
            .field("name", &self.name())
            .field("declared_schemas", &self.declared.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::formats::mcap::records::Statistics;
    use crate::io::formats::mcap::writer::{McapWriter, WriterOptions};
    use std::io::Cursor;

    fn schema(id: u16, name: &str) -> Schema {
        Schema {
            id,
            name: name.to_string(),
            encoding: "jsonschema".to_string(),
            data: b"{}".to_vec(),
        }
    }

    fn empty_file() -> Vec<u8> {
        let mut writer = McapWriter::new(Vec::new(), WriterOptions::default()).unwrap();
        writer
            .write_header(&Header {
                profile: "ros1".to_string(),
                library: "test".to_string(),
            })
            .unwrap();
        writer.finish(Statistics::default()).unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_open_reads_header() {
        let source = InputSource::stream("mem", Cursor::new(empty_file()));
        assert_eq!(source.name(), "mem");
        let mut adapter = InputAdapter::open(2, source, false).unwrap();
        assert_eq!(adapter.ordinal(), 2);
        assert_eq!(adapter.name(), "mem");
        assert_eq!(adapter.header().profile, "ros1");
        assert!(adapter.next_record().unwrap().is_none());
    }

    #[test]
    fn test_declared_schemas_keep_order_and_first_definition() {
        let source = InputSource::seekable("mem", Cursor::new(empty_file()));
        let mut adapter = InputAdapter::open(0, source, true).unwrap();
        adapter.declare_schema(schema(7, "b"));
        adapter.declare_schema(schema(3, "a"));
        adapter.declare_schema(schema(7, "b2"));
        assert_eq!(adapter.declared_schema(7).unwrap().name, "b");
        assert!(adapter.declared_schema(1).is_none());

        let names: Vec<String> = adapter
            .take_declared_schemas()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(adapter.declared_schema(7).is_none());
    }

    #[test]
    fn test_pending_key() {
        let source = InputSource::stream("mem", Cursor::new(empty_file()));
        let mut adapter = InputAdapter::open(4, source, false).unwrap();
        assert_eq!(adapter.pending_key(), None);
        adapter.set_pending(Message {
            channel_id: 1,
            sequence: 0,
            log_time: 42,
            publish_time: 0,
            data: Vec::new(),
        });
        assert_eq!(adapter.pending_key(), Some((42, 4)));
        assert!(adapter.take_pending().is_some());
        assert_eq!(adapter.pending_key(), None);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let err = InputSource::open("/nonexistent/dir/input.mcap").unwrap_err();
        assert!(matches!(err, MergeError::Io { .. }));
    }

    #[test]
    fn test_garbage_input_is_malformed() {
        let source = InputSource::stream("garbage", Cursor::new(b"not an mcap file".to_vec()));
        let err = InputAdapter::open(0, source, false).unwrap_err();
        assert!(matches!(err, MergeError::MalformedInput { .. }));
    }
}
