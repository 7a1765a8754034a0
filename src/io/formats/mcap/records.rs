// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Owned MCAP record types and their body encoding.
//!
//! Every record on disk is framed as `opcode (u8) | length (u64) | body`.
//! The types here cover the records the merge engine reads and writes; each
//! knows how to parse its body from a byte slice and how to append its body
//! to an output buffer. Framing, compression and CRCs live in the reader
//! and writer.
//!
//! Primitive layout (little-endian):
//! - String: u32 byte length + UTF-8 bytes
//! - Bytes: u32 or u64 byte length + data, depending on the field
//! - Map: u32 byte length of all entries + entries

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

/// Result of parsing a record body. The error is a human readable reason;
/// readers attach the input name when converting it to a `MergeError`.
pub type ParseResult<T> = std::result::Result<T, String>;

/// File header record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    /// Profile name (e.g. "ros2"), may be empty
    pub profile: String,
    /// Name of the writing library
    pub library: String,
}

/// Schema record. ID 0 is reserved for "no schema" and never appears on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub id: u16,
    pub name: String,
    pub encoding: String,
    pub data: Vec<u8>,
}

/// Channel record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u16,
    /// 0 when the channel has no schema
    pub schema_id: u16,
    pub topic: String,
    pub message_encoding: String,
    pub metadata: BTreeMap<String, String>,
}

/// Message record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel_id: u16,
    pub sequence: u32,
    /// Log timestamp (nanoseconds)
    pub log_time: u64,
    /// Publish timestamp (nanoseconds)
    pub publish_time: u64,
    pub data: Vec<u8>,
}

/// Attachment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub log_time: u64,
    pub create_time: u64,
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Metadata record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub metadata: BTreeMap<String, String>,
}

/// A record yielded by the readers and consumed by the merge dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Schema(Schema),
    Channel(Channel),
    Message(Message),
    Attachment(Attachment),
    Metadata(Metadata),
}

impl Record {
    /// Short name of the record kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Schema(_) => "schema",
            Record::Channel(_) => "channel",
            Record::Message(_) => "message",
            Record::Attachment(_) => "attachment",
            Record::Metadata(_) => "metadata",
        }
    }
}

/// Statistics record: one per file, in the summary section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statistics {
    pub message_count: u64,
    pub schema_count: u16,
    pub channel_count: u32,
    pub attachment_count: u32,
    pub metadata_count: u32,
    pub chunk_count: u32,
    pub message_start_time: u64,
    pub message_end_time: u64,
    pub channel_message_counts: BTreeMap<u16, u64>,
}

/// Chunk index record (summary section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIndex {
    pub message_start_time: u64,
    pub message_end_time: u64,
    /// Offset of the chunk record from the start of the file
    pub chunk_start_offset: u64,
    /// Length of the chunk record including its prefix
    pub chunk_length: u64,
    /// Channel ID -> offset of that channel's MessageIndex record
    pub message_index_offsets: BTreeMap<u16, u64>,
    /// Total length of the MessageIndex records following the chunk
    pub message_index_length: u64,
    pub compression: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

/// Attachment index record (summary section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentIndex {
    pub offset: u64,
    pub length: u64,
    pub log_time: u64,
    pub create_time: u64,
    pub data_size: u64,
    pub name: String,
    pub media_type: String,
}

/// Metadata index record (summary section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataIndex {
    pub offset: u64,
    pub length: u64,
    pub name: String,
}

/// Footer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Footer {
    /// Offset of the summary section, 0 if absent
    pub summary_start: u64,
    /// Offset of the summary offset section, 0 if absent
    pub summary_offset_start: u64,
    /// CRC of the summary section, 0 if not computed
    pub summary_crc: u32,
}

/// Fixed-size fields at the front of a chunk record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    pub message_start_time: u64,
    pub message_end_time: u64,
    pub uncompressed_size: u64,
    /// CRC of the uncompressed records, 0 if not computed
    pub uncompressed_crc: u32,
    pub compression: String,
    /// Length of the (possibly compressed) records that follow
    pub records_length: u64,
}

// ============================================================================
// Body parsing
// ============================================================================

/// Little-endian cursor over a record body.
pub struct BodyReader<'a> {
    cursor: Cursor<&'a [u8]>,
    record: &'static str,
}

impl<'a> BodyReader<'a> {
    /// Start reading the body of a record of the given kind.
    pub fn new(body: &'a [u8], record: &'static str) -> Self {
        Self {
            cursor: Cursor::new(body),
            record,
        }
    }

    fn truncated(&self, field: &str) -> String {
        format!(
            "{} record truncated while reading {field} at byte {}",
            self.record,
            self.cursor.position()
        )
    }

    pub fn u8(&mut self, field: &str) -> ParseResult<u8> {
        self.cursor.read_u8().map_err(|_| self.truncated(field))
    }

    pub fn u16(&mut self, field: &str) -> ParseResult<u16> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| self.truncated(field))
    }

    pub fn u32(&mut self, field: &str) -> ParseResult<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| self.truncated(field))
    }

    pub fn u64(&mut self, field: &str) -> ParseResult<u64> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| self.truncated(field))
    }

    /// Bytes left in the body.
    pub fn remaining(&self) -> u64 {
        self.cursor.get_ref().len() as u64 - self.cursor.position()
    }

    /// Current offset within the body.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn take(&mut self, len: u64, field: &str) -> ParseResult<Vec<u8>> {
        if len > self.remaining() {
            return Err(format!(
                "{} record: {field} length {len} exceeds remaining {} bytes",
                self.record,
                self.remaining()
            ));
        }
        let mut buf = vec![0u8; len as usize];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| self.truncated(field))?;
        Ok(buf)
    }

    pub fn string(&mut self, field: &str) -> ParseResult<String> {
        let len = self.u32(field)? as u64;
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes)
            .map_err(|e| format!("{} record: {field} is not valid UTF-8: {e}", self.record))
    }

    pub fn bytes_u32(&mut self, field: &str) -> ParseResult<Vec<u8>> {
        let len = self.u32(field)? as u64;
        self.take(len, field)
    }

    pub fn bytes_u64(&mut self, field: &str) -> ParseResult<Vec<u8>> {
        let len = self.u64(field)?;
        self.take(len, field)
    }

    /// All remaining bytes.
    pub fn rest(&mut self) -> ParseResult<Vec<u8>> {
        let len = self.remaining();
        self.take(len, "data")
    }

    pub fn string_map(&mut self, field: &str) -> ParseResult<BTreeMap<String, String>> {
        let byte_len = self.u32(field)? as u64;
        let end = self.position() + byte_len;
        if byte_len > self.remaining() {
            return Err(format!(
                "{} record: {field} map length {byte_len} exceeds record",
                self.record
            ));
        }
        let mut map = BTreeMap::new();
        while self.position() < end {
            let key = self.string(field)?;
            let value = self.string(field)?;
            map.insert(key, value);
        }
        if self.position() != end {
            return Err(format!("{} record: {field} map overruns its length", self.record));
        }
        Ok(map)
    }

    pub fn id_map(&mut self, field: &str) -> ParseResult<BTreeMap<u16, u64>> {
        let byte_len = self.u32(field)? as u64;
        if byte_len % 10 != 0 || byte_len > self.remaining() {
            return Err(format!(
                "{} record: invalid {field} map length {byte_len}",
                self.record
            ));
        }
        let mut map = BTreeMap::new();
        for _ in 0..byte_len / 10 {
            let key = self.u16(field)?;
            let value = self.u64(field)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl Header {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "Header");
        Ok(Self {
            profile: r.string("profile")?,
            library: r.string("library")?,
        })
    }
}

impl Schema {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "Schema");
        Ok(Self {
            id: r.u16("id")?,
            name: r.string("name")?,
            encoding: r.string("encoding")?,
            data: r.bytes_u32("data")?,
        })
    }
}

impl Channel {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "Channel");
        Ok(Self {
            id: r.u16("id")?,
            schema_id: r.u16("schema_id")?,
            topic: r.string("topic")?,
            message_encoding: r.string("message_encoding")?,
            metadata: r.string_map("metadata")?,
        })
    }
}

impl Message {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "Message");
        Ok(Self {
            channel_id: r.u16("channel_id")?,
            sequence: r.u32("sequence")?,
            log_time: r.u64("log_time")?,
            publish_time: r.u64("publish_time")?,
            data: r.rest()?,
        })
    }
}

impl Attachment {
    /// Parse an attachment body, verifying its CRC when one is present.
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "Attachment");
        let attachment = Self {
            log_time: r.u64("log_time")?,
            create_time: r.u64("create_time")?,
            name: r.string("name")?,
            media_type: r.string("media_type")?,
            data: r.bytes_u64("data")?,
        };
        let crc_start = r.position() as usize;
        let crc = r.u32("crc")?;
        if crc != 0 {
            let actual = crc32fast::hash(&body[..crc_start]);
            if actual != crc {
                return Err(format!(
                    "Attachment '{}' CRC mismatch: expected {crc:#010x}, computed {actual:#010x}",
                    attachment.name
                ));
            }
        }
        Ok(attachment)
    }
}

impl Metadata {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "Metadata");
        Ok(Self {
            name: r.string("name")?,
            metadata: r.string_map("metadata")?,
        })
    }
}

impl ChunkIndex {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "ChunkIndex");
        Ok(Self {
            message_start_time: r.u64("message_start_time")?,
            message_end_time: r.u64("message_end_time")?,
            chunk_start_offset: r.u64("chunk_start_offset")?,
            chunk_length: r.u64("chunk_length")?,
            message_index_offsets: r.id_map("message_index_offsets")?,
            message_index_length: r.u64("message_index_length")?,
            compression: r.string("compression")?,
            compressed_size: r.u64("compressed_size")?,
            uncompressed_size: r.u64("uncompressed_size")?,
        })
    }
}

impl AttachmentIndex {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "AttachmentIndex");
        Ok(Self {
            offset: r.u64("offset")?,
            length: r.u64("length")?,
            log_time: r.u64("log_time")?,
            create_time: r.u64("create_time")?,
            data_size: r.u64("data_size")?,
            name: r.string("name")?,
            media_type: r.string("media_type")?,
        })
    }
}

impl MetadataIndex {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "MetadataIndex");
        Ok(Self {
            offset: r.u64("offset")?,
            length: r.u64("length")?,
            name: r.string("name")?,
        })
    }
}

impl Footer {
    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "Footer");
        Ok(Self {
            summary_start: r.u64("summary_start")?,
            summary_offset_start: r.u64("summary_offset_start")?,
            summary_crc: r.u32("summary_crc")?,
        })
    }
}

impl ChunkHeader {
    /// Parse the chunk header; the reader is left at the start of the records.
    pub fn parse(r: &mut BodyReader<'_>) -> ParseResult<Self> {
        Ok(Self {
            message_start_time: r.u64("message_start_time")?,
            message_end_time: r.u64("message_end_time")?,
            uncompressed_size: r.u64("uncompressed_size")?,
            uncompressed_crc: r.u32("uncompressed_crc")?,
            compression: r.string("compression")?,
            records_length: r.u64("records_length")?,
        })
    }
}

// ============================================================================
// Body encoding
// ============================================================================

/// Little-endian appenders for record bodies.
pub trait PutLe {
    fn put_u8(&mut self, v: u8);
    fn put_u16(&mut self, v: u16);
    fn put_u32(&mut self, v: u32);
    fn put_u64(&mut self, v: u64);
    fn put_str(&mut self, s: &str);
    fn put_bytes_u32(&mut self, b: &[u8]);
    fn put_bytes_u64(&mut self, b: &[u8]);
    fn put_string_map(&mut self, map: &BTreeMap<String, String>);
    fn put_id_map(&mut self, map: &BTreeMap<u16, u64>);
}

impl PutLe for Vec<u8> {
    fn put_u8(&mut self, v: u8) {
        self.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(&mut self, v: u32) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u64(&mut self, v: u64) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_str(&mut self, s: &str) {
        self.put_bytes_u32(s.as_bytes());
    }

    fn put_bytes_u32(&mut self, b: &[u8]) {
        self.put_u32(b.len() as u32);
        self.extend_from_slice(b);
    }

    fn put_bytes_u64(&mut self, b: &[u8]) {
        self.put_u64(b.len() as u64);
        self.extend_from_slice(b);
    }

    fn put_string_map(&mut self, map: &BTreeMap<String, String>) {
        let byte_len: usize = map.iter().map(|(k, v)| 4 + k.len() + 4 + v.len()).sum();
        self.put_u32(byte_len as u32);
        for (key, value) in map {
            self.put_str(key);
            self.put_str(value);
        }
    }

    fn put_id_map(&mut self, map: &BTreeMap<u16, u64>) {
        self.put_u32((map.len() * 10) as u32);
        for (&key, &value) in map {
            self.put_u16(key);
            self.put_u64(value);
        }
    }
}

/// Append a framed record (`opcode | length | body`) to `out`.
pub fn put_record(out: &mut Vec<u8>, opcode: u8, body: &[u8]) {
    out.put_u8(opcode);
    out.put_u64(body.len() as u64);
    out.extend_from_slice(body);
}

impl Header {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.profile.len() + self.library.len());
        buf.put_str(&self.profile);
        buf.put_str(&self.library);
        buf
    }
}

impl Schema {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(14 + self.name.len() + self.encoding.len() + self.data.len());
        buf.put_u16(self.id);
        buf.put_str(&self.name);
        buf.put_str(&self.encoding);
        buf.put_bytes_u32(&self.data);
        buf
    }
}

impl Channel {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16 + self.topic.len() + self.message_encoding.len());
        buf.put_u16(self.id);
        buf.put_u16(self.schema_id);
        buf.put_str(&self.topic);
        buf.put_str(&self.message_encoding);
        buf.put_string_map(&self.metadata);
        buf
    }
}

impl Message {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(22 + self.data.len());
        buf.put_u16(self.channel_id);
        buf.put_u32(self.sequence);
        buf.put_u64(self.log_time);
        buf.put_u64(self.publish_time);
        buf.extend_from_slice(&self.data);
        buf
    }
}

impl Attachment {
    /// Encode the attachment; the trailing CRC covers every preceding body byte.
    pub fn encode(&self, include_crc: bool) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            36 + self.name.len() + self.media_type.len() + self.data.len(),
        );
        buf.put_u64(self.log_time);
        buf.put_u64(self.create_time);
        buf.put_str(&self.name);
        buf.put_str(&self.media_type);
        buf.put_bytes_u64(&self.data);
        let crc = if include_crc { crc32fast::hash(&buf) } else { 0 };
        buf.put_u32(crc);
        buf
    }
}

impl Metadata {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_str(&self.name);
        buf.put_string_map(&self.metadata);
        buf
    }
}

impl Statistics {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(50 + self.channel_message_counts.len() * 10);
        buf.put_u64(self.message_count);
        buf.put_u16(self.schema_count);
        buf.put_u32(self.channel_count);
        buf.put_u32(self.attachment_count);
        buf.put_u32(self.metadata_count);
        buf.put_u32(self.chunk_count);
        buf.put_u64(self.message_start_time);
        buf.put_u64(self.message_end_time);
        buf.put_id_map(&self.channel_message_counts);
        buf
    }

    pub fn parse(body: &[u8]) -> ParseResult<Self> {
        let mut r = BodyReader::new(body, "Statistics");
        Ok(Self {
            message_count: r.u64("message_count")?,
            schema_count: r.u16("schema_count")?,
            channel_count: r.u32("channel_count")?,
            attachment_count: r.u32("attachment_count")?,
            metadata_count: r.u32("metadata_count")?,
            chunk_count: r.u32("chunk_count")?,
            message_start_time: r.u64("message_start_time")?,
            message_end_time: r.u64("message_end_time")?,
            channel_message_counts: r.id_map("channel_message_counts")?,
        })
    }
}

impl ChunkIndex {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(80 + self.message_index_offsets.len() * 10);
        buf.put_u64(self.message_start_time);
        buf.put_u64(self.message_end_time);
        buf.put_u64(self.chunk_start_offset);
        buf.put_u64(self.chunk_length);
        buf.put_id_map(&self.message_index_offsets);
        buf.put_u64(self.message_index_length);
        buf.put_str(&self.compression);
        buf.put_u64(self.compressed_size);
        buf.put_u64(self.uncompressed_size);
        buf
    }
}

impl AttachmentIndex {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(48 + self.name.len() + self.media_type.len());
        buf.put_u64(self.offset);
        buf.put_u64(self.length);
        buf.put_u64(self.log_time);
        buf.put_u64(self.create_time);
        buf.put_u64(self.data_size);
        buf.put_str(&self.name);
        buf.put_str(&self.media_type);
        buf
    }
}

impl MetadataIndex {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(20 + self.name.len());
        buf.put_u64(self.offset);
        buf.put_u64(self.length);
        buf.put_str(&self.name);
        buf
    }
}
