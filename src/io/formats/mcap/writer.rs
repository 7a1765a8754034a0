// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP writer with chunk buffering and summary section writing.
//!
//! In chunked mode schema, channel and message records are buffered until the
//! uncompressed buffer reaches the target chunk size, then compressed into a
//! single Chunk record followed by one MessageIndex record per channel.
//! In flat mode every record goes straight into the data section.
//!
//! Attachments and metadata are never chunked. Both modes index them in the
//! summary section.
//!
//! # Summary Section
//!
//! [`McapWriter::finish`] writes, in order: DataEnd, schemas, channels,
//! statistics, chunk indexes, attachment indexes, metadata indexes, one
//! SummaryOffset per non-empty group, the footer and the trailing magic.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::core::{Compression, MergeError, Result};
use crate::io::formats::mcap::constants::{
    FOOTER_BODY_LEN, MCAP_MAGIC, OP_ATTACHMENT, OP_ATTACHMENT_INDEX, OP_CHANNEL, OP_CHUNK,
    OP_CHUNK_INDEX, OP_DATA_END, OP_FOOTER, OP_HEADER, OP_MESSAGE, OP_MESSAGE_INDEX, OP_METADATA,
    OP_METADATA_INDEX, OP_SCHEMA, OP_STATISTICS, OP_SUMMARY_OFFSET, RECORD_PREFIX_LEN,
};
use crate::io::formats::mcap::records::{
    put_record, Attachment, AttachmentIndex, Channel, ChunkIndex, Header, Message, Metadata,
    MetadataIndex, PutLe, Schema, Statistics,
};

/// Default target chunk size (4MB uncompressed)
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Zstd level used for chunk compression.
const ZSTD_LEVEL: i32 = 3;

/// Library string written to output headers.
pub fn default_library() -> String {
    format!("robomerge {}", env!("CARGO_PKG_VERSION"))
}

/// Output layout and integrity settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Group records into compressed chunks
    pub chunked: bool,
    /// Uncompressed bytes buffered before a chunk is flushed
    pub chunk_size: u64,
    /// Chunk compression
    pub compression: Compression,
    /// Compute chunk, attachment, data and summary CRCs
    pub include_crc: bool,
    /// Library written to the header when none is supplied
    pub library: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            chunked: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression: Compression::Zstd,
            include_crc: true,
            library: default_library(),
        }
    }
}

impl WriterOptions {
    /// Enable or disable chunking.
    pub fn with_chunked(mut self, chunked: bool) -> Self {
        self.chunked = chunked;
        self
    }

    /// Set the target chunk size in bytes.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the chunk compression.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Enable or disable CRC computation.
    pub fn with_crc(mut self, include_crc: bool) -> Self {
        self.include_crc = include_crc;
        self
    }
}

/// Open chunk being filled in chunked mode.
#[derive(Debug, Default)]
struct ChunkBuffer {
    records: Vec<u8>,
    /// Channel ID -> (log_time, offset into `records`)
    message_indexes: BTreeMap<u16, Vec<(u64, u64)>>,
    message_start_time: u64,
    message_end_time: u64,
    message_count: u64,
}

impl ChunkBuffer {
    fn push_message(&mut self, message: &Message) {
        let offset = self.records.len() as u64;
        self.message_indexes
            .entry(message.channel_id)
            .or_default()
            .push((message.log_time, offset));
        if self.message_count == 0 {
            self.message_start_time = message.log_time;
            self.message_end_time = message.log_time;
        } else {
            self.message_start_time = self.message_start_time.min(message.log_time);
            self.message_end_time = self.message_end_time.max(message.log_time);
        }
        self.message_count += 1;
        put_record(&mut self.records, OP_MESSAGE, &message.encode());
    }
}

/// MCAP writer.
///
/// Record IDs are written as given; the caller is responsible for keeping
/// schema and channel IDs unique.
pub struct McapWriter<W: Write> {
    /// Underlying writer
    writer: W,
    options: WriterOptions,
    /// Current write position (tracked manually since `W` may not seek)
    current_position: u64,
    /// Running CRC: data section until DataEnd, then the summary section
    crc: crc32fast::Hasher,
    header_written: bool,
    finished: bool,

    // === Summary section tracking ===
    schema_records: Vec<Schema>,
    channel_records: Vec<Channel>,
    chunk_indexes: Vec<ChunkIndex>,
    attachment_indexes: Vec<AttachmentIndex>,
    metadata_indexes: Vec<MetadataIndex>,

    chunk: ChunkBuffer,
}

impl<W: Write> McapWriter<W> {
    /// Create a writer. Nothing is written until the header or a record is.
    pub fn new(writer: W, options: WriterOptions) -> Result<Self> {
        if options.chunked && options.chunk_size == 0 {
            return Err(MergeError::invalid_options("chunk size must be positive"));
        }
        Ok(Self {
            writer,
            options,
            current_position: 0,
            crc: crc32fast::Hasher::new(),
            header_written: false,
            finished: false,
            schema_records: Vec::new(),
            channel_records: Vec::new(),
            chunk_indexes: Vec::new(),
            attachment_indexes: Vec::new(),
            metadata_indexes: Vec::new(),
            chunk: ChunkBuffer::default(),
        })
    }

    /// Options this writer was created with.
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.current_position
    }

    /// Number of chunks flushed so far.
    pub fn chunks_written(&self) -> usize {
        self.chunk_indexes.len()
    }

    /// Write bytes and update position and CRC tracking.
    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer
            .write_all(data)
            .map_err(|e| MergeError::io("writing MCAP output", e))?;
        self.crc.update(data);
        self.current_position += data.len() as u64;
        Ok(())
    }

    /// Write `opcode | length | body` and return the record offset.
    fn write_record(&mut self, opcode: u8, body: &[u8]) -> Result<u64> {
        let offset = self.position();
        let mut prefix = [0u8; RECORD_PREFIX_LEN as usize];
        prefix[0] = opcode;
        prefix[1..].copy_from_slice(&(body.len() as u64).to_le_bytes());
        self.write_bytes(&prefix)?;
        self.write_bytes(body)?;
        Ok(offset)
    }

    fn ensure_writable(&mut self) -> Result<()> {
        if self.finished {
            return Err(MergeError::io(
                "writing MCAP output",
                io::Error::new(io::ErrorKind::Other, "writer already finished"),
            ));
        }
        if !self.header_written {
            let header = Header {
                profile: String::new(),
                library: self.options.library.clone(),
            };
            self.write_header(&header)?;
        }
        Ok(())
    }

    /// Write the leading magic and the header record.
    ///
    /// Must come before any other record; if it does not, a header with an
    /// empty profile is written automatically.
    pub fn write_header(&mut self, header: &Header) -> Result<()> {
        if self.header_written || self.finished {
            return Err(MergeError::io(
                "writing MCAP header",
                io::Error::new(io::ErrorKind::Other, "header already written"),
            ));
        }
        self.write_bytes(&MCAP_MAGIC)?;
        self.write_record(OP_HEADER, &header.encode())?;
        self.header_written = true;
        Ok(())
    }

    /// Write a schema record and keep a copy for the summary.
    pub fn write_schema(&mut self, schema: &Schema) -> Result<()> {
        self.ensure_writable()?;
        let body = schema.encode();
        if self.options.chunked {
            put_record(&mut self.chunk.records, OP_SCHEMA, &body);
        } else {
            self.write_record(OP_SCHEMA, &body)?;
        }
        self.schema_records.push(schema.clone());
        Ok(())
    }

    /// Write a channel record and keep a copy for the summary.
    pub fn write_channel(&mut self, channel: &Channel) -> Result<()> {
        self.ensure_writable()?;
        let body = channel.encode();
        if self.options.chunked {
            put_record(&mut self.chunk.records, OP_CHANNEL, &body);
        } else {
            self.write_record(OP_CHANNEL, &body)?;
        }
        self.channel_records.push(channel.clone());
        Ok(())
    }

    /// Write a message. In chunked mode it is buffered and the chunk is
    /// flushed once it reaches the target size.
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.ensure_writable()?;
        if self.options.chunked {
            self.chunk.push_message(message);
            if self.chunk.records.len() as u64 >= self.options.chunk_size {
                self.flush_chunk()?;
            }
        } else {
            self.write_record(OP_MESSAGE, &message.encode())?;
        }
        Ok(())
    }

    /// Write an attachment directly into the data section.
    pub fn write_attachment(&mut self, attachment: &Attachment) -> Result<()> {
        self.ensure_writable()?;
        let body = attachment.encode(self.options.include_crc);
        let offset = self.write_record(OP_ATTACHMENT, &body)?;
        self.attachment_indexes.push(AttachmentIndex {
            offset,
            length: RECORD_PREFIX_LEN + body.len() as u64,
            log_time: attachment.log_time,
            create_time: attachment.create_time,
            data_size: attachment.data.len() as u64,
            name: attachment.name.clone(),
            media_type: attachment.media_type.clone(),
        });
        Ok(())
    }

    /// Write a metadata record directly into the data section.
    pub fn write_metadata(&mut self, metadata: &Metadata) -> Result<()> {
        self.ensure_writable()?;
        let body = metadata.encode();
        let offset = self.write_record(OP_METADATA, &body)?;
        self.metadata_indexes.push(MetadataIndex {
            offset,
            length: RECORD_PREFIX_LEN + body.len() as u64,
            name: metadata.name.clone(),
        });
        Ok(())
    }

    fn compress(&self, records: &[u8]) -> Result<Vec<u8>> {
        match self.options.compression {
            Compression::None => Ok(records.to_vec()),
            Compression::Zstd => zstd::bulk::compress(records, ZSTD_LEVEL)
                .map_err(|e| MergeError::io("zstd chunk compression", e)),
            Compression::Lz4 => {
                let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::with_capacity(
                    records.len() / 2,
                ));
                encoder
                    .write_all(records)
                    .map_err(|e| MergeError::io("lz4 chunk compression", e))?;
                encoder.finish().map_err(|e| {
                    MergeError::io(
                        "lz4 chunk compression",
                        io::Error::new(io::ErrorKind::Other, e),
                    )
                })
            }
        }
    }

    /// Compress the open chunk, write it and its message indexes.
    ///
    /// Chunk record format:
    /// - message_start_time, message_end_time, uncompressed_size (u64)
    /// - uncompressed_crc (u32)
    /// - compression (string)
    /// - records (u64 length + bytes)
    fn flush_chunk(&mut self) -> Result<()> {
        if self.chunk.records.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.chunk);
        let compressed = self.compress(&chunk.records)?;
        let compression = self.options.compression.as_str();
        let uncompressed_crc = if self.options.include_crc {
            crc32fast::hash(&chunk.records)
        } else {
            0
        };

        let mut head = Vec::with_capacity(48);
        head.put_u64(chunk.message_start_time);
        head.put_u64(chunk.message_end_time);
        head.put_u64(chunk.records.len() as u64);
        head.put_u32(uncompressed_crc);
        head.put_str(compression);
        head.put_u64(compressed.len() as u64);

        let chunk_start_offset = self.position();
        let mut prefix = [0u8; RECORD_PREFIX_LEN as usize];
        prefix[0] = OP_CHUNK;
        prefix[1..].copy_from_slice(&((head.len() + compressed.len()) as u64).to_le_bytes());
        self.write_bytes(&prefix)?;
        self.write_bytes(&head)?;
        self.write_bytes(&compressed)?;
        let chunk_length = self.position() - chunk_start_offset;

        // MessageIndex: channel_id (u16) + u32 byte length + (log_time, offset) pairs
        let message_index_start = self.position();
        let mut message_index_offsets = BTreeMap::new();
        for (channel_id, entries) in &chunk.message_indexes {
            let mut body = Vec::with_capacity(6 + entries.len() * 16);
            body.put_u16(*channel_id);
            body.put_u32((entries.len() * 16) as u32);
            for &(log_time, offset) in entries {
                body.put_u64(log_time);
                body.put_u64(offset);
            }
            let offset = self.write_record(OP_MESSAGE_INDEX, &body)?;
            message_index_offsets.insert(*channel_id, offset);
        }
        let message_index_length = self.position() - message_index_start;

        tracing::trace!(
            offset = chunk_start_offset,
            messages = chunk.message_count,
            uncompressed = chunk.records.len(),
            compressed = compressed.len(),
            "Flushed chunk"
        );

        self.chunk_indexes.push(ChunkIndex {
            message_start_time: chunk.message_start_time,
            message_end_time: chunk.message_end_time,
            chunk_start_offset,
            chunk_length,
            message_index_offsets,
            message_index_length,
            compression: compression.to_string(),
            compressed_size: compressed.len() as u64,
            uncompressed_size: chunk.records.len() as u64,
        });
        Ok(())
    }

    /// Write one summary group and return its `(start, length)`.
    fn write_group(&mut self, opcode: u8, bodies: &[Vec<u8>]) -> Result<Option<(u64, u64)>> {
        if bodies.is_empty() {
            return Ok(None);
        }
        let start = self.position();
        for body in bodies {
            self.write_record(opcode, body)?;
        }
        Ok(Some((start, self.position() - start)))
    }

    /// Finalize the file.
    ///
    /// Flushes the open chunk, then writes DataEnd, the summary section, the
    /// summary offset section, the footer and the trailing magic. The chunk
    /// count of `statistics` is filled in from the chunks actually written;
    /// the completed record is returned.
    ///
    /// Can only be called once.
    pub fn finish(&mut self, mut statistics: Statistics) -> Result<Statistics> {
        self.ensure_writable()?;
        self.finished = true;

        self.flush_chunk()?;
        statistics.chunk_count = self.chunk_indexes.len() as u32;

        // DataEnd carries the CRC of everything before it
        let data_crc = if self.options.include_crc {
            self.crc.clone().finalize()
        } else {
            0
        };
        self.write_record(OP_DATA_END, &data_crc.to_le_bytes())?;

        // === Start of summary section ===
        self.crc = crc32fast::Hasher::new();
        let summary_start = self.position();

        let schemas: Vec<Vec<u8>> = self.schema_records.iter().map(Schema::encode).collect();
        let channels: Vec<Vec<u8>> = self.channel_records.iter().map(Channel::encode).collect();
        let chunk_indexes: Vec<Vec<u8>> = self.chunk_indexes.iter().map(ChunkIndex::encode).collect();
        let attachment_indexes: Vec<Vec<u8>> = self
            .attachment_indexes
            .iter()
            .map(AttachmentIndex::encode)
            .collect();
        let metadata_indexes: Vec<Vec<u8>> = self
            .metadata_indexes
            .iter()
            .map(MetadataIndex::encode)
            .collect();

        let groups = [
            (OP_SCHEMA, self.write_group(OP_SCHEMA, &schemas)?),
            (OP_CHANNEL, self.write_group(OP_CHANNEL, &channels)?),
            (
                OP_STATISTICS,
                self.write_group(OP_STATISTICS, &[statistics.encode()])?,
            ),
            (OP_CHUNK_INDEX, self.write_group(OP_CHUNK_INDEX, &chunk_indexes)?),
            (
                OP_ATTACHMENT_INDEX,
                self.write_group(OP_ATTACHMENT_INDEX, &attachment_indexes)?,
            ),
            (
                OP_METADATA_INDEX,
                self.write_group(OP_METADATA_INDEX, &metadata_indexes)?,
            ),
        ];

        let summary_offset_start = self.position();
        for (opcode, group) in groups {
            if let Some((start, length)) = group {
                let mut body = Vec::with_capacity(17);
                body.put_u8(opcode);
                body.put_u64(start);
                body.put_u64(length);
                self.write_record(OP_SUMMARY_OFFSET, &body)?;
            }
        }

        // Footer; the summary CRC covers everything up to the CRC field itself
        let mut footer = Vec::with_capacity(RECORD_PREFIX_LEN as usize + 16);
        footer.put_u8(OP_FOOTER);
        footer.put_u64(FOOTER_BODY_LEN);
        footer.put_u64(summary_start);
        footer.put_u64(summary_offset_start);
        self.write_bytes(&footer)?;
        let summary_crc = if self.options.include_crc {
            self.crc.clone().finalize()
        } else {
            0
        };
        self.write_bytes(&summary_crc.to_le_bytes())?;
        self.write_bytes(&MCAP_MAGIC)?;

        self.writer
            .flush()
            .map_err(|e| MergeError::io("flushing MCAP output", e))?;

        tracing::debug!(
            schemas = self.schema_records.len(),
            channels = self.channel_records.len(),
            chunks = self.chunk_indexes.len(),
            attachments = self.attachment_indexes.len(),
            metadata = self.metadata_indexes.len(),
            messages = statistics.message_count,
            bytes = self.current_position,
            "Summary section written"
        );

        Ok(statistics)
    }

    /// Get the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::formats::mcap::reader::{LinearRecordReader, RecordReader};
    use crate::io::formats::mcap::records::Record;
    use std::io::Cursor;

    fn schema() -> Schema {
        Schema {
            id: 1,
            name: "geometry_msgs/Point".to_string(),
            encoding: "ros2msg".to_string(),
            data: b"float64 x\nfloat64 y\nfloat64 z".to_vec(),
        }
    }

    fn channel() -> Channel {
        Channel {
            id: 1,
            schema_id: 1,
            topic: "/point".to_string(),
            message_encoding: "cdr".to_string(),
            metadata: BTreeMap::new(),
        }
    }

    fn message(log_time: u64) -> Message {
        Message {
            channel_id: 1,
            sequence: log_time as u32,
            log_time,
            publish_time: log_time,
            data: vec![0u8; 24],
        }
    }

    fn write_file(options: WriterOptions, count: u64) -> Vec<u8> {
        let mut writer = McapWriter::new(Vec::new(), options).unwrap();
        writer
            .write_header(&Header {
                profile: "ros2".to_string(),
                library: "test".to_string(),
            })
            .unwrap();
        writer.write_schema(&schema()).unwrap();
        writer.write_channel(&channel()).unwrap();
        for t in 0..count {
            writer.write_message(&message(t)).unwrap();
        }
        let stats = Statistics {
            message_count: count,
            schema_count: 1,
            channel_count: 1,
            ..Default::default()
        };
        writer.finish(stats).unwrap();
        writer.into_inner()
    }

    fn read_all(bytes: Vec<u8>) -> Vec<Record> {
        let mut reader = LinearRecordReader::new("test", Cursor::new(bytes)).unwrap();
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let options = WriterOptions::default().with_chunk_size(0);
        assert!(matches!(
            McapWriter::new(Vec::new(), options),
            Err(MergeError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn test_file_framing() {
        let bytes = write_file(WriterOptions::default(), 3);
        assert_eq!(&bytes[..8], &MCAP_MAGIC);
        assert_eq!(&bytes[bytes.len() - 8..], &MCAP_MAGIC);
        assert_eq!(bytes[8], OP_HEADER);
    }

    #[test]
    fn test_small_chunk_size_produces_many_chunks() {
        let options = WriterOptions::default().with_chunk_size(64);
        let mut writer = McapWriter::new(Vec::new(), options).unwrap();
        writer.write_schema(&schema()).unwrap();
        writer.write_channel(&channel()).unwrap();
        for t in 0..10 {
            writer.write_message(&message(t)).unwrap();
        }
        let stats = writer.finish(Statistics::default()).unwrap();
        assert!(stats.chunk_count >= 5, "chunks: {}", stats.chunk_count);
    }

    #[test]
    fn test_chunked_and_flat_read_back_identically() {
        for compression in [Compression::Zstd, Compression::Lz4, Compression::None] {
            let chunked = read_all(write_file(
                WriterOptions::default()
                    .with_compression(compression)
                    .with_chunk_size(100),
                20,
            ));
            let flat = read_all(write_file(WriterOptions::default().with_chunked(false), 20));
            assert_eq!(chunked, flat, "{compression:?}");
            assert_eq!(chunked.len(), 22);
        }
    }

    #[test]
    fn test_finish_twice_is_error() {
        let mut writer = McapWriter::new(Vec::new(), WriterOptions::default()).unwrap();
        writer.finish(Statistics::default()).unwrap();
        assert!(matches!(
            writer.finish(Statistics::default()),
            Err(MergeError::Io { .. })
        ));
        assert!(writer.write_message(&message(1)).is_err());
    }

    /// Sink whose writes succeed and whose flush fails.
    struct FlushFails(Vec<u8>);

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "flush failed"))
        }
    }

    #[test]
    fn test_flush_failure_in_finish_is_reported() {
        let mut writer = McapWriter::new(FlushFails(Vec::new()), WriterOptions::default()).unwrap();
        writer.write_schema(&schema()).unwrap();
        writer.write_channel(&channel()).unwrap();
        writer.write_message(&message(1)).unwrap();
        let err = writer.finish(Statistics::default()).unwrap_err();
        match err {
            MergeError::Io { context, .. } => assert_eq!(context, "flushing MCAP output"),
            other => panic!("unexpected error: {other}"),
        }
        // Everything up to the trailing magic reached the sink
        assert!(writer.into_inner().0.ends_with(&MCAP_MAGIC));
    }

    #[test]
    fn test_header_after_records_is_error() {
        let mut writer = McapWriter::new(Vec::new(), WriterOptions::default()).unwrap();
        writer.write_schema(&schema()).unwrap();
        assert!(writer.write_header(&Header::default()).is_err());
    }

    #[test]
    fn test_attachments_written_outside_chunks() {
        let mut writer = McapWriter::new(Vec::new(), WriterOptions::default()).unwrap();
        let attachment = Attachment {
            log_time: 1,
            create_time: 2,
            name: "calibration.yaml".to_string(),
            media_type: "application/yaml".to_string(),
            data: b"k: v".to_vec(),
        };
        writer.write_attachment(&attachment).unwrap();
        writer
            .write_metadata(&Metadata {
                name: "robot".to_string(),
                metadata: BTreeMap::from([("id".to_string(), "r2".to_string())]),
            })
            .unwrap();
        writer.finish(Statistics::default()).unwrap();
        let records = read_all(writer.into_inner());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::Attachment(attachment));
    }

    #[test]
    fn test_no_crc_writes_zero_data_crc() {
        let bytes = write_file(WriterOptions::default().with_crc(false), 1);
        // DataEnd body precedes the summary; locate it via the footer
        let footer_body = bytes.len() - 8 - 20;
        let mut start = [0u8; 8];
        start.copy_from_slice(&bytes[footer_body..footer_body + 8]);
        let summary_start = u64::from_le_bytes(start) as usize;
        assert_eq!(bytes[summary_start - 13], OP_DATA_END);
        assert_eq!(&bytes[summary_start - 4..summary_start], &[0, 0, 0, 0]);
        // Summary CRC is zero as well
        assert_eq!(&bytes[bytes.len() - 12..bytes.len() - 8], &[0, 0, 0, 0]);
    }
}
