// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Streaming MCAP record readers.
//!
//! Two strategies are provided:
//! - [`LinearRecordReader`] walks the file front to back over any [`Read`],
//!   unpacking chunks as it meets them. Memory use is bounded by the largest
//!   record or decompressed chunk.
//! - [`IndexedRecordReader`] uses the footer and summary section of a seekable
//!   file to load chunks by start time and yields their messages in log-time
//!   order, interleaving chunks that overlap. Indexed attachments and metadata
//!   follow. Files without a usable summary are read linearly.
//!
//! [`McapRecordReader`] hides the choice behind one interface.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{Compression, MergeError, Result};
use crate::io::formats::mcap::constants::{
    FOOTER_AND_MAGIC_LEN, FOOTER_BODY_LEN, MCAP_MAGIC, OP_ATTACHMENT, OP_ATTACHMENT_INDEX,
    OP_CHANNEL, OP_CHUNK, OP_CHUNK_INDEX, OP_DATA_END, OP_FOOTER, OP_HEADER, OP_MESSAGE,
    OP_METADATA, OP_METADATA_INDEX, OP_SCHEMA, RECORD_PREFIX_LEN,
};
use crate::io::formats::mcap::records::{
    Attachment, AttachmentIndex, BodyReader, Channel, ChunkHeader, ChunkIndex, Footer, Header,
    Message, Metadata, MetadataIndex, Record, Schema,
};

/// Upper bound on speculative buffer reservations driven by on-disk lengths.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Common interface of the record readers.
pub trait RecordReader {
    /// Input name used in errors and logs.
    fn name(&self) -> &str;

    /// The file's header record.
    fn header(&self) -> &Header;

    /// Next schema, channel, message, attachment or metadata record, or
    /// `None` once the input is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Any seekable byte source.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Byte source handed to [`McapRecordReader::open`].
pub enum RecordSource {
    /// Forward-only stream, always read linearly
    Stream(Box<dyn Read + Send>),
    /// Seekable source, eligible for index-assisted reading
    Seekable(Box<dyn ReadSeek + Send>),
}

impl std::fmt::Debug for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordSource::Stream(_) => f.write_str("RecordSource::Stream"),
            RecordSource::Seekable(_) => f.write_str("RecordSource::Seekable"),
        }
    }
}

/// Map an I/O failure while reading an input to a merge error.
///
/// A short read means the file ends in the middle of a structure, which is
/// a malformed input rather than an I/O failure.
fn read_error(name: &str, what: &str, err: io::Error) -> MergeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        MergeError::malformed(name, format!("truncated while reading {what}"))
    } else {
        MergeError::io(format!("reading {what} from '{name}'"), err)
    }
}

/// Read exactly `len` bytes without trusting `len` for the allocation.
fn read_body<R: Read>(name: &str, reader: &mut R, len: u64, what: &str) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(len.min(MAX_PREALLOC) as usize);
    reader
        .take(len)
        .read_to_end(&mut body)
        .map_err(|e| read_error(name, what, e))?;
    if body.len() as u64 != len {
        return Err(MergeError::malformed(
            name,
            format!("truncated {what}: expected {len} bytes, got {}", body.len()),
        ));
    }
    Ok(body)
}

fn skip_body<R: Read>(name: &str, reader: &mut R, len: u64, what: &str) -> Result<()> {
    let skipped = io::copy(&mut reader.take(len), &mut io::sink())
        .map_err(|e| read_error(name, what, e))?;
    if skipped != len {
        return Err(MergeError::malformed(
            name,
            format!("truncated {what}: expected {len} bytes, got {skipped}"),
        ));
    }
    Ok(())
}

fn read_prefix<R: Read>(name: &str, reader: &mut R) -> Result<(u8, u64)> {
    let op = reader
        .read_u8()
        .map_err(|e| read_error(name, "record opcode", e))?;
    let len = reader
        .read_u64::<LittleEndian>()
        .map_err(|e| read_error(name, "record length", e))?;
    Ok((op, len))
}

fn check_magic(name: &str, magic: &[u8], position: &str) -> Result<()> {
    if magic != MCAP_MAGIC {
        return Err(MergeError::malformed(
            name,
            format!("invalid {position} magic: {}", hex::encode(magic)),
        ));
    }
    Ok(())
}

/// Read the leading magic and the header record.
fn read_preamble<R: Read>(name: &str, reader: &mut R) -> Result<Header> {
    let mut magic = [0u8; 8];
    reader
        .read_exact(&mut magic)
        .map_err(|e| read_error(name, "magic", e))?;
    check_magic(name, &magic, "leading")?;

    let (op, len) = read_prefix(name, reader)?;
    if op != OP_HEADER {
        return Err(MergeError::malformed(
            name,
            format!("expected header record, found opcode {op:#04x}"),
        ));
    }
    let body = read_body(name, reader, len, "header record")?;
    Header::parse(&body).map_err(|reason| MergeError::malformed(name, reason))
}

fn parse_record(name: &str, op: u8, body: &[u8]) -> Result<Option<Record>> {
    let parsed = match op {
        OP_SCHEMA => Schema::parse(body).map(Record::Schema),
        OP_CHANNEL => Channel::parse(body).map(Record::Channel),
        OP_MESSAGE => Message::parse(body).map(Record::Message),
        OP_ATTACHMENT => Attachment::parse(body).map(Record::Attachment),
        OP_METADATA => Metadata::parse(body).map(Record::Metadata),
        _ => return Ok(None),
    };
    parsed
        .map(Some)
        .map_err(|reason| MergeError::malformed(name, reason))
}

/// Decompressed records of one chunk, consumed front to back.
#[derive(Debug, Default)]
struct ChunkCursor {
    records: Vec<u8>,
    pos: usize,
}

impl ChunkCursor {
    /// Decode a chunk record body: header, decompression and CRC check.
    fn decode(name: &str, body: &[u8]) -> Result<Self> {
        let mut r = BodyReader::new(body, "Chunk");
        let header =
            ChunkHeader::parse(&mut r).map_err(|reason| MergeError::malformed(name, reason))?;
        let start = r.position() as usize;
        if header.records_length > r.remaining() {
            return Err(MergeError::malformed(
                name,
                format!(
                    "chunk records length {} exceeds record size",
                    header.records_length
                ),
            ));
        }
        let compressed = &body[start..start + header.records_length as usize];

        let compression = Compression::from_record(&header.compression).ok_or_else(|| {
            MergeError::malformed(
                name,
                format!("unsupported chunk compression '{}'", header.compression),
            )
        })?;
        let records = match compression {
            Compression::None => compressed.to_vec(),
            Compression::Zstd => {
                let decoder = zstd::stream::read::Decoder::new(compressed)
                    .map_err(|e| MergeError::malformed(name, format!("zstd chunk: {e}")))?;
                inflate(name, decoder, header.uncompressed_size, "zstd")?
            }
            Compression::Lz4 => inflate(
                name,
                lz4_flex::frame::FrameDecoder::new(compressed),
                header.uncompressed_size,
                "lz4",
            )?,
        };

        if records.len() as u64 != header.uncompressed_size {
            return Err(MergeError::malformed(
                name,
                format!(
                    "chunk uncompressed size mismatch: header says {}, got {}",
                    header.uncompressed_size,
                    records.len()
                ),
            ));
        }
        if header.uncompressed_crc != 0 {
            let actual = crc32fast::hash(&records);
            if actual != header.uncompressed_crc {
                return Err(MergeError::malformed(
                    name,
                    format!(
                        "chunk CRC mismatch: expected {:#010x}, computed {actual:#010x}",
                        header.uncompressed_crc
                    ),
                ));
            }
        }

        tracing::trace!(
            input = name,
            compression = header.compression.as_str(),
            uncompressed = records.len(),
            "Decoded chunk"
        );
        Ok(Self { records, pos: 0 })
    }

    fn next_record(&mut self, name: &str) -> Result<Option<Record>> {
        while self.pos < self.records.len() {
            let remaining = &self.records[self.pos..];
            if (remaining.len() as u64) < RECORD_PREFIX_LEN {
                return Err(MergeError::malformed(name, "truncated record inside chunk"));
            }
            let op = remaining[0];
            let mut len_bytes = [0u8; 8];
            len_bytes.copy_from_slice(&remaining[1..9]);
            let len = u64::from_le_bytes(len_bytes);
            if len > remaining.len() as u64 - RECORD_PREFIX_LEN {
                return Err(MergeError::malformed(
                    name,
                    format!("record of {len} bytes overruns chunk"),
                ));
            }
            let body = &remaining[9..9 + len as usize];
            self.pos += 9 + len as usize;

            match op {
                OP_SCHEMA | OP_CHANNEL | OP_MESSAGE => return parse_record(name, op, body),
                _ => continue,
            }
        }
        Ok(None)
    }

    fn is_exhausted(&self) -> bool {
        self.pos >= self.records.len()
    }
}

fn inflate<D: Read>(name: &str, decoder: D, expected: u64, codec: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected.min(MAX_PREALLOC) as usize);
    decoder
        .take(expected.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| MergeError::malformed(name, format!("{codec} decompression failed: {e}")))?;
    Ok(out)
}

/// Reader wrapper tracking the byte offset and running CRC of consumed bytes.
struct Tracked<R> {
    inner: R,
    position: u64,
    crc: crc32fast::Hasher,
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.crc.update(&buf[..n]);
        self.position += n as u64;
        Ok(n)
    }
}

/// Front-to-back record reader.
pub struct LinearRecordReader<R> {
    name: String,
    source: Tracked<R>,
    header: Header,
    chunk: ChunkCursor,
    finished: bool,
}

impl<R: Read> LinearRecordReader<R> {
    /// Validate the magic and header of `reader` and prepare to iterate.
    pub fn new(name: impl Into<String>, reader: R) -> Result<Self> {
        let name = name.into();
        let mut source = Tracked {
            inner: reader,
            position: 0,
            crc: crc32fast::Hasher::new(),
        };
        let header = read_preamble(&name, &mut source)?;
        tracing::debug!(
            input = %name,
            profile = %header.profile,
            library = %header.library,
            "Opened MCAP input for linear reading"
        );
        Ok(Self {
            name,
            source,
            header,
            chunk: ChunkCursor::default(),
            finished: false,
        })
    }

    /// Skip the summary section, then validate footer and trailing magic.
    fn read_trailer(&mut self) -> Result<()> {
        loop {
            let (op, len) = read_prefix(&self.name, &mut self.source)?;
            if op == OP_FOOTER {
                if len != FOOTER_BODY_LEN {
                    return Err(MergeError::malformed(
                        &self.name,
                        format!("footer record has length {len}, expected {FOOTER_BODY_LEN}"),
                    ));
                }
                skip_body(&self.name, &mut self.source, len, "footer record")?;
                break;
            }
            skip_body(&self.name, &mut self.source, len, "summary record")?;
        }

        let mut magic = [0u8; 8];
        self.source
            .read_exact(&mut magic)
            .map_err(|e| read_error(&self.name, "trailing magic", e))?;
        check_magic(&self.name, &magic, "trailing")
    }

    fn read_data_end(&mut self, len: u64, expected_crc: u32) -> Result<()> {
        let body = read_body(&self.name, &mut self.source, len, "data end record")?;
        let stored = BodyReader::new(&body, "DataEnd")
            .u32("data_section_crc")
            .map_err(|reason| MergeError::malformed(&self.name, reason))?;
        if stored != 0 && stored != expected_crc {
            return Err(MergeError::malformed(
                &self.name,
                format!(
                    "data section CRC mismatch: expected {stored:#010x}, computed {expected_crc:#010x}"
                ),
            ));
        }
        Ok(())
    }
}

impl<R: Read> RecordReader for LinearRecordReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if !self.chunk.is_exhausted() {
                if let Some(record) = self.chunk.next_record(&self.name)? {
                    return Ok(Some(record));
                }
                continue;
            }
            if self.finished {
                return Ok(None);
            }

            // CRC of everything before this record, for DataEnd
            let data_crc = self.source.crc.clone().finalize();
            let offset = self.source.position;
            let (op, len) = read_prefix(&self.name, &mut self.source)?;

            match op {
                OP_SCHEMA | OP_CHANNEL | OP_MESSAGE | OP_ATTACHMENT | OP_METADATA => {
                    let body = read_body(&self.name, &mut self.source, len, "record")?;
                    return parse_record(&self.name, op, &body);
                }
                OP_CHUNK => {
                    let body = read_body(&self.name, &mut self.source, len, "chunk record")?;
                    self.chunk = ChunkCursor::decode(&self.name, &body)?;
                }
                OP_DATA_END => {
                    self.read_data_end(len, data_crc)?;
                    self.read_trailer()?;
                    self.finished = true;
                }
                OP_FOOTER => {
                    // No DataEnd record; the footer closes the file directly
                    skip_body(&self.name, &mut self.source, len, "footer record")?;
                    let mut magic = [0u8; 8];
                    self.source
                        .read_exact(&mut magic)
                        .map_err(|e| read_error(&self.name, "trailing magic", e))?;
                    check_magic(&self.name, &magic, "trailing")?;
                    self.finished = true;
                }
                OP_HEADER => {
                    return Err(MergeError::malformed(
                        &self.name,
                        format!("unexpected second header record at offset {offset}"),
                    ));
                }
                _ => {
                    // Indexes, statistics and unknown opcodes carry nothing to merge
                    skip_body(&self.name, &mut self.source, len, "record")?;
                }
            }
        }
    }
}

/// Message from a decoded chunk, ordered by `(log_time, decode order)`.
struct BufferedMessage {
    seq: u64,
    message: Message,
}

impl BufferedMessage {
    fn key(&self) -> (u64, u64) {
        (self.message.log_time, self.seq)
    }
}

impl PartialEq for BufferedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for BufferedMessage {}

impl PartialOrd for BufferedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BufferedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// State of an index-driven read.
///
/// A chunk is decoded once its start time is no later than the earliest
/// buffered message, so messages of overlapping chunks come out merged.
struct IndexedState {
    pending: VecDeque<Record>,
    chunks: VecDeque<ChunkIndex>,
    attachments: VecDeque<AttachmentIndex>,
    metadata: VecDeque<MetadataIndex>,
    buffered: BinaryHeap<Reverse<BufferedMessage>>,
    decoded: u64,
}

impl IndexedState {
    /// Whether the next chunk must be loaded before yielding a buffered message.
    fn needs_chunk(&self) -> bool {
        match (self.chunks.front(), self.buffered.peek()) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(next), Some(Reverse(head))) => {
                next.message_start_time <= head.message.log_time
            }
        }
    }

    /// Buffer the messages of a decoded chunk; its schemas and channels are
    /// queued ahead of any message.
    fn load_chunk(&mut self, name: &str, mut chunk: ChunkCursor) -> Result<()> {
        while let Some(record) = chunk.next_record(name)? {
            match record {
                Record::Message(message) => {
                    self.buffered.push(Reverse(BufferedMessage {
                        seq: self.decoded,
                        message,
                    }));
                    self.decoded += 1;
                }
                other => self.pending.push_back(other),
            }
        }
        Ok(())
    }
}

enum IndexedMode<R> {
    Indexed(IndexedState, R),
    Linear(LinearRecordReader<R>),
}

/// Summary-driven record reader for seekable inputs.
pub struct IndexedRecordReader<R> {
    name: String,
    header: Header,
    mode: IndexedMode<R>,
}

impl<R: Read + Seek> IndexedRecordReader<R> {
    /// Open a seekable input, reading its footer and summary section.
    ///
    /// Inputs without a summary or without chunk indexes are read linearly.
    pub fn new(name: impl Into<String>, mut reader: R) -> Result<Self> {
        let name = name.into();
        let header = read_preamble(&name, &mut reader)?;

        match Self::read_summary(&name, &mut reader)? {
            Some(state) => {
                tracing::debug!(
                    input = %name,
                    schemas_and_channels = state.pending.len(),
                    chunks = state.chunks.len(),
                    attachments = state.attachments.len(),
                    metadata = state.metadata.len(),
                    "Opened MCAP input for indexed reading"
                );
                Ok(Self {
                    name,
                    header,
                    mode: IndexedMode::Indexed(state, reader),
                })
            }
            None => {
                tracing::debug!(input = %name, "No usable summary, falling back to linear reading");
                reader
                    .seek(SeekFrom::Start(0))
                    .map_err(|e| MergeError::io(format!("seeking '{name}'"), e))?;
                let linear = LinearRecordReader::new(name.clone(), reader)?;
                Ok(Self {
                    name,
                    header,
                    mode: IndexedMode::Linear(linear),
                })
            }
        }
    }

    /// Whether the summary section is being used.
    pub fn is_indexed(&self) -> bool {
        matches!(self.mode, IndexedMode::Indexed(..))
    }

    fn read_summary(name: &str, reader: &mut R) -> Result<Option<IndexedState>> {
        let seek_err = |e: io::Error| MergeError::io(format!("seeking '{name}'"), e);
        let file_len = reader.seek(SeekFrom::End(0)).map_err(seek_err)?;
        if file_len < 8 + FOOTER_AND_MAGIC_LEN {
            return Err(MergeError::malformed(name, "file too short to hold a footer"));
        }
        let footer_start = file_len - FOOTER_AND_MAGIC_LEN;
        reader
            .seek(SeekFrom::Start(footer_start))
            .map_err(seek_err)?;

        let (op, len) = read_prefix(name, reader)?;
        if op != OP_FOOTER || len != FOOTER_BODY_LEN {
            return Err(MergeError::malformed(
                name,
                format!("no footer record at offset {footer_start}"),
            ));
        }
        let footer_body = read_body(name, reader, len, "footer record")?;
        let footer =
            Footer::parse(&footer_body).map_err(|reason| MergeError::malformed(name, reason))?;
        let mut magic = [0u8; 8];
        reader
            .read_exact(&mut magic)
            .map_err(|e| read_error(name, "trailing magic", e))?;
        check_magic(name, &magic, "trailing")?;

        if footer.summary_start == 0 {
            return Ok(None);
        }
        if footer.summary_start > footer_start {
            return Err(MergeError::malformed(
                name,
                format!(
                    "summary start {} lies beyond the footer at {footer_start}",
                    footer.summary_start
                ),
            ));
        }

        reader
            .seek(SeekFrom::Start(footer.summary_start))
            .map_err(seek_err)?;
        let summary = read_body(
            name,
            reader,
            footer_start - footer.summary_start,
            "summary section",
        )?;

        if footer.summary_crc != 0 {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&summary);
            hasher.update(&[OP_FOOTER]);
            hasher.update(&FOOTER_BODY_LEN.to_le_bytes());
            hasher.update(&footer_body[..16]);
            let actual = hasher.finalize();
            if actual != footer.summary_crc {
                return Err(MergeError::malformed(
                    name,
                    format!(
                        "summary CRC mismatch: expected {:#010x}, computed {actual:#010x}",
                        footer.summary_crc
                    ),
                ));
            }
        }

        let mut schemas = Vec::new();
        let mut channels = Vec::new();
        let mut chunks = Vec::new();
        let mut attachments = VecDeque::new();
        let mut metadata = VecDeque::new();

        let mut pos = 0usize;
        while pos < summary.len() {
            let rest = &summary[pos..];
            if (rest.len() as u64) < RECORD_PREFIX_LEN {
                return Err(MergeError::malformed(name, "truncated summary record"));
            }
            let op = rest[0];
            let mut len_bytes = [0u8; 8];
            len_bytes.copy_from_slice(&rest[1..9]);
            let len = u64::from_le_bytes(len_bytes);
            if len > rest.len() as u64 - RECORD_PREFIX_LEN {
                return Err(MergeError::malformed(
                    name,
                    format!("summary record of {len} bytes overruns the summary section"),
                ));
            }
            let body = &rest[9..9 + len as usize];
            pos += 9 + len as usize;

            let malformed = |reason: String| MergeError::malformed(name, reason);
            match op {
                OP_SCHEMA => schemas.push(Record::Schema(Schema::parse(body).map_err(malformed)?)),
                OP_CHANNEL => {
                    channels.push(Record::Channel(Channel::parse(body).map_err(malformed)?))
                }
                OP_CHUNK_INDEX => chunks.push(ChunkIndex::parse(body).map_err(malformed)?),
                OP_ATTACHMENT_INDEX => {
                    attachments.push_back(AttachmentIndex::parse(body).map_err(malformed)?)
                }
                OP_METADATA_INDEX => {
                    metadata.push_back(MetadataIndex::parse(body).map_err(malformed)?)
                }
                _ => {}
            }
        }

        if chunks.is_empty() {
            return Ok(None);
        }
        chunks.sort_by_key(|c| (c.message_start_time, c.chunk_start_offset));

        let mut pending: VecDeque<Record> = schemas.into();
        pending.extend(channels);
        Ok(Some(IndexedState {
            pending,
            chunks: chunks.into(),
            attachments,
            metadata,
            buffered: BinaryHeap::new(),
            decoded: 0,
        }))
    }

    fn read_at(
        name: &str,
        reader: &mut R,
        offset: u64,
        expected_op: u8,
        what: &str,
    ) -> Result<Vec<u8>> {
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| MergeError::io(format!("seeking '{name}'"), e))?;
        let (op, len) = read_prefix(name, reader)?;
        if op != expected_op {
            return Err(MergeError::malformed(
                name,
                format!("index points at opcode {op:#04x} at offset {offset}, expected {what}"),
            ));
        }
        read_body(name, reader, len, what)
    }
}

impl<R: Read + Seek> RecordReader for IndexedRecordReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        let (state, reader) = match &mut self.mode {
            IndexedMode::Linear(linear) => return linear.next_record(),
            IndexedMode::Indexed(state, reader) => (state, reader),
        };
        let name = self.name.as_str();

        loop {
            if let Some(record) = state.pending.pop_front() {
                return Ok(Some(record));
            }
            if state.needs_chunk() {
                if let Some(index) = state.chunks.pop_front() {
                    let body =
                        Self::read_at(name, reader, index.chunk_start_offset, OP_CHUNK, "chunk")?;
                    state.load_chunk(name, ChunkCursor::decode(name, &body)?)?;
                }
                continue;
            }
            match state.buffered.pop() {
                Some(Reverse(buffered)) => return Ok(Some(Record::Message(buffered.message))),
                None => break,
            }
        }

        if let Some(index) = state.attachments.pop_front() {
            let body = Self::read_at(name, reader, index.offset, OP_ATTACHMENT, "attachment")?;
            return parse_record(name, OP_ATTACHMENT, &body);
        }
        if let Some(index) = state.metadata.pop_front() {
            let body = Self::read_at(name, reader, index.offset, OP_METADATA, "metadata")?;
            return parse_record(name, OP_METADATA, &body);
        }
        Ok(None)
    }
}

/// Record reader over either a stream or a seekable source.
pub struct McapRecordReader {
    inner: Box<dyn RecordReader + Send>,
}

impl McapRecordReader {
    /// Open `source`. Seekable sources use the summary index when
    /// `use_index` is set; streams are always read linearly.
    pub fn open(name: impl Into<String>, source: RecordSource, use_index: bool) -> Result<Self> {
        let name = name.into();
        let inner: Box<dyn RecordReader + Send> = match source {
            RecordSource::Stream(reader) => Box::new(LinearRecordReader::new(name, reader)?),
            RecordSource::Seekable(reader) if use_index => {
                Box::new(IndexedRecordReader::new(name, reader)?)
            }
            RecordSource::Seekable(reader) => Box::new(LinearRecordReader::new(name, reader)?),
        };
        Ok(Self { inner })
    }

    /// Input name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The input's header record.
    pub fn header(&self) -> &Header {
        self.inner.header()
    }

    /// Next record, or `None` at the end of the input.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        self.inner.next_record()
    }
}

impl Iterator for McapRecordReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next_record().transpose()
    }
}

impl std::fmt::Debug for McapRecordReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McapRecordReader")
            .field("name", &self.inner.name())
            .finish()
    }
}
