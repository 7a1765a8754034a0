// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP framing constants: magic, record opcodes and fixed lengths.
//!
//! See <https://mcap.dev/spec#opcodes>.

/// Leading and trailing file magic.
pub const MCAP_MAGIC: [u8; 8] = [0x89, b'M', b'C', b'A', b'P', b'0', b'\r', b'\n'];

// Data section records
pub const OP_HEADER: u8 = 0x01;
pub const OP_SCHEMA: u8 = 0x03;
pub const OP_CHANNEL: u8 = 0x04;
pub const OP_MESSAGE: u8 = 0x05;
pub const OP_CHUNK: u8 = 0x06;
/// Follows a chunk; one per channel present in it.
pub const OP_MESSAGE_INDEX: u8 = 0x07;
pub const OP_ATTACHMENT: u8 = 0x09;
pub const OP_METADATA: u8 = 0x0C;
/// Last data section record, carries the data section CRC.
pub const OP_DATA_END: u8 = 0x0F;

// Summary section records
pub const OP_CHUNK_INDEX: u8 = 0x08;
pub const OP_ATTACHMENT_INDEX: u8 = 0x0A;
pub const OP_STATISTICS: u8 = 0x0B;
pub const OP_METADATA_INDEX: u8 = 0x0D;
/// Points at one group of same-opcode records in the summary section.
pub const OP_SUMMARY_OFFSET: u8 = 0x0E;
pub const OP_FOOTER: u8 = 0x02;

/// Opcode (1) + record length (8) prefix in front of every record.
pub const RECORD_PREFIX_LEN: u64 = 9;

/// Footer body: summary_start (8) + summary_offset_start (8) + summary_crc (4).
pub const FOOTER_BODY_LEN: u64 = 20;

/// Footer record plus trailing magic, measured from the end of the file.
pub const FOOTER_AND_MAGIC_LEN: u64 = RECORD_PREFIX_LEN + FOOTER_BODY_LEN + 8;
