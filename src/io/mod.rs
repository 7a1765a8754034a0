// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer: container formats read and written by the merge engine.

pub mod formats;

pub use formats::mcap::{McapRecordReader, McapWriter, RecordSource, WriterOptions};
