// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Local to global identifier remapping.
//!
//! Each input numbers its schemas and channels independently. The remapper
//! keeps two grow-only tables keyed by `(input ordinal, local id)` and hands
//! out global ids sequentially from 1. Schema id 0 means "no schema" and is
//! passed through unchanged.
//!
//! Identical schemas from different inputs get distinct global ids; nothing
//! is deduplicated by content.

use std::collections::HashMap;

use crate::core::{MergeError, Result};
use crate::io::formats::mcap::records::Channel;

/// Outcome of registering a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaRegistration {
    /// Global schema id (0 for schemaless)
    pub schema_id: u16,
    /// True the first time this `(input, local id)` pair is seen
    pub is_new: bool,
}

/// Outcome of registering a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRegistration {
    pub channel_id: u16,
    pub schema_id: u16,
    pub new_channel: bool,
    pub new_schema: bool,
}

/// Grow-only tables from `(input, local id)` to global ids.
#[derive(Debug)]
pub struct IdentifierRemapper {
    schemas: HashMap<(usize, u16), u16>,
    channels: HashMap<(usize, u16), u16>,
    next_schema_id: u32,
    next_channel_id: u32,
}

impl Default for IdentifierRemapper {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierRemapper {
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
            channels: HashMap::new(),
            next_schema_id: 1,
            next_channel_id: 1,
        }
    }

    /// Map a local schema id of `input` to its global id, assigning the next
    /// free one on first sight.
    pub fn register_schema(&mut self, input: usize, local_id: u16) -> Result<SchemaRegistration> {
        if local_id == 0 {
            return Ok(SchemaRegistration {
                schema_id: 0,
                is_new: false,
            });
        }
        if let Some(&schema_id) = self.schemas.get(&(input, local_id)) {
            return Ok(SchemaRegistration {
                schema_id,
                is_new: false,
            });
        }
        let schema_id =
            u16::try_from(self.next_schema_id).map_err(|_| MergeError::exhausted("schema"))?;
        self.next_schema_id += 1;
        self.schemas.insert((input, local_id), schema_id);
        Ok(SchemaRegistration {
            schema_id,
            is_new: true,
        })
    }

    /// Map a channel of `input` to its global id, registering its schema
    /// first so schema numbering follows channel reference order.
    pub fn register_channel(
        &mut self,
        input: usize,
        channel: &Channel,
    ) -> Result<ChannelRegistration> {
        let schema = self.register_schema(input, channel.schema_id)?;
        if let Some(&channel_id) = self.channels.get(&(input, channel.id)) {
            return Ok(ChannelRegistration {
                channel_id,
                schema_id: schema.schema_id,
                new_channel: false,
                new_schema: schema.is_new,
            });
        }
        let channel_id =
            u16::try_from(self.next_channel_id).map_err(|_| MergeError::exhausted("channel"))?;
        self.next_channel_id += 1;
        self.channels.insert((input, channel.id), channel_id);
        Ok(ChannelRegistration {
            channel_id,
            schema_id: schema.schema_id,
            new_channel: true,
            new_schema: schema.is_new,
        })
    }

    /// Global id of a registered schema.
    pub fn schema_id(&self, input: usize, local_id: u16) -> Option<u16> {
        if local_id == 0 {
            return Some(0);
        }
        self.schemas.get(&(input, local_id)).copied()
    }

    /// Global id of a registered channel.
    pub fn channel_id(&self, input: usize, local_id: u16) -> Option<u16> {
        self.channels.get(&(input, local_id)).copied()
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
