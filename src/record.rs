//! Domain types shared by [Index] and [Dataset]: the data descriptor, the
//! removal-flag bitfield and the fixed-width on-disk index row.

use std::convert::TryFrom;

use crate::{err_at, Error, Result};

/// Size, in bytes, of one packed [IndexRow] on disk.
pub const ROW_SIZE: usize = 32;

/// Opaque classifier for a record's payload. The engine never interprets the
/// bytes differently based on this value; it is round-tripped for callers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Descriptor {
    #[default]
    Text,
    Image,
    Audio,
    Video,
}

impl From<Descriptor> for u8 {
    fn from(d: Descriptor) -> u8 {
        match d {
            Descriptor::Text => 0,
            Descriptor::Image => 1,
            Descriptor::Audio => 2,
            Descriptor::Video => 3,
        }
    }
}

impl TryFrom<u8> for Descriptor {
    type Error = Error;

    fn try_from(v: u8) -> Result<Descriptor> {
        match v {
            0 => Ok(Descriptor::Text),
            1 => Ok(Descriptor::Image),
            2 => Ok(Descriptor::Audio),
            3 => Ok(Descriptor::Video),
            v => err_at!(Fatal, msg: "unknown data descriptor {}", v),
        }
    }
}

/// Bit 0 marks a row as removed, pending [Index::compact]. All other bits
/// are reserved and must be preserved verbatim by read-modify-write
/// operations ([Index::set_flags] / [Index::reset_flags]).
pub const MARKED_FOR_REMOVAL: u8 = 0b0000_0001;

/// One 32-byte row of the index file: the locations of a record's
/// components plus the small amount of inline metadata describing them.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IndexRow {
    pub data_offset: i64,
    pub data_size: i32,
    pub meta_offset: i64,
    pub meta_size: i32,
    pub vector_slot: i32,
    pub data_desc: u8,
    pub meta_desc: u8,
    pub flags: u8,
    pub reserved: u8,
}

impl IndexRow {
    pub fn new() -> IndexRow {
        IndexRow {
            data_offset: -1,
            data_size: 0,
            meta_offset: -1,
            meta_size: 0,
            vector_slot: -1,
            data_desc: 0,
            meta_desc: 0,
            flags: 0,
            reserved: 0,
        }
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.flags & MARKED_FOR_REMOVAL != 0
    }

    /// pack this row into its fixed 32-byte little-endian encoding.
    pub fn to_bytes(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[0..8].copy_from_slice(&self.data_offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.data_size.to_le_bytes());
        buf[12..20].copy_from_slice(&self.meta_offset.to_le_bytes());
        buf[20..24].copy_from_slice(&self.meta_size.to_le_bytes());
        buf[24..28].copy_from_slice(&self.vector_slot.to_le_bytes());
        buf[28] = self.data_desc;
        buf[29] = self.meta_desc;
        buf[30] = self.flags;
        buf[31] = self.reserved;
        buf
    }

    /// unpack a row from its fixed 32-byte little-endian encoding.
    pub fn from_bytes(buf: &[u8]) -> Result<IndexRow> {
        if buf.len() != ROW_SIZE {
            err_at!(Fatal, msg: "index row wrong size {}/{}", buf.len(), ROW_SIZE)?;
        }
        let i64_at = |s: usize| i64::from_le_bytes(buf[s..s + 8].try_into().unwrap());
        let i32_at = |s: usize| i32::from_le_bytes(buf[s..s + 4].try_into().unwrap());

        Ok(IndexRow {
            data_offset: i64_at(0),
            data_size: i32_at(8),
            meta_offset: i64_at(12),
            meta_size: i32_at(20),
            vector_slot: i32_at(24),
            data_desc: buf[28],
            meta_desc: buf[29],
            flags: buf[30],
            reserved: buf[31],
        })
    }
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
