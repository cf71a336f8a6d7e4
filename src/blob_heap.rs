//! Append-only byte heap: payloads go in, `(offset, length)` come back. The
//! interpretation of the bytes is entirely up to the caller (the [Index]
//! row that references them carries the interpretation).

use std::convert::TryFrom;

use crate::{err_at, file::File, Error, Result};

pub struct BlobHeap {
    file: File,
    appender: crate::file::Appender,
}

impl BlobHeap {
    /// open the heap file at `loc`, creating it empty if it does not exist.
    pub fn open<P: Into<std::ffi::OsString>>(loc: P) -> Result<BlobHeap> {
        let file = File::new(loc);
        if !file.exists() {
            file.create_empty()?;
        }
        let appender = file.appender()?;
        Ok(BlobHeap { file, appender })
    }

    /// append `bytes`, returning `(offset, length)`. Empty input writes
    /// nothing and returns the `(-1, 0)` sentinel.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(i64, i32)> {
        if bytes.is_empty() {
            return Ok((-1, 0));
        }
        let offset = self.appender.append(bytes)?;
        let offset = err_at!(FailConvert, i64::try_from(offset))?;
        let length = err_at!(FailConvert, i32::try_from(bytes.len()))?;
        Ok((offset, length))
    }

    /// read back `length` bytes starting at `offset`. `offset = -1` returns
    /// an empty byte sequence without touching the file.
    pub fn read(&self, offset: i64, length: i32) -> Result<Vec<u8>> {
        if offset == -1 {
            return Ok(Vec::new());
        }
        if offset < -1 {
            err_at!(InvalidId, msg: "negative blob offset {}", offset)?;
        }
        if length < 0 {
            err_at!(InvalidId, msg: "negative blob length {}", length)?;
        }
        let mut reader = self.file.reader(offset as u64)?;
        reader.read_n(length as usize)
    }

    /// close the append handle; writes are already synchronous, so this is
    /// mostly bookkeeping to satisfy [Dataset]'s uniform flush ordering.
    pub fn flush(&mut self) -> Result<()> {
        self.appender.close()
    }

    pub fn is_persisted(&self) -> bool {
        true
    }

    pub fn len(&self) -> Result<u64> {
        self.file.len()
    }

    /// truncate the heap to empty and reopen the append handle. Used by
    /// [crate::dataset::Dataset::compact] to rewrite a heap with only the
    /// surviving blobs.
    pub fn clear(&mut self) -> Result<()> {
        self.appender.close()?;
        self.file.truncate(0)?;
        self.appender = self.file.appender()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "blob_heap_test.rs"]
mod blob_heap_test;
