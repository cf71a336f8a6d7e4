//! Thin wrapper around a single local file offering the three handle kinds
//! every append-oriented store in this crate is built from: a streaming
//! [Reader], an end-of-file [Appender] and a random-offset [Writer].

use std::{
    ffi,
    io::{Read, Seek, SeekFrom},
    path,
};

use crate::{err_at, util, Error, Result};

/// Locates a single on-disk file. Cheap to clone; opening the file happens
/// only when a handle (`reader`/`appender`/`writer`) is requested.
#[derive(Clone, Debug)]
pub struct File {
    loc: ffi::OsString,
}

impl File {
    pub fn new<P: Into<ffi::OsString>>(loc: P) -> File {
        File { loc: loc.into() }
    }

    pub fn location(&self) -> &ffi::OsStr {
        &self.loc
    }

    pub fn exists(&self) -> bool {
        path::Path::new(&self.loc).exists()
    }

    /// create an empty file at this location, truncating anything already there.
    pub fn create_empty(&self) -> Result<()> {
        util::create_file_a(&self.loc)?;
        Ok(())
    }

    /// current file size in bytes. Fails with `FileStat` if the file cannot be
    /// stat-ed (e.g. it does not exist yet).
    pub fn len(&self) -> Result<u64> {
        let m = err_at!(FileStat, std::fs::metadata(&self.loc))?;
        Ok(m.len())
    }

    pub fn reader(&self, offset: u64) -> Result<Reader> {
        Reader::new(&self.loc, offset)
    }

    pub fn appender(&self) -> Result<Appender> {
        Appender::new(&self.loc)
    }

    pub fn writer(&self) -> Result<Writer> {
        Writer::new(&self.loc)
    }

    /// truncate the file to `size` bytes, used by Compact to drop trailing data.
    pub fn truncate(&self, size: u64) -> Result<()> {
        let fd = util::open_file_w(&self.loc)?;
        err_at!(IOError, fd.set_len(size))
    }
}

/// Positioned, read-only handle. A `Reader` past end-of-file is still valid:
/// every subsequent `read_n` returns an empty byte vector instead of erroring.
pub struct Reader {
    fd: Option<std::fs::File>,
}

impl Reader {
    fn new(loc: &ffi::OsStr, offset: u64) -> Result<Reader> {
        if !path::Path::new(loc).exists() {
            return Ok(Reader { fd: None });
        }
        let mut fd = util::open_file_r(loc)?;
        let len = err_at!(FileStat, fd.metadata())?.len();
        if offset >= len {
            return Ok(Reader { fd: None });
        }
        err_at!(IOError, fd.seek(SeekFrom::Start(offset)))?;
        Ok(Reader { fd: Some(fd) })
    }

    /// read exactly `n` bytes, or fail with `FileRead` if fewer are available.
    pub fn read_n(&mut self, n: usize) -> Result<Vec<u8>> {
        match self.fd.as_mut() {
            None => Ok(Vec::new()),
            Some(fd) => {
                let mut buf = vec![0u8; n];
                let got = err_at!(IOError, fd.read(&mut buf))?;
                if got != n {
                    err_at!(FileRead, msg: "short read {}/{} wanted", got, n)?;
                }
                Ok(buf)
            }
        }
    }
}

/// Append-only handle, always positioned at the current end of file.
pub struct Appender {
    fd: std::fs::File,
    closed: bool,
}

impl Appender {
    fn new(loc: &ffi::OsStr) -> Result<Appender> {
        let fd = if path::Path::new(loc).exists() {
            util::open_file_a(loc)?
        } else {
            util::create_file_a(loc)?
        };
        Ok(Appender { fd, closed: false })
    }

    /// append `data`, returning the byte offset at which it was written.
    pub fn append(&mut self, data: &[u8]) -> Result<u64> {
        let fpos = err_at!(FileStat, self.fd.metadata())?.len();
        if !data.is_empty() {
            util::sync_write(&mut self.fd, data)?;
        }
        Ok(fpos)
    }

    /// close this appender. Idempotent: calling it more than once is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

impl Drop for Appender {
    fn drop(&mut self) {
        self.closed = true;
    }
}

/// Random-offset read/write handle.
pub struct Writer {
    fd: std::fs::File,
}

impl Writer {
    fn new(loc: &ffi::OsStr) -> Result<Writer> {
        let fd = util::open_or_create_file_rw(loc)?;
        Ok(Writer { fd })
    }

    /// write `data` at `offset`. `offset = -1` means "end of file"; any value
    /// less than `-1` fails with `InvalidOffset`. Writes within the current
    /// size overwrite in place; writes past the end extend the file.
    pub fn write_at(&mut self, offset: i64, data: &[u8]) -> Result<()> {
        if offset < -1 {
            err_at!(InvalidOffset, msg: "invalid writer offset {}", offset)?;
        }
        let seek = if offset == -1 {
            SeekFrom::End(0)
        } else {
            SeekFrom::Start(offset as u64)
        };
        err_at!(IOError, self.fd.seek(seek))?;
        util::sync_write(&mut self.fd, data)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;
