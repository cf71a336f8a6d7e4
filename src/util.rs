//! Small helpers shared by the on-disk stores: file creation, synchronous
//! writes, and cbordata (de)serialization.

use cbordata::{Cbor, FromCbor, IntoCbor};

use std::{ffi, fs, io::Write, path};

use crate::{err_at, Error, Result};

/// create a file in append mode for writing, removing any stale file first.
pub fn create_file_a(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = {
        let os_file = path::Path::new(file);
        fs::remove_file(os_file).ok(); // NOTE: ignore remove errors.
        os_file
    };

    if let Some(parent) = os_file.parent() {
        if !parent.as_os_str().is_empty() {
            err_at!(IOError, fs::create_dir_all(parent))?;
        }
    }

    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.append(true).create_new(true).open(os_file))
}

/// open an existing file in append mode for writing.
pub fn open_file_a(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.append(true).open(os_file))
}

/// open an existing file for random read/write access.
pub fn open_file_w(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.read(true).write(true).open(os_file))
}

/// open file for reading.
pub fn open_file_r(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    err_at!(IOError, fs::OpenOptions::new().read(true).open(os_file))
}

/// open a file for reading, creating an empty one if it does not exist yet.
pub fn open_or_create_file_rw(file: &ffi::OsStr) -> Result<fs::File> {
    let os_file = path::Path::new(file);
    if let Some(parent) = os_file.parent() {
        if !parent.as_os_str().is_empty() {
            err_at!(IOError, fs::create_dir_all(parent))?;
        }
    }
    let mut opts = fs::OpenOptions::new();
    err_at!(IOError, opts.read(true).write(true).create(true).open(os_file))
}

/// write `data` to `file` and follow up with an `fsync`.
pub fn sync_write(file: &mut fs::File, data: &[u8]) -> Result<usize> {
    let n = err_at!(IOError, file.write(data))?;
    if n != data.len() {
        err_at!(IOError, msg: "partial write to file, {}/{}", n, data.len())?
    }
    err_at!(IOError, file.sync_all())?;
    Ok(n)
}

/// serialize `val` into its self-describing cbordata encoding.
pub fn into_cbor_bytes<T>(val: T) -> Result<Vec<u8>>
where
    T: IntoCbor,
{
    let mut data: Vec<u8> = vec![];
    let n = err_at!(FailCbor, err_at!(FailCbor, val.into_cbor())?.encode(&mut data))?;
    if n != data.len() {
        err_at!(Fatal, msg: "cbor encoding len mismatch {} {}", n, data.len())
    } else {
        Ok(data)
    }
}

/// deserialize a value of type `T` from its cbordata encoding, returning the
/// value and the number of bytes consumed.
pub fn from_cbor_bytes<T>(mut data: &[u8]) -> Result<(T, usize)>
where
    T: FromCbor,
{
    let (val, n) = err_at!(FailCbor, Cbor::decode(&mut data))?;
    Ok((err_at!(FailCbor, T::from_cbor(val))?, n))
}

#[cfg(test)]
#[path = "util_test.rs"]
mod util_test;
