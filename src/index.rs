//! Fixed-width record index: maps a record id to the locations of its
//! components. The pivot that keeps the data, meta and vector stores
//! addressable by a single integer id.

use std::collections::HashMap;

use crate::{
    err_at,
    file::{Appender, File},
    record::{IndexRow, ROW_SIZE},
    Error, Result,
};

pub struct Index {
    file: File,
    appender: Appender,
    rows: Vec<IndexRow>,
    persisted_count: usize,
    max_append_buffer: usize,
}

impl Index {
    /// open the index file at `loc`, creating it empty if absent, and load
    /// every persisted row into memory.
    pub fn open<P: Into<std::ffi::OsString>>(
        loc: P,
        max_append_buffer: usize,
    ) -> Result<Index> {
        let file = File::new(loc);
        if !file.exists() {
            file.create_empty()?;
        }

        let len = file.len()?;
        if len % (ROW_SIZE as u64) != 0 {
            err_at!(
                Fatal, msg: "index file size {} not a multiple of row size {}", len, ROW_SIZE
            )?;
        }
        let persisted_count = (len / ROW_SIZE as u64) as usize;

        let mut rows = Vec::with_capacity(persisted_count);
        if persisted_count > 0 {
            let mut reader = file.reader(0)?;
            for _ in 0..persisted_count {
                let buf = reader.read_n(ROW_SIZE)?;
                rows.push(IndexRow::from_bytes(&buf)?);
            }
        }

        let appender = file.appender()?;

        log::debug!(target: "index", "opened with {} persisted rows", persisted_count);

        Ok(Index {
            file,
            appender,
            rows,
            persisted_count,
            max_append_buffer,
        })
    }

    /// push `row`, auto-flushing if the append buffer has reached its bound.
    /// Returns the newly assigned id.
    pub fn append(&mut self, row: IndexRow) -> Result<usize> {
        self.rows.push(row);
        let id = self.rows.len() - 1;
        if self.rows.len() - self.persisted_count >= self.max_append_buffer {
            self.flush()?;
        }
        Ok(id)
    }

    pub fn get(&self, id: usize) -> Result<IndexRow> {
        match self.rows.get(id) {
            Some(row) => Ok(*row),
            None => err_at!(
                IndexOutOfRange, msg: "id {} out of range, count {}", id, self.rows.len()
            ),
        }
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// rewrite the row at `id`. If the row is already persisted, it is
    /// overwritten in place; otherwise the whole append buffer is flushed.
    pub fn replace(&mut self, id: usize, row: IndexRow) -> Result<()> {
        if id >= self.rows.len() {
            err_at!(
                IndexOutOfRange, msg: "id {} out of range, count {}", id, self.rows.len()
            )?;
        }
        self.rows[id] = row;
        if id < self.persisted_count {
            let mut writer = self.file.writer()?;
            writer.write_at((id * ROW_SIZE) as i64, &row.to_bytes())?;
            Ok(())
        } else {
            self.flush()
        }
    }

    pub fn set_flags(&mut self, id: usize, mask: u8) -> Result<()> {
        let mut row = self.get(id)?;
        row.flags |= mask;
        self.replace(id, row)
    }

    pub fn reset_flags(&mut self, id: usize, mask: u8) -> Result<()> {
        let mut row = self.get(id)?;
        row.flags &= !mask;
        self.replace(id, row)
    }

    /// append every buffered row `[persisted_count, len(rows))` to the file tail.
    pub fn flush(&mut self) -> Result<()> {
        for row in &self.rows[self.persisted_count..] {
            self.appender.append(&row.to_bytes())?;
        }
        self.persisted_count = self.rows.len();
        Ok(())
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted_count == self.rows.len()
    }

    /// drop every row with `MARKED_FOR_REMOVAL` set, rewrite the file with
    /// dense survivor ids, and return the `old id -> new id` mapping (`None`
    /// for removed rows) so callers can renumber their own side-stores.
    pub fn compact(&mut self) -> Result<Vec<Option<usize>>> {
        let mut survivors = Vec::with_capacity(self.rows.len());
        let mut mapping = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            if row.is_marked_for_removal() {
                mapping.push(None);
            } else {
                mapping.push(Some(survivors.len()));
                survivors.push(*row);
            }
        }

        self.file.truncate(0)?;
        self.rows = survivors;
        self.persisted_count = 0;
        self.flush()?;

        log::info!(target: "index", "compacted to {} surviving rows", self.rows.len());

        Ok(mapping)
    }

    /// finite, insertion-order sequence of `(id, row)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, IndexRow)> + '_ {
        self.rows.iter().enumerate().map(|(id, row)| (id, *row))
    }

    /// `vector_slot -> id` for every row that owns a vector.
    pub fn vector_map(&self) -> HashMap<i32, usize> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(id, row)| (row.vector_slot >= 0).then_some((row.vector_slot, id)))
            .collect()
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
