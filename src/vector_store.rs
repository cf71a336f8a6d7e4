//! Append-only store of fixed-dimension float vectors. The performance
//! critical component: a persisted tail on disk, a bounded in-memory read
//! cache window over the persisted region, and a bounded in-memory append
//! buffer of not-yet-flushed vectors.

use std::collections::HashSet;

use crate::{
    err_at,
    file::{Appender, File},
    Result,
};

/// Similarity metric used by [VectorStore::search]. Only `Cosine` exists
/// today; the type exists so a second metric can be added without breaking
/// callers that already match on it exhaustively at their own call sites.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Metric {
    Cosine,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

pub struct VectorStore {
    file: File,
    appender: Appender,
    dim: usize,
    persisted_count: usize,
    append_buffer: Vec<Vec<f32>>,
    max_append_buffer: usize,
    max_buffer_size: usize,
    // (window_start, vectors), invalidated whenever the persisted region is rewritten.
    cache: Option<(usize, Vec<Vec<f32>>)>,
}

impl VectorStore {
    pub fn open<P: Into<std::ffi::OsString>>(
        loc: P,
        dim: usize,
        max_append_buffer: usize,
        max_buffer_size: usize,
    ) -> Result<VectorStore> {
        let file = File::new(loc);
        if !file.exists() {
            file.create_empty()?;
        }

        let row_bytes = dim * 4;
        let len = file.len()?;
        let persisted_count = if row_bytes == 0 {
            0
        } else {
            if len % (row_bytes as u64) != 0 {
                err_at!(
                    Fatal, msg: "vector file size {} not a multiple of row size {}", len, row_bytes
                )?;
            }
            (len / (row_bytes as u64)) as usize
        };

        let appender = file.appender()?;

        log::debug!(target: "vecstore", "opened dim={} persisted={}", dim, persisted_count);

        Ok(VectorStore {
            file,
            appender,
            dim,
            persisted_count,
            append_buffer: Vec::new(),
            max_append_buffer,
            max_buffer_size,
            cache: None,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn count(&self) -> usize {
        self.persisted_count + self.append_buffer.len()
    }

    pub fn is_persisted(&self) -> bool {
        self.append_buffer.is_empty()
    }

    fn validate_len(&self, vec: &[f32]) -> Result<()> {
        if vec.len() != self.dim {
            err_at!(
                VectorSizeMismatch, msg: "vector length {} does not match dim {}", vec.len(), self.dim
            )?;
        }
        Ok(())
    }

    /// append `vec`, returning its newly assigned slot. Auto-flushes once the
    /// append buffer reaches `max_append_buffer`.
    pub fn append(&mut self, vec: Vec<f32>) -> Result<usize> {
        self.validate_len(&vec)?;
        let slot = self.count();
        self.append_buffer.push(vec);
        if self.append_buffer.len() >= self.max_append_buffer {
            self.flush()?;
        }
        Ok(slot)
    }

    /// like [Self::append], but fails with `IndexIntegrity` unless
    /// `expected_slot` matches the slot that would be assigned. Kept
    /// crate-private: only [crate::dataset::Dataset] may request a
    /// specific slot, since it is the only caller required to stay in
    /// sync with the index.
    pub(crate) fn append_expect(
        &mut self,
        vec: Vec<f32>,
        expected_slot: usize,
    ) -> Result<usize> {
        let next = self.count();
        if expected_slot != next {
            err_at!(
                IndexIntegrity, msg: "expected next slot {}, caller assumed {}", next, expected_slot
            )?;
        }
        self.append(vec)
    }

    pub fn get(&mut self, slot: usize) -> Result<Vec<f32>> {
        let total = self.count();
        if slot >= total {
            err_at!(IndexOutOfRange, msg: "vector slot {} out of range, count {}", slot, total)?;
        }
        if slot >= self.persisted_count {
            return Ok(self.append_buffer[slot - self.persisted_count].clone());
        }
        if let Some((start, win)) = &self.cache {
            if slot >= *start && slot < start + win.len() {
                return Ok(win[slot - start].clone());
            }
        }
        let end = (slot + self.max_buffer_size.max(1)).min(self.persisted_count);
        let window = self.read_disk_range(slot, end)?;
        let value = window[0].clone();
        self.cache = Some((slot, window));
        Ok(value)
    }

    /// overwrite the vector at `slot`. Slots still in the append buffer are
    /// flushed first so the write lands on disk.
    pub fn replace(&mut self, slot: usize, vec: Vec<f32>) -> Result<()> {
        self.validate_len(&vec)?;
        let total = self.count();
        if slot >= total {
            err_at!(IndexOutOfRange, msg: "vector slot {} out of range, count {}", slot, total)?;
        }
        if slot >= self.persisted_count {
            self.flush()?;
        }

        let offset = (slot * self.dim * 4) as i64;
        let mut writer = self.file.writer()?;
        writer.write_at(offset, &floats_to_bytes(&vec))?;

        if let Some((start, win)) = &mut self.cache {
            if slot >= *start && slot < *start + win.len() {
                win[slot - *start] = vec;
            }
        }
        Ok(())
    }

    /// drop every slot in `slots`, rewriting the file so survivors are dense
    /// again. Returns the `old slot -> new slot` mapping (`None` for removed
    /// slots).
    pub fn delete(&mut self, slots: &HashSet<usize>) -> Result<Vec<Option<usize>>> {
        let total = self.count();
        for slot in slots {
            if *slot >= total {
                err_at!(
                    IndexOutOfRange, msg: "vector slot {} out of range, count {}", slot, total
                )?;
            }
        }
        self.flush()?;

        let mut reader = self.file.reader(0)?;
        let mut mapping = Vec::with_capacity(self.persisted_count);
        let mut survivors = Vec::new();
        let mut new_slot = 0usize;
        for old in 0..self.persisted_count {
            let bytes = reader.read_n(self.dim * 4)?;
            if slots.contains(&old) {
                mapping.push(None);
            } else {
                survivors.extend_from_slice(&bytes);
                mapping.push(Some(new_slot));
                new_slot += 1;
            }
        }

        self.file.truncate(0)?;
        self.appender.append(&survivors)?;
        self.persisted_count = new_slot;
        self.cache = None;

        log::info!(target: "vecstore", "deleted {} slots, {} survive", slots.len(), new_slot);

        Ok(mapping)
    }

    /// write the append buffer to the file tail.
    pub fn flush(&mut self) -> Result<()> {
        if self.append_buffer.is_empty() {
            return Ok(());
        }
        let mut bytes = Vec::with_capacity(self.append_buffer.len() * self.dim * 4);
        for vec in &self.append_buffer {
            bytes.extend_from_slice(&floats_to_bytes(vec));
        }
        self.appender.append(&bytes)?;
        self.persisted_count += self.append_buffer.len();
        self.append_buffer.clear();
        Ok(())
    }

    /// finite, restartable sequence of `(slot, vector)` pairs in order.
    pub fn iter(&mut self) -> VectorIter<'_> {
        VectorIter { store: self, slot: 0 }
    }

    /// exact linear scan. Validates `query`'s length and the metric, scores
    /// every vector, sorts by score (ties broken by slot ascending), and
    /// truncates to `limit` when `limit > 0`.
    pub fn search(
        &mut self,
        query: &[f32],
        metric: Metric,
        order: SortOrder,
        limit: usize,
    ) -> Result<Vec<(usize, f32)>> {
        self.validate_len(query)?;
        let Metric::Cosine = metric;

        let mut scores = Vec::with_capacity(self.count());

        let mut start = 0;
        let chunk_size = self.max_buffer_size.max(1);
        while start < self.persisted_count {
            let end = (start + chunk_size).min(self.persisted_count);
            let chunk = self.read_disk_range(start, end)?;
            for (i, vec) in chunk.iter().enumerate() {
                scores.push((start + i, cosine(query, vec)));
            }
            self.cache = Some((start, chunk));
            start = end;
        }

        for (i, vec) in self.append_buffer.iter().enumerate() {
            scores.push((self.persisted_count + i, cosine(query, vec)));
        }

        match order {
            SortOrder::Descending => scores.sort_by(|a, b| {
                b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
            }),
            SortOrder::Ascending => scores.sort_by(|a, b| {
                a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
            }),
        }

        if limit > 0 && limit < scores.len() {
            scores.truncate(limit);
        }

        Ok(scores)
    }

    fn read_disk_range(&self, start: usize, end: usize) -> Result<Vec<Vec<f32>>> {
        let row_bytes = self.dim * 4;
        let mut reader = self.file.reader((start * row_bytes) as u64)?;
        let buf = reader.read_n((end - start) * row_bytes)?;
        Ok(buf.chunks(row_bytes).map(bytes_to_floats).collect())
    }
}

pub struct VectorIter<'a> {
    store: &'a mut VectorStore,
    slot: usize,
}

impl<'a> Iterator for VectorIter<'a> {
    type Item = Result<(usize, Vec<f32>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.slot >= self.store.count() {
            return None;
        }
        let slot = self.slot;
        self.slot += 1;
        Some(self.store.get(slot).map(|vec| (slot, vec)))
    }
}

fn floats_to_bytes(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn bytes_to_floats(buf: &[u8]) -> Vec<f32> {
    buf.chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

/// `dot(a,b) / (‖a‖·‖b‖)`. A zero-norm vector compared with anything yields 0.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0f32;
    let mut na = 0f32;
    let mut nb = 0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        na += a[i] * a[i];
        nb += b[i] * b[i];
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[cfg(test)]
#[path = "vector_store_test.rs"]
mod vector_store_test;
