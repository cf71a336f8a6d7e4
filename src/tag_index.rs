//! Bidirectional tag &lt;-&gt; id lookup. The forward map is the durable state; the
//! reverse map is rebuilt from it on every load.

use cbordata::Cborize;

use std::collections::HashMap;

use crate::{err_at, file::File, util, Error, Result};

const TAG_INDEX_VER: u32 = 0x0001;

#[derive(Clone, Default, Debug, Eq, PartialEq, Cborize)]
struct ForwardMap {
    tags: HashMap<String, Vec<i64>>,
}

impl ForwardMap {
    const ID: u32 = TAG_INDEX_VER;
}

pub struct TagIndex {
    file: File,
    forward: HashMap<String, Vec<i64>>,
    reverse: HashMap<i64, Vec<String>>,
    loaded: bool,
}

fn normalize(tag: &str) -> Result<String> {
    let norm = tag.trim().to_lowercase();
    if norm.is_empty() {
        err_at!(EmptyTag, msg: "tag is empty after trim and lowercase")?;
    }
    Ok(norm)
}

impl TagIndex {
    /// open the tag file at `loc`. Loading the contents is deferred to the
    /// first call that actually needs them.
    pub fn open<P: Into<std::ffi::OsString>>(loc: P) -> Result<TagIndex> {
        let file = File::new(loc);
        if !file.exists() {
            file.create_empty()?;
        }
        Ok(TagIndex { file, forward: HashMap::new(), reverse: HashMap::new(), loaded: false })
    }

    /// open `loc` as an already-empty, already-loaded tag index, skipping the
    /// usual lazy load from disk. Used by [crate::dataset::Dataset::compact]
    /// to rebuild the tag file from scratch without first absorbing its
    /// pre-compaction contents.
    pub(crate) fn open_empty<P: Into<std::ffi::OsString>>(loc: P) -> TagIndex {
        TagIndex { file: File::new(loc), forward: HashMap::new(), reverse: HashMap::new(), loaded: true }
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        let len = self.file.len()?;
        if len > 0 {
            let mut reader = self.file.reader(0)?;
            let bytes = reader.read_n(len as usize)?;
            let (map, _): (ForwardMap, usize) = util::from_cbor_bytes(&bytes)?;
            self.forward = map.tags;
        }
        self.reverse = HashMap::new();
        for (tag, ids) in &self.forward {
            for id in ids {
                self.reverse.entry(*id).or_default().push(tag.clone());
            }
        }
        self.loaded = true;
        Ok(())
    }

    pub fn add(&mut self, id: i64, tag: &str) -> Result<()> {
        if id < 0 {
            err_at!(InvalidId, msg: "tag id {} is negative", id)?;
        }
        let tag = normalize(tag)?;
        self.ensure_loaded()?;

        let ids = self.forward.entry(tag.clone()).or_default();
        if ids.contains(&id) {
            err_at!(DuplicatedTag, msg: "id {} already tagged {:?}", id, tag)?;
        }
        ids.push(id);
        self.reverse.entry(id).or_default().push(tag);
        Ok(())
    }

    pub fn remove(&mut self, id: i64, tag: &str) -> Result<()> {
        let tag = normalize(tag)?;
        self.ensure_loaded()?;

        let removed = match self.forward.get_mut(&tag) {
            Some(ids) => match ids.iter().position(|i| *i == id) {
                Some(pos) => {
                    ids.remove(pos);
                    if ids.is_empty() {
                        self.forward.remove(&tag);
                    }
                    true
                }
                None => false,
            },
            None => false,
        };
        if !removed {
            err_at!(TagNotFound, msg: "id {} not tagged {:?}", id, tag)?;
        }

        if let Some(tags) = self.reverse.get_mut(&id) {
            tags.retain(|t| t != &tag);
            if tags.is_empty() {
                self.reverse.remove(&id);
            }
        }
        Ok(())
    }

    pub fn remove_all(&mut self, id: i64) -> Result<()> {
        self.ensure_loaded()?;
        let tags = self.reverse.remove(&id).unwrap_or_default();
        for tag in tags {
            if let Some(ids) = self.forward.get_mut(&tag) {
                ids.retain(|i| *i != id);
                if ids.is_empty() {
                    self.forward.remove(&tag);
                }
            }
        }
        Ok(())
    }

    pub fn get_ids(&mut self, tag: &str) -> Result<Vec<i64>> {
        let tag = match normalize(tag) {
            Ok(tag) => tag,
            Err(Error::EmptyTag(_, _)) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        self.ensure_loaded()?;
        Ok(self.forward.get(&tag).cloned().unwrap_or_default())
    }

    pub fn get_tags(&mut self, id: i64) -> Result<Vec<String>> {
        self.ensure_loaded()?;
        Ok(self.reverse.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_all_tags(&mut self) -> Result<Vec<String>> {
        self.ensure_loaded()?;
        Ok(self.forward.keys().cloned().collect())
    }

    pub fn count(&mut self) -> Result<usize> {
        self.ensure_loaded()?;
        Ok(self.reverse.len())
    }

    /// serialize the forward map and overwrite the tag file with it.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        let map = ForwardMap { tags: self.forward.clone() };
        let bytes = util::into_cbor_bytes(map)?;
        self.file.truncate(0)?;
        let mut appender = self.file.appender()?;
        appender.append(&bytes)?;
        appender.close()
    }
}

#[cfg(test)]
#[path = "tag_index_test.rs"]
mod tag_index_test;
