//! The coordinator facade: a named collection of records living under one
//! directory, tying together the two blob heaps, the index, the vector
//! store and the two side-stores (tags, groups).

use std::{collections::HashSet, convert::TryFrom, ffi, fs, path, path::PathBuf};

use crate::{
    blob_heap::BlobHeap,
    config::DatasetConfig,
    err_at,
    group_directory::GroupDirectory,
    index::Index,
    record::{Descriptor, IndexRow, MARKED_FOR_REMOVAL},
    selector,
    tag_index::TagIndex,
    vector_store::{Metric, SortOrder, VectorStore},
    Result,
};

/// one record as supplied to [Dataset::append].
#[derive(Clone, Debug, Default)]
pub struct Item {
    pub data: Vec<u8>,
    pub meta: Vec<u8>,
    pub data_desc: Descriptor,
    pub meta_desc: Descriptor,
    pub vector: Option<Vec<f32>>,
    pub tags: Vec<String>,
    pub group: Option<(i64, i64)>,
}

/// one record as returned by [Dataset::read], gated by the caller's selector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub id: i64,
    pub data: Vec<u8>,
    pub meta: Vec<u8>,
    pub data_desc: u8,
    pub meta_desc: u8,
    pub vector: Option<Vec<f32>>,
    pub tags: Vec<String>,
    pub group: Option<i64>,
}

pub struct Dataset {
    root: PathBuf,
    name: String,
    config: DatasetConfig,
    data: BlobHeap,
    meta: BlobHeap,
    index: Index,
    vectors: VectorStore,
    tags: TagIndex,
    groups: GroupDirectory,
}

fn dataset_dir(root: &path::Path, name: &str) -> PathBuf {
    root.join(name)
}

fn config_path(root: &path::Path, name: &str) -> PathBuf {
    root.join(format!("{}ds.json", name))
}

fn component_path(root: &path::Path, name: &str, suffix: &str) -> ffi::OsString {
    dataset_dir(root, name).join(format!("{}.{}", name, suffix)).into_os_string()
}

impl Dataset {
    /// create a new dataset directory if absent, or reuse an existing one
    /// whose stored config matches `config`. A pre-existing dataset with a
    /// different config fails with `DatasetExistsDifferentConfig`.
    pub fn create(root: &path::Path, name: &str, config: DatasetConfig) -> Result<Dataset> {
        let dir = dataset_dir(root, name);
        err_at!(IOError, fs::create_dir_all(&dir))?;

        let cfg_path = config_path(root, name);
        let config = if path::Path::new(&cfg_path).exists() {
            let existing = DatasetConfig::load(cfg_path.into_os_string())?;
            if existing != config {
                err_at!(
                    DatasetExistsDifferentConfig,
                    msg: "dataset {:?} exists with a different configuration", name
                )?;
            }
            existing
        } else {
            config.save(cfg_path.into_os_string())?;
            config
        };

        log::info!(target: "dataset", "created {:?} at {:?}", name, root);
        Self::open_with_config(root, name, config)
    }

    /// open an existing dataset. Fails with `DatasetNotFound` unless both the
    /// directory and the sibling config file already exist.
    pub fn open(root: &path::Path, name: &str) -> Result<Dataset> {
        let dir = dataset_dir(root, name);
        let cfg_path = config_path(root, name);
        if !dir.exists() || !path::Path::new(&cfg_path).exists() {
            err_at!(DatasetNotFound, msg: "dataset {:?} not found under {:?}", name, root)?;
        }
        let config = DatasetConfig::load(cfg_path.into_os_string())?;
        log::debug!(target: "dataset", "opened {:?} at {:?}", name, root);
        Self::open_with_config(root, name, config)
    }

    fn open_with_config(root: &path::Path, name: &str, config: DatasetConfig) -> Result<Dataset> {
        let data = BlobHeap::open(component_path(root, name, "dat"))?;
        let meta = BlobHeap::open(component_path(root, name, "met"))?;
        let index = Index::open(component_path(root, name, "idx"), config.max_index_append_buffer)?;
        let vectors = VectorStore::open(
            component_path(root, name, "vec"),
            config.vector_dim,
            config.max_vector_append_buffer,
            config.max_vector_buffer,
        )?;
        let tags = TagIndex::open(component_path(root, name, "tag"))?;
        let groups = GroupDirectory::open(component_path(root, name, "grp"))?;

        Ok(Dataset {
            root: root.to_path_buf(),
            name: name.to_string(),
            config,
            data,
            meta,
            index,
            vectors,
            tags,
            groups,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn count(&self) -> usize {
        self.index.count()
    }

    /// append one record, returning its id.
    pub fn append(&mut self, item: Item) -> Result<i64> {
        if self.config.vector_dim > 0 {
            if let Some(vector) = &item.vector {
                if vector.len() != self.config.vector_dim {
                    err_at!(
                        VectorSizeMismatch,
                        msg: "vector length {} does not match dataset dim {}",
                        vector.len(),
                        self.config.vector_dim
                    )?;
                }
            }
        }

        let (data_offset, data_size) = self.data.append(&item.data)?;
        let (meta_offset, meta_size) = self.meta.append(&item.meta)?;

        let vector_slot = match item.vector {
            Some(vector) if self.config.vector_dim > 0 => {
                let expected = self.vectors.count();
                let slot = self.vectors.append_expect(vector, expected)?;
                err_at!(FailConvert, i32::try_from(slot))?
            }
            _ => -1,
        };

        let row = IndexRow {
            data_offset,
            data_size,
            meta_offset,
            meta_size,
            vector_slot,
            data_desc: item.data_desc.into(),
            meta_desc: item.meta_desc.into(),
            flags: 0,
            reserved: 0,
        };
        let id = self.index.append(row)?;

        for tag in &item.tags {
            self.tags.add(id as i64, tag)?;
        }
        if let Some((group_id, place)) = item.group {
            if group_id > 0 {
                self.groups.assign(group_id, id as i64, place)?;
            }
        }

        Ok(id as i64)
    }

    /// read back the record at `id`, touching only the components named in
    /// `selector` (see [crate::selector]).
    pub fn read(&mut self, id: i64, selector: u8) -> Result<Record> {
        if id < 0 {
            err_at!(InvalidId, msg: "record id {} is negative", id)?;
        }
        let row = self.index.get(id as usize)?;

        let data = if selector::wants(selector, selector::DATA) {
            self.data.read(row.data_offset, row.data_size)?
        } else {
            Vec::new()
        };
        let meta = if selector::wants(selector, selector::META) {
            self.meta.read(row.meta_offset, row.meta_size)?
        } else {
            Vec::new()
        };
        let vector = if selector::wants(selector, selector::VECTOR) && row.vector_slot >= 0 {
            Some(self.vectors.get(row.vector_slot as usize)?)
        } else {
            None
        };
        let tags = if selector::wants(selector, selector::TAGS) {
            self.tags.get_tags(id)?
        } else {
            Vec::new()
        };
        let group = if selector::wants(selector, selector::GROUP) {
            self.groups.get_group(id)?
        } else {
            None
        };

        Ok(Record {
            id,
            data,
            meta,
            data_desc: row.data_desc,
            meta_desc: row.meta_desc,
            vector,
            tags,
            group,
        })
    }

    /// flush every owned component, in order: index, vectors, tags, groups,
    /// data heap, meta heap.
    pub fn flush(&mut self) -> Result<()> {
        self.index.flush()?;
        self.vectors.flush()?;
        self.tags.flush()?;
        self.groups.flush()?;
        self.data.flush()?;
        self.meta.flush()?;
        Ok(())
    }

    pub fn is_persisted(&self) -> bool {
        self.index.is_persisted() && self.vectors.is_persisted()
    }

    /// similarity search. Scores come from [VectorStore::search]; each
    /// matching slot is translated back to a record id via the index's
    /// vector map and read with `selector`.
    pub fn search(
        &mut self,
        query: &[f32],
        metric: Metric,
        order: SortOrder,
        limit: usize,
        selector: u8,
    ) -> Result<Vec<(f32, Record)>> {
        if query.len() != self.config.vector_dim {
            err_at!(
                VectorSizeMismatch,
                msg: "query length {} does not match dataset dim {}", query.len(), self.config.vector_dim
            )?;
        }

        let hits = self.vectors.search(query, metric, order, limit)?;
        let vector_map = self.index.vector_map();

        let mut results = Vec::with_capacity(hits.len());
        for (slot, score) in hits {
            if let Some(&id) = vector_map.get(&(slot as i32)) {
                let record = self.read(id as i64, selector)?;
                results.push((score, record));
            }
        }
        Ok(results)
    }

    /// mark `id` for removal. Space is not reclaimed until [Self::compact].
    pub fn delete(&mut self, id: i64) -> Result<()> {
        if id < 0 {
            err_at!(InvalidId, msg: "record id {} is negative", id)?;
        }
        self.index.set_flags(id as usize, MARKED_FOR_REMOVAL)
    }

    /// rewrite every file so only surviving records remain, with dense,
    /// renumbered ids. Order: index, then vector store, then data/meta
    /// heaps (whose offsets move because ids move), then tag and group
    /// directories are rebuilt wholesale from the renumbered survivors.
    pub fn compact(&mut self) -> Result<()> {
        self.flush()?;

        let old_rows: Vec<IndexRow> = self.index.iter().map(|(_, row)| row).collect();

        // snapshot every survivor's payload bytes before either heap is
        // truncated; data/meta is read from the still-intact heaps here and
        // re-appended further down, after both heaps are cleared.
        let mut payloads = Vec::with_capacity(old_rows.len());
        for row in &old_rows {
            let data_bytes = self.data.read(row.data_offset, row.data_size)?;
            let meta_bytes = self.meta.read(row.meta_offset, row.meta_size)?;
            payloads.push((data_bytes, meta_bytes));
        }

        let id_mapping = self.index.compact()?;

        let removed_slots: HashSet<usize> = old_rows
            .iter()
            .zip(id_mapping.iter())
            .filter_map(|(row, new_id)| {
                (new_id.is_none() && row.vector_slot >= 0).then_some(row.vector_slot as usize)
            })
            .collect();
        let slot_mapping = self.vectors.delete(&removed_slots)?;

        self.data.clear()?;
        self.meta.clear()?;

        let mut new_tags = TagIndex::open_empty(component_path(&self.root, &self.name, "tag"));
        let mut new_groups =
            GroupDirectory::open_empty(component_path(&self.root, &self.name, "grp"));

        for (old_id, old_row) in old_rows.iter().enumerate() {
            let new_id = match id_mapping[old_id] {
                Some(new_id) => new_id,
                None => continue,
            };

            let (data_bytes, meta_bytes) = &payloads[old_id];
            let (data_offset, data_size) = self.data.append(data_bytes)?;
            let (meta_offset, meta_size) = self.meta.append(meta_bytes)?;

            let vector_slot = if old_row.vector_slot >= 0 {
                slot_mapping
                    .get(old_row.vector_slot as usize)
                    .copied()
                    .flatten()
                    .map(|s| s as i32)
                    .unwrap_or(-1)
            } else {
                -1
            };

            let new_row = IndexRow {
                data_offset,
                data_size,
                meta_offset,
                meta_size,
                vector_slot,
                data_desc: old_row.data_desc,
                meta_desc: old_row.meta_desc,
                flags: old_row.flags,
                reserved: old_row.reserved,
            };
            self.index.replace(new_id, new_row)?;

            for tag in self.tags.get_tags(old_id as i64)? {
                new_tags.add(new_id as i64, &tag)?;
            }
            if let Some((group_id, place)) = self.groups.get_assignment(old_id as i64)? {
                new_groups.ensure_group(group_id)?;
                new_groups.assign(group_id, new_id as i64, place)?;
            }
        }

        new_tags.flush()?;
        new_groups.flush()?;
        self.tags = new_tags;
        self.groups = new_groups;

        self.flush()?;
        log::info!(target: "dataset", "compacted {:?}, {} survivors", self.name, self.index.count());
        Ok(())
    }

    /// permanently remove every file belonging to this dataset, including
    /// the sibling config file.
    pub fn destroy(self) -> Result<()> {
        let dir = dataset_dir(&self.root, &self.name);
        if dir.exists() {
            err_at!(IOError, fs::remove_dir_all(&dir))?;
        }
        let cfg_path = config_path(&self.root, &self.name);
        if cfg_path.exists() {
            err_at!(IOError, fs::remove_file(&cfg_path))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dataset_test.rs"]
mod dataset_test;
