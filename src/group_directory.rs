//! Named groups of `(id, place)` members. A record belongs to at most one
//! group; within a group every `place` is unique.

use cbordata::Cborize;

use std::collections::HashMap;

use crate::{err_at, file::File, util, Error, Result};

const GROUP_DIRECTORY_VER: u32 = 0x0001;

#[derive(Clone, Default, Debug, Eq, PartialEq, Cborize)]
struct GroupMap {
    groups: HashMap<i64, Vec<(i64, i64)>>,
}

impl GroupMap {
    const ID: u32 = GROUP_DIRECTORY_VER;
}

pub struct GroupDirectory {
    file: File,
    groups: HashMap<i64, Vec<(i64, i64)>>,
    id_to_group: HashMap<i64, i64>,
    next_group_id: i64,
    loaded: bool,
}

impl GroupDirectory {
    pub fn open<P: Into<std::ffi::OsString>>(loc: P) -> Result<GroupDirectory> {
        let file = File::new(loc);
        if !file.exists() {
            file.create_empty()?;
        }
        Ok(GroupDirectory {
            file,
            groups: HashMap::new(),
            id_to_group: HashMap::new(),
            next_group_id: 1,
            loaded: false,
        })
    }

    /// open `loc` as an already-empty, already-loaded directory, skipping the
    /// usual lazy load from disk. Used by [crate::dataset::Dataset::compact]
    /// to rebuild the group file from scratch.
    pub(crate) fn open_empty<P: Into<std::ffi::OsString>>(loc: P) -> GroupDirectory {
        GroupDirectory {
            file: File::new(loc),
            groups: HashMap::new(),
            id_to_group: HashMap::new(),
            next_group_id: 1,
            loaded: true,
        }
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        let len = self.file.len()?;
        if len > 0 {
            let mut reader = self.file.reader(0)?;
            let bytes = reader.read_n(len as usize)?;
            let (map, _): (GroupMap, usize) = util::from_cbor_bytes(&bytes)?;
            self.groups = map.groups;
        }

        self.id_to_group = HashMap::new();
        let mut max_group = 0i64;
        for (&group_id, members) in &self.groups {
            max_group = max_group.max(group_id);
            for &(id, _) in members {
                self.id_to_group.insert(id, group_id);
            }
        }
        self.next_group_id = max_group + 1;
        self.loaded = true;
        Ok(())
    }

    /// allocate a new, empty group and return its id.
    pub fn create(&mut self) -> Result<i64> {
        self.ensure_loaded()?;
        let group_id = self.next_group_id;
        self.groups.insert(group_id, Vec::new());
        self.next_group_id += 1;
        Ok(group_id)
    }

    /// assign `id` to `place` within `group_id`. `id` is first removed from
    /// whatever group (including `group_id` itself) it previously belonged
    /// to, then the target place is checked for collision before inserting.
    pub fn assign(&mut self, group_id: i64, id: i64, place: i64) -> Result<()> {
        self.ensure_loaded()?;
        if group_id < 1 || !self.groups.contains_key(&group_id) {
            err_at!(InvalidGroupId, msg: "group {} does not exist", group_id)?;
        }

        if let Some(&old_group) = self.id_to_group.get(&id) {
            if let Some(members) = self.groups.get_mut(&old_group) {
                members.retain(|&(member, _)| member != id);
            }
            self.id_to_group.remove(&id);
        }

        let members = self.groups.get_mut(&group_id).unwrap();
        if members.iter().any(|&(_, p)| p == place) {
            err_at!(PlaceTaken, msg: "place {} already taken in group {}", place, group_id)?;
        }
        members.push((id, place));
        self.id_to_group.insert(id, group_id);
        Ok(())
    }

    pub fn get_group(&mut self, id: i64) -> Result<Option<i64>> {
        self.ensure_loaded()?;
        Ok(self.id_to_group.get(&id).copied())
    }

    /// `(group_id, place)` of `id`, or `None` if it belongs to no group.
    pub fn get_assignment(&mut self, id: i64) -> Result<Option<(i64, i64)>> {
        self.ensure_loaded()?;
        let group_id = match self.id_to_group.get(&id) {
            Some(&group_id) => group_id,
            None => return Ok(None),
        };
        let place = self.groups[&group_id]
            .iter()
            .find(|&&(member, _)| member == id)
            .map(|&(_, place)| place);
        Ok(place.map(|place| (group_id, place)))
    }

    /// ensure `group_id` exists, without allocating through the normal
    /// sequential counter. Used when rebuilding the directory during compact,
    /// where group ids must be preserved rather than renumbered.
    pub(crate) fn ensure_group(&mut self, group_id: i64) -> Result<()> {
        self.ensure_loaded()?;
        self.groups.entry(group_id).or_default();
        if group_id >= self.next_group_id {
            self.next_group_id = group_id + 1;
        }
        Ok(())
    }

    /// member ids of `group_id`, sorted by `place`. Unknown group yields an
    /// empty list, not an error.
    pub fn get_members(&mut self, group_id: i64) -> Result<Vec<i64>> {
        self.ensure_loaded()?;
        let mut members = self.groups.get(&group_id).cloned().unwrap_or_default();
        members.sort_by_key(|&(_, place)| place);
        Ok(members.into_iter().map(|(id, _)| id).collect())
    }

    /// number of ids currently assigned to some group.
    pub fn count(&mut self) -> Result<usize> {
        self.ensure_loaded()?;
        Ok(self.id_to_group.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        let map = GroupMap { groups: self.groups.clone() };
        let bytes = util::into_cbor_bytes(map)?;
        self.file.truncate(0)?;
        let mut appender = self.file.appender()?;
        appender.append(&bytes)?;
        appender.close()
    }
}

#[cfg(test)]
#[path = "group_directory_test.rs"]
mod group_directory_test;
