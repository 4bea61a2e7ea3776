// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::cmp::Reverse;
use std::collections::btree_map::{BTreeMap, Entry as MapEntry};

use chrono::{DateTime, Utc};
use coverage_client::FileRecord;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
    /// A file directly inside the aggregated directory.
    File,

    /// A subdirectory, standing for every record folded under it.
    Directory,
}

/// Summed statistics of the records behind one entry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DirectoryAggregate {
    /// Records folded into a directory entry; always `0` for a file entry.
    pub children: u64,
    pub funcs: u64,
    pub size: u64,
    pub commits: u64,
    pub first_push_date: Option<DateTime<Utc>>,
    pub last_push_date: Option<DateTime<Utc>>,
}

impl DirectoryAggregate {
    fn base(file: &FileRecord, children: u64) -> Self {
        Self {
            children,
            funcs: file.funcs,
            size: file.size,
            commits: file.commits,
            first_push_date: file.first_push_date,
            last_push_date: file.last_push_date,
        }
    }

    fn fold(&mut self, file: &FileRecord) {
        self.children += 1;
        self.funcs += file.funcs;
        self.size += file.size;
        self.commits += file.commits;
        self.first_push_date = min_date(self.first_push_date, file.first_push_date);
        self.last_push_date = min_date(self.last_push_date, file.last_push_date);
    }
}

fn min_date(
    current: Option<DateTime<Utc>>,
    new: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (current, new) {
        (None, new) => new,
        (Some(current), Some(new)) if new < current => Some(new),
        (current, _) => current,
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    /// Name relative to the aggregated directory: a single path segment.
    pub name: String,
    pub kind: EntryKind,
    pub stats: DirectoryAggregate,
}

impl Entry {
    pub fn is_leaf(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Canonical form of a directory prefix: no trailing `/` for the root
/// (`""`), exactly one otherwise.
pub fn normalize_dir(dir: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        String::new()
    } else {
        format!("{}/", dir)
    }
}

/// Group `files` into the immediate entries of `dir`, sorted with
/// [`sort_entries`].
///
/// Files directly in `dir` become leaf entries. Deeper files are folded into
/// the entry of their first path segment below `dir`. When a name is claimed
/// twice, the first entry is kept and the record is dropped with a warning.
pub fn aggregate(files: &[FileRecord], dir: &str) -> Vec<Entry> {
    let dir = normalize_dir(dir);
    let mut map: BTreeMap<&str, Entry> = BTreeMap::new();

    for file in files {
        let rest = match file.path.strip_prefix(dir.as_str()) {
            Some(rest) if !rest.is_empty() => rest,
            _ => {
                warn!("{} is not under {:?}", file.path, dir);
                continue;
            }
        };

        match rest.split_once('/') {
            Some((name, _)) => match map.entry(name) {
                MapEntry::Vacant(vacant) => {
                    vacant.insert(Entry {
                        name: name.to_owned(),
                        kind: EntryKind::Directory,
                        stats: DirectoryAggregate::base(file, 1),
                    });
                }
                MapEntry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    if entry.is_leaf() {
                        warn!("{} is already in map", name);
                    } else {
                        entry.stats.fold(file);
                    }
                }
            },
            None => match map.entry(rest) {
                MapEntry::Vacant(vacant) => {
                    vacant.insert(Entry {
                        name: rest.to_owned(),
                        kind: EntryKind::File,
                        stats: DirectoryAggregate::base(file, 0),
                    });
                }
                MapEntry::Occupied(_) => {
                    warn!("{} is already in map", rest);
                }
            },
        }
    }

    let mut entries: Vec<Entry> = map.into_values().collect();
    sort_entries(&mut entries);
    entries
}

/// Most populated directories first, then most functions, then by name.
pub fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        (Reverse(a.stats.children), Reverse(a.stats.funcs), &a.name).cmp(&(
            Reverse(b.stats.children),
            Reverse(b.stats.funcs),
            &b.name,
        ))
    });
}
