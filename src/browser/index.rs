use crate::store::ObjectRecord;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Every object loaded for the active scope, plus the directory prefixes
/// observed in their keys.
///
/// Prefixes are reference counted per contributing key so that removing the
/// last object under a directory also drops the directory.
#[derive(Debug, Default)]
pub struct ObjectIndex {
    objects: Vec<ObjectRecord>,
    keys: HashSet<String>,
    prefixes: BTreeMap<String, usize>,
}

impl ObjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.objects.clear();
        self.keys.clear();
        self.prefixes.clear();
    }

    /// Appends one page in arrival order and records the parent directory of
    /// each new key. Keys already present are skipped. Returns the number of
    /// records added.
    pub fn append(&mut self, records: Vec<ObjectRecord>) -> usize {
        let before = self.objects.len();
        self.objects.reserve(records.len());
        let mut parents = Vec::with_capacity(records.len());
        for record in records {
            if !self.keys.insert(record.key.clone()) {
                warn!(key = %record.key, "skipping duplicate key from listing");
                continue;
            }
            if let Some(parent) = record.parent_prefix() {
                parents.push(parent.to_string());
            }
            self.objects.push(record);
        }
        self.add_prefixes(parents);
        self.objects.len() - before
    }

    /// Unions observed prefixes into the prefix set. Each occurrence counts as
    /// one reference.
    pub fn add_prefixes<I>(&mut self, prefixes: I)
    where
        I: IntoIterator<Item = String>,
    {
        for prefix in prefixes {
            *self.prefixes.entry(prefix).or_insert(0) += 1;
        }
    }

    /// Removes the record with `key`. Returns false when it was not present.
    pub fn remove(&mut self, key: &str) -> bool {
        if !self.keys.remove(key) {
            return false;
        }
        let Some(pos) = self.objects.iter().position(|o| o.key == key) else {
            return false;
        };
        let record = self.objects.remove(pos);
        if let Some(parent) = record.parent_prefix() {
            if let Some(count) = self.prefixes.get_mut(parent) {
                *count -= 1;
                if *count == 0 {
                    self.prefixes.remove(parent);
                }
            }
        }
        true
    }

    pub fn objects(&self) -> &[ObjectRecord] {
        &self.objects
    }

    pub fn get(&self, idx: usize) -> Option<&ObjectRecord> {
        self.objects.get(idx)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn last_key(&self) -> Option<&str> {
        self.objects.last().map(|o| o.key.as_str())
    }

    /// Known directory prefixes in lexicographic order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.keys().map(String::as_str)
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains_key(prefix)
    }
}
