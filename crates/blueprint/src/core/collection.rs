//! Keyed record collections
//!
//! Keys are unique. Iteration is key-sorted so that snapshots are stable, but
//! callers must not attach meaning to the order.

use std::collections::btree_map::{self, BTreeMap};

use super::Record;

/// A mapping from record key to record
///
/// Only the owning store mutates a collection; consumers get shared
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<R> {
    entries: BTreeMap<String, R>,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<R: Record> Collection<R> {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a record by key
    pub fn get(&self, key: &str) -> Option<&R> {
        self.entries.get(key)
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over records
    pub fn values(&self) -> impl Iterator<Item = &R> {
        self.entries.values()
    }

    /// Iterate over `(key, record)` entries
    pub fn iter(&self) -> Entries<'_, R> {
        Entries {
            inner: self.entries.iter(),
        }
    }

    /// Insert or overwrite a record under its own key, returning the old one
    pub(crate) fn upsert(&mut self, record: R) -> Option<R> {
        self.entries.insert(record.key().to_string(), record)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut R> {
        self.entries.get_mut(key)
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<R> {
        self.entries.remove(key)
    }

    /// Insert a pair decoded from a snapshot
    ///
    /// Fails if the key is already present; the caller decides how to
    /// recover.
    pub(crate) fn insert_new(&mut self, key: String, record: R) -> Result<(), R> {
        match self.entries.entry(key) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
            btree_map::Entry::Occupied(_) => Err(record),
        }
    }
}

impl<R: Record> FromIterator<R> for Collection<R> {
    /// Later records overwrite earlier ones with the same key
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut collection = Self::new();
        for record in iter {
            collection.upsert(record);
        }
        collection
    }
}

/// Iterator over `(key, record)` entries of a [`Collection`]
pub struct Entries<'a, R> {
    inner: btree_map::Iter<'a, String, R>,
}

impl<'a, R> Iterator for Entries<'a, R> {
    type Item = (&'a str, &'a R);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, record)| (key.as_str(), record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, R: Record> IntoIterator for &'a Collection<R> {
    type Item = (&'a str, &'a R);
    type IntoIter = Entries<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        key: String,
        value: i64,
    }

    impl Record for Item {
        fn key(&self) -> &str {
            &self.key
        }
    }

    fn item(key: &str, value: i64) -> Item {
        Item {
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn test_upsert_overwrites_by_key() {
        let mut collection = Collection::new();
        assert!(collection.upsert(item("a", 1)).is_none());
        assert_eq!(collection.upsert(item("a", 2)), Some(item("a", 1)));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("a"), Some(&item("a", 2)));
    }

    #[test]
    fn test_insert_new_rejects_duplicates() {
        let mut collection = Collection::new();
        assert!(collection.insert_new("a".to_string(), item("a", 1)).is_ok());
        assert!(collection.insert_new("a".to_string(), item("a", 2)).is_err());
        assert_eq!(collection.get("a").map(|r| r.value), Some(1));
    }

    #[test]
    fn test_from_iter_last_wins() {
        let collection: Collection<Item> =
            vec![item("b", 1), item("a", 1), item("b", 3)].into_iter().collect();
        assert_eq!(collection.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(collection.get("b").map(|r| r.value), Some(3));
    }

    #[test]
    fn test_remove() {
        let mut collection: Collection<Item> = vec![item("a", 1)].into_iter().collect();
        assert!(collection.remove("missing").is_none());
        assert_eq!(collection.remove("a"), Some(item("a", 1)));
        assert!(collection.is_empty());
    }
}
