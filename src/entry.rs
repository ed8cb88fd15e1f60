use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One record of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Random lowercase hex id, assigned once on ADD and never changed.
    pub id: String,
    /// One `(column, value)` pair per schema column, in schema order.
    pub data: Vec<(String, Value)>,
    /// Elapsed processing time, only set on GET and SET results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_time_ms: Option<u64>,
}

impl Entry {
    pub fn new(id: impl Into<String>, data: Vec<(String, Value)>) -> Self {
        Self {
            id: id.into(),
            data,
            query_time_ms: None,
        }
    }

    /// Returns the value of `column`, if the entry has such a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Values in schema order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.data.iter().map(|(_, value)| value)
    }
}

/// An ordered collection of entries, returned by every query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntrySet {
    entries: Vec<Entry>,
}

impl EntrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Appends every entry of `other`, keeping order.
    pub fn add_all(&mut self, other: EntrySet) {
        self.entries.extend(other.entries);
    }

    /// Membership is decided by entry id.
    pub fn contains(&self, entry: &Entry) -> bool {
        self.contains_id(&entry.id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl From<Vec<Entry>> for EntrySet {
    fn from(entries: Vec<Entry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<Entry> for EntrySet {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for EntrySet {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntrySet {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
