use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::wire::FileEntry;

/// Generated files keyed by path. A `BTreeMap` so listing order is the display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    files: BTreeMap<String, String>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(path: impl Into<String>, content: impl Into<String>) -> Self {
        let mut p = Self::new();
        p.insert(path, content);
        p
    }

    /// Later entries with the same name replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = FileEntry>) -> Self {
        let mut p = Self::new();
        for e in entries {
            p.insert(e.name, e.content);
        }
        p
    }

    /// Create-or-overwrite; returns the previous content when the path existed.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.files.insert(path.into(), content.into())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.values().map(String::len).sum()
    }
}
