//! The set of ARXML documents loaded for one run, keyed by relative source
//! path (forward-slash separated, without extension). Arena node ids are
//! only meaningful together with their document key, so the pair
//! `(rel_path, NodeId)` is the run-wide node address.

use std::collections::BTreeMap;

use crate::xml::Document;

#[derive(Debug, Default)]
pub struct DocumentSet {
    docs: BTreeMap<String, Document>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rel_path: &str, doc: Document) {
        self.docs.insert(rel_path.to_string(), doc);
    }

    pub fn contains(&self, rel_path: &str) -> bool {
        self.docs.contains_key(rel_path)
    }

    pub fn get(&self, rel_path: &str) -> Option<&Document> {
        self.docs.get(rel_path)
    }

    pub fn get_mut(&mut self, rel_path: &str) -> Option<&mut Document> {
        self.docs.get_mut(rel_path)
    }

    /// Documents in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.docs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
