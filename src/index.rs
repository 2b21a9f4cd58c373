//! The per-run identity index.
//!
//! Built once per reverse pass by scanning every sidecar under the metadata
//! root and pairing it with the ARXML document at the same relative path.
//! Records resolve through the same document-order tag indexing the
//! extractor used, and resolution happens entirely at build time — before
//! any mutation — so later tree edits cannot skew the positional addresses.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::docset::DocumentSet;
use crate::error::Result;
use crate::notify::{Notice, Notifier};
use crate::sidecar;
use crate::xml::{Document, NodeId};

/// Where one identity's origin element lives.
#[derive(Clone, Debug)]
pub struct IndexEntry {
    /// Relative source path, forward-slash separated, without extension.
    pub rel_path: String,
    /// The live element in the document at `rel_path`.
    pub node: NodeId,
    /// Container FQN recorded at assignment time.
    pub container_fqn: String,
}

#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_identity: HashMap<String, IndexEntry>,
    by_node: HashMap<(String, NodeId), String>,
}

impl IdentityIndex {
    /// `identity → live element`, or not-found.
    pub fn resolve(&self, identity: &str) -> Option<&IndexEntry> {
        self.by_identity.get(identity)
    }

    /// `identity → recorded container FQN`, or not-found.
    pub fn container_of(&self, identity: &str) -> Option<&str> {
        self.by_identity
            .get(identity)
            .map(|e| e.container_fqn.as_str())
    }

    /// `identity → relative source path (no extension)`, or not-found.
    pub fn source_file_of(&self, identity: &str) -> Option<&str> {
        self.by_identity.get(identity).map(|e| e.rel_path.as_str())
    }

    /// Reverse lookup: the identity previously assigned to a live element.
    /// Used to pair ride-along clone children with their identities.
    pub fn identity_of_node(&self, rel_path: &str, node: NodeId) -> Option<&str> {
        self.by_node
            .get(&(rel_path.to_string(), node))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Register one resolved entry. `build` is the normal construction
    /// path; this exists for embedders that resolve records themselves.
    pub fn insert_entry(&mut self, identity: &str, entry: IndexEntry) {
        self.by_node
            .insert((entry.rel_path.clone(), entry.node), identity.to_string());
        self.by_identity.insert(identity.to_string(), entry);
    }

    /// Scan the metadata root, load every paired document into `docs`, and
    /// resolve every record. A sidecar whose paired ARXML file is
    /// unreadable or malformed only costs its own identities (they stay
    /// not-found for the rest of the run); an unreadable metadata root
    /// aborts the run.
    pub fn build(
        arxml_root: &Path,
        meta_root: &Path,
        docs: &mut DocumentSet,
        notifier: &mut dyn Notifier,
    ) -> Result<Self> {
        let mut index = IdentityIndex::default();

        let rel_paths = match sidecar::scan_tree(meta_root, sidecar::SIDECAR_EXT) {
            Ok(paths) => paths,
            Err(source) => {
                notifier.notify(Notice::MetadataDirInaccessible {
                    path: meta_root.to_path_buf(),
                });
                return Err(crate::error::SyncError::MetadataRootInaccessible {
                    path: meta_root.to_path_buf(),
                    source,
                });
            }
        };

        for rel_path in rel_paths {
            let records = match sidecar::read_records(meta_root, &rel_path) {
                Ok(records) => records,
                Err(e) => {
                    warn!(rel_path, error = %e, "skipping unreadable sidecar");
                    continue;
                }
            };

            if !docs.contains(&rel_path) {
                let arxml = sidecar::arxml_path(arxml_root, &rel_path);
                let doc = fs::read_to_string(&arxml)
                    .map_err(anyhow::Error::from)
                    .and_then(|text| Document::parse(&text).map_err(anyhow::Error::from));
                match doc {
                    Ok(doc) => docs.insert(&rel_path, doc),
                    Err(e) => {
                        warn!(
                            rel_path,
                            error = %e,
                            "paired ARXML unavailable; its identities will not resolve"
                        );
                        continue;
                    }
                }
            }

            let doc = match docs.get(&rel_path) {
                Some(doc) => doc,
                None => continue,
            };
            for record in records {
                let occurrences = doc.elements_by_tag_name(&record.tag_name);
                match occurrences.get(record.ordinal_index) {
                    Some(&node) => {
                        index.by_node
                            .insert((rel_path.clone(), node), record.identity.clone());
                        index.by_identity.insert(
                            record.identity,
                            IndexEntry {
                                rel_path: rel_path.clone(),
                                node,
                                container_fqn: record.container_fqn,
                            },
                        );
                    }
                    None => {
                        warn!(
                            identity = record.identity,
                            tag = record.tag_name,
                            ordinal = record.ordinal_index,
                            rel_path,
                            "positional address out of range; identity will not resolve"
                        );
                    }
                }
            }
        }

        info!(identities = index.len(), documents = docs.len(), "identity index built");
        Ok(index)
    }
}
