//! Run-scoped flow state.
//!
//! One [`TransformationRun`] is constructed fresh at the start of every
//! transformation invocation and threaded by reference through every call;
//! constructing it IS the reset contract. The identity counter, the error
//! flag, the transformed-identity set, the cloned-child records, and the
//! deferred-removal set all live here — nothing is process-global. Runs are
//! strictly sequential: the counter and the removal set are unsynchronized
//! by design.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::docset::DocumentSet;
use crate::xml::NodeId;

/// A child element that came along when its container was cloned. Nested
/// reconciliation finishes transforming these instead of re-creating them.
#[derive(Clone, Debug)]
pub struct ClonedChildRecord {
    pub identity: String,
    /// Document (relative path, no extension) holding the clone.
    pub rel_path: String,
    /// The ride-along copy inside the cloned container.
    pub node: NodeId,
    pub transformed: bool,
}

/// All mutable state of one transformation invocation.
#[derive(Debug, Default)]
pub struct TransformationRun {
    id_counter: u64,
    error_flag: bool,
    current_path: Option<String>,
    transformed: HashSet<String>,
    cloned_children: Vec<ClonedChildRecord>,
    /// Originals superseded by a modification clone, removed only by
    /// [`TransformationRun::sweep_deferred`]. Keyed by (document, node) so
    /// membership checks guard against a single original being targeted
    /// twice.
    deferred_removals: BTreeSet<(String, NodeId)>,
    /// Forward-pass cache: element → identity, so same-run lookups do not
    /// re-derive assignments.
    identities: HashMap<(String, NodeId), String>,
}

impl TransformationRun {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Identity allocation ──

    /// Next identity from the single counter shared across the whole
    /// multi-file run. Never reset per file: combined with deterministic
    /// file ordering this makes numbering reproducible across repeated runs
    /// on unchanged input.
    pub fn next_identity(&mut self) -> String {
        self.id_counter += 1;
        format!("mod-{}", self.id_counter)
    }

    pub fn cache_identity(&mut self, rel_path: &str, node: NodeId, identity: &str) {
        self.identities
            .insert((rel_path.to_string(), node), identity.to_string());
    }

    pub fn identity_of(&self, rel_path: &str, node: NodeId) -> Option<&str> {
        self.identities
            .get(&(rel_path.to_string(), node))
            .map(String::as_str)
    }

    // ── Error flag ──

    /// Set by any component on an unrecoverable per-element error. Nothing
    /// but a fresh run clears it.
    pub fn mark_error(&mut self) {
        self.error_flag = true;
    }

    /// Read once after the run to decide the aggregate success/failure
    /// report.
    pub fn has_errors(&self) -> bool {
        self.error_flag
    }

    // ── File cursor ──

    pub fn set_current_path(&mut self, rel_path: &str) {
        self.current_path = Some(rel_path.to_string());
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    // ── Transformed identities ──

    pub fn mark_transformed(&mut self, identity: &str) {
        self.transformed.insert(identity.to_string());
    }

    pub fn is_transformed(&self, identity: &str) -> bool {
        self.transformed.contains(identity)
    }

    // ── Cloned-child records ──

    pub fn push_cloned_child(&mut self, identity: &str, rel_path: &str, node: NodeId) {
        self.cloned_children.push(ClonedChildRecord {
            identity: identity.to_string(),
            rel_path: rel_path.to_string(),
            node,
            transformed: false,
        });
    }

    /// Claim the untransformed ride-along copy for `identity`, if any.
    /// Marks the record transformed so a duplicate authored identity cannot
    /// claim it twice.
    pub fn claim_cloned_child(&mut self, identity: &str) -> Option<(String, NodeId)> {
        let rec = self
            .cloned_children
            .iter_mut()
            .find(|r| !r.transformed && r.identity == identity)?;
        rec.transformed = true;
        Some((rec.rel_path.clone(), rec.node))
    }

    // ── Deferred removal ──

    pub fn defer_removal(&mut self, rel_path: &str, node: NodeId) {
        self.deferred_removals.insert((rel_path.to_string(), node));
    }

    pub fn is_removal_deferred(&self, rel_path: &str, node: NodeId) -> bool {
        self.deferred_removals
            .contains(&(rel_path.to_string(), node))
    }

    pub fn deferred_removal_count(&self) -> usize {
        self.deferred_removals.len()
    }

    /// End-of-run sweep: physically remove every superseded original from
    /// its parent. Deferred because live child lists are read by position
    /// throughout reconciliation; removing mid-run would shift positions
    /// for siblings not yet processed.
    pub fn sweep_deferred(&mut self, docs: &mut DocumentSet) {
        let removals = std::mem::take(&mut self.deferred_removals);
        for (rel_path, node) in removals {
            if let Some(doc) = docs.get_mut(&rel_path) {
                doc.detach(node);
            }
        }
    }
}
