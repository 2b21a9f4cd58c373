//! Bidirectional synchronization between ARLANG models and ARXML trees.
//!
//! The forward pass ([`transform::extract_all`]) walks an ARXML tree,
//! assigns a stable identity to every transformable element, and persists
//! the identities as positional metadata records in JSON sidecars. The
//! reverse pass ([`transform::apply_model`]) reconciles an authored DSL
//! model against the same tree: elements with a resolvable identity are
//! copied or modified in place, elements without one are created, and
//! superseded originals are swept at end of run.
//!
//! All flow state lives in a per-invocation [`run::TransformationRun`];
//! nothing carries over between runs except what is on disk.

pub mod cursor;
pub mod docset;
pub mod error;
pub mod index;
pub mod metadata;
pub mod model;
pub mod notify;
pub mod reconcile;
pub mod run;
pub mod sidecar;
pub mod tags;
pub mod transform;
pub mod xml;

pub use error::{Result, SyncError};
pub use transform::{apply_model, extract_all, ApplySummary, ExtractSummary};
