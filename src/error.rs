//! Typed error model for the reconciliation engine.
//!
//! Only failures that propagate up to the caller live here. Per-element
//! failures (unresolved identity, missing structural child) are recoverable
//! by contract: they surface as [`crate::notify::Notice`]s plus the
//! run-scoped error flag, and never abort the traversal. What remains is
//! I/O and format trouble:
//! - per-file failures skip that document and continue with the rest;
//! - shared-state failures (metadata root inaccessible, directory creation)
//!   abort the run.
//!
//! Rules: `thiserror` for enum derivation, no manual `Display` impls, no
//! `.unwrap()` in non-test code.

use std::path::PathBuf;

use crate::xml::XmlError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The metadata root cannot be read at all; nothing in the run can
    /// resolve, so the run aborts.
    #[error("metadata directory `{path}` is not accessible")]
    MetadataRootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating a sidecar output directory failed; the run aborts.
    #[error("failed to create directory `{path}`")]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing one file failed. Per-file: the affected document
    /// is skipped, the rest of the run continues.
    #[error("I/O error on `{path}`")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A metadata sidecar failed to deserialize. Per-file.
    #[error("failed to parse metadata sidecar `{path}`: {source}")]
    MalformedSidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Xml(#[from] XmlError),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Every variant must be constructible and carry a readable message.
    #[test]
    fn all_variants_constructible() {
        let io = || std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let variants: Vec<SyncError> = vec![
            SyncError::MetadataRootInaccessible {
                path: ".arlang-meta".into(),
                source: io(),
            },
            SyncError::DirCreation {
                path: ".arlang-meta/ecu".into(),
                source: io(),
            },
            SyncError::FileIo {
                path: "ecu/app.arxml".into(),
                source: io(),
            },
            SyncError::MalformedSidecar {
                path: "ecu/app.json".into(),
                source: serde_json::from_str::<u8>("x").unwrap_err(),
            },
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }
}
