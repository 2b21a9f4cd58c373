//! Notification seam towards the editor collaborator.
//!
//! The engine signals situations by name and leaves message formatting and
//! display entirely to the collaborator (toast, problems view, log line).
//! Exactly four situations cross this seam; everything else is either a
//! returned error or a tracing event.

use std::path::PathBuf;

/// A named situation the user should hear about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// A DSL-authored identity did not resolve; the element was dropped
    /// from the output.
    UnresolvedIdentity { identity: String },
    /// An expected structural element was absent (e.g., a port without its
    /// interface reference); the element was skipped.
    MissingStructuralElement { parent: String, expected: String },
    /// The metadata root could not be read.
    MetadataDirInaccessible { path: PathBuf },
    /// A sidecar output directory could not be created.
    DirCreationFailed { path: PathBuf },
}

/// Sink for [`Notice`]s. Implemented by the editor integration; the CLI
/// installs [`TracingNotifier`].
pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Routes notices to tracing at warn level.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, notice: Notice) {
        match &notice {
            Notice::UnresolvedIdentity { identity } => {
                tracing::warn!(identity = %identity, "unresolved identity, element dropped");
            }
            Notice::MissingStructuralElement { parent, expected } => {
                tracing::warn!(%parent, %expected, "missing expected structural element");
            }
            Notice::MetadataDirInaccessible { path } => {
                tracing::error!(path = %path.display(), "metadata directory inaccessible");
            }
            Notice::DirCreationFailed { path } => {
                tracing::error!(path = %path.display(), "directory creation failed");
            }
        }
    }
}

/// Collects notices; used by tests and by callers that report in bulk.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    pub notices: Vec<Notice>,
}

impl Notifier for CollectingNotifier {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
