//! Run drivers for the two directions.
//!
//! `extract_all` is the forward pass (ARXML → metadata sidecars);
//! `apply_model` is the reverse pass (DSL model → mutated ARXML). Both
//! construct a fresh [`TransformationRun`] — the reset contract — and
//! process files strictly sequentially in the deterministic segment-wise
//! path order, because the identity counter and the deferred-removal set
//! are shared run state.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::docset::DocumentSet;
use crate::error::{Result, SyncError};
use crate::index::IdentityIndex;
use crate::model::DslModel;
use crate::notify::{Notice, Notifier};
use crate::reconcile::{reconcile_package_elements, ReconcileCtx};
use crate::run::TransformationRun;
use crate::sidecar;
use crate::tags;
use crate::xml::{Document, NodeId};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub identities: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub files_written: usize,
    /// Aggregate of the run-scoped error flag: per-element failures were
    /// recorded but did not abort the traversal.
    pub had_errors: bool,
}

/// Forward pass: walk every ARXML file under `arxml_root` in deterministic
/// order, assign identities from one shared counter, and persist one
/// sidecar per file under `meta_root`.
pub fn extract_all(
    arxml_root: &Path,
    meta_root: &Path,
    notifier: &mut dyn Notifier,
) -> Result<ExtractSummary> {
    let mut run = TransformationRun::new();
    let rel_paths =
        sidecar::scan_tree(arxml_root, sidecar::ARXML_EXT).map_err(|source| SyncError::FileIo {
            path: arxml_root.to_path_buf(),
            source,
        })?;

    let mut summary = ExtractSummary::default();
    for rel_path in rel_paths {
        run.set_current_path(&rel_path);
        let path = sidecar::arxml_path(arxml_root, &rel_path);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(rel_path, error = %e, "skipping unreadable ARXML file");
                continue;
            }
        };
        let doc = match Document::parse(&text) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(rel_path, error = %e, "skipping malformed ARXML file");
                continue;
            }
        };

        let records = crate::metadata::extract_document(&doc, &rel_path, &mut run);
        summary.identities += records.len();
        summary.files += 1;
        if let Err(e) = sidecar::write_records(meta_root, &rel_path, &records) {
            if let SyncError::DirCreation { path, .. } = &e {
                notifier.notify(Notice::DirCreationFailed { path: path.clone() });
            }
            // Sidecar persistence failures corrupt the run's shared
            // contract (identities without addresses), so the run aborts.
            return Err(e);
        }
    }

    info!(
        files = summary.files,
        identities = summary.identities,
        "metadata extraction complete"
    );
    Ok(summary)
}

/// Reverse pass: reconcile an authored DSL model against the ARXML tree,
/// sweep deferred removals, and write every touched document back.
pub fn apply_model(
    model: &DslModel,
    arxml_root: &Path,
    meta_root: &Path,
    notifier: &mut dyn Notifier,
) -> Result<ApplySummary> {
    let mut run = TransformationRun::new();
    let mut docs = DocumentSet::new();
    let index = IdentityIndex::build(arxml_root, meta_root, &mut docs, notifier)?;

    let mut files: Vec<&crate::model::DslFile> = model.files.iter().collect();
    files.sort_by(|a, b| sidecar::compare_rel_paths(&a.path, &b.path));

    for file in files {
        run.set_current_path(&file.path);
        if !ensure_document(&mut docs, arxml_root, &file.path) {
            continue;
        }
        for package in &file.packages {
            let Some(doc) = docs.get_mut(&file.path) else {
                continue;
            };
            let Some((collection, collection_is_new)) = ensure_elements(doc, &package.name) else {
                continue;
            };
            let mut ctx = ReconcileCtx {
                docs: &mut docs,
                index: &index,
                run: &mut run,
                notifier: &mut *notifier,
            };
            reconcile_package_elements(
                &mut ctx,
                &file.path,
                collection,
                collection_is_new,
                &package.name,
                &package.elements,
            );
        }
    }

    run.sweep_deferred(&mut docs);

    let mut summary = ApplySummary {
        files_written: 0,
        had_errors: run.has_errors(),
    };
    let dirty: Vec<String> = docs
        .iter()
        .filter(|(_, doc)| doc.is_dirty())
        .map(|(rel, _)| rel.to_string())
        .collect();
    for rel_path in dirty {
        let Some(doc) = docs.get(&rel_path) else {
            continue;
        };
        let path = sidecar::arxml_path(arxml_root, &rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                notifier.notify(Notice::DirCreationFailed {
                    path: parent.to_path_buf(),
                });
                SyncError::DirCreation {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }
        let xml = doc.to_xml_string()?;
        fs::write(&path, xml).map_err(|source| SyncError::FileIo {
            path: path.clone(),
            source,
        })?;
        summary.files_written += 1;
    }

    info!(
        files_written = summary.files_written,
        had_errors = summary.had_errors,
        "model applied"
    );
    Ok(summary)
}

/// Make sure a document exists in the set for `rel_path`: already loaded by
/// the index build, loaded from disk now, or synthesized as an empty ARXML
/// skeleton for a brand-new DSL file. Returns false when an existing file
/// is unreadable or malformed (that file is skipped, the run continues).
fn ensure_document(docs: &mut DocumentSet, arxml_root: &Path, rel_path: &str) -> bool {
    if docs.contains(rel_path) {
        return true;
    }
    let path = sidecar::arxml_path(arxml_root, rel_path);
    match fs::read_to_string(&path) {
        Ok(text) => match Document::parse(&text) {
            Ok(doc) => {
                docs.insert(rel_path, doc);
                true
            }
            Err(e) => {
                warn!(rel_path, error = %e, "skipping malformed ARXML file");
                false
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            docs.insert(rel_path, arxml_skeleton());
            true
        }
        Err(e) => {
            warn!(rel_path, error = %e, "skipping unreadable ARXML file");
            false
        }
    }
}

fn arxml_skeleton() -> Document {
    let mut doc = Document::new();
    let decl = doc.create_declaration("xml version=\"1.0\" encoding=\"UTF-8\"");
    doc.push_top(decl);
    let autosar = doc.create_element(tags::AUTOSAR);
    doc.push_top(autosar);
    let packages = doc.create_element(tags::AR_PACKAGES);
    doc.append_child(autosar, packages);
    doc
}

/// Find or create the AR-PACKAGE chain for a dotted package FQN and return
/// its ELEMENTS collection plus whether that collection was created this
/// run.
fn ensure_elements(doc: &mut Document, package_fqn: &str) -> Option<(NodeId, bool)> {
    let root = match doc.root_element() {
        Some(root) => root,
        None => {
            let autosar = doc.create_element(tags::AUTOSAR);
            doc.push_top(autosar);
            autosar
        }
    };
    let mut packages = match doc.find_child_element(root, tags::AR_PACKAGES) {
        Some(p) => p,
        None => {
            let p = doc.create_element(tags::AR_PACKAGES);
            doc.append_child(root, p);
            p
        }
    };

    let segments: Vec<&str> = package_fqn.split('.').filter(|s| !s.is_empty()).collect();
    let mut package = None;
    for (i, segment) in segments.iter().enumerate() {
        let found = doc.element_children(packages).into_iter().find(|&p| {
            doc.tag(p) == Some(tags::AR_PACKAGE)
                && doc
                    .find_child_element(p, tags::SHORT_NAME)
                    .map(|n| doc.text_content(n) == *segment)
                    .unwrap_or(false)
        });
        let p = match found {
            Some(p) => p,
            None => {
                let p = doc.create_element(tags::AR_PACKAGE);
                let name = doc.create_element(tags::SHORT_NAME);
                doc.set_text_content(name, segment);
                doc.append_child(p, name);
                doc.append_child(packages, p);
                p
            }
        };
        package = Some(p);
        // Nested packages live under AR-PACKAGE > AR-PACKAGES.
        if i + 1 < segments.len() {
            packages = match doc.find_child_element(p, tags::AR_PACKAGES) {
                Some(nested) => nested,
                None => {
                    let nested = doc.create_element(tags::AR_PACKAGES);
                    doc.append_child(p, nested);
                    nested
                }
            };
        }
    }

    let package = package?;
    match doc.find_child_element(package, tags::ELEMENTS) {
        Some(elements) => Some((elements, false)),
        None => {
            let elements = doc.create_element(tags::ELEMENTS);
            doc.append_child(package, elements);
            Some((elements, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_has_declaration_and_package_root() {
        let doc = arxml_skeleton();
        let xml = doc.to_xml_string().unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><AUTOSAR><AR-PACKAGES/></AUTOSAR>"
        );
    }

    #[test]
    fn ensure_elements_builds_nested_package_chain() {
        let mut doc = arxml_skeleton();
        let (elements, created) = ensure_elements(&mut doc, "Pkg.Sub").unwrap();
        assert!(created);
        assert_eq!(doc.tag(elements), Some(tags::ELEMENTS));

        let xml = doc.to_xml_string().unwrap();
        assert!(xml.contains("<AR-PACKAGE><SHORT-NAME>Pkg</SHORT-NAME>"));
        assert!(xml.contains("<AR-PACKAGE><SHORT-NAME>Sub</SHORT-NAME>"));

        // Second call finds the same collection instead of duplicating it.
        let (again, created_again) = ensure_elements(&mut doc, "Pkg.Sub").unwrap();
        assert_eq!(again, elements);
        assert!(!created_again);
    }

    #[test]
    fn ensure_elements_reuses_existing_packages() {
        let mut doc = Document::parse(
            "<AUTOSAR><AR-PACKAGES><AR-PACKAGE><SHORT-NAME>Pkg</SHORT-NAME>\
             <ELEMENTS/></AR-PACKAGE></AR-PACKAGES></AUTOSAR>",
        )
        .unwrap();
        let (elements, created) = ensure_elements(&mut doc, "Pkg").unwrap();
        assert!(!created);
        assert_eq!(doc.tag(elements), Some(tags::ELEMENTS));
    }
}
