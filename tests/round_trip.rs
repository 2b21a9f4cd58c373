//! End-to-end runs over a real temporary tree: forward extraction followed
//! by a reverse reconciliation, checked against the files on disk.

use std::fs;
use std::path::Path;

use arlang_sync::model::{
    DslElement, DslFile, DslModel, DslPackage, DslPort, InterfaceKind, InterfaceRef,
    PortDirection, RefDest,
};
use arlang_sync::notify::{CollectingNotifier, Notice};
use arlang_sync::xml::{Document, NodeId, NodeKind};
use arlang_sync::{apply_model, extract_all};

const APP_ARXML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR>
  <AR-PACKAGES>
    <AR-PACKAGE>
      <SHORT-NAME>Pkg</SHORT-NAME>
      <ELEMENTS>
        <SENDER-RECEIVER-INTERFACE>
          <SHORT-NAME>IfA</SHORT-NAME>
        </SENDER-RECEIVER-INTERFACE>
        <APPLICATION-SW-COMPONENT-TYPE>
          <SHORT-NAME>Comp</SHORT-NAME>
          <PORTS>
            <P-PORT-PROTOTYPE>
              <SHORT-NAME>out</SHORT-NAME>
              <PROVIDED-INTERFACE-TREF DEST="SENDER-RECEIVER-INTERFACE">/Pkg/IfA</PROVIDED-INTERFACE-TREF>
            </P-PORT-PROTOTYPE>
          </PORTS>
        </APPLICATION-SW-COMPONENT-TYPE>
      </ELEMENTS>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>"#;

fn seed(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let arxml_root = dir.join("models");
    let meta_root = dir.join("models/.arlang-meta");
    fs::create_dir_all(arxml_root.join("ecu")).unwrap();
    fs::write(arxml_root.join("ecu/app.arxml"), APP_ARXML).unwrap();
    (arxml_root, meta_root)
}

fn occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Element structure of a document, whitespace-insensitive: depth, tag,
/// attributes, and trimmed direct text per element, in document order.
fn element_shape(xml: &str) -> Vec<(usize, String, Vec<(String, String)>, String)> {
    fn walk(
        doc: &Document,
        id: NodeId,
        depth: usize,
        out: &mut Vec<(usize, String, Vec<(String, String)>, String)>,
    ) {
        if let NodeKind::Element { tag, attrs } = doc.kind(id) {
            out.push((
                depth,
                tag.clone(),
                attrs.clone(),
                doc.text_content(id).trim().to_string(),
            ));
        }
        for child in doc.element_children(id) {
            walk(doc, child, depth + 1, out);
        }
    }
    let doc = Document::parse(xml).unwrap();
    let mut out = Vec::new();
    if let Some(root) = doc.root_element() {
        walk(&doc, root, 0, &mut out);
    }
    out
}

#[test]
fn extract_then_rename_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let (arxml_root, meta_root) = seed(dir.path());
    let mut notifier = CollectingNotifier::default();

    let extracted = extract_all(&arxml_root, &meta_root, &mut notifier).unwrap();
    assert_eq!(extracted.files, 1);
    // Interface, component, and its port each get an identity.
    assert_eq!(extracted.identities, 3);
    assert!(meta_root.join("ecu/app.json").is_file());

    // Same package, same file: every identified element is modified in
    // place; one brand-new interface rides along at the end.
    let model = DslModel {
        files: vec![DslFile {
            path: "ecu/app".to_string(),
            packages: vec![DslPackage {
                name: "Pkg".to_string(),
                elements: vec![
                    DslElement::Interface {
                        identity: Some("mod-1".to_string()),
                        name: "IfRenamed".to_string(),
                        variant: InterfaceKind::SenderReceiver,
                    },
                    DslElement::Component {
                        identity: Some("mod-2".to_string()),
                        name: "Comp".to_string(),
                        ports: vec![DslPort {
                            identity: Some("mod-3".to_string()),
                            name: "tx".to_string(),
                            direction: PortDirection::Provide,
                            interface: Some(InterfaceRef {
                                path: "/Pkg/IfRenamed".to_string(),
                                dest: RefDest::SenderReceiver,
                            }),
                        }],
                    },
                    DslElement::Interface {
                        identity: None,
                        name: "IfNew".to_string(),
                        variant: InterfaceKind::ClientServer,
                    },
                ],
            }],
        }],
    };

    let summary = apply_model(&model, &arxml_root, &meta_root, &mut notifier).unwrap();
    assert!(!summary.had_errors, "notices: {:?}", notifier.notices);
    assert_eq!(summary.files_written, 1);

    let out = fs::read_to_string(arxml_root.join("ecu/app.arxml")).unwrap();
    // The superseded originals were swept: exactly one of each survives.
    assert_eq!(occurrences(&out, "<SENDER-RECEIVER-INTERFACE>"), 1);
    assert_eq!(occurrences(&out, "<APPLICATION-SW-COMPONENT-TYPE>"), 1);
    assert_eq!(occurrences(&out, "<P-PORT-PROTOTYPE>"), 1);
    assert_eq!(occurrences(&out, "<SHORT-NAME>IfRenamed</SHORT-NAME>"), 1);
    assert_eq!(occurrences(&out, "<SHORT-NAME>IfA</SHORT-NAME>"), 0);
    // The port was renamed and its reference retargeted.
    assert_eq!(occurrences(&out, "<SHORT-NAME>tx</SHORT-NAME>"), 1);
    assert_eq!(occurrences(&out, ">/Pkg/IfRenamed<"), 1);
    assert_eq!(occurrences(&out, ">/Pkg/IfA<"), 0);
    // The new interface was created in the same collection.
    assert_eq!(occurrences(&out, "<CLIENT-SERVER-INTERFACE>"), 1);
    assert_eq!(occurrences(&out, "<SHORT-NAME>IfNew</SHORT-NAME>"), 1);
}

#[test]
fn no_edit_apply_preserves_document_structure() {
    let dir = tempfile::tempdir().unwrap();
    let (arxml_root, meta_root) = seed(dir.path());
    let mut notifier = CollectingNotifier::default();
    extract_all(&arxml_root, &meta_root, &mut notifier).unwrap();

    // The model mirrors the extracted document exactly: every element is
    // modified in place onto identical content.
    let model = DslModel {
        files: vec![DslFile {
            path: "ecu/app".to_string(),
            packages: vec![DslPackage {
                name: "Pkg".to_string(),
                elements: vec![
                    DslElement::Interface {
                        identity: Some("mod-1".to_string()),
                        name: "IfA".to_string(),
                        variant: InterfaceKind::SenderReceiver,
                    },
                    DslElement::Component {
                        identity: Some("mod-2".to_string()),
                        name: "Comp".to_string(),
                        ports: vec![DslPort {
                            identity: Some("mod-3".to_string()),
                            name: "out".to_string(),
                            direction: PortDirection::Provide,
                            interface: Some(InterfaceRef {
                                path: "/Pkg/IfA".to_string(),
                                dest: RefDest::SenderReceiver,
                            }),
                        }],
                    },
                ],
            }],
        }],
    };

    let summary = apply_model(&model, &arxml_root, &meta_root, &mut notifier).unwrap();
    assert!(!summary.had_errors, "notices: {:?}", notifier.notices);

    let out = fs::read_to_string(arxml_root.join("ecu/app.arxml")).unwrap();
    assert_eq!(element_shape(&out), element_shape(APP_ARXML));
}

#[test]
fn unresolved_identity_is_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (arxml_root, meta_root) = seed(dir.path());
    let mut notifier = CollectingNotifier::default();
    extract_all(&arxml_root, &meta_root, &mut notifier).unwrap();

    let model = DslModel {
        files: vec![DslFile {
            path: "ecu/app".to_string(),
            packages: vec![DslPackage {
                name: "Pkg".to_string(),
                elements: vec![DslElement::Interface {
                    identity: Some("mod-99".to_string()),
                    name: "Ghost".to_string(),
                    variant: InterfaceKind::SenderReceiver,
                }],
            }],
        }],
    };

    let summary = apply_model(&model, &arxml_root, &meta_root, &mut notifier).unwrap();
    assert!(summary.had_errors);
    assert!(notifier
        .notices
        .iter()
        .any(|n| matches!(n, Notice::UnresolvedIdentity { identity } if identity == "mod-99")));
    // Nothing changed, so nothing was written back.
    assert_eq!(summary.files_written, 0);
    let out = fs::read_to_string(arxml_root.join("ecu/app.arxml")).unwrap();
    assert_eq!(out, APP_ARXML);
}

#[test]
fn new_dsl_file_synthesizes_a_skeleton_document() {
    let dir = tempfile::tempdir().unwrap();
    let (arxml_root, meta_root) = seed(dir.path());
    let mut notifier = CollectingNotifier::default();
    extract_all(&arxml_root, &meta_root, &mut notifier).unwrap();

    let model = DslModel {
        files: vec![DslFile {
            path: "ecu/extra".to_string(),
            packages: vec![DslPackage {
                name: "Aux.Signals".to_string(),
                elements: vec![DslElement::Interface {
                    identity: None,
                    name: "IfAux".to_string(),
                    variant: InterfaceKind::SenderReceiver,
                }],
            }],
        }],
    };

    let summary = apply_model(&model, &arxml_root, &meta_root, &mut notifier).unwrap();
    assert!(!summary.had_errors);
    assert_eq!(summary.files_written, 1);

    let out = fs::read_to_string(arxml_root.join("ecu/extra.arxml")).unwrap();
    assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(out.contains("<SHORT-NAME>Aux</SHORT-NAME>"));
    assert!(out.contains("<SHORT-NAME>Signals</SHORT-NAME>"));
    assert!(out.contains("<SHORT-NAME>IfAux</SHORT-NAME>"));
}

#[test]
fn copy_between_files_leaves_the_source_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (arxml_root, meta_root) = seed(dir.path());
    let mut notifier = CollectingNotifier::default();
    extract_all(&arxml_root, &meta_root, &mut notifier).unwrap();

    // The identified interface is authored in a different file, so the
    // engine copies it there instead of moving it.
    let model = DslModel {
        files: vec![DslFile {
            path: "ecu/other".to_string(),
            packages: vec![DslPackage {
                name: "Pkg".to_string(),
                elements: vec![DslElement::Interface {
                    identity: Some("mod-1".to_string()),
                    name: "IfCopied".to_string(),
                    variant: InterfaceKind::SenderReceiver,
                }],
            }],
        }],
    };

    let summary = apply_model(&model, &arxml_root, &meta_root, &mut notifier).unwrap();
    assert!(!summary.had_errors, "notices: {:?}", notifier.notices);

    let copied = fs::read_to_string(arxml_root.join("ecu/other.arxml")).unwrap();
    assert_eq!(occurrences(&copied, "<SHORT-NAME>IfCopied</SHORT-NAME>"), 1);

    // Source document keeps its original element.
    let source = fs::read_to_string(arxml_root.join("ecu/app.arxml")).unwrap();
    assert_eq!(occurrences(&source, "<SHORT-NAME>IfA</SHORT-NAME>"), 1);
}
