//! Metadata records and the forward-pass extractor.
//!
//! The forward pass walks one ARXML document, assigns every transformable
//! element a stable identity from the run's shared counter, and records a
//! positional address for it: the `ordinal_index`-th occurrence of
//! `tag_name` in document order across the whole document. The address is
//! fragile by design — it is only valid while neither the ARXML file nor
//! the sidecar is altered between assignment and resolution.

use serde::{Deserialize, Serialize};

use crate::run::TransformationRun;
use crate::tags::{self, TransformableTag};
use crate::xml::{Document, NodeId};

/// Persisted tuple locating one identity's origin element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// Opaque stable identity (`arlangModId` in generated DSL text).
    pub identity: String,
    /// Dotted FQN of the logical container at assignment time.
    pub container_fqn: String,
    /// Concrete ARXML tag of the element.
    pub tag_name: String,
    /// Position among all `tag_name` elements of the whole document.
    pub ordinal_index: usize,
}

/// Forward pass over one document: assign identities, return the ordered
/// record sequence. The identity counter lives in `run` and is shared
/// across every file of the invocation.
pub fn extract_document(
    doc: &Document,
    rel_path: &str,
    run: &mut TransformationRun,
) -> Vec<MetadataRecord> {
    let mut records = Vec::new();
    for tag in TransformableTag::ALL {
        for (ordinal, node) in doc.elements_by_tag_name(tag.xml_name()).into_iter().enumerate() {
            let identity = run.next_identity();
            let container_fqn = container_fqn_of(doc, node);
            run.cache_identity(rel_path, node, &identity);
            records.push(MetadataRecord {
                identity,
                container_fqn,
                tag_name: tag.xml_name().to_string(),
                ordinal_index: ordinal,
            });
        }
    }
    tracing::debug!(rel_path, count = records.len(), "extracted metadata records");
    records
}

/// Dotted FQN of the logical container of `node`: the short names of every
/// SHORT-NAME-bearing ancestor, outermost first. For ports the owning
/// component bears a SHORT-NAME, so its name lands as the final segment.
pub fn container_fqn_of(doc: &Document, node: NodeId) -> String {
    let mut names = Vec::new();
    let mut cursor = doc.parent(node);
    while let Some(id) = cursor {
        if let Some(name_el) = doc.find_child_element(id, tags::SHORT_NAME) {
            names.push(doc.text_content(name_el));
        }
        cursor = doc.parent(id);
    }
    names.reverse();
    names.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        Document::parse(
            r#"<AUTOSAR>
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
            <R-PORT-PROTOTYPE>
              <SHORT-NAME>in</SHORT-NAME>
              <REQUIRED-INTERFACE-TREF DEST="SENDER-RECEIVER-INTERFACE">/Pkg/IfA</REQUIRED-INTERFACE-TREF>
            </R-PORT-PROTOTYPE>
          </PORTS>
        </APPLICATION-SW-COMPONENT-TYPE>
      </ELEMENTS>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>"#,
        )
        .unwrap()
    }

    #[test]
    fn records_follow_tag_kind_then_document_order() {
        let doc = sample();
        let mut run = TransformationRun::new();
        let records = extract_document(&doc, "ecu/app", &mut run);

        let summary: Vec<(&str, &str, usize)> = records
            .iter()
            .map(|r| (r.identity.as_str(), r.tag_name.as_str(), r.ordinal_index))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("mod-1", "SENDER-RECEIVER-INTERFACE", 0),
                ("mod-2", "APPLICATION-SW-COMPONENT-TYPE", 0),
                ("mod-3", "P-PORT-PROTOTYPE", 0),
                ("mod-4", "R-PORT-PROTOTYPE", 0),
            ]
        );
    }

    #[test]
    fn port_container_carries_owning_component() {
        let doc = sample();
        let mut run = TransformationRun::new();
        let records = extract_document(&doc, "ecu/app", &mut run);

        assert_eq!(records[0].container_fqn, "Pkg"); // interface
        assert_eq!(records[1].container_fqn, "Pkg"); // component
        assert_eq!(records[2].container_fqn, "Pkg.Comp"); // provide port
        assert_eq!(records[3].container_fqn, "Pkg.Comp"); // require port
    }

    #[test]
    fn counter_spans_files_without_reset() {
        let doc = sample();
        let mut run = TransformationRun::new();
        let first = extract_document(&doc, "a", &mut run);
        let second = extract_document(&doc, "b", &mut run);
        assert_eq!(first[0].identity, "mod-1");
        assert_eq!(second[0].identity, "mod-5");
    }

    #[test]
    fn extraction_is_idempotent_for_fresh_runs() {
        let doc = sample();
        let a = extract_document(&doc, "x", &mut TransformationRun::new());
        let b = extract_document(&doc, "x", &mut TransformationRun::new());
        assert_eq!(a, b);
    }

    #[test]
    fn element_identity_is_cached_for_the_run() {
        let doc = sample();
        let mut run = TransformationRun::new();
        extract_document(&doc, "ecu/app", &mut run);
        let comp = doc.elements_by_tag_name("APPLICATION-SW-COMPONENT-TYPE")[0];
        assert_eq!(run.identity_of("ecu/app", comp), Some("mod-2"));
    }
}
