//! The typed DSL-side model handed over by the ARLANG parser.
//!
//! Pure data structures only: the grammar, lexer, and editor surface live
//! with the parser collaborator. Every element optionally carries the
//! identity assigned during a previous forward pass and always carries its
//! name; containers are expressed by nesting. All types are serde-round-
//! trippable so the model can cross a process boundary as JSON.

use serde::{Deserialize, Serialize};

use crate::tags::{self, TransformableTag};

/// A whole authored model: one entry per DSL source file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DslModel {
    pub files: Vec<DslFile>,
}

/// The content of one DSL file. `path` is the file's path relative to the
/// model root, forward-slash separated, without extension; it pairs the file
/// with the ARXML document at the same relative location.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DslFile {
    pub path: String,
    pub packages: Vec<DslPackage>,
}

/// One package declaration. `name` is the dotted fully qualified package
/// path (`Pkg.Sub`), mirroring nested AR-PACKAGE short names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DslPackage {
    pub name: String,
    pub elements: Vec<DslElement>,
}

/// A package-level element, in authored order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DslElement {
    Interface {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<String>,
        name: String,
        variant: InterfaceKind,
    },
    Component {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<String>,
        name: String,
        #[serde(default)]
        ports: Vec<DslPort>,
    },
}

impl DslElement {
    pub fn identity(&self) -> Option<&str> {
        match self {
            DslElement::Interface { identity, .. } | DslElement::Component { identity, .. } => {
                identity.as_deref()
            }
        }
    }

}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterfaceKind {
    SenderReceiver,
    ClientServer,
}

impl InterfaceKind {
    pub fn target_tag(self) -> TransformableTag {
        match self {
            InterfaceKind::SenderReceiver => TransformableTag::SenderReceiverInterface,
            InterfaceKind::ClientServer => TransformableTag::ClientServerInterface,
        }
    }
}

/// A port nested inside a component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DslPort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub name: String,
    pub direction: PortDirection,
    /// Reference to the interface the port realizes. Optional: a port
    /// authored without a reference keeps whatever the original ARXML had.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<InterfaceRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortDirection {
    Provide,
    Require,
}

impl PortDirection {
    pub fn target_tag(self) -> TransformableTag {
        match self {
            PortDirection::Provide => TransformableTag::PPortPrototype,
            PortDirection::Require => TransformableTag::RPortPrototype,
        }
    }

    /// Tag of the interface reference child this direction expects.
    pub fn tref_tag(self) -> &'static str {
        match self {
            PortDirection::Provide => tags::PROVIDED_INTERFACE_TREF,
            PortDirection::Require => tags::REQUIRED_INTERFACE_TREF,
        }
    }
}

/// Interface reference carried by a port: absolute path text plus the
/// destination kind written into the DEST attribute.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterfaceRef {
    pub path: String,
    pub dest: RefDest,
}

/// Destination kind of an interface reference. Kinds the engine does not
/// transform yet deserialize to `Unsupported` and pass through silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefDest {
    SenderReceiver,
    ClientServer,
    Unsupported,
}

impl<'de> Deserialize<'de> for RefDest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "sender-receiver" => RefDest::SenderReceiver,
            "client-server" => RefDest::ClientServer,
            _ => RefDest::Unsupported,
        })
    }
}

impl RefDest {
    /// DEST attribute value, or `None` when the kind is not transformable
    /// (deliberate not-yet-implemented pass-through, not an error).
    pub fn dest_attr(self) -> Option<&'static str> {
        match self {
            RefDest::SenderReceiver => Some("SENDER-RECEIVER-INTERFACE"),
            RefDest::ClientServer => Some("CLIENT-SERVER-INTERFACE"),
            RefDest::Unsupported => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_json_round_trip() {
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
                            identity: None,
                            name: "Comp".to_string(),
                            ports: vec![DslPort {
                                identity: None,
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
        let json = serde_json::to_string(&model).unwrap();
        let back: DslModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.files[0].packages[0].elements.len(), 2);
        assert_eq!(back.files[0].packages[0].elements[0].identity(), Some("mod-1"));
    }

    #[test]
    fn unknown_ref_dest_deserializes_as_unsupported() {
        let json = r#"{"path": "/Pkg/X", "dest": "mode-switch"}"#;
        let r: InterfaceRef = serde_json::from_str(json).unwrap();
        assert_eq!(r.dest, RefDest::Unsupported);
        assert_eq!(r.dest.dest_attr(), None);
    }
}
