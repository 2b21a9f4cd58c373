//! The fixed ARXML vocabulary the engine transforms.
//!
//! Everything outside this closed set passes through the reconciler
//! untouched.

/// Tag of a SHORT-NAME holder element.
pub const SHORT_NAME: &str = "SHORT-NAME";
pub const AUTOSAR: &str = "AUTOSAR";
pub const AR_PACKAGES: &str = "AR-PACKAGES";
pub const AR_PACKAGE: &str = "AR-PACKAGE";
pub const ELEMENTS: &str = "ELEMENTS";
pub const PORTS: &str = "PORTS";
pub const PROVIDED_INTERFACE_TREF: &str = "PROVIDED-INTERFACE-TREF";
pub const REQUIRED_INTERFACE_TREF: &str = "REQUIRED-INTERFACE-TREF";
/// Destination-kind attribute on interface reference elements.
pub const DEST: &str = "DEST";

/// The closed set of element kinds that receive identities and take part in
/// reconciliation. One variant per concrete ARXML tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransformableTag {
    SenderReceiverInterface,
    ClientServerInterface,
    ApplicationSwComponentType,
    PPortPrototype,
    RPortPrototype,
}

impl TransformableTag {
    /// Extraction order. The identity counter walks tags in this order for
    /// every document, so the order is part of the reproducibility
    /// contract.
    pub const ALL: [TransformableTag; 5] = [
        TransformableTag::SenderReceiverInterface,
        TransformableTag::ClientServerInterface,
        TransformableTag::ApplicationSwComponentType,
        TransformableTag::PPortPrototype,
        TransformableTag::RPortPrototype,
    ];

    pub fn xml_name(self) -> &'static str {
        match self {
            TransformableTag::SenderReceiverInterface => "SENDER-RECEIVER-INTERFACE",
            TransformableTag::ClientServerInterface => "CLIENT-SERVER-INTERFACE",
            TransformableTag::ApplicationSwComponentType => "APPLICATION-SW-COMPONENT-TYPE",
            TransformableTag::PPortPrototype => "P-PORT-PROTOTYPE",
            TransformableTag::RPortPrototype => "R-PORT-PROTOTYPE",
        }
    }

    pub fn from_xml_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.xml_name() == name)
    }

    /// Ports live inside a component; their container FQN carries the
    /// owning component's short name as its final segment.
    pub fn is_port(self) -> bool {
        matches!(
            self,
            TransformableTag::PPortPrototype | TransformableTag::RPortPrototype
        )
    }
}
