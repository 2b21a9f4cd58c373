//! The element reconciler.
//!
//! For every DSL element the reconciler decides create / copy /
//! modify-in-place against the live ARXML tree:
//!
//! - no identity → synthesize a brand-new detached node from the DSL fields
//!   alone; the caller inserts it at the authored position;
//! - identity resolves and the authored container plus current file match
//!   the recorded ones → clone the original, insert the clone immediately
//!   before it, and schedule the original for the deferred sweep;
//! - identity resolves but container or file differ → clone detached and
//!   let the caller place it; the original stays where it was
//!   (duplicate-to-new-location, the closest thing to a qualified move);
//! - identity does not resolve → diagnostic, run error flag, element
//!   dropped.
//!
//! Cloning is what preserves everything the DSL cannot express: only the
//! children the overlay understands are touched, foreign content rides
//! along untouched.

use tracing::debug;

use crate::cursor::{InsertionCursor, Placed};
use crate::docset::DocumentSet;
use crate::index::{IdentityIndex, IndexEntry};
use crate::model::{DslElement, DslPort};
use crate::notify::{Notice, Notifier};
use crate::run::TransformationRun;
use crate::tags;
use crate::xml::{Document, NodeId};

/// Result of reconciling one DSL element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A detached node the caller must insert.
    Detached(NodeId),
    /// Modification was performed directly on the live tree; the caller
    /// must not insert anything.
    InPlace,
    /// The element produced no output (resolution or structural failure).
    Skipped,
}

impl Outcome {
    fn placed(self) -> Placed {
        match self {
            Outcome::Detached(_) => Placed::Detached,
            Outcome::InPlace => Placed::InPlace,
            Outcome::Skipped => Placed::Skipped,
        }
    }
}

/// Everything a reconciliation step may touch, threaded by reference.
pub struct ReconcileCtx<'a> {
    pub docs: &'a mut DocumentSet,
    pub index: &'a IdentityIndex,
    pub run: &'a mut TransformationRun,
    pub notifier: &'a mut dyn Notifier,
}

/// Reconcile a package's authored element sequence into one ELEMENTS
/// collection of the document at `rel_path`.
pub fn reconcile_package_elements(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    collection: NodeId,
    collection_is_new: bool,
    package_fqn: &str,
    elements: &[DslElement],
) {
    reconcile_sequence(ctx, rel_path, collection, collection_is_new, elements, |ctx, el| {
        reconcile_element(ctx, rel_path, package_fqn, el)
    });
}

/// Generic ordered loop: drives the insertion cursor over one collection,
/// advancing it by the previous element's footprint before placing the
/// next.
fn reconcile_sequence<T>(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    collection: NodeId,
    collection_is_new: bool,
    items: &[T],
    mut reconcile_one: impl FnMut(&mut ReconcileCtx<'_>, &T) -> Outcome,
) {
    let mut cursor = InsertionCursor::new();
    let mut previous: Option<Placed> = None;
    for (i, item) in items.iter().enumerate() {
        if let Some(prev) = previous {
            match ctx.docs.get(rel_path) {
                Some(doc) => cursor.advance(doc, collection, prev),
                None => return,
            }
        }
        let outcome = reconcile_one(ctx, item);
        if let Outcome::Detached(node) = outcome {
            match ctx.docs.get_mut(rel_path) {
                Some(doc) => cursor.place(doc, collection, collection_is_new, i == 0, node),
                None => return,
            }
        }
        previous = Some(outcome.placed());
    }
}

/// Decide create / copy / modify for one package-level element.
pub fn reconcile_element(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    package_fqn: &str,
    element: &DslElement,
) -> Outcome {
    match element {
        DslElement::Interface {
            identity: None,
            name,
            variant,
        } => {
            let Some(doc) = ctx.docs.get_mut(rel_path) else {
                return Outcome::Skipped;
            };
            let node = create_named_element(doc, variant.target_tag().xml_name(), name);
            Outcome::Detached(node)
        }
        DslElement::Interface {
            identity: Some(identity),
            name,
            variant,
        } => {
            let Some((clone, entry)) = clone_resolved(ctx, rel_path, identity) else {
                return Outcome::Skipped;
            };
            if let Some(doc) = ctx.docs.get_mut(rel_path) {
                // Tag is re-derived from the DSL-declared subtype: the same
                // structural kind can map to a different concrete tag.
                doc.set_tag(clone, variant.target_tag().xml_name());
                overlay_short_name(doc, clone, name);
            }
            settle_placement(ctx, rel_path, package_fqn, identity, &entry, clone)
        }
        DslElement::Component {
            identity: None,
            name,
            ports,
        } => {
            let Some(doc) = ctx.docs.get_mut(rel_path) else {
                return Outcome::Skipped;
            };
            let node = create_named_element(
                doc,
                tags::TransformableTag::ApplicationSwComponentType.xml_name(),
                name,
            );
            if !ports.is_empty() {
                let ports_el = doc.create_element(tags::PORTS);
                doc.append_child(node, ports_el);
                let port_container = format!("{package_fqn}.{name}");
                reconcile_ports(ctx, rel_path, ports_el, true, &port_container, ports);
            }
            Outcome::Detached(node)
        }
        DslElement::Component {
            identity: Some(identity),
            name,
            ports,
        } => {
            let Some((clone, entry)) = clone_resolved(ctx, rel_path, identity) else {
                return Outcome::Skipped;
            };
            if let Some(doc) = ctx.docs.get_mut(rel_path) {
                doc.set_tag(
                    clone,
                    tags::TransformableTag::ApplicationSwComponentType.xml_name(),
                );
                overlay_short_name(doc, clone, name);
            }
            record_cloned_ports(ctx, rel_path, &entry, clone);
            let outcome = settle_placement(ctx, rel_path, package_fqn, identity, &entry, clone);
            if outcome == Outcome::Skipped {
                return outcome;
            }
            reconcile_component_ports(ctx, rel_path, package_fqn, name, clone, ports);
            outcome
        }
    }
}

/// Nested reconciliation of a component's port sequence against the
/// component node that will carry them (a fresh node or a clone).
fn reconcile_component_ports(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    package_fqn: &str,
    component_name: &str,
    component: NodeId,
    ports: &[DslPort],
) {
    if ports.is_empty() {
        return;
    }
    let Some(doc) = ctx.docs.get_mut(rel_path) else {
        return;
    };
    let ports_el = match doc.find_child_element(component, tags::PORTS) {
        Some(el) => el,
        None => {
            let el = doc.create_element(tags::PORTS);
            doc.append_child(component, el);
            el
        }
    };
    // Whether found inside the clone or synthesized, the collection was
    // materialized this run.
    let port_container = format!("{package_fqn}.{component_name}");
    reconcile_ports(ctx, rel_path, ports_el, true, &port_container, ports);
}

fn reconcile_ports(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    collection: NodeId,
    collection_is_new: bool,
    port_container: &str,
    ports: &[DslPort],
) {
    reconcile_sequence(ctx, rel_path, collection, collection_is_new, ports, |ctx, port| {
        reconcile_port(ctx, rel_path, port_container, port)
    });
}

/// Decide create / copy / modify for one port.
pub fn reconcile_port(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    port_container: &str,
    port: &DslPort,
) -> Outcome {
    let Some(identity) = port.identity.as_deref() else {
        return create_port(ctx, rel_path, port);
    };

    // A ride-along copy produced when the owning component was cloned:
    // finish transforming it instead of re-creating it.
    if let Some((clone_path, node)) = ctx.run.claim_cloned_child(identity) {
        debug!(identity, "finishing ride-along clone child");
        if let Some(doc) = ctx.docs.get_mut(&clone_path) {
            doc.detach(node);
            overlay_port(doc, node, port);
        }
        return Outcome::Detached(node);
    }

    let Some((clone, entry)) = clone_resolved(ctx, rel_path, identity) else {
        return Outcome::Skipped;
    };
    if let Some(doc) = ctx.docs.get_mut(rel_path) {
        overlay_port(doc, clone, port);
    }
    settle_placement(ctx, rel_path, port_container, identity, &entry, clone)
}

// ── Decision helpers ──

/// Resolve an identity and clone its original into the current document.
/// Not-found is a recoverable per-element failure: diagnostic, error flag,
/// `None`.
fn clone_resolved(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    identity: &str,
) -> Option<(NodeId, IndexEntry)> {
    let entry = match ctx.index.resolve(identity) {
        Some(entry) => entry.clone(),
        None => {
            ctx.notifier.notify(Notice::UnresolvedIdentity {
                identity: identity.to_string(),
            });
            ctx.run.mark_error();
            return None;
        }
    };

    let clone = if entry.rel_path == rel_path {
        ctx.docs.get_mut(rel_path)?.clone_subtree(entry.node)
    } else {
        let fragment = ctx.docs.get(&entry.rel_path)?.subtree_fragment(entry.node);
        ctx.docs.get_mut(rel_path)?.graft(&fragment)?
    };
    Some((clone, entry))
}

/// The placement test: same authored container and same file as recorded →
/// modify-in-place; anything else → copy (the caller inserts the detached
/// clone, the original is left untouched elsewhere in the tree).
fn settle_placement(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    authored_container: &str,
    identity: &str,
    entry: &IndexEntry,
    clone: NodeId,
) -> Outcome {
    let same_slot = authored_container == entry.container_fqn
        && rel_path == entry.rel_path
        && !ctx.run.is_removal_deferred(&entry.rel_path, entry.node);

    if same_slot {
        if let Some(doc) = ctx.docs.get_mut(rel_path) {
            if let Some(parent) = doc.parent(entry.node) {
                doc.insert_before(parent, entry.node, clone);
                ctx.run.defer_removal(&entry.rel_path, entry.node);
                ctx.run.mark_transformed(identity);
                return Outcome::InPlace;
            }
        }
    }
    // Either a genuine copy, or the in-place slot was already consumed by a
    // previous modification of the same original.
    Outcome::Detached(clone)
}

/// Pair the port children that rode along inside a freshly cloned component
/// with their identities, so nested reconciliation can claim them.
fn record_cloned_ports(
    ctx: &mut ReconcileCtx<'_>,
    rel_path: &str,
    entry: &IndexEntry,
    clone: NodeId,
) {
    let original_ports: Vec<NodeId> = match ctx.docs.get(&entry.rel_path) {
        Some(src) => match src.find_child_element(entry.node, tags::PORTS) {
            Some(ports_el) => src.element_children(ports_el),
            None => return,
        },
        None => return,
    };
    let cloned_ports: Vec<NodeId> = match ctx.docs.get(rel_path) {
        Some(doc) => match doc.find_child_element(clone, tags::PORTS) {
            Some(ports_el) => doc.element_children(ports_el),
            None => return,
        },
        None => return,
    };
    for (original, cloned) in original_ports.iter().zip(cloned_ports.iter()) {
        if let Some(identity) = ctx.index.identity_of_node(&entry.rel_path, *original) {
            ctx.run.push_cloned_child(identity, rel_path, *cloned);
        }
    }
}

// ── Node synthesis and overlay ──

/// New element whose only child is a SHORT-NAME holder.
fn create_named_element(doc: &mut Document, tag: &str, name: &str) -> NodeId {
    let node = doc.create_element(tag);
    let name_el = doc.create_element(tags::SHORT_NAME);
    doc.set_text_content(name_el, name);
    doc.append_child(node, name_el);
    node
}

/// Uniform leaf overlay: locate the expected direct child by tag; present →
/// replace its text; absent → synthesize and insert as first child. Foreign
/// children are never touched.
fn overlay_short_name(doc: &mut Document, node: NodeId, name: &str) {
    match doc.find_child_element(node, tags::SHORT_NAME) {
        Some(name_el) => doc.set_text_content(name_el, name),
        None => {
            let name_el = doc.create_element(tags::SHORT_NAME);
            doc.set_text_content(name_el, name);
            doc.insert_first(node, name_el);
        }
    }
}

/// Synthesize a port from the DSL fields alone. A port authored without an
/// interface reference has nothing to synthesize the reference element from
/// — that is the missing-structural-element failure.
fn create_port(ctx: &mut ReconcileCtx<'_>, rel_path: &str, port: &DslPort) -> Outcome {
    let port_tag = port.direction.target_tag().xml_name();
    let Some(iref) = port.interface.as_ref() else {
        ctx.notifier.notify(Notice::MissingStructuralElement {
            parent: port_tag.to_string(),
            expected: port.direction.tref_tag().to_string(),
        });
        ctx.run.mark_error();
        return Outcome::Skipped;
    };
    let Some(doc) = ctx.docs.get_mut(rel_path) else {
        return Outcome::Skipped;
    };
    let node = create_named_element(doc, port_tag, &port.name);
    if let Some(dest) = iref.dest.dest_attr() {
        let tref = doc.create_element(port.direction.tref_tag());
        doc.set_attr(tref, tags::DEST, dest);
        doc.set_text_content(tref, &iref.path);
        doc.append_child(node, tref);
    }
    // Unsupported destination kinds produce no reference element at all:
    // deliberate not-yet-implemented pass-through, not an error.
    Outcome::Detached(node)
}

/// Overlay DSL port fields onto an existing (cloned) port node.
fn overlay_port(doc: &mut Document, node: NodeId, port: &DslPort) {
    doc.set_tag(node, port.direction.target_tag().xml_name());
    overlay_short_name(doc, node, &port.name);

    let Some(iref) = port.interface.as_ref() else {
        // No reference authored: keep whatever the original had.
        return;
    };
    let Some(dest) = iref.dest.dest_attr() else {
        return;
    };
    let tref_tag = port.direction.tref_tag();
    match doc.find_child_element(node, tref_tag) {
        Some(tref) => {
            doc.set_text_content(tref, &iref.path);
            doc.set_attr(tref, tags::DEST, dest);
        }
        None => {
            let tref = doc.create_element(tref_tag);
            doc.set_attr(tref, tags::DEST, dest);
            doc.set_text_content(tref, &iref.path);
            doc.insert_first(node, tref);
        }
    }
}
