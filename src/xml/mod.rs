//! Arena-backed XML document model.
//!
//! ARXML reconciliation reads child lists by position while the tree is
//! being amended, so the document is kept as an arena of nodes addressed by
//! stable [`NodeId`]s: inserting or detaching a node never invalidates the
//! id of any other node. Child iteration always goes through snapshots
//! ([`Document::element_children`], [`Document::elements_by_tag_name`]);
//! the real tree is only mutated through the explicit insert/append/detach
//! operations.

mod io;

pub use io::XmlError;

use std::fmt;

/// Stable handle to one node inside a [`Document`] arena.
///
/// Ids are never reused within a document; a detached node keeps its id and
/// can be re-inserted elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of one arena node.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Element {
        tag: String,
        /// Attribute name/value pairs in document order.
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    CData(String),
    /// Raw processing-instruction content (without `<?`/`?>`).
    ProcessingInstruction(String),
    DocType(String),
    /// Raw XML declaration content (without `<?`/`?>`).
    Declaration(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One XML document as an arena of nodes plus an ordered top-level list
/// (declaration, comments, the root element).
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    top: Vec<NodeId>,
    dirty: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            nodes: Vec::new(),
            top: Vec::new(),
            dirty: false,
        }
    }

    /// Parse a document from XML text.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        io::parse(xml)
    }

    /// Serialize the document back to XML text.
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        io::serialize(self)
    }

    /// Whether any mutating operation ran since the document was built.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ── Node construction ──

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    /// Create a detached XML declaration node (content without `<?`/`?>`).
    pub fn create_declaration(&mut self, content: &str) -> NodeId {
        self.alloc(NodeKind::Declaration(content.to_string()))
    }

    pub(crate) fn push_top(&mut self, id: NodeId) {
        self.top.push(id);
    }

    /// Parse-time append: no detach, no dirty tracking.
    pub(crate) fn append_raw(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Top-level nodes in document order (declaration, comments, root).
    pub fn top_nodes(&self) -> &[NodeId] {
        &self.top
    }

    // ── Accessors ──

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Element tag name, or `None` for non-element nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Re-derive an element's tag (the same structural kind can map to
    /// different concrete tags on the DSL side).
    pub fn set_tag(&mut self, id: NodeId, tag: &str) {
        if let NodeKind::Element { tag: t, .. } = &mut self.nodes[id.index()].kind {
            *t = tag.to_string();
            self.dirty = true;
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.index()].kind {
            if let Some(slot) = attrs.iter_mut().find(|(n, _)| n == name) {
                slot.1 = value.to_string();
            } else {
                attrs.push((name.to_string(), value.to_string()));
            }
            self.dirty = true;
        }
    }

    pub(crate) fn set_attrs(&mut self, id: NodeId, new_attrs: Vec<(String, String)>) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.index()].kind {
            *attrs = new_attrs;
        }
    }

    /// The document element (first top-level element).
    pub fn root_element(&self) -> Option<NodeId> {
        self.top
            .iter()
            .copied()
            .find(|&id| matches!(self.nodes[id.index()].kind, NodeKind::Element { .. }))
    }

    /// Snapshot of the element children of `id`, ignoring text and comment
    /// nodes.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.index()]
            .children
            .iter()
            .copied()
            .filter(|&c| matches!(self.nodes[c.index()].kind, NodeKind::Element { .. }))
            .collect()
    }

    /// First direct child element with the given tag.
    pub fn find_child_element(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.nodes[id.index()]
            .children
            .iter()
            .copied()
            .find(|&c| self.tag(c) == Some(tag))
    }

    /// All elements with the given tag across the whole document, in
    /// document order. This is the positional addressing scheme metadata
    /// records are resolved against.
    pub fn elements_by_tag_name(&self, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &id in &self.top {
            self.collect_by_tag(id, tag, &mut out);
        }
        out
    }

    fn collect_by_tag(&self, id: NodeId, tag: &str, out: &mut Vec<NodeId>) {
        if self.tag(id) == Some(tag) {
            out.push(id);
        }
        // Children are walked from a snapshot-free immutable borrow; callers
        // never mutate during this traversal.
        for &c in &self.nodes[id.index()].children {
            self.collect_by_tag(c, tag, out);
        }
    }

    /// Concatenated text of the direct text children of `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &c in &self.nodes[id.index()].children {
            if let NodeKind::Text(t) = &self.nodes[c.index()].kind {
                out.push_str(t);
            }
        }
        out
    }

    /// Replace the content of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let old: Vec<NodeId> = self.nodes[id.index()].children.clone();
        for c in old {
            self.nodes[c.index()].parent = None;
        }
        self.nodes[id.index()].children.clear();
        let t = self.create_text(text);
        self.nodes[t.index()].parent = Some(id);
        self.nodes[id.index()].children.push(t);
        self.dirty = true;
    }

    // ── Mutation ──

    /// Append `child` as the last child of `parent`. Detaches `child` from
    /// any previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        self.dirty = true;
    }

    /// Insert `child` as the first child of `parent`.
    pub fn insert_first(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.insert(0, child);
        self.dirty = true;
    }

    /// Insert `child` immediately before `reference` under `parent`. If
    /// `reference` is no longer a child of `parent` (it was detached after
    /// the caller captured it), falls back to appending at the tail.
    pub fn insert_before(&mut self, parent: NodeId, reference: NodeId, child: NodeId) {
        self.detach(child);
        let pos = self.nodes[parent.index()]
            .children
            .iter()
            .position(|&c| c == reference);
        self.nodes[child.index()].parent = Some(parent);
        match pos {
            Some(i) => self.nodes[parent.index()].children.insert(i, child),
            None => self.nodes[parent.index()].children.push(child),
        }
        self.dirty = true;
    }

    /// Remove `id` from its parent's child list. The node and its subtree
    /// stay alive in the arena and can be re-inserted.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(p) = self.nodes[id.index()].parent.take() {
            self.nodes[p.index()].children.retain(|&c| c != id);
            self.dirty = true;
        }
    }

    /// Deep-copy the subtree rooted at `id` into new detached nodes.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.index()].kind.clone();
        let children: Vec<NodeId> = self.nodes[id.index()].children.clone();
        let copy = self.alloc(kind);
        for c in children {
            let cc = self.clone_subtree(c);
            self.nodes[cc.index()].parent = Some(copy);
            self.nodes[copy.index()].children.push(cc);
        }
        copy
    }

    /// Extract the subtree rooted at `id` as a standalone fragment, for
    /// grafting into another document.
    pub fn subtree_fragment(&self, id: NodeId) -> Document {
        let mut frag = Document::new();
        let root = frag.copy_from(self, id);
        frag.top.push(root);
        frag
    }

    /// Deep-copy the root subtree of `fragment` into this arena; returns the
    /// new detached node.
    pub fn graft(&mut self, fragment: &Document) -> Option<NodeId> {
        let src_root = *fragment.top.first()?;
        let id = self.copy_from(fragment, src_root);
        Some(id)
    }

    fn copy_from(&mut self, src: &Document, src_id: NodeId) -> NodeId {
        let copy = self.alloc(src.nodes[src_id.index()].kind.clone());
        for &c in &src.nodes[src_id.index()].children {
            let cc = self.copy_from(src, c);
            self.nodes[cc.index()].parent = Some(copy);
            self.nodes[copy.index()].children.push(cc);
        }
        copy
    }
}
