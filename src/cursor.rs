//! Ordered insertion cursor.
//!
//! One cursor per output collection. It computes, for every reconciled
//! element, the exact sibling to insert before (or "append"), preserving
//! authored order even though in-place modifications temporarily double up
//! nodes: until the deferred sweep runs, both the fresh clone and the
//! superseded original occupy the collection, so naive index arithmetic
//! over the live child list would drift.

use crate::xml::{Document, NodeId};

/// How the previous element's reconciliation ended; drives the advance
/// increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placed {
    /// A detached node was produced and inserted by the caller
    /// (create or copy): one real child was added.
    Detached,
    /// Modify-in-place: the clone went in directly and the original is
    /// still present, so two children are accounted for.
    InPlace,
    /// The element errored out and produced nothing.
    Skipped,
}

/// Cursor state scoped to one collection element.
#[derive(Debug)]
pub struct InsertionCursor {
    count: usize,
    insert_before: Option<NodeId>,
}

impl Default for InsertionCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl InsertionCursor {
    pub fn new() -> Self {
        InsertionCursor {
            count: 0,
            insert_before: None,
        }
    }

    /// Advance past the previous element's footprint, then re-read the live
    /// child list to find the sibling the next element must precede.
    pub fn advance(&mut self, doc: &Document, collection: NodeId, previous: Placed) {
        self.count += match previous {
            Placed::Detached => 1,
            Placed::InPlace => 2,
            Placed::Skipped => 0,
        };
        let children = doc.element_children(collection);
        self.insert_before = children.get(self.count).copied();
    }

    /// Place a detached node produced for the current element.
    ///
    /// `collection_is_new` marks a collection materialized this run (either
    /// synthesized or arrived inside a clone); the first element of such a
    /// collection goes to index 0, ahead of any ride-along clone children.
    pub fn place(
        &self,
        doc: &mut Document,
        collection: NodeId,
        collection_is_new: bool,
        is_first: bool,
        node: NodeId,
    ) {
        match self.insert_before {
            Some(reference) => doc.insert_before(collection, reference, node),
            None if is_first && collection_is_new => doc.insert_first(collection, node),
            None => doc.append_child(collection, node),
        }
    }

    #[cfg(test)]
    pub(crate) fn insert_before_ref(&self) -> Option<NodeId> {
        self.insert_before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection_doc() -> (Document, NodeId) {
        let mut doc = Document::parse("<PORTS/>").unwrap();
        let ports = doc.root_element().expect("root");
        (doc, ports)
    }

    /// Three consecutive new elements into an empty collection: the cursor
    /// always appends and the result holds all three in input order.
    #[test]
    fn new_elements_into_empty_collection_append_in_order() {
        let (mut doc, ports) = collection_doc();
        let mut cursor = InsertionCursor::new();
        let mut made = Vec::new();
        for i in 0..3 {
            if i > 0 {
                cursor.advance(&doc, ports, Placed::Detached);
            }
            assert_eq!(cursor.insert_before_ref(), None);
            let el = doc.create_element("P-PORT-PROTOTYPE");
            cursor.place(&mut doc, ports, true, i == 0, el);
            made.push(el);
        }
        assert_eq!(doc.element_children(ports), made);
    }

    /// After an in-place modification the collection momentarily holds both
    /// the clone and the original; the +2 advance steps over the pair.
    #[test]
    fn in_place_advance_steps_over_clone_and_original() {
        let mut doc =
            Document::parse("<PORTS><P-PORT-PROTOTYPE/><R-PORT-PROTOTYPE/></PORTS>").unwrap();
        let ports = doc.root_element().expect("root");
        let kids = doc.element_children(ports);
        let original = kids[0];
        let second = kids[1];

        // Simulate modify-in-place of the first child.
        let clone = doc.clone_subtree(original);
        doc.insert_before(ports, original, clone);

        let mut cursor = InsertionCursor::new();
        cursor.advance(&doc, ports, Placed::InPlace);
        // Children are now [clone, original, second]; count 2 lands on the
        // untouched second sibling.
        assert_eq!(cursor.insert_before_ref(), Some(second));

        let created = doc.create_element("P-PORT-PROTOTYPE");
        cursor.place(&mut doc, ports, false, false, created);
        assert_eq!(
            doc.element_children(ports),
            vec![clone, original, created, second]
        );
    }

    /// Skipped elements leave the cursor where it was.
    #[test]
    fn skipped_elements_do_not_advance() {
        let mut doc = Document::parse("<PORTS><P-PORT-PROTOTYPE/></PORTS>").unwrap();
        let ports = doc.root_element().expect("root");
        let existing = doc.element_children(ports)[0];

        let mut cursor = InsertionCursor::new();
        cursor.advance(&doc, ports, Placed::Skipped);
        assert_eq!(cursor.insert_before_ref(), Some(existing));

        let created = doc.create_element("R-PORT-PROTOTYPE");
        cursor.place(&mut doc, ports, false, false, created);
        assert_eq!(doc.element_children(ports), vec![created, existing]);
    }

    /// First element into a collection that arrived inside a clone goes to
    /// index 0, ahead of ride-along children.
    #[test]
    fn first_element_into_cloned_collection_prepends() {
        let mut doc = Document::parse("<PORTS><P-PORT-PROTOTYPE/></PORTS>").unwrap();
        let ports = doc.root_element().expect("root");
        let ride_along = doc.element_children(ports)[0];

        let cursor = InsertionCursor::new();
        let created = doc.create_element("P-PORT-PROTOTYPE");
        cursor.place(&mut doc, ports, true, true, created);
        assert_eq!(doc.element_children(ports), vec![created, ride_along]);
    }
}
