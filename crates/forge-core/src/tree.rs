//! Parent/child associations between built objects
//!
//! Used to order persistence so every object is saved after the objects
//! it references.

use forge_model::{ObjectId, ObjectRef};
use std::collections::HashMap;

/// Parent → children associations across one build tree
///
/// Identity is by allocation ([`ObjectRef`] equality), never by value.
#[derive(Debug, Default, Clone)]
pub struct ObjectTree {
    children: HashMap<ObjectId, Vec<ObjectRef>>,
}

impl ObjectTree {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `child` to the children of `parent`
    pub fn add_node(&mut self, parent: &ObjectRef, child: ObjectRef) {
        self.children.entry(parent.id()).or_default().push(child);
    }

    /// Children of `parent` in insertion order
    #[must_use]
    pub fn children(&self, parent: &ObjectRef) -> &[ObjectRef] {
        self.children.get(&parent.id()).map_or(&[], Vec::as_slice)
    }

    /// Number of parents with at least one child
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Check if no association was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Visit every descendant of `root` before `root` itself
    ///
    /// Children are visited in insertion order, each subtree completely
    /// before the next sibling.
    pub fn foreach_depth_first_post_order(&self, root: &ObjectRef, visit: &mut impl FnMut(&ObjectRef)) {
        for child in self.children(root) {
            self.foreach_depth_first_post_order(child, visit);
        }
        visit(root);
    }

    /// Post-order listing from `root`
    #[must_use]
    pub fn post_order(&self, root: &ObjectRef) -> Vec<ObjectRef> {
        let mut order = Vec::new();
        self.foreach_depth_first_post_order(root, &mut |node| order.push(node.clone()));
        order
    }
}
