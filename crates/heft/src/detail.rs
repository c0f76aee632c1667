//! Detailed-mode call tree.

use std::mem;

/// One node of the detailed size tree: an entered heap object, its total
/// contribution (own bytes plus everything first reached through it), and
/// the objects entered from it, in traversal order.
///
/// The address is an identity only; it is never dereferenced and does not
/// keep the object alive.
#[derive(Debug, Clone)]
pub struct SizeNode {
    address: *const (),
    total: usize,
    children: Vec<SizeNode>,
}

impl SizeNode {
    fn new(address: *const ()) -> SizeNode {
        SizeNode {
            address,
            total: 0,
            children: Vec::new(),
        }
    }

    pub fn address(&self) -> *const () {
        self.address
    }

    /// Total bytes attributed to this object and its subtree.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn children(&self) -> &[SizeNode] {
        &self.children
    }
}

/// Builds the tree alongside the traversal: entering a reference suspends
/// the in-progress node on a stack, completing it records the total and
/// attaches it to the node below. The queried value is the root and is only
/// completed by [`DetailBuilder::finish`].
pub(crate) struct DetailBuilder {
    stack: Vec<SizeNode>,
    current: SizeNode,
}

impl DetailBuilder {
    pub(crate) fn new(root: *const ()) -> DetailBuilder {
        DetailBuilder {
            stack: Vec::new(),
            current: SizeNode::new(root),
        }
    }

    pub(crate) fn enter(&mut self, address: *const ()) {
        let node = SizeNode::new(address);
        self.stack.push(mem::replace(&mut self.current, node));
    }

    pub(crate) fn exit(&mut self, total: usize) {
        self.current.total = total;
        if let Some(parent) = self.stack.pop() {
            let done = mem::replace(&mut self.current, parent);
            self.current.children.push(done);
        }
    }

    pub(crate) fn finish(mut self, total: usize) -> SizeNode {
        self.current.total = total;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_attaches_children_in_order() {
        let root = 0x10 as *const ();
        let mut builder = DetailBuilder::new(root);

        builder.enter(0x20 as *const ());
        builder.exit(8);
        builder.enter(0x30 as *const ());
        builder.enter(0x40 as *const ());
        builder.exit(16);
        builder.exit(40);

        let tree = builder.finish(64);
        assert_eq!(tree.address(), root);
        assert_eq!(tree.total(), 64);
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.children()[0].total(), 8);
        assert_eq!(tree.children()[1].total(), 40);
        assert_eq!(tree.children()[1].children()[0].total(), 16);
    }
}
