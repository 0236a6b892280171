//! Moving around the tree.
//!
//! All accessors return `None` for stale ids and at list boundaries rather
//! than an error, so they compose with `?` inside `Option` chains.

use super::{AmlTree, Node, NodeId, NodeKind};

impl AmlTree {
    /// Returns the parent of a node, or `None` for the root and for detached
    /// nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Returns the fixed argument at `index` of an object node.
    #[must_use]
    pub fn fixed_argument(&self, id: NodeId, index: usize) -> Option<NodeId> {
        let obj = self.get(id)?.as_object()?;
        obj.fixed_args.get(index).copied().flatten()
    }

    /// Returns the variable argument list of a root or object node.
    ///
    /// Nodes without a variable argument list yield an empty slice.
    #[must_use]
    pub fn variable_arguments(&self, id: NodeId) -> &[NodeId] {
        self.get(id)
            .and_then(Node::var_args)
            .map_or(&[], |list| list.as_slice())
    }

    /// Returns the first variable argument of `parent`.
    #[must_use]
    pub fn first_variable_argument(&self, parent: NodeId) -> Option<NodeId> {
        self.variable_arguments(parent).first().copied()
    }

    /// Returns the last variable argument of `parent`.
    #[must_use]
    pub fn last_variable_argument(&self, parent: NodeId) -> Option<NodeId> {
        self.variable_arguments(parent).last().copied()
    }

    /// Returns the parent of `id` and its index within that parent's variable
    /// argument list.
    ///
    /// `None` if `id` is detached or one of its parent's fixed arguments.
    #[must_use]
    pub fn var_arg_position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.variable_arguments(parent).iter().position(|&n| n == id)?;
        Some((parent, index))
    }

    /// Returns `true` if `id` occupies one of its parent's fixed argument
    /// slots.
    #[must_use]
    pub fn is_fixed_argument(&self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        match self.get(parent).map(|n| &n.kind) {
            Some(NodeKind::Object(obj)) => obj.fixed_args.contains(&Some(id)),
            _ => false,
        }
    }

    /// Returns the variable argument following `id` in its parent's list.
    #[must_use]
    pub fn sibling_variable_argument(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.var_arg_position(id)?;
        self.variable_arguments(parent).get(index + 1).copied()
    }

    /// Steps forward through the variable arguments of `parent`.
    ///
    /// With `current == None` this yields the first variable argument;
    /// otherwise the one after `current`, which must belong to `parent`.
    #[must_use]
    pub fn next_variable_argument(&self, parent: NodeId, current: Option<NodeId>) -> Option<NodeId> {
        let list = self.variable_arguments(parent);
        match current {
            None => list.first().copied(),
            Some(cur) => {
                let index = list.iter().position(|&n| n == cur)?;
                list.get(index + 1).copied()
            }
        }
    }

    /// Steps backward through the variable arguments of `parent`.
    ///
    /// With `current == None` this yields the last variable argument;
    /// otherwise the one before `current`, which must belong to `parent`.
    #[must_use]
    pub fn previous_variable_argument(&self, parent: NodeId, current: Option<NodeId>) -> Option<NodeId> {
        let list = self.variable_arguments(parent);
        match current {
            None => list.last().copied(),
            Some(cur) => {
                let index = list.iter().position(|&n| n == cur)?;
                index.checked_sub(1).and_then(|i| list.get(i)).copied()
            }
        }
    }

    /// Returns `true` if `ancestor` is `id` or lies on the parent chain of
    /// `id`.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use crate::{AmlTree, DataType, OpCode, SdtHeader};

    fn scope_with_three(tree: &mut AmlTree) -> (crate::NodeId, [crate::NodeId; 3]) {
        let name = tree.create_data(DataType::NameString, b"_SB_").unwrap();
        let scope = tree.create_object(OpCode::SCOPE, &[name]).unwrap();
        let mut kids = Vec::new();
        for seg in [b"AAAA", b"BBBB", b"CCCC"] {
            let n = tree.create_data(DataType::NameString, seg).unwrap();
            let dev = tree.create_object(OpCode::DEVICE, &[n]).unwrap();
            tree.var_list_add_tail(scope, dev).unwrap();
            kids.push(dev);
        }
        (scope, [kids[0], kids[1], kids[2]])
    }

    #[test]
    fn forward_and_backward() {
        let mut tree = AmlTree::new(SdtHeader::default());
        let (scope, [a, b, c]) = scope_with_three(&mut tree);

        assert_eq!(tree.next_variable_argument(scope, None), Some(a));
        assert_eq!(tree.next_variable_argument(scope, Some(a)), Some(b));
        assert_eq!(tree.next_variable_argument(scope, Some(c)), None);
        assert_eq!(tree.previous_variable_argument(scope, None), Some(c));
        assert_eq!(tree.previous_variable_argument(scope, Some(a)), None);
        assert_eq!(tree.sibling_variable_argument(b), Some(c));
        assert_eq!(tree.sibling_variable_argument(c), None);
    }

    #[test]
    fn parent_and_fixed_arguments() {
        let mut tree = AmlTree::new(SdtHeader::default());
        let (scope, [a, ..]) = scope_with_three(&mut tree);
        let name = tree.fixed_argument(scope, 0).unwrap();

        assert_eq!(tree.parent(a), Some(scope));
        assert_eq!(tree.parent(name), Some(scope));
        assert!(tree.is_fixed_argument(name));
        assert!(!tree.is_fixed_argument(a));
        assert_eq!(tree.fixed_argument(scope, 1), None);
        assert_eq!(tree.var_arg_position(name), None);
        assert_eq!(tree.var_arg_position(a), Some((scope, 0)));
        assert_eq!(tree.parent(tree.root()), None);
        assert!(tree.is_ancestor_or_self(scope, name));
        assert!(!tree.is_ancestor_or_self(a, scope));
    }

    #[test]
    fn foreign_current_yields_none() {
        let mut tree = AmlTree::new(SdtHeader::default());
        let (scope, [a, ..]) = scope_with_three(&mut tree);
        assert_eq!(tree.next_variable_argument(a, Some(scope)), None);
        assert!(tree.variable_arguments(tree.fixed_argument(scope, 0).unwrap()).is_empty());
    }
}
