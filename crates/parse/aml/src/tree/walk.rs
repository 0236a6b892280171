//! Depth-first traversal.
//!
//! The order is the serialization order: a node, then its fixed arguments in
//! slot order, then its variable arguments in list order, each subtree fully
//! before the next.

use alloc::vec::Vec;

use super::{AmlTree, NodeId};
use crate::AmlError;

impl AmlTree {
    /// Calls `visit` on every node of the subtree at `start`, in depth-first
    /// pre-order.
    ///
    /// The callback returns `Ok(true)` to continue or `Ok(false)` to stop the
    /// walk early. Returns `Ok(true)` if every node was visited, `Ok(false)`
    /// if the callback stopped it.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a stale `start`, and passes
    /// through the first error the callback returns.
    pub fn enum_tree<F>(&self, start: NodeId, mut visit: F) -> Result<bool, AmlError>
    where
        F: FnMut(&AmlTree, NodeId) -> Result<bool, AmlError>,
    {
        self.node(start)?;
        for id in self.iter_dfs(start) {
            if !visit(self, id)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Iterates the subtree at `start` in depth-first pre-order.
    ///
    /// A stale `start` yields nothing.
    #[must_use]
    pub fn iter_dfs(&self, start: NodeId) -> DfsIter<'_> {
        let stack = if self.get(start).is_some() {
            alloc::vec![start]
        } else {
            Vec::new()
        };
        DfsIter { tree: self, stack }
    }
}

/// Iterator returned by [`AmlTree::iter_dfs`].
pub struct DfsIter<'a> {
    tree: &'a AmlTree,
    stack: Vec<NodeId>,
}

impl Iterator for DfsIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.tree.get(id) {
            // Pushed in reverse so the first child pops first.
            if let Some(list) = node.var_args() {
                self.stack.extend(list.iter().rev());
            }
            if let Some(obj) = node.as_object() {
                self.stack.extend(obj.fixed_args.iter().rev().flatten());
            }
        }
        Some(id)
    }
}

impl AmlTree {
    /// Counts the nodes of the subtree at `start`, `start` included.
    #[must_use]
    pub fn subtree_len(&self, start: NodeId) -> usize {
        self.iter_dfs(start).count()
    }
}
