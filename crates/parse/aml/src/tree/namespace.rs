//! Namespace paths of tree nodes.
//!
//! A namespace node's absolute path is found by walking up the tree: every
//! scope-opening ancestor (`Scope`, `Device`, `Method`, ...) contributes its
//! name, each applied relative to the path built so far, and the node's own
//! name is applied last.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::{AmlTree, NodeId, NodeKind};
use crate::opcode::OpAttributes;
use crate::path::AmlPath;
use crate::{AmlError, namestring};

impl AmlTree {
    /// Returns the AML NameString a namespace node defines.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not a namespace
    /// object or its name argument is missing.
    pub fn node_name(&self, id: NodeId) -> Result<&[u8], AmlError> {
        let obj = self.node(id)?.as_object().ok_or(AmlError::InvalidArgument)?;
        if !obj.encoding.is_namespace_node() {
            return Err(AmlError::InvalidArgument);
        }
        let name = obj.fixed_args[usize::from(obj.encoding.name_index)].ok_or(AmlError::InvalidArgument)?;
        self.data_node_bytes(name)
    }

    /// Resolves the absolute namespace path of a node.
    ///
    /// The root resolves to `\`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is neither the root nor
    /// a namespace object, or if a name climbs above the root.
    pub fn absolute_path(&self, id: NodeId) -> Result<AmlPath, AmlError> {
        match &self.node(id)?.kind {
            NodeKind::Root(_) => return Ok(AmlPath::new()),
            NodeKind::Object(obj) if obj.encoding.is_namespace_node() => {}
            _ => return Err(AmlError::InvalidArgument),
        }

        let mut chain = Vec::new();
        chain.try_reserve(8)?;
        chain.push(id);
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            let opens_scope = self
                .object_encoding(ancestor)
                .is_ok_and(|enc| enc.attributes.contains(OpAttributes::OPENS_SCOPE));
            if opens_scope {
                chain.try_reserve(1)?;
                chain.push(ancestor);
            }
            current = self.parent(ancestor);
        }

        let mut path = AmlPath::new();
        for &scope in chain.iter().rev() {
            path.apply(self.node_name(scope)?)?;
        }
        Ok(path)
    }

    /// Returns the absolute ASL path of a node, e.g. `\_SB_.PCI0.LPC_`.
    ///
    /// Segments keep their `_` padding; the root yields `\`.
    ///
    /// # Errors
    ///
    /// Same as [`AmlTree::absolute_path`].
    pub fn asl_path_name(&self, id: NodeId) -> Result<String, AmlError> {
        Ok(self.absolute_path(id)?.to_string())
    }

    /// Finds the first namespace node below `start` whose absolute path is
    /// `asl_path`.
    ///
    /// `asl_path` is resolved against the root, so `_SB.PCI0` and
    /// `\_SB.PCI0` name the same node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `asl_path` is malformed.
    pub fn find_node(&self, start: NodeId, asl_path: &str) -> Result<Option<NodeId>, AmlError> {
        let mut target = AmlPath::new();
        target.apply(&namestring::asl_to_aml(asl_path)?)?;

        let mut found = None;
        self.enum_tree(start, |tree, id| {
            let is_namespace = tree
                .object_encoding(id)
                .is_ok_and(|enc| enc.is_namespace_node());
            if is_namespace && tree.absolute_path(id).is_ok_and(|p| p == target) {
                found = Some(id);
                return Ok(false);
            }
            Ok(true)
        })?;
        Ok(found)
    }
}
