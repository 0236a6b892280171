//! The AML node tree.
//!
//! All nodes of a definition block live in one [`AmlTree`] arena and are
//! addressed by [`NodeId`]. Every node except the root has at most one
//! parent; the parent link is a plain id and never owns anything. A node is
//! either one of its parent's fixed arguments (slot decided by the parent's
//! opcode) or a member of its parent's variable argument list.
//!
//! Detached nodes (created but not yet attached, or removed from a list) stay
//! in the arena until [`AmlTree::delete_tree`] frees them or the tree is
//! dropped.

pub mod mutate;
pub mod namespace;
pub mod nav;
pub mod walk;

use alloc::vec::Vec;

use crate::opcode::{ArgFormat, OpCode, OpEncoding};
use crate::resource::{self, AcpiResource, ResourceDescriptorId};
use crate::sdt::SdtHeader;
use crate::{AmlError, MAX_FIXED_ARGS, namestring, pkglen};

/// Handle to a node in an [`AmlTree`].
///
/// Ids carry a generation, so a handle to a deleted node is never confused
/// with a node later allocated in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// The table root.
    Root,
    /// An opcode.
    Object,
    /// A data payload.
    Data,
    /// The id does not name a live node of this tree.
    Unknown,
}

/// Kind of payload held by a data node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// An AML NameString.
    NameString,
    /// A NUL-terminated ASCII string; the terminator is part of the payload.
    String,
    /// A little-endian integer of 1, 2, 4 or 8 bytes.
    UInt,
    /// Uninterpreted bytes (buffer contents, field lists).
    Raw,
    /// A single resource descriptor.
    ResourceData,
}

/// Summary of an object node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    /// First opcode byte.
    pub op_code: u8,
    /// Second opcode byte for `ExtOpPrefix` opcodes, 0 otherwise.
    pub sub_op_code: u8,
    /// PkgLength value, 0 if the opcode has none.
    pub pkg_len: u32,
    /// The opcode defines a name in the ACPI namespace.
    pub is_namespace_node: bool,
}

pub(crate) struct RootNode {
    pub(crate) header: SdtHeader,
    pub(crate) var_args: Vec<NodeId>,
}

pub(crate) struct ObjectNode {
    pub(crate) encoding: &'static OpEncoding,
    pub(crate) pkg_len: u32,
    pub(crate) fixed_args: [Option<NodeId>; MAX_FIXED_ARGS],
    pub(crate) var_args: Vec<NodeId>,
}

pub(crate) struct DataNode {
    pub(crate) data_type: DataType,
    pub(crate) descriptor_id: Option<ResourceDescriptorId>,
    pub(crate) buffer: Vec<u8>,
}

pub(crate) enum NodeKind {
    Root(RootNode),
    Object(ObjectNode),
    Data(DataNode),
}

pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn var_args(&self) -> Option<&Vec<NodeId>> {
        match &self.kind {
            NodeKind::Root(root) => Some(&root.var_args),
            NodeKind::Object(obj) if obj.encoding.has_var_args() => Some(&obj.var_args),
            _ => None,
        }
    }

    pub(crate) fn var_args_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.kind {
            NodeKind::Root(root) => Some(&mut root.var_args),
            NodeKind::Object(obj) if obj.encoding.has_var_args() => Some(&mut obj.var_args),
            _ => None,
        }
    }

    pub(crate) fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub(crate) fn as_data(&self) -> Option<&DataNode> {
        match &self.kind {
            NodeKind::Data(data) => Some(data),
            _ => None,
        }
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// An AML definition block held as a tree.
pub struct AmlTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl AmlTree {
    /// Creates a tree with an empty body and the given header.
    #[must_use]
    pub fn new(header: SdtHeader) -> Self {
        let root_node = Node {
            parent: None,
            kind: NodeKind::Root(RootNode {
                header,
                var_args: Vec::new(),
            }),
        };
        Self {
            slots: alloc::vec![Slot {
                generation: 0,
                node: Some(root_node),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        }
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, detached ones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, AmlError> {
        self.get(id).ok_or(AmlError::InvalidArgument)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, AmlError> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .ok_or(AmlError::InvalidArgument)?;
        if slot.generation != id.generation {
            return Err(AmlError::InvalidArgument);
        }
        slot.node.as_mut().ok_or(AmlError::InvalidArgument)
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> Result<NodeId, AmlError> {
        let node = Node { parent: None, kind };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return Ok(NodeId {
                index,
                generation: slot.generation,
            });
        }
        self.slots.try_reserve(1)?;
        let index = u32::try_from(self.slots.len()).map_err(|_| AmlError::OutOfMemory)?;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        Ok(NodeId {
            index,
            generation: 0,
        })
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }

    // ─── Node model queries ────────────────────────────────────────────────

    /// Returns the kind of `id`, or [`NodeType::Unknown`] for a stale id.
    #[must_use]
    pub fn node_type(&self, id: NodeId) -> NodeType {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Root(_)) => NodeType::Root,
            Some(NodeKind::Object(_)) => NodeType::Object,
            Some(NodeKind::Data(_)) => NodeType::Data,
            None => NodeType::Unknown,
        }
    }

    /// Returns a copy of the root's table header.
    ///
    /// Length and checksum are the values parsed or set at creation;
    /// serialization computes fresh ones without storing them.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not a root node.
    pub fn root_node_info(&self, id: NodeId) -> Result<SdtHeader, AmlError> {
        match &self.node(id)?.kind {
            NodeKind::Root(root) => Ok(root.header),
            _ => Err(AmlError::InvalidArgument),
        }
    }

    /// Returns the opcode, PkgLength and namespace flag of an object node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not an object node.
    pub fn object_node_info(&self, id: NodeId) -> Result<ObjectInfo, AmlError> {
        let obj = self.node(id)?.as_object().ok_or(AmlError::InvalidArgument)?;
        Ok(ObjectInfo {
            op_code: obj.encoding.op_code.op,
            sub_op_code: obj.encoding.op_code.sub_op,
            pkg_len: obj.pkg_len,
            is_namespace_node: obj.encoding.is_namespace_node(),
        })
    }

    /// Returns the opcode encoding of an object node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not an object node.
    pub fn object_encoding(&self, id: NodeId) -> Result<&'static OpEncoding, AmlError> {
        let obj = self.node(id)?.as_object().ok_or(AmlError::InvalidArgument)?;
        Ok(obj.encoding)
    }

    /// Number of fixed arguments of an object node; 0 for any other node.
    #[must_use]
    pub fn fixed_argument_count(&self, id: NodeId) -> u8 {
        self.get(id)
            .and_then(Node::as_object)
            .map_or(0, |obj| obj.encoding.fixed_arg_count())
    }

    /// Returns the payload kind of a data node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not a data node.
    pub fn node_data_type(&self, id: NodeId) -> Result<DataType, AmlError> {
        let data = self.node(id)?.as_data().ok_or(AmlError::InvalidArgument)?;
        Ok(data.data_type)
    }

    /// Returns the descriptor type of a resource data node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] unless `id` is a data node of
    /// type [`DataType::ResourceData`].
    pub fn resource_data_type(&self, id: NodeId) -> Result<ResourceDescriptorId, AmlError> {
        let data = self.node(id)?.as_data().ok_or(AmlError::InvalidArgument)?;
        data.descriptor_id.ok_or(AmlError::InvalidArgument)
    }

    /// Decodes the descriptors of a resource template `Buffer`, skipping
    /// kinds [`AcpiResource`] does not model.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `buffer` is not a `Buffer`
    /// object, or [`AmlError::OutOfMemory`].
    pub fn template_resources(&self, buffer: NodeId) -> Result<Vec<AcpiResource>, AmlError> {
        if self.object_encoding(buffer)?.op_code != OpCode::BUFFER {
            return Err(AmlError::InvalidArgument);
        }
        let mut out = Vec::new();
        for &item in self.variable_arguments(buffer) {
            let Some(data) = self.get(item).and_then(Node::as_data) else {
                continue;
            };
            if data.descriptor_id.is_none() {
                continue;
            }
            if let Some(resource) = resource::decode_descriptor(&data.buffer) {
                out.try_reserve(1)?;
                out.push(resource);
            }
        }
        Ok(out)
    }

    /// Copies the payload of a data node into `out`.
    ///
    /// Returns the payload size. When `out` is shorter than the payload,
    /// nothing is copied and [`AmlError::BufferTooSmall`] reports the size
    /// needed, so a caller can size a buffer with an empty slice first.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not a data node, or
    /// [`AmlError::BufferTooSmall`] as described above.
    pub fn data_node_buffer(&self, id: NodeId, out: &mut [u8]) -> Result<usize, AmlError> {
        let bytes = self.data_node_bytes(id)?;
        let dst = out.get_mut(..bytes.len()).ok_or(AmlError::BufferTooSmall {
            required: bytes.len(),
        })?;
        dst.copy_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Borrows the payload of a data node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not a data node.
    pub fn data_node_bytes(&self, id: NodeId) -> Result<&[u8], AmlError> {
        let data = self.node(id)?.as_data().ok_or(AmlError::InvalidArgument)?;
        Ok(&data.buffer)
    }

    /// Reads the value of an integer object (`Zero`, `One`, `Ones` or one of
    /// the integer prefixes).
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not an integer object.
    pub fn integer_value(&self, id: NodeId) -> Result<u64, AmlError> {
        let obj = self.node(id)?.as_object().ok_or(AmlError::InvalidArgument)?;
        match obj.encoding.op_code {
            OpCode::ZERO => Ok(0),
            OpCode::ONE => Ok(1),
            OpCode::ONES => Ok(u64::MAX),
            op if op.is_updatable_integer() => {
                let arg = obj.fixed_args[0].ok_or(AmlError::InvalidArgument)?;
                let bytes = self.data_node_bytes(arg)?;
                let mut raw = [0u8; 8];
                raw.get_mut(..bytes.len())
                    .ok_or(AmlError::InvalidArgument)?
                    .copy_from_slice(bytes);
                Ok(u64::from_le_bytes(raw))
            }
            _ => Err(AmlError::InvalidArgument),
        }
    }

    // ─── Construction ──────────────────────────────────────────────────────

    /// Creates a detached data node.
    ///
    /// The payload must be well-formed for its type: a complete AML
    /// NameString, a NUL-terminated string, a 1/2/4/8-byte integer, or
    /// exactly one resource descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a malformed payload, or
    /// [`AmlError::OutOfMemory`].
    pub fn create_data(&mut self, data_type: DataType, bytes: &[u8]) -> Result<NodeId, AmlError> {
        let descriptor_id = validate_payload(data_type, bytes)?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(bytes.len())?;
        buffer.extend_from_slice(bytes);
        self.alloc(NodeKind::Data(DataNode {
            data_type,
            descriptor_id,
            buffer,
        }))
    }

    /// Creates a detached object node from its opcode and fixed arguments.
    ///
    /// `fixed_args` must hold exactly the opcode's fixed arguments, each a
    /// distinct detached node matching the argument's format.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for an unknown opcode or an
    /// unsuitable argument, or [`AmlError::OutOfMemory`].
    pub fn create_object(&mut self, op_code: OpCode, fixed_args: &[NodeId]) -> Result<NodeId, AmlError> {
        let encoding = OpEncoding::lookup(op_code).ok_or(AmlError::InvalidArgument)?;
        if fixed_args.len() != encoding.formats.len() {
            return Err(AmlError::InvalidArgument);
        }
        for (i, (&arg, &format)) in fixed_args.iter().zip(encoding.formats).enumerate() {
            if fixed_args[..i].contains(&arg) {
                return Err(AmlError::InvalidArgument);
            }
            let node = self.node(arg)?;
            if node.parent.is_some() || !self.matches_format(node, format) {
                return Err(AmlError::InvalidArgument);
            }
        }

        let id = self.alloc_object(encoding)?;
        for (index, &arg) in fixed_args.iter().enumerate() {
            self.link_fixed_arg(id, index, arg)?;
        }
        self.refresh_pkg_len(id);
        Ok(id)
    }

    fn matches_format(&self, node: &Node, format: ArgFormat) -> bool {
        match (&node.kind, format) {
            (NodeKind::Data(data), ArgFormat::NameString | ArgFormat::Object) => {
                data.data_type == DataType::NameString
            }
            (NodeKind::Data(data), ArgFormat::String) => data.data_type == DataType::String,
            (NodeKind::Data(data), fmt) => {
                data.data_type == DataType::UInt && fmt.int_size() == Some(data.buffer.len())
            }
            (NodeKind::Object(_), ArgFormat::Object) => true,
            _ => false,
        }
    }

    pub(crate) fn alloc_object(&mut self, encoding: &'static OpEncoding) -> Result<NodeId, AmlError> {
        self.alloc(NodeKind::Object(ObjectNode {
            encoding,
            pkg_len: 0,
            fixed_args: [None; MAX_FIXED_ARGS],
            var_args: Vec::new(),
        }))
    }

    /// Places a detached node into a fixed argument slot.
    pub(crate) fn link_fixed_arg(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), AmlError> {
        match &mut self.node_mut(parent)?.kind {
            NodeKind::Object(obj) if index < obj.encoding.formats.len() => {
                obj.fixed_args[index] = Some(child);
            }
            _ => return Err(AmlError::InvalidArgument),
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Appends a detached node to a variable argument list without any
    /// content checks or size propagation.
    pub(crate) fn link_var_arg(&mut self, parent: NodeId, child: NodeId) -> Result<(), AmlError> {
        let list = self
            .node_mut(parent)?
            .var_args_mut()
            .ok_or(AmlError::InvalidArgument)?;
        list.try_reserve(1)?;
        list.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Recomputes the cached PkgLength of an object from its content.
    pub(crate) fn refresh_pkg_len(&mut self, id: NodeId) {
        let Some(obj) = self.get(id).and_then(Node::as_object) else {
            return;
        };
        if !obj.encoding.has_pkg_length() {
            return;
        }
        let body = self.object_body_size(obj);
        let value = pkglen::value_for_body(body).unwrap_or(pkglen::MAX_PKG_LENGTH);
        if let Ok(Node {
            kind: NodeKind::Object(obj),
            ..
        }) = self.node_mut(id)
        {
            obj.pkg_len = u32::try_from(value).unwrap_or(u32::MAX);
        }
    }

    /// Makes a detached copy of a single node.
    ///
    /// Object nodes keep their opcode but get empty fixed argument slots and
    /// an empty variable argument list; data nodes copy their payload; a root
    /// copy keeps the header.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a stale id, or
    /// [`AmlError::OutOfMemory`].
    pub fn clone_node(&mut self, id: NodeId) -> Result<NodeId, AmlError> {
        let kind = match &self.node(id)?.kind {
            NodeKind::Root(root) => NodeKind::Root(RootNode {
                header: root.header,
                var_args: Vec::new(),
            }),
            NodeKind::Object(obj) => NodeKind::Object(ObjectNode {
                encoding: obj.encoding,
                pkg_len: 0,
                fixed_args: [None; MAX_FIXED_ARGS],
                var_args: Vec::new(),
            }),
            NodeKind::Data(data) => {
                let mut buffer = Vec::new();
                buffer.try_reserve_exact(data.buffer.len())?;
                buffer.extend_from_slice(&data.buffer);
                NodeKind::Data(DataNode {
                    data_type: data.data_type,
                    descriptor_id: data.descriptor_id,
                    buffer,
                })
            }
        };
        let copy = self.alloc(kind)?;
        self.refresh_pkg_len(copy);
        Ok(copy)
    }

    /// Makes a detached deep copy of a subtree.
    ///
    /// The root node cannot be deep-copied into its own arena.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a stale id or the root, or
    /// [`AmlError::OutOfMemory`]. On failure nothing stays allocated.
    pub fn clone_tree(&mut self, id: NodeId) -> Result<NodeId, AmlError> {
        if matches!(self.node(id)?.kind, NodeKind::Root(_)) {
            return Err(AmlError::InvalidArgument);
        }
        let copy = self.clone_node(id)?;
        if let Err(err) = self.clone_children(id, copy) {
            self.free_subtree(copy);
            return Err(err);
        }
        Ok(copy)
    }

    fn clone_children(&mut self, src: NodeId, dst: NodeId) -> Result<(), AmlError> {
        let (fixed, var) = match self.node(src)?.as_object() {
            Some(obj) => (obj.fixed_args, obj.var_args.clone()),
            None => return Ok(()),
        };
        for (index, arg) in fixed.iter().enumerate() {
            if let Some(arg) = *arg {
                let copy = self.clone_node(arg)?;
                self.link_fixed_arg(dst, index, copy)?;
                self.clone_children(arg, copy)?;
            }
        }
        for arg in var {
            let copy = self.clone_node(arg)?;
            self.link_var_arg(dst, copy)?;
            self.clone_children(arg, copy)?;
        }
        Ok(())
    }

    /// Frees a detached subtree.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is stale, still attached
    /// to a parent, or the tree root.
    pub fn delete_tree(&mut self, id: NodeId) -> Result<(), AmlError> {
        let node = self.node(id)?;
        if node.parent.is_some() || id == self.root {
            return Err(AmlError::InvalidArgument);
        }
        self.free_subtree(id);
        Ok(())
    }

    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let mut stack = alloc::vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                if let Some(obj) = node.as_object() {
                    stack.extend(obj.fixed_args.iter().flatten());
                }
                if let Some(list) = node.var_args() {
                    stack.extend(list.iter());
                }
            }
            self.release(current);
        }
    }
}

/// Checks a data payload against its type and returns the descriptor id for
/// resource data.
pub(crate) fn validate_payload(
    data_type: DataType,
    bytes: &[u8],
) -> Result<Option<ResourceDescriptorId>, AmlError> {
    match data_type {
        DataType::NameString => {
            if namestring::aml_name_string_size(bytes)? != bytes.len() {
                return Err(AmlError::InvalidArgument);
            }
        }
        DataType::String => {
            if bytes.iter().position(|&b| b == 0) != Some(bytes.len().wrapping_sub(1)) {
                return Err(AmlError::InvalidArgument);
            }
        }
        DataType::UInt => {
            if !matches!(bytes.len(), 1 | 2 | 4 | 8) {
                return Err(AmlError::InvalidArgument);
            }
        }
        DataType::Raw => {}
        DataType::ResourceData => return resource::validate_descriptor(bytes).map(Some),
    }
    Ok(None)
}
