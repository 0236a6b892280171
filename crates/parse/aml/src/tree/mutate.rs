//! Tree mutation.
//!
//! Every operation either applies completely or leaves the tree untouched.
//! After a successful change the cached PkgLength of every ancestor is
//! recomputed, and any resource template `Buffer` on the way has its size
//! argument rewritten to match its descriptors.

use log::{trace, warn};

use super::{AmlTree, DataType, NodeId, NodeKind, validate_payload};
use crate::opcode::{ArgFormat, OpAttributes, OpCode, OpEncoding};
use crate::resource::ResourceDescriptorId;
use crate::sdt::SdtHeader;
use crate::AmlError;

/// Where a new node goes relative to an existing list.
#[derive(Clone, Copy)]
enum Placement {
    Head,
    Tail,
    Before(usize),
    After(usize),
}

impl AmlTree {
    /// Detaches `id` from its parent's variable argument list.
    ///
    /// The node and its subtree stay allocated; the caller can re-insert it
    /// elsewhere or free it with [`AmlTree::delete_tree`].
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is detached, is the
    /// root, or is a fixed argument.
    pub fn remove_from_var_arg_list(&mut self, id: NodeId) -> Result<(), AmlError> {
        let (parent, index) = self.var_arg_position(id).ok_or(AmlError::InvalidArgument)?;
        if let Some(list) = self.node_mut(parent)?.var_args_mut() {
            list.remove(index);
        }
        self.node_mut(id)?.parent = None;
        self.propagate_sizes(parent);
        Ok(())
    }

    /// Inserts `new` at the front of the variable argument list of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `new` is attached, is an
    /// ancestor of `parent`, or is not allowed in `parent`'s list.
    pub fn var_list_add_head(&mut self, parent: NodeId, new: NodeId) -> Result<(), AmlError> {
        self.insert_var_arg(parent, new, Placement::Head)
    }

    /// Appends `new` to the variable argument list of `parent`.
    ///
    /// # Errors
    ///
    /// Same as [`AmlTree::var_list_add_head`].
    pub fn var_list_add_tail(&mut self, parent: NodeId, new: NodeId) -> Result<(), AmlError> {
        self.insert_var_arg(parent, new, Placement::Tail)
    }

    /// Inserts `new` just before `node` in its parent's variable argument
    /// list.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `node` is not in a variable
    /// argument list, or for the reasons of [`AmlTree::var_list_add_head`].
    pub fn var_list_add_before(&mut self, node: NodeId, new: NodeId) -> Result<(), AmlError> {
        let (parent, index) = self.var_arg_position(node).ok_or(AmlError::InvalidArgument)?;
        self.insert_var_arg(parent, new, Placement::Before(index))
    }

    /// Inserts `new` just after `node` in its parent's variable argument
    /// list.
    ///
    /// # Errors
    ///
    /// Same as [`AmlTree::var_list_add_before`].
    pub fn var_list_add_after(&mut self, node: NodeId, new: NodeId) -> Result<(), AmlError> {
        let (parent, index) = self.var_arg_position(node).ok_or(AmlError::InvalidArgument)?;
        self.insert_var_arg(parent, new, Placement::After(index))
    }

    /// Puts `new` in the place `old` holds in its parent's variable argument
    /// list. `old` ends up detached.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `old` is not in a variable
    /// argument list, or for the reasons of [`AmlTree::var_list_add_head`].
    pub fn replace_variable_argument(&mut self, old: NodeId, new: NodeId) -> Result<(), AmlError> {
        let (parent, index) = self.var_arg_position(old).ok_or(AmlError::InvalidArgument)?;
        if old == new {
            return Err(AmlError::InvalidArgument);
        }
        self.check_insertable(parent, new)?;
        if let Some(list) = self.node_mut(parent)?.var_args_mut() {
            list[index] = new;
        }
        self.node_mut(old)?.parent = None;
        self.node_mut(new)?.parent = Some(parent);
        self.propagate_sizes(parent);
        Ok(())
    }

    fn insert_var_arg(&mut self, parent: NodeId, new: NodeId, placement: Placement) -> Result<(), AmlError> {
        self.check_insertable(parent, new)?;
        let list = self
            .node_mut(parent)?
            .var_args_mut()
            .ok_or(AmlError::InvalidArgument)?;
        list.try_reserve(1)?;
        let index = match placement {
            Placement::Head => 0,
            Placement::Tail => list.len(),
            Placement::Before(i) => i,
            Placement::After(i) => i + 1,
        };
        list.insert(index, new);
        self.node_mut(new)?.parent = Some(parent);
        self.propagate_sizes(parent);
        Ok(())
    }

    /// Checks that `new` may join the variable argument list of `parent`.
    fn check_insertable(&self, parent: NodeId, new: NodeId) -> Result<(), AmlError> {
        let new_node = self.node(new)?;
        if new_node.parent.is_some() || matches!(new_node.kind, NodeKind::Root(_)) {
            return Err(AmlError::InvalidArgument);
        }
        if self.is_ancestor_or_self(new, parent) {
            return Err(AmlError::InvalidArgument);
        }

        let new_data_type = new_node.as_data().map(|d| d.data_type);
        let allowed = match &self.node(parent)?.kind {
            NodeKind::Root(_) => matches!(new_data_type, None | Some(DataType::NameString)),
            NodeKind::Object(obj) => {
                let attrs = obj.encoding.attributes;
                if attrs.contains(OpAttributes::HAS_CHILD_OBJ) {
                    matches!(new_data_type, None | Some(DataType::NameString))
                } else if attrs.contains(OpAttributes::HAS_BYTE_LIST) {
                    matches!(new_data_type, Some(DataType::Raw | DataType::ResourceData))
                } else if attrs.contains(OpAttributes::HAS_FIELD_LIST) {
                    new_data_type == Some(DataType::Raw)
                } else {
                    false
                }
            }
            NodeKind::Data(_) => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(AmlError::InvalidArgument)
        }
    }

    /// Adds a resource descriptor to a resource template `Buffer`, just
    /// before its EndTag.
    ///
    /// The EndTag checksum is reset to 0 ("treat as checksummed") since the
    /// template content changed.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `buffer` is not a `Buffer`
    /// object ending with an EndTag, or if `new` is not a detached resource
    /// data node other than an EndTag.
    pub fn append_resource_data_node(&mut self, buffer: NodeId, new: NodeId) -> Result<(), AmlError> {
        let encoding = self.object_encoding(buffer)?;
        if encoding.op_code != OpCode::BUFFER {
            return Err(AmlError::InvalidArgument);
        }
        match self.resource_data_type(new)? {
            ResourceDescriptorId::END_TAG => return Err(AmlError::InvalidArgument),
            _ if self.parent(new).is_some() => return Err(AmlError::InvalidArgument),
            _ => {}
        }
        let end_tag = self
            .last_variable_argument(buffer)
            .filter(|&last| self.resource_data_type(last) == Ok(ResourceDescriptorId::END_TAG))
            .ok_or(AmlError::InvalidArgument)?;

        self.var_list_add_before(end_tag, new)?;
        if let NodeKind::Data(data) = &mut self.node_mut(end_tag)?.kind {
            if let Some(checksum) = data.buffer.get_mut(1) {
                *checksum = 0;
            }
        }
        Ok(())
    }

    /// Replaces the payload of a data node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not a data node or
    /// the payload is malformed, [`AmlError::Unsupported`] if `data_type`
    /// differs from the node's type or the change would turn an EndTag into
    /// another descriptor (or back), and [`AmlError::OutOfMemory`].
    pub fn update_data_node(&mut self, id: NodeId, data_type: DataType, bytes: &[u8]) -> Result<(), AmlError> {
        let current = self.node(id)?.as_data().ok_or(AmlError::InvalidArgument)?;
        if current.data_type != data_type {
            return Err(AmlError::Unsupported);
        }
        let descriptor_id = validate_payload(data_type, bytes)?;
        let was_end_tag = current.descriptor_id == Some(ResourceDescriptorId::END_TAG);
        let is_end_tag = descriptor_id == Some(ResourceDescriptorId::END_TAG);
        if was_end_tag != is_end_tag && self.parent(id).is_some() {
            return Err(AmlError::Unsupported);
        }
        // A fixed argument keeps the width its slot prescribes.
        if let Some(size) = self.fixed_slot_format(id).and_then(ArgFormat::int_size) {
            if size != bytes.len() {
                return Err(AmlError::InvalidArgument);
            }
        }

        let mut buffer = alloc::vec::Vec::new();
        buffer.try_reserve_exact(bytes.len())?;
        buffer.extend_from_slice(bytes);

        let parent = self.parent(id);
        if let NodeKind::Data(data) = &mut self.node_mut(id)?.kind {
            data.buffer = buffer;
            data.descriptor_id = descriptor_id;
        }
        if let Some(parent) = parent {
            self.propagate_sizes(parent);
        }
        Ok(())
    }

    /// Sets the value of an integer object, switching to the smallest
    /// encoding (`Zero`, `One`, `BytePrefix`, `WordPrefix`, `DWordPrefix` or
    /// `QWordPrefix`) that holds it.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not an object node,
    /// [`AmlError::Unsupported`] for any opcode other than the six above
    /// (`Ones` included), and [`AmlError::OutOfMemory`].
    pub fn update_integer(&mut self, id: NodeId, value: u64) -> Result<(), AmlError> {
        let encoding = self.object_encoding(id)?;
        if !encoding.op_code.is_updatable_integer() {
            return Err(AmlError::Unsupported);
        }
        self.set_integer(id, value)?;
        if let Some(parent) = self.parent(id) {
            self.propagate_sizes(parent);
        }
        Ok(())
    }

    fn set_integer(&mut self, id: NodeId, value: u64) -> Result<(), AmlError> {
        let new_op = match value {
            0 => OpCode::ZERO,
            1 => OpCode::ONE,
            0x02..=0xFF => OpCode::BYTE,
            0x100..=0xFFFF => OpCode::WORD,
            0x1_0000..=0xFFFF_FFFF => OpCode::DWORD,
            _ => OpCode::QWORD,
        };
        let new_encoding = OpEncoding::lookup(new_op).ok_or(AmlError::InvalidAml)?;
        let width = new_encoding.formats.first().and_then(|f| f.int_size());
        let old_arg = self.fixed_argument(id, 0);
        let payload = value.to_le_bytes();

        // Allocate first so a failure leaves the node as it was.
        let new_arg = match (old_arg, width) {
            (None, Some(width)) => Some(self.create_data(DataType::UInt, &payload[..width])?),
            (Some(arg), Some(width)) => {
                if let NodeKind::Data(data) = &mut self.node_mut(arg)?.kind {
                    data.buffer.try_reserve(width)?;
                    data.buffer.clear();
                    data.buffer.extend_from_slice(&payload[..width]);
                }
                Some(arg)
            }
            (_, None) => None,
        };

        if let NodeKind::Object(obj) = &mut self.node_mut(id)?.kind {
            obj.encoding = new_encoding;
            obj.fixed_args[0] = new_arg;
        }
        if let Some(arg) = new_arg {
            self.node_mut(arg)?.parent = Some(id);
        }
        if let Some(old) = old_arg.filter(|_| new_arg.is_none()) {
            self.node_mut(old)?.parent = None;
            self.free_subtree(old);
        }
        trace!("aml: integer node set to {value:#x} ({})", new_encoding.name);
        Ok(())
    }

    /// Rewrites the header fields of the root, except length and checksum
    /// which serialization computes.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is not a root node.
    pub fn update_root_node(&mut self, id: NodeId, header: &SdtHeader) -> Result<(), AmlError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Root(root) => {
                root.header = SdtHeader {
                    length: root.header.length,
                    checksum: root.header.checksum,
                    ..*header
                };
                Ok(())
            }
            _ => Err(AmlError::InvalidArgument),
        }
    }

    /// Format of the fixed argument slot `id` occupies, if any.
    fn fixed_slot_format(&self, id: NodeId) -> Option<ArgFormat> {
        let parent = self.get(self.parent(id)?)?.as_object()?;
        let slot = parent.fixed_args.iter().position(|&arg| arg == Some(id))?;
        parent.encoding.formats.get(slot).copied()
    }

    /// Walks from `start` up to the root, refreshing package counts,
    /// resource template sizes and PkgLengths.
    pub(crate) fn propagate_sizes(&mut self, start: NodeId) {
        let mut current = Some(start);
        while let Some(id) = current {
            self.refresh_package_count(id);
            self.refresh_buffer_size(id);
            self.refresh_pkg_len(id);
            current = self.parent(id);
        }
    }

    /// Raises the NumElements of a `Package` (or of a `VarPackage` whose
    /// count is a plain integer) so it covers every element in the list.
    /// A larger declared count is kept.
    fn refresh_package_count(&mut self, id: NodeId) {
        let Ok(encoding) = self.object_encoding(id) else {
            return;
        };
        let Some(count_node) = self.fixed_argument(id, 0) else {
            return;
        };
        let elements = self.variable_arguments(id).len();

        if encoding.op_code == OpCode::PACKAGE {
            let wanted = u8::try_from(elements).unwrap_or(u8::MAX);
            if let Ok(node) = self.node_mut(count_node) {
                if let NodeKind::Data(data) = &mut node.kind {
                    if let Some(count) = data.buffer.first_mut() {
                        *count = (*count).max(wanted);
                    }
                }
            }
        } else if encoding.op_code == OpCode::VAR_PACKAGE {
            let updatable = self
                .object_encoding(count_node)
                .is_ok_and(|enc| enc.op_code.is_updatable_integer());
            let Ok(current) = self.integer_value(count_node) else {
                return;
            };
            if !updatable || current >= elements as u64 {
                return;
            }
            if let Err(err) = self.set_integer(count_node, elements as u64) {
                warn!("aml: failed to update package element count: {err}");
            }
        }
    }

    /// If `id` is a `Buffer` holding resource descriptors, sets its size
    /// argument to the byte length of its content.
    fn refresh_buffer_size(&mut self, id: NodeId) {
        let Ok(encoding) = self.object_encoding(id) else {
            return;
        };
        if encoding.op_code != OpCode::BUFFER {
            return;
        }
        let children = self.variable_arguments(id);
        let is_template = children
            .iter()
            .any(|&child| self.resource_data_type(child).is_ok());
        if !is_template {
            return;
        }
        let size: usize = children.iter().map(|&child| self.node_size(child)).sum();
        let Some(size_node) = self.fixed_argument(id, 0) else {
            return;
        };
        let updatable = self
            .object_encoding(size_node)
            .is_ok_and(|enc| enc.op_code.is_updatable_integer());
        if !updatable || self.integer_value(size_node) == Ok(size as u64) {
            return;
        }
        if let Err(err) = self.set_integer(size_node, size as u64) {
            warn!("aml: failed to update resource template size: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::{AmlError, AmlTree, DataType, NodeId, OpCode, SdtHeader};

    fn tree() -> AmlTree {
        AmlTree::new(SdtHeader::new(*b"SSDT", 2, *b"HADRON", *b"MUTATE  ", 1))
    }

    fn device(tree: &mut AmlTree, name: &[u8; 4]) -> NodeId {
        let n = tree.create_data(DataType::NameString, name).unwrap();
        tree.create_object(OpCode::DEVICE, &[n]).unwrap()
    }

    #[test]
    fn insert_positions() {
        let mut tree = tree();
        let root = tree.root();
        let a = device(&mut tree, b"AAAA");
        let b = device(&mut tree, b"BBBB");
        let c = device(&mut tree, b"CCCC");
        let d = device(&mut tree, b"DDDD");
        tree.var_list_add_tail(root, b).unwrap();
        tree.var_list_add_head(root, a).unwrap();
        tree.var_list_add_after(b, d).unwrap();
        tree.var_list_add_before(d, c).unwrap();
        assert_eq!(tree.variable_arguments(root), &[a, b, c, d]);
    }

    #[test]
    fn rejects_attached_and_cycles() {
        let mut tree = tree();
        let root = tree.root();
        let a = device(&mut tree, b"AAAA");
        let b = device(&mut tree, b"BBBB");
        tree.var_list_add_tail(root, a).unwrap();
        tree.var_list_add_tail(a, b).unwrap();

        // Already attached.
        assert_eq!(tree.var_list_add_tail(root, b), Err(AmlError::InvalidArgument));

        // A detached node cannot go below itself.
        tree.remove_from_var_arg_list(a).unwrap();
        assert_eq!(tree.var_list_add_tail(b, a), Err(AmlError::InvalidArgument));
        assert_eq!(tree.var_list_add_tail(a, a), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn content_rules() {
        let mut tree = tree();
        let root = tree.root();
        let raw = tree.create_data(DataType::Raw, &[1, 2]).unwrap();
        assert_eq!(tree.var_list_add_tail(root, raw), Err(AmlError::InvalidArgument));

        let name = tree.create_data(DataType::NameString, b"FOO_").unwrap();
        tree.var_list_add_tail(root, name).unwrap();

        // Name has no variable argument list.
        let n = tree.create_data(DataType::NameString, b"BAR_").unwrap();
        let zero = tree.create_object(OpCode::ZERO, &[]).unwrap();
        let def = tree.create_object(OpCode::NAME, &[n, zero]).unwrap();
        let other = device(&mut tree, b"DEV0");
        assert_eq!(tree.var_list_add_tail(def, other), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn remove_fixed_argument_is_rejected() {
        let mut tree = tree();
        let root = tree.root();
        let dev = device(&mut tree, b"DEV0");
        tree.var_list_add_tail(root, dev).unwrap();
        let name = tree.fixed_argument(dev, 0).unwrap();

        assert_eq!(tree.remove_from_var_arg_list(name), Err(AmlError::InvalidArgument));
        assert_eq!(tree.parent(name), Some(dev));
        assert_eq!(tree.fixed_argument(dev, 0), Some(name));
        assert_eq!(tree.remove_from_var_arg_list(root), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn pkg_len_follows_children() {
        let mut tree = tree();
        let root = tree.root();
        let outer = device(&mut tree, b"OUTR");
        tree.var_list_add_tail(root, outer).unwrap();
        // Device: ExtOp(2) + PkgLength(1) + NameSeg(4).
        assert_eq!(tree.object_node_info(outer).unwrap().pkg_len, 5);

        let inner = device(&mut tree, b"INNR");
        tree.var_list_add_tail(outer, inner).unwrap();
        assert_eq!(tree.object_node_info(outer).unwrap().pkg_len, 5 + 7);

        tree.remove_from_var_arg_list(inner).unwrap();
        assert_eq!(tree.object_node_info(outer).unwrap().pkg_len, 5);
    }

    #[test]
    fn replace_swaps_in_place() {
        let mut tree = tree();
        let root = tree.root();
        let a = device(&mut tree, b"AAAA");
        let b = device(&mut tree, b"BBBB");
        tree.var_list_add_tail(root, a).unwrap();
        tree.replace_variable_argument(a, b).unwrap();
        assert_eq!(tree.variable_arguments(root), &[b]);
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.replace_variable_argument(b, b), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn update_integer_reencodes() {
        let mut tree = tree();
        let zero = tree.create_object(OpCode::ZERO, &[]).unwrap();
        tree.update_integer(zero, 0x1234).unwrap();
        let info = tree.object_node_info(zero).unwrap();
        assert_eq!(info.op_code, 0x0B);
        assert_eq!(tree.integer_value(zero), Ok(0x1234));

        tree.update_integer(zero, 1).unwrap();
        assert_eq!(tree.object_node_info(zero).unwrap().op_code, 0x01);
        assert_eq!(tree.fixed_argument(zero, 0), None);

        tree.update_integer(zero, u64::MAX - 1).unwrap();
        assert_eq!(tree.object_node_info(zero).unwrap().op_code, 0x0E);
        assert_eq!(tree.integer_value(zero), Ok(u64::MAX - 1));

        let ones = tree.create_object(OpCode::ONES, &[]).unwrap();
        assert_eq!(tree.update_integer(ones, 3), Err(AmlError::Unsupported));
        let raw = tree.create_data(DataType::Raw, &[]).unwrap();
        assert_eq!(tree.update_integer(raw, 3), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn update_data_node_keeps_type() {
        let mut tree = tree();
        let s = tree.create_data(DataType::String, b"old\0").unwrap();
        assert_eq!(tree.update_data_node(s, DataType::Raw, b"x"), Err(AmlError::Unsupported));
        assert_eq!(tree.update_data_node(s, DataType::String, b"bad"), Err(AmlError::InvalidArgument));
        tree.update_data_node(s, DataType::String, b"newer\0").unwrap();
        assert_eq!(tree.data_node_bytes(s), Ok(&b"newer\0"[..]));
    }

    #[test]
    fn fixed_integer_keeps_slot_width() {
        let mut tree = tree();
        let root = tree.root();
        let name = tree.create_data(DataType::NameString, b"VAL0").unwrap();
        let payload = tree.create_data(DataType::UInt, &[0x2A]).unwrap();
        let value = tree.create_object(OpCode::BYTE, &[payload]).unwrap();
        let def = tree.create_object(OpCode::NAME, &[name, value]).unwrap();
        tree.var_list_add_tail(root, def).unwrap();

        assert_eq!(
            tree.update_data_node(payload, DataType::UInt, &[0x34, 0x12]),
            Err(AmlError::InvalidArgument)
        );
        assert_eq!(tree.data_node_bytes(payload), Ok(&[0x2A][..]));

        tree.update_data_node(payload, DataType::UInt, &[0x34]).unwrap();
        let bytes = tree.serialize(root).unwrap();
        assert_eq!(&bytes[SdtHeader::SIZE..], [0x08, b'V', b'A', b'L', b'0', 0x0A, 0x34]);
        let reparsed = AmlTree::parse(&bytes).unwrap();
        assert_eq!(reparsed.serialize(reparsed.root()).unwrap(), bytes);

        // Detached payloads are not bound to any slot.
        let loose = tree.create_data(DataType::UInt, &[1]).unwrap();
        tree.update_data_node(loose, DataType::UInt, &[1, 2, 3, 4]).unwrap();
    }

    #[test]
    fn package_count_covers_elements() {
        let mut tree = tree();
        let count = tree.create_data(DataType::UInt, &[1]).unwrap();
        let package = tree.create_object(OpCode::PACKAGE, &[count]).unwrap();
        let mut elements = std::vec::Vec::new();
        for value in 1..=3u8 {
            let payload = tree.create_data(DataType::UInt, &[value]).unwrap();
            let element = tree.create_object(OpCode::BYTE, &[payload]).unwrap();
            tree.var_list_add_tail(package, element).unwrap();
            elements.push(element);
        }
        assert_eq!(tree.data_node_bytes(count), Ok(&[3][..]));
        assert_eq!(
            tree.serialize(package).unwrap(),
            [0x12, 0x08, 0x03, 0x0A, 0x01, 0x0A, 0x02, 0x0A, 0x03]
        );

        // Trailing uninitialized elements are legal, so the count stays.
        tree.remove_from_var_arg_list(elements[2]).unwrap();
        assert_eq!(tree.data_node_bytes(count), Ok(&[3][..]));

        let zero = tree.create_object(OpCode::ZERO, &[]).unwrap();
        let var_package = tree.create_object(OpCode::VAR_PACKAGE, &[zero]).unwrap();
        let one = tree.create_object(OpCode::ONE, &[]).unwrap();
        let ones = tree.create_object(OpCode::ONES, &[]).unwrap();
        tree.var_list_add_tail(var_package, one).unwrap();
        tree.var_list_add_tail(var_package, ones).unwrap();
        assert_eq!(tree.integer_value(zero), Ok(2));
        assert_eq!(tree.object_node_info(zero).unwrap().op_code, 0x0A);
    }

    #[test]
    fn update_root_keeps_length_and_checksum() {
        let mut tree = tree();
        let root = tree.root();
        let mut header = SdtHeader::new(*b"DSDT", 3, *b"OEMOEM", *b"TABLEID ", 7);
        header.length = 1234;
        header.checksum = 0x55;
        tree.update_root_node(root, &header).unwrap();
        let info = tree.root_node_info(root).unwrap();
        assert_eq!(info.signature, *b"DSDT");
        assert_eq!(info.oem_revision, 7);
        assert_eq!(info.length, 0);
        assert_eq!(info.checksum, 0);
    }
}
