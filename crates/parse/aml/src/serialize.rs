//! Writing a tree back out as AML bytecode.
//!
//! Bytes are emitted in traversal order: an object's opcode bytes and
//! PkgLength when it is visited, a data node's payload as is, and the SDT
//! header for the root. PkgLengths are always written in their shortest
//! form, so a parsed table that used padded encodings serializes smaller.

use alloc::vec::Vec;

use log::trace;

use crate::opcode::EXT_OP_PREFIX;
use crate::sdt::{self, SdtHeader};
use crate::tree::{AmlTree, NodeId, NodeKind, ObjectNode};
use crate::{AmlError, pkglen};

struct Emitter<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl Emitter<'_> {
    fn put(&mut self, bytes: &[u8]) -> Result<(), AmlError> {
        let end = self.pos + bytes.len();
        let dst = self.out.get_mut(self.pos..end).ok_or(AmlError::BufferTooSmall { required: end })?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }
}

impl AmlTree {
    /// Serialized size of a node and its subtree; 0 for a stale id.
    pub(crate) fn node_size(&self, id: NodeId) -> usize {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Root(root)) => {
                SdtHeader::SIZE + root.var_args.iter().map(|&c| self.node_size(c)).sum::<usize>()
            }
            Some(NodeKind::Object(obj)) => {
                let body = self.object_body_size(obj);
                let pkg = if obj.encoding.has_pkg_length() {
                    // Oversized packages are reported when writing.
                    pkglen::encoded_size(body).unwrap_or(4)
                } else {
                    0
                };
                obj.encoding.op_size() + pkg + body
            }
            Some(NodeKind::Data(data)) => data.buffer.len(),
            None => 0,
        }
    }

    /// Size of everything an object emits after its PkgLength.
    pub(crate) fn object_body_size(&self, obj: &ObjectNode) -> usize {
        let fixed: usize = obj.fixed_args.iter().flatten().map(|&c| self.node_size(c)).sum();
        let var: usize = obj.var_args.iter().map(|&c| self.node_size(c)).sum();
        fixed + var
    }

    /// Returns the number of bytes [`AmlTree::serialize_into`] writes for the
    /// subtree at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a stale id.
    pub fn serialized_size(&self, id: NodeId) -> Result<usize, AmlError> {
        self.node(id)?;
        Ok(self.node_size(id))
    }

    /// Writes the subtree at `id` into `out` and returns the byte count.
    ///
    /// For the root this is a complete table: the header's length field is
    /// set to the table size and its checksum recomputed. Any other node
    /// yields just its own bytecode.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::BufferTooSmall`] with the needed size if `out` is
    /// too short (pass an empty slice to query it),
    /// [`AmlError::InvalidPkgLength`] if a package is too large to encode, or
    /// [`AmlError::InvalidArgument`] for a stale id.
    pub fn serialize_into(&self, id: NodeId, out: &mut [u8]) -> Result<usize, AmlError> {
        let required = self.serialized_size(id)?;
        let out = out.get_mut(..required).ok_or(AmlError::BufferTooSmall { required })?;

        let mut emitter = Emitter { out, pos: 0 };
        self.enum_tree(id, |tree, node| {
            tree.emit_node(node, required, &mut emitter)?;
            Ok(true)
        })?;
        let written = emitter.pos;
        if written != required {
            return Err(AmlError::InvalidAml);
        }

        if matches!(self.node(id)?.kind, NodeKind::Root(_)) {
            sdt::update_checksum(emitter.out);
        }
        trace!("aml: serialized {written} bytes");
        Ok(written)
    }

    /// Serializes the subtree at `id` into a freshly allocated buffer.
    ///
    /// # Errors
    ///
    /// As [`AmlTree::serialize_into`], plus [`AmlError::OutOfMemory`].
    pub fn serialize(&self, id: NodeId) -> Result<Vec<u8>, AmlError> {
        let size = self.serialized_size(id)?;
        let mut out = Vec::new();
        out.try_reserve_exact(size)?;
        out.resize(size, 0);
        self.serialize_into(id, &mut out)?;
        Ok(out)
    }

    fn emit_node(&self, id: NodeId, table_len: usize, emitter: &mut Emitter<'_>) -> Result<(), AmlError> {
        match &self.node(id)?.kind {
            NodeKind::Root(root) => {
                let header = SdtHeader {
                    length: u32::try_from(table_len).map_err(|_| AmlError::InvalidArgument)?,
                    checksum: 0,
                    ..root.header
                };
                emitter.put(&header.to_bytes())
            }
            NodeKind::Object(obj) => {
                let encoding = obj.encoding;
                match encoding.op_size() {
                    0 => {}
                    1 => emitter.put(&[encoding.op_code.op])?,
                    _ => emitter.put(&[EXT_OP_PREFIX, encoding.op_code.sub_op])?,
                }
                if encoding.has_pkg_length() {
                    let body = self.object_body_size(obj);
                    let size = pkglen::encoded_size(body)?;
                    let (bytes, n) = pkglen::encode(body + size, size);
                    emitter.put(&bytes[..n])?;
                }
                Ok(())
            }
            NodeKind::Data(data) => emitter.put(&data.buffer),
        }
    }
}
