//! AML bytecode parser.
//!
//! [`AmlTree::parse`] turns a complete definition block (SDT header plus term
//! list) into a tree. Parsing is driven by the opcode table: each opcode's
//! fixed argument formats say what to read after the opcode bytes, and its
//! attributes say whether a PkgLength and which kind of variable argument
//! list follow.
//!
//! Nothing is evaluated. A NameString met in term position is kept as a name
//! reference, unless it names a method seen earlier in the table that takes
//! arguments; then the arguments are parsed as the children of a
//! `MethodInvocation` pseudo object.

use alloc::vec::Vec;

use log::{debug, trace, warn};

use crate::namestring::{self, DUAL_NAME_PREFIX, MULTI_NAME_PREFIX, PARENT_PREFIX_CHAR, ROOT_CHAR};
use crate::opcode::{ArgFormat, EXT_OP_PREFIX, OpAttributes, OpCode, OpEncoding};
use crate::path::NameSeg;
use crate::resource;
use crate::sdt::{self, SdtHeader};
use crate::tree::{AmlTree, DataType, NodeId};
use crate::{AmlError, DEFAULT_MAX_DEPTH, pkglen};

/// `ObjectType` value of a method in an `External` declaration.
const EXTERNAL_METHOD_TYPE: u8 = 8;

/// Knobs for [`AmlTree::parse_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject tables whose bytes do not sum to zero. When `false` a bad
    /// checksum is only logged.
    pub validate_checksum: bool,
    /// Deepest object nesting accepted before giving up with
    /// [`AmlError::InvalidAml`].
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            validate_checksum: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl AmlTree {
    /// Parses a definition block with the default [`ParseOptions`].
    ///
    /// # Errors
    ///
    /// See [`AmlTree::parse_with`].
    pub fn parse(table: &[u8]) -> Result<Self, AmlError> {
        Self::parse_with(table, &ParseOptions::default())
    }

    /// Parses a definition block.
    ///
    /// `table` must start with the SDT header; bytes past the header's length
    /// field are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::UnexpectedEnd`] if the table or any object in it is
    /// truncated, [`AmlError::InvalidPkgLength`] for a malformed or
    /// overrunning PkgLength, [`AmlError::InvalidAml`] for an unknown opcode,
    /// excessive nesting or (when validating) a bad checksum, and
    /// [`AmlError::OutOfMemory`].
    pub fn parse_with(table: &[u8], options: &ParseOptions) -> Result<Self, AmlError> {
        let header = SdtHeader::read_from_bytes(table).ok_or(AmlError::UnexpectedEnd)?;
        let length = header.length as usize;
        if length < SdtHeader::SIZE {
            return Err(AmlError::InvalidAml);
        }
        let table = table.get(..length).ok_or(AmlError::UnexpectedEnd)?;

        if !sdt::validate_checksum(table) {
            if options.validate_checksum {
                debug!("aml: {} checksum mismatch", header.signature.escape_ascii());
                return Err(AmlError::InvalidAml);
            }
            warn!("aml: {} checksum mismatch, continuing", header.signature.escape_ascii());
        }

        let mut tree = Self::new(header);
        let root = tree.root();
        let mut parser = Parser {
            tree: &mut tree,
            data: table,
            pos: SdtHeader::SIZE,
            depth: 0,
            max_depth: options.max_depth,
            methods: Vec::new(),
        };
        parser.parse_term_list(root, table.len(), true)?;
        trace!("aml: parsed {} nodes from {length} bytes", tree.node_count());
        Ok(tree)
    }
}

struct Parser<'a, 't> {
    tree: &'t mut AmlTree,
    data: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
    /// Method names and argument counts seen so far.
    methods: Vec<(NameSeg, u8)>,
}

impl<'a> Parser<'a, '_> {
    fn peek(&self, end: usize) -> Result<u8, AmlError> {
        if self.pos >= end {
            return Err(AmlError::UnexpectedEnd);
        }
        self.data.get(self.pos).copied().ok_or(AmlError::UnexpectedEnd)
    }

    fn read_u8(&mut self, end: usize) -> Result<u8, AmlError> {
        let b = self.peek(end)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, len: usize, end: usize) -> Result<&'a [u8], AmlError> {
        let stop = self.pos.checked_add(len).filter(|&s| s <= end).ok_or(AmlError::UnexpectedEnd)?;
        let bytes = self.data.get(self.pos..stop).ok_or(AmlError::UnexpectedEnd)?;
        self.pos = stop;
        Ok(bytes)
    }

    /// Parses terms into the variable argument list of `parent` until `end`.
    fn parse_term_list(&mut self, parent: NodeId, end: usize, allow_calls: bool) -> Result<(), AmlError> {
        while self.pos < end {
            let start = self.pos;
            let child = self.parse_term(end, allow_calls)?;
            if allow_calls && self.tree.node_data_type(child) == Ok(DataType::NameString) {
                self.warn_if_operands_follow(child, start, end);
            }
            self.tree.link_var_arg(parent, child)?;
        }
        if self.pos != end {
            return Err(AmlError::InvalidPkgLength);
        }
        Ok(())
    }

    fn parse_term(&mut self, end: usize, allow_calls: bool) -> Result<NodeId, AmlError> {
        let lead = self.peek(end)?;
        let is_name = matches!(lead, ROOT_CHAR | PARENT_PREFIX_CHAR | DUAL_NAME_PREFIX | MULTI_NAME_PREFIX)
            || namestring::is_aml_lead_name_char(lead);
        if is_name {
            self.parse_name_reference(end, allow_calls)
        } else {
            self.parse_object(end)
        }
    }

    fn read_name_string(&mut self, end: usize) -> Result<&'a [u8], AmlError> {
        let rest = self.data.get(self.pos..end).ok_or(AmlError::UnexpectedEnd)?;
        let len = namestring::aml_name_string_size(rest).map_err(|_| AmlError::InvalidAml)?;
        self.read_bytes(len, end)
    }

    fn parse_name_reference(&mut self, end: usize, allow_calls: bool) -> Result<NodeId, AmlError> {
        let start = self.pos;
        let name = self.read_name_string(end)?;
        let name_node = self.tree.create_data(DataType::NameString, name)?;

        let arg_count = if allow_calls { self.method_arg_count(name) } else { 0 };
        if arg_count == 0 {
            return Ok(name_node);
        }

        trace!("aml: call to {} with {arg_count} args at {start:#x}", name.escape_ascii());
        let encoding = OpEncoding::lookup(OpCode::METHOD_INVOCATION).ok_or(AmlError::InvalidAml)?;
        let call = self.tree.alloc_object(encoding)?;
        self.tree.link_fixed_arg(call, 0, name_node)?;
        self.enter()?;
        for _ in 0..arg_count {
            let arg = self.parse_term(end, true)?;
            self.tree.link_var_arg(call, arg)?;
        }
        self.depth -= 1;
        Ok(call)
    }

    /// A statement-level name followed by a local, an argument or a
    /// constant is most likely a call to a method defined later in the
    /// table. It still parses as a reference followed by separate terms.
    fn warn_if_operands_follow(&self, name_node: NodeId, start: usize, end: usize) {
        let Some(&next) = self.data.get(self.pos).filter(|_| self.pos < end) else {
            return;
        };
        if !looks_like_operand(next) {
            return;
        }
        let name = self.tree.data_node_bytes(name_node).unwrap_or_default();
        warn!(
            "aml: {} at {start:#x} is followed by operands, unresolved method invocation",
            name.escape_ascii()
        );
    }

    fn parse_object(&mut self, end: usize) -> Result<NodeId, AmlError> {
        let start = self.pos;
        let op = self.read_u8(end)?;
        let op_code = if op == EXT_OP_PREFIX {
            OpCode::ext(self.read_u8(end)?)
        } else {
            OpCode::new(op)
        };
        let Some(encoding) = OpEncoding::from_stream(op_code) else {
            debug!("aml: unknown opcode {:#04x}:{:#04x} at {start:#x}", op_code.op, op_code.sub_op);
            return Err(AmlError::InvalidAml);
        };

        let obj_end = if encoding.has_pkg_length() {
            let pkg_start = self.pos;
            let rest = self.data.get(pkg_start..end).ok_or(AmlError::UnexpectedEnd)?;
            let (size, value) = pkglen::decode(rest)?;
            self.pos += size;
            let obj_end = pkg_start + value;
            if obj_end > end {
                return Err(AmlError::InvalidPkgLength);
            }
            obj_end
        } else {
            end
        };

        self.enter()?;
        let node = self.tree.alloc_object(encoding)?;
        for (index, &format) in encoding.formats.iter().enumerate() {
            let arg = self.parse_fixed_arg(format, obj_end)?;
            self.tree.link_fixed_arg(node, index, arg)?;
        }
        self.note_method(node, encoding)?;

        let attrs = encoding.attributes;
        if attrs.contains(OpAttributes::HAS_CHILD_OBJ) {
            let is_package = matches!(encoding.op_code, OpCode::PACKAGE | OpCode::VAR_PACKAGE);
            self.parse_term_list(node, obj_end, !is_package)?;
        } else if attrs.contains(OpAttributes::HAS_BYTE_LIST) {
            self.parse_byte_list(node, obj_end)?;
        } else if attrs.contains(OpAttributes::HAS_FIELD_LIST) {
            let fields = self.read_bytes(obj_end - self.pos, obj_end)?;
            if !fields.is_empty() {
                let raw = self.tree.create_data(DataType::Raw, fields)?;
                self.tree.link_var_arg(node, raw)?;
            }
        }

        if encoding.has_pkg_length() {
            if self.pos != obj_end {
                return Err(AmlError::InvalidPkgLength);
            }
            self.tree.refresh_pkg_len(node);
        }
        self.depth -= 1;
        Ok(node)
    }

    fn enter(&mut self) -> Result<(), AmlError> {
        if self.depth >= self.max_depth {
            debug!("aml: nesting deeper than {} at {:#x}", self.max_depth, self.pos);
            return Err(AmlError::InvalidAml);
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_fixed_arg(&mut self, format: ArgFormat, end: usize) -> Result<NodeId, AmlError> {
        match format {
            ArgFormat::NameString => {
                let name = self.read_name_string(end)?;
                self.tree.create_data(DataType::NameString, name)
            }
            ArgFormat::String => {
                let rest = self.data.get(self.pos..end).ok_or(AmlError::UnexpectedEnd)?;
                let nul = rest.iter().position(|&b| b == 0).ok_or(AmlError::UnexpectedEnd)?;
                let bytes = self.read_bytes(nul + 1, end)?;
                self.tree.create_data(DataType::String, bytes)
            }
            ArgFormat::Object => self.parse_term(end, true),
            int => {
                let width = int.int_size().ok_or(AmlError::InvalidAml)?;
                let bytes = self.read_bytes(width, end)?;
                self.tree.create_data(DataType::UInt, bytes)
            }
        }
    }

    /// Splits a `Buffer` byte list into resource descriptors when it frames
    /// as a resource template, otherwise keeps it as one raw node.
    fn parse_byte_list(&mut self, buffer: NodeId, end: usize) -> Result<(), AmlError> {
        let bytes = self.read_bytes(end - self.pos, end)?;
        if bytes.is_empty() {
            return Ok(());
        }
        match resource::frame_template(bytes) {
            Some(items) => {
                for item in items {
                    let rd = self.tree.create_data(DataType::ResourceData, item)?;
                    self.tree.link_var_arg(buffer, rd)?;
                }
            }
            None => {
                let raw = self.tree.create_data(DataType::Raw, bytes)?;
                self.tree.link_var_arg(buffer, raw)?;
            }
        }
        Ok(())
    }

    /// Records `Method` definitions and method `External` declarations so
    /// later calls can be recognized.
    fn note_method(&mut self, node: NodeId, encoding: &OpEncoding) -> Result<(), AmlError> {
        let arg_count = match encoding.op_code {
            OpCode::METHOD => self.fixed_u8(node, 1)? & 0x07,
            OpCode::EXTERNAL if self.fixed_u8(node, 1)? == EXTERNAL_METHOD_TYPE => self.fixed_u8(node, 2)? & 0x07,
            _ => return Ok(()),
        };
        let name = self.tree.data_node_bytes(self.fixed(node, 0)?)?;
        let Some(seg) = last_name_seg(name) else {
            return Ok(());
        };
        self.methods.try_reserve(1)?;
        self.methods.push((seg, arg_count));
        Ok(())
    }

    fn fixed(&self, node: NodeId, index: usize) -> Result<NodeId, AmlError> {
        self.tree.fixed_argument(node, index).ok_or(AmlError::InvalidAml)
    }

    fn fixed_u8(&self, node: NodeId, index: usize) -> Result<u8, AmlError> {
        let bytes = self.tree.data_node_bytes(self.fixed(node, index)?)?;
        bytes.first().copied().ok_or(AmlError::InvalidAml)
    }

    fn method_arg_count(&self, name: &[u8]) -> u8 {
        let Some(seg) = last_name_seg(name) else {
            return 0;
        };
        // Latest definition wins.
        self.methods
            .iter()
            .rev()
            .find(|(known, _)| *known == seg)
            .map_or(0, |&(_, count)| count)
    }
}

/// Returns the last NameSeg of an AML NameString, if it has any.
/// Locals, arguments and integer constants never start a useful statement.
fn looks_like_operand(op: u8) -> bool {
    matches!(op, 0x00 | 0x01 | 0x0A..=0x0E | 0x60..=0x6E | 0xFF)
}

fn last_name_seg(name: &[u8]) -> Option<NameSeg> {
    let info = namestring::parse_aml_name_string_info(name).ok()?;
    let segs = namestring::first_name_seg(name, info.root, info.parent_prefix);
    let count = usize::from(info.seg_count);
    let last = count.checked_sub(1)?;
    NameSeg::from_bytes(segs.get(last * namestring::NAME_SEG_SIZE..)?)
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::NodeType;

    fn table(body: &[u8]) -> Vec<u8> {
        let mut header = SdtHeader::new(*b"SSDT", 2, *b"HADRON", *b"PARSER  ", 1);
        header.length = (SdtHeader::SIZE + body.len()) as u32;
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(body);
        sdt::update_checksum(&mut bytes);
        bytes
    }

    #[test]
    fn empty_table() {
        let tree = AmlTree::parse(&table(&[])).unwrap();
        assert!(tree.variable_arguments(tree.root()).is_empty());
        assert_eq!(tree.root_node_info(tree.root()).unwrap().signature, *b"SSDT");
    }

    #[test]
    fn name_with_byte_value() {
        // Name (VAL0, 0x2A)
        let tree = AmlTree::parse(&table(&[0x08, b'V', b'A', b'L', b'0', 0x0A, 0x2A])).unwrap();
        let def = tree.first_variable_argument(tree.root()).unwrap();
        assert_eq!(tree.object_node_info(def).unwrap().op_code, 0x08);
        assert_eq!(tree.node_name(def), Ok(&b"VAL0"[..]));
        let value = tree.fixed_argument(def, 1).unwrap();
        assert_eq!(tree.integer_value(value), Ok(0x2A));
    }

    #[test]
    fn checksum_is_checked() {
        let mut bytes = table(&[0xA3]);
        bytes[SdtHeader::SIZE - 1] ^= 1;
        assert_eq!(AmlTree::parse(&bytes).err(), Some(AmlError::InvalidAml));

        let lenient = ParseOptions {
            validate_checksum: false,
            ..ParseOptions::default()
        };
        assert!(AmlTree::parse_with(&bytes, &lenient).is_ok());
    }

    #[test]
    fn truncation_and_unknown_opcodes() {
        assert_eq!(AmlTree::parse(&[0u8; 10]).err(), Some(AmlError::UnexpectedEnd));
        // Word prefix missing its second byte.
        assert_eq!(AmlTree::parse(&table(&[0x0B, 0x01])).err(), Some(AmlError::UnexpectedEnd));
        // 0x02 is not an opcode.
        assert_eq!(AmlTree::parse(&table(&[0x02])).err(), Some(AmlError::InvalidAml));
        // Scope whose PkgLength runs past the table.
        assert_eq!(
            AmlTree::parse(&table(&[0x10, 0x10, b'A', b'B', b'C', b'D'])).err(),
            Some(AmlError::InvalidPkgLength)
        );
    }

    #[test]
    fn buffer_splits_into_resource_descriptors() {
        // Name (_CRS, ResourceTemplate () { IO (Decode16, 0x3F8, 0x3F8, 1, 8) })
        let body = [
            0x08, b'_', b'C', b'R', b'S', 0x11, 0x0D, 0x0A, 0x0A, 0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08, 0x79,
            0x00,
        ];
        let tree = AmlTree::parse(&table(&body)).unwrap();
        let def = tree.first_variable_argument(tree.root()).unwrap();
        let buffer = tree.fixed_argument(def, 1).unwrap();
        let items = tree.variable_arguments(buffer);
        assert_eq!(items.len(), 2);
        assert_eq!(tree.resource_data_type(items[0]), Ok(resource::ResourceDescriptorId::IO));
        assert_eq!(tree.resource_data_type(items[1]), Ok(resource::ResourceDescriptorId::END_TAG));
    }

    #[test]
    fn plain_buffer_stays_raw() {
        // Buffer (3) { 1, 2, 3 }
        let tree = AmlTree::parse(&table(&[0x11, 0x06, 0x0A, 0x03, 0x01, 0x02, 0x03])).unwrap();
        let buffer = tree.first_variable_argument(tree.root()).unwrap();
        let raw = tree.first_variable_argument(buffer).unwrap();
        assert_eq!(tree.node_data_type(raw), Ok(DataType::Raw));
        assert_eq!(tree.data_node_bytes(raw), Ok(&[1u8, 2, 3][..]));
    }

    #[test]
    fn method_calls_take_arguments() {
        // Method (FOO, 1) { Return (Arg0) }
        // FOO (One)
        let body = [
            0x14, 0x08, b'F', b'O', b'O', b'_', 0x01, 0xA4, 0x68, //
            b'F', b'O', b'O', b'_', 0x01,
        ];
        let tree = AmlTree::parse(&table(&body)).unwrap();
        let top = tree.variable_arguments(tree.root());
        assert_eq!(top.len(), 2);
        let call = top[1];
        let info = tree.object_node_info(call).unwrap();
        assert_eq!(info.op_code, OpCode::METHOD_INVOCATION.op);
        let args = tree.variable_arguments(call);
        assert_eq!(args.len(), 1);
        assert_eq!(tree.integer_value(args[0]), Ok(1));
    }

    #[test]
    fn unknown_names_are_references() {
        // Store (Local0, BAR_)
        let tree = AmlTree::parse(&table(&[0x70, 0x60, b'B', b'A', b'R', b'_'])).unwrap();
        let store = tree.first_variable_argument(tree.root()).unwrap();
        let target = tree.fixed_argument(store, 1).unwrap();
        assert_eq!(tree.node_type(target), NodeType::Data);
        assert_eq!(tree.node_data_type(target), Ok(DataType::NameString));
    }

    #[test]
    fn forward_calls_stay_references() {
        // BAZ_ (One) before Method (BAZ_, 1) { Return (Arg0) }
        let body = [
            b'B', b'A', b'Z', b'_', 0x01, //
            0x14, 0x08, b'B', b'A', b'Z', b'_', 0x01, 0xA4, 0x68,
        ];
        let bytes = table(&body);
        let tree = AmlTree::parse(&bytes).unwrap();
        let top = tree.variable_arguments(tree.root());
        assert_eq!(top.len(), 3);
        assert_eq!(tree.node_data_type(top[0]), Ok(DataType::NameString));
        assert_eq!(tree.integer_value(top[1]), Ok(1));
        assert_eq!(tree.serialize(tree.root()).unwrap(), bytes);

        assert!(looks_like_operand(0x68));
        assert!(looks_like_operand(0x0A));
        assert!(!looks_like_operand(0x70));
    }

    #[test]
    fn unload_is_known() {
        // Unload (Local0)
        let tree = AmlTree::parse(&table(&[0x5B, 0x2A, 0x60])).unwrap();
        let unload = tree.first_variable_argument(tree.root()).unwrap();
        let info = tree.object_node_info(unload).unwrap();
        assert_eq!((info.op_code, info.sub_op_code), (0x5B, 0x2A));
        assert!(tree.fixed_argument(unload, 0).is_some());
    }

    #[test]
    fn depth_limit() {
        // If (One) { If (One) { Noop } }
        let body = [0xA0, 0x06, 0x01, 0xA0, 0x03, 0x01, 0xA3];
        let strict = ParseOptions {
            max_depth: 2,
            ..ParseOptions::default()
        };
        assert_eq!(AmlTree::parse_with(&table(&body), &strict).err(), Some(AmlError::InvalidAml));
        assert!(AmlTree::parse(&table(&body)).is_ok());
    }

    #[test]
    fn last_seg_of_paths() {
        assert_eq!(last_name_seg(b"\\._SB_FOO_"), Some(NameSeg(*b"FOO_")));
        assert_eq!(last_name_seg(b"^BAR_"), Some(NameSeg(*b"BAR_")));
        assert_eq!(last_name_seg(b"\\\x00"), None);
    }
}
