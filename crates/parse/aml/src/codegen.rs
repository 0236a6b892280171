//! Builders for common ASL constructs.
//!
//! Each builder creates a small subtree and, when given a parent, appends it
//! to the parent's variable argument list. If the append fails the new
//! subtree is freed again, so a failed call leaves no detached nodes behind.

use log::trace;

use crate::namestring;
use crate::opcode::OpCode;
use crate::resource;
use crate::tree::{AmlTree, DataType, NodeId};
use crate::AmlError;

impl AmlTree {
    fn attach_or_free(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let Some(parent) = parent else {
            return Ok(node);
        };
        match self.var_list_add_tail(parent, node) {
            Ok(()) => Ok(node),
            Err(err) => {
                self.free_subtree(node);
                Err(err)
            }
        }
    }

    fn name_node(&mut self, asl: &str) -> Result<NodeId, AmlError> {
        let aml = namestring::asl_to_aml(asl)?;
        self.create_data(DataType::NameString, &aml)
    }

    /// Builds a named object with a single NameString argument and an empty
    /// term list (`Scope`, `Device`, ...).
    fn code_gen_named_scope(&mut self, op: OpCode, name: &str, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let name_node = self.name_node(name)?;
        let node = match self.create_object(op, &[name_node]) {
            Ok(node) => node,
            Err(err) => {
                self.free_subtree(name_node);
                return Err(err);
            }
        };
        trace!("aml: generated {} {name}", self.object_encoding(node)?.name);
        self.attach_or_free(node, parent)
    }

    /// Builds the smallest integer object holding `value`: `Zero`, `One` or
    /// one of the integer prefixes.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::OutOfMemory`].
    pub fn code_gen_integer(&mut self, value: u64) -> Result<NodeId, AmlError> {
        let node = self.create_object(OpCode::ZERO, &[])?;
        if let Err(err) = self.update_integer(node, value) {
            self.free_subtree(node);
            return Err(err);
        }
        Ok(node)
    }

    /// Builds a `StringPrefix` object.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `value` contains a NUL or a
    /// non-ASCII character.
    pub fn code_gen_string(&mut self, value: &str) -> Result<NodeId, AmlError> {
        if !value.bytes().all(|b| (0x01..=0x7F).contains(&b)) {
            return Err(AmlError::InvalidArgument);
        }
        let mut bytes = alloc::vec::Vec::new();
        bytes.try_reserve_exact(value.len() + 1)?;
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        let data = self.create_data(DataType::String, &bytes)?;
        self.create_object(OpCode::STRING, &[data]).inspect_err(|_| self.free_subtree(data))
    }

    /// `Scope (name) {}`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a malformed name or parent.
    pub fn code_gen_scope(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        self.code_gen_named_scope(OpCode::SCOPE, name, parent)
    }

    /// `Device (name) {}`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a malformed name or parent.
    pub fn code_gen_device(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        self.code_gen_named_scope(OpCode::DEVICE, name, parent)
    }

    fn code_gen_name(&mut self, name: &str, value: NodeId, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let name_node = match self.name_node(name) {
            Ok(node) => node,
            Err(err) => {
                self.free_subtree(value);
                return Err(err);
            }
        };
        let node = match self.create_object(OpCode::NAME, &[name_node, value]) {
            Ok(node) => node,
            Err(err) => {
                self.free_subtree(name_node);
                self.free_subtree(value);
                return Err(err);
            }
        };
        self.attach_or_free(node, parent)
    }

    /// `Name (name, value)` with an integer value.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a malformed name or parent.
    pub fn code_gen_name_integer(&mut self, name: &str, value: u64, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let value = self.code_gen_integer(value)?;
        self.code_gen_name(name, value, parent)
    }

    /// `Name (name, "value")`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a malformed name, string or
    /// parent.
    pub fn code_gen_name_string(&mut self, name: &str, value: &str, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let value = self.code_gen_string(value)?;
        self.code_gen_name(name, value, parent)
    }

    /// `Name (name, ResourceTemplate () {})`.
    ///
    /// The template `Buffer` is fixed argument 1 of the returned node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for a malformed name or parent.
    pub fn code_gen_name_resource_template(&mut self, name: &str, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let template = self.code_gen_resource_template(None)?;
        self.code_gen_name(name, template, parent)
    }

    /// An empty resource template: `Buffer (2) { EndTag }`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] for an unsuitable parent, or
    /// [`AmlError::OutOfMemory`].
    pub fn code_gen_resource_template(&mut self, parent: Option<NodeId>) -> Result<NodeId, AmlError> {
        let size = self.code_gen_integer(2)?;
        let buffer = self
            .create_object(OpCode::BUFFER, &[size])
            .inspect_err(|_| self.free_subtree(size))?;
        let end_tag = match self.code_gen_end_tag(0) {
            Ok(node) => node,
            Err(err) => {
                self.free_subtree(buffer);
                return Err(err);
            }
        };
        if let Err(err) = self.var_list_add_tail(buffer, end_tag) {
            self.free_subtree(end_tag);
            self.free_subtree(buffer);
            return Err(err);
        }
        self.attach_or_free(buffer, parent)
    }

    /// A detached EndTag resource data node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::OutOfMemory`].
    pub fn code_gen_end_tag(&mut self, checksum: u8) -> Result<NodeId, AmlError> {
        self.create_data(DataType::ResourceData, &resource::encode_end_tag(checksum))
    }

    /// `Method (name, arg_count, serialized, sync_level) { Return (value) }`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `arg_count` exceeds 7,
    /// `sync_level` exceeds 15, or the name or parent is unsuitable.
    pub fn code_gen_method_ret_integer(
        &mut self,
        name: &str,
        value: u64,
        arg_count: u8,
        serialized: bool,
        sync_level: u8,
        parent: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        if arg_count > 7 || sync_level > 15 {
            return Err(AmlError::InvalidArgument);
        }
        let flags = arg_count | (u8::from(serialized) << 3) | (sync_level << 4);

        let name_node = self.name_node(name)?;
        let flags_node = self
            .create_data(DataType::UInt, &[flags])
            .inspect_err(|_| self.free_subtree(name_node))?;
        let method = match self.create_object(OpCode::METHOD, &[name_node, flags_node]) {
            Ok(node) => node,
            Err(err) => {
                self.free_subtree(name_node);
                self.free_subtree(flags_node);
                return Err(err);
            }
        };

        let body = self.code_gen_return_integer(value);
        match body {
            Ok(ret) => {
                // A fresh Method always accepts an object.
                if let Err(err) = self.var_list_add_tail(method, ret) {
                    self.free_subtree(ret);
                    self.free_subtree(method);
                    return Err(err);
                }
            }
            Err(err) => {
                self.free_subtree(method);
                return Err(err);
            }
        }
        self.attach_or_free(method, parent)
    }

    fn code_gen_return_integer(&mut self, value: u64) -> Result<NodeId, AmlError> {
        let value = self.code_gen_integer(value)?;
        self.create_object(OpCode::RETURN, &[value])
            .inspect_err(|_| self.free_subtree(value))
    }

    fn code_gen_rd(&mut self, bytes: &[u8], template: Option<NodeId>) -> Result<NodeId, AmlError> {
        let node = self.create_data(DataType::ResourceData, bytes)?;
        let Some(template) = template else {
            return Ok(node);
        };
        match self.append_resource_data_node(template, node) {
            Ok(()) => Ok(node),
            Err(err) => {
                self.free_subtree(node);
                Err(err)
            }
        }
    }

    /// `Memory32Fixed (ReadWrite|ReadOnly, base, length)`, appended to
    /// `template` if given.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `template` is not a resource
    /// template.
    pub fn code_gen_rd_memory32_fixed(
        &mut self,
        writable: bool,
        base: u32,
        length: u32,
        template: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        self.code_gen_rd(&resource::encode_fixed_memory32(writable, base, length), template)
    }

    /// `Interrupt (...) { gsi }`, appended to `template` if given.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `template` is not a resource
    /// template.
    pub fn code_gen_rd_interrupt(
        &mut self,
        consumer: bool,
        edge_triggered: bool,
        active_low: bool,
        shared: bool,
        gsi: u32,
        template: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        let bytes = resource::encode_extended_irq(consumer, edge_triggered, active_low, shared, gsi);
        self.code_gen_rd(&bytes, template)
    }

    /// `IO (Decode16|Decode10, min, max, alignment, length)`, appended to
    /// `template` if given.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `min > max` or `template` is
    /// not a resource template.
    pub fn code_gen_rd_io(
        &mut self,
        decode16: bool,
        min: u16,
        max: u16,
        alignment: u8,
        length: u8,
        template: Option<NodeId>,
    ) -> Result<NodeId, AmlError> {
        if min > max {
            return Err(AmlError::InvalidArgument);
        }
        self.code_gen_rd(&resource::encode_io(decode16, min, max, alignment, length), template)
    }
}
