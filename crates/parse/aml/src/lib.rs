//! `hadron-aml` --- a mutable, `no_std` tree for ACPI Machine Language.
//!
//! This crate holds an ACPI definition block (the body of a DSDT or SSDT) as
//! an in-memory tree that can be built, navigated, edited and written back
//! out as a checksummed table. It does not evaluate AML; it only keeps the
//! bytecode structure.
//!
//! The tree lives in an [`AmlTree`] arena. Nodes are addressed by [`NodeId`]
//! and come in three kinds:
//!
//! - the **root**, holding the SDT header and the top-level term list,
//! - **object** nodes, one per AML opcode, with a fixed set of opcode-defined
//!   arguments and an open-ended variable argument list,
//! - **data** nodes, holding raw payloads (names, strings, integers, buffer
//!   contents, resource descriptors).
//!
//! The [`namestring`] module converts object paths between their ASL text
//! form and their AML byte form.
//!
//! # Usage
//!
//! ```ignore
//! let mut tree = AmlTree::parse(ssdt_bytes)?;
//! let root = tree.root();
//! let scope = tree.code_gen_scope("\\_SB", Some(root))?;
//! tree.code_gen_device("COM1", Some(scope))?;
//! let table = tree.serialize(root)?;
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod codegen;
pub mod namestring;
pub mod opcode;
pub mod parser;
pub mod path;
pub mod pkglen;
pub mod resource;
pub mod sdt;
pub mod serialize;
pub mod tree;

pub use namestring::{NameStringInfo, NameStringRef};
pub use opcode::{OpAttributes, OpCode, OpEncoding};
pub use parser::ParseOptions;
pub use path::{AmlPath, NameSeg};
pub use resource::{AcpiResource, ResourceDescriptorId};
pub use sdt::SdtHeader;
pub use tree::{AmlTree, DataType, NodeId, NodeType, ObjectInfo};

/// Maximum number of fixed arguments any AML opcode takes.
pub const MAX_FIXED_ARGS: usize = 6;

/// Default limit on object nesting accepted by the parser.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Errors returned by the AML tree and NameString codec.
///
/// A failed operation never leaves a tree partially modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmlError {
    /// An argument was malformed or of the wrong node kind.
    #[error("invalid argument")]
    InvalidArgument,
    /// The supplied output buffer is too small.
    #[error("buffer too small, {required} bytes required")]
    BufferTooSmall {
        /// Number of bytes the call needs.
        required: usize,
    },
    /// An allocation failed.
    #[error("out of memory")]
    OutOfMemory,
    /// The operation is not valid for the node's concrete kind.
    #[error("unsupported operation")]
    Unsupported,
    /// The AML stream ended unexpectedly.
    #[error("unexpected end of AML stream")]
    UnexpectedEnd,
    /// A PkgLength encoding was invalid.
    #[error("invalid PkgLength encoding")]
    InvalidPkgLength,
    /// The AML bytecode contained an invalid or unsupported construct.
    #[error("invalid or unsupported AML")]
    InvalidAml,
}

impl From<alloc::collections::TryReserveError> for AmlError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
