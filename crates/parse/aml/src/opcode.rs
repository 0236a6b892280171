//! AML opcode encoding table.
//!
//! Every object node refers to one [`OpEncoding`], which records the opcode
//! bytes, the format of each fixed argument, and attribute flags describing
//! what follows the fixed arguments (a PkgLength, a term list, a byte list,
//! a field list).
//!
//! See ACPI 6.5 section 20 for the grammar.

use bitflags::bitflags;

/// Prefix byte of the extended (two-byte) opcodes.
pub const EXT_OP_PREFIX: u8 = 0x5B;

bitflags! {
    /// Structural attributes of an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpAttributes: u16 {
        /// A PkgLength follows the opcode bytes.
        const HAS_PKG_LENGTH = 1 << 0;
        /// A term list or package element list follows the fixed arguments.
        const HAS_CHILD_OBJ  = 1 << 1;
        /// A byte list follows the fixed arguments (`Buffer`).
        const HAS_BYTE_LIST  = 1 << 2;
        /// A field list follows the fixed arguments.
        const HAS_FIELD_LIST = 1 << 3;
        /// The object defines a name in the ACPI namespace.
        const IN_NAMESPACE   = 1 << 4;
        /// Names inside the variable argument list are relative to this object.
        const OPENS_SCOPE    = 1 << 5;
        /// Encoded as `ExtOpPrefix` + sub opcode.
        const IS_SUB_OP      = 1 << 6;
        /// No bytes of its own are emitted; only its arguments are.
        const PSEUDO         = 1 << 7;
    }
}

/// Format of a fixed argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgFormat {
    /// `ByteData`.
    UInt8,
    /// `WordData`.
    UInt16,
    /// `DWordData`.
    UInt32,
    /// `QWordData`.
    UInt64,
    /// A NameString.
    NameString,
    /// A NUL-terminated ASCII string.
    String,
    /// A nested object: TermArg, SuperName, Target or DataRefObject.
    Object,
}

impl ArgFormat {
    /// Payload size for the fixed-width integer formats.
    #[must_use]
    pub const fn int_size(self) -> Option<usize> {
        match self {
            Self::UInt8 => Some(1),
            Self::UInt16 => Some(2),
            Self::UInt32 => Some(4),
            Self::UInt64 => Some(8),
            _ => None,
        }
    }
}

/// An AML opcode: the first byte, and the second byte for extended opcodes
/// (0 otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpCode {
    /// First opcode byte.
    pub op: u8,
    /// Second byte of an `ExtOpPrefix` opcode, 0 otherwise.
    pub sub_op: u8,
}

impl OpCode {
    /// `ZeroOp`.
    pub const ZERO: Self = Self::new(0x00);
    /// `OneOp`.
    pub const ONE: Self = Self::new(0x01);
    /// `AliasOp`.
    pub const ALIAS: Self = Self::new(0x06);
    /// `NameOp`.
    pub const NAME: Self = Self::new(0x08);
    /// `BytePrefix`.
    pub const BYTE: Self = Self::new(0x0A);
    /// `WordPrefix`.
    pub const WORD: Self = Self::new(0x0B);
    /// `DWordPrefix`.
    pub const DWORD: Self = Self::new(0x0C);
    /// `StringPrefix`.
    pub const STRING: Self = Self::new(0x0D);
    /// `QWordPrefix`.
    pub const QWORD: Self = Self::new(0x0E);
    /// `ScopeOp`.
    pub const SCOPE: Self = Self::new(0x10);
    /// `BufferOp`.
    pub const BUFFER: Self = Self::new(0x11);
    /// `PackageOp`.
    pub const PACKAGE: Self = Self::new(0x12);
    /// `VarPackageOp`.
    pub const VAR_PACKAGE: Self = Self::new(0x13);
    /// `MethodOp`.
    pub const METHOD: Self = Self::new(0x14);
    /// `ExternalOp`.
    pub const EXTERNAL: Self = Self::new(0x15);
    /// `MutexOp`.
    pub const MUTEX: Self = Self::ext(0x01);
    /// `OpRegionOp`.
    pub const OP_REGION: Self = Self::ext(0x80);
    /// `FieldOp`.
    pub const FIELD: Self = Self::ext(0x81);
    /// `DeviceOp`.
    pub const DEVICE: Self = Self::ext(0x82);
    /// `ProcessorOp`.
    pub const PROCESSOR: Self = Self::ext(0x83);
    /// `PowerResOp`.
    pub const POWER_RES: Self = Self::ext(0x84);
    /// `ThermalZoneOp`.
    pub const THERMAL_ZONE: Self = Self::ext(0x85);
    /// `Local0Op`.
    pub const LOCAL0: Self = Self::new(0x60);
    /// `Arg0Op`.
    pub const ARG0: Self = Self::new(0x68);
    /// `StoreOp`.
    pub const STORE: Self = Self::new(0x70);
    /// `NotifyOp`.
    pub const NOTIFY: Self = Self::new(0x86);
    /// `IfOp`.
    pub const IF: Self = Self::new(0xA0);
    /// `ElseOp`.
    pub const ELSE: Self = Self::new(0xA1);
    /// `WhileOp`.
    pub const WHILE: Self = Self::new(0xA2);
    /// `ReturnOp`.
    pub const RETURN: Self = Self::new(0xA4);
    /// `OnesOp`.
    pub const ONES: Self = Self::new(0xFF);
    /// Pseudo opcode for a call to a method with arguments.
    pub const METHOD_INVOCATION: Self = Self::new(0xD0);

    /// A single-byte opcode.
    #[must_use]
    pub const fn new(op: u8) -> Self {
        Self { op, sub_op: 0 }
    }

    /// An `ExtOpPrefix` opcode.
    #[must_use]
    pub const fn ext(sub_op: u8) -> Self {
        Self {
            op: EXT_OP_PREFIX,
            sub_op,
        }
    }

    /// `true` for the opcodes whose value [`crate::AmlTree::update_integer`]
    /// can rewrite.
    #[must_use]
    pub const fn is_updatable_integer(self) -> bool {
        self.sub_op == 0 && matches!(self.op, 0x00 | 0x01 | 0x0A | 0x0B | 0x0C | 0x0E)
    }
}

/// Encoding rules for one opcode.
#[derive(Debug)]
pub struct OpEncoding {
    /// ASL-ish name used in logs.
    pub name: &'static str,
    /// The opcode bytes.
    pub op_code: OpCode,
    /// Formats of the fixed arguments, in order.
    pub formats: &'static [ArgFormat],
    /// Structural attributes.
    pub attributes: OpAttributes,
    /// Index of the fixed argument that holds the defined name, meaningful
    /// only with [`OpAttributes::IN_NAMESPACE`].
    pub name_index: u8,
}

impl OpEncoding {
    const fn op(name: &'static str, op: u8, formats: &'static [ArgFormat], attributes: OpAttributes) -> Self {
        Self {
            name,
            op_code: OpCode::new(op),
            formats,
            attributes,
            name_index: 0,
        }
    }

    const fn ext(name: &'static str, sub_op: u8, formats: &'static [ArgFormat], attributes: OpAttributes) -> Self {
        Self {
            name,
            op_code: OpCode::ext(sub_op),
            formats,
            attributes: attributes.union(OpAttributes::IS_SUB_OP),
            name_index: 0,
        }
    }

    const fn named_at(mut self, index: u8) -> Self {
        self.name_index = index;
        self
    }

    /// Looks up the encoding of an opcode, pseudo opcodes included.
    #[must_use]
    pub fn lookup(op_code: OpCode) -> Option<&'static Self> {
        OP_ENCODINGS.iter().find(|enc| enc.op_code == op_code)
    }

    /// Looks up the encoding of an opcode read from a bytestream.
    ///
    /// Pseudo opcodes are never matched.
    #[must_use]
    pub fn from_stream(op_code: OpCode) -> Option<&'static Self> {
        Self::lookup(op_code).filter(|enc| !enc.attributes.contains(OpAttributes::PSEUDO))
    }

    /// Number of fixed arguments.
    #[must_use]
    pub fn fixed_arg_count(&self) -> u8 {
        // The table never holds more than `MAX_FIXED_ARGS` formats.
        self.formats.len() as u8
    }

    /// `true` if the opcode is followed by a PkgLength.
    #[must_use]
    pub fn has_pkg_length(&self) -> bool {
        self.attributes.contains(OpAttributes::HAS_PKG_LENGTH)
    }

    /// `true` if the opcode has a variable argument list.
    #[must_use]
    pub fn has_var_args(&self) -> bool {
        self.attributes.intersects(
            OpAttributes::HAS_CHILD_OBJ | OpAttributes::HAS_BYTE_LIST | OpAttributes::HAS_FIELD_LIST,
        )
    }

    /// `true` if the opcode defines a name in the namespace.
    #[must_use]
    pub fn is_namespace_node(&self) -> bool {
        self.attributes.contains(OpAttributes::IN_NAMESPACE)
    }

    /// `true` if the opcode is a pseudo opcode with no bytes of its own.
    #[must_use]
    pub fn is_pseudo(&self) -> bool {
        self.attributes.contains(OpAttributes::PSEUDO)
    }

    /// Number of opcode bytes emitted before the PkgLength.
    #[must_use]
    pub fn op_size(&self) -> usize {
        if self.is_pseudo() {
            0
        } else if self.attributes.contains(OpAttributes::IS_SUB_OP) {
            2
        } else {
            1
        }
    }
}

use ArgFormat::{NameString as N, Object as O, String as S, UInt8 as U8, UInt16 as U16, UInt32 as U32, UInt64 as U64};

const NONE: OpAttributes = OpAttributes::empty();
const PKG: OpAttributes = OpAttributes::HAS_PKG_LENGTH;
const NS: OpAttributes = OpAttributes::IN_NAMESPACE;
const SCOPE: OpAttributes = OpAttributes::HAS_PKG_LENGTH
    .union(OpAttributes::HAS_CHILD_OBJ)
    .union(OpAttributes::IN_NAMESPACE)
    .union(OpAttributes::OPENS_SCOPE);
const BLOCK: OpAttributes = OpAttributes::HAS_PKG_LENGTH.union(OpAttributes::HAS_CHILD_OBJ);
const FIELDS: OpAttributes = OpAttributes::HAS_PKG_LENGTH.union(OpAttributes::HAS_FIELD_LIST);

/// Every opcode the tree understands.
pub static OP_ENCODINGS: &[OpEncoding] = &[
    OpEncoding::op("Zero", 0x00, &[], NONE),
    OpEncoding::op("One", 0x01, &[], NONE),
    OpEncoding::op("Alias", 0x06, &[N, N], NS).named_at(1),
    OpEncoding::op("Name", 0x08, &[N, O], NS),
    OpEncoding::op("BytePrefix", 0x0A, &[U8], NONE),
    OpEncoding::op("WordPrefix", 0x0B, &[U16], NONE),
    OpEncoding::op("DWordPrefix", 0x0C, &[U32], NONE),
    OpEncoding::op("StringPrefix", 0x0D, &[S], NONE),
    OpEncoding::op("QWordPrefix", 0x0E, &[U64], NONE),
    OpEncoding::op("Scope", 0x10, &[N], SCOPE),
    OpEncoding::op("Buffer", 0x11, &[O], PKG.union(OpAttributes::HAS_BYTE_LIST)),
    OpEncoding::op("Package", 0x12, &[U8], BLOCK),
    OpEncoding::op("VarPackage", 0x13, &[O], BLOCK),
    OpEncoding::op("Method", 0x14, &[N, U8], SCOPE),
    OpEncoding::op("External", 0x15, &[N, U8, U8], NONE),
    OpEncoding::ext("Mutex", 0x01, &[N, U8], NS),
    OpEncoding::ext("Event", 0x02, &[N], NS),
    OpEncoding::ext("CondRefOf", 0x12, &[O, O], NONE),
    OpEncoding::ext("CreateField", 0x13, &[O, O, O, N], NS).named_at(3),
    OpEncoding::ext("LoadTable", 0x1F, &[O, O, O, O, O, O], NONE),
    OpEncoding::ext("Load", 0x20, &[N, O], NONE),
    OpEncoding::ext("Stall", 0x21, &[O], NONE),
    OpEncoding::ext("Sleep", 0x22, &[O], NONE),
    OpEncoding::ext("Acquire", 0x23, &[O, U16], NONE),
    OpEncoding::ext("Signal", 0x24, &[O], NONE),
    OpEncoding::ext("Wait", 0x25, &[O, O], NONE),
    OpEncoding::ext("Reset", 0x26, &[O], NONE),
    OpEncoding::ext("Release", 0x27, &[O], NONE),
    OpEncoding::ext("FromBCD", 0x28, &[O, O], NONE),
    OpEncoding::ext("ToBCD", 0x29, &[O, O], NONE),
    OpEncoding::ext("Unload", 0x2A, &[O], NONE),
    OpEncoding::ext("Revision", 0x30, &[], NONE),
    OpEncoding::ext("Debug", 0x31, &[], NONE),
    OpEncoding::ext("Fatal", 0x32, &[U8, U32, O], NONE),
    OpEncoding::ext("Timer", 0x33, &[], NONE),
    OpEncoding::ext("OperationRegion", 0x80, &[N, U8, O, O], NS),
    OpEncoding::ext("Field", 0x81, &[N, U8], FIELDS),
    OpEncoding::ext("Device", 0x82, &[N], SCOPE),
    OpEncoding::ext("Processor", 0x83, &[N, U8, U32, U8], SCOPE),
    OpEncoding::ext("PowerResource", 0x84, &[N, U8, U16], SCOPE),
    OpEncoding::ext("ThermalZone", 0x85, &[N], SCOPE),
    OpEncoding::ext("IndexField", 0x86, &[N, N, U8], FIELDS),
    OpEncoding::ext("BankField", 0x87, &[N, N, O, U8], FIELDS),
    OpEncoding::ext("DataTableRegion", 0x88, &[N, O, O, O], NS),
    OpEncoding::op("Local0", 0x60, &[], NONE),
    OpEncoding::op("Local1", 0x61, &[], NONE),
    OpEncoding::op("Local2", 0x62, &[], NONE),
    OpEncoding::op("Local3", 0x63, &[], NONE),
    OpEncoding::op("Local4", 0x64, &[], NONE),
    OpEncoding::op("Local5", 0x65, &[], NONE),
    OpEncoding::op("Local6", 0x66, &[], NONE),
    OpEncoding::op("Local7", 0x67, &[], NONE),
    OpEncoding::op("Arg0", 0x68, &[], NONE),
    OpEncoding::op("Arg1", 0x69, &[], NONE),
    OpEncoding::op("Arg2", 0x6A, &[], NONE),
    OpEncoding::op("Arg3", 0x6B, &[], NONE),
    OpEncoding::op("Arg4", 0x6C, &[], NONE),
    OpEncoding::op("Arg5", 0x6D, &[], NONE),
    OpEncoding::op("Arg6", 0x6E, &[], NONE),
    OpEncoding::op("Store", 0x70, &[O, O], NONE),
    OpEncoding::op("RefOf", 0x71, &[O], NONE),
    OpEncoding::op("Add", 0x72, &[O, O, O], NONE),
    OpEncoding::op("Concatenate", 0x73, &[O, O, O], NONE),
    OpEncoding::op("Subtract", 0x74, &[O, O, O], NONE),
    OpEncoding::op("Increment", 0x75, &[O], NONE),
    OpEncoding::op("Decrement", 0x76, &[O], NONE),
    OpEncoding::op("Multiply", 0x77, &[O, O, O], NONE),
    OpEncoding::op("Divide", 0x78, &[O, O, O, O], NONE),
    OpEncoding::op("ShiftLeft", 0x79, &[O, O, O], NONE),
    OpEncoding::op("ShiftRight", 0x7A, &[O, O, O], NONE),
    OpEncoding::op("And", 0x7B, &[O, O, O], NONE),
    OpEncoding::op("NAnd", 0x7C, &[O, O, O], NONE),
    OpEncoding::op("Or", 0x7D, &[O, O, O], NONE),
    OpEncoding::op("NOr", 0x7E, &[O, O, O], NONE),
    OpEncoding::op("XOr", 0x7F, &[O, O, O], NONE),
    OpEncoding::op("Not", 0x80, &[O, O], NONE),
    OpEncoding::op("FindSetLeftBit", 0x81, &[O, O], NONE),
    OpEncoding::op("FindSetRightBit", 0x82, &[O, O], NONE),
    OpEncoding::op("DerefOf", 0x83, &[O], NONE),
    OpEncoding::op("ConcatenateResTemplate", 0x84, &[O, O, O], NONE),
    OpEncoding::op("Mod", 0x85, &[O, O, O], NONE),
    OpEncoding::op("Notify", 0x86, &[O, O], NONE),
    OpEncoding::op("SizeOf", 0x87, &[O], NONE),
    OpEncoding::op("Index", 0x88, &[O, O, O], NONE),
    OpEncoding::op("Match", 0x89, &[O, U8, O, U8, O, O], NONE),
    OpEncoding::op("CreateDWordField", 0x8A, &[O, O, N], NS).named_at(2),
    OpEncoding::op("CreateWordField", 0x8B, &[O, O, N], NS).named_at(2),
    OpEncoding::op("CreateByteField", 0x8C, &[O, O, N], NS).named_at(2),
    OpEncoding::op("CreateBitField", 0x8D, &[O, O, N], NS).named_at(2),
    OpEncoding::op("ObjectType", 0x8E, &[O], NONE),
    OpEncoding::op("CreateQWordField", 0x8F, &[O, O, N], NS).named_at(2),
    OpEncoding::op("LAnd", 0x90, &[O, O], NONE),
    OpEncoding::op("LOr", 0x91, &[O, O], NONE),
    OpEncoding::op("LNot", 0x92, &[O], NONE),
    OpEncoding::op("LEqual", 0x93, &[O, O], NONE),
    OpEncoding::op("LGreater", 0x94, &[O, O], NONE),
    OpEncoding::op("LLess", 0x95, &[O, O], NONE),
    OpEncoding::op("ToBuffer", 0x96, &[O, O], NONE),
    OpEncoding::op("ToDecimalString", 0x97, &[O, O], NONE),
    OpEncoding::op("ToHexString", 0x98, &[O, O], NONE),
    OpEncoding::op("ToInteger", 0x99, &[O, O], NONE),
    OpEncoding::op("ToString", 0x9C, &[O, O, O], NONE),
    OpEncoding::op("CopyObject", 0x9D, &[O, O], NONE),
    OpEncoding::op("Mid", 0x9E, &[O, O, O, O], NONE),
    OpEncoding::op("Continue", 0x9F, &[], NONE),
    OpEncoding::op("If", 0xA0, &[O], BLOCK),
    OpEncoding::op("Else", 0xA1, &[], BLOCK),
    OpEncoding::op("While", 0xA2, &[O], BLOCK),
    OpEncoding::op("Noop", 0xA3, &[], NONE),
    OpEncoding::op("Return", 0xA4, &[O], NONE),
    OpEncoding::op("Break", 0xA5, &[], NONE),
    OpEncoding::op("BreakPoint", 0xCC, &[], NONE),
    OpEncoding::op("Ones", 0xFF, &[], NONE),
    OpEncoding::op(
        "MethodInvocation",
        0xD0,
        &[N],
        OpAttributes::HAS_CHILD_OBJ.union(OpAttributes::PSEUDO),
    ),
];

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::MAX_FIXED_ARGS;

    #[test]
    fn table_is_consistent() {
        for (i, enc) in OP_ENCODINGS.iter().enumerate() {
            assert!(enc.formats.len() <= MAX_FIXED_ARGS, "{}", enc.name);
            if enc.is_namespace_node() {
                assert_eq!(enc.formats[usize::from(enc.name_index)], ArgFormat::NameString, "{}", enc.name);
            }
            for other in &OP_ENCODINGS[i + 1..] {
                assert_ne!(enc.op_code, other.op_code, "duplicate {}", enc.name);
            }
        }
    }

    #[test]
    fn lookup_ext_and_plain() {
        let dev = OpEncoding::lookup(OpCode::DEVICE).unwrap();
        assert_eq!(dev.name, "Device");
        assert_eq!(dev.op_size(), 2);
        assert!(dev.has_pkg_length());
        assert!(dev.is_namespace_node());

        let name = OpEncoding::lookup(OpCode::NAME).unwrap();
        assert_eq!(name.fixed_arg_count(), 2);
        assert!(!name.has_var_args());

        let unload = OpEncoding::from_stream(OpCode::ext(0x2A)).unwrap();
        assert_eq!(unload.name, "Unload");
        assert_eq!(unload.fixed_arg_count(), 1);
    }

    #[test]
    fn pseudo_ops_are_not_read_from_streams() {
        assert!(OpEncoding::lookup(OpCode::METHOD_INVOCATION).is_some());
        assert!(OpEncoding::from_stream(OpCode::METHOD_INVOCATION).is_none());
    }

    #[test]
    fn updatable_integers() {
        assert!(OpCode::BYTE.is_updatable_integer());
        assert!(OpCode::ZERO.is_updatable_integer());
        assert!(!OpCode::ONES.is_updatable_integer());
        assert!(!OpCode::MUTEX.is_updatable_integer());
    }
}
