//! End-to-end tests: build, parse, edit and serialize whole tables.

#![allow(missing_docs)]

use std::collections::HashSet;

use hadron_aml::resource::ResourceDescriptorId;
use hadron_aml::sdt::{self, SdtHeader};
use hadron_aml::{AcpiResource, AmlError, AmlTree, DataType, NodeId, NodeType, OpCode};

fn header() -> SdtHeader {
    SdtHeader::new(*b"SSDT", 2, *b"HADRON", *b"AMLTREE ", 1)
}

/// Wraps a term list in a checksummed table.
fn table(body: &[u8]) -> Vec<u8> {
    let mut header = header();
    header.length = u32::try_from(SdtHeader::SIZE + body.len()).unwrap();
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(body);
    sdt::update_checksum(&mut bytes);
    bytes
}

/// `Device (_SB.COM1)` with `_HID` and a `_CRS` holding an interrupt and an
/// I/O range.
const COM1_DEVICE: [u8; 50] = [
    0x5B, 0x82, 0x30, 0x2E, 0x5F, 0x53, 0x42, 0x5F, 0x43, 0x4F, 0x4D, 0x31, 0x08, 0x5F, 0x48, 0x49, 0x44, 0x0C,
    0x41, 0xD0, 0x05, 0x01, 0x08, 0x5F, 0x43, 0x52, 0x53, 0x11, 0x16, 0x0A, 0x13, 0x89, 0x06, 0x00, 0x03, 0x01,
    0x04, 0x00, 0x00, 0x00, 0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x00, 0x08, 0x79, 0x00,
];

fn build_com1(tree: &mut AmlTree, parent: Option<NodeId>) -> NodeId {
    let dev = tree.code_gen_device("_SB.COM1", parent).unwrap();
    tree.code_gen_name_integer("_HID", 0x0105_D041, Some(dev)).unwrap();
    let crs = tree.code_gen_name_resource_template("_CRS", Some(dev)).unwrap();
    let buffer = tree.fixed_argument(crs, 1).unwrap();
    tree.code_gen_rd_interrupt(true, true, false, false, 4, Some(buffer)).unwrap();
    tree.code_gen_rd_io(true, 0x3F8, 0x3F8, 0, 8, Some(buffer)).unwrap();
    dev
}

#[test]
fn generated_device_matches_known_bytes() {
    let mut tree = AmlTree::new(header());
    let dev = build_com1(&mut tree, None);
    assert_eq!(tree.serialize(dev).unwrap(), COM1_DEVICE);
}

#[test]
fn generated_scope_matches_known_bytes() {
    let expected = [
        0x10, 0x21, 0x2E, 0x5F, 0x53, 0x42, 0x5F, 0x4D, 0x42, 0x52, 0x44, 0x08, 0x5F, 0x43, 0x52, 0x53, 0x11, 0x11,
        0x0A, 0x0E, 0x86, 0x09, 0x00, 0x01, 0x00, 0x00, 0x00, 0xE8, 0x00, 0x00, 0x00, 0x10, 0x79, 0x00,
    ];
    let mut tree = AmlTree::new(header());
    let scope = tree.code_gen_scope("_SB.MBRD", None).unwrap();
    let crs = tree.code_gen_name_resource_template("_CRS", Some(scope)).unwrap();
    let buffer = tree.fixed_argument(crs, 1).unwrap();
    tree.code_gen_rd_memory32_fixed(true, 0xE800_0000, 0x1000_0000, Some(buffer)).unwrap();
    assert_eq!(tree.serialize(scope).unwrap(), expected);
}

#[test]
fn known_table_round_trips() {
    let bytes = table(&COM1_DEVICE);
    let tree = AmlTree::parse(&bytes).unwrap();
    assert_eq!(tree.serialize(tree.root()).unwrap(), bytes);

    let dev = tree.first_variable_argument(tree.root()).unwrap();
    assert_eq!(tree.asl_path_name(dev).unwrap(), "\\_SB_.COM1");
    let crs = tree.find_node(tree.root(), "\\_SB.COM1._CRS").unwrap().unwrap();
    let buffer = tree.fixed_argument(crs, 1).unwrap();
    let kinds: Vec<_> = tree
        .variable_arguments(buffer)
        .iter()
        .map(|&rd| tree.resource_data_type(rd).unwrap())
        .collect();
    assert_eq!(
        kinds,
        [ResourceDescriptorId::EXTENDED_IRQ, ResourceDescriptorId::IO, ResourceDescriptorId::END_TAG]
    );
    assert_eq!(
        tree.template_resources(buffer).unwrap(),
        [
            AcpiResource::ExtendedIrq {
                gsi: 4,
                edge_triggered: true,
                active_low: false,
            },
            AcpiResource::Io {
                base: 0x3F8,
                length: 8,
            },
        ]
    );
    assert_eq!(tree.template_resources(crs), Err(AmlError::InvalidArgument));
}

/// Builds a table touching every kind of variable argument list.
fn build_rich_table() -> AmlTree {
    let mut tree = AmlTree::new(header());
    let root = tree.root();
    let sb = tree.code_gen_scope("\\_SB", Some(root)).unwrap();
    let pci = tree.code_gen_device("PCI0", Some(sb)).unwrap();
    tree.code_gen_name_string("_UID", "pci-root", Some(pci)).unwrap();

    // OperationRegion (REG0, SystemMemory, 0x1000, 0x10)
    let reg_name = tree.create_data(DataType::NameString, b"REG0").unwrap();
    let space = tree.create_data(DataType::UInt, &[0x00]).unwrap();
    let offset = tree.code_gen_integer(0x1000).unwrap();
    let length = tree.code_gen_integer(0x10).unwrap();
    let region = tree.create_object(OpCode::OP_REGION, &[reg_name, space, offset, length]).unwrap();
    tree.var_list_add_tail(pci, region).unwrap();

    // Field (REG0, DWordAcc, NoLock, Preserve) { FLD0, 32 }
    let field_name = tree.create_data(DataType::NameString, b"REG0").unwrap();
    let flags = tree.create_data(DataType::UInt, &[0x03]).unwrap();
    let field = tree.create_object(OpCode::FIELD, &[field_name, flags]).unwrap();
    let units = tree.create_data(DataType::Raw, b"FLD0\x20").unwrap();
    tree.var_list_add_tail(field, units).unwrap();
    tree.var_list_add_tail(pci, field).unwrap();

    // Method (ADD1, 1) { Return (Zero) }
    let add1 = tree.code_gen_method_ret_integer("ADD1", 0, 1, false, 0, Some(pci)).unwrap();
    let ret = tree.first_variable_argument(add1).unwrap();
    let old_value = tree.fixed_argument(ret, 0).unwrap();
    assert_eq!(tree.node_type(old_value), NodeType::Object);

    // Method (_STA) { If (One) { Return (ADD1 (0x0F)) } Else { Return (Zero) } }
    let sta = tree.code_gen_method_ret_integer("_STA", 0, 0, true, 0, Some(pci)).unwrap();
    let cond = tree.code_gen_integer(1).unwrap();
    let if_op = tree.create_object(OpCode::IF, &[cond]).unwrap();
    let callee = tree.create_data(DataType::NameString, b"ADD1").unwrap();
    let call = tree.create_object(OpCode::METHOD_INVOCATION, &[callee]).unwrap();
    let arg = tree.code_gen_integer(0x0F).unwrap();
    tree.var_list_add_tail(call, arg).unwrap();
    let ret_call = tree.create_object(OpCode::RETURN, &[call]).unwrap();
    tree.var_list_add_tail(if_op, ret_call).unwrap();
    let first = tree.first_variable_argument(sta).unwrap();
    tree.var_list_add_before(first, if_op).unwrap();
    let else_op = tree.create_object(OpCode::ELSE, &[]).unwrap();
    tree.var_list_add_after(if_op, else_op).unwrap();
    tree.remove_from_var_arg_list(first).unwrap();
    tree.var_list_add_tail(else_op, first).unwrap();

    // Name (PKG0, Package (2) { One, "str" })
    let count = tree.create_data(DataType::UInt, &[2]).unwrap();
    let package = tree.create_object(OpCode::PACKAGE, &[count]).unwrap();
    let one = tree.code_gen_integer(1).unwrap();
    let s = tree.code_gen_string("str").unwrap();
    tree.var_list_add_tail(package, one).unwrap();
    tree.var_list_add_tail(package, s).unwrap();
    let pkg_name = tree.create_data(DataType::NameString, b"PKG0").unwrap();
    let name = tree.create_object(OpCode::NAME, &[pkg_name, package]).unwrap();
    tree.var_list_add_tail(pci, name).unwrap();

    build_com1(&mut tree, Some(root));
    tree
}

#[test]
fn built_table_round_trips() {
    let tree = build_rich_table();
    let first = tree.serialize(tree.root()).unwrap();
    assert!(sdt::validate_checksum(&first));
    let header = SdtHeader::read_from_bytes(&first).unwrap();
    assert_eq!(header.length as usize, first.len());

    let reparsed = AmlTree::parse(&first).unwrap();
    assert_eq!(reparsed.serialize(reparsed.root()).unwrap(), first);
    assert_eq!(reparsed.subtree_len(reparsed.root()), tree.subtree_len(tree.root()));

    let sta = reparsed.find_node(reparsed.root(), "\\_SB.PCI0._STA").unwrap().unwrap();
    let mut calls = 0;
    reparsed
        .enum_tree(sta, |t, id| {
            if t.object_node_info(id).is_ok_and(|info| info.op_code == OpCode::METHOD_INVOCATION.op) {
                calls += 1;
                assert_eq!(t.variable_arguments(id).len(), 1);
            }
            Ok(true)
        })
        .unwrap();
    assert_eq!(calls, 1);
}

#[test]
fn padded_pkg_length_is_normalized() {
    // Scope (ABCD) {} with a two-byte PkgLength for a 6-byte package.
    let padded = table(&[0x10, 0x46, 0x00, b'A', b'B', b'C', b'D']);
    let tree = AmlTree::parse(&padded).unwrap();
    let out = tree.serialize(tree.root()).unwrap();
    assert_eq!(&out[SdtHeader::SIZE..], &[0x10, 0x05, b'A', b'B', b'C', b'D']);
    assert_eq!(out.len(), padded.len() - 1);

    let again = AmlTree::parse(&out).unwrap();
    assert_eq!(again.serialize(again.root()).unwrap(), out);
}

#[test]
fn edits_keep_table_consistent() {
    let mut tree = AmlTree::parse(&table(&COM1_DEVICE)).unwrap();
    let root = tree.root();
    let dev = tree.first_variable_argument(root).unwrap();
    let before = tree.object_node_info(dev).unwrap().pkg_len;

    tree.code_gen_name_integer("_UID", 0x1234, Some(dev)).unwrap();
    // Name (1) + NameSeg (4) + WordPrefix (3).
    assert_eq!(tree.object_node_info(dev).unwrap().pkg_len, before + 8);

    let crs = tree.find_node(root, "\\_SB.COM1._CRS").unwrap().unwrap();
    let buffer = tree.fixed_argument(crs, 1).unwrap();
    tree.code_gen_rd_memory32_fixed(false, 0xFEC0_0000, 0x1000, Some(buffer)).unwrap();
    let size = tree.fixed_argument(buffer, 0).unwrap();
    assert_eq!(tree.integer_value(size), Ok(0x13 + 12));

    let bytes = tree.serialize(root).unwrap();
    let reparsed = AmlTree::parse(&bytes).unwrap();
    assert_eq!(reparsed.serialize(reparsed.root()).unwrap(), bytes);
    let uid = reparsed.find_node(reparsed.root(), "\\_SB.COM1._UID").unwrap().unwrap();
    assert_eq!(reparsed.integer_value(reparsed.fixed_argument(uid, 1).unwrap()), Ok(0x1234));
}

#[test]
fn removing_a_fixed_argument_changes_nothing() {
    let mut tree = AmlTree::parse(&table(&COM1_DEVICE)).unwrap();
    let root = tree.root();
    let before = tree.serialize(root).unwrap();
    let dev = tree.first_variable_argument(root).unwrap();
    let name = tree.fixed_argument(dev, 0).unwrap();

    assert_eq!(tree.remove_from_var_arg_list(name), Err(AmlError::InvalidArgument));
    assert_eq!(tree.parent(name), Some(dev));
    assert_eq!(tree.serialize(root).unwrap(), before);
}

#[test]
fn append_needs_an_end_tag() {
    let mut tree = AmlTree::new(header());
    // Buffer (2) { 0x01, 0x02 } is not a resource template.
    let size = tree.code_gen_integer(2).unwrap();
    let buffer = tree.create_object(OpCode::BUFFER, &[size]).unwrap();
    let raw = tree.create_data(DataType::Raw, &[0x01, 0x02]).unwrap();
    tree.var_list_add_tail(buffer, raw).unwrap();
    let before = tree.serialize(buffer).unwrap();

    let io = tree.code_gen_rd_io(true, 0x60, 0x60, 1, 1, None).unwrap();
    assert_eq!(tree.append_resource_data_node(buffer, io), Err(AmlError::InvalidArgument));
    assert_eq!(tree.parent(io), None);
    assert_eq!(tree.serialize(buffer).unwrap(), before);

    // An EndTag itself cannot be appended.
    let template = tree.code_gen_resource_template(None).unwrap();
    let end = tree.code_gen_end_tag(0).unwrap();
    assert_eq!(tree.append_resource_data_node(template, end), Err(AmlError::InvalidArgument));
    tree.append_resource_data_node(template, io).unwrap();
}

#[test]
fn append_clears_end_tag_checksum() {
    let mut tree = AmlTree::new(header());
    let template = tree.code_gen_resource_template(None).unwrap();
    let end = tree.first_variable_argument(template).unwrap();
    tree.update_data_node(end, DataType::ResourceData, &[0x79, 0xAB]).unwrap();

    tree.code_gen_rd_io(true, 0x60, 0x60, 1, 1, Some(template)).unwrap();
    assert_eq!(tree.data_node_bytes(end), Ok(&[0x79, 0x00][..]));
    assert_eq!(tree.last_variable_argument(template), Some(end));
}

#[test]
fn enumeration_visits_every_node_once() {
    let tree = build_rich_table();
    let root = tree.root();
    let mut seen = Vec::new();
    assert_eq!(
        tree.enum_tree(root, |_, id| {
            seen.push(id);
            Ok(true)
        }),
        Ok(true)
    );
    assert_eq!(seen.first(), Some(&root));
    assert_eq!(seen.len(), tree.subtree_len(root));
    let unique: HashSet<NodeId> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len());

    // Every non-root node comes after its parent.
    for (i, &id) in seen.iter().enumerate().skip(1) {
        let parent = tree.parent(id).unwrap();
        let parent_pos = seen.iter().position(|&n| n == parent).unwrap();
        assert!(parent_pos < i);
    }
}

#[test]
fn detached_subtree_can_move_and_be_deleted() {
    let mut tree = build_rich_table();
    let root = tree.root();
    let com1 = tree.find_node(root, "\\_SB.COM1").unwrap().unwrap();
    let copy = tree.clone_tree(com1).unwrap();
    assert_eq!(tree.serialize(copy).unwrap(), tree.serialize(com1).unwrap());

    tree.remove_from_var_arg_list(com1).unwrap();
    assert_eq!(tree.find_node(root, "\\_SB.COM1"), Ok(None));
    tree.var_list_add_head(root, com1).unwrap();
    assert_eq!(tree.asl_path_name(com1).unwrap(), "\\_SB_.COM1");

    let count = tree.node_count();
    let copy_len = tree.subtree_len(copy);
    tree.delete_tree(copy).unwrap();
    assert_eq!(tree.node_count(), count - copy_len);
}
