//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

use yangdt::context::{Context, ContextFlags};
use yangdt::data::{DataFormat, DataTree, ParseFlags, PrintOptions};
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};

fn create_context() -> Context {
    let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED | ContextFlags::NO_YANGLIBRARY);
    ctx.load_module(
        SchemaModuleBuilder::new("m", "urn:m").data(
            NodeBuilder::container("interfaces").child(
                NodeBuilder::list("interface", &["name"])
                    .child(NodeBuilder::leaf("name", Type::string()).mandatory())
                    .child(
                        NodeBuilder::leaf("type", Type::enumeration(&[("ethernetCsmacd", 6), ("softwareLoopback", 24)]))
                            .mandatory(),
                    )
                    .child(NodeBuilder::leaf("enabled", Type::boolean()).default("true"))
                    .child(NodeBuilder::leaf("mtu", Type::uint32())),
            ),
        ),
    )
    .unwrap();
    ctx
}

/// Encoding to the binary wire format and decoding back reproduces the same
/// tree, independent of which in-memory order the data was built in (spec
/// §8 scenario 5).
#[test]
fn binary_round_trip_preserves_tree() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.new_path("/m:interfaces/interface[name='eth0']/mtu", Some("1500"), false)
        .unwrap();
    tree.new_path("/m:interfaces/interface[name='eth1']/type", Some("softwareLoopback"), false)
        .unwrap();

    let bytes = tree.print_bytes(DataFormat::Binary, &PrintOptions::default());
    let decoded = DataTree::parse_string(&ctx, bytes, DataFormat::Binary, ParseFlags::empty()).unwrap();

    assert_eq!(
        decoded.print_string(DataFormat::Json, &PrintOptions::default()).unwrap(),
        tree.print_string(DataFormat::Json, &PrintOptions::default()).unwrap(),
    );
}

#[test]
fn binary_round_trip_preserves_typed_values() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.new_path("/m:interfaces/interface[name='eth0']/mtu", Some("9000"), false)
        .unwrap();
    tree.new_path("/m:interfaces/interface[name='eth0']/enabled", Some("false"), false)
        .unwrap();

    let bytes = tree.print_bytes(DataFormat::Binary, &PrintOptions::default());
    let decoded = DataTree::parse_string(&ctx, bytes, DataFormat::Binary, ParseFlags::empty()).unwrap();

    let mtu = decoded.find_path("/m:interfaces/interface[name='eth0']/mtu").unwrap();
    assert_eq!(mtu.value_canonical().as_deref(), Some("9000"));
    let enabled = decoded.find_path("/m:interfaces/interface[name='eth0']/enabled").unwrap();
    assert_eq!(enabled.value_canonical().as_deref(), Some("false"));
}

/// A list key leaf round-trips even though it also satisfies a second role
/// (schema-declared key ordering) on the way back in.
#[test]
fn binary_round_trip_preserves_list_keys() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.new_path("/m:interfaces/interface[name='eth1']/type", Some("softwareLoopback"), false)
        .unwrap();

    let bytes = tree.print_bytes(DataFormat::Binary, &PrintOptions::default());
    let decoded = DataTree::parse_string(&ctx, bytes, DataFormat::Binary, ParseFlags::empty()).unwrap();

    assert!(decoded.find_path("/m:interfaces/interface[name='eth0']").is_some());
    assert!(decoded.find_path("/m:interfaces/interface[name='eth1']").is_some());
}
