//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

use yangdt::context::{Context, ContextFlags};
use yangdt::data::{DataFormat, DataTree, DiffOptions, MergeOptions, ParseFlags, PrintOptions};
use yangdt::diff::DiffKind;
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};
use yangdt::validate::ValidateMode;

/// A schema shaped like `ietf-interfaces` plus a `routing` container whose
/// route leafrefs back into it, deep enough to exercise editing,
/// validation, diff/merge and move detection without needing the real
/// module.
fn create_context() -> Context {
    let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED | ContextFlags::NO_YANGLIBRARY);
    ctx.load_module(
        SchemaModuleBuilder::new("m", "urn:m")
            .data(
                NodeBuilder::container("interfaces").child(
                    NodeBuilder::list("interface", &["name"])
                        .user_ordered()
                        .child(NodeBuilder::leaf("name", Type::string()).mandatory())
                        .child(NodeBuilder::leaf("description", Type::string()))
                        .child(
                            NodeBuilder::leaf("type", Type::enumeration(&[("ethernetCsmacd", 6), ("softwareLoopback", 24)]))
                                .mandatory(),
                        )
                        .child(NodeBuilder::leaf("enabled", Type::boolean()).default("true"))
                        .child(
                            NodeBuilder::container("statistics")
                                .config(false)
                                .child(NodeBuilder::leaf("in-octets", Type::uint64()).config(false)),
                        ),
                ),
            )
            .data(
                NodeBuilder::container("routing").child(
                    NodeBuilder::list("route", &["id"])
                        .child(NodeBuilder::leaf("id", Type::string()).mandatory())
                        .child(NodeBuilder::leaf(
                            "outgoing-interface",
                            Type::leafref("/m:interfaces/interface/name", true),
                        )),
                ),
            ),
    )
    .unwrap();
    ctx
}

fn json_of(tree: &DataTree) -> String {
    tree.print_string(DataFormat::Json, &PrintOptions::default()).unwrap()
}

#[test]
fn data_find_path() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();

    let found = tree.find_path("/m:interfaces/interface[name='eth0']").unwrap();
    assert_eq!(found.list_keys()[0].value_canonical().as_deref(), Some("eth0"));
    assert!(tree.find_path("/m:interfaces/interface[name='eth1']").is_none());
}

#[test]
fn data_edit() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.new_path("/m:interfaces/interface[name='eth0']/description", Some("uplink"), false)
        .unwrap();
    assert_eq!(
        json_of(&tree),
        r#"{"m:interfaces":{"interface":[{"name":"eth0","description":"uplink","type":"ethernetCsmacd"}]}}"#
    );

    tree.remove("/m:interfaces/interface[name='eth0']/description").unwrap();
    assert_eq!(json_of(&tree), r#"{"m:interfaces":{"interface":[{"name":"eth0","type":"ethernetCsmacd"}]}}"#);
}

#[test]
fn data_validate_mandatory_violation_is_fatal_under_strict() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    // "type" is mandatory and never set.
    tree.new_path("/m:interfaces/interface[name='eth0']/description", Some("x"), false)
        .unwrap();

    let err = tree.validate(ValidateMode::Data, None, true).unwrap_err();
    assert!(err.to_string().contains("type"));
}

#[test]
fn data_validate_succeeds_once_mandatory_nodes_are_set() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.validate(ValidateMode::Data, None, true).unwrap();
}

#[test]
fn data_add_implicit_fills_declared_defaults() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.add_implicit().unwrap();

    let enabled = tree.find_path("/m:interfaces/interface[name='eth0']/enabled").unwrap();
    assert_eq!(enabled.value_canonical().as_deref(), Some("true"));
    assert!(enabled.is_default());
}

#[test]
fn data_duplicate_tree_is_independent() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();

    let copy = tree.duplicate();
    tree.remove("/m:interfaces").unwrap();

    assert!(tree.root_nodes().next().is_none());
    assert!(copy.find_path("/m:interfaces/interface[name='eth0']").is_some());
}

#[test]
fn data_merge_overlays_source_onto_target() {
    let ctx = create_context();
    let mut target = DataTree::new(&ctx);
    target
        .new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();

    let mut source = DataTree::new(&ctx);
    source
        .new_path("/m:interfaces/interface[name='eth1']/type", Some("softwareLoopback"), false)
        .unwrap();

    target.merge(&source, MergeOptions::default());
    assert!(target.find_path("/m:interfaces/interface[name='eth0']").is_some());
    assert!(target.find_path("/m:interfaces/interface[name='eth1']").is_some());
}

#[test]
fn data_diff_reports_changed_value() {
    let ctx = create_context();
    let mut before = DataTree::new(&ctx);
    before
        .new_path("/m:interfaces/interface[name='eth0']/description", Some("old"), false)
        .unwrap();

    let mut after = DataTree::new(&ctx);
    after
        .new_path("/m:interfaces/interface[name='eth0']/description", Some("new"), false)
        .unwrap();

    let d = before.diff(&after, DiffOptions::default());
    assert!(d.iter().any(|e| e.kind == DiffKind::Changed));
}

#[test]
fn data_diff_apply_reaches_target_state() {
    let ctx = create_context();
    let mut before = DataTree::new(&ctx);
    before
        .new_path("/m:interfaces/interface[name='eth0']/description", Some("old"), false)
        .unwrap();

    let mut after = DataTree::new(&ctx);
    after
        .new_path("/m:interfaces/interface[name='eth0']/description", Some("new"), false)
        .unwrap();

    let d = before.diff(&after, DiffOptions::default());
    before.diff_apply(&d).unwrap();

    assert_eq!(
        before
            .find_path("/m:interfaces/interface[name='eth0']/description")
            .unwrap()
            .value_canonical()
            .as_deref(),
        Some("new")
    );
}

/// Two instances of a user-ordered list swapping position are reported as
/// moves, not as delete+create (spec §4.J step 6).
#[test]
fn data_diff_detects_list_reorder() {
    let ctx = create_context();

    let mut before = DataTree::new(&ctx);
    before.new_path("/m:interfaces/interface[name='eth0']", None, false).unwrap();
    before.new_path("/m:interfaces/interface[name='eth1']", None, false).unwrap();

    let mut after = DataTree::new(&ctx);
    after.new_path("/m:interfaces/interface[name='eth1']", None, false).unwrap();
    after.new_path("/m:interfaces/interface[name='eth0']", None, false).unwrap();

    let d = before.diff(&after, DiffOptions::default());
    assert!(d.iter().any(|e| matches!(e.kind, DiffKind::MovedAfter1 | DiffKind::MovedAfter2)));
    assert!(!d.iter().any(|e| e.kind == DiffKind::Created || e.kind == DiffKind::Deleted));
}

/// A keyed list instance whose children arrive out of schema-declared
/// order is silently repaired under the lenient (default) parser, but a
/// fatal `Constraint` error under strict parsing (spec §4.E, §8 scenario 2).
#[test]
fn data_parse_lenient_reorders_out_of_order_list_children() {
    let ctx = create_context();
    let xml = r#"<interfaces xmlns="urn:m">
        <interface>
            <description>uplink</description>
            <name>eth0</name>
            <type>ethernetCsmacd</type>
        </interface>
    </interfaces>"#;

    let tree = DataTree::parse_string(&ctx, xml, DataFormat::Xml, ParseFlags::empty()).unwrap();
    assert_eq!(
        json_of(&tree),
        r#"{"m:interfaces":{"interface":[{"name":"eth0","description":"uplink","type":"ethernetCsmacd"}]}}"#
    );
}

#[test]
fn data_parse_strict_rejects_out_of_order_list_children() {
    let ctx = create_context();
    let xml = r#"<interfaces xmlns="urn:m">
        <interface>
            <description>uplink</description>
            <name>eth0</name>
            <type>ethernetCsmacd</type>
        </interface>
    </interfaces>"#;

    let err = DataTree::parse_string(&ctx, xml, DataFormat::Xml, ParseFlags::STRICT).unwrap_err();
    assert!(err.to_string().contains("out of declared order"));
}

#[test]
fn data_parse_strict_accepts_in_order_list_children() {
    let ctx = create_context();
    let xml = r#"<interfaces xmlns="urn:m">
        <interface>
            <name>eth0</name>
            <description>uplink</description>
            <type>ethernetCsmacd</type>
        </interface>
    </interfaces>"#;

    DataTree::parse_string(&ctx, xml, DataFormat::Xml, ParseFlags::STRICT).unwrap();
}

/// A leafref resolves against an instance living elsewhere in the same
/// tree, and fails strict validation when it doesn't (spec §8 scenario 3).
#[test]
fn data_leafref_resolves_against_sibling_subtree() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.new_path("/m:routing/route[id='default']/outgoing-interface", Some("eth0"), false)
        .unwrap();

    tree.validate(ValidateMode::Data, None, true).unwrap();
}

#[test]
fn data_leafref_unresolved_is_fatal_under_strict() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:routing/route[id='default']/outgoing-interface", Some("eth0"), false)
        .unwrap();

    let err = tree.validate(ValidateMode::Data, None, true).unwrap_err();
    assert!(matches!(err, yangdt::Error::Leafref { .. }));
}

#[test]
fn data_iterator_traverse() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();

    // DataNodeRef::path() qualifies every segment with its owner module,
    // unlike the schema-level path() which only prefixes the root.
    let paths: Vec<String> = tree.traverse().map(|n| n.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/m:interfaces",
            "/m:interfaces/m:interface[name='eth0']",
            "/m:interfaces/m:interface[name='eth0']/m:name",
            "/m:interfaces/m:interface[name='eth0']/m:type",
        ]
    );
}

#[test]
fn data_iterator_ancestors() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();

    let ty = tree.find_path("/m:interfaces/interface[name='eth0']/type").unwrap();
    let paths: Vec<String> = ty.ancestors().map(|n| n.path()).collect();
    assert_eq!(paths, vec!["/m:interfaces/m:interface[name='eth0']", "/m:interfaces"]);
}

#[test]
fn data_iterator_siblings() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.new_path("/m:interfaces/interface[name='eth0']/description", Some("uplink"), false)
        .unwrap();

    let name = tree.find_path("/m:interfaces/interface[name='eth0']/name").unwrap();
    let paths: Vec<String> = name.siblings().map(|n| n.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/m:interfaces/m:interface[name='eth0']/m:description",
            "/m:interfaces/m:interface[name='eth0']/m:type",
        ]
    );
}

#[test]
fn data_iterator_children() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();

    let interfaces = tree.find_path("/m:interfaces").unwrap();
    let paths: Vec<String> = interfaces.children().map(|n| n.path()).collect();
    assert_eq!(paths, vec!["/m:interfaces/m:interface[name='eth0']"]);
}

#[test]
fn data_is_default() {
    let ctx = create_context();
    let mut tree = DataTree::new(&ctx);
    tree.new_path("/m:interfaces/interface[name='eth0']/type", Some("ethernetCsmacd"), false)
        .unwrap();
    tree.add_implicit().unwrap();

    let enabled = tree.find_path("/m:interfaces/interface[name='eth0']/enabled").unwrap();
    assert!(enabled.is_default());

    tree.new_path("/m:interfaces/interface[name='eth0']/enabled", Some("false"), true)
        .unwrap();
    let enabled = tree.find_path("/m:interfaces/interface[name='eth0']/enabled").unwrap();
    assert!(!enabled.is_default());
}
