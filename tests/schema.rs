//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

use yangdt::context::{Context, ContextFlags};
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, SchemaNodeKind, Type};

/// A small schema mirroring `ietf-interfaces`' shape -- a keyed list of
/// interfaces under a top-level container, each with a nested state
/// container -- deep enough to exercise navigation without needing the
/// full real module.
fn create_context() -> Context {
    let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED | ContextFlags::NO_YANGLIBRARY);
    ctx.load_module(
        SchemaModuleBuilder::new("ietf-interfaces", "urn:ietf:params:xml:ns:yang:ietf-interfaces")
            .data(
                NodeBuilder::container("interfaces").child(
                    NodeBuilder::list("interface", &["name"])
                        .description("The list of interfaces on the device.")
                        .child(NodeBuilder::leaf("name", Type::string()).mandatory())
                        .child(
                            NodeBuilder::leaf("description", Type::string())
                                .description("A textual description of the interface."),
                        )
                        .child(NodeBuilder::leaf("type", Type::identityref("iana-if-type:interface-type")).mandatory())
                        .child(
                            NodeBuilder::leaf("enabled", Type::boolean())
                                .description("This leaf contains the configured, desired state.")
                                .reference("RFC 2863: enabled")
                                .default("true"),
                        )
                        .child(
                            NodeBuilder::container("statistics")
                                .config(false)
                                .child(NodeBuilder::leaf("discontinuity-time", Type::string()).config(false))
                                .child(NodeBuilder::leaf("in-octets", Type::uint64()).config(false))
                                .child(NodeBuilder::leaf("out-octets", Type::uint64()).config(false)),
                        ),
                ),
            ),
    )
    .unwrap();
    ctx
}

#[test]
fn schema_find_path() {
    let ctx = create_context();
    let top = ctx.get_module("ietf-interfaces").unwrap().data().next().unwrap();

    assert_eq!(
        top.find_path("/ietf-interfaces:interfaces/interface").unwrap().path(),
        "/ietf-interfaces:interfaces/interface"
    );
    assert_eq!(
        top.find_path("/ietf-interfaces:interfaces/interface/statistics/in-octets")
            .unwrap()
            .path(),
        "/ietf-interfaces:interfaces/interface/statistics/in-octets"
    );
    assert!(top.find_path("/ietf-interfaces:interfaces/nonexistent").is_none());
}

#[test]
fn schema_iterator_traverse() {
    let ctx = create_context();
    let top = ctx.get_module("ietf-interfaces").unwrap().data().next().unwrap();

    let paths: Vec<String> = top.traverse().into_iter().map(|n| n.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/ietf-interfaces:interfaces",
            "/ietf-interfaces:interfaces/interface",
            "/ietf-interfaces:interfaces/interface/name",
            "/ietf-interfaces:interfaces/interface/description",
            "/ietf-interfaces:interfaces/interface/type",
            "/ietf-interfaces:interfaces/interface/enabled",
            "/ietf-interfaces:interfaces/interface/statistics",
            "/ietf-interfaces:interfaces/interface/statistics/discontinuity-time",
            "/ietf-interfaces:interfaces/interface/statistics/in-octets",
            "/ietf-interfaces:interfaces/interface/statistics/out-octets",
        ]
    );
}

#[test]
fn schema_iterator_ancestors() {
    let ctx = create_context();
    let top = ctx.get_module("ietf-interfaces").unwrap().data().next().unwrap();

    let discontinuity = top
        .find_path("/ietf-interfaces:interfaces/interface/statistics/discontinuity-time")
        .unwrap();
    let paths: Vec<String> = discontinuity.ancestors().map(|n| n.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/ietf-interfaces:interfaces/interface/statistics",
            "/ietf-interfaces:interfaces/interface",
            "/ietf-interfaces:interfaces",
        ]
    );
}

#[test]
fn schema_iterator_siblings() {
    let ctx = create_context();
    let top = ctx.get_module("ietf-interfaces").unwrap().data().next().unwrap();

    let name = top.find_path("/ietf-interfaces:interfaces/interface/name").unwrap();
    let paths: Vec<String> = name.siblings().map(|n| n.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/ietf-interfaces:interfaces/interface/description",
            "/ietf-interfaces:interfaces/interface/type",
            "/ietf-interfaces:interfaces/interface/enabled",
            "/ietf-interfaces:interfaces/interface/statistics",
        ]
    );
}

#[test]
fn schema_iterator_children() {
    let ctx = create_context();
    let top = ctx.get_module("ietf-interfaces").unwrap().data().next().unwrap();

    let statistics = top
        .find_path("/ietf-interfaces:interfaces/interface/statistics")
        .unwrap();
    let paths: Vec<String> = statistics.children().map(|n| n.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/ietf-interfaces:interfaces/interface/statistics/discontinuity-time",
            "/ietf-interfaces:interfaces/interface/statistics/in-octets",
            "/ietf-interfaces:interfaces/interface/statistics/out-octets",
        ]
    );
}

#[test]
fn schema_node_attributes() {
    let ctx = create_context();
    let top = ctx.get_module("ietf-interfaces").unwrap().data().next().unwrap();

    let enabled = top.find_path("/ietf-interfaces:interfaces/interface/enabled").unwrap();
    assert_eq!(enabled.name().as_str(), "enabled");
    assert!(enabled.description().is_some());
    assert!(enabled.reference().is_some());
    assert_eq!(enabled.kind(), SchemaNodeKind::Leaf);
    assert!(enabled.is_config());
    assert!(!enabled.is_mandatory());
    assert_eq!(enabled.default_value_canonical(), Some("true"));
    assert!(enabled.units().is_none());
    assert!(enabled.musts().is_empty());
    assert!(enabled.whens().is_empty());

    let interface = top.find_path("/ietf-interfaces:interfaces/interface").unwrap();
    assert_eq!(interface.name().as_str(), "interface");
    assert!(interface.description().is_some());
    assert_eq!(interface.kind(), SchemaNodeKind::List);
    assert!(interface.is_config());
    assert!(!interface.is_mandatory());
    assert!(!interface.is_keyless_list());
    assert!(!interface.is_user_ordered());
    assert_eq!(interface.min_elements(), None);
    assert_eq!(interface.max_elements(), None);
    assert_eq!(interface.list_key_names(), vec!["name".to_string()]);

    let statistics = top
        .find_path("/ietf-interfaces:interfaces/interface/statistics")
        .unwrap();
    assert!(statistics.is_state());
}

#[test]
fn schema_rpc_input_output() {
    let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED);
    ctx.load_module(
        SchemaModuleBuilder::new("m", "urn:m").rpc(
            NodeBuilder::rpc("reset")
                .child(NodeBuilder::input().child(NodeBuilder::leaf("delay", Type::uint32())))
                .child(NodeBuilder::output().child(NodeBuilder::leaf("reset-at", Type::string()))),
        ),
    )
    .unwrap();

    let rpc = ctx.get_module("m").unwrap().rpcs().next().unwrap();
    let (input_children, _) = rpc.input().unwrap();
    assert_eq!(input_children[0].name().as_str(), "delay");
    let (output_children, _) = rpc.output().unwrap();
    assert_eq!(output_children[0].name().as_str(), "reset-at");
}

#[test]
fn schema_module_loaded_and_implemented() {
    let ctx = create_context();
    let m = ctx.get_module("ietf-interfaces").unwrap();
    assert!(m.is_implemented());
    assert_eq!(ctx.internal_module_count(), 1);
    assert!(ctx.get_module_ns("urn:ietf:params:xml:ns:yang:ietf-interfaces").is_some());
}
