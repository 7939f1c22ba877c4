//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Parse an `interfaces` instance tree and walk it two ways: a full
//! depth-first traversal, then a filtered walk over `interface` list
//! instances only.

use yangdt::context::{Context, ContextFlags};
use yangdt::data::{DataFormat, DataTree, ParseFlags};
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};

static JSON_TREE: &str = r#"
    {
        "ietf-interfaces:interfaces": {
            "interface": [
                {"name": "eth0", "description": "ENG", "enabled": true},
                {"name": "eth1", "description": "MKT", "enabled": true}
            ]
        }
    }
"#;

fn load_interfaces_module(ctx: &mut Context) {
    ctx.load_module(
        SchemaModuleBuilder::new("ietf-interfaces", "urn:ietf:params:xml:ns:yang:ietf-interfaces").data(
            NodeBuilder::container("interfaces").child(
                NodeBuilder::list("interface", &["name"])
                    .child(NodeBuilder::leaf("name", Type::string()))
                    .child(NodeBuilder::leaf("description", Type::string()))
                    .child(NodeBuilder::leaf("enabled", Type::boolean()).default("true")),
            ),
        ),
    )
    .expect("Failed to load module");
}

fn main() {
    // Initialize context and load the schema module.
    let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED);
    load_interfaces_module(&mut ctx);

    // Parse data tree from a JSON string.
    let dtree = DataTree::parse_string(&ctx, JSON_TREE, DataFormat::Json, ParseFlags::empty())
        .expect("Failed to parse data tree");

    // Iterate over all nodes of the data tree.
    println!("Iterating over all data nodes...");
    for dnode in dtree.traverse() {
        println!("  {}: {:?}", dnode.path(), dnode.value_canonical());
    }

    // Iterate over `interface` list instances only.
    println!("Iterating over interfaces only...");
    for dnode in dtree.traverse().filter(|n| n.schema().name().as_str() == "interface") {
        println!("  {}", dnode.path());
    }
}
