//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Diff two JSON instance documents for an `interfaces` container and print
//! what changed.

use yangdt::context::{Context, ContextFlags};
use yangdt::data::{DataFormat, DataTree, DiffOptions, ParseFlags};
use yangdt::diff::DiffKind;
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};

static JSON_TREE1: &str = r#"
    {
        "ietf-interfaces:interfaces": {
            "interface": [
                {
                    "name": "eth0",
                    "description": "ENG",
                    "enabled": true
                }
            ]
        }
    }
"#;

static JSON_TREE2: &str = r#"
    {
        "ietf-interfaces:interfaces": {
            "interface": [
                {
                    "name": "eth0",
                    "description": "ENG",
                    "enabled": false
                },
                {
                    "name": "eth1",
                    "description": "MGMT",
                    "enabled": true
                }
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

    // Parse data trees from JSON strings.
    let dtree1 = DataTree::parse_string(&ctx, JSON_TREE1, DataFormat::Json, ParseFlags::empty())
        .expect("Failed to parse data tree");
    let dtree2 = DataTree::parse_string(&ctx, JSON_TREE2, DataFormat::Json, ParseFlags::empty())
        .expect("Failed to parse data tree");

    // Compare data trees.
    println!("Comparing data trees:");
    let diff = dtree1.diff(&dtree2, DiffOptions::default());
    for entry in diff.iter() {
        match entry.kind {
            DiffKind::Created => println!("  created: {:?}", entry.second),
            DiffKind::Deleted => println!("  deleted: {:?}", entry.first),
            DiffKind::Changed => println!("  changed: {:?} -> {:?}", entry.first, entry.second),
            DiffKind::MovedAfter1 | DiffKind::MovedAfter2 => {
                println!("  moved: {:?} after {:?}", entry.second, entry.first)
            }
        }
    }
}
