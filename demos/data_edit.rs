//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Build an `interfaces` instance tree, then apply a batch of path-based
//! edits (delete one list instance, modify leaves on the others).

use yangdt::context::{Context, ContextFlags};
use yangdt::data::{DataFormat, DataTree, ParseFlags, PrintOptions, WithDefaults};
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};

static JSON_TREE: &str = r#"
    {
        "ietf-interfaces:interfaces": {
            "interface": [
                {"name": "eth0", "description": "ENG", "enabled": true},
                {"name": "eth1", "description": "MKT", "enabled": true},
                {"name": "eth2", "description": "old", "enabled": false}
            ]
        }
    }
"#;

enum Operation {
    Modify(&'static str, &'static str),
    Delete(&'static str),
}

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

    // Parse the starting data tree from a JSON string.
    let mut dtree = DataTree::parse_string(&ctx, JSON_TREE, DataFormat::Json, ParseFlags::empty())
        .expect("Failed to parse data tree");

    // Apply a batch of edits by path.
    let changes = [
        Operation::Delete("/ietf-interfaces:interfaces/interface[name='eth2']"),
        Operation::Modify(
            "/ietf-interfaces:interfaces/interface[name='eth0']/description",
            "engineering",
        ),
        Operation::Modify(
            "/ietf-interfaces:interfaces/interface[name='eth1']/enabled",
            "false",
        ),
    ];
    for change in &changes {
        match change {
            Operation::Modify(path, value) => {
                dtree
                    .new_path(path, Some(value), true)
                    .expect("Failed to edit data tree");
            }
            Operation::Delete(path) => dtree.remove(path).expect("Failed to edit data tree"),
        }
    }

    // Print the modified data tree.
    let opts = PrintOptions {
        with_defaults: WithDefaults::All,
        ..PrintOptions::default()
    };
    print!(
        "{}",
        dtree.print_string(DataFormat::Json, &opts).expect("Failed to print data tree")
    );
}
