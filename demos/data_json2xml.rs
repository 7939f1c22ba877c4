//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Parse a JSON instance document and re-print it as XML.

use yangdt::context::{Context, ContextFlags};
use yangdt::data::{DataFormat, DataTree, ParseFlags, PrintOptions, WithDefaults};
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};

static JSON_TREE: &str = r#"
    {
        "ietf-interfaces:interfaces": {
            "interface": [
                {"name": "eth0", "description": "ENG", "enabled": true}
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

    // Parse data tree in the JSON format.
    let dtree = DataTree::parse_string(&ctx, JSON_TREE, DataFormat::Json, ParseFlags::empty())
        .expect("Failed to parse data tree");

    // Print data tree in the XML format.
    let opts = PrintOptions {
        with_defaults: WithDefaults::All,
        pretty: true,
        ..PrintOptions::default()
    };
    print!(
        "{}",
        dtree.print_string(DataFormat::Xml, &opts).expect("Failed to print data tree")
    );
}
