//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Build a small module programmatically and walk its schema tree: a DFS
//! traversal of the data nodes, plus separate listings of its RPCs and
//! notifications.

use yangdt::context::{Context, ContextFlags};
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};

static MODULE_NAME: &str = "ietf-isis";

fn main() {
    let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED | ContextFlags::NO_YANGLIBRARY);
    ctx.load_module(
        SchemaModuleBuilder::new(MODULE_NAME, "urn:ietf:params:xml:ns:yang:ietf-isis")
            .data(
                NodeBuilder::container("isis").child(
                    NodeBuilder::list("instance", &["name"])
                        .child(NodeBuilder::leaf("name", Type::string()).mandatory())
                        .child(NodeBuilder::leaf("enabled", Type::boolean()).default("true")),
                ),
            )
            .rpc(NodeBuilder::rpc("clear-adjacency").child(NodeBuilder::input().child(NodeBuilder::leaf(
                "instance",
                Type::string(),
            ))))
            .notification(
                NodeBuilder::notification("adjacency-change")
                    .child(NodeBuilder::leaf("neighbor", Type::string())),
            ),
    )
    .expect("failed to load module");

    let module = ctx.get_module(MODULE_NAME).unwrap();

    println!("Data (DFS iteration):");
    for snode in module.data().flat_map(|n| n.traverse()) {
        println!("  {}", snode.path());
    }

    println!("RPCs:");
    for snode in module.rpcs() {
        println!("  {}", snode.path());
    }

    println!("Notifications:");
    for snode in module.notifications() {
        println!("  {}", snode.path());
    }
}
