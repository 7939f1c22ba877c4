//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Install the `log`-crate-backed default logger, then trigger a lenient
//! `when`-removal so a warning-level diagnostic is emitted.

use log::LevelFilter;
use yangdt::context::{Context, ContextFlags};
use yangdt::data::{DataFormat, DataTree, ParseFlags};
use yangdt::logging::{init_logger, DefaultLogger};
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};
use yangdt::validate::ValidateMode;

fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::max())
        .init();
    init_logger(DefaultLogger::default()).expect("logger already installed");

    let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED);
    ctx.load_module(
        SchemaModuleBuilder::new("m", "urn:m").data(
            NodeBuilder::container("c")
                .child(NodeBuilder::leaf("enabled", Type::boolean()))
                .child(NodeBuilder::leaf("x", Type::string()).when("../enabled = 'true'")),
        ),
    )
    .unwrap();

    // `x` is present but `enabled` is not, so `when` is false; under
    // lenient validation the node is removed and a diagnostic is logged.
    let mut dtree = DataTree::parse_string(&ctx, r#"{"m:c":{"x":"hi"}}"#, DataFormat::Json, ParseFlags::empty())
        .expect("failed to parse data tree");
    dtree.validate(ValidateMode::Data, None, false).expect("validation failed");
}
