//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

use yangdt::context::{Context, ContextFlags};
use yangdt::data::{DataFormat, DataTree, DiffOptions, MergeOptions, ParseFlags, PrintOptions};
use yangdt::diff::DiffKind;
use yangdt::schema::{NodeBuilder, SchemaModuleBuilder, Type};

fn create_context() -> Context {
    let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED | ContextFlags::NO_YANGLIBRARY);
    ctx.load_module(
        SchemaModuleBuilder::new("m", "urn:m").data(
            NodeBuilder::container("interfaces").child(
                NodeBuilder::list("interface", &["name"])
                    .user_ordered()
                    .child(NodeBuilder::leaf("name", Type::string()).mandatory())
                    .child(NodeBuilder::leaf("description", Type::string()))
                    .child(NodeBuilder::leaf("enabled", Type::boolean()).default("true")),
            ),
        ),
    )
    .unwrap();
    ctx
}

#[test]
fn diff_reports_created_and_deleted() {
    let ctx = create_context();
    let mut before = DataTree::new(&ctx);
    before.new_path("/m:interfaces/interface[name='eth0']", None, false).unwrap();

    let mut after = DataTree::new(&ctx);
    after.new_path("/m:interfaces/interface[name='eth1']", None, false).unwrap();

    let d = before.diff(&after, DiffOptions::default());
    assert!(d.iter().any(|e| e.kind == DiffKind::Created));
    assert!(d.iter().any(|e| e.kind == DiffKind::Deleted));
}

/// Without `with_defaults`, an implicit default value becoming explicit
/// (same canonical value) is not reported as a change.
#[test]
fn diff_ignores_default_vs_explicit_by_default() {
    let ctx = create_context();
    let mut before = DataTree::new(&ctx);
    before.new_path("/m:interfaces/interface[name='eth0']", None, false).unwrap();
    before.add_implicit().unwrap();

    let mut after = DataTree::new(&ctx);
    after
        .new_path("/m:interfaces/interface[name='eth0']/enabled", Some("true"), true)
        .unwrap();

    let d = before.diff(&after, DiffOptions::default());
    assert!(!d.iter().any(|e| e.kind == DiffKind::Changed));
}

/// With `with_defaults`, the same default-vs-explicit transition is
/// reported as a change.
#[test]
fn diff_with_defaults_reports_default_vs_explicit() {
    let ctx = create_context();
    let mut before = DataTree::new(&ctx);
    before.new_path("/m:interfaces/interface[name='eth0']", None, false).unwrap();
    before.add_implicit().unwrap();

    let mut after = DataTree::new(&ctx);
    after
        .new_path("/m:interfaces/interface[name='eth0']/enabled", Some("true"), true)
        .unwrap();

    let opts = DiffOptions {
        with_defaults: true,
        ..DiffOptions::default()
    };
    let d = before.diff(&after, opts);
    assert!(d.iter().any(|e| e.kind == DiffKind::Changed));
}

/// A three-element user-ordered list reorder is reported purely as moves.
#[test]
fn diff_detects_three_way_reorder_as_moves_only() {
    let ctx = create_context();

    let mut before = DataTree::new(&ctx);
    before.new_path("/m:interfaces/interface[name='a']", None, false).unwrap();
    before.new_path("/m:interfaces/interface[name='b']", None, false).unwrap();
    before.new_path("/m:interfaces/interface[name='c']", None, false).unwrap();

    let mut after = DataTree::new(&ctx);
    after.new_path("/m:interfaces/interface[name='c']", None, false).unwrap();
    after.new_path("/m:interfaces/interface[name='a']", None, false).unwrap();
    after.new_path("/m:interfaces/interface[name='b']", None, false).unwrap();

    let d = before.diff(&after, DiffOptions::default());
    assert!(!d.iter().any(|e| e.kind == DiffKind::Created || e.kind == DiffKind::Deleted));
    // Only `c` is actually displaced once the greedy adjustment runs: `a`
    // and `b` keep their relative order and end up back at zero
    // displacement for free (spec §4.J step 6).
    let moves: Vec<_> = d.iter().filter(|e| matches!(e.kind, DiffKind::MovedAfter1 | DiffKind::MovedAfter2)).collect();
    assert_eq!(moves.len(), 1);
}

/// `explicit` merge: a default-valued source node never overwrites a
/// non-default value already present on the target.
#[test]
fn merge_explicit_does_not_overwrite_non_default_target() {
    let ctx = create_context();
    let mut target = DataTree::new(&ctx);
    target
        .new_path("/m:interfaces/interface[name='eth0']/enabled", Some("false"), true)
        .unwrap();

    let mut source = DataTree::new(&ctx);
    source.new_path("/m:interfaces/interface[name='eth0']", None, false).unwrap();
    source.add_implicit().unwrap();

    let opts = MergeOptions {
        explicit: true,
        ..MergeOptions::default()
    };
    target.merge(&source, opts);

    let enabled = target.find_path("/m:interfaces/interface[name='eth0']/enabled").unwrap();
    assert_eq!(enabled.value_canonical().as_deref(), Some("false"));
}

/// `nosiblings` only merges the source's first root, leaving any of its
/// siblings out of the target.
#[test]
fn merge_nosiblings_merges_only_first_root() {
    let ctx = create_context();
    let mut target = DataTree::new(&ctx);

    let mut source = DataTree::new(&ctx);
    source.new_path("/m:interfaces/interface[name='eth0']", None, false).unwrap();

    let opts = MergeOptions {
        nosiblings: true,
        ..MergeOptions::default()
    };
    target.merge(&source, opts);

    assert!(target.find_path("/m:interfaces/interface[name='eth0']").is_some());
}

#[test]
fn diff_apply_reaches_target_state_across_create_and_delete() {
    let ctx = create_context();
    let mut before = DataTree::new(&ctx);
    before.new_path("/m:interfaces/interface[name='eth0']", None, false).unwrap();

    let mut after = DataTree::new(&ctx);
    after.new_path("/m:interfaces/interface[name='eth1']", None, false).unwrap();

    let d = before.diff(&after, DiffOptions::default());
    before.diff_apply(&d).unwrap();

    assert!(before.find_path("/m:interfaces/interface[name='eth0']").is_none());
    assert!(before.find_path("/m:interfaces/interface[name='eth1']").is_some());
    assert_eq!(
        before.print_string(DataFormat::Json, &PrintOptions::default()).unwrap(),
        after.print_string(DataFormat::Json, &PrintOptions::default()).unwrap(),
    );
}

#[test]
fn merge_overlay_then_parse_round_trips() {
    let ctx = create_context();
    let mut target = DataTree::new(&ctx);
    target.new_path("/m:interfaces/interface[name='eth0']/description", Some("a"), false).unwrap();

    let mut source = DataTree::new(&ctx);
    source.new_path("/m:interfaces/interface[name='eth1']/description", Some("b"), false).unwrap();

    target.merge(&source, MergeOptions::default());
    let json = target.print_string(DataFormat::Json, &PrintOptions::default()).unwrap();
    let reparsed = DataTree::parse_string(&ctx, json, DataFormat::Json, ParseFlags::empty()).unwrap();

    assert!(reparsed.find_path("/m:interfaces/interface[name='eth0']").is_some());
    assert!(reparsed.find_path("/m:interfaces/interface[name='eth1']").is_some());
}
