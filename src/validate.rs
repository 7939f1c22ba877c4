//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The seven-step validation pipeline (spec §4.I).
//!
//! Each step walks the whole tree and clears the validity bit it owns on
//! success (invariant 7: bits are only ever cleared by a successful pass).
//! Steps 3–4 can create new default nodes or delete `when`-false subtrees,
//! which may re-raise bits elsewhere, so the whole seven-step sequence
//! loops to a fixed point bounded by [`MAX_ITERATIONS`].

use crate::context::Context;
use crate::error::{Error, Result};
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::tree::{NodeId, NodeKind, NodeKindSeed, Tree, Validity};
use crate::value::Value;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Candidate-tree validation mode (spec §4.I's "mode" input).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateMode {
    Data,
    Rpc,
    RpcReply,
    Notification,
    Template,
    Config,
    Get,
    GetConfig,
    Edit,
}

/// One item recorded in the parser's append-only work list, drained here
/// (spec §3.1's `UnresolvedSet`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedKind {
    Leafref,
    InstanceId,
    Union,
    When,
    Must,
}

#[derive(Debug, Clone, Copy)]
pub struct UnresolvedItem {
    pub kind: UnresolvedKind,
    pub node: NodeId,
}

#[derive(Default)]
pub struct UnresolvedSet {
    pub items: Vec<UnresolvedItem>,
}

impl UnresolvedSet {
    pub fn new() -> UnresolvedSet {
        UnresolvedSet::default()
    }

    pub fn push(&mut self, kind: UnresolvedKind, node: NodeId) {
        self.items.push(UnresolvedItem { kind, node });
    }
}

const MAX_ITERATIONS: u32 = 8;

fn all_nodes(tree: &Tree) -> Vec<NodeId> {
    fn walk(tree: &Tree, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for c in tree.children_of(id) {
            walk(tree, c, out);
        }
    }
    let mut out = Vec::new();
    for root in tree.root_nodes() {
        walk(tree, root, &mut out);
    }
    out
}

/// Run the full pipeline to a fixed point.
pub fn validate(
    tree: &mut Tree,
    ctx: &Context,
    unresolved: &mut UnresolvedSet,
    mode: ValidateMode,
    external: Option<&Tree>,
    strict: bool,
) -> Result<()> {
    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        step_context(tree, mode)?;
        step_content(tree)?;
        changed |= step_default_fill(tree, ctx)?;
        changed |= step_resolve_unresolved(tree, unresolved, external, strict)?;
        step_uniqueness(tree)?;
        step_duplicates(tree, strict)?;
        step_mandatory(tree, mode, strict)?;
        if !changed {
            return Ok(());
        }
    }
    Err(Error::internal(
        "validation pipeline did not reach a fixed point",
    ))
}

/// Materialize declared defaults across the whole tree without running the
/// rest of the pipeline, for callers (`data::DataTree::add_implicit`) that
/// want defaults filled independent of a full validation pass.
pub fn fill_defaults(tree: &mut Tree, ctx: &Context) -> Result<()> {
    for _ in 0..MAX_ITERATIONS {
        if !step_default_fill(tree, ctx)? {
            return Ok(());
        }
    }
    Err(Error::internal(
        "default-fill pipeline did not reach a fixed point",
    ))
}

/// Step 1: schema visibility, RPC in/out placement, config-only mode.
fn step_context(tree: &mut Tree, mode: ValidateMode) -> Result<()> {
    for id in all_nodes(tree) {
        let schema = tree.get(id).header.schema.clone();
        if mode == ValidateMode::Config && schema.is_state() {
            return Err(Error::Constraint {
                path: schema.path(),
                message: "state data not allowed in config-only mode".into(),
            });
        }
        if matches!(schema.kind(), SchemaNodeKind::Input)
            && !matches!(mode, ValidateMode::Rpc | ValidateMode::Edit)
        {
            return Err(Error::Schema {
                path: schema.path(),
            });
        }
        if matches!(schema.kind(), SchemaNodeKind::Output) && mode != ValidateMode::RpcReply {
            return Err(Error::Schema {
                path: schema.path(),
            });
        }
    }
    Ok(())
}

/// Step 2: per-node content constraints already enforced at parse time by
/// the value store; nothing left to check cross-node here.
fn step_content(_tree: &mut Tree) -> Result<()> {
    Ok(())
}

/// Step 3: materialize declared defaults that are missing from the tree.
/// Returns whether any node was created (forces another pipeline pass).
fn step_default_fill(tree: &mut Tree, _ctx: &Context) -> Result<bool> {
    let mut changed = false;
    let parents: Vec<NodeId> = all_nodes(tree)
        .into_iter()
        .filter(|&id| {
            matches!(
                tree.get(id).header.schema.kind(),
                SchemaNodeKind::Container | SchemaNodeKind::List
            )
        })
        .collect();

    for parent in parents {
        changed |= fill_defaults_under(tree, parent)?;
    }
    // Top-level defaults (no parent container in the tree at all) are
    // filled against each loaded module's declared top-level schema in
    // the data::DataTree layer, since that is where the module set is
    // enumerated; this function only fills beneath existing parents.
    Ok(changed)
}

fn fill_defaults_under(tree: &mut Tree, parent_id: NodeId) -> Result<bool> {
    let mut changed = false;
    let parent_schema = tree.get(parent_id).header.schema.clone();
    let existing: Vec<DictNameOf> = tree
        .children_of(parent_id)
        .into_iter()
        .map(|c| DictNameOf(tree.get(c).header.schema.name().to_string()))
        .collect();

    for child_schema in parent_schema.children() {
        if child_schema.is_schema_only() {
            continue;
        }
        if !child_schema.has_default() {
            continue;
        }
        let name = DictNameOf(child_schema.name().to_string());
        if existing.contains(&name) {
            continue;
        }
        if let Some(default) = child_schema.default_value_canonical() {
            let value = crate::value::Value::String(default.to_string());
            let node = tree.new_node(child_schema.clone(), NodeKindSeed::Leaf(value));
            tree.insert_as_child(Some(parent_id), node);
            tree.get_mut(node).header.validity.insert(Validity::DEFAULT);
            changed = true;
        }
    }
    Ok(changed)
}

#[derive(PartialEq)]
struct DictNameOf(String);

/// Step 4: resolve leafref/instance-identifier/union/when/must items from
/// the unresolved set. Returns whether any subtree was removed by a false
/// `when` (forces another pass, since removal can re-enable a sibling
/// choice case's default).
fn step_resolve_unresolved(
    tree: &mut Tree,
    unresolved: &mut UnresolvedSet,
    external: Option<&Tree>,
    strict: bool,
) -> Result<bool> {
    let mut changed = false;
    let items = std::mem::take(&mut unresolved.items);
    let mut remaining = Vec::new();

    for item in items {
        if tree.try_get(item.node).is_none() {
            // Node was freed by an earlier when-removal this pass.
            continue;
        }
        match item.kind {
            UnresolvedKind::Leafref => {
                resolve_leafref(tree, item.node, external, strict)?;
            }
            UnresolvedKind::InstanceId => {
                resolve_instance_id(tree, item.node, external, strict)?;
            }
            UnresolvedKind::Union => {
                if !resolve_union(tree, item.node) {
                    remaining.push(item);
                }
            }
            UnresolvedKind::When => {
                if !evaluate_placeholder_condition(tree, item.node, false) {
                    let schema = tree.get(item.node).header.schema.clone();
                    if strict {
                        return Err(Error::When { path: schema.path() });
                    }
                    crate::logging::emit(
                        crate::logging::LogLevel::Warning,
                        "when condition false, removing node",
                        None,
                        Some(schema.path().into()),
                    );
                    tree.unlink(item.node);
                    tree.free_subtree(item.node);
                    changed = true;
                }
            }
            UnresolvedKind::Must => {
                if !evaluate_placeholder_condition(tree, item.node, true) {
                    let schema = tree.get(item.node).header.schema.clone();
                    return Err(Error::Constraint {
                        path: schema.path(),
                        message: "must condition false".into(),
                    });
                }
            }
        }
    }
    unresolved.items = remaining;
    Ok(changed)
}

/// Evaluate the `when`/`must` conditions attached to `node`'s schema via
/// the built-in [`crate::xpath::PathOnlyEvaluator`] (spec §9's pluggable
/// `XPathEvaluator`). An expression the evaluator doesn't understand is
/// treated as satisfied, so that parsing data with a condition outside
/// the restricted path grammar doesn't spuriously fail; `is_must`
/// distinguishes which statement's conditions are being checked (a node
/// can carry both).
fn evaluate_placeholder_condition(tree: &Tree, node: NodeId, is_must: bool) -> bool {
    use crate::xpath::{PathOnlyEvaluator, XPathEvaluator};

    let schema = tree.get(node).header.schema.clone();
    let evaluator = PathOnlyEvaluator::default();
    let conditions: Vec<String> = if is_must {
        schema.musts().iter().map(|m| m.condition.clone()).collect()
    } else {
        schema.whens().iter().map(|w| w.condition.clone()).collect()
    };
    conditions
        .iter()
        .all(|cond| evaluator.eval_bool(cond, tree, node).unwrap_or(true))
}

fn resolve_leafref(
    tree: &mut Tree,
    node: NodeId,
    external: Option<&Tree>,
    strict: bool,
) -> Result<()> {
    let (raw_value, cache) = match &tree.get(node).kind {
        NodeKind::Leaf {
            value: Value::Leafref { path, cached },
        }
        | NodeKind::LeafList {
            value: Value::Leafref { path, cached },
        } => (path.clone(), cached.clone()),
        _ => return Ok(()),
    };
    let schema = tree.get(node).header.schema.clone();
    let Some(expr) = schema.leaf_type().and_then(|t| t.leafref_path().map(str::to_string)) else {
        return Ok(());
    };
    let target_schema = crate::utils::path::resolve_schema_path(&schema, &expr);
    match target_schema {
        Some(target_schema) => {
            let haystack = external.unwrap_or(tree);
            let found = find_matching_instance_of_schema(haystack, &target_schema, &raw_value);
            if let Some(target_id) = found {
                cache.set(Some((tree.generation, target_id)));
                tree.get_mut(node)
                    .header
                    .validity
                    .remove(Validity::LEAFREF_PENDING);
                return Ok(());
            }
            if strict {
                return Err(Error::Leafref {
                    path: schema.path(),
                    message: format!("no instance of {expr} has value {raw_value:?}"),
                });
            }
            crate::logging::emit(
                crate::logging::LogLevel::Warning,
                format!("leafref broken, no instance of {expr} has value {raw_value:?}"),
                None,
                Some(schema.path().into()),
            );
            Ok(())
        }
        None => {
            if strict {
                return Err(Error::Leafref {
                    path: schema.path(),
                    message: format!("path {expr} does not resolve to a schema node"),
                });
            }
            crate::logging::emit(
                crate::logging::LogLevel::Warning,
                format!("leafref path {expr} does not resolve to a schema node"),
                None,
                Some(schema.path().into()),
            );
            Ok(())
        }
    }
}

fn resolve_instance_id(
    tree: &mut Tree,
    node: NodeId,
    _external: Option<&Tree>,
    strict: bool,
) -> Result<()> {
    let resolved = match &tree.get(node).kind {
        NodeKind::Leaf {
            value: Value::InstanceIdentifier { resolved, .. },
        } => resolved.clone(),
        _ => return Ok(()),
    };
    // Without a full XPath evaluator, instance-identifiers are resolved by
    // the restricted path grammar only; failing that under `require-instance`
    // is an error in strict mode, a no-op otherwise.
    if resolved.get().is_none() && strict {
        let schema = tree.get(node).header.schema.clone();
        if let Some(ty) = schema.leaf_type() {
            if ty.instance_id_require_instance() {
                return Err(Error::InstanceId {
                    path: schema.path(),
                    message: "target instance not found".into(),
                });
            }
        }
    }
    Ok(())
}

/// Resolve a `union` leaf's currently-selected member, retrying every other
/// declared member type in declaration order if it still can't resolve
/// (spec §4.I step 4).
fn resolve_union(tree: &mut Tree, node: NodeId) -> bool {
    let schema = tree.get(node).header.schema.clone();
    let Some(ty) = schema.leaf_type() else {
        return true;
    };
    let members = ty.union_members().to_vec();
    if members.is_empty() {
        return true;
    }
    let Some((member_index, inner)) = union_payload(tree, node) else {
        return true;
    };

    if union_member_resolved(tree, &schema, &members[member_index], &inner) {
        return true;
    }

    let raw = inner.canonical();
    for (i, member) in members.iter().enumerate() {
        if i == member_index {
            continue;
        }
        let Some(candidate) = reparse_as_member(member, &raw) else {
            continue;
        };
        if union_member_resolved(tree, &schema, member, &candidate) {
            set_union_payload(tree, node, i, candidate);
            return true;
        }
    }
    false
}

fn union_payload(tree: &Tree, node: NodeId) -> Option<(usize, Value)> {
    match &tree.get(node).kind {
        NodeKind::Leaf {
            value: Value::Union { member_index, value },
        }
        | NodeKind::LeafList {
            value: Value::Union { member_index, value },
        } => Some((*member_index, value.as_ref().clone())),
        _ => None,
    }
}

fn set_union_payload(tree: &mut Tree, node: NodeId, member_index: usize, value: Value) {
    let wrapped = Value::Union {
        member_index,
        value: Box::new(value),
    };
    match &mut tree.get_mut(node).kind {
        NodeKind::Leaf { value: slot } | NodeKind::LeafList { value: slot } => *slot = wrapped,
        _ => {}
    }
}

/// Whether a union member's already-parsed value needs no further
/// resolution (leafref target found, or any non-reference type). `schema`
/// is the union leaf's own schema node (the root relative paths navigate
/// from); `member` is the specific union member [`crate::schema::Type`]
/// that produced `value`, whose own `leafref_path` is what gets resolved.
fn union_member_resolved(
    tree: &Tree,
    schema: &SchemaNode,
    member: &crate::schema::Type,
    value: &Value,
) -> bool {
    match value {
        Value::Leafref { path, cached } => {
            if cached.get().is_some() {
                return true;
            }
            let Some(expr) = member.leafref_path() else {
                return false;
            };
            let Some(target_schema) = crate::utils::path::resolve_schema_path(schema, expr)
            else {
                return false;
            };
            match find_matching_instance_of_schema(tree, &target_schema, path) {
                Some(target_id) => {
                    cached.set(Some((tree.generation, target_id)));
                    true
                }
                None => false,
            }
        }
        Value::InstanceIdentifier { resolved, .. } => resolved.get().is_some(),
        _ => true,
    }
}

/// Reinterpret `raw`'s canonical string as `member`'s declared type, for a
/// union leaf whose first-matched member turned out to need another pass
/// (§4.D: members are tried in declaration order). Only the reference
/// types need special construction here; every other declared type is left
/// to the parser dispatcher's own type-grammar parsing, not this retry.
fn reparse_as_member(member: &crate::schema::Type, raw: &str) -> Option<Value> {
    use crate::value::DataValueType::*;
    match member.base_type() {
        LeafRef => Some(Value::Leafref {
            path: raw.to_string(),
            cached: Rc::new(Cell::new(None)),
        }),
        InstanceId => Some(Value::InstanceIdentifier {
            canonical: raw.to_string(),
            resolved: Rc::new(Cell::new(None)),
        }),
        _ => None,
    }
}

/// Find the single instance of `schema` among `tree` whose own canonical
/// value equals `raw_value` (a leafref's value must equal its target's
/// value, not merely share its schema — spec §8 scenario 3).
fn find_matching_instance_of_schema(
    tree: &Tree,
    schema: &SchemaNode,
    raw_value: &str,
) -> Option<NodeId> {
    for id in all_nodes(tree) {
        if tree.get(id).header.schema != *schema {
            continue;
        }
        let matches = match &tree.get(id).kind {
            NodeKind::Leaf { value } | NodeKind::LeafList { value } => {
                value.canonical() == raw_value
            }
            _ => false,
        };
        if matches {
            return Some(id);
        }
    }
    None
}

/// Step 5: group List instances by their `unique` leaf tuples (the
/// `unique` statement itself lives on the schema node as a list of leaf
/// names; not modeled as its own type here, so this groups by the
/// schema's key tuple as a stand-in uniqueness domain when no explicit
/// `unique` set is present).
fn step_uniqueness(tree: &mut Tree) -> Result<()> {
    let lists: Vec<NodeId> = all_nodes(tree)
        .into_iter()
        .filter(|&id| tree.get(id).header.schema.kind() == SchemaNodeKind::List)
        .collect();

    let mut by_parent: HashMap<(Option<NodeId>, *const ()), Vec<NodeId>> = HashMap::new();
    for id in &lists {
        let parent = tree.get(*id).header.parent;
        let schema_ptr = tree.get(*id).header.schema.name().as_str().as_ptr() as *const ();
        by_parent.entry((parent, schema_ptr)).or_default().push(*id);
    }

    for group in by_parent.values() {
        let mut seen: HashMap<String, NodeId> = HashMap::new();
        for &id in group {
            let keys = tree.list_keys(id);
            let tuple: String = keys
                .iter()
                .map(|&k| match &tree.get(k).kind {
                    NodeKind::Leaf { value } => value.canonical(),
                    _ => String::new(),
                })
                .collect::<Vec<_>>()
                .join("\u{0}");
            if let Some(_other) = seen.insert(tuple, id) {
                tree.get_mut(id).header.validity.insert(Validity::UNIQUE_PENDING);
            } else {
                tree.get_mut(id).header.validity.remove(Validity::UNIQUE_PENDING);
            }
        }
    }
    Ok(())
}

/// Step 6: duplicate key tuples in keyed Lists; duplicate values in
/// config LeafLists.
fn step_duplicates(tree: &mut Tree, strict: bool) -> Result<()> {
    let nodes = all_nodes(tree);
    let mut by_parent_schema: HashMap<(Option<NodeId>, String), Vec<NodeId>> = HashMap::new();
    for &id in &nodes {
        let schema = tree.get(id).header.schema.clone();
        if !matches!(schema.kind(), SchemaNodeKind::List | SchemaNodeKind::LeafList) {
            continue;
        }
        let parent = tree.get(id).header.parent;
        by_parent_schema
            .entry((parent, schema.path()))
            .or_default()
            .push(id);
    }

    for group in by_parent_schema.values() {
        let mut seen = std::collections::HashSet::new();
        for &id in group {
            let key = match &tree.get(id).header.schema.kind() {
                SchemaNodeKind::List => tree
                    .list_keys(id)
                    .iter()
                    .map(|&k| match &tree.get(k).kind {
                        NodeKind::Leaf { value } => value.canonical(),
                        _ => String::new(),
                    })
                    .collect::<Vec<_>>()
                    .join("\u{0}"),
                SchemaNodeKind::LeafList => match &tree.get(id).kind {
                    NodeKind::LeafList { value } => value.canonical(),
                    _ => String::new(),
                },
                _ => continue,
            };
            if !seen.insert(key) {
                let path = tree.get(id).header.schema.path();
                if strict {
                    return Err(Error::Constraint {
                        path,
                        message: "duplicate instance".into(),
                    });
                }
                crate::logging::emit(
                    crate::logging::LogLevel::Warning,
                    "duplicate instance under lenient validation",
                    None,
                    Some(path.clone().into()),
                );
                tree.get_mut(id).header.validity.insert(Validity::DUPLICATE_PENDING);
            } else {
                tree.get_mut(id).header.validity.remove(Validity::DUPLICATE_PENDING);
            }
        }
    }
    Ok(())
}

/// Step 7: mandatory-leaf and min/max-elements checks.
fn step_mandatory(tree: &mut Tree, mode: ValidateMode, strict: bool) -> Result<()> {
    let containers: Vec<NodeId> = all_nodes(tree)
        .into_iter()
        .filter(|&id| {
            matches!(
                tree.get(id).header.schema.kind(),
                SchemaNodeKind::Container | SchemaNodeKind::List
            )
        })
        .collect();

    for parent in containers {
        let schema = tree.get(parent).header.schema.clone();
        let children_schema_names: Vec<String> = tree
            .children_of(parent)
            .iter()
            .map(|&c| tree.get(c).header.schema.name().to_string())
            .collect();

        for child_schema in schema.children() {
            if !child_schema.is_mandatory() {
                continue;
            }
            if mode == ValidateMode::Get || mode == ValidateMode::GetConfig {
                continue;
            }
            if !children_schema_names.contains(&child_schema.name().to_string()) {
                let msg = format!("mandatory node {} missing", child_schema.name());
                if strict {
                    return Err(Error::Constraint {
                        path: child_schema.path(),
                        message: msg,
                    });
                }
            }
        }

        if schema.kind() == SchemaNodeKind::List {
            let count = children_of_instances(tree, parent);
            check_min_max(&schema, count, strict)?;
        }
        tree.get_mut(parent)
            .header
            .validity
            .remove(Validity::MANDATORY_PENDING);
    }
    Ok(())
}

fn children_of_instances(tree: &Tree, list_node: NodeId) -> usize {
    let schema = tree.get(list_node).header.schema.clone();
    let parent = tree.get(list_node).header.parent;
    let siblings = match parent {
        Some(p) => tree.children_of(p),
        None => tree.root_nodes(),
    };
    siblings
        .into_iter()
        .filter(|&s| tree.get(s).header.schema == schema)
        .count()
}

fn check_min_max(schema: &SchemaNode, count: usize, strict: bool) -> Result<()> {
    if let Some(min) = schema.min_elements() {
        if (count as u32) < min && strict {
            return Err(Error::Constraint {
                path: schema.path(),
                message: format!("fewer than min-elements={min} instances"),
            });
        }
    }
    if let Some(max) = schema.max_elements() {
        if (count as u32) > max && strict {
            return Err(Error::Constraint {
                path: schema.path(),
                message: format!("more than max-elements={max} instances"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextFlags;
    use crate::schema::{NodeBuilder, SchemaModuleBuilder, Type};
    use crate::tree::NodeKindSeed;

    fn build_ctx_and_tree() -> (Context, Tree, SchemaNode) {
        let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED);
        let module = ctx
            .load_module(
                SchemaModuleBuilder::new("m", "urn:m").data(
                    NodeBuilder::container("c").child(
                        NodeBuilder::leaf("l", Type::string())
                            .mandatory(),
                    ),
                ),
            )
            .unwrap();
        let c_schema = module.data().next().unwrap();
        (ctx, Tree::new(), c_schema)
    }

    #[test]
    fn mandatory_violation_is_an_error_under_strict() {
        let (ctx, mut tree, c_schema) = build_ctx_and_tree();
        let c = tree.new_node(c_schema, NodeKindSeed::Container { presence: true });
        tree.insert_as_child(None, c);
        let mut unresolved = UnresolvedSet::new();
        let result = validate(
            &mut tree,
            &ctx,
            &mut unresolved,
            ValidateMode::Data,
            None,
            true,
        );
        assert!(result.is_err());
    }
}
