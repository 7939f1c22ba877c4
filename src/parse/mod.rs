//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Parser Dispatcher (spec §4.G).
//!
//! Each wire format gets its own tokenizer ([`xml`], [`json`]) that only
//! knows how to turn raw bytes into a format-agnostic [`ParsedNode`] forest;
//! [`binary`] is schema-directed already (the sibling hash table tells the
//! reader which child it is looking at) and so skips the intermediate
//! representation entirely, building [`crate::tree::NodeId`]s straight from
//! the byte stream. Everything downstream of tokenizing — namespace/prefix
//! resolution, schema lookup (transparent through `choice`/`case`), value
//! parsing, auto-delete on conflicting case, scheduling unresolved
//! references, and key-ordered insertion — lives in [`dispatch`] here, so
//! XML and JSON share one implementation of the eight-step pipeline.

pub mod binary;
pub mod json;
pub mod xml;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::tree::{AnyValue, NodeId, NodeKindSeed, OpRootKind, Tree};
use crate::validate::UnresolvedKind;
use crate::value::{parse_value, Value};

/// One format-agnostic parsed node, produced by a tokenizer and consumed by
/// [`dispatch`]. Containers/lists/anydata carry `children`; leaves/leaf-lists
/// carry `value` instead.
#[derive(Debug, Clone, Default)]
pub struct ParsedNode {
    /// Module name or prefix as written on the wire (`None` inherits the
    /// previous sibling's/parent's module, per §6.4).
    pub module: Option<String>,
    pub name: String,
    pub value: Option<String>,
    pub attrs: Vec<ParsedAttr>,
    pub children: Vec<ParsedNode>,
}

#[derive(Debug, Clone)]
pub struct ParsedAttr {
    pub module: Option<String>,
    pub name: String,
    pub value: String,
}

/// Find `name` among `parent_schema`'s children, stepping transparently
/// through `choice`/`case` wrapper nodes (§3.1: those nodes are schema-only,
/// never materialized in the data tree).
pub(crate) fn find_schema_child(parent_schema: &SchemaNode, name: &str) -> Option<SchemaNode> {
    for child in parent_schema.children() {
        if child.is_schema_only() {
            if let Some(found) = find_schema_child(&child, name) {
                return Some(found);
            }
        } else if child.name().as_str() == name {
            return Some(child);
        }
    }
    None
}

pub(crate) fn find_toplevel_schema(ctx: &Context, module: Option<&str>, name: &str) -> Option<SchemaNode> {
    match module {
        Some(m) => ctx.get_module(m)?.data().find(|n| n.name().as_str() == name),
        None => ctx.modules().find_map(|m| m.data().find(|n| n.name().as_str() == name)),
    }
}

/// The nearest enclosing `choice` schema node between `schema` and
/// `boundary` (exclusive), if any.
fn choice_of(schema: &SchemaNode, boundary: &SchemaNode) -> Option<SchemaNode> {
    let mut cur = schema.parent();
    while let Some(n) = cur {
        if n == *boundary {
            return None;
        }
        if n.kind() == SchemaNodeKind::Choice {
            return Some(n);
        }
        cur = n.parent();
    }
    None
}

/// The nearest enclosing `case` schema node between `schema` and `boundary`
/// (exclusive), if any.
fn case_of(schema: &SchemaNode, boundary: &SchemaNode) -> Option<SchemaNode> {
    let mut cur = schema.parent();
    while let Some(n) = cur {
        if n == *boundary {
            return None;
        }
        if n.kind() == SchemaNodeKind::Case {
            return Some(n);
        }
        cur = n.parent();
    }
    None
}

/// Auto-delete siblings belonging to a different `case` of the same
/// `choice` as `new_schema` (§4.E invariant: setting a node from one case
/// removes every instance from every other case of that choice).
fn auto_delete_conflicting_case(
    tree: &mut Tree,
    parent: Option<NodeId>,
    parent_schema: &SchemaNode,
    new_schema: &SchemaNode,
) {
    let Some(choice) = choice_of(new_schema, parent_schema) else {
        return;
    };
    let new_case = case_of(new_schema, parent_schema);
    let siblings = match parent {
        Some(p) => tree.children_of(p),
        None => tree.root_nodes(),
    };
    for sibling in siblings {
        let sibling_schema = tree.get(sibling).header.schema.clone();
        if choice_of(&sibling_schema, parent_schema) == Some(choice.clone())
            && case_of(&sibling_schema, parent_schema) != new_case
        {
            tree.unlink(sibling);
            tree.free_subtree(sibling);
        }
    }
}

/// Run the eight-step pipeline (§4.G) over `nodes`, inserting the resulting
/// data nodes as children of `parent` (`None` for top-level roots).
///
/// `strict` governs key-ordered insertion (§4.E, §8 scenario 2): if
/// `parent` is a keyed List and the key leaves just parsed land out of
/// their schema-declared order, strict mode is a fatal [`Error::Constraint`];
/// lenient mode repairs the order via [`Tree::schema_sort`] and continues.
pub fn dispatch(
    ctx: &Context,
    tree: &mut Tree,
    unresolved: &mut crate::validate::UnresolvedSet,
    parent: Option<NodeId>,
    default_module: Option<&str>,
    nodes: &[ParsedNode],
    strict: bool,
) -> Result<Vec<NodeId>> {
    let parent_schema = parent.map(|p| tree.get(p).header.schema.clone());
    let mut created = Vec::new();

    for pn in nodes {
        let module_name = pn.module.as_deref().or(default_module);
        let schema = match &parent_schema {
            Some(ps) => find_schema_child(ps, &pn.name),
            None => find_toplevel_schema(ctx, module_name, &pn.name),
        }
        .ok_or_else(|| Error::Schema {
            path: format!("{}:{}", module_name.unwrap_or("?"), pn.name),
        })?;

        if let Some(ps) = &parent_schema {
            auto_delete_conflicting_case(tree, parent, ps, &schema);
        }

        let id = build_node(ctx, tree, unresolved, parent, &schema, pn, strict)?;
        created.push(id);
    }

    if let Some(p) = parent {
        if schema_children_out_of_order(tree, p) {
            if strict && tree.get(p).header.schema.kind() == SchemaNodeKind::List {
                return Err(Error::Constraint {
                    path: tree.get(p).header.schema.path(),
                    message: "list key leaves out of declared order".into(),
                });
            }
            crate::logging::emit(
                crate::logging::LogLevel::Warning,
                "list key leaves out of declared order, repairing placement",
                None,
                Some(tree.get(p).header.schema.path().into()),
            );
            tree.schema_sort(parent);
        }
    } else {
        tree.schema_sort(parent);
    }
    Ok(created)
}

/// Whether `parent`'s current children deviate from their schema's
/// declaration order (invariant 2), i.e. whether [`Tree::schema_sort`]
/// would actually move anything.
fn schema_children_out_of_order(tree: &Tree, parent: NodeId) -> bool {
    let children = tree.children_of(parent);
    if children.len() < 2 {
        return false;
    }
    let schema_children: Vec<SchemaNode> = tree.get(parent).header.schema.children().collect();
    let rank = |id: NodeId| -> usize {
        let schema = tree.get(id).header.schema.clone();
        schema_children.iter().position(|s| *s == schema).unwrap_or(usize::MAX)
    };
    let ranks: Vec<usize> = children.iter().map(|&id| rank(id)).collect();
    let mut sorted = ranks.clone();
    sorted.sort();
    ranks != sorted
}

fn build_node(
    ctx: &Context,
    tree: &mut Tree,
    unresolved: &mut crate::validate::UnresolvedSet,
    parent: Option<NodeId>,
    schema: &SchemaNode,
    pn: &ParsedNode,
    strict: bool,
) -> Result<NodeId> {
    let seed = match schema.kind() {
        SchemaNodeKind::Container => NodeKindSeed::Container {
            presence: schema.has_presence(),
        },
        SchemaNodeKind::List => NodeKindSeed::List,
        SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
            let raw = pn.value.as_deref().unwrap_or_default();
            let ty = schema
                .leaf_type()
                .ok_or_else(|| Error::Schema { path: schema.path() })?;
            let value = parse_value(&ty, raw)?;
            if schema.kind() == SchemaNodeKind::Leaf {
                NodeKindSeed::Leaf(value)
            } else {
                NodeKindSeed::LeafList(value)
            }
        }
        SchemaNodeKind::AnyData => {
            NodeKindSeed::Any(AnyValue::String(pn.value.clone().unwrap_or_default()))
        }
        SchemaNodeKind::Rpc => NodeKindSeed::OpRoot(OpRootKind::Rpc),
        SchemaNodeKind::Notification => NodeKindSeed::OpRoot(OpRootKind::Notification),
        SchemaNodeKind::Action => NodeKindSeed::OpRoot(OpRootKind::Action),
        SchemaNodeKind::Input | SchemaNodeKind::Output | SchemaNodeKind::Choice | SchemaNodeKind::Case => {
            return Err(Error::Schema { path: schema.path() });
        }
    };

    let id = tree.new_node(schema.clone(), seed);
    tree.insert_as_child(parent, id);

    for attr in &pn.attrs {
        tree.get_mut(id).header.attrs.push(crate::tree::Attribute {
            module: crate::dictionary::intern(attr.module.as_deref().unwrap_or("")),
            name: crate::dictionary::intern(&attr.name),
            value: attr.value.clone(),
        });
    }

    schedule_unresolved(tree, unresolved, id);

    if !pn.children.is_empty() {
        dispatch(ctx, tree, unresolved, Some(id), None, &pn.children, strict)?;
    }
    Ok(id)
}

fn schedule_unresolved(tree: &Tree, unresolved: &mut crate::validate::UnresolvedSet, id: NodeId) {
    let value = match &tree.get(id).kind {
        crate::tree::NodeKind::Leaf { value } | crate::tree::NodeKind::LeafList { value } => value,
        _ => return,
    };
    match value {
        Value::Leafref { .. } => unresolved.push(UnresolvedKind::Leafref, id),
        Value::InstanceIdentifier { .. } => unresolved.push(UnresolvedKind::InstanceId, id),
        Value::Union { .. } => unresolved.push(UnresolvedKind::Union, id),
        _ => {}
    }
    let schema = tree.get(id).header.schema.clone();
    if !schema.whens().is_empty() {
        unresolved.push(UnresolvedKind::When, id);
    }
    if !schema.musts().is_empty() {
        unresolved.push(UnresolvedKind::Must, id);
    }
}
