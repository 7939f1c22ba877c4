//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! RFC 7951 JSON printer (spec §4.H/§6.3). Member names follow the same
//! qualification rule [`crate::parse::json`] reads back: `module:name` only
//! where the namespace changes from the parent, plain `name` otherwise.
//! `list`/`leaf-list` instances always render as a JSON array, even a
//! single-entry one; metadata annotations (RFC 7952) ride along as a
//! `name@` sibling member.

use super::{container_is_worth_printing, should_print, PrintOptions, PrintDecision};
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::tree::{AnyValue, NodeId, NodeKind, Tree};
use crate::value::Value;
use serde_json::{Map, Value as Json};

pub fn print(tree: &Tree, roots: &[NodeId], opts: &PrintOptions) -> String {
    let mut items = Vec::new();
    for &id in roots {
        let decision = should_print(tree, id, opts);
        if decision.print {
            items.push((id, decision.tag_default));
        }
        if !opts.with_siblings {
            break;
        }
    }
    let map = build_object(tree, &items, None, opts);
    let json = Json::Object(map);
    if opts.pretty {
        serde_json::to_string_pretty(&json).unwrap_or_default()
    } else {
        serde_json::to_string(&json).unwrap_or_default()
    }
}

fn qualified_key(schema: &SchemaNode, parent_module: Option<&str>) -> (String, String) {
    let module = schema.module().name().to_string();
    let name = schema.name().to_string();
    let key = if parent_module == Some(module.as_str()) {
        name
    } else {
        format!("{module}:{name}")
    };
    (key, module)
}

/// Build the JSON object for one run of already-filtered siblings,
/// grouping consecutive `list`/`leaf-list` instances of the same schema
/// into a single array member.
fn build_object(tree: &Tree, items: &[(NodeId, bool)], parent_module: Option<&str>, opts: &PrintOptions) -> Map<String, Json> {
    let mut map = Map::new();
    let mut meta = Map::new();
    let mut i = 0;
    while i < items.len() {
        let (id, tag_default) = items[i];
        let schema = tree.get(id).header.schema.clone();
        let (key, module) = qualified_key(&schema, parent_module);

        if matches!(schema.kind(), SchemaNodeKind::List | SchemaNodeKind::LeafList) {
            let mut j = i + 1;
            while j < items.len() && tree.get(items[j].0).header.schema == schema {
                j += 1;
            }
            let mut values = Vec::with_capacity(j - i);
            let mut metas = Vec::with_capacity(j - i);
            let mut any_meta = false;
            for &(rid, rtag) in &items[i..j] {
                let (value, instance_meta) = node_value(tree, rid, &module, rtag, opts);
                values.push(value);
                any_meta |= instance_meta.is_some();
                metas.push(instance_meta.unwrap_or(Json::Null));
            }
            map.insert(key.clone(), Json::Array(values));
            if any_meta {
                meta.insert(format!("{key}@"), Json::Array(metas));
            }
            i = j;
        } else {
            if let NodeKind::Container { presence, .. } = &tree.get(id).kind {
                let children = super::printable_children(tree, id, opts);
                if !container_is_worth_printing(!children.is_empty(), *presence, opts) {
                    i += 1;
                    continue;
                }
            }
            let (value, instance_meta) = node_value(tree, id, &module, tag_default, opts);
            map.insert(key.clone(), value);
            if let Some(m) = instance_meta {
                meta.insert(format!("{key}@"), m);
            }
            i += 1;
        }
    }
    for (k, v) in meta {
        map.insert(k, v);
    }
    map
}

fn attrs_object(tree: &Tree, id: NodeId) -> Option<Json> {
    let attrs = &tree.get(id).header.attrs;
    if attrs.is_empty() {
        return None;
    }
    let mut obj = Map::new();
    for attr in attrs {
        let key = if attr.module.as_str().is_empty() {
            attr.name.to_string()
        } else {
            format!("{}:{}", attr.module, attr.name)
        };
        obj.insert(key, Json::String(attr.value.clone()));
    }
    Some(Json::Object(obj))
}

fn node_value(tree: &Tree, id: NodeId, module: &str, tag_default: bool, opts: &PrintOptions) -> (Json, Option<Json>) {
    let node = tree.get(id);
    let meta = attrs_with_default(tree, id, tag_default);
    let value = match &node.kind {
        NodeKind::Leaf { value } | NodeKind::LeafList { value } => value_to_json(value),
        NodeKind::Any { value } => any_to_json(tree, value, module, opts),
        NodeKind::Container { .. } | NodeKind::List { .. } | NodeKind::OpRoot { .. } => {
            let children = super::printable_children(tree, id, opts);
            Json::Object(build_object(tree, &children, Some(module), opts))
        }
    };
    (value, meta)
}

const WD_MODULE: &str = "ietf-netconf-with-defaults";

/// RFC 7952 metadata for one instance, folding in the `default="true"`
/// with-defaults tag alongside any real attributes already on the node.
fn attrs_with_default(tree: &Tree, id: NodeId, tag_default: bool) -> Option<Json> {
    let real = attrs_object(tree, id);
    if !tag_default {
        return real;
    }
    let mut obj = match real {
        Some(Json::Object(obj)) => obj,
        _ => Map::new(),
    };
    obj.insert(format!("{WD_MODULE}:default"), Json::Bool(true));
    Some(Json::Object(obj))
}

fn any_to_json(tree: &Tree, value: &AnyValue, module: &str, opts: &PrintOptions) -> Json {
    match value {
        AnyValue::Json(s) => serde_json::from_str(s).unwrap_or(Json::Null),
        AnyValue::Xml(s) | AnyValue::String(s) => Json::String(s.clone()),
        AnyValue::Binary(b) => Json::String(Value::Binary(b.clone()).canonical()),
        AnyValue::DataTree(nested) => {
            let items: Vec<(NodeId, bool)> = nested
                .iter()
                .filter_map(|&id| {
                    let decision: PrintDecision = should_print(tree, id, opts);
                    decision.print.then_some((id, decision.tag_default))
                })
                .collect();
            Json::Object(build_object(tree, &items, Some(module), opts))
        }
    }
}

/// RFC 7951 §6.1: 64-bit integers and `decimal64` render as a quoted JSON
/// string (to survive JSON's own double-precision number limits); every
/// other scalar uses its natural JSON shape.
fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Uint8(v) => Json::from(*v),
        Value::Uint16(v) => Json::from(*v),
        Value::Uint32(v) => Json::from(*v),
        Value::Int8(v) => Json::from(*v),
        Value::Int16(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Bool(v) => Json::Bool(*v),
        Value::Empty => Json::Null,
        Value::Uint64(_)
        | Value::Int64(_)
        | Value::Decimal64 { .. }
        | Value::String(_)
        | Value::Binary(_)
        | Value::Bits(_)
        | Value::Enum(..)
        | Value::IdentityRef(_)
        | Value::InstanceIdentifier { .. }
        | Value::Leafref { .. } => Json::String(value.canonical()),
        Value::Union { value, .. } => value_to_json(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextFlags};
    use crate::parse;
    use crate::schema::{NodeBuilder, SchemaModuleBuilder, Type};
    use crate::validate::UnresolvedSet;

    fn sample_ctx() -> Context {
        let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED);
        ctx.load_module(
            SchemaModuleBuilder::new("m", "urn:m")
                .data(
                    NodeBuilder::container("c")
                        .child(NodeBuilder::leaf("l", Type::int32()))
                        .child(NodeBuilder::leaf_list("ll", Type::string())),
                ),
        )
        .unwrap();
        ctx
    }

    #[test]
    fn qualifies_top_level_member_only() {
        let ctx = sample_ctx();
        let mut tree = Tree::new();
        let mut unresolved = UnresolvedSet::new();
        let parsed = parse::json::parse(r#"{"m:c":{"l":1}}"#).unwrap();
        parse::dispatch(&ctx, &mut tree, &mut unresolved, None, None, &parsed, false).unwrap();
        let roots = tree.root_nodes();

        let out = print(&tree, &roots, &PrintOptions::default());
        assert_eq!(out, r#"{"m:c":{"l":1}}"#);
    }

    #[test]
    fn leaf_list_always_renders_as_array() {
        let ctx = sample_ctx();
        let mut tree = Tree::new();
        let mut unresolved = UnresolvedSet::new();
        let parsed = parse::json::parse(r#"{"m:c":{"ll":["a"]}}"#).unwrap();
        parse::dispatch(&ctx, &mut tree, &mut unresolved, None, None, &parsed, false).unwrap();
        let roots = tree.root_nodes();

        let out = print(&tree, &roots, &PrintOptions::default());
        assert_eq!(out, r#"{"m:c":{"ll":["a"]}}"#);
    }
}
