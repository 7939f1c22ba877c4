//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! XML printer (spec §4.H/§6.2). Each subtree root gets its own `xmlns`
//! declaration; descendants only repeat it when they cross into a
//! different module than their parent.

use super::{container_is_worth_printing, printable_children, should_print, PrintOptions};
use crate::parse::xml::escape_text;
use crate::schema::SchemaNodeKind;
use crate::tree::{AnyValue, NodeId, NodeKind, Tree};

const WD_NS: &str = "urn:ietf:params:xml:ns:netconf:default:1.0";

pub fn print(tree: &Tree, roots: &[NodeId], opts: &PrintOptions) -> String {
    let mut out = String::new();
    for &id in roots {
        let decision = should_print(tree, id, opts);
        if decision.print {
            print_node(tree, id, opts, None, &mut out, 0, decision.tag_default);
        }
        if !opts.with_siblings {
            break;
        }
    }
    out
}

fn indent(out: &mut String, opts: &PrintOptions, depth: usize) {
    if opts.pretty {
        out.push('\n');
        for _ in 0..depth {
            out.push_str("  ");
        }
    }
}

fn print_node(
    tree: &Tree,
    id: NodeId,
    opts: &PrintOptions,
    parent_module: Option<&str>,
    out: &mut String,
    depth: usize,
    tag_default: bool,
) {
    let node = tree.get(id);
    let schema = node.header.schema.clone();
    let module = schema.module().name().to_string();
    let name = schema.name().to_string();
    let is_new_module = parent_module != Some(module.as_str());

    let children = match &node.kind {
        NodeKind::Container { .. } | NodeKind::List { .. } | NodeKind::OpRoot { .. } => {
            Some(printable_children(tree, id, opts))
        }
        _ => None,
    };

    if let NodeKind::Container { presence, .. } = &node.kind {
        let has_children = children.as_ref().is_some_and(|c| !c.is_empty());
        if !container_is_worth_printing(has_children, *presence, opts) {
            return;
        }
    }

    indent(out, opts, depth);
    out.push('<');
    out.push_str(&name);
    if is_new_module {
        out.push_str(" xmlns=\"");
        out.push_str(schema.module().namespace());
        out.push('"');
    }
    for attr in &node.header.attrs {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape_text(&attr.value));
        out.push('"');
    }
    if tag_default {
        out.push_str(" xmlns:wd=\"");
        out.push_str(WD_NS);
        out.push_str("\" wd:default=\"true\"");
    }

    match &node.kind {
        NodeKind::Leaf { value } | NodeKind::LeafList { value } => {
            out.push('>');
            out.push_str(&escape_text(&value.canonical()));
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        NodeKind::Any { value } => {
            out.push('>');
            match value {
                AnyValue::Xml(s) | AnyValue::String(s) | AnyValue::Json(s) => out.push_str(s),
                AnyValue::Binary(b) => out.push_str(&crate::value::Value::Binary(b.clone()).canonical()),
                AnyValue::DataTree(nested) => {
                    for &child in nested {
                        let decision = should_print(tree, child, opts);
                        if decision.print {
                            print_node(tree, child, opts, Some(&module), out, depth + 1, decision.tag_default);
                        }
                    }
                }
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
        NodeKind::Container { .. } | NodeKind::List { .. } | NodeKind::OpRoot { .. } => {
            out.push('>');
            for (child, child_tag) in children.unwrap_or_default() {
                print_node(tree, child, opts, Some(&module), out, depth + 1, child_tag);
            }
            indent(out, opts, depth);
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }
    }
}

/// Rewrite an `action` node's XML fragment to the `yang:action` NETCONF
/// wrapper (spec §4.H's `netconf` option), used only for RPC-shaped
/// operation roots under NETCONF framing.
pub fn wrap_netconf_action(schema_kind: SchemaNodeKind, body: &str) -> String {
    if schema_kind != SchemaNodeKind::Action {
        return body.to_string();
    }
    format!("<action xmlns=\"urn:ietf:params:xml:ns:yang:1\">{body}</action>")
}
