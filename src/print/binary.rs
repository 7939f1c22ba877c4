//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Binary (lyb) printer (spec §4.H/§6.5). Mirrors [`crate::parse::binary`]'s
//! envelope byte-for-byte: top-level roots get an explicit module-name/
//! node-name frame, everything below is schema-directed through the
//! sibling-hash table, and every subtree is wrapped in a [`ChunkWriter`]
//! chunk so daisy-chaining kicks in automatically for anything over 255
//! bytes.

use super::{should_print, PrintOptions};
use crate::binary::{encode_tag, encode_value_payload, resolve_hash_byte_index, ChunkWriter, MAGIC, VERSION};
use crate::schema::SchemaNode;
use crate::tree::{AnyValue, NodeId, NodeKind, Tree};
use crate::value::{DataValueType, Value};

pub fn print(tree: &Tree, roots: &[NodeId], opts: &PrintOptions) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC);
    buf.push(VERSION);

    let mut printable = Vec::new();
    for &id in roots {
        let decision = should_print(tree, id, opts);
        if decision.print {
            printable.push(id);
        }
        if !opts.with_siblings {
            break;
        }
    }

    buf.extend_from_slice(&(printable.len() as u16).to_le_bytes());
    let mut w = ChunkWriter::new();
    for id in printable {
        let schema = tree.get(id).header.schema.clone();
        write_string(&mut buf, schema.module().name().as_str());
        write_string(&mut buf, schema.name().as_str());
        w.start_chunk(&mut buf);
        encode_node(tree, id, opts, &mut w, &mut buf);
        w.end_chunk(&mut buf);
    }
    buf
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u16).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Same schema-only flattening [`crate::parse::binary`] does before
/// building the sibling-hash table, so the byte emitted here matches what
/// the reader resolves against.
fn expand_schema_only(parent: &SchemaNode) -> Vec<SchemaNode> {
    let mut out = Vec::new();
    for child in parent.children() {
        collect_concrete(&child, &mut out);
    }
    out
}

fn collect_concrete(schema: &SchemaNode, out: &mut Vec<SchemaNode>) {
    if schema.is_schema_only() {
        for child in schema.children() {
            collect_concrete(&child, out);
        }
    } else {
        out.push(schema.clone());
    }
}

fn encode_node(tree: &Tree, id: NodeId, opts: &PrintOptions, w: &mut ChunkWriter, buf: &mut Vec<u8>) {
    let node = tree.get(id);
    let schema = node.header.schema.clone();
    let is_default = node.is_default();

    match &node.kind {
        NodeKind::Leaf { value } | NodeKind::LeafList { value } => {
            buf.push(encode_tag(is_default, false, false, value.value_type()));
            buf.extend_from_slice(&encode_value_payload(value));
        }
        NodeKind::Any { value } => {
            buf.push(encode_tag(is_default, false, false, DataValueType::Binary));
            buf.extend_from_slice(any_bytes(value).as_bytes());
        }
        NodeKind::Container { .. } | NodeKind::List { .. } | NodeKind::OpRoot { .. } => {
            let children = super::printable_children(tree, id, opts);
            let expanded = expand_schema_only(&schema);
            buf.extend_from_slice(&(children.len() as u16).to_le_bytes());
            for (child, _) in children {
                let child_schema = tree.get(child).header.schema.clone();
                let byte_index = resolve_hash_byte_index(&child_schema, &expanded).unwrap_or(0);
                buf.push(byte_index);
                buf.push(child_schema.sibling_hash_bytes()[byte_index as usize]);
                w.start_chunk(buf);
                encode_node(tree, child, opts, w, buf);
                w.end_chunk(buf);
            }
        }
    }
}

fn any_bytes(value: &AnyValue) -> String {
    match value {
        AnyValue::Xml(s) | AnyValue::Json(s) | AnyValue::String(s) => s.clone(),
        AnyValue::Binary(b) => Value::Binary(b.clone()).canonical(),
        AnyValue::DataTree(_) => String::new(),
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
                .data(NodeBuilder::container("c").child(NodeBuilder::leaf("l", Type::string()))),
        )
        .unwrap();
        ctx
    }

    #[test]
    fn roundtrips_through_binary_parser() {
        let ctx = sample_ctx();
        let mut tree = Tree::new();
        let mut unresolved = UnresolvedSet::new();
        let parsed = parse::json::parse(r#"{"m:c":{"l":"hi"}}"#).unwrap();
        parse::dispatch(&ctx, &mut tree, &mut unresolved, None, None, &parsed, false).unwrap();
        let roots = tree.root_nodes();

        let bytes = print(&tree, &roots, &PrintOptions::default());

        let mut tree2 = Tree::new();
        let mut unresolved2 = UnresolvedSet::new();
        let roots2 = parse::binary::parse(&ctx, &mut tree2, &mut unresolved2, &bytes).unwrap();
        assert_eq!(roots2.len(), 1);
        let children = tree2.children_of(roots2[0]);
        assert_eq!(children.len(), 1);
        match &tree2.get(children[0]).kind {
            NodeKind::Leaf { value } => assert_eq!(value.canonical(), "hi"),
            _ => panic!("expected leaf"),
        }
    }
}
