//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Binary-format parser (spec §4.G/§6.5).
//!
//! Unlike [`super::xml`]/[`super::json`], this format is schema-directed at
//! write time already: every non-toplevel node is identified by a
//! sibling-hash byte resolved against its *parent's* schema children, not
//! by a name string. That means decoding never needs the [`super::ParsedNode`]
//! intermediate form — each chunk carries enough information to build its
//! `NodeId` directly into the `Tree` as it is read. Top-level nodes have no
//! parent schema to hash against, so they are framed with an explicit
//! module-name/node-name pair instead, mirroring the teacher's on-disk
//! format for path roots.

use crate::binary::{decode_tag, decode_value_payload, find_schema_child_by_hash, ChunkReader, MAGIC, VERSION};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::tree::{AnyValue, NodeId, NodeKindSeed, OpRootKind, Tree};
use crate::validate::{UnresolvedKind, UnresolvedSet};

fn err() -> Error {
    Error::InputSyntax {
        format: "binary",
        path: None,
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Result<u8> {
        let b = *self.bytes.get(self.pos).ok_or_else(err)?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16> {
        let s: [u8; 2] = self.bytes.get(self.pos..self.pos + 2).ok_or_else(err)?.try_into().unwrap();
        self.pos += 2;
        Ok(u16::from_le_bytes(s))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        let s = self.bytes.get(self.pos..self.pos + len).ok_or_else(err)?;
        self.pos += len;
        String::from_utf8(s.to_vec()).map_err(|_| err())
    }

    /// Read one chunked subtree (reassembling any daisy-chained pieces)
    /// starting at the current position, returning its body and advancing
    /// past it.
    fn chunk(&mut self) -> Result<Vec<u8>> {
        let mut cr = ChunkReader::new(&self.bytes[self.pos..]);
        let body = cr.read_chunked()?;
        self.pos += cr.position();
        Ok(body)
    }
}

/// Parse a complete binary-encoded document, creating top-level roots
/// directly under `parent` (`None` for the tree's own roots).
pub fn parse(
    ctx: &Context,
    tree: &mut Tree,
    unresolved: &mut UnresolvedSet,
    input: &[u8],
) -> Result<Vec<NodeId>> {
    let mut r = Reader { bytes: input, pos: 0 };
    if input.len() < 4 || &input[0..3] != &MAGIC || input[3] != VERSION {
        return Err(err());
    }
    r.pos = 4;

    let count = r.u16()? as usize;
    let mut roots = Vec::with_capacity(count);
    for _ in 0..count {
        let module = r.string()?;
        let name = r.string()?;
        let schema = ctx
            .get_module(&module)
            .and_then(|m| m.data().find(|n| n.name().as_str() == name))
            .ok_or_else(|| Error::Schema {
                path: format!("{module}:{name}"),
            })?;
        let body = r.chunk()?;
        let id = decode_node(ctx, tree, unresolved, None, &schema, &body)?;
        roots.push(id);
    }
    tree.schema_sort(None);
    Ok(roots)
}

/// Decode one node's already-reassembled chunk body: a value-tag byte plus
/// payload for leaves/leaf-lists/anydata, or a child count followed by
/// `(byte_index, byte_value, nested chunk)` triples for containers/lists/
/// operation roots.
fn decode_node(
    ctx: &Context,
    tree: &mut Tree,
    unresolved: &mut UnresolvedSet,
    parent: Option<NodeId>,
    schema: &SchemaNode,
    body: &[u8],
) -> Result<NodeId> {
    let mut r = Reader { bytes: body, pos: 0 };

    let seed = match schema.kind() {
        SchemaNodeKind::Leaf | SchemaNodeKind::LeafList => {
            let tag = r.u8()?;
            let (_default, _user_plugin, is_unresolved, _ty_tag) = decode_tag(tag);
            let ty = schema.leaf_type().ok_or_else(|| Error::Schema { path: schema.path() })?;
            let value = decode_value_payload(&ty, is_unresolved, &body[r.pos..])?;
            if schema.kind() == SchemaNodeKind::Leaf {
                NodeKindSeed::Leaf(value)
            } else {
                NodeKindSeed::LeafList(value)
            }
        }
        SchemaNodeKind::AnyData => {
            let _tag = r.u8()?;
            let s = String::from_utf8(body[r.pos..].to_vec()).unwrap_or_default();
            NodeKindSeed::Any(AnyValue::String(s))
        }
        SchemaNodeKind::Container => NodeKindSeed::Container {
            presence: schema.has_presence(),
        },
        SchemaNodeKind::List => NodeKindSeed::List,
        SchemaNodeKind::Rpc => NodeKindSeed::OpRoot(OpRootKind::Rpc),
        SchemaNodeKind::Notification => NodeKindSeed::OpRoot(OpRootKind::Notification),
        SchemaNodeKind::Action => NodeKindSeed::OpRoot(OpRootKind::Action),
        SchemaNodeKind::Input | SchemaNodeKind::Output | SchemaNodeKind::Choice | SchemaNodeKind::Case => {
            return Err(Error::Schema { path: schema.path() });
        }
    };

    let is_internal = matches!(
        schema.kind(),
        SchemaNodeKind::Container
            | SchemaNodeKind::List
            | SchemaNodeKind::Rpc
            | SchemaNodeKind::Notification
            | SchemaNodeKind::Action
    );

    let id = tree.new_node(schema.clone(), seed);
    tree.insert_as_child(parent, id);
    schedule_unresolved(tree, unresolved, id);

    if is_internal {
        let expanded = expand_schema_only(schema);
        let child_count = r.u16()?;
        for _ in 0..child_count {
            let byte_index = r.u8()?;
            let byte_value = r.u8()?;
            let child_schema = find_schema_child_by_hash(&expanded, byte_index, byte_value)
                .ok_or_else(|| Error::Schema { path: schema.path() })?;
            let body = r.chunk()?;
            decode_node(ctx, tree, unresolved, Some(id), &child_schema, &body)?;
        }
        tree.schema_sort(Some(id));
    }

    Ok(id)
}

/// Flatten `choice`/`case` wrapper children into the concrete data nodes
/// they contain, the same way [`super::find_schema_child`] does for the
/// textual formats, so the sibling-hash table only ever sees real data
/// node schemas.
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

fn schedule_unresolved(tree: &Tree, unresolved: &mut UnresolvedSet, id: NodeId) {
    let value = match &tree.get(id).kind {
        crate::tree::NodeKind::Leaf { value } | crate::tree::NodeKind::LeafList { value } => value,
        _ => return,
    };
    match value {
        crate::value::Value::Leafref { .. } => unresolved.push(UnresolvedKind::Leafref, id),
        crate::value::Value::InstanceIdentifier { .. } => unresolved.push(UnresolvedKind::InstanceId, id),
        crate::value::Value::Union { .. } => unresolved.push(UnresolvedKind::Union, id),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{encode_tag, encode_value_payload, resolve_hash_byte_index, ChunkWriter};
    use crate::context::{Context, ContextFlags};
    use crate::schema::{NodeBuilder, SchemaModuleBuilder, Type};
    use crate::value::{DataValueType, Value};

    fn sample_ctx() -> Context {
        let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED);
        ctx.load_module(
            SchemaModuleBuilder::new("m", "urn:m")
                .data(NodeBuilder::container("c").child(NodeBuilder::leaf("l", Type::string()))),
        )
        .unwrap();
        ctx
    }

    fn encode_sample(ctx: &Context) -> Vec<u8> {
        let c_schema = ctx.get_module("m").unwrap().data().find(|n| n.name().as_str() == "c").unwrap();
        let l_schema = c_schema.children().find(|n| n.name().as_str() == "l").unwrap();

        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&(1u16).to_le_bytes());
        buf.extend_from_slice(b"m");
        buf.extend_from_slice(&(1u16).to_le_bytes());
        buf.extend_from_slice(b"c");

        let mut w = ChunkWriter::new();
        w.start_chunk(&mut buf);
        let siblings: Vec<_> = c_schema.children().collect();
        let byte_index = resolve_hash_byte_index(&l_schema, &siblings).unwrap();
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.push(byte_index);
        buf.push(l_schema.sibling_hash_bytes()[byte_index as usize]);
        w.start_chunk(&mut buf);
        buf.push(encode_tag(false, false, false, DataValueType::String));
        buf.extend_from_slice(&encode_value_payload(&Value::String("hi".into())));
        w.end_chunk(&mut buf);
        w.end_chunk(&mut buf);
        buf
    }

    #[test]
    fn decodes_container_with_leaf_child() {
        let ctx = sample_ctx();
        let bytes = encode_sample(&ctx);
        let mut tree = Tree::new();
        let mut unresolved = UnresolvedSet::new();
        let roots = parse(&ctx, &mut tree, &mut unresolved, &bytes).unwrap();
        assert_eq!(roots.len(), 1);
        let children = tree.children_of(roots[0]);
        assert_eq!(children.len(), 1);
        match &tree.get(children[0]).kind {
            crate::tree::NodeKind::Leaf { value } => {
                assert_eq!(value.canonical(), "hi");
            }
            _ => panic!("expected leaf"),
        }
    }
}
