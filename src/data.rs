//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG instance data (spec §4.C/§4.E).
//!
//! [`DataTree`] owns one arena ([`crate::tree::Tree`]) plus the append-only
//! work list ([`UnresolvedSet`]) the parser leaves behind for the validator
//! to drain. Every operation that used to walk a `*mut lyd_node` graph by
//! hand — path creation, removal, diff/merge, printing — is a thin
//! dispatcher here onto the modules that actually implement it
//! ([`crate::parse`], [`crate::print`], [`crate::validate`], [`crate::diff`]).
//! [`DataNodeRef`] is a lightweight `(&DataTree, NodeId)` handle, cheap to
//! copy and safe to hand out by the dozen from an iterator.

use std::io::{Read, Write};

use crate::context::Context;
use crate::diff::{self, DiffEntry, DiffKind, DiffList};
use crate::error::{Error, Result};
use crate::iter::{Ancestors, NodeIterable, Siblings, Traverse};
use crate::parse;
use crate::print;
use crate::schema::{SchemaModule, SchemaNode, SchemaNodeKind};
use crate::tree::{AnyValue, Attribute, NodeId, NodeKind, NodeKindSeed, OpRootKind, Tree};
use crate::utils::path::{self, Segment};
use crate::validate::{self, UnresolvedKind, UnresolvedSet, ValidateMode};
use crate::value::{parse_value, Value};

pub use crate::diff::{DiffOptions, MergeOptions};
pub use crate::print::{PrintOptions, WithDefaults};

/// Wire formats this crate can parse and print (spec §4.G/§4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Xml,
    Json,
    Binary,
}

bitflags::bitflags! {
    /// Parser policy flags for [`DataTree::parse_string`]/[`DataTree::parse_file`]
    /// (spec §4.E/§8 scenario 2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParseFlags: u8 {
        /// Reject a keyed list whose key leaves arrive out of their
        /// schema-declared order instead of silently reordering them.
        const STRICT = 0b0000_0001;
    }
}

/// A YANG instance data tree: zero or more top-level nodes sharing one
/// [`Context`].
pub struct DataTree<'a> {
    context: &'a Context,
    tree: Tree,
    unresolved: UnresolvedSet,
}

impl<'a> DataTree<'a> {
    /// An empty data tree bound to `context`.
    pub fn new(context: &'a Context) -> DataTree<'a> {
        DataTree {
            context,
            tree: Tree::new(),
            unresolved: UnresolvedSet::new(),
        }
    }

    pub fn context(&self) -> &'a Context {
        self.context
    }

    pub(crate) fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Parse `data` (already-decoded bytes, or UTF-8 text for the XML/JSON
    /// formats) into a fresh tree, scheduling leafref/instance-identifier/
    /// union/when/must resolution for a later [`DataTree::validate`] call.
    pub fn parse_string(
        context: &'a Context,
        data: impl AsRef<[u8]>,
        format: DataFormat,
        parser_options: ParseFlags,
    ) -> Result<DataTree<'a>> {
        let mut tree = Tree::new();
        let mut unresolved = UnresolvedSet::new();
        let strict = parser_options.contains(ParseFlags::STRICT);
        match format {
            DataFormat::Xml => {
                let text = std::str::from_utf8(data.as_ref()).map_err(|_| Error::InputSyntax {
                    format: "xml",
                    path: None,
                })?;
                let parsed = parse::xml::parse(context, text)?;
                parse::dispatch(context, &mut tree, &mut unresolved, None, None, &parsed, strict)?;
            }
            DataFormat::Json => {
                let text = std::str::from_utf8(data.as_ref()).map_err(|_| Error::InputSyntax {
                    format: "json",
                    path: None,
                })?;
                let parsed = parse::json::parse(text)?;
                parse::dispatch(context, &mut tree, &mut unresolved, None, None, &parsed, strict)?;
            }
            DataFormat::Binary => {
                parse::binary::parse(context, &mut tree, &mut unresolved, data.as_ref())?;
            }
        }
        Ok(DataTree {
            context,
            tree,
            unresolved,
        })
    }

    pub fn parse_file<R: Read>(
        context: &'a Context,
        mut reader: R,
        format: DataFormat,
        parser_options: ParseFlags,
    ) -> Result<DataTree<'a>> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        DataTree::parse_string(context, buf, format, parser_options)
    }

    /// Print every root in `format`, per `opts`'s with-defaults policy.
    pub fn print_bytes(&self, format: DataFormat, opts: &PrintOptions) -> Vec<u8> {
        let roots = self.tree.root_nodes();
        match format {
            DataFormat::Xml => print::xml::print(&self.tree, &roots, opts).into_bytes(),
            DataFormat::Json => print::json::print(&self.tree, &roots, opts).into_bytes(),
            DataFormat::Binary => print::binary::print(&self.tree, &roots, opts),
        }
    }

    pub fn print_string(&self, format: DataFormat, opts: &PrintOptions) -> Result<String> {
        if format == DataFormat::Binary {
            return Err(Error::other("binary format has no textual representation"));
        }
        Ok(String::from_utf8(self.print_bytes(format, opts)).expect("xml/json printers always emit valid utf-8"))
    }

    pub fn print_file<W: Write>(&self, mut writer: W, format: DataFormat, opts: &PrintOptions) -> Result<()> {
        writer.write_all(&self.print_bytes(format, opts))?;
        Ok(())
    }

    /// Run the seven-step validation pipeline to a fixed point (spec §4.I).
    /// `external` supplies leafref/instance-identifier targets that live
    /// outside this tree (e.g. the running datastore while validating an
    /// `edit-config` candidate).
    pub fn validate(&mut self, mode: ValidateMode, external: Option<&DataTree<'_>>, strict: bool) -> Result<()> {
        validate::validate(
            &mut self.tree,
            self.context,
            &mut self.unresolved,
            mode,
            external.map(DataTree::tree),
            strict,
        )
    }

    /// Materialize declared `default` values and empty non-presence
    /// containers across the whole tree, independent of the rest of the
    /// validation pipeline.
    pub fn add_implicit(&mut self) -> Result<()> {
        validate::fill_defaults(&mut self.tree, self.context)
    }

    /// A deep copy sharing the same [`Context`].
    pub fn duplicate(&self) -> DataTree<'a> {
        let mut target = Tree::new();
        diff::merge(&mut target, &self.tree, MergeOptions::default());
        DataTree {
            context: self.context,
            tree: target,
            unresolved: UnresolvedSet::new(),
        }
    }

    /// Merge `source`'s content into `self` (spec §4.J), matching siblings
    /// by schema identity plus key/value content at each level.
    pub fn merge(&mut self, source: &DataTree<'a>, opts: MergeOptions) {
        diff::merge(&mut self.tree, &source.tree, opts)
    }

    /// Diff `self` (the "before" side) against `other` (the "after" side).
    ///
    /// The returned [`DataDiff`] only borrows `other`, not `self`, so it can
    /// be fed straight into [`DataTree::diff_apply`] on `self` afterwards.
    pub fn diff<'b>(&self, other: &'b DataTree<'a>, opts: DiffOptions) -> DataDiff<'b> {
        DataDiff {
            b: &other.tree,
            list: diff::diff(&self.tree, &other.tree, opts),
        }
    }

    /// Apply a previously computed diff (whose "before" side must be
    /// `self`, per [`DataTree::diff`]) so that `self` now matches the
    /// diff's "after" side.
    pub fn diff_apply(&mut self, diff: &DataDiff<'_>) -> Result<()> {
        for entry in &diff.list.entries {
            match entry.kind {
                DiffKind::Deleted => {
                    if let Some(id) = entry.first {
                        self.tree.unlink(id);
                        self.tree.free_subtree(id);
                    }
                }
                DiffKind::Changed => {
                    if let (Some(a_id), Some(b_id)) = (entry.first, entry.second) {
                        apply_changed_value(&mut self.tree, a_id, diff.b, b_id);
                    }
                }
                DiffKind::Created => {
                    if let Some(b_id) = entry.second {
                        let target_parent = diff.b.get(b_id).header.parent.and_then(|bp| find_equivalent(&self.tree, diff.b, bp));
                        let new_id = duplicate_from(&mut self.tree, target_parent, diff.b, b_id);
                        self.tree.schema_sort(target_parent);
                        let _ = new_id;
                    }
                }
                DiffKind::MovedAfter1 | DiffKind::MovedAfter2 => {
                    if let Some(b_id) = entry.second {
                        apply_move(&mut self.tree, diff.b, b_id, entry.first);
                    }
                }
            }
        }
        Ok(())
    }

    /// Create (or find) the node at `path`, materializing any missing
    /// ancestor containers/lists/list-keys along the way (spec §4.E).
    /// `path` follows the restricted grammar in [`crate::utils::path`]:
    /// module-qualified name segments, with `[key='value']` predicates on
    /// list instances. A leaf/leaf-list segment's `value` is assigned when
    /// the node is newly created, or always when `update` is set.
    pub fn new_path(&mut self, path: &str, value: Option<&str>, update: bool) -> Result<Option<NodeId>> {
        let segments = path::parse(path);
        let mut parent: Option<NodeId> = None;
        let mut parent_schema: Option<SchemaNode> = None;
        let mut current: Option<NodeId> = None;

        let mut iter = segments.into_iter().peekable();
        while let Some(seg) = iter.next() {
            match seg {
                Segment::Parent => {
                    parent = parent.and_then(|p| self.tree.get(p).header.parent);
                    parent_schema = parent.map(|p| self.tree.get(p).header.schema.clone());
                    current = parent;
                }
                Segment::Name { prefix, name, predicates } => {
                    let schema = match &parent_schema {
                        Some(ps) => ps
                            .children()
                            .find(|c| c.name().as_str() == name)
                            .ok_or_else(|| Error::schema(format!("{name}")))?,
                        None => find_toplevel_schema(self.context, prefix, name).ok_or_else(|| Error::schema(name.to_string()))?,
                    };

                    let siblings = match parent {
                        Some(p) => self.tree.children_of(p),
                        None => self.tree.root_nodes(),
                    };
                    let existing = siblings.into_iter().find(|&id| node_matches(&self.tree, id, &schema, &predicates));

                    let is_last = iter.peek().is_none();
                    let id = match existing {
                        Some(id) => id,
                        None => {
                            let id = self.create_node(parent, &schema, if is_last { value } else { None })?;
                            if schema.kind() == SchemaNodeKind::List && !predicates.is_empty() {
                                self.fill_list_keys(id, &schema, &predicates)?;
                            }
                            self.tree.schema_sort(parent);
                            id
                        }
                    };

                    if is_last && update {
                        if let (true, Some(raw)) = (matches!(schema.kind(), SchemaNodeKind::Leaf | SchemaNodeKind::LeafList), value) {
                            let ty = schema.leaf_type().ok_or_else(|| Error::schema(schema.path()))?;
                            let new_value = parse_value(&ty, raw)?;
                            match &mut self.tree.get_mut(id).kind {
                                NodeKind::Leaf { value: slot } | NodeKind::LeafList { value: slot } => *slot = new_value,
                                _ => {}
                            }
                        }
                    }

                    current = Some(id);
                    parent = Some(id);
                    parent_schema = Some(schema);
                }
            }
        }
        Ok(current)
    }

    fn create_node(&mut self, parent: Option<NodeId>, schema: &SchemaNode, leaf_value: Option<&str>) -> Result<NodeId> {
        let seed = match schema.kind() {
            SchemaNodeKind::Container => NodeKindSeed::Container {
                presence: schema.has_presence(),
            },
            SchemaNodeKind::List => NodeKindSeed::List,
            SchemaNodeKind::Leaf => {
                let ty = schema.leaf_type().ok_or_else(|| Error::schema(schema.path()))?;
                NodeKindSeed::Leaf(parse_value(&ty, leaf_value.unwrap_or_default())?)
            }
            SchemaNodeKind::LeafList => {
                let ty = schema.leaf_type().ok_or_else(|| Error::schema(schema.path()))?;
                NodeKindSeed::LeafList(parse_value(&ty, leaf_value.unwrap_or_default())?)
            }
            SchemaNodeKind::AnyData => NodeKindSeed::Any(AnyValue::String(leaf_value.unwrap_or_default().to_string())),
            SchemaNodeKind::Rpc => NodeKindSeed::OpRoot(OpRootKind::Rpc),
            SchemaNodeKind::Action => NodeKindSeed::OpRoot(OpRootKind::Action),
            SchemaNodeKind::Notification => NodeKindSeed::OpRoot(OpRootKind::Notification),
            SchemaNodeKind::Input | SchemaNodeKind::Output | SchemaNodeKind::Choice | SchemaNodeKind::Case => {
                return Err(Error::schema(schema.path()));
            }
        };
        let id = self.tree.new_node(schema.clone(), seed);
        self.tree.insert_as_child(parent, id);
        schedule_unresolved(&self.tree, &mut self.unresolved, id);
        Ok(id)
    }

    fn fill_list_keys(&mut self, list_id: NodeId, schema: &SchemaNode, predicates: &[(&str, &str)]) -> Result<()> {
        for key_name in schema.list_key_names() {
            let Some(&(_, raw)) = predicates.iter().find(|(k, _)| *k == key_name) else {
                continue;
            };
            let key_schema = schema
                .children()
                .find(|c| c.name().as_str() == key_name)
                .ok_or_else(|| Error::schema(format!("{}/{}", schema.path(), key_name)))?;
            let ty = key_schema.leaf_type().ok_or_else(|| Error::schema(key_schema.path()))?;
            let key_id = self.tree.new_node(key_schema, NodeKindSeed::Leaf(parse_value(&ty, raw)?));
            self.tree.insert_as_child(Some(list_id), key_id);
        }
        Ok(())
    }

    /// Remove the node at `path`, if one exists.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        let id = self.resolve(path).ok_or_else(|| Error::schema(path.to_string()))?;
        self.tree.unlink(id);
        self.tree.free_subtree(id);
        Ok(())
    }

    /// Resolve `path` to an existing node, without creating anything.
    pub fn find_path(&'a self, path: &str) -> Option<DataNodeRef<'a>> {
        self.resolve(path).map(|id| DataNodeRef { tree: self, id })
    }

    fn resolve(&self, path: &str) -> Option<NodeId> {
        let segments = path::parse(path);
        let mut parent: Option<NodeId> = None;
        let mut parent_schema: Option<SchemaNode> = None;
        let mut current: Option<NodeId> = None;

        for seg in segments {
            match seg {
                Segment::Parent => {
                    parent = parent.and_then(|p| self.tree.get(p).header.parent);
                    parent_schema = parent.map(|p| self.tree.get(p).header.schema.clone());
                    current = parent;
                }
                Segment::Name { prefix, name, predicates } => {
                    let schema = match &parent_schema {
                        Some(ps) => ps.children().find(|c| c.name().as_str() == name)?,
                        None => find_toplevel_schema(self.context, prefix, name)?,
                    };
                    let siblings = match parent {
                        Some(p) => self.tree.children_of(p),
                        None => self.tree.root_nodes(),
                    };
                    let found = siblings.into_iter().find(|&id| node_matches(&self.tree, id, &schema, &predicates))?;
                    current = Some(found);
                    parent = Some(found);
                    parent_schema = Some(schema);
                }
            }
        }
        current
    }

    pub fn traverse(&'a self) -> impl Iterator<Item = DataNodeRef<'a>> {
        self.tree
            .root_nodes()
            .into_iter()
            .flat_map(move |root| Traverse::new(DataNodeRef { tree: self, id: root }))
    }

    pub fn root_nodes(&'a self) -> impl Iterator<Item = DataNodeRef<'a>> {
        self.tree.root_nodes().into_iter().map(move |id| DataNodeRef { tree: self, id })
    }
}

fn find_toplevel_schema(ctx: &Context, prefix: Option<&str>, name: &str) -> Option<SchemaNode> {
    match prefix {
        Some(p) => ctx.get_module(p)?.data().find(|n| n.name().as_str() == name),
        None => ctx.modules().find_map(|m| m.data().find(|n| n.name().as_str() == name)),
    }
}

fn node_matches(tree: &Tree, id: NodeId, schema: &SchemaNode, predicates: &[(&str, &str)]) -> bool {
    if tree.get(id).header.schema != *schema {
        return false;
    }
    predicates.iter().all(|(key, want)| {
        tree.list_keys(id).iter().any(|&kid| {
            tree.get(kid).header.schema.name().as_str() == *key
                && matches!(&tree.get(kid).kind, NodeKind::Leaf { value } if &value.canonical() == want)
        })
    })
}

fn schedule_unresolved(tree: &Tree, unresolved: &mut UnresolvedSet, id: NodeId) {
    let value = match &tree.get(id).kind {
        NodeKind::Leaf { value } | NodeKind::LeafList { value } => value,
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

fn apply_changed_value(target: &mut Tree, a_id: NodeId, source: &Tree, b_id: NodeId) {
    match &source.get(b_id).kind {
        NodeKind::Leaf { value } => {
            let value = value.clone();
            if let NodeKind::Leaf { value: slot } = &mut target.get_mut(a_id).kind {
                *slot = value;
            }
        }
        NodeKind::LeafList { value } => {
            let value = value.clone();
            if let NodeKind::LeafList { value: slot } = &mut target.get_mut(a_id).kind {
                *slot = value;
            }
        }
        NodeKind::Any { value } => {
            let value = value.clone();
            if let NodeKind::Any { value: slot } = &mut target.get_mut(a_id).kind {
                *slot = value;
            }
        }
        _ => {}
    }
}

/// Walk `source_id` up to its root, then find the matching chain of nodes
/// in `target` by [`crate::diff::identity_key`] at each level, returning
/// `target`'s equivalent of `source_id` itself.
fn find_equivalent(target: &Tree, source: &Tree, source_id: NodeId) -> Option<NodeId> {
    let mut chain = vec![source_id];
    let mut cur = source.get(source_id).header.parent;
    while let Some(p) = cur {
        chain.push(p);
        cur = source.get(p).header.parent;
    }
    chain.reverse();

    let mut target_parent: Option<NodeId> = None;
    for sid in chain {
        let key = diff::identity_key(source, sid);
        let candidates = match target_parent {
            Some(p) => target.children_of(p),
            None => target.root_nodes(),
        };
        target_parent = Some(candidates.into_iter().find(|&tid| diff::identity_key(target, tid) == key)?);
    }
    target_parent
}

fn duplicate_from(target: &mut Tree, target_parent: Option<NodeId>, source: &Tree, source_id: NodeId) -> NodeId {
    let schema = source.get(source_id).header.schema.clone();
    let seed = match &source.get(source_id).kind {
        NodeKind::Leaf { value } => NodeKindSeed::Leaf(value.clone()),
        NodeKind::LeafList { value } => NodeKindSeed::LeafList(value.clone()),
        NodeKind::Any { value } => NodeKindSeed::Any(value.clone()),
        NodeKind::Container { presence, .. } => NodeKindSeed::Container { presence: *presence },
        NodeKind::List { .. } => NodeKindSeed::List,
        NodeKind::OpRoot { kind, .. } => NodeKindSeed::OpRoot(*kind),
    };
    let new_id = target.new_node(schema, seed);
    target.insert_as_child(target_parent, new_id);
    for child in source.children_of(source_id) {
        duplicate_from(target, Some(new_id), source, child);
    }
    new_id
}

/// Reposition the `target` node equivalent to `source`'s `b_id` to follow
/// the equivalent of `predecessor` (or become the first sibling, if none).
fn apply_move(target: &mut Tree, source: &Tree, b_id: NodeId, predecessor: Option<NodeId>) {
    let Some(target_id) = find_equivalent(target, source, b_id) else {
        return;
    };
    let parent = target.get(target_id).header.parent;
    target.unlink(target_id);

    match predecessor.and_then(|p| find_equivalent(target, source, p)) {
        Some(target_pred) => target.insert_after(target_pred, target_id),
        None => {
            let siblings = match parent {
                Some(p) => target.children_of(p),
                None => target.root_nodes(),
            };
            match siblings.first() {
                Some(&anchor) => target.insert_before(anchor, target_id),
                None => target.insert_as_child(parent, target_id),
            }
        }
    }
}

/// A lightweight handle onto one node of a [`DataTree`]: cheap to copy,
/// valid for as long as the tree it was produced from.
#[derive(Clone, Copy)]
pub struct DataNodeRef<'a> {
    tree: &'a DataTree<'a>,
    id: NodeId,
}

impl<'a> DataNodeRef<'a> {
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub fn schema(&self) -> SchemaNode {
        self.tree.tree.get(self.id).header.schema.clone()
    }

    pub fn owner_module(&self) -> SchemaModule {
        self.schema().module()
    }

    pub fn ancestors(&self) -> Ancestors<DataNodeRef<'a>> {
        Ancestors::new(self.parent())
    }

    pub fn inclusive_ancestors(&self) -> Ancestors<DataNodeRef<'a>> {
        Ancestors::new(Some(*self))
    }

    pub fn siblings(&self) -> Siblings<DataNodeRef<'a>> {
        Siblings::new(self.next_sibling())
    }

    pub fn inclusive_siblings(&self) -> Siblings<DataNodeRef<'a>> {
        Siblings::new(Some(*self))
    }

    pub fn children(&self) -> Siblings<DataNodeRef<'a>> {
        Siblings::new(self.first_child())
    }

    pub fn traverse(&self) -> Traverse<DataNodeRef<'a>> {
        Traverse::new(*self)
    }

    pub fn list_keys(&self) -> Vec<DataNodeRef<'a>> {
        self.tree.tree.list_keys(self.id).into_iter().map(|id| DataNodeRef { tree: self.tree, id }).collect()
    }

    pub fn meta(&self) -> Vec<Metadata<'a>> {
        let attrs = &self.tree.tree.get(self.id).header.attrs;
        (0..attrs.len()).map(|i| Metadata { node: *self, index: i }).collect()
    }

    /// A fully module-qualified absolute data path to this node, with
    /// `[key='value']` predicates on list instances.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut cur = Some(*self);
        while let Some(n) = cur {
            let schema = n.schema();
            let mut seg = format!("{}:{}", schema.module().name(), schema.name());
            if schema.kind() == SchemaNodeKind::List {
                for key in n.list_keys() {
                    if let Some(v) = key.value_canonical() {
                        seg.push_str(&format!("[{}='{}']", key.schema().name(), v));
                    }
                }
            }
            segments.push(seg);
            cur = n.parent();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    pub fn value(&self) -> Option<&'a Value> {
        match &self.tree.tree.get(self.id).kind {
            NodeKind::Leaf { value } | NodeKind::LeafList { value } => Some(value),
            _ => None,
        }
    }

    pub fn value_canonical(&self) -> Option<String> {
        match &self.tree.tree.get(self.id).kind {
            NodeKind::Leaf { value } | NodeKind::LeafList { value } => Some(value.canonical()),
            NodeKind::Any { value } => match value {
                AnyValue::String(s) | AnyValue::Xml(s) | AnyValue::Json(s) => Some(s.clone()),
                AnyValue::Binary(b) => Some(Value::Binary(b.clone()).canonical()),
                AnyValue::DataTree(_) => None,
            },
            _ => None,
        }
    }

    pub fn is_default(&self) -> bool {
        self.tree.tree.get(self.id).is_default()
    }
}

impl<'a> NodeIterable for DataNodeRef<'a> {
    fn parent(&self) -> Option<Self> {
        self.tree.tree.get(self.id).header.parent.map(|id| DataNodeRef { tree: self.tree, id })
    }

    fn next_sibling(&self) -> Option<Self> {
        self.tree.tree.get(self.id).header.next.map(|id| DataNodeRef { tree: self.tree, id })
    }

    fn first_child(&self) -> Option<Self> {
        self.tree.tree.get(self.id).first_child().map(|id| DataNodeRef { tree: self.tree, id })
    }
}

impl<'a> PartialEq for DataNodeRef<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}
impl<'a> Eq for DataNodeRef<'a> {}

/// One RFC 7952 metadata annotation on a [`DataNodeRef`].
#[derive(Clone, Copy)]
pub struct Metadata<'a> {
    node: DataNodeRef<'a>,
    index: usize,
}

impl<'a> Metadata<'a> {
    fn attr(&self) -> &'a Attribute {
        &self.node.tree.tree.get(self.node.id).header.attrs[self.index]
    }

    pub fn node(&self) -> DataNodeRef<'a> {
        self.node
    }

    pub fn module(&self) -> &'a str {
        self.attr().module.as_str()
    }

    pub fn name(&self) -> &'a str {
        self.attr().name.as_str()
    }

    pub fn value(&self) -> &'a str {
        &self.attr().value
    }
}

/// The result of [`DataTree::diff`]: a list of [`DiffEntry`] records whose
/// `first` ids refer to the "before" tree (the `self` the diff was taken
/// against, typically the one `diff_apply` is later called on) and whose
/// `second` ids refer to `b`, the "after" tree borrowed here
/// (`MovedAfter1`/`MovedAfter2` refer to `b` on both sides; see
/// [`crate::diff`]).
pub struct DataDiff<'t> {
    b: &'t Tree,
    list: DiffList,
}

impl<'t> DataDiff<'t> {
    pub fn entries(&self) -> &[DiffEntry] {
        &self.list.entries
    }

    pub fn is_empty(&self) -> bool {
        self.list.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffEntry> {
        self.list.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextFlags;
    use crate::schema::{NodeBuilder, SchemaModuleBuilder, Type};

    fn sample_ctx() -> Context {
        let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED);
        ctx.load_module(
            SchemaModuleBuilder::new("m", "urn:m").data(
                NodeBuilder::container("c")
                    .child(NodeBuilder::leaf("l", Type::string()))
                    .child(
                        NodeBuilder::list("items", &["name"])
                            .child(NodeBuilder::leaf("name", Type::string()))
                            .child(NodeBuilder::leaf("value", Type::int32())),
                    ),
            ),
        )
        .unwrap();
        ctx
    }

    #[test]
    fn new_path_creates_missing_ancestors() {
        let ctx = sample_ctx();
        let mut tree = DataTree::new(&ctx);
        tree.new_path("/m:c/l", Some("hi"), false).unwrap();

        let out = tree.print_string(DataFormat::Json, &PrintOptions::default()).unwrap();
        assert_eq!(out, r#"{"m:c":{"l":"hi"}}"#);
    }

    #[test]
    fn new_path_creates_list_instance_from_predicate() {
        let ctx = sample_ctx();
        let mut tree = DataTree::new(&ctx);
        tree.new_path("/m:c/items[name='a']/value", Some("1"), false).unwrap();

        let found = tree.find_path("/m:c/items[name='a']").unwrap();
        assert_eq!(found.list_keys()[0].value_canonical().as_deref(), Some("a"));
    }

    #[test]
    fn remove_drops_subtree() {
        let ctx = sample_ctx();
        let mut tree = DataTree::new(&ctx);
        tree.new_path("/m:c/l", Some("hi"), false).unwrap();
        tree.remove("/m:c").unwrap();
        assert!(tree.root_nodes().next().is_none());
    }

    #[test]
    fn diff_then_apply_reaches_target() {
        let ctx = sample_ctx();
        let mut before = DataTree::new(&ctx);
        before.new_path("/m:c/l", Some("x"), false).unwrap();

        let mut after = DataTree::new(&ctx);
        after.new_path("/m:c/l", Some("y"), false).unwrap();

        let d = before.diff(&after, DiffOptions::default());
        assert!(!d.is_empty());
        before.diff_apply(&d).unwrap();

        let out = before.print_string(DataFormat::Json, &PrintOptions::default()).unwrap();
        assert_eq!(out, r#"{"m:c":{"l":"y"}}"#);
    }

    #[test]
    fn duplicate_then_merge_is_idempotent() {
        let ctx = sample_ctx();
        let mut tree = DataTree::new(&ctx);
        tree.new_path("/m:c/l", Some("hi"), false).unwrap();

        let copy = tree.duplicate();
        tree.merge(&copy, MergeOptions::default());

        let out = tree.print_string(DataFormat::Json, &PrintOptions::default()).unwrap();
        assert_eq!(out, r#"{"m:c":{"l":"hi"}}"#);
    }
}
