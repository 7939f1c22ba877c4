//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Arena-based data node storage.
//!
//! The teacher represents a data tree as a graph of `*mut ffi::lyd_node`
//! connected by `parent`/`prev`/`next`/`child` raw pointers, freed through
//! `lyd_free_siblings`/`lyd_free_tree`. A systems language with an
//! ownership model has no business reaching for raw pointers to express
//! "a tree with parent/sibling/child edges" — an arena with integer
//! indices gives the same O(1) navigation without `unsafe`.
//!
//! Node identity is a plain index (`NodeId`), not a generational handle:
//! per the crate's concurrency model (single tree, single owning task)
//! a whole tree is dropped atomically, so all `NodeId`s derived from it
//! become simultaneously meaningless. There is no scenario in which a
//! stale `NodeId` from a freed tree is handed to a live one.

use crate::dictionary::DictString;
use crate::index::ChildIndex;
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// An annotation attached to a data node (RFC 7952 style metadata).
#[derive(Debug, Clone)]
pub struct Attribute {
    pub module: DictString,
    pub name: DictString,
    pub value: String,
}

bitflags::bitflags! {
    /// Validity bits (spec §3.1/§3.2 invariant 7): a node is re-entered
    /// into the relevant validator step whenever the corresponding bit is
    /// set, and the bit clears only on that step's success.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Validity: u8 {
        const MANDATORY_PENDING = 0b0000_0001;
        const DUPLICATE_PENDING = 0b0000_0010;
        const UNIQUE_PENDING    = 0b0000_0100;
        const LEAFREF_PENDING   = 0b0000_1000;
        const IN_USE            = 0b0001_0000;
        const DEFAULT           = 0b0010_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenStatus {
    Unchecked,
    True,
    False,
}

/// Fields shared by every node kind, regardless of what it carries.
#[derive(Debug, Clone)]
pub struct NodeHeader {
    pub schema: SchemaNode,
    pub parent: Option<NodeId>,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub attrs: Vec<Attribute>,
    pub validity: Validity,
    pub when_status: WhenStatus,
    pub(crate) hash: u64,
}

/// The node-kind-specific payload, tagged by schema kind per spec §3.1 /
/// §9's "polymorphism across node kinds" design note.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Container {
        first_child: Option<NodeId>,
        presence: bool,
    },
    List {
        first_child: Option<NodeId>,
        child_index: Option<ChildIndex>,
    },
    Leaf {
        value: Value,
    },
    LeafList {
        value: Value,
    },
    Any {
        value: AnyValue,
    },
    OpRoot {
        kind: OpRootKind,
        first_child: Option<NodeId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpRootKind {
    Rpc,
    RpcReply,
    Action,
    ActionReply,
    Notification,
}

#[derive(Debug, Clone)]
pub enum AnyValue {
    DataTree(Vec<NodeId>),
    Json(String),
    Xml(String),
    String(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct DataNode {
    pub header: NodeHeader,
    pub kind: NodeKind,
}

impl DataNode {
    pub fn first_child(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Container { first_child, .. } => *first_child,
            NodeKind::List { first_child, .. } => *first_child,
            NodeKind::OpRoot { first_child, .. } => *first_child,
            NodeKind::Leaf { .. }
            | NodeKind::LeafList { .. }
            | NodeKind::Any { .. } => None,
        }
    }

    fn set_first_child(&mut self, id: Option<NodeId>) {
        match &mut self.kind {
            NodeKind::Container { first_child, .. } => *first_child = id,
            NodeKind::List { first_child, .. } => *first_child = id,
            NodeKind::OpRoot { first_child, .. } => *first_child = id,
            NodeKind::Leaf { .. }
            | NodeKind::LeafList { .. }
            | NodeKind::Any { .. } => {}
        }
    }

    pub fn is_default(&self) -> bool {
        self.header.validity.contains(Validity::DEFAULT)
    }
}

enum Slot {
    Occupied(DataNode),
    Free,
}

/// The owning storage for one data tree. Roots (nodes with `parent ==
/// None`) form their own sibling ring at `self.roots`.
pub struct Tree {
    arena: Vec<Slot>,
    pub(crate) roots: Option<NodeId>,
    /// Bumped on every structural mutation; used to invalidate cached
    /// leafref resolutions (see `Value::Leafref`).
    pub(crate) generation: u64,
}

impl Tree {
    pub fn new() -> Tree {
        Tree {
            arena: Vec::new(),
            roots: None,
            generation: 0,
        }
    }

    pub fn get(&self, id: NodeId) -> &DataNode {
        match &self.arena[id.index()] {
            Slot::Occupied(n) => n,
            Slot::Free => panic!("dangling NodeId"),
        }
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut DataNode {
        match &mut self.arena[id.index()] {
            Slot::Occupied(n) => n,
            Slot::Free => panic!("dangling NodeId"),
        }
    }

    pub fn try_get(&self, id: NodeId) -> Option<&DataNode> {
        match self.arena.get(id.index())? {
            Slot::Occupied(n) => Some(n),
            Slot::Free => None,
        }
    }

    fn alloc(&mut self, node: DataNode) -> NodeId {
        self.arena.push(Slot::Occupied(node));
        NodeId((self.arena.len() - 1) as u32)
    }

    pub fn new_node(&mut self, schema: SchemaNode, kind_payload: NodeKindSeed) -> NodeId {
        let header = NodeHeader {
            schema,
            parent: None,
            prev: None,
            next: None,
            attrs: Vec::new(),
            validity: Validity::MANDATORY_PENDING,
            when_status: WhenStatus::Unchecked,
            hash: 0,
        };
        let kind = match kind_payload {
            NodeKindSeed::Container { presence } => NodeKind::Container {
                first_child: None,
                presence,
            },
            NodeKindSeed::List => NodeKind::List {
                first_child: None,
                child_index: None,
            },
            NodeKindSeed::Leaf(value) => NodeKind::Leaf { value },
            NodeKindSeed::LeafList(value) => NodeKind::LeafList { value },
            NodeKindSeed::Any(value) => NodeKind::Any { value },
            NodeKindSeed::OpRoot(kind) => NodeKind::OpRoot {
                kind,
                first_child: None,
            },
        };
        self.alloc(DataNode { header, kind })
    }

    /// Recompute and cache `hash` for `id`'s content, per spec §4.F.
    pub(crate) fn rehash(&mut self, id: NodeId) {
        let hash = self.compute_hash(id);
        self.get_mut(id).header.hash = hash;
    }

    fn compute_hash(&self, id: NodeId) -> u64 {
        use std::hash::{Hash, Hasher};
        let node = self.get(id);
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (node.header.schema.name().as_str()).hash(&mut hasher);
        match &node.kind {
            NodeKind::LeafList { value } => value.canonical().hash(&mut hasher),
            NodeKind::List { .. } => {
                for key_id in self.list_keys(id) {
                    if let NodeKind::Leaf { value } = &self.get(key_id).kind {
                        value.canonical().hash(&mut hasher);
                    }
                }
            }
            _ => {}
        }
        hasher.finish()
    }

    /// The leading key-leaf children of a keyed List node, in schema key
    /// order (invariant 2).
    pub fn list_keys(&self, list_id: NodeId) -> Vec<NodeId> {
        if self.get(list_id).header.schema.kind() != SchemaNodeKind::List {
            return Vec::new();
        }
        let keys = self.get(list_id).header.schema.list_key_names();
        let mut out = Vec::with_capacity(keys.len());
        let mut child = self.get(list_id).first_child();
        let mut remaining: &[String] = &keys;
        while let Some(cid) = child {
            if remaining.is_empty() {
                break;
            }
            let cname = self.get(cid).header.schema.name();
            if remaining[0] == cname.as_str() {
                out.push(cid);
                remaining = &remaining[1..];
                child = self.get(cid).header.next;
            } else {
                break;
            }
        }
        out
    }

    /// `insert_as_child` (spec §4.E): append `child` as the last sibling
    /// under `parent`, or as the last root if `parent` is `None`.
    pub fn insert_as_child(&mut self, parent: Option<NodeId>, child: NodeId) {
        self.generation += 1;
        let first = match parent {
            Some(p) => self.get(p).first_child(),
            None => self.roots,
        };
        self.get_mut(child).header.parent = parent;
        match first {
            None => {
                self.get_mut(child).header.prev = Some(child);
                self.get_mut(child).header.next = None;
                match parent {
                    Some(p) => self.get_mut(p).set_first_child(Some(child)),
                    None => self.roots = Some(child),
                }
            }
            Some(first_id) => {
                let last_id = self.get(first_id).header.prev.unwrap_or(first_id);
                self.get_mut(last_id).header.next = Some(child);
                self.get_mut(child).header.prev = Some(last_id);
                self.get_mut(child).header.next = None;
                self.get_mut(first_id).header.prev = Some(child);
            }
        }
        if let Some(p) = parent {
            self.get_mut(p).header.validity.insert(Validity::MANDATORY_PENDING);
        }
        self.rehash(child);
    }

    /// Splice `child` immediately before `anchor`, repairing the sibling
    /// ring (invariant 1) and the parent's `first_child` pointer as
    /// needed. Used by key-ordered insertion repair (spec §4.E).
    pub fn insert_before(&mut self, anchor: NodeId, child: NodeId) {
        self.generation += 1;
        let parent = self.get(anchor).header.parent;
        let prev = self.get(anchor).header.prev;
        let is_first = match parent {
            Some(p) => self.get(p).first_child() == Some(anchor),
            None => self.roots == Some(anchor),
        };
        self.get_mut(child).header.parent = parent;
        self.get_mut(child).header.next = Some(anchor);
        self.get_mut(anchor).header.prev = Some(child);
        if is_first {
            self.get_mut(child).header.prev = prev;
            match parent {
                Some(p) => self.get_mut(p).set_first_child(Some(child)),
                None => self.roots = Some(child),
            }
        } else if let Some(prev_id) = prev {
            self.get_mut(prev_id).header.next = Some(child);
            self.get_mut(child).header.prev = Some(prev_id);
        }
        self.rehash(child);
    }

    /// Splice `child` immediately after `anchor`, the mirror image of
    /// [`Tree::insert_before`] (spec §4.E).
    pub fn insert_after(&mut self, anchor: NodeId, child: NodeId) {
        self.generation += 1;
        let parent = self.get(anchor).header.parent;
        let next = self.get(anchor).header.next;
        let is_last = next.is_none();

        self.get_mut(child).header.parent = parent;
        self.get_mut(child).header.prev = Some(anchor);
        self.get_mut(child).header.next = next;
        self.get_mut(anchor).header.next = Some(child);

        if let Some(next_id) = next {
            self.get_mut(next_id).header.prev = Some(child);
        } else if is_last {
            // `anchor` was the last sibling; the first sibling's ring
            // pointer must now point at `child`.
            let first = match parent {
                Some(p) => self.get(p).first_child(),
                None => self.roots,
            };
            if let Some(first_id) = first {
                self.get_mut(first_id).header.prev = Some(child);
            }
        }
        self.rehash(child);
    }

    /// Replace `old`'s value/payload in place with `new`'s, keeping `old`'s
    /// position in the sibling ring and freeing `new`'s standalone slot
    /// (spec §4.E). Both nodes must share the same schema.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        assert_eq!(
            self.get(old).header.schema,
            self.get(new).header.schema,
            "replace requires matching schema nodes"
        );
        let new_kind = self.get(new).kind.clone();
        self.get_mut(old).kind = new_kind;
        self.get_mut(old).header.validity = self.get(new).header.validity;
        self.get_mut(old).header.when_status = self.get(new).header.when_status;
        self.arena[new.index()] = Slot::Free;
        self.rehash(old);
    }

    /// Re-order `parent`'s direct children to match their schema's
    /// declaration order (spec §4.E: needed after an out-of-order parse,
    /// since invariant 2 requires schema order among same-parent siblings).
    /// Children whose schema isn't a direct child of `parent`'s schema (e.g.
    /// nodes under a `choice`) keep their relative order, sorted stably by
    /// the position of their own schema node among `parent`'s schema
    /// children.
    pub fn schema_sort(&mut self, parent: Option<NodeId>) {
        self.generation += 1;
        let mut children = match parent {
            Some(p) => self.children_of(p),
            None => self.root_nodes(),
        };
        if children.len() < 2 {
            return;
        }
        let schema_children: Vec<SchemaNode> = match parent {
            Some(p) => self.get(p).header.schema.children().collect(),
            // Root siblings may come from unrelated top-level module schemas
            // with no shared parent to enumerate declaration order from;
            // the parser dispatcher is expected to insert roots in the
            // order their owning modules were loaded instead.
            None => return,
        };
        let rank = |id: NodeId| -> usize {
            let schema = self.get(id).header.schema.clone();
            schema_children
                .iter()
                .position(|s| *s == schema)
                .unwrap_or(usize::MAX)
        };
        children.sort_by_key(|&id| rank(id));

        for id in &children {
            self.get_mut(*id).header.prev = None;
            self.get_mut(*id).header.next = None;
        }
        let first = children[0];
        let last = *children.last().unwrap();
        for pair in children.windows(2) {
            self.get_mut(pair[0]).header.next = Some(pair[1]);
            self.get_mut(pair[1]).header.prev = Some(pair[0]);
        }
        self.get_mut(first).header.prev = Some(last);
        match parent {
            Some(p) => self.get_mut(p).set_first_child(Some(first)),
            None => self.roots = Some(first),
        }
    }

    /// Remove `node` from its sibling ring, leaving the rest of the tree
    /// intact (the subtree rooted at `node` is still allocated but
    /// detached; callers that want it gone call `free_subtree`).
    ///
    /// Ring convention (invariant 1): iterating `next` from the first
    /// sibling terminates at `None`; only the first sibling's `prev`
    /// deviates from "actual previous sibling" and instead points at the
    /// last sibling, giving O(1) tail access.
    pub fn unlink(&mut self, node: NodeId) {
        self.generation += 1;
        let parent = self.get(node).header.parent;
        let prev = self.get(node).header.prev;
        let next = self.get(node).header.next;
        let first = match parent {
            Some(p) => self.get(p).first_child(),
            None => self.roots,
        };
        let is_first = first == Some(node);
        let last = first.map(|f| self.get(f).header.prev.unwrap_or(f));
        let is_last = next.is_none();

        if is_first && is_last {
            match parent {
                Some(p) => self.get_mut(p).set_first_child(None),
                None => self.roots = None,
            }
        } else if is_first {
            // `next` becomes the new first; it must inherit the ring's
            // tail pointer from `node`.
            let new_first = next.unwrap();
            self.get_mut(new_first).header.prev = last;
            match parent {
                Some(p) => self.get_mut(p).set_first_child(Some(new_first)),
                None => self.roots = Some(new_first),
            }
        } else if is_last {
            // `prev` becomes the new last; the first sibling's ring
            // pointer must follow.
            let prev_id = prev.unwrap();
            self.get_mut(prev_id).header.next = None;
            if let Some(first_id) = first {
                self.get_mut(first_id).header.prev = Some(prev_id);
            }
        } else {
            let prev_id = prev.unwrap();
            let next_id = next.unwrap();
            self.get_mut(prev_id).header.next = Some(next_id);
            self.get_mut(next_id).header.prev = Some(prev_id);
        }

        let node_mut = self.get_mut(node);
        node_mut.header.parent = None;
        node_mut.header.prev = Some(node);
        node_mut.header.next = None;
    }

    /// Free `node` and its whole subtree, post-order (children first,
    /// then attributes, then the node itself), per spec §4.C.
    pub fn free_subtree(&mut self, node: NodeId) {
        let children: Vec<NodeId> = self.children_of(node);
        for c in children {
            self.free_subtree(c);
        }
        self.get_mut(node).header.attrs.clear();
        self.arena[node.index()] = Slot::Free;
    }

    pub fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.get(node).first_child();
        while let Some(id) = cur {
            out.push(id);
            cur = self.get(id).header.next;
        }
        out
    }

    pub fn root_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.roots;
        while let Some(id) = cur {
            out.push(id);
            cur = self.get(id).header.next;
        }
        out
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

pub enum NodeKindSeed {
    Container { presence: bool },
    List,
    Leaf(Value),
    LeafList(Value),
    Any(AnyValue),
    OpRoot(OpRootKind),
}

/// Auxiliary per-tree maps that don't belong on individual nodes: the
/// per-parent child index promotion table (spec §4.F) lives here rather
/// than embedded in every `Container`/`List`/`OpRoot` payload, since most
/// parents never grow past the promotion threshold.
#[derive(Default)]
pub struct IndexTable {
    pub(crate) by_parent: HashMap<NodeId, ChildIndex>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_support::leaf_schema;

    #[test]
    fn sibling_ring_invariant_holds_after_inserts() {
        let mut tree = Tree::new();
        let s = leaf_schema("a");
        let n1 = tree.new_node(s.clone(), NodeKindSeed::Leaf(Value::Uint8(1)));
        let n2 = tree.new_node(s.clone(), NodeKindSeed::Leaf(Value::Uint8(2)));
        let n3 = tree.new_node(s, NodeKindSeed::Leaf(Value::Uint8(3)));
        tree.insert_as_child(None, n1);
        tree.insert_as_child(None, n2);
        tree.insert_as_child(None, n3);

        let first = tree.roots.unwrap();
        assert_eq!(first, n1);
        assert_eq!(tree.get(first).header.prev, Some(n3));
        assert_eq!(tree.root_nodes(), vec![n1, n2, n3]);
    }

    #[test]
    fn unlink_middle_repairs_ring() {
        let mut tree = Tree::new();
        let s = leaf_schema("a");
        let n1 = tree.new_node(s.clone(), NodeKindSeed::Leaf(Value::Uint8(1)));
        let n2 = tree.new_node(s.clone(), NodeKindSeed::Leaf(Value::Uint8(2)));
        let n3 = tree.new_node(s, NodeKindSeed::Leaf(Value::Uint8(3)));
        tree.insert_as_child(None, n1);
        tree.insert_as_child(None, n2);
        tree.insert_as_child(None, n3);

        tree.unlink(n2);
        assert_eq!(tree.root_nodes(), vec![n1, n3]);
        assert_eq!(tree.get(n1).header.prev, Some(n3));
    }
}
