//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Structural diff and merge (spec §4.J).

use crate::tree::{NodeId, NodeKind, Tree, Validity};
use std::collections::HashSet;

/// One diff record (spec §3.1's `DiffList`, "parallel arrays" collapsed
/// here into a `Vec` of tagged entries for convenience).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Created,
    Deleted,
    Changed,
    /// An existing node moved to follow `first` (its new predecessor,
    /// `None` meaning "now first").
    MovedAfter1,
    /// A newly created node's final position, expressed the same way.
    MovedAfter2,
}

#[derive(Debug, Clone, Copy)]
pub struct DiffEntry {
    pub kind: DiffKind,
    /// The node in tree `A` (or, for `Created`, `None`).
    pub first: Option<NodeId>,
    /// The node in tree `B` (or, for `Deleted`, `None`).
    pub second: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct DiffList {
    pub entries: Vec<DiffEntry>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    pub with_defaults: bool,
    pub no_siblings: bool,
}

/// Content key used to match an `A`-node against its `B` counterpart
/// (invariant 3): schema identity plus identifying content.
pub(crate) fn identity_key(tree: &Tree, id: NodeId) -> (String, String) {
    let node = tree.get(id);
    let schema_path = node.header.schema.path();
    let content = match &node.kind {
        NodeKind::LeafList { value } => value.canonical(),
        NodeKind::List { .. } => tree
            .list_keys(id)
            .iter()
            .map(|&k| match &tree.get(k).kind {
                NodeKind::Leaf { value } => value.canonical(),
                _ => String::new(),
            })
            .collect::<Vec<_>>()
            .join("\u{0}"),
        _ => String::new(),
    };
    (schema_path, content)
}

/// Diff two rooted forests (spec §4.J steps 1-5; move detection is a
/// separate pass, [`detect_moves`]).
pub fn diff(a: &Tree, b: &Tree, opts: DiffOptions) -> DiffList {
    let mut list = DiffList::default();
    let mut used_a: HashSet<NodeId> = HashSet::new();

    diff_siblings(a, a.root_nodes(), b, b.root_nodes(), opts, &mut list, &mut used_a);

    for id in a_all(a) {
        if !used_a.contains(&id) {
            list.entries.push(DiffEntry {
                kind: DiffKind::Deleted,
                first: Some(id),
                second: None,
            });
        }
    }

    detect_moves(a, b, &mut list);
    list
}

fn a_all(a: &Tree) -> Vec<NodeId> {
    fn walk(tree: &Tree, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for c in tree.children_of(id) {
            walk(tree, c, out);
        }
    }
    let mut out = Vec::new();
    for root in a.root_nodes() {
        walk(a, root, &mut out);
    }
    out
}

fn diff_siblings(
    a: &Tree,
    a_ids: Vec<NodeId>,
    b: &Tree,
    b_ids: Vec<NodeId>,
    opts: DiffOptions,
    list: &mut DiffList,
    used_a: &mut HashSet<NodeId>,
) {
    let a_by_key: std::collections::HashMap<(String, String), NodeId> = a_ids
        .iter()
        .map(|&id| (identity_key(a, id), id))
        .collect();

    for &b_id in &b_ids {
        let key = identity_key(b, b_id);
        match a_by_key.get(&key) {
            Some(&a_id) if !used_a.contains(&a_id) => {
                used_a.insert(a_id);
                compare_matched(a, a_id, b, b_id, opts, list, used_a);
            }
            _ => {
                list.entries.push(DiffEntry {
                    kind: DiffKind::Created,
                    first: None,
                    second: Some(b_id),
                });
            }
        }
    }
}

fn compare_matched(
    a: &Tree,
    a_id: NodeId,
    b: &Tree,
    b_id: NodeId,
    opts: DiffOptions,
    list: &mut DiffList,
    used_a: &mut HashSet<NodeId>,
) {
    match (&a.get(a_id).kind, &b.get(b_id).kind) {
        (NodeKind::Leaf { value: av }, NodeKind::Leaf { value: bv }) => {
            let a_default = a.get(a_id).header.validity.contains(Validity::DEFAULT);
            let b_default = b.get(b_id).header.validity.contains(Validity::DEFAULT);
            let differs = av.canonical() != bv.canonical()
                || (opts.with_defaults && a_default != b_default);
            if differs {
                list.entries.push(DiffEntry {
                    kind: DiffKind::Changed,
                    first: Some(a_id),
                    second: Some(b_id),
                });
            }
        }
        (NodeKind::LeafList { value: av }, NodeKind::LeafList { value: bv }) => {
            if av.canonical() != bv.canonical() {
                list.entries.push(DiffEntry {
                    kind: DiffKind::Changed,
                    first: Some(a_id),
                    second: Some(b_id),
                });
            }
        }
        (NodeKind::Any { value: av }, NodeKind::Any { value: bv }) => {
            if format!("{av:?}") != format!("{bv:?}") {
                list.entries.push(DiffEntry {
                    kind: DiffKind::Changed,
                    first: Some(a_id),
                    second: Some(b_id),
                });
            }
        }
        _ => {
            diff_siblings(
                a,
                a.children_of(a_id),
                b,
                b.children_of(b_id),
                opts,
                list,
                used_a,
            );
        }
    }
}

/// Move detection for user-ordered Lists/LeafLists (spec §4.J step 6):
/// for each schema producing user-ordered siblings present in both trees,
/// compute the displacement of every still-present item and apply moves
/// greedily in descending order of absolute displacement.
fn detect_moves(a: &Tree, b: &Tree, list: &mut DiffList) {
    let mut groups: std::collections::HashMap<
        (Option<NodeId>, String),
        (Vec<NodeId>, Vec<NodeId>),
    > = std::collections::HashMap::new();

    for root in a.root_nodes() {
        collect_user_ordered_groups(a, root, &mut groups, true);
    }
    for root in b.root_nodes() {
        collect_user_ordered_groups(b, root, &mut groups, false);
    }

    for ((_, _), (a_order, b_order)) in groups {
        apply_group_moves(a, b, &a_order, &b_order, list);
    }
}

fn collect_user_ordered_groups(
    tree: &Tree,
    node: NodeId,
    groups: &mut std::collections::HashMap<(Option<NodeId>, String), (Vec<NodeId>, Vec<NodeId>)>,
    is_a: bool,
) {
    let schema = tree.get(node).header.schema.clone();
    if schema.is_user_ordered() {
        let parent = tree.get(node).header.parent;
        let entry = groups
            .entry((parent, schema.path()))
            .or_insert_with(|| (Vec::new(), Vec::new()));
        if is_a {
            entry.0.push(node);
        } else {
            entry.1.push(node);
        }
    }
    for c in tree.children_of(node) {
        collect_user_ordered_groups(tree, c, groups, is_a);
    }
}

/// Emit the minimal move set for one user-ordered sibling group (spec
/// §4.J step 6: "apply the moves greedily, adjusting other displacements
/// after each -- one move changes neighbors' distances by ±1"). The
/// largest subset of existing elements whose relative order already
/// matches `b_order` can stay put with zero displacement once the rest
/// have moved around them; that subset is exactly the longest
/// strictly-increasing run of `a_order` indices, read in `b_order`. Every
/// element outside it gets one `MovedAfter1` to its final predecessor.
fn apply_group_moves(a: &Tree, b: &Tree, a_order: &[NodeId], b_order: &[NodeId], list: &mut DiffList) {
    let a_keys: Vec<_> = a_order.iter().map(|&id| identity_key(a, id)).collect();
    let b_keys: Vec<_> = b_order.iter().map(|&id| identity_key(b, id)).collect();

    // (bi, ai) for every b-order slot whose key also exists in a_order;
    // newly created slots never need a move entry of their own here.
    let existing: Vec<(usize, usize)> = b_keys
        .iter()
        .enumerate()
        .filter_map(|(bi, bk)| a_keys.iter().position(|ak| ak == bk).map(|ai| (bi, ai)))
        .collect();
    let unmoved = longest_increasing_by_a_index(&existing);

    for &(bi, _) in &existing {
        if unmoved.contains(&bi) {
            continue;
        }
        let predecessor = if bi == 0 { None } else { Some(b_order[bi - 1]) };
        list.entries.push(DiffEntry {
            kind: DiffKind::MovedAfter1,
            first: predecessor,
            second: Some(b_order[bi]),
        });
    }
}

/// Among `existing` (pairs of `(b-order index, a-order index)`), the
/// `b`-order indices belonging to the longest run whose `a`-order indices
/// are strictly increasing -- i.e. the elements that need no move.
fn longest_increasing_by_a_index(existing: &[(usize, usize)]) -> HashSet<usize> {
    let n = existing.len();
    let mut lengths = vec![1usize; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        for j in 0..i {
            if existing[j].1 < existing[i].1 && lengths[j] + 1 > lengths[i] {
                lengths[i] = lengths[j] + 1;
                prev[i] = Some(j);
            }
        }
    }
    let Some(mut cur) = (0..n).max_by_key(|&i| lengths[i]) else {
        return HashSet::new();
    };
    let mut kept = HashSet::new();
    loop {
        kept.insert(existing[cur].0);
        match prev[cur] {
            Some(p) => cur = p,
            None => break,
        }
    }
    kept
}

/// Merge options (spec §4.J).
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Consume `source` (its nodes are relinked rather than duplicated)
    /// instead of copying.
    pub destruct: bool,
    /// Default `source` nodes never overwrite a non-default `target` node.
    pub explicit: bool,
    /// Only merge `source`'s own subtree, not its siblings.
    pub nosiblings: bool,
}

/// Merge `source`'s nodes into `target`, matching by [`identity_key`] at
/// each level and recursing into Containers/Lists; unmatched `source`
/// subtrees are duplicated wholesale at the matching position.
pub fn merge(target: &mut Tree, source: &Tree, opts: MergeOptions) {
    let source_roots = if opts.nosiblings {
        source.root_nodes().into_iter().take(1).collect()
    } else {
        source.root_nodes()
    };
    merge_siblings(target, None, source, &source_roots, opts);
}

fn merge_siblings(
    target: &mut Tree,
    target_parent: Option<NodeId>,
    source: &Tree,
    source_ids: &[NodeId],
    opts: MergeOptions,
) {
    let target_children = match target_parent {
        Some(p) => target.children_of(p),
        None => target.root_nodes(),
    };
    let target_by_key: std::collections::HashMap<(String, String), NodeId> = target_children
        .iter()
        .map(|&id| (identity_key(target, id), id))
        .collect();

    for &src_id in source_ids {
        let key = identity_key(source, src_id);
        match target_by_key.get(&key) {
            Some(&tgt_id) => merge_matched(target, tgt_id, source, src_id, opts),
            None => duplicate_subtree(target, target_parent, source, src_id),
        }
    }
}

fn merge_matched(target: &mut Tree, tgt_id: NodeId, source: &Tree, src_id: NodeId, opts: MergeOptions) {
    let tgt_is_default = target.get(tgt_id).header.validity.contains(Validity::DEFAULT);
    let src_is_default = source.get(src_id).header.validity.contains(Validity::DEFAULT);
    if opts.explicit && src_is_default && !tgt_is_default {
        return;
    }

    match (&target.get(tgt_id).kind.clone(), &source.get(src_id).kind) {
        (NodeKind::Leaf { .. }, NodeKind::Leaf { value }) => {
            let value = value.clone();
            if let NodeKind::Leaf { value: slot } = &mut target.get_mut(tgt_id).kind {
                *slot = value;
            }
        }
        (NodeKind::Any { .. }, NodeKind::Any { value }) => {
            let value = value.clone();
            if let NodeKind::Any { value: slot } = &mut target.get_mut(tgt_id).kind {
                *slot = value;
            }
        }
        _ => {
            let src_children = source.children_of(src_id);
            merge_siblings(target, Some(tgt_id), source, &src_children, opts);
        }
    }
}

/// Recreate `src_id`'s subtree under `target_parent` in `target`'s own
/// arena (source and target may belong to different schema contexts in
/// general, so values are re-parsed from their canonical string rather
/// than assumed compatible).
fn duplicate_subtree(target: &mut Tree, target_parent: Option<NodeId>, source: &Tree, src_id: NodeId) {
    let schema = source.get(src_id).header.schema.clone();
    let kind_seed = match &source.get(src_id).kind {
        NodeKind::Leaf { value } => crate::tree::NodeKindSeed::Leaf(value.clone()),
        NodeKind::LeafList { value } => crate::tree::NodeKindSeed::LeafList(value.clone()),
        NodeKind::Any { value } => crate::tree::NodeKindSeed::Any(value.clone()),
        NodeKind::Container { presence, .. } => {
            crate::tree::NodeKindSeed::Container { presence: *presence }
        }
        NodeKind::List { .. } => crate::tree::NodeKindSeed::List,
        NodeKind::OpRoot { kind, .. } => crate::tree::NodeKindSeed::OpRoot(*kind),
    };
    let new_id = target.new_node(schema, kind_seed);
    target.insert_as_child(target_parent, new_id);
    for src_child in source.children_of(src_id) {
        duplicate_subtree(target, Some(new_id), source, src_child);
    }
}
