//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Child hash index (spec §4.F).
//!
//! Containers/lists with few children are searched linearly; a parent's
//! direct children only get a hash table once they cross
//! [`PROMOTE_THRESHOLD`], since building and maintaining the table costs
//! more than a handful of comparisons would. Each schema node carries 8
//! precomputed "sibling hash bytes" (see [`crate::schema::SchemaNode::sibling_hash_bytes`]);
//! the index groups children first by schema identity (those bytes) and
//! then, within a schema-identity bucket, by identifying content (list key
//! values or a leaf-list's own canonical value), exactly mirroring how two
//! list entries of the same schema are told apart.

use crate::tree::NodeId;
use std::collections::HashMap;

/// Children at or above this count get promoted into a hash table instead
/// of relying on a linear sibling scan.
pub const PROMOTE_THRESHOLD: usize = 4;

/// Key used to look a specific child instance up in the index: schema
/// identity (via its 8 sibling-hash bytes) plus a content hash
/// distinguishing same-schema siblings (list key values / leaf-list
/// value). Two distinct schema nodes are vanishingly unlikely to collide
/// across all 8 bytes, and a collision among them still falls back to
/// comparing full content, so this is a performance index, not a source of
/// truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct IndexKey {
    schema_hash: [u8; 8],
    content_hash: u64,
}

/// A promoted per-parent child index. Collisions chain through a `Vec`;
/// the high bit reserved in each sibling-hash byte (see
/// `compute_sibling_hash`) marks the end of a chain when the table is
/// eventually serialized into the binary format's sibling-hash-table
/// section (§6.5).
#[derive(Debug, Clone, Default)]
pub struct ChildIndex {
    table: HashMap<IndexKey, Vec<NodeId>>,
    len: usize,
}

impl ChildIndex {
    pub fn new() -> ChildIndex {
        ChildIndex::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, schema_hash: [u8; 8], content_hash: u64, id: NodeId) {
        let key = IndexKey {
            schema_hash,
            content_hash,
        };
        self.table.entry(key).or_default().push(id);
        self.len += 1;
    }

    pub fn remove(&mut self, schema_hash: [u8; 8], content_hash: u64, id: NodeId) {
        let key = IndexKey {
            schema_hash,
            content_hash,
        };
        if let Some(bucket) = self.table.get_mut(&key) {
            if let Some(pos) = bucket.iter().position(|&n| n == id) {
                bucket.remove(pos);
                self.len -= 1;
            }
            if bucket.is_empty() {
                self.table.remove(&key);
            }
        }
    }

    /// Every node stored under `(schema_hash, content_hash)`; the caller
    /// still needs a full-equality check if `content_hash` was derived
    /// from a hash rather than true equality (§4.F: "a performance index,
    /// not a source of truth").
    pub fn lookup(&self, schema_hash: [u8; 8], content_hash: u64) -> &[NodeId] {
        let key = IndexKey {
            schema_hash,
            content_hash,
        };
        self.table.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.table.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_lookup_remove_roundtrip() {
        let mut idx = ChildIndex::new();
        let id = NodeId(3);
        idx.insert([1; 8], 42, id);
        assert_eq!(idx.lookup([1; 8], 42), &[id]);
        assert_eq!(idx.len(), 1);
        idx.remove([1; 8], 42, id);
        assert!(idx.lookup([1; 8], 42).is_empty());
        assert_eq!(idx.len(), 0);
    }

    #[test]
    fn distinct_content_hashes_do_not_collide() {
        let mut idx = ChildIndex::new();
        let a = NodeId(1);
        let b = NodeId(2);
        idx.insert([1; 8], 1, a);
        idx.insert([1; 8], 2, b);
        assert_eq!(idx.lookup([1; 8], 1), &[a]);
        assert_eq!(idx.lookup([1; 8], 2), &[b]);
    }
}
