//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! A restricted `when`/`must` predicate evaluator (spec §9's "pluggable
//! [`XPathEvaluator`]" design note).
//!
//! Full XPath 1.0 evaluation is out of scope (spec §1): the core only ever
//! needs it as a black-box boolean predicate over a data node. This module
//! ships one built-in, [`PathOnlyEvaluator`], understanding the same
//! restricted path grammar as [`crate::utils::path`] (relative `../x`,
//! plain child-name steps) extended with a single `=`/`!=` string
//! comparison against a quoted literal — exactly the shape `when`/`must`
//! conditions take in the common case (e.g. `../enabled = 'true'`). Any
//! other expression is reported as unsupported rather than misevaluated.

use crate::tree::{NodeId, NodeKind, Tree};

/// A pluggable boolean predicate evaluator for `when`/`must` conditions.
/// Implementations that wrap a real XPath 1.0 engine can be substituted by
/// callers that need the full language; this crate ships only
/// [`PathOnlyEvaluator`].
pub trait XPathEvaluator {
    /// Evaluate `expr` relative to `node`. `None` means the expression is
    /// outside what this evaluator understands; callers treat that as
    /// "not disproven" so parsing data that uses richer conditions does
    /// not spuriously fail.
    fn eval_bool(&self, expr: &str, tree: &Tree, node: NodeId) -> Option<bool>;
}

/// The built-in [`XPathEvaluator`]: relative/absolute-from-root path
/// navigation plus one `=`/`!=` comparison.
#[derive(Debug, Default)]
pub struct PathOnlyEvaluator {
    _private: (),
}

impl XPathEvaluator for PathOnlyEvaluator {
    fn eval_bool(&self, expr: &str, tree: &Tree, node: NodeId) -> Option<bool> {
        let expr = expr.trim();
        if let Some((path, op, literal)) = split_comparison(expr) {
            // A missing target is a real (empty) node-set, not an
            // unsupported construct: comparing it to a string literal is
            // false, per XPath 1.0 node-set/string equality semantics.
            let equal = resolve_data_path(tree, node, path)
                .and_then(|target| node_canonical_value(tree, target))
                .is_some_and(|actual| actual == literal);
            return Some(if op == "!=" { !equal } else { equal });
        }
        // A bare path expression: true iff it resolves to an existing node.
        if !looks_like_bare_path(expr) {
            return None;
        }
        Some(resolve_data_path(tree, node, expr).is_some())
    }
}

/// Whether `expr` contains nothing but restricted-path-grammar characters,
/// i.e. has no XPath operators/functions this evaluator doesn't understand.
fn looks_like_bare_path(expr: &str) -> bool {
    !expr.is_empty()
        && expr
            .chars()
            .all(|c| c.is_alphanumeric() || "_:./[]'\"-".contains(c))
}

/// Split `lhs op 'literal'` into its three parts, where `op` is `=` or
/// `!=` occurring outside any quoted literal. Returns `None` for anything
/// else (existence-only expressions, boolean connectives, functions, ...).
fn split_comparison(expr: &str) -> Option<(&str, &str, &str)> {
    let bytes = expr.as_bytes();
    let mut in_quote: Option<u8> = None;
    for i in 0..bytes.len() {
        let b = bytes[i];
        match in_quote {
            Some(q) if b == q => in_quote = None,
            Some(_) => continue,
            None if b == b'\'' || b == b'"' => in_quote = Some(b),
            None if b == b'=' => {
                let (op_start, op_len) = if i > 0 && bytes[i - 1] == b'!' { (i - 1, 2) } else { (i, 1) };
                let lhs = expr[..op_start].trim();
                let rhs = expr[i + 1..].trim();
                let literal = rhs.trim_matches(|c| c == '\'' || c == '"');
                if literal.len() + 2 != rhs.len() && literal != rhs {
                    // rhs wasn't a quoted literal; not a comparison we understand.
                    return None;
                }
                let op = &expr[op_start..op_start + op_len];
                return Some((lhs, op, literal));
            }
            None => {}
        }
    }
    None
}

/// Walk `path` (the restricted grammar: `..` parent steps, plain
/// module-optionally-qualified name steps, no predicates) starting from
/// `node`'s position in `tree`, returning the single node found, if any.
fn resolve_data_path(tree: &Tree, node: NodeId, path: &str) -> Option<NodeId> {
    use crate::utils::path::{parse, Segment};

    let mut cur = if path.starts_with('/') {
        // Absolute: walk up to the root of this subtree, then search down
        // from there by name; the restricted grammar has no cross-module
        // jump here; limited to the caller's own tree.
        let mut root = node;
        while let Some(p) = tree.get(root).header.parent {
            root = p;
        }
        root
    } else {
        node
    };

    for seg in parse(path) {
        match seg {
            Segment::Parent => cur = tree.get(cur).header.parent?,
            Segment::Name { name, .. } => {
                cur = tree
                    .children_of(cur)
                    .into_iter()
                    .find(|&c| tree.get(c).header.schema.name().as_str() == name)?;
            }
        }
    }
    Some(cur)
}

fn node_canonical_value(tree: &Tree, node: NodeId) -> Option<String> {
    match &tree.get(node).kind {
        NodeKind::Leaf { value } | NodeKind::LeafList { value } => Some(value.canonical()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NodeBuilder, SchemaModuleBuilder, Type};
    use crate::tree::NodeKindSeed;
    use crate::value::Value;

    fn sample_tree() -> (Tree, NodeId, NodeId) {
        let module = SchemaModuleBuilder::new("m", "urn:m")
            .data(
                NodeBuilder::container("c")
                    .child(NodeBuilder::leaf("enabled", Type::boolean()))
                    .child(NodeBuilder::leaf("x", Type::string())),
            )
            .build();
        let c_schema = module.data().next().unwrap();
        let enabled_schema = c_schema.children().find(|c| c.name().as_str() == "enabled").unwrap();
        let x_schema = c_schema.children().find(|c| c.name().as_str() == "x").unwrap();

        let mut tree = Tree::new();
        let c = tree.new_node(c_schema, NodeKindSeed::Container { presence: false });
        tree.insert_as_child(None, c);
        let enabled = tree.new_node(enabled_schema, NodeKindSeed::Leaf(Value::Bool(true)));
        tree.insert_as_child(Some(c), enabled);
        let x = tree.new_node(x_schema, NodeKindSeed::Leaf(Value::String("hi".into())));
        tree.insert_as_child(Some(c), x);
        (tree, x, enabled)
    }

    #[test]
    fn evaluates_relative_equality() {
        let (tree, x, _enabled) = sample_tree();
        let evaluator = PathOnlyEvaluator::default();
        assert_eq!(evaluator.eval_bool("../enabled = 'true'", &tree, x), Some(true));
        assert_eq!(evaluator.eval_bool("../enabled = 'false'", &tree, x), Some(false));
        assert_eq!(evaluator.eval_bool("../enabled != 'true'", &tree, x), Some(false));
    }

    #[test]
    fn evaluates_bare_existence() {
        let (tree, x, _enabled) = sample_tree();
        let evaluator = PathOnlyEvaluator::default();
        assert_eq!(evaluator.eval_bool("../enabled", &tree, x), Some(true));
        assert_eq!(evaluator.eval_bool("../missing", &tree, x), Some(false));
    }

    #[test]
    fn unsupported_expression_is_none() {
        let (tree, x, _enabled) = sample_tree();
        let evaluator = PathOnlyEvaluator::default();
        assert_eq!(evaluator.eval_bool("count(../*) > 1", &tree, x), None);
    }
}
