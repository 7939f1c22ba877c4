//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Printer Dispatcher (spec §4.H).
//!
//! The three format modules ([`xml`], [`json`], [`binary`]) each walk the
//! tree themselves — a printer has none of the parser's "resolve a name
//! against a schema" problem, so there is no shared intermediate form the
//! way [`crate::parse`] needed one. What they do share is *which* nodes get
//! printed at all: [`should_print`] implements the with-defaults policy and
//! the choice/case override, and every format module filters through it
//! before emitting a node.

pub mod binary;
pub mod json;
pub mod xml;

use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::tree::{NodeId, Tree};

/// RFC 6243-style with-defaults reporting modes (spec §4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithDefaults {
    /// Omit nodes whose value matches the schema default.
    Trim,
    /// Print every node regardless of default status, untagged.
    Explicit,
    /// Same as `Explicit`; kept distinct for API parity with the
    /// `ietf-netconf-with-defaults` mode set.
    All,
    /// Print every node, tagging default ones with a `default="true"`
    /// metadata attribute understood by the printer's own format.
    AllTag,
    /// Like `AllTag`, but only nodes whose default came from an explicit
    /// schema `default` statement (as opposed to an implicit empty
    /// non-presence container) are tagged.
    ImplTag,
}

#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    pub with_defaults: WithDefaults,
    pub with_siblings: bool,
    pub pretty: bool,
    /// Print non-presence containers that have no printable descendants.
    pub keep_empty_containers: bool,
    /// Rewrite `action` payloads into the `yang:action` JSON wrapper.
    pub netconf: bool,
}

impl Default for PrintOptions {
    fn default() -> PrintOptions {
        PrintOptions {
            with_defaults: WithDefaults::Trim,
            with_siblings: true,
            pretty: false,
            keep_empty_containers: false,
            netconf: false,
        }
    }
}

impl PrintOptions {
    /// Whether a default node should be tagged rather than just
    /// included/omitted outright.
    fn tags_defaults(&self) -> bool {
        matches!(self.with_defaults, WithDefaults::AllTag | WithDefaults::ImplTag)
    }
}

/// A node inside a non-default `case` of a `choice` is always printed even
/// if it happens to carry a default value, so the reader can tell which
/// case was selected (spec §4.H).
fn in_non_default_case(schema: &SchemaNode) -> bool {
    let mut cur = schema.parent();
    while let Some(n) = cur {
        if n.kind() == SchemaNodeKind::Case {
            return match n.parent() {
                Some(choice) if choice.kind() == SchemaNodeKind::Choice => match choice.default_case() {
                    Some(default_case) => default_case != n,
                    None => true,
                },
                _ => false,
            };
        }
        cur = n.parent();
    }
    false
}

/// The with-defaults policy's verdict for one node: whether to print it at
/// all, and (for the tagging modes) whether to mark it as a default.
pub(crate) struct PrintDecision {
    pub print: bool,
    pub tag_default: bool,
}

pub(crate) fn should_print(tree: &Tree, id: NodeId, opts: &PrintOptions) -> PrintDecision {
    let node = tree.get(id);
    let is_default = node.is_default();

    if is_default && in_non_default_case(&node.header.schema) {
        return PrintDecision {
            print: true,
            tag_default: false,
        };
    }

    if !is_default {
        return PrintDecision {
            print: true,
            tag_default: false,
        };
    }

    match opts.with_defaults {
        WithDefaults::Trim => PrintDecision {
            print: false,
            tag_default: false,
        },
        WithDefaults::Explicit | WithDefaults::All => PrintDecision {
            print: true,
            tag_default: false,
        },
        WithDefaults::AllTag | WithDefaults::ImplTag => PrintDecision {
            print: true,
            tag_default: opts.tags_defaults(),
        },
    }
}

/// The children of `parent` that pass the with-defaults filter, paired
/// with whether each should be tagged as a default by the printer.
pub(crate) fn printable_children(tree: &Tree, parent: NodeId, opts: &PrintOptions) -> Vec<(NodeId, bool)> {
    tree.children_of(parent)
        .into_iter()
        .filter_map(|id| {
            let decision = should_print(tree, id, opts);
            decision.print.then_some((id, decision.tag_default))
        })
        .collect()
}

/// Whether a non-presence container with no printable children is worth
/// emitting at all.
pub(crate) fn container_is_worth_printing(has_printed_children: bool, presence: bool, opts: &PrintOptions) -> bool {
    presence || has_printed_children || opts.keep_empty_containers
}
