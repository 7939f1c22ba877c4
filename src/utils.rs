//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Small helpers shared across modules.

/// The restricted path grammar used to resolve `leafref`/`instance-identifier`
/// targets and schema `find_path` lookups (spec §9's "restricted XPath
/// evaluator" design note). Full XPath stays out of scope; this only
/// understands:
///
/// - absolute paths: `/module:a/b/c`
/// - relative paths: `../a/b`, any number of leading `..` segments
/// - a node-name segment optionally qualified with a module prefix:
///   `prefix:name` or plain `name` (inherits the previous segment's module)
/// - list-instance predicates on the *data* variant only: `a[k='v'][k2='v2']`
pub mod path {
    use crate::schema::{SchemaModule, SchemaNode};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Segment<'a> {
        Parent,
        Name {
            prefix: Option<&'a str>,
            name: &'a str,
            predicates: Vec<(&'a str, &'a str)>,
        },
    }

    /// Split a path string into its segments, per the grammar above.
    /// Absolute paths start with `/` and their first segment's leading
    /// slash is simply consumed; a leading `..` sequence is only valid in
    /// a relative path.
    pub fn parse(path: &str) -> Vec<Segment<'_>> {
        let is_absolute = path.starts_with('/');
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(parse_segment)
            .collect::<Vec<_>>()
            .into_iter()
            .enumerate()
            .map(|(i, seg)| {
                if is_absolute && i == 0 {
                    seg
                } else {
                    seg
                }
            })
            .collect()
    }

    fn parse_segment(raw: &str) -> Segment<'_> {
        if raw == ".." {
            return Segment::Parent;
        }
        let (head, preds) = split_predicates(raw);
        let (prefix, name) = match head.split_once(':') {
            Some((p, n)) => (Some(p), n),
            None => (None, head),
        };
        Segment::Name {
            prefix,
            name,
            predicates: preds,
        }
    }

    fn split_predicates(raw: &str) -> (&str, Vec<(&str, &str)>) {
        let Some(bracket) = raw.find('[') else {
            return (raw, Vec::new());
        };
        let head = &raw[..bracket];
        let mut preds = Vec::new();
        let mut rest = &raw[bracket..];
        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(end) = stripped.find(']') else {
                break;
            };
            let inner = &stripped[..end];
            if let Some((k, v)) = inner.split_once('=') {
                let v = v.trim().trim_matches(|c| c == '\'' || c == '"');
                preds.push((k.trim(), v));
            }
            rest = &stripped[end + 1..];
        }
        (head, preds)
    }

    /// Resolve a schema path starting from `node` (relative paths walk
    /// `..` segments from here; absolute paths restart at the owning
    /// module's top level).
    pub fn resolve_schema_path(node: &SchemaNode, path: &str) -> Option<SchemaNode> {
        if path.starts_with('/') {
            return resolve_schema_path_from_module(&node.module(), path);
        }
        let segments = parse(path);
        let mut cur = node.clone();
        for seg in segments {
            match seg {
                Segment::Parent => cur = cur.parent()?,
                Segment::Name { name, .. } => {
                    cur = cur.children().find(|c| c.name().as_str() == name)?;
                }
            }
        }
        Some(cur)
    }

    pub fn resolve_schema_path_from_module(
        module: &SchemaModule,
        path: &str,
    ) -> Option<SchemaNode> {
        let segments = parse(path);
        let mut iter = segments.into_iter();
        let Segment::Name { name, .. } = iter.next()? else {
            return None;
        };
        let mut cur = module.data().find(|n| n.name().as_str() == name)?;
        for seg in iter {
            match seg {
                Segment::Parent => cur = cur.parent()?,
                Segment::Name { name, .. } => {
                    cur = cur.children().find(|c| c.name().as_str() == name)?;
                }
            }
        }
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::path::*;

    #[test]
    fn parses_predicates() {
        let segs = parse("a[k='v']/b");
        assert_eq!(segs.len(), 2);
        match &segs[0] {
            Segment::Name {
                name, predicates, ..
            } => {
                assert_eq!(*name, "a");
                assert_eq!(predicates, &[("k", "v")]);
            }
            _ => panic!("expected name segment"),
        }
    }

    #[test]
    fn parses_relative_parent_segments() {
        let segs = parse("../../if:name");
        assert_eq!(segs[0], Segment::Parent);
        assert_eq!(segs[1], Segment::Parent);
        match &segs[2] {
            Segment::Name { prefix, name, .. } => {
                assert_eq!(*prefix, Some("if"));
                assert_eq!(*name, "name");
            }
            _ => panic!("expected name segment"),
        }
    }
}
