//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Hand-rolled XML tokenizer (spec §6.4): turns an XML document into a
//! forest of [`ParsedNode`]s. `xmlns`/`xmlns:prefix` declarations are
//! resolved against the loaded module namespaces so every element ends up
//! tagged with a module name rather than a raw URI; nothing else about XML
//! namespaces (schema-location hints, wildcard namespaces) is modeled.

use super::{ParsedAttr, ParsedNode};
use crate::context::Context;
use crate::error::{Error, Result};
use std::collections::HashMap;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Cursor<'a> {
        Cursor {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n')) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn err(&self) -> Error {
        Error::InputSyntax {
            format: "xml",
            path: None,
        }
    }

    /// Skip comments, the XML prolog, and DOCTYPE-ish declarations, leaving
    /// the cursor at the next element or end of input.
    fn skip_noise(&mut self) {
        loop {
            self.skip_ws();
            if self.starts_with("<!--") {
                if let Some(end) = find(self.bytes, self.pos + 4, "-->") {
                    self.pos = end + 3;
                    continue;
                }
                self.pos = self.bytes.len();
                return;
            }
            if self.starts_with("<?") {
                if let Some(end) = find(self.bytes, self.pos + 2, "?>") {
                    self.pos = end + 2;
                    continue;
                }
                self.pos = self.bytes.len();
                return;
            }
            break;
        }
    }

    fn read_name(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || c == b'>' || c == b'/' || c == b'=' {
                break;
            }
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("")
    }

    fn read_quoted(&mut self) -> Result<String> {
        let quote = self.peek().ok_or_else(|| self.err())?;
        if quote != b'"' && quote != b'\'' {
            return Err(self.err());
        }
        self.pos += 1;
        let start = self.pos;
        while self.peek().map(|c| c != quote).unwrap_or(false) {
            self.pos += 1;
        }
        if self.peek().is_none() {
            return Err(self.err());
        }
        let raw = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        self.pos += 1;
        Ok(unescape(raw))
    }
}

fn find(bytes: &[u8], from: usize, needle: &str) -> Option<usize> {
    let n = needle.as_bytes();
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(n.len())
        .position(|w| w == n)
        .map(|p| p + from)
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Namespace scope active while descending into the document; `prefix_to_ns`
/// resolves `prefix:name` references, `default_ns` covers unprefixed ones.
#[derive(Clone, Default)]
struct NsScope {
    prefix_to_ns: HashMap<String, String>,
    default_ns: Option<String>,
}

impl NsScope {
    fn module_for(&self, ctx: &Context, prefix: Option<&str>) -> Option<String> {
        let ns = match prefix {
            Some(p) => self.prefix_to_ns.get(p)?,
            None => self.default_ns.as_ref()?,
        };
        ctx.get_module_ns(ns).map(|m| m.name().to_string())
    }
}

pub fn parse(ctx: &Context, input: &str) -> Result<Vec<ParsedNode>> {
    let mut cur = Cursor::new(input);
    let mut roots = Vec::new();
    loop {
        cur.skip_noise();
        if cur.peek().is_none() {
            break;
        }
        roots.push(parse_element(ctx, &mut cur, &NsScope::default())?);
    }
    Ok(roots)
}

fn parse_element(ctx: &Context, cur: &mut Cursor<'_>, parent_scope: &NsScope) -> Result<ParsedNode> {
    if cur.peek() != Some(b'<') {
        return Err(cur.err());
    }
    cur.pos += 1;
    let qname = cur.read_name();
    let (prefix, local) = match qname.split_once(':') {
        Some((p, n)) => (Some(p.to_string()), n.to_string()),
        None => (None, qname.to_string()),
    };

    let mut scope = parent_scope.clone();
    let mut attrs = Vec::new();
    loop {
        cur.skip_ws();
        match cur.peek() {
            Some(b'/') => {
                cur.pos += 1;
                if cur.peek() != Some(b'>') {
                    return Err(cur.err());
                }
                cur.pos += 1;
                let module = scope.module_for(ctx, prefix.as_deref());
                return Ok(ParsedNode {
                    module,
                    name: local,
                    value: None,
                    attrs,
                    children: Vec::new(),
                });
            }
            Some(b'>') => {
                cur.pos += 1;
                break;
            }
            Some(_) => {
                let aname = cur.read_name();
                cur.skip_ws();
                if cur.peek() != Some(b'=') {
                    return Err(cur.err());
                }
                cur.pos += 1;
                cur.skip_ws();
                let value = cur.read_quoted()?;
                if aname == "xmlns" {
                    scope.default_ns = Some(value);
                } else if let Some(p) = aname.strip_prefix("xmlns:") {
                    scope.prefix_to_ns.insert(p.to_string(), value);
                } else {
                    let (aprefix, aname) = match aname.split_once(':') {
                        Some((p, n)) => (Some(p.to_string()), n.to_string()),
                        None => (None, aname.to_string()),
                    };
                    attrs.push((aprefix, aname, value));
                }
            }
            None => return Err(cur.err()),
        }
    }

    let module = scope.module_for(ctx, prefix.as_deref());
    let resolved_attrs: Vec<ParsedAttr> = attrs
        .into_iter()
        .map(|(p, name, value)| ParsedAttr {
            module: p.and_then(|p| scope.module_for(ctx, Some(&p))),
            name,
            value,
        })
        .collect();

    let mut children = Vec::new();
    let mut text = String::new();
    loop {
        match cur.peek() {
            None => return Err(cur.err()),
            Some(b'<') => {
                if cur.starts_with("</") {
                    cur.pos += 2;
                    let _close_name = cur.read_name();
                    cur.skip_ws();
                    if cur.peek() != Some(b'>') {
                        return Err(cur.err());
                    }
                    cur.pos += 1;
                    break;
                }
                if cur.starts_with("<!--") {
                    if let Some(end) = find(cur.bytes, cur.pos + 4, "-->") {
                        cur.pos = end + 3;
                        continue;
                    }
                    return Err(cur.err());
                }
                children.push(parse_element(ctx, cur, &scope)?);
            }
            Some(_) => {
                let start = cur.pos;
                while cur.peek().map(|c| c != b'<').unwrap_or(false) {
                    cur.pos += 1;
                }
                text.push_str(std::str::from_utf8(&cur.bytes[start..cur.pos]).unwrap_or(""));
            }
        }
    }

    Ok(ParsedNode {
        module,
        name: local,
        value: if children.is_empty() {
            Some(unescape(text.trim()))
        } else {
            None
        },
        attrs: resolved_attrs,
        children,
    })
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}

pub(crate) fn escape_text(s: &str) -> String {
    escape(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextFlags};
    use crate::schema::{NodeBuilder, SchemaModuleBuilder, Type};

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
    fn parses_nested_elements_with_default_namespace() {
        let ctx = sample_ctx();
        let xml = r#"<c xmlns="urn:m"><l>hi</l></c>"#;
        let roots = parse(&ctx, xml).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "c");
        assert_eq!(roots[0].module.as_deref(), Some("m"));
        assert_eq!(roots[0].children[0].name, "l");
        assert_eq!(roots[0].children[0].value.as_deref(), Some("hi"));
    }

    #[test]
    fn parses_self_closing_and_escapes() {
        let ctx = sample_ctx();
        let xml = r#"<c xmlns="urn:m"><l>a &amp; b</l></c>"#;
        let roots = parse(&ctx, xml).unwrap();
        assert_eq!(roots[0].children[0].value.as_deref(), Some("a & b"));
    }
}
