//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! JSON tokenizer (spec §6.4): turns a `serde_json::Value` object into a
//! forest of [`ParsedNode`]s. Member names follow RFC 7951's
//! `module:name`/`name` convention (module-qualified only where the
//! namespace changes from the parent); metadata annotations use the
//! `name@module:attr` sibling-member convention (RFC 7952).

use super::{ParsedAttr, ParsedNode};
use crate::error::{Error, Result};
use serde_json::Value as Json;

fn err() -> Error {
    Error::InputSyntax {
        format: "json",
        path: None,
    }
}

fn split_qname(key: &str) -> (Option<&str>, &str) {
    match key.split_once(':') {
        Some((m, n)) => (Some(m), n),
        None => (None, key),
    }
}

pub fn parse(input: &str) -> Result<Vec<ParsedNode>> {
    let root: Json = serde_json::from_str(input).map_err(|_| err())?;
    let Json::Object(map) = root else {
        return Err(err());
    };
    let mut metadata: std::collections::HashMap<String, Json> = Default::default();
    let mut members: Vec<(String, &Json)> = Vec::new();
    for (k, v) in &map {
        if let Some((base, _)) = k.split_once('@') {
            metadata.insert(base.to_string(), v.clone());
        } else {
            members.push((k.clone(), v));
        }
    }

    let mut out = Vec::new();
    for (key, value) in members {
        let (module, name) = split_qname(&key);
        let meta = metadata.get(&key);
        out.extend(build_nodes(module, name, value, meta)?);
    }
    Ok(out)
}

fn build_attrs(meta: Option<&Json>) -> Vec<ParsedAttr> {
    let Some(Json::Object(map)) = meta else {
        return Vec::new();
    };
    map.iter()
        .map(|(k, v)| {
            let (module, name) = split_qname(k);
            ParsedAttr {
                module: module.map(str::to_string),
                name: name.to_string(),
                value: json_scalar_to_string(v),
            }
        })
        .collect()
}

fn json_scalar_to_string(v: &Json) -> String {
    match v {
        Json::String(s) => s.clone(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}

/// A JSON member can denote one leaf/container/anydata value, or (for a
/// leaf-list/list) an array of them sharing one name — hence this returns a
/// `Vec`, not a single node.
fn build_nodes(module: Option<&str>, name: &str, value: &Json, meta: Option<&Json>) -> Result<Vec<ParsedNode>> {
    match value {
        Json::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(build_single(module, name, item, None)?);
            }
            Ok(out)
        }
        other => Ok(vec![build_single(module, name, other, meta)?]),
    }
}

fn build_single(module: Option<&str>, name: &str, value: &Json, meta: Option<&Json>) -> Result<ParsedNode> {
    match value {
        Json::Object(map) => {
            let mut metadata: std::collections::HashMap<String, Json> = Default::default();
            let mut members: Vec<(String, &Json)> = Vec::new();
            for (k, v) in map {
                if let Some((base, _)) = k.split_once('@') {
                    metadata.insert(base.to_string(), v.clone());
                } else {
                    members.push((k.clone(), v));
                }
            }
            let mut children = Vec::new();
            for (key, v) in members {
                let (m, n) = split_qname(&key);
                children.extend(build_nodes(m, n, v, metadata.get(&key))?);
            }
            Ok(ParsedNode {
                module: module.map(str::to_string),
                name: name.to_string(),
                value: None,
                attrs: build_attrs(meta),
                children,
            })
        }
        Json::Array(_) => Err(err()),
        scalar => Ok(ParsedNode {
            module: module.map(str::to_string),
            name: name.to_string(),
            value: Some(json_scalar_to_string(scalar)),
            attrs: build_attrs(meta),
            children: Vec::new(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_module_qualified_container_and_leaf() {
        let roots = parse(r#"{"m:c":{"l":"hi"}}"#).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].module.as_deref(), Some("m"));
        assert_eq!(roots[0].name, "c");
        assert_eq!(roots[0].children[0].name, "l");
        assert_eq!(roots[0].children[0].value.as_deref(), Some("hi"));
    }

    #[test]
    fn array_member_becomes_multiple_sibling_nodes() {
        let roots = parse(r#"{"m:l":[{"k":"a"},{"k":"b"}]}"#).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].children[0].value.as_deref(), Some("a"));
        assert_eq!(roots[1].children[0].value.as_deref(), Some("b"));
    }
}
