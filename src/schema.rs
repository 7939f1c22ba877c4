//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema tree: compiled module/node definitions consumed by the data-tree
//! engine.
//!
//! Schema-language compilation (parsing `.yang` text) is explicitly out of
//! scope (spec §1) and stays an external collaborator; this module is the
//! *consumer*-side read-only view described in §4.B, populated through
//! [`SchemaModuleBuilder`] rather than through a YANG-text compiler. Nodes
//! are reference-counted (`Rc`) rather than arena-indexed like [`crate::tree`]'s
//! data nodes: a schema tree is immutable and shared by every data tree built
//! against it, so there is no single owner to hand an arena to, and nothing
//! is ever freed node-by-node (the whole module is dropped at once when the
//! last `Rc` goes away).

use crate::dictionary::{intern, DictString};
use crate::value::DataValueType;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Kind of a schema node, mirroring the node variants of §3.1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaNodeKind {
    Container,
    Case,
    Choice,
    Leaf,
    LeafList,
    List,
    AnyData,
    Rpc,
    Input,
    Output,
    Action,
    Notification,
}

/// A `must` substatement.
#[derive(Clone, Debug)]
pub struct Must {
    pub condition: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub error_message: Option<String>,
    pub error_apptag: Option<String>,
}

/// A `when` substatement.
#[derive(Clone, Debug)]
pub struct When {
    pub condition: String,
    pub description: Option<String>,
    pub reference: Option<String>,
}

/// A leaf/leaf-list type, per spec §4.D.
#[derive(Clone, Debug)]
pub struct Type(Rc<TypeData>);

#[derive(Debug)]
struct TypeData {
    base: DataValueType,
    typedef_name: Option<String>,
    /// `decimal64`'s declared `fraction-digits`.
    fraction_digits: u8,
    /// `bits`' declared bit names, in declaration order (bit position ==
    /// index into this vector).
    bit_names: Vec<String>,
    /// `enumeration`'s declared (name, value) pairs, in declaration order.
    enum_values: Vec<(String, i64)>,
    /// `leafref`'s `path` substatement, unevaluated (the XPath evaluator is
    /// out of scope; resolution uses the restricted path grammar of §9).
    leafref_path: Option<String>,
    leafref_require_instance: bool,
    instance_id_require_instance: bool,
    /// `identityref`'s declared base identity, as `module:name`.
    identity_base: Option<String>,
    /// `union`'s declared member types, tried in order (§4.D).
    union_members: Vec<Type>,
}

impl Type {
    fn new(base: DataValueType) -> Type {
        Type(Rc::new(TypeData {
            base,
            typedef_name: None,
            fraction_digits: 0,
            bit_names: Vec::new(),
            enum_values: Vec::new(),
            leafref_path: None,
            leafref_require_instance: true,
            instance_id_require_instance: true,
            identity_base: None,
            union_members: Vec::new(),
        }))
    }

    pub fn uint8() -> Type {
        Type::new(DataValueType::Uint8)
    }
    pub fn uint16() -> Type {
        Type::new(DataValueType::Uint16)
    }
    pub fn uint32() -> Type {
        Type::new(DataValueType::Uint32)
    }
    pub fn uint64() -> Type {
        Type::new(DataValueType::Uint64)
    }
    pub fn int8() -> Type {
        Type::new(DataValueType::Int8)
    }
    pub fn int16() -> Type {
        Type::new(DataValueType::Int16)
    }
    pub fn int32() -> Type {
        Type::new(DataValueType::Int32)
    }
    pub fn int64() -> Type {
        Type::new(DataValueType::Int64)
    }
    pub fn string() -> Type {
        Type::new(DataValueType::String)
    }
    pub fn boolean() -> Type {
        Type::new(DataValueType::Bool)
    }
    pub fn empty() -> Type {
        Type::new(DataValueType::Empty)
    }
    pub fn binary() -> Type {
        Type::new(DataValueType::Binary)
    }

    pub fn decimal64(fraction_digits: u8) -> Type {
        let mut t = TypeData {
            fraction_digits,
            ..Type::new(DataValueType::Dec64).0.as_ref_clone()
        };
        t.base = DataValueType::Dec64;
        Type(Rc::new(t))
    }

    pub fn bits(names: &[&str]) -> Type {
        let mut t = Type::new(DataValueType::Bits).0.as_ref_clone();
        t.bit_names = names.iter().map(|s| s.to_string()).collect();
        Type(Rc::new(t))
    }

    pub fn enumeration(values: &[(&str, i64)]) -> Type {
        let mut t = Type::new(DataValueType::Enum).0.as_ref_clone();
        t.enum_values =
            values.iter().map(|(n, v)| (n.to_string(), *v)).collect();
        Type(Rc::new(t))
    }

    pub fn identityref(base: &str) -> Type {
        let mut t = Type::new(DataValueType::IdentityRef).0.as_ref_clone();
        t.identity_base = Some(base.to_string());
        Type(Rc::new(t))
    }

    pub fn instance_identifier(require_instance: bool) -> Type {
        let mut t = Type::new(DataValueType::InstanceId).0.as_ref_clone();
        t.instance_id_require_instance = require_instance;
        Type(Rc::new(t))
    }

    pub fn leafref(path: &str, require_instance: bool) -> Type {
        let mut t = Type::new(DataValueType::LeafRef).0.as_ref_clone();
        t.leafref_path = Some(path.to_string());
        t.leafref_require_instance = require_instance;
        Type(Rc::new(t))
    }

    pub fn union(members: Vec<Type>) -> Type {
        let mut t = Type::new(DataValueType::Union).0.as_ref_clone();
        t.union_members = members;
        Type(Rc::new(t))
    }

    pub fn base_type(&self) -> DataValueType {
        self.0.base
    }

    pub fn typedef_name(&self) -> Option<&str> {
        self.0.typedef_name.as_deref()
    }

    pub fn fraction_digits(&self) -> u8 {
        self.0.fraction_digits
    }

    pub fn bit_names(&self) -> &[String] {
        &self.0.bit_names
    }

    pub fn enum_values(&self) -> &[(String, i64)] {
        &self.0.enum_values
    }

    pub fn leafref_path(&self) -> Option<&str> {
        self.0.leafref_path.as_deref()
    }

    pub fn leafref_require_instance(&self) -> bool {
        self.0.leafref_require_instance
    }

    pub fn instance_id_require_instance(&self) -> bool {
        self.0.instance_id_require_instance
    }

    pub fn identity_base(&self) -> Option<&str> {
        self.0.identity_base.as_deref()
    }

    pub fn union_members(&self) -> &[Type] {
        &self.0.union_members
    }

    /// The real type of the leafref, corresponding to the first
    /// non-leafref in a possible chain of leafrefs (libyang calls this
    /// `leafref_real_type`). This port has no chained-leafref resolution
    /// (the target type is not itself looked up without a live tree), so
    /// this simply returns `None` unless a future resolution pass fills it
    /// in; kept for API parity with the teacher.
    pub fn leafref_real_type(&self) -> Option<Type> {
        None
    }
}

// `Rc<TypeData>` has no `Clone` for the inner struct by default since we
// want `Type` itself to be the cheap-clone handle; this helper exists only
// to let the `with-one-field-changed` builders above reuse `Type::new`'s
// defaults without repeating every field.
impl TypeData {
    fn as_ref_clone(&self) -> TypeData {
        TypeData {
            base: self.base,
            typedef_name: self.typedef_name.clone(),
            fraction_digits: self.fraction_digits,
            bit_names: self.bit_names.clone(),
            enum_values: self.enum_values.clone(),
            leafref_path: self.leafref_path.clone(),
            leafref_require_instance: self.leafref_require_instance,
            instance_id_require_instance: self.instance_id_require_instance,
            identity_base: self.identity_base.clone(),
            union_members: self.union_members.clone(),
        }
    }
}

/// A single schema node (§3.1/§4.B). Cheap to clone (`Rc` handle).
#[derive(Clone, Debug)]
pub struct SchemaNode(Rc<SchemaNodeData>);

#[derive(Debug)]
struct SchemaNodeData {
    name: DictString,
    module: RefCell<Option<SchemaModule>>,
    kind: SchemaNodeKind,
    parent: RefCell<Weak<SchemaNodeData>>,
    next_sibling: RefCell<Weak<SchemaNodeData>>,
    children: RefCell<Vec<SchemaNode>>,
    description: Option<String>,
    reference: Option<String>,
    config: bool,
    mandatory: bool,
    presence: bool,
    keyless: bool,
    user_ordered: bool,
    key_names: Vec<String>,
    leaf_type: Option<Type>,
    units: Option<String>,
    min_elements: Option<u32>,
    max_elements: Option<u32>,
    musts: Vec<Must>,
    whens: Vec<When>,
    default_canonical: Vec<String>,
    default_case: RefCell<Option<SchemaNode>>,
    status_deprecated: bool,
    status_obsolete: bool,
    /// 8 precomputed sibling-hash bytes, per §4.F's collision-resistance
    /// scheme; computed once at build time from (module, kind, name).
    sibling_hash: [u8; 8],
}

fn compute_sibling_hash(module: &str, kind: SchemaNodeKind, name: &str) -> [u8; 8] {
    use std::hash::{Hash, Hasher};
    let mut out = [0u8; 8];
    for (i, slot) in out.iter_mut().enumerate() {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        module.hash(&mut hasher);
        (kind as u8).hash(&mut hasher);
        name.hash(&mut hasher);
        i.hash(&mut hasher);
        // High bit reserved as the collision-chain terminator (§4.F).
        *slot = (hasher.finish() as u8) & 0x7f;
    }
    out
}

impl SchemaNode {
    pub fn module(&self) -> SchemaModule {
        self.0
            .module
            .borrow()
            .clone()
            .expect("schema node not yet attached to a module")
    }

    pub fn kind(&self) -> SchemaNodeKind {
        self.0.kind
    }

    pub fn name(&self) -> DictString {
        self.0.name.clone()
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.0.reference.as_deref()
    }

    /// Generate the YANG-instance path of the node (§6.6's "path" field is
    /// reconstructed this way from a `DataNodeRef`; this is the schema-only
    /// variant, skipping choice/case per the teacher's `LYSC_PATH_DATA`).
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(n) = cur {
            if !n.is_schema_only() {
                segments.push(format!("{}:{}", n.module().name(), n.name()));
            }
            cur = n.parent();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    pub fn is_config(&self) -> bool {
        self.config()
    }

    fn config(&self) -> bool {
        self.0.config
    }

    pub fn is_state(&self) -> bool {
        !self.0.config
    }

    pub fn is_status_current(&self) -> bool {
        !self.0.status_deprecated && !self.0.status_obsolete
    }

    pub fn is_status_deprecated(&self) -> bool {
        self.0.status_deprecated
    }

    pub fn is_status_obsolete(&self) -> bool {
        self.0.status_obsolete
    }

    pub fn is_mandatory(&self) -> bool {
        self.0.mandatory
    }

    pub fn is_np_container(&self) -> bool {
        self.0.kind == SchemaNodeKind::Container && !self.0.presence
    }

    pub fn has_presence(&self) -> bool {
        self.0.presence
    }

    pub fn is_list_key(&self) -> bool {
        if self.0.kind != SchemaNodeKind::Leaf {
            return false;
        }
        match self.parent() {
            Some(p) if p.kind() == SchemaNodeKind::List => {
                p.0.key_names.iter().any(|k| k.as_str() == self.name().as_str())
            }
            _ => false,
        }
    }

    pub fn is_keyless_list(&self) -> bool {
        self.0.kind == SchemaNodeKind::List && self.0.keyless
    }

    pub fn is_user_ordered(&self) -> bool {
        matches!(self.0.kind, SchemaNodeKind::List | SchemaNodeKind::LeafList)
            && self.0.user_ordered
    }

    pub fn is_schema_only(&self) -> bool {
        matches!(self.kind(), SchemaNodeKind::Choice | SchemaNodeKind::Case)
    }

    pub fn has_default(&self) -> bool {
        !self.0.default_canonical.is_empty()
    }

    pub fn default_value_canonical(&self) -> Option<&str> {
        self.0.default_canonical.first().map(|s| s.as_str())
    }

    /// All declared default instances (plural only for leaf-lists).
    pub fn default_values_canonical(&self) -> &[String] {
        &self.0.default_canonical
    }

    pub fn default_case(&self) -> Option<SchemaNode> {
        self.0.default_case.borrow().clone()
    }

    pub fn leaf_type(&self) -> Option<Type> {
        self.0.leaf_type.clone()
    }

    pub fn units(&self) -> Option<&str> {
        self.0.units.as_deref()
    }

    pub fn min_elements(&self) -> Option<u32> {
        self.0.min_elements
    }

    pub fn max_elements(&self) -> Option<u32> {
        self.0.max_elements
    }

    pub fn musts(&self) -> &[Must] {
        &self.0.musts
    }

    pub fn whens(&self) -> &[When] {
        &self.0.whens
    }

    /// Key leaf names, in schema-declared order (invariant 2).
    pub fn list_key_names(&self) -> Vec<String> {
        self.0.key_names.clone()
    }

    pub fn list_keys(&self) -> impl Iterator<Item = SchemaNode> + '_ {
        self.children().filter(|n| n.is_list_key())
    }

    pub fn sibling_hash_bytes(&self) -> [u8; 8] {
        self.0.sibling_hash
    }

    pub fn parent(&self) -> Option<SchemaNode> {
        self.0.parent.borrow().upgrade().map(SchemaNode)
    }

    pub fn next_sibling(&self) -> Option<SchemaNode> {
        self.0.next_sibling.borrow().upgrade().map(SchemaNode)
    }

    pub fn first_child(&self) -> Option<SchemaNode> {
        self.0.children.borrow().first().cloned()
    }

    pub fn children(&self) -> impl Iterator<Item = SchemaNode> + '_ {
        self.0.children.borrow().clone().into_iter()
    }

    pub fn all_children(&self) -> impl Iterator<Item = SchemaNode> + '_ {
        self.children()
    }

    pub fn ancestors(&self) -> impl Iterator<Item = SchemaNode> {
        let mut out = Vec::new();
        let mut cur = self.parent();
        while let Some(n) = cur {
            out.push(n.clone());
            cur = n.parent();
        }
        out.into_iter()
    }

    pub fn siblings(&self) -> impl Iterator<Item = SchemaNode> {
        let mut out = Vec::new();
        let mut cur = self.next_sibling();
        while let Some(n) = cur {
            out.push(n.clone());
            cur = n.next_sibling();
        }
        out.into_iter()
    }

    /// Depth-first traversal over this subtree (actions/notifications
    /// nested under containers/lists are not included, matching the
    /// teacher's `Traverse`).
    pub fn traverse(&self) -> Vec<SchemaNode> {
        let mut out = vec![self.clone()];
        for child in self.children() {
            out.extend(child.traverse());
        }
        out
    }

    pub fn actions(&self) -> impl Iterator<Item = SchemaNode> + '_ {
        self.children().filter(|n| n.kind() == SchemaNodeKind::Action)
    }

    pub fn notifications(&self) -> impl Iterator<Item = SchemaNode> + '_ {
        self.children().filter(|n| n.kind() == SchemaNodeKind::Notification)
    }

    /// RPC/action input: child nodes plus `must` restrictions.
    pub fn input(&self) -> Option<(Vec<SchemaNode>, &[Must])> {
        if !matches!(self.kind(), SchemaNodeKind::Rpc | SchemaNodeKind::Action) {
            return None;
        }
        let input = self
            .children()
            .find(|n| n.kind() == SchemaNodeKind::Input)?;
        Some((input.children().collect(), input.musts()))
    }

    pub fn output(&self) -> Option<(Vec<SchemaNode>, &[Must])> {
        if !matches!(self.kind(), SchemaNodeKind::Rpc | SchemaNodeKind::Action) {
            return None;
        }
        let output = self
            .children()
            .find(|n| n.kind() == SchemaNodeKind::Output)?;
        Some((output.children().collect(), output.musts()))
    }

    /// Restricted path-language lookup (§9's path grammar: relative `../x`,
    /// absolute `/m:a/b`); full XPath is out of scope.
    pub fn find_path(&self, path: &str) -> Option<SchemaNode> {
        crate::utils::path::resolve_schema_path(self, path)
    }
}

impl PartialEq for SchemaNode {
    fn eq(&self, other: &SchemaNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SchemaNode {}

impl crate::iter::NodeIterable for SchemaNode {
    fn parent(&self) -> Option<SchemaNode> {
        SchemaNode::parent(self)
    }
    fn next_sibling(&self) -> Option<SchemaNode> {
        SchemaNode::next_sibling(self)
    }
    fn first_child(&self) -> Option<SchemaNode> {
        SchemaNode::first_child(self)
    }
}

/// A compiled schema module (§4.B).
#[derive(Clone, Debug)]
pub struct SchemaModule(Rc<SchemaModuleData>);

#[derive(Debug)]
struct SchemaModuleData {
    name: DictString,
    namespace: DictString,
    prefix: String,
    revision: Option<String>,
    organization: Option<String>,
    contact: Option<String>,
    description: Option<String>,
    reference: Option<String>,
    data: RefCell<Vec<SchemaNode>>,
    rpcs: RefCell<Vec<SchemaNode>>,
    notifications: RefCell<Vec<SchemaNode>>,
    features: RefCell<HashMap<String, bool>>,
    implemented: RefCell<bool>,
}

impl SchemaModule {
    pub fn name(&self) -> DictString {
        self.0.name.clone()
    }

    pub fn namespace(&self) -> DictString {
        self.0.namespace.clone()
    }

    pub fn prefix(&self) -> &str {
        &self.0.prefix
    }

    pub fn revision(&self) -> Option<&str> {
        self.0.revision.as_deref()
    }

    pub fn organization(&self) -> Option<&str> {
        self.0.organization.as_deref()
    }

    pub fn contact(&self) -> Option<&str> {
        self.0.contact.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.0.reference.as_deref()
    }

    pub fn is_implemented(&self) -> bool {
        *self.0.implemented.borrow()
    }

    pub fn set_implemented(&self) {
        *self.0.implemented.borrow_mut() = true;
    }

    pub fn feature_value(&self, feature: &str) -> bool {
        *self.0.features.borrow().get(feature).unwrap_or(&false)
    }

    /// Revision encoded as the binary format's 2-byte `yyyyyyym mmmdddd`
    /// field (§6.5). Zero if no revision is set.
    pub fn revision_encoded(&self) -> u16 {
        let Some(rev) = self.revision() else {
            return 0;
        };
        let parts: Vec<&str> = rev.split('-').collect();
        if parts.len() != 3 {
            return 0;
        }
        let (Ok(year), Ok(month), Ok(day)) = (
            parts[0].parse::<u16>(),
            parts[1].parse::<u16>(),
            parts[2].parse::<u16>(),
        ) else {
            return 0;
        };
        let year_off = year.saturating_sub(2000) & 0x7f;
        ((year_off << 9) | ((month & 0xf) << 5) | (day & 0x1f)) as u16
    }

    pub fn data(&self) -> impl Iterator<Item = SchemaNode> {
        self.0.data.borrow().clone().into_iter()
    }

    pub fn rpcs(&self) -> impl Iterator<Item = SchemaNode> {
        self.0.rpcs.borrow().clone().into_iter()
    }

    pub fn notifications(&self) -> impl Iterator<Item = SchemaNode> {
        self.0.notifications.borrow().clone().into_iter()
    }

    pub fn traverse(&self) -> impl Iterator<Item = SchemaNode> {
        let mut out = Vec::new();
        for n in self.data() {
            out.extend(n.traverse());
        }
        for n in self.rpcs() {
            out.extend(n.traverse());
        }
        for n in self.notifications() {
            out.extend(n.traverse());
        }
        out.into_iter()
    }

    /// Restricted data-path lookup among this module's top-level nodes.
    pub fn find_path(&self, path: &str) -> Option<SchemaNode> {
        crate::utils::path::resolve_schema_path_from_module(self, path)
    }
}

impl PartialEq for SchemaModule {
    fn eq(&self, other: &SchemaModule) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SchemaModule {}

/// Builds a single schema node, mirroring the way a YANG compiler would
/// assemble one `lysc_node`, but driven directly from Rust (§1: the
/// schema-language compiler itself is out of scope).
pub struct NodeBuilder {
    name: String,
    kind: SchemaNodeKind,
    description: Option<String>,
    reference: Option<String>,
    config: bool,
    mandatory: bool,
    presence: bool,
    keyless: bool,
    user_ordered: bool,
    key_names: Vec<String>,
    leaf_type: Option<Type>,
    units: Option<String>,
    min_elements: Option<u32>,
    max_elements: Option<u32>,
    musts: Vec<Must>,
    whens: Vec<When>,
    default_canonical: Vec<String>,
    default_case: Option<String>,
    status_deprecated: bool,
    status_obsolete: bool,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    fn new(name: &str, kind: SchemaNodeKind) -> NodeBuilder {
        NodeBuilder {
            name: name.to_string(),
            kind,
            description: None,
            reference: None,
            config: true,
            mandatory: false,
            presence: false,
            keyless: false,
            user_ordered: false,
            key_names: Vec::new(),
            leaf_type: None,
            units: None,
            min_elements: None,
            max_elements: None,
            musts: Vec::new(),
            whens: Vec::new(),
            default_canonical: Vec::new(),
            default_case: None,
            status_deprecated: false,
            status_obsolete: false,
            children: Vec::new(),
        }
    }

    pub fn container(name: &str) -> NodeBuilder {
        NodeBuilder::new(name, SchemaNodeKind::Container)
    }

    pub fn list(name: &str, keys: &[&str]) -> NodeBuilder {
        let mut b = NodeBuilder::new(name, SchemaNodeKind::List);
        b.key_names = keys.iter().map(|s| s.to_string()).collect();
        b.keyless = keys.is_empty();
        b
    }

    pub fn leaf(name: &str, ty: Type) -> NodeBuilder {
        let mut b = NodeBuilder::new(name, SchemaNodeKind::Leaf);
        b.leaf_type = Some(ty);
        b
    }

    pub fn leaf_list(name: &str, ty: Type) -> NodeBuilder {
        let mut b = NodeBuilder::new(name, SchemaNodeKind::LeafList);
        b.leaf_type = Some(ty);
        b
    }

    pub fn anydata(name: &str) -> NodeBuilder {
        NodeBuilder::new(name, SchemaNodeKind::AnyData)
    }

    pub fn choice(name: &str) -> NodeBuilder {
        NodeBuilder::new(name, SchemaNodeKind::Choice)
    }

    pub fn case(name: &str) -> NodeBuilder {
        NodeBuilder::new(name, SchemaNodeKind::Case)
    }

    pub fn rpc(name: &str) -> NodeBuilder {
        NodeBuilder::new(name, SchemaNodeKind::Rpc)
    }

    pub fn action(name: &str) -> NodeBuilder {
        NodeBuilder::new(name, SchemaNodeKind::Action)
    }

    pub fn notification(name: &str) -> NodeBuilder {
        NodeBuilder::new(name, SchemaNodeKind::Notification)
    }

    pub fn input() -> NodeBuilder {
        NodeBuilder::new("input", SchemaNodeKind::Input)
    }

    pub fn output() -> NodeBuilder {
        NodeBuilder::new("output", SchemaNodeKind::Output)
    }

    pub fn child(mut self, c: NodeBuilder) -> NodeBuilder {
        self.children.push(c);
        self
    }

    pub fn children(mut self, cs: impl IntoIterator<Item = NodeBuilder>) -> NodeBuilder {
        self.children.extend(cs);
        self
    }

    pub fn description(mut self, d: &str) -> NodeBuilder {
        self.description = Some(d.to_string());
        self
    }

    pub fn reference(mut self, r: &str) -> NodeBuilder {
        self.reference = Some(r.to_string());
        self
    }

    pub fn presence(mut self) -> NodeBuilder {
        self.presence = true;
        self
    }

    pub fn mandatory(mut self) -> NodeBuilder {
        self.mandatory = true;
        self
    }

    pub fn config(mut self, v: bool) -> NodeBuilder {
        self.config = v;
        self
    }

    pub fn units(mut self, u: &str) -> NodeBuilder {
        self.units = Some(u.to_string());
        self
    }

    pub fn min_elements(mut self, n: u32) -> NodeBuilder {
        self.min_elements = Some(n);
        self
    }

    pub fn max_elements(mut self, n: u32) -> NodeBuilder {
        self.max_elements = Some(n);
        self
    }

    pub fn must(mut self, condition: &str) -> NodeBuilder {
        self.musts.push(Must {
            condition: condition.to_string(),
            description: None,
            reference: None,
            error_message: None,
            error_apptag: None,
        });
        self
    }

    pub fn when(mut self, condition: &str) -> NodeBuilder {
        self.whens.push(When {
            condition: condition.to_string(),
            description: None,
            reference: None,
        });
        self
    }

    pub fn user_ordered(mut self) -> NodeBuilder {
        self.user_ordered = true;
        self
    }

    pub fn default(mut self, v: &str) -> NodeBuilder {
        self.default_canonical.push(v.to_string());
        self
    }

    pub fn default_case(mut self, case_name: &str) -> NodeBuilder {
        self.default_case = Some(case_name.to_string());
        self
    }

    pub fn deprecated(mut self) -> NodeBuilder {
        self.status_deprecated = true;
        self
    }

    pub fn obsolete(mut self) -> NodeBuilder {
        self.status_obsolete = true;
        self
    }

    fn build(self, module: &SchemaModule) -> SchemaNode {
        let data = Rc::new(SchemaNodeData {
            name: intern(&self.name),
            module: RefCell::new(Some(module.clone())),
            kind: self.kind,
            parent: RefCell::new(Weak::new()),
            next_sibling: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            description: self.description,
            reference: self.reference,
            config: self.config,
            mandatory: self.mandatory,
            presence: self.presence,
            keyless: self.keyless,
            user_ordered: self.user_ordered,
            key_names: self.key_names,
            leaf_type: self.leaf_type,
            units: self.units,
            min_elements: self.min_elements,
            max_elements: self.max_elements,
            musts: self.musts,
            whens: self.whens,
            default_canonical: self.default_canonical,
            default_case: RefCell::new(None),
            status_deprecated: self.status_deprecated,
            status_obsolete: self.status_obsolete,
            sibling_hash: compute_sibling_hash(
                module.name().as_str(),
                self.kind,
                &self.name,
            ),
        });
        let node = SchemaNode(data);

        let children: Vec<SchemaNode> =
            self.children.into_iter().map(|c| c.build(module)).collect();
        for w in &children {
            *w.0.parent.borrow_mut() = Rc::downgrade(&node.0);
        }
        for pair in children.windows(2) {
            *pair[0].0.next_sibling.borrow_mut() = Rc::downgrade(&pair[1].0);
        }
        *node.0.children.borrow_mut() = children;

        if let Some(case_name) = &self.default_case {
            let found = node
                .0
                .children
                .borrow()
                .iter()
                .find(|c| c.name().as_str() == case_name)
                .cloned();
            *node.0.default_case.borrow_mut() = found;
        }

        node
    }
}

/// Builds a [`SchemaModule`] from a set of top-level [`NodeBuilder`] trees
/// (§4.M / §9: schema-language compilation stays out of scope, so this is
/// the in-process substitute for "load this module").
pub struct SchemaModuleBuilder {
    name: String,
    namespace: String,
    prefix: String,
    revision: Option<String>,
    organization: Option<String>,
    contact: Option<String>,
    description: Option<String>,
    reference: Option<String>,
    features: HashMap<String, bool>,
    data: Vec<NodeBuilder>,
    rpcs: Vec<NodeBuilder>,
    notifications: Vec<NodeBuilder>,
}

impl SchemaModuleBuilder {
    pub fn new(name: &str, namespace: &str) -> SchemaModuleBuilder {
        SchemaModuleBuilder {
            name: name.to_string(),
            namespace: namespace.to_string(),
            prefix: name.to_string(),
            revision: None,
            organization: None,
            contact: None,
            description: None,
            reference: None,
            features: HashMap::new(),
            data: Vec::new(),
            rpcs: Vec::new(),
            notifications: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: &str) -> SchemaModuleBuilder {
        self.prefix = prefix.to_string();
        self
    }

    pub fn revision(mut self, rev: &str) -> SchemaModuleBuilder {
        self.revision = Some(rev.to_string());
        self
    }

    pub fn organization(mut self, v: &str) -> SchemaModuleBuilder {
        self.organization = Some(v.to_string());
        self
    }

    pub fn contact(mut self, v: &str) -> SchemaModuleBuilder {
        self.contact = Some(v.to_string());
        self
    }

    pub fn description(mut self, v: &str) -> SchemaModuleBuilder {
        self.description = Some(v.to_string());
        self
    }

    pub fn reference(mut self, v: &str) -> SchemaModuleBuilder {
        self.reference = Some(v.to_string());
        self
    }

    pub fn feature(mut self, name: &str, enabled: bool) -> SchemaModuleBuilder {
        self.features.insert(name.to_string(), enabled);
        self
    }

    pub fn data(mut self, node: NodeBuilder) -> SchemaModuleBuilder {
        self.data.push(node);
        self
    }

    pub fn rpc(mut self, node: NodeBuilder) -> SchemaModuleBuilder {
        self.rpcs.push(node);
        self
    }

    pub fn notification(mut self, node: NodeBuilder) -> SchemaModuleBuilder {
        self.notifications.push(node);
        self
    }

    pub fn build(self) -> SchemaModule {
        let module = Rc::new(SchemaModuleData {
            name: intern(&self.name),
            namespace: intern(&self.namespace),
            prefix: self.prefix,
            revision: self.revision,
            organization: self.organization,
            contact: self.contact,
            description: self.description,
            reference: self.reference,
            data: RefCell::new(Vec::new()),
            rpcs: RefCell::new(Vec::new()),
            notifications: RefCell::new(Vec::new()),
            features: RefCell::new(self.features),
            implemented: RefCell::new(true),
        });
        let module = SchemaModule(module);

        let data: Vec<SchemaNode> =
            self.data.into_iter().map(|n| n.build(&module)).collect();
        let rpcs: Vec<SchemaNode> =
            self.rpcs.into_iter().map(|n| n.build(&module)).collect();
        let notifications: Vec<SchemaNode> = self
            .notifications
            .into_iter()
            .map(|n| n.build(&module))
            .collect();
        for group in [&data, &rpcs, &notifications] {
            for pair in group.windows(2) {
                *pair[0].0.next_sibling.borrow_mut() = Rc::downgrade(&pair[1].0);
            }
        }
        *module.0.data.borrow_mut() = data;
        *module.0.rpcs.borrow_mut() = rpcs;
        *module.0.notifications.borrow_mut() = notifications;
        module
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_wires_parent_and_siblings() {
        let module = SchemaModuleBuilder::new("m", "urn:m")
            .data(
                NodeBuilder::container("c").child(NodeBuilder::leaf(
                    "l",
                    Type::int32(),
                )),
            )
            .build();
        let c = module.data().next().unwrap();
        assert_eq!(c.name().as_str(), "c");
        let l = c.first_child().unwrap();
        assert_eq!(l.name().as_str(), "l");
        assert_eq!(l.parent().unwrap(), c);
        assert_eq!(l.module(), module);
    }

    #[test]
    fn list_keys_detected_by_name_and_position() {
        let module = SchemaModuleBuilder::new("m", "urn:m")
            .data(
                NodeBuilder::list("l", &["k"])
                    .child(NodeBuilder::leaf("k", Type::int32()))
                    .child(NodeBuilder::leaf("v", Type::string())),
            )
            .build();
        let list = module.data().next().unwrap();
        let keys: Vec<_> = list.list_keys().map(|n| n.name().to_string()).collect();
        assert_eq!(keys, vec!["k".to_string()]);
    }

    #[test]
    fn sibling_hash_distinguishes_different_names() {
        let module = SchemaModuleBuilder::new("m", "urn:m")
            .data(NodeBuilder::leaf("a", Type::int32()))
            .data(NodeBuilder::leaf("b", Type::int32()))
            .build();
        let mut it = module.data();
        let a = it.next().unwrap();
        let b = it.next().unwrap();
        assert_ne!(a.sibling_hash_bytes(), b.sibling_hash_bytes());
    }
}
