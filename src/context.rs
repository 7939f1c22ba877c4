//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The schema-module registry that data trees are built against.
//!
//! The teacher's `Context` owns a `*mut ffi::ly_ctx`: a handle to libyang's
//! compiled schema set, populated by pointing it at search directories and
//! letting the C library parse and resolve `.yang` text (with `import`
//! statements optionally intercepted through a C callback). Schema-text
//! compilation is out of scope here (spec §1), so this `Context` instead
//! owns a plain `Vec<SchemaModule>` populated one [`schema::SchemaModuleBuilder`]
//! at a time; `ContextFlags` keeps the teacher's option names since they
//! still describe meaningful policy even without a compiler backing them
//! (e.g. `ALL_IMPLEMENTED` still controls whether newly loaded modules
//! default to implemented).

use crate::error::{Error, Result};
use crate::schema::{SchemaModule, SchemaModuleBuilder, SchemaNode};
use std::cell::RefCell;
use std::collections::HashMap;

bitflags::bitflags! {
    /// Context-wide policy flags. Several of these (the search-directory
    /// ones) are retained purely for API compatibility with code ported
    /// from the schema-text-compiling teacher; they are accepted but have
    /// no effect since this `Context` never searches a filesystem for
    /// schema sources.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContextFlags: u16 {
        /// Newly loaded modules default to implemented rather than merely
        /// imported.
        const ALL_IMPLEMENTED = 0b0000_0001;
        /// Keep only the modules explicitly marked implemented reachable
        /// from the initial load set.
        const REF_IMPLEMENTED = 0b0000_0010;
        /// Skip building the synthetic `ietf-yang-library` state tree.
        const NO_YANGLIBRARY = 0b0000_0100;
        /// No-op: retained for API parity, schema text is never searched
        /// for on disk.
        const DISABLE_SEARCHDIRS = 0b0000_1000;
        const DISABLE_SEARCHDIR_CWD = 0b0001_0000;
        const PREFER_SEARCHDIRS = 0b0010_0000;
    }
}

/// Intercepts module-import resolution (replaces the teacher's
/// `unsafe extern "C" fn` callback with a safe trait object). Given the
/// name/revision an `import` statement asked for, returns a ready-to-build
/// module, if this callback knows how to produce one.
pub trait ModuleImportCallback {
    fn import_module(
        &self,
        name: &str,
        revision: Option<&str>,
    ) -> Option<SchemaModuleBuilder>;
}

/// A registry of compiled [`SchemaModule`]s, indexed for fast lookup by
/// name and by namespace.
pub struct Context {
    flags: ContextFlags,
    modules: Vec<SchemaModule>,
    by_name: HashMap<String, usize>,
    by_namespace: HashMap<String, usize>,
    import_callback: Option<Box<dyn ModuleImportCallback>>,
    /// Mirrors the teacher's pattern of stashing the last error so a
    /// fallible step that only has room for `Option<T>` in its own API can
    /// still report why it failed afterwards.
    last_error: RefCell<Option<Error>>,
}

impl Context {
    pub fn new(flags: ContextFlags) -> Context {
        Context {
            flags,
            modules: Vec::new(),
            by_name: HashMap::new(),
            by_namespace: HashMap::new(),
            import_callback: None,
            last_error: RefCell::new(None),
        }
    }

    pub fn options(&self) -> ContextFlags {
        self.flags
    }

    pub fn set_options(&mut self, flags: ContextFlags) {
        self.flags.insert(flags);
    }

    pub fn unset_options(&mut self, flags: ContextFlags) {
        self.flags.remove(flags);
    }

    pub fn set_module_import_callback<C>(&mut self, callback: C)
    where
        C: ModuleImportCallback + 'static,
    {
        self.import_callback = Some(Box::new(callback));
    }

    pub fn unset_module_import_callback(&mut self) {
        self.import_callback = None;
    }

    /// Register a module built from `builder`, returning the compiled
    /// handle. This is this crate's substitute for "load a `.yang` file":
    /// the caller assembles the module's shape in Rust instead of the
    /// library parsing it from text.
    pub fn load_module(&mut self, builder: SchemaModuleBuilder) -> Result<SchemaModule> {
        let module = builder.build();
        if self.flags.contains(ContextFlags::ALL_IMPLEMENTED) {
            module.set_implemented();
        }
        let index = self.modules.len();
        self.by_name.insert(module.name().to_string(), index);
        self.by_namespace
            .insert(module.namespace().to_string(), index);
        self.modules.push(module.clone());
        Ok(module)
    }

    /// Resolve an as-yet-unloaded import through the registered callback,
    /// loading and returning the resulting module.
    pub fn resolve_import(
        &mut self,
        name: &str,
        revision: Option<&str>,
    ) -> Result<Option<SchemaModule>> {
        if let Some(existing) = self.get_module(name) {
            return Ok(Some(existing));
        }
        let Some(cb) = self.import_callback.as_ref() else {
            return Ok(None);
        };
        let Some(builder) = cb.import_module(name, revision) else {
            let err = Error::schema(format!("unresolved import {name}"));
            *self.last_error.borrow_mut() = Some(err.clone());
            return Err(err);
        };
        Ok(Some(self.load_module(builder)?))
    }

    pub fn last_error(&self) -> Option<Error> {
        self.last_error.borrow().clone()
    }

    pub fn modules(&self) -> impl Iterator<Item = SchemaModule> + '_ {
        self.modules.iter().cloned()
    }

    pub fn get_module(&self, name: &str) -> Option<SchemaModule> {
        self.by_name.get(name).map(|&i| self.modules[i].clone())
    }

    pub fn get_module_ns(&self, namespace: &str) -> Option<SchemaModule> {
        self.by_namespace
            .get(namespace)
            .map(|&i| self.modules[i].clone())
    }

    pub fn get_module_implemented(&self, name: &str) -> Option<SchemaModule> {
        self.get_module(name).filter(|m| m.is_implemented())
    }

    pub fn implemented_modules(&self) -> impl Iterator<Item = SchemaModule> + '_ {
        self.modules.iter().filter(|m| m.is_implemented()).cloned()
    }

    pub fn internal_module_count(&self) -> usize {
        self.modules.len()
    }

    /// Restricted-grammar absolute path lookup across every loaded module
    /// (spec §9: the full XPath evaluator is out of scope).
    pub fn find_path(&self, path: &str) -> Option<SchemaNode> {
        for module in &self.modules {
            if let Some(n) = module.find_path(path) {
                return Some(n);
            }
        }
        None
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new(ContextFlags::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NodeBuilder, Type};

    #[test]
    fn load_and_lookup_module() {
        let mut ctx = Context::new(ContextFlags::ALL_IMPLEMENTED);
        ctx.load_module(
            SchemaModuleBuilder::new("m", "urn:m")
                .data(NodeBuilder::leaf("a", Type::uint8())),
        )
        .unwrap();
        let m = ctx.get_module("m").unwrap();
        assert!(m.is_implemented());
        assert_eq!(ctx.internal_module_count(), 1);
        assert!(ctx.find_path("/m:a").is_some());
    }

    struct StubImporter;
    impl ModuleImportCallback for StubImporter {
        fn import_module(
            &self,
            name: &str,
            _revision: Option<&str>,
        ) -> Option<SchemaModuleBuilder> {
            Some(SchemaModuleBuilder::new(name, "urn:stub"))
        }
    }

    #[test]
    fn resolve_import_invokes_callback() {
        let mut ctx = Context::default();
        ctx.set_module_import_callback(StubImporter);
        let m = ctx.resolve_import("dep", None).unwrap().unwrap();
        assert_eq!(m.name().as_str(), "dep");
        assert_eq!(ctx.internal_module_count(), 1);
    }
}
