//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Pluggable diagnostic logging.
//!
//! The teacher bridges libyang's C-side logging hook into Rust through an
//! `extern "C" fn` trampoline and a process-wide `LOG_CALLBACK` cell, since
//! libyang only knows how to call back into a raw function pointer. There
//! is no C side here, so every call site in this crate (the validator,
//! parser/printer dispatchers, diff/merge) calls [`LogCallback::log`]
//! directly; the trampoline and its `CStr` marshaling are gone, but the
//! "one pluggable logger, set once" shape is kept.

use std::borrow::Cow;
use std::sync::OnceLock;

static LOG_CALLBACK: OnceLock<Box<dyn LogCallback>> = OnceLock::new();

/// Severity of a logged diagnostic, numerically compatible with the
/// teacher's `LY_LOG_LEVEL` ordering (errors are the loudest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warning,
    Verbose,
    Debug,
}

/// A custom logger for diagnostics raised while validating, parsing,
/// printing, or diffing.
pub trait LogCallback: Send + Sync + 'static {
    fn log<'a>(
        &'a self,
        level: LogLevel,
        msg: Option<Cow<'a, str>>,
        data_path: Option<Cow<'a, str>>,
        schema_path: Option<Cow<'a, str>>,
    );
}

/// An error returned when the logging callback has already been initialized.
#[derive(Debug)]
pub struct LoggingCallbackAlreadySet {
    _private: (),
}

impl std::fmt::Display for LoggingCallbackAlreadySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Logging callback already set")
    }
}

impl std::error::Error for LoggingCallbackAlreadySet {}

/// Initialize the logging callback.
///
/// The callback can only be initialized once; later calls return
/// [`LoggingCallbackAlreadySet`] without replacing the existing one.
pub fn init_logger<C>(callback: C) -> Result<(), LoggingCallbackAlreadySet>
where
    C: LogCallback,
{
    LOG_CALLBACK
        .set(Box::new(callback))
        .map_err(|_| LoggingCallbackAlreadySet { _private: () })
}

/// Emit one diagnostic through the installed logger, if any. Call sites
/// that have no logger installed are silent, matching the teacher's
/// behavior when no callback was ever set.
pub(crate) fn emit(
    level: LogLevel,
    msg: impl Into<Cow<'static, str>>,
    data_path: Option<Cow<'static, str>>,
    schema_path: Option<Cow<'static, str>>,
) {
    if let Some(cb) = LOG_CALLBACK.get() {
        cb.log(level, Some(msg.into()), data_path, schema_path);
    }
}

/// A logger that forwards diagnostics to the `log` crate.
#[derive(Debug, Default)]
pub struct DefaultLogger {
    _private: (),
}

impl LogCallback for DefaultLogger {
    fn log<'a>(
        &'a self,
        level: LogLevel,
        msg: Option<Cow<'a, str>>,
        data_path: Option<Cow<'a, str>>,
        schema_path: Option<Cow<'a, str>>,
    ) {
        let level = match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Verbose => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        };
        let msg = msg.unwrap_or_else(|| Cow::from(""));
        log::log! {
            target: "yangdt",
            level,
            "schema_path={schema_path:?}, data_path={data_path:?}, msg={msg}",
        }
    }
}
