//
// Copyright (c) The yang-rs Core Contributors
//
// SPDX-License-Identifier: MIT
//

use thiserror::Error;

/// A convenience wrapper around `Result` for this crate's `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by any operation on a [`Context`], [`DataTree`] or
/// [`DataNodeRef`].
///
/// [`Context`]: crate::context::Context
/// [`DataTree`]: crate::data::DataTree
/// [`DataNodeRef`]: crate::data::DataNodeRef
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid {format} input{}", path.as_deref().map(|p| format!(" at {p}")).unwrap_or_default())]
    InputSyntax {
        format: &'static str,
        path: Option<String>,
    },

    #[error("no schema node found for {path}")]
    Schema { path: String },

    #[error("value {value:?} does not match type {type_name} at {path}")]
    TypeParse {
        path: String,
        type_name: &'static str,
        value: String,
    },

    #[error("constraint violation at {path}: {message}")]
    Constraint { path: String, message: String },

    #[error("'when' condition false at {path}")]
    When { path: String },

    #[error("leafref at {path} could not be resolved: {message}")]
    Leafref { path: String, message: String },

    #[error("instance-identifier at {path} could not be resolved: {message}")]
    InstanceId { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("out of memory")]
    Memory,

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(msg: impl Into<String>) -> Error {
        Error::Other(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Error {
        Error::Internal(msg.into())
    }

    pub fn schema(path: impl Into<String>) -> Error {
        Error::Schema { path: path.into() }
    }

    /// The instance/schema path the error refers to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::InputSyntax { path, .. } => path.as_deref(),
            Error::Schema { path }
            | Error::TypeParse { path, .. }
            | Error::Constraint { path, .. }
            | Error::When { path }
            | Error::Leafref { path, .. }
            | Error::InstanceId { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err.to_string())
    }
}
