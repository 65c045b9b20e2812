//! Crate-wide error types.
//!
//! Bad HTTP method/selector and unreadable-VALUE cases never appear here —
//! they're `QueryResponse` status codes, since request-level problems never
//! throw to the transport layer. `TreeError` covers low-level tree API
//! misuse; `Error` covers everything else, including fatal bind failures.

use thiserror::Error;

/// Errors raised by low-level `Tree`/`Node` API misuse.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// `setValue`/`unsetValue` addressed an argument slot that doesn't
    /// exist on the method at `path`.
    #[error("argument index {index} out of range for method {path:?}")]
    IndexOutOfRange { path: String, index: usize },

    /// Low-level `Node::insert_child` found a name already present.
    /// Not reachable through `Tree::add_method`, which always uses
    /// get-or-create.
    #[error("child {name:?} already exists under {path:?}")]
    DuplicateChild { path: String, name: String },
}

/// Top-level crate error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("mDNS error: {0}")]
    Mdns(String),

    #[error("the server is not running")]
    NotRunning,

    #[error("cannot {action} while the server is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("failed to bind {what}: {source}")]
    BindFailed {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
