use std::{fmt, io, path::Path};

pub mod ftp;
#[cfg(test)]
pub mod memory;

use crate::config::DeploymentTarget;

#[cfg(test)]
use mockall::automock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Link,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug)]
pub enum StoreError {
    /// The server does not implement the requested capability.
    Unsupported,
    Rejected {
        operation: &'static str,
        path: String,
        reason: String,
    },
    Io(io::Error),
}

impl StoreError {
    pub fn rejected(operation: &'static str, path: &str, reason: impl fmt::Display) -> StoreError {
        StoreError::Rejected {
            operation,
            path: path.to_owned(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unsupported => write!(f, "Operation not supported by the remote store"),
            StoreError::Rejected {
                operation,
                path,
                reason,
            } => write!(f, "{} {} failed: {}", operation, path, reason),
            StoreError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::Io(error)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Blocking primitives of a hierarchical remote file store. Every call is one
/// network round trip on an already authenticated connection.
#[cfg_attr(test, automock)]
pub trait RemoteStore {
    fn make_directory(&mut self, path: &str) -> StoreResult<()>;

    /// Non-destructive existence probe for a directory.
    fn is_directory(&mut self, path: &str) -> bool;

    /// Binary transfer of a local file. Returns the number of bytes written.
    fn put(&mut self, local: &Path, remote: &str) -> StoreResult<u64>;

    fn delete_file(&mut self, path: &str) -> StoreResult<()>;

    /// Removes an empty directory.
    fn remove_directory(&mut self, path: &str) -> StoreResult<()>;

    fn rename(&mut self, from: &str, to: &str) -> StoreResult<()>;

    /// Typed listing of the direct children of `path`.
    fn list_entries(&mut self, path: &str) -> StoreResult<Vec<RemoteEntry>>;

    /// Plain name listing. Names may be bare or carry the listed path.
    fn list_names(&mut self, path: &str) -> StoreResult<Vec<String>>;

    /// Server-side recursive delete. `StoreError::Unsupported` when the
    /// server has no such command.
    fn delete_tree(&mut self, path: &str) -> StoreResult<()>;

    fn close(&mut self) -> StoreResult<()>;
}

#[cfg_attr(test, automock)]
pub trait Connector {
    /// Opens and authenticates a connection to the target.
    fn connect(&self, target: &DeploymentTarget) -> anyhow::Result<Box<dyn RemoteStore + Send>>;
}
