//! # contract: interfaces for the pipeline's external collaborators
//!
//! This module defines the traits behind which every remote or process-level
//! side effect sits: the object store, external command execution, and the
//! status notification endpoint. Concrete implementations live in
//! [`crate::store`], [`crate::command`] and [`crate::status`].
//!
//! ## Interface & Extensibility
//! - Implement [`ObjectStore`] to target a different content store.
//! - All methods are async, returning results and using boxed error types.
//! - Error handling is uniform: all transport/caller errors return boxed
//!   trait objects.
//!
//! ## Mocking & Testing
//! - The traits are annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests (behind the
//!   `test-export-mocks` feature, on by default).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

/// Uniform boxed error type for collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Store-assigned attributes of one persisted object, as reported by a
/// prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full object key, `/`-separated.
    pub key: String,
    /// Creation timestamp assigned by the store.
    pub created: DateTime<Utc>,
}

/// Thin capability wrapper over a remote content store.
///
/// Keys use forward-slash path segments. `put` has full-overwrite semantics:
/// writing the same key twice leaves the store holding exactly the latest
/// content, which is what makes pipeline re-runs safe.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write one object, replacing any prior content at `key`.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BoxError>;

    /// List all objects whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, BoxError>;

    /// Fetch one object's content.
    async fn get(&self, key: &str) -> Result<Vec<u8>, BoxError>;
}

/// Executes external commands with an explicit working directory.
///
/// The working directory is a parameter of every call, never ambient process
/// state: the parent's current directory is not touched on any path.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` (whitespace-separated program and args) in `dir`,
    /// streaming output to the parent's streams when verbosity permits.
    /// Returns the child's exit code; spawn failures are errors.
    async fn run(&self, dir: &std::path::Path, command: &str) -> Result<i32, BoxError>;

    /// Run `command` in `dir` and return its trimmed stdout.
    /// A non-zero exit is an error carrying the child's stderr.
    async fn capture(&self, dir: &std::path::Path, command: &str) -> Result<String, BoxError>;
}

/// Posts one status notification per run to the code-review system.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    /// Report a successful deployment for `commit`, linking to `target_url`.
    async fn notify(&self, commit: &str, target_url: &str) -> Result<(), BoxError>;
}
