//! Unified `Database` trait — single async interface for all persistence.
//!
//! Covers the two external collaborators the core talks to: the relational
//! `steps` table (read-only step catalog) and the `kv` table standing in for
//! the key-value session service. Both are network-reachable in production,
//! so every method is async and fallible, with no implicit retries.

use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::Step;
use crate::error::StoreError;

/// Backend-agnostic database trait covering step content and key-value state.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), StoreError>;

    // ── Steps ───────────────────────────────────────────────────────

    /// Look up a single step by its unique slug.
    async fn get_step(&self, slug: &str) -> Result<Option<Step>, StoreError>;

    /// All catalog rows, unordered.
    async fn list_steps(&self) -> Result<Vec<Step>, StoreError>;

    // ── Key-value ───────────────────────────────────────────────────

    /// Read a value. Expired keys read as absent.
    async fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value with a TTL, replacing any existing entry.
    async fn kv_put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Delete a key. Deleting an absent key is a no-op.
    async fn kv_delete(&self, key: &str) -> Result<(), StoreError>;
}
