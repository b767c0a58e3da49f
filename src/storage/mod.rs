// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Subscription Storage
//!
//! Persistence for subscription records behind the [`SubscriptionRepository`]
//! trait.
//!
//! ## Implementations
//!
//! - [`PgSubscriptionRepository`]: PostgreSQL through Diesel and an r2d2
//!   pool. Diesel is synchronous, so every call runs on the blocking pool.
//! - [`InMemorySubscriptionRepository`]: process-local rows, used by tests
//!   and local runs without a database.
//!
//! ## Uniqueness
//!
//! Storage is the authority on the active-subscription rule. PostgreSQL
//! enforces it with the partial unique index `unique_active_subscription`
//! (see `migrations/`); the in-memory store mirrors the same predicate.
//! Both report a violation as [`StorageError::UniqueViolation`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{RouteKey, Subscription, SubscriptionPatch};

pub mod memory;
pub mod pool;
pub mod repository;
pub mod schema;

pub use memory::InMemorySubscriptionRepository;
pub use pool::{build_pool, run_migrations, PgPool};
pub use repository::PgSubscriptionRepository;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A unique constraint (primary key or active-subscription index) rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("database error: {0}")]
    Query(String),

    #[error("migration failed: {0}")]
    Migration(String),

    /// The blocking task running the query panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<diesel::result::Error> for StorageError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                let constraint = info.constraint_name().unwrap_or("unknown").to_string();
                StorageError::UniqueViolation(constraint)
            }
            other => StorageError::Query(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for StorageError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        StorageError::Pool(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(e: tokio::task::JoinError) -> Self {
        StorageError::Task(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Typed access to the `subscriptions` table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// First active row with `key`, ignoring the row `exclude` when given.
    async fn find_active_duplicate(
        &self,
        key: &RouteKey,
        exclude: Option<Uuid>,
    ) -> StorageResult<Option<Subscription>>;

    /// Persist a fully populated row and return it as stored.
    async fn insert(&self, subscription: Subscription) -> StorageResult<Subscription>;

    /// All rows owned by `user_id`, active or not, in storage order.
    async fn list_by_user(&self, user_id: &str) -> StorageResult<Vec<Subscription>>;

    async fn get(&self, id: Uuid) -> StorageResult<Option<Subscription>>;

    /// Write the present patch fields and `updated_at`. `None` if no row has `id`.
    async fn update(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
        updated_at: i64,
    ) -> StorageResult<Option<Subscription>>;

    /// Remove the row with `id`. Returns the number of rows removed.
    async fn delete(&self, id: Uuid) -> StorageResult<u64>;
}
