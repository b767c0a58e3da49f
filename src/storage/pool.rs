// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PostgreSQL connection pool and schema migrations.

use std::time::Duration;

use diesel::{
    r2d2::{ConnectionManager, Pool},
    PgConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::task;

use super::{StorageError, StorageResult};

/// Migrations compiled into the binary from `migrations/`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// How long pool construction waits for its first connections.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the pool. Fails if no connection can be opened.
///
/// r2d2 connects synchronously, so construction runs on the blocking pool.
pub async fn build_pool(database_url: &str, max_connections: u32) -> StorageResult<PgPool> {
    connect(database_url, max_connections, CONNECTION_TIMEOUT).await
}

async fn connect(
    database_url: &str,
    max_connections: u32,
    timeout: Duration,
) -> StorageResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    task::spawn_blocking(move || {
        Pool::builder()
            .max_size(max_connections)
            .connection_timeout(timeout)
            .build(manager)
            .map_err(|e| StorageError::Pool(e.to_string()))
    })
    .await?
}

/// Apply pending migrations, creating the table and the partial unique index.
pub async fn run_migrations(pool: &PgPool) -> StorageResult<()> {
    let pool = pool.clone();
    task::spawn_blocking(move || -> StorageResult<()> {
        let mut conn = pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        for version in applied {
            tracing::info!(%version, "Applied migration");
        }
        Ok(())
    })
    .await?
}
