// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Diesel-backed subscription repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tokio::task;
use uuid::Uuid;

use crate::models::{RouteKey, Subscription, SubscriptionPatch};
use crate::storage::schema::subscriptions;
use crate::storage::{PgPool, StorageResult, SubscriptionRepository};

/// A row of the `subscriptions` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    email: String,
    origin_id: i32,
    origin_code: String,
    destination_id: i32,
    destination_code: String,
    date_time: DateTime<Utc>,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
    last_checked_at: Option<DateTime<Utc>>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            origin_id: row.origin_id,
            origin_code: row.origin_code,
            destination_id: row.destination_id,
            destination_code: row.destination_code,
            date_time: row.date_time,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_checked_at: row.last_checked_at,
        }
    }
}

impl From<Subscription> for SubscriptionRow {
    fn from(sub: Subscription) -> Self {
        SubscriptionRow {
            id: sub.id,
            user_id: sub.user_id,
            email: sub.email,
            origin_id: sub.origin_id,
            origin_code: sub.origin_code,
            destination_id: sub.destination_id,
            destination_code: sub.destination_code,
            date_time: sub.date_time,
            is_active: sub.is_active,
            created_at: sub.created_at,
            updated_at: sub.updated_at,
            last_checked_at: sub.last_checked_at,
        }
    }
}

/// `None` fields are left out of the `SET` clause. `Some(None)` on
/// `last_checked_at` writes `NULL`.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = subscriptions)]
struct SubscriptionChangeset {
    email: Option<String>,
    origin_id: Option<i32>,
    origin_code: Option<String>,
    destination_id: Option<i32>,
    destination_code: Option<String>,
    date_time: Option<DateTime<Utc>>,
    is_active: Option<bool>,
    last_checked_at: Option<Option<DateTime<Utc>>>,
    updated_at: i64,
}

impl SubscriptionChangeset {
    fn new(patch: &SubscriptionPatch, updated_at: i64) -> Self {
        SubscriptionChangeset {
            email: patch.email.clone(),
            origin_id: patch.origin_id,
            origin_code: patch.origin_code.clone(),
            destination_id: patch.destination_id,
            destination_code: patch.destination_code.clone(),
            date_time: patch.date_time,
            is_active: patch.is_active,
            last_checked_at: patch.last_checked_at,
            updated_at,
        }
    }
}

/// PostgreSQL repository. Queries run on the blocking pool.
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StorageResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_active_duplicate(
        &self,
        key: &RouteKey,
        exclude: Option<Uuid>,
    ) -> StorageResult<Option<Subscription>> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let mut query = subscriptions::table
                .filter(subscriptions::user_id.eq(key.user_id))
                .filter(subscriptions::origin_id.eq(key.origin_id))
                .filter(subscriptions::destination_id.eq(key.destination_id))
                .filter(subscriptions::date_time.eq(key.date_time))
                .filter(subscriptions::is_active.eq(true))
                .select(SubscriptionRow::as_select())
                .into_boxed();
            if let Some(id) = exclude {
                query = query.filter(subscriptions::id.ne(id));
            }
            let row = query.first(conn).optional()?;
            Ok(row.map(Subscription::from))
        })
        .await
    }

    async fn insert(&self, subscription: Subscription) -> StorageResult<Subscription> {
        self.with_conn(move |conn| {
            let row = diesel::insert_into(subscriptions::table)
                .values(SubscriptionRow::from(subscription))
                .returning(SubscriptionRow::as_returning())
                .get_result(conn)?;
            Ok(row.into())
        })
        .await
    }

    async fn list_by_user(&self, user_id: &str) -> StorageResult<Vec<Subscription>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let rows = subscriptions::table
                .filter(subscriptions::user_id.eq(user_id))
                .order(subscriptions::id.asc())
                .select(SubscriptionRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Subscription::from).collect())
        })
        .await
    }

    async fn get(&self, id: Uuid) -> StorageResult<Option<Subscription>> {
        self.with_conn(move |conn| {
            let row = subscriptions::table
                .find(id)
                .select(SubscriptionRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Subscription::from))
        })
        .await
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
        updated_at: i64,
    ) -> StorageResult<Option<Subscription>> {
        let changes = SubscriptionChangeset::new(patch, updated_at);
        self.with_conn(move |conn| {
            let row = diesel::update(subscriptions::table.find(id))
                .set(&changes)
                .returning(SubscriptionRow::as_returning())
                .get_result(conn)
                .optional()?;
            Ok(row.map(Subscription::from))
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> StorageResult<u64> {
        self.with_conn(move |conn| {
            let removed = diesel::delete(subscriptions::table.find(id)).execute(conn)?;
            Ok(removed as u64)
        })
        .await
    }
}
