// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory subscription store.
//!
//! Rows live in insertion order behind a single lock, so the duplicate check
//! and the write of every mutation happen atomically. The active-route rule
//! is checked on insert and update exactly like the partial unique index.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{RouteKey, Subscription, SubscriptionPatch};
use crate::storage::{StorageError, StorageResult, SubscriptionRepository};

const ACTIVE_INDEX: &str = "unique_active_subscription";
const PRIMARY_KEY: &str = "subscriptions_pkey";

#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    rows: RwLock<Vec<Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn active_conflict<'a>(
    rows: &'a [Subscription],
    key: &RouteKey,
    exclude: Option<Uuid>,
) -> Option<&'a Subscription> {
    rows.iter()
        .filter(|row| row.is_active)
        .filter(|row| Some(row.id) != exclude)
        .find(|row| row.route_key() == *key)
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find_active_duplicate(
        &self,
        key: &RouteKey,
        exclude: Option<Uuid>,
    ) -> StorageResult<Option<Subscription>> {
        let rows = self.rows.read().await;
        Ok(active_conflict(&rows, key, exclude).cloned())
    }

    async fn insert(&self, subscription: Subscription) -> StorageResult<Subscription> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.id == subscription.id) {
            return Err(StorageError::UniqueViolation(PRIMARY_KEY.to_string()));
        }
        if subscription.is_active
            && active_conflict(&rows, &subscription.route_key(), None).is_some()
        {
            return Err(StorageError::UniqueViolation(ACTIVE_INDEX.to_string()));
        }
        rows.push(subscription.clone());
        Ok(subscription)
    }

    async fn list_by_user(&self, user_id: &str) -> StorageResult<Vec<Subscription>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> StorageResult<Option<Subscription>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| row.id == id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
        updated_at: i64,
    ) -> StorageResult<Option<Subscription>> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|row| row.id == id) else {
            return Ok(None);
        };

        let mut updated = rows[index].clone();
        patch.apply_to(&mut updated, updated_at);

        if updated.is_active && active_conflict(&rows, &updated.route_key(), Some(id)).is_some() {
            return Err(StorageError::UniqueViolation(ACTIVE_INDEX.to_string()));
        }

        rows[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> StorageResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok((before - rows.len()) as u64)
    }
}
