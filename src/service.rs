// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Subscription Service
//!
//! Business rules over [`SubscriptionRepository`]:
//!
//! - at most one active subscription per (user, origin, destination, date-time)
//! - identifiers are UUID v7, assigned once at creation
//! - `created_at`/`updated_at` are unix seconds stamped by the server
//!
//! The service checks for an active duplicate before each write, but the
//! storage constraint has the final word: a unique violation raised by a
//! concurrent writer is reported as [`ServiceError::Conflict`] as well.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{NewSubscription, Subscription, SubscriptionPatch};
use crate::storage::{StorageError, SubscriptionRepository};

/// Errors returned by [`SubscriptionService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("an active subscription already exists for this route and datetime")]
    Conflict,

    #[error("subscription not found")]
    NotFound,

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UniqueViolation(_) => ServiceError::Conflict,
            other => {
                error!(error = %other, "Subscription storage failure");
                ServiceError::Storage(other)
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone)]
pub struct SubscriptionService {
    repo: Arc<dyn SubscriptionRepository>,
}

impl SubscriptionService {
    pub fn new(repo: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, candidate: NewSubscription) -> ServiceResult<Subscription> {
        let key = candidate.route_key();
        if let Some(existing) = self.repo.find_active_duplicate(&key, None).await? {
            warn!(
                user_id = %key.user_id,
                existing_id = %existing.id,
                "Rejected duplicate active subscription"
            );
            return Err(ServiceError::Conflict);
        }

        let subscription = candidate.into_subscription(Uuid::now_v7(), Utc::now().timestamp());
        let stored = self.repo.insert(subscription).await.map_err(|e| {
            if matches!(e, StorageError::UniqueViolation(_)) {
                warn!(user_id = %key.user_id, "Concurrent insert hit the active-route index");
            }
            ServiceError::from(e)
        })?;

        info!(
            subscription_id = %stored.id,
            user_id = %stored.user_id,
            "Subscription created"
        );
        Ok(stored)
    }

    pub async fn list_by_user(&self, user_id: &str) -> ServiceResult<Vec<Subscription>> {
        Ok(self.repo.list_by_user(user_id).await?)
    }

    pub async fn update(&self, id: Uuid, patch: SubscriptionPatch) -> ServiceResult<Subscription> {
        let current = self.repo.get(id).await?.ok_or(ServiceError::NotFound)?;

        let effective_active = patch.is_active.unwrap_or(current.is_active);
        if effective_active {
            let key = current.route_key().patched(&patch);
            if let Some(existing) = self.repo.find_active_duplicate(&key, Some(id)).await? {
                warn!(
                    subscription_id = %id,
                    existing_id = %existing.id,
                    "Rejected update onto an occupied route"
                );
                return Err(ServiceError::Conflict);
            }
        }

        let updated = self
            .repo
            .update(id, &patch, Utc::now().timestamp())
            .await
            .map_err(|e| {
                if matches!(e, StorageError::UniqueViolation(_)) {
                    warn!(subscription_id = %id, "Concurrent update hit the active-route index");
                }
                ServiceError::from(e)
            })?
            .ok_or(ServiceError::NotFound)?;

        info!(subscription_id = %id, user_id = %updated.user_id, "Subscription updated");
        Ok(updated)
    }

    /// Hard delete. Succeeds whether or not a row existed.
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let removed = self.repo.delete(id).await?;
        info!(subscription_id = %id, removed, "Subscription deleted");
        Ok(())
    }
}
