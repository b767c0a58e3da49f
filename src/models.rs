// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures of the subscription API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! ## Model Categories
//!
//! - **Subscription**: the stored record, returned by every endpoint
//! - **Requests**: create payload and the typed partial-update patch
//! - **RouteKey**: the tuple guarded by the active-subscription uniqueness rule

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// =============================================================================
// Subscription
// =============================================================================

/// A user's watch on one route at one departure instant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Subscription {
    /// Time-ordered identifier (UUID v7), assigned at creation.
    pub id: Uuid,
    /// Owning user (token subject).
    pub user_id: String,
    /// Contact email for alerts.
    pub email: String,
    pub origin_id: i32,
    pub origin_code: String,
    pub destination_id: i32,
    pub destination_code: String,
    /// Departure instant being watched.
    pub date_time: DateTime<Utc>,
    pub is_active: bool,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub updated_at: i64,
    /// Last time the fare checker looked at this route.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn route_key(&self) -> RouteKey {
        RouteKey {
            user_id: self.user_id.clone(),
            origin_id: self.origin_id,
            destination_id: self.destination_id,
            date_time: self.date_time,
        }
    }
}

/// The (user, origin, destination, date-time) tuple. At most one active
/// subscription may exist per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub user_id: String,
    pub origin_id: i32,
    pub destination_id: i32,
    pub date_time: DateTime<Utc>,
}

impl RouteKey {
    /// Key the row would have once `patch` is applied.
    pub fn patched(&self, patch: &SubscriptionPatch) -> RouteKey {
        RouteKey {
            user_id: self.user_id.clone(),
            origin_id: patch.origin_id.unwrap_or(self.origin_id),
            destination_id: patch.destination_id.unwrap_or(self.destination_id),
            date_time: patch.date_time.map_or(self.date_time, storage_precision),
        }
    }
}

/// Truncate to microseconds, the resolution PostgreSQL `timestamptz` keeps.
///
/// Applied to every client-supplied instant so comparisons agree with what
/// the database stores.
pub fn storage_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/subscriptions`.
///
/// `user_id` falls back to the authenticated subject. Unknown fields,
/// including a client-sent `id`, are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: String,
    pub origin_id: i32,
    #[serde(default)]
    pub origin_code: String,
    pub destination_id: i32,
    #[serde(default)]
    pub destination_code: String,
    pub date_time: DateTime<Utc>,
    /// Defaults to `true`.
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl CreateSubscriptionRequest {
    pub fn into_new_subscription(self, subject: &str) -> NewSubscription {
        NewSubscription {
            user_id: self.user_id.unwrap_or_else(|| subject.to_string()),
            email: self.email,
            origin_id: self.origin_id,
            origin_code: self.origin_code,
            destination_id: self.destination_id,
            destination_code: self.destination_code,
            date_time: storage_precision(self.date_time),
            is_active: self.is_active.unwrap_or(true),
            last_checked_at: self.last_checked_at.map(storage_precision),
        }
    }
}

/// Candidate record before the server assigns its identifier and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub user_id: String,
    pub email: String,
    pub origin_id: i32,
    pub origin_code: String,
    pub destination_id: i32,
    pub destination_code: String,
    pub date_time: DateTime<Utc>,
    pub is_active: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl NewSubscription {
    pub fn route_key(&self) -> RouteKey {
        RouteKey {
            user_id: self.user_id.clone(),
            origin_id: self.origin_id,
            destination_id: self.destination_id,
            date_time: self.date_time,
        }
    }

    pub fn into_subscription(self, id: Uuid, now: i64) -> Subscription {
        Subscription {
            id,
            user_id: self.user_id,
            email: self.email,
            origin_id: self.origin_id,
            origin_code: self.origin_code,
            destination_id: self.destination_id,
            destination_code: self.destination_code,
            date_time: self.date_time,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
            last_checked_at: self.last_checked_at,
        }
    }
}

/// Body of `PUT /api/subscriptions/{id}`: every field is optional and only
/// present fields are written.
///
/// `last_checked_at` distinguishes "absent" (untouched) from `null`
/// (cleared). Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SubscriptionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_checked_at: Option<Option<DateTime<Utc>>>,
}

impl SubscriptionPatch {
    pub fn is_empty(&self) -> bool {
        *self == SubscriptionPatch::default()
    }

    /// Write the present fields onto `target` and stamp `updated_at`.
    pub fn apply_to(&self, target: &mut Subscription, now: i64) {
        if let Some(email) = &self.email {
            target.email = email.clone();
        }
        if let Some(origin_id) = self.origin_id {
            target.origin_id = origin_id;
        }
        if let Some(origin_code) = &self.origin_code {
            target.origin_code = origin_code.clone();
        }
        if let Some(destination_id) = self.destination_id {
            target.destination_id = destination_id;
        }
        if let Some(destination_code) = &self.destination_code {
            target.destination_code = destination_code.clone();
        }
        if let Some(date_time) = self.date_time {
            target.date_time = storage_precision(date_time);
        }
        if let Some(is_active) = self.is_active {
            target.is_active = is_active;
        }
        if let Some(last_checked_at) = self.last_checked_at {
            target.last_checked_at = last_checked_at.map(storage_precision);
        }
        target.updated_at = now;
    }
}

/// Absent stays `None` (via `#[serde(default)]`); `null` becomes `Some(None)`.
fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
