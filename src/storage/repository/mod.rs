// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to PostgreSQL.
//!
//! Row types and changesets stay private to this module; callers only see
//! [`crate::models::Subscription`].

pub mod subscriptions;

pub use subscriptions::PgSubscriptionRepository;
