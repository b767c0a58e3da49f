// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthConfig;
use crate::service::SubscriptionService;
use crate::storage::{InMemorySubscriptionRepository, SubscriptionRepository};

#[derive(Clone)]
pub struct AppState {
    pub subscriptions: SubscriptionService,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(repo: Arc<dyn SubscriptionRepository>, auth: AuthConfig) -> Self {
        Self {
            subscriptions: SubscriptionService::new(repo),
            auth,
        }
    }

    /// State backed by [`InMemorySubscriptionRepository`].
    pub fn in_memory(auth: AuthConfig) -> Self {
        Self::new(Arc::new(InMemorySubscriptionRepository::new()), auth)
    }
}
