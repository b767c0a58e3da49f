// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Flightwatch - Flight Route Subscription Service
//!
//! REST backend that stores users' flight-route watches in PostgreSQL and
//! guards every endpoint but the health probe with Auth0 bearer tokens.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Authentication gate (Auth0 JWT, JWKS)
//! - `service` - Subscription business rules
//! - `storage` - Repositories (Diesel/PostgreSQL, in-memory)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;
pub mod state;
pub mod storage;
