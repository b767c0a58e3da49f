// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Auth0 bearer-token authentication for the subscription API.
//!
//! ## Auth Flow
//!
//! 1. Frontend authenticates the user with Auth0
//! 2. Frontend sends `Authorization: Bearer <access token>`
//! 3. Server:
//!    - Resolves the signing key by `kid` from the Auth0 JWKS
//!    - Verifies the RS256 signature, expiry, issuer and audience
//!    - Binds `sub` to the request as the canonical `user_id`
//!
//! ## Security
//!
//! - Every route except `GET /api/health` requires authentication
//! - Only RS256 is accepted; the token header cannot pick the algorithm
//! - JWKS is cached with a TTL and refreshed in the background
//! - Clock skew tolerance is 60 seconds
//! - Every failure is a 401 with a machine-readable `error_code`

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::JwksManager;
pub use middleware::{auth_middleware, AuthConfig, HEALTH_PATH};
