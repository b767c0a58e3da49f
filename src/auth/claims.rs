// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by an Auth0 access token.
///
/// Signature, `exp`, `iss` and `aud` are checked by `jsonwebtoken` before
/// this struct is handed out; a claim with the wrong JSON type fails
/// deserialization and the token is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth0Claims {
    /// Subject, e.g. `auth0|64b7...` or `google-oauth2|1043...`
    pub sub: String,

    pub iss: String,

    pub aud: Audience,

    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Space-separated granted scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// `aud` is a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(aud) => aud == audience,
            Audience::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// Authenticated user information extracted from a verified token.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Canonical user ID (Auth0 `sub` claim)
    pub user_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(skip)]
    pub issuer: String,

    /// Token expiration (Unix timestamp)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: Auth0Claims) -> Self {
        Self {
            user_id: claims.sub,
            scope: claims.scope,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }
}
