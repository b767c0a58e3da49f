// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied to the whole router with
//! `axum::middleware::from_fn_with_state(auth_config, auth_middleware)`.
//! On success the [`AuthenticatedUser`] is stored in the request extensions
//! where the [`Auth`](super::Auth) extractor picks it up.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use tracing::warn;

use super::claims::Auth0Claims;
use super::jwks::JwksManager;
use super::{AuthError, AuthenticatedUser};
use crate::config::AuthSettings;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// The only path served without a token.
pub const HEALTH_PATH: &str = "/api/health";

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwks: Arc<JwksManager>,
    /// Expected issuer, `https://{domain}/`
    pub issuer: String,
    pub audience: String,
}

impl AuthConfig {
    pub fn new(jwks: Arc<JwksManager>, settings: &AuthSettings) -> Self {
        Self {
            jwks,
            issuer: settings.issuer(),
            audience: settings.audience.clone(),
        }
    }
}

/// Authentication middleware function.
pub async fn auth_middleware(
    State(config): State<AuthConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    let result = match bearer_token(request.headers()).map(str::to_owned) {
        Ok(token) => validate_token(&token, &config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            warn!(
                error_code = e.error_code(),
                detail = e.detail(),
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected unauthenticated request"
            );
            e.into_response()
        }
    }
}

/// Token from `Authorization: Bearer <token>`.
///
/// The value must be exactly the scheme and one token separated by a single
/// space.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Validate a JWT and return the authenticated user.
pub async fn validate_token(token: &str, config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
    if header.alg != Algorithm::RS256 {
        return Err(AuthError::AlgorithmMismatch);
    }
    let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

    let decoding_key = config.jwks.decoding_key(&kid).await?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.set_issuer(&[&config.issuer]);
    validation.set_audience(&[&config.audience]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let claims = decode::<Auth0Claims>(token, &decoding_key, &validation)?.claims;

    if claims.iss != config.issuer {
        return Err(AuthError::InvalidIssuer);
    }
    if !claims.aud.contains(&config.audience) {
        return Err(AuthError::InvalidAudience);
    }

    Ok(AuthenticatedUser::from_claims(claims))
}
