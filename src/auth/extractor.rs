// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthenticatedUser};

/// The user bound to the request by [`auth_middleware`](super::auth_middleware).
///
/// Rejects with 401 when the route is not behind the middleware.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingAuthHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn auth_extractor_requires_middleware_user() {
        let mut parts = Request::builder().uri("/test").body(()).unwrap().into_parts().0;

        let result = Auth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_reads_extensions() {
        let mut parts = Request::builder().uri("/test").body(()).unwrap().into_parts().0;
        parts.extensions.insert(AuthenticatedUser {
            user_id: "auth0|from-middleware".to_string(),
            scope: None,
            issuer: "https://tenant.auth0.com/".to_string(),
            expires_at: 0,
        });

        let Auth(user) = Auth::from_request_parts(&mut parts, &()).await.ok().unwrap();
        assert_eq!(user.user_id, "auth0|from-middleware");
    }
}
