// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a request was refused at the authentication gate.
///
/// Every variant is answered with 401; the code tells clients and logs apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Header is not `Bearer <token>`
    InvalidAuthHeader,
    /// Token is not a decodable JWT
    MalformedToken,
    /// Header declares an algorithm other than RS256
    AlgorithmMismatch,
    /// Header carries no `kid`
    MissingKeyId,
    /// No key in the JWKS with the token's `kid`
    NoMatchingKey,
    /// The JWKS entry cannot be turned into an RSA verification key
    UnusableKey(String),
    /// JWKS fetch failed and nothing is cached
    JwksFetchError(String),
    InvalidSignature,
    TokenExpired,
    TokenNotYetValid,
    InvalidIssuer,
    InvalidAudience,
    /// A claim is missing or has the wrong JSON type
    InvalidClaims,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::AlgorithmMismatch => "algorithm_mismatch",
            AuthError::MissingKeyId => "missing_key_id",
            AuthError::NoMatchingKey => "no_matching_key",
            AuthError::UnusableKey(_) => "unusable_key",
            AuthError::JwksFetchError(_) => "jwks_fetch_error",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::InvalidClaims => "invalid_claims",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// Detail for logs only; never sent to the client.
    pub fn detail(&self) -> Option<&str> {
        match self {
            AuthError::UnusableKey(msg) | AuthError::JwksFetchError(msg) => Some(msg),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::AlgorithmMismatch => write!(f, "Token must be signed with RS256"),
            AuthError::MissingKeyId => write!(f, "Token header has no key id"),
            AuthError::NoMatchingKey => write!(f, "No matching key found in JWKS"),
            AuthError::UnusableKey(_) => write!(f, "Signing key could not be used"),
            AuthError::JwksFetchError(_) => write!(f, "Unable to fetch signing keys"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "Token audience is invalid"),
            AuthError::InvalidClaims => write!(f, "Token claims are invalid"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            ErrorKind::InvalidAlgorithm => AuthError::AlgorithmMismatch,
            ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
                "iss" => AuthError::InvalidIssuer,
                "aud" => AuthError::InvalidAudience,
                "exp" => AuthError::TokenExpired,
                _ => AuthError::InvalidClaims,
            },
            ErrorKind::Json(_) => AuthError::InvalidClaims,
            _ => AuthError::MalformedToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
