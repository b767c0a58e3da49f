// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared helpers: a local JWKS endpoint, token signing and request builders.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    routing::get,
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use flightwatch_server::{
    api::router,
    auth::{AuthConfig, JwksManager},
    state::AppState,
};

pub const ISSUER: &str = "https://flightwatch-test.eu.auth0.com/";
pub const AUDIENCE: &str = "https://api.flightwatch.test";
pub const KID: &str = "test-key-1";

pub const SIGNING_KEY: &str = include_str!("../fixtures/test_rsa_private.pem");
pub const FOREIGN_KEY: &str = include_str!("../fixtures/other_rsa_private.pem");
const JWKS: &str = include_str!("../fixtures/jwks.json");

/// Serve the fixture key set on an ephemeral local port and return its URL.
pub async fn spawn_jwks_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/.well-known/jwks.json",
        get(|| async { ([(header::CONTENT_TYPE, "application/json")], JWKS) }),
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/.well-known/jwks.json")
}

pub struct TestApp {
    pub router: Router,
}

impl TestApp {
    /// Full router over the in-memory repository, keys from a local JWKS server.
    pub async fn spawn() -> Self {
        let jwks = JwksManager::new(spawn_jwks_server().await).unwrap();
        jwks.refresh().await.unwrap();

        let auth = AuthConfig {
            jwks: Arc::new(jwks),
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
        };
        let state = AppState::in_memory(auth);
        Self {
            router: router(state, &["http://localhost:3000".to_string()]),
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

pub fn claims(sub: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": sub,
        "iss": ISSUER,
        "aud": [AUDIENCE, format!("{ISSUER}userinfo")],
        "iat": now,
        "exp": now + 3600,
        "scope": "openid profile email",
    })
}

pub fn sign_with(pem: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    encode(&header, claims, &EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap()).unwrap()
}

pub fn token_for(sub: &str) -> String {
    sign_with(SIGNING_KEY, &claims(sub))
}

pub fn subscription_body(user_id: &str) -> Value {
    json!({
        "user_id": user_id,
        "email": "traveller@example.com",
        "origin_id": 1,
        "origin_code": "SGN",
        "destination_id": 2,
        "destination_code": "HAN",
        "date_time": "2025-06-01T10:00:00Z",
    })
}
