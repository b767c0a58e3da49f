// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;

use support::{claims, sign_with, subscription_body, token_for, TestApp, FOREIGN_KEY, SIGNING_KEY};

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::spawn().await;
    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy"}));
}

#[tokio::test]
async fn missing_token_is_rejected_on_every_route() {
    let app = TestApp::spawn().await;

    let requests = [
        (Method::POST, "/api/subscriptions".to_string(), Some(subscription_body("u1"))),
        (Method::GET, "/api/subscriptions/u1".to_string(), None),
        (Method::PUT, format!("/api/subscriptions/{}", uuid::Uuid::now_v7()), Some(json!({}))),
        (Method::DELETE, format!("/api/subscriptions/{}", uuid::Uuid::now_v7()), None),
    ];
    for (method, uri, body) in requests {
        let (status, body) = app.send(method.clone(), &uri, None, body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    // Nothing reached storage.
    let token = token_for("u1");
    let (_, listed) = app
        .send(Method::GET, "/api/subscriptions/u1", Some(&token), None)
        .await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn wrong_audience_is_rejected() {
    let app = TestApp::spawn().await;
    let mut claims = claims("u1");
    claims["aud"] = json!("https://someone-else.example.com");
    let token = sign_with(SIGNING_KEY, &claims);

    let (status, body) = app
        .send(Method::GET, "/api/subscriptions/u1", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_audience");
}

#[tokio::test]
async fn token_signed_by_another_key_is_rejected() {
    let app = TestApp::spawn().await;
    let token = sign_with(FOREIGN_KEY, &claims("u1"));

    let (status, body) = app
        .send(Method::GET, "/api/subscriptions/u1", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "invalid_signature");
}

#[tokio::test]
async fn create_then_duplicate_conflicts() {
    let app = TestApp::spawn().await;
    let token = token_for("auth0|u1");

    let (status, created) = app
        .send(
            Method::POST,
            "/api/subscriptions",
            Some(&token),
            Some(subscription_body("u1")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].as_str().is_some());
    assert_eq!(created["is_active"], true);
    assert_eq!(created["user_id"], "u1");
    assert_eq!(created["created_at"], created["updated_at"]);
    assert!(created["last_checked_at"].is_null());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/subscriptions",
            Some(&token),
            Some(subscription_body("u1")),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "Active subscription already exists for this route and datetime"
    );

    let (_, listed) = app
        .send(Method::GET, "/api/subscriptions/u1", Some(&token), None)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deactivated_route_can_be_subscribed_again() {
    let app = TestApp::spawn().await;
    let token = token_for("auth0|u1");

    let (_, first) = app
        .send(
            Method::POST,
            "/api/subscriptions",
            Some(&token),
            Some(subscription_body("u1")),
        )
        .await;
    let first_uri = format!("/api/subscriptions/{}", first["id"].as_str().unwrap());

    let (status, updated) = app
        .send(
            Method::PUT,
            &first_uri,
            Some(&token),
            Some(json!({"is_active": false, "nickname": "ignored"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/subscriptions",
            Some(&token),
            Some(subscription_body("u1")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // Reactivating the old row would make two active rows.
    let (status, _) = app
        .send(
            Method::PUT,
            &first_uri,
            Some(&token),
            Some(json!({"is_active": true})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_without_user_id_uses_token_subject() {
    let app = TestApp::spawn().await;
    let token = token_for("auth0|subject");
    let mut body = subscription_body("ignored");
    body.as_object_mut().unwrap().remove("user_id");

    let (status, created) = app
        .send(Method::POST, "/api/subscriptions", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], "auth0|subject");
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let app = TestApp::spawn().await;
    let token = token_for("u1");

    let mut missing_route = subscription_body("u1");
    missing_route.as_object_mut().unwrap().remove("origin_id");
    let (status, body) = app
        .send(Method::POST, "/api/subscriptions", Some(&token), Some(missing_route))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, created) = app
        .send(
            Method::POST,
            "/api/subscriptions",
            Some(&token),
            Some(subscription_body("u1")),
        )
        .await;
    let uri = format!("/api/subscriptions/{}", created["id"].as_str().unwrap());
    let (status, _) = app
        .send(Method::PUT, &uri, Some(&token), Some(json!({"origin_id": "one"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_unknown_or_invalid_id_is_not_found() {
    let app = TestApp::spawn().await;
    let token = token_for("u1");

    for id in [uuid::Uuid::now_v7().to_string(), "42".to_string()] {
        let (status, body) = app
            .send(
                Method::PUT,
                &format!("/api/subscriptions/{id}"),
                Some(&token),
                Some(json!({"email": "x@example.com"})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Subscription not found");
    }
}

#[tokio::test]
async fn delete_of_missing_row_succeeds() {
    let app = TestApp::spawn().await;
    let token = token_for("u1");

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/subscriptions/{}", uuid::Uuid::now_v7()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Subscription deleted successfully"}));
}

#[tokio::test]
async fn patch_can_clear_last_checked_at() {
    let app = TestApp::spawn().await;
    let token = token_for("u1");
    let mut body = subscription_body("u1");
    body["last_checked_at"] = json!("2025-05-30T08:00:00Z");

    let (_, created) = app
        .send(Method::POST, "/api/subscriptions", Some(&token), Some(body))
        .await;
    assert_eq!(created["last_checked_at"], "2025-05-30T08:00:00Z");
    let uri = format!("/api/subscriptions/{}", created["id"].as_str().unwrap());

    let (_, untouched) = app
        .send(Method::PUT, &uri, Some(&token), Some(json!({"email": "new@example.com"})))
        .await;
    assert_eq!(untouched["last_checked_at"], "2025-05-30T08:00:00Z");
    assert_eq!(untouched["email"], "new@example.com");

    let (_, cleared) = app
        .send(Method::PUT, &uri, Some(&token), Some(json!({"last_checked_at": null})))
        .await;
    assert!(cleared["last_checked_at"].is_null());
}
