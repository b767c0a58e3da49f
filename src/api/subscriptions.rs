// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Auth,
    error::{ApiError, ApiJson, ErrorBody},
    models::{CreateSubscriptionRequest, Subscription, SubscriptionPatch},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/subscriptions",
    request_body = CreateSubscriptionRequest,
    tag = "Subscriptions",
    security(("bearer" = [])),
    responses(
        (status = 201, body = Subscription),
        (status = 400, body = ErrorBody),
        (status = 409, description = "Active subscription exists for this route", body = ErrorBody)
    )
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    Auth(user): Auth,
    ApiJson(request): ApiJson<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let candidate = request.into_new_subscription(&user.user_id);
    let subscription = state.subscriptions.create(candidate).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

#[utoipa::path(
    get,
    path = "/api/subscriptions/{user_id}",
    params(
        ("user_id" = String, Path, description = "Owner whose subscriptions are listed")
    ),
    tag = "Subscriptions",
    security(("bearer" = [])),
    responses((status = 200, body = [Subscription]))
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    Ok(Json(state.subscriptions.list_by_user(&user_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/subscriptions/{id}",
    params(
        ("id" = String, Path, description = "Identifier of the subscription to update")
    ),
    request_body = SubscriptionPatch,
    tag = "Subscriptions",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Subscription),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 409, description = "Another active subscription holds the resulting route", body = ErrorBody)
    )
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<SubscriptionPatch>,
) -> Result<Json<Subscription>, ApiError> {
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("Subscription not found"))?;
    Ok(Json(state.subscriptions.update(id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/subscriptions/{id}",
    params(
        ("id" = String, Path, description = "Identifier of the subscription to delete")
    ),
    tag = "Subscriptions",
    security(("bearer" = [])),
    responses((status = 200, body = DeleteResponse))
)]
pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    match Uuid::parse_str(&id) {
        Ok(id) => state.subscriptions.delete(id).await?,
        // Matches no row, same outcome as a missing id.
        Err(_) => debug!(id = %id, "Delete with non-UUID id"),
    }
    Ok(Json(DeleteResponse {
        message: "Subscription deleted successfully".to_string(),
    }))
}
