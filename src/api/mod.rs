// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderName, HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::{
    auth::auth_middleware,
    error::ErrorBody,
    models::{CreateSubscriptionRequest, Subscription, SubscriptionPatch},
    state::AppState,
};

pub mod health;
pub mod subscriptions;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Build the application router.
///
/// Layers, outermost first: CORS (so preflights never reach the gate),
/// request-id assignment, tracing, request-id propagation, authentication.
pub fn router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/subscriptions", post(subscriptions::create_subscription))
        .route(
            "/subscriptions/{id}",
            get(subscriptions::list_subscriptions)
                .put(subscriptions::update_subscription)
                .delete(subscriptions::delete_subscription),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .layer(cors_layer(cors_allowed_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ORIGIN, CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([REQUEST_ID_HEADER])
        .allow_credentials(true)
}

/// Registers the bearer-token scheme referenced by the handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Flightwatch API",
        description = "Flight route subscriptions for authenticated users."
    ),
    paths(
        health::health,
        subscriptions::create_subscription,
        subscriptions::list_subscriptions,
        subscriptions::update_subscription,
        subscriptions::delete_subscription
    ),
    components(
        schemas(
            Subscription,
            CreateSubscriptionRequest,
            SubscriptionPatch,
            ErrorBody,
            subscriptions::DeleteResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness probe"),
        (name = "Subscriptions", description = "Flight route subscription management")
    )
)]
pub struct ApiDoc;
