// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{IssuedToken, Role},
    models::{LoginRequest, PasswordChangeRequest, RegisterRequest},
    state::AppState,
};

pub mod health;
pub mod security;

pub fn router(state: AppState) -> Router {
    let security_routes = Router::new()
        .route("/login", post(security::login))
        .route("/register", post(security::register))
        .route("/refresh", get(security::refresh))
        .route("/change-pswd", post(security::change_password));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/s", security_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        security::login,
        security::register,
        security::refresh,
        security::change_password,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            PasswordChangeRequest,
            IssuedToken,
            Role,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Security", description = "Login, registration and session tokens"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
