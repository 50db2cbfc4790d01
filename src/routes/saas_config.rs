//! Configuration-driven SaaS quote builder.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::Result;
use crate::form::JsonBody;
use crate::pricing::requests::ConfigureRequest;
use crate::pricing::responses::{
    AvailableIntegrationsResponse, AvailableModulesResponse, ConfigurationResponse,
};
use crate::pricing::services;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/saas-config/available-integrations",
            get(available_integrations),
        )
        .route("/api/saas-config/available-modules", get(available_modules))
        .route("/api/saas-config/configure", post(configure))
}

pub async fn available_integrations(
    State(state): State<AppState>,
) -> Result<Json<AvailableIntegrationsResponse>> {
    Ok(Json(
        services::available_integrations(&state.db, &state.cache).await?,
    ))
}

pub async fn available_modules(
    State(state): State<AppState>,
) -> Result<Json<AvailableModulesResponse>> {
    Ok(Json(services::available_modules(&state.db, &state.cache).await?))
}

/// Build a SaaS configuration from the current pricing version
pub async fn configure(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ConfigureRequest>,
) -> Result<Json<ConfigurationResponse>> {
    req.validate()?;
    Ok(Json(services::configure(&state.db, &state.cache, &req).await?))
}
