//! Teller Quoter: pricing catalog, configuration-driven quote builder and
//! quote persistence behind a JSON API.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::Layer;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};

pub mod audit;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod seed;
pub mod versioning;

use cache::AppCache;
use config::Config;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: AppCache,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            cache: AppCache::new(),
            config: Arc::new(config),
        }
    }
}

/// Router with every API route and the HTTP middleware stack
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::pricing_versions::routes())
        .merge(routes::saas_products::routes())
        .merge(routes::sku_definitions::routes())
        .merge(routes::travel_zones::routes())
        .merge(routes::text_snippets::routes())
        .merge(routes::referrers::routes())
        .merge(routes::saas_config::routes())
        .merge(routes::quote_calculations::routes())
        .merge(routes::quotes::routes())
        .merge(routes::audit_logs::routes())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `app` with trailing slashes trimmed before routing, so `/api/quotes/`
/// and `/api/quotes` reach the same handler
pub fn service(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(app(state))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn state() -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/teller_quoter_test")
            .unwrap();
        AppState::new(pool, Config::default())
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = service(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_trailing_slash_is_trimmed() {
        let (status, body) = send(Request::get("/health/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = send(Request::get("/api/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_discounts_endpoint() {
        let (status, body) = send(post(
            "/api/quote-calculations/discounts/",
            json!({
                "saas_monthly": 1000,
                "setup_total": "50000",
                "discount_config": {"saas_all_years_pct": 10, "setup_fixed": 5000, "setup_pct": 10}
            }),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["saas_monthly_after"].as_f64(), Some(900.0));
        assert_eq!(body["setup_after"].as_f64(), Some(40500.0));
    }

    #[tokio::test]
    async fn test_referral_rate_out_of_range() {
        let (status, body) = send(post(
            "/api/quote-calculations/referral-commission",
            json!({"setup_total": 10000, "referral_rate": 150}),
        ))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("referral_rate"));
    }

    #[tokio::test]
    async fn test_projection_endpoint() {
        let (status, body) = send(post(
            "/api/quote-calculations/multi-year-projection",
            json!({"saas_monthly": 1000, "setup_total": 0, "projection_years": 2, "escalation_model": "NONE"}),
        ))
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["years"].as_array().unwrap().len(), 2);
        assert_eq!(body["total_contract_value"].as_f64(), Some(24000.0));
    }

    #[tokio::test]
    async fn test_oversized_amount_is_rejected() {
        let (status, body) = send(post(
            "/api/quote-calculations/discounts",
            json!({"saas_monthly": "79228162514264337593543950335", "setup_total": "0"}),
        ))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("saas_monthly"));
    }

    #[tokio::test]
    async fn test_malformed_json_has_detail() {
        let request = Request::post("/api/quote-calculations/discounts")
            .header("content-type", "application/json")
            .body(Body::from("{\"saas_monthly\": "))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_shape_json_has_detail() {
        let (status, body) = send(post(
            "/api/quote-calculations/discounts",
            json!({"saas_monthly": [1, 2]}),
        ))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }
}
