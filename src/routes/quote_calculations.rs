//! Stateless quote calculations used by the quote builder.

use axum::{extract::State, routing::post, Json, Router};

use crate::error::Result;
use crate::form::JsonBody;
use crate::pricing::calculators::{self, DiscountConfig, ProjectionInput};
use crate::pricing::requests::{
    ComplexityFactorRequest, DiscountRequest, MultiYearProjectionRequest,
    ReferralCommissionRequest, TravelCostRequest,
};
use crate::pricing::responses::{
    ComplexityFactorResponse, DiscountResponse, MultiYearProjectionResponse,
    ReferralCommissionResponse, TravelCostResponse,
};
use crate::pricing::services;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/quote-calculations/complexity-factor",
            post(complexity_factor),
        )
        .route("/api/quote-calculations/discounts", post(discounts))
        .route("/api/quote-calculations/travel-cost", post(travel_cost))
        .route(
            "/api/quote-calculations/multi-year-projection",
            post(multi_year_projection),
        )
        .route(
            "/api/quote-calculations/referral-commission",
            post(referral_commission),
        )
}

pub async fn complexity_factor(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ComplexityFactorRequest>,
) -> Result<Json<ComplexityFactorResponse>> {
    req.validate()?;
    Ok(Json(
        services::complexity_factor(&state.db, &state.cache, &req).await?,
    ))
}

pub async fn discounts(
    JsonBody(req): JsonBody<DiscountRequest>,
) -> Result<Json<DiscountResponse>> {
    req.validate()?;
    let config = DiscountConfig::from_value(req.discount_config.as_ref());
    Ok(Json(calculators::apply_discounts(
        req.saas_monthly,
        req.setup_total,
        &config,
    )))
}

pub async fn travel_cost(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TravelCostRequest>,
) -> Result<Json<TravelCostResponse>> {
    req.validate()?;
    Ok(Json(services::travel_cost(&state.db, &req).await?))
}

pub async fn multi_year_projection(
    JsonBody(req): JsonBody<MultiYearProjectionRequest>,
) -> Result<Json<MultiYearProjectionResponse>> {
    req.validate()?;
    let discounts = DiscountConfig::from_value(req.discount_config.as_ref());
    let projection = calculators::multi_year_projection(&ProjectionInput {
        saas_monthly: req.saas_monthly,
        setup_total: req.setup_total,
        projection_years: req.projection_years,
        escalation_model: &req.escalation_model,
        level_loading_enabled: req.level_loading_enabled,
        teller_payments_enabled: req.teller_payments_enabled,
        discounts: &discounts,
    });
    Ok(Json(projection))
}

pub async fn referral_commission(
    JsonBody(req): JsonBody<ReferralCommissionRequest>,
) -> Result<Json<ReferralCommissionResponse>> {
    req.validate()?;
    Ok(Json(calculators::referral_commission(
        req.setup_total,
        req.referral_rate,
    )))
}
