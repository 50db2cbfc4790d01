//! Pricing service functions with database access.
//!
//! These load rows (through the snapshot cache where possible) and hand them
//! to the pure calculators and configuration builder.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use std::sync::Arc;

use crate::cache::AppCache;
use crate::db;
use crate::error::{AppError, Result};
use crate::models::QuoteVersion;

use super::calculators::{self, trips_from_config};
use super::configure::{self, ConfigSnapshot};
use super::requests::{ComplexityFactorRequest, ConfigureRequest, TravelCostRequest};
use super::responses::{
    AvailableIntegrationsResponse, AvailableModulesResponse, ComplexityFactorResponse,
    ConfigurationResponse, TravelCostResponse,
};

pub const COMPLEXITY_RULE: &str = "COMPLEXITY_FACTOR";

/// Snapshot of the current pricing version
pub async fn current_snapshot(pool: &PgPool, cache: &AppCache) -> Result<Arc<ConfigSnapshot>> {
    let current = db::find_current_pricing_version(pool)
        .await?
        .ok_or_else(|| AppError::bad_request("No current pricing version found"))?;
    cache.snapshot(pool, current.id).await
}

pub async fn configure(
    pool: &PgPool,
    cache: &AppCache,
    req: &ConfigureRequest,
) -> Result<ConfigurationResponse> {
    let snapshot = current_snapshot(pool, cache).await?;
    let result = configure::configure(&snapshot, req);
    tracing::debug!(
        "Configured {} products and {} setup SKUs",
        result.selected_products.len(),
        result.setup_skus.len()
    );
    Ok(result)
}

pub async fn available_modules(pool: &PgPool, cache: &AppCache) -> Result<AvailableModulesResponse> {
    Ok(current_snapshot(pool, cache).await?.available_modules())
}

pub async fn available_integrations(
    pool: &PgPool,
    cache: &AppCache,
) -> Result<AvailableIntegrationsResponse> {
    Ok(current_snapshot(pool, cache).await?.available_integrations())
}

/// Evaluate the current version's COMPLEXITY_FACTOR rule
pub async fn complexity_factor(
    pool: &PgPool,
    cache: &AppCache,
    req: &ComplexityFactorRequest,
) -> Result<ComplexityFactorResponse> {
    let snapshot = current_snapshot(pool, cache).await?;
    let rule = snapshot.rule(COMPLEXITY_RULE);
    if rule.is_none() {
        tracing::warn!(
            "No active {} rule in pricing version {}",
            COMPLEXITY_RULE,
            snapshot.pricing_version_id
        );
    }
    Ok(calculators::evaluate_complexity(rule, &req.parameters()))
}

/// Price trips against a zone; an unknown or absent zone prices at zero
pub async fn travel_cost<'e>(
    db: impl PgExecutor<'e>,
    req: &TravelCostRequest,
) -> Result<TravelCostResponse> {
    let zone = match req.travel_zone_id {
        Some(id) => db::find_travel_zone(db, id).await?,
        None => None,
    };
    let trips = req.trips.as_deref().unwrap_or_default();
    Ok(calculators::travel_cost(zone.as_ref(), trips))
}

/// Travel total of a quote version from its zone and `TravelConfig.trips`
pub async fn version_travel<'e>(db: impl PgExecutor<'e>, version: &QuoteVersion) -> Result<Decimal> {
    let Some(zone_id) = version.travel_zone_id else {
        return Ok(Decimal::ZERO);
    };
    let trips = trips_from_config(version.travel_config.as_ref());
    if trips.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let zone = db::find_travel_zone(db, zone_id).await?;
    Ok(calculators::travel_cost(zone.as_ref(), &trips).total_travel_cost)
}
