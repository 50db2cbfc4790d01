//! Quotes and their versions.
//!
//! A version save prices its line items against the catalog, stores the
//! lines and recomputes the version totals in a single transaction.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::audit::{self, Actor, QUOTES, QUOTE_VERSIONS};
use crate::db;
use crate::error::{AppError, Result};
use crate::form::JsonBody;
use crate::models::quote::{
    next_quote_number, CreateQuote, CreateQuoteVersion, QuoteWithVersions, SaasLineInput,
    SetupLineInput, UpdateQuote, UpdateQuoteVersion,
};
use crate::models::{Quote, QuoteSaasLine, QuoteSetupLine, QuoteVersion, QuoteVersionDetail};
use crate::pricing::calculators::{quote_totals, tier_price};
use crate::pricing::services;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/quotes", get(list).post(create))
        .route("/api/quotes/:id", get(show).patch(update).delete(remove))
        .route(
            "/api/quotes/:id/versions",
            get(list_versions).post(create_version),
        )
        .route(
            "/api/quotes/:id/versions/:number",
            get(show_version)
                .patch(update_version)
                .delete(remove_version),
        )
}

// ==================== Pricing ====================

/// Price SaaS lines at the tier band for their quantity
async fn price_saas_lines(
    conn: &mut PgConnection,
    version_id: Uuid,
    inputs: &[SaasLineInput],
) -> Result<Vec<QuoteSaasLine>> {
    let mut lines = Vec::with_capacity(inputs.len());
    for input in inputs {
        let product = db::find_saas_product(&mut *conn, input.saas_product_id)
            .await?
            .ok_or_else(|| {
                AppError::bad_request(format!("SaaS product {} not found", input.saas_product_id))
            })?;
        lines.push(QuoteSaasLine {
            id: Uuid::new_v4(),
            quote_version_id: version_id,
            saas_product_id: product.id,
            quantity: input.quantity,
            calculated_monthly_price: tier_price(&product, input.quantity),
            notes: input.notes.clone(),
        });
    }
    Ok(lines)
}

/// Price setup lines at the SKU's fixed price times quantity
async fn price_setup_lines(
    conn: &mut PgConnection,
    version_id: Uuid,
    inputs: &[SetupLineInput],
) -> Result<Vec<QuoteSetupLine>> {
    let mut lines = Vec::with_capacity(inputs.len());
    for input in inputs {
        let sku = db::find_sku_definition(&mut *conn, input.sku_definition_id)
            .await?
            .ok_or_else(|| {
                AppError::bad_request(format!("SKU {} not found", input.sku_definition_id))
            })?;
        let unit = sku.fixed_price.unwrap_or(Decimal::ZERO);
        lines.push(QuoteSetupLine {
            id: Uuid::new_v4(),
            quote_version_id: version_id,
            sku_definition_id: sku.id,
            quantity: input.quantity,
            calculated_price: unit * Decimal::from(input.quantity),
            custom_scope_notes: input.custom_scope_notes.clone(),
            sequence_order: input.sequence_order,
        });
    }
    Ok(lines)
}

/// Store line sums, travel and the contracted amount on the version row
fn set_totals(
    version: &mut QuoteVersion,
    saas: &[QuoteSaasLine],
    setup: &[QuoteSetupLine],
    travel: Decimal,
) {
    let monthly: Decimal = saas.iter().map(|l| l.calculated_monthly_price).sum();
    let setup_total: Decimal = setup.iter().map(|l| l.calculated_price).sum();
    let totals = quote_totals(version, monthly, setup_total, travel);

    version.total_saas_monthly = Some(totals.saas_monthly);
    version.total_saas_annual_year1 = Some(totals.saas_annual_year1);
    version.total_setup_packages = Some(totals.setup);
    version.total_travel = Some(totals.travel);
    version.total_contracted_amount = Some(totals.contracted);
}

/// Replace the version's lines, recompute totals and persist the row
async fn save_version(
    conn: &mut PgConnection,
    mut version: QuoteVersion,
    saas: Vec<QuoteSaasLine>,
    setup: Vec<QuoteSetupLine>,
) -> Result<QuoteVersionDetail> {
    db::replace_lines(&mut *conn, version.id, &saas, &setup).await?;
    let travel = services::version_travel(&mut *conn, &version).await?;
    set_totals(&mut version, &saas, &setup, travel);
    let version = db::update_quote_version(&mut *conn, &version).await?;
    db::touch_quote(&mut *conn, version.quote_id).await?;
    db::version_detail(conn, version).await
}

// ==================== Quotes ====================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Quote>>> {
    let (skip, limit) = super::paging(params.skip, params.limit);
    let status = params.status.as_deref().filter(|s| !s.is_empty());
    Ok(Json(db::list_quotes(&state.db, status, skip, limit).await?))
}

/// Quote with every version and its line items
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuoteWithVersions>> {
    let mut conn = state.db.acquire().await?;
    let quote = db::get_quote(&mut *conn, id).await?;
    let mut versions = Vec::new();
    for version in db::quote_versions(&mut *conn, id).await? {
        versions.push(db::version_detail(&mut conn, version).await?);
    }
    Ok(Json(QuoteWithVersions { quote, versions }))
}

/// Create a quote and its initial version against the current pricing version
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(body): JsonBody<CreateQuote>,
) -> Result<(StatusCode, Json<Quote>)> {
    body.validate()?;

    let mut tx = state.db.begin().await?;
    let current = db::find_current_pricing_version(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::bad_request(
                "No current pricing version found. Please set a pricing version as current before creating quotes.",
            )
        })?;

    let prefix = format!("Q-{}-", Utc::now().year());
    let last = db::last_quote_number(&mut *tx, &prefix).await?;
    let number = next_quote_number(&prefix, last.as_deref());
    let quote = db::insert_quote(&mut *tx, &body.into_row(number.clone(), actor.as_str()))
        .await
        .map_err(|e| e.on_conflict(format!("Quote number {} already exists", number)))?;
    let version = db::insert_quote_version(&mut *tx, &QuoteVersion::initial(&quote, current.id)).await?;

    audit::log_create(&mut *tx, &actor, QUOTES, quote.id, &quote).await?;
    audit::log_create(&mut *tx, &actor, QUOTE_VERSIONS, version.id, &version).await?;
    tx.commit().await?;

    tracing::info!("Created quote {}", quote.quote_number);
    Ok((StatusCode::CREATED, Json(quote)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<UpdateQuote>,
) -> Result<Json<Quote>> {
    patch.validate()?;

    let mut tx = state.db.begin().await?;
    let before = db::get_quote(&mut *tx, id).await?;
    let mut row = before.clone();
    patch.apply(&mut row);
    let quote = db::update_quote(&mut *tx, &row).await?;
    audit::log_update(&mut *tx, &actor, QUOTES, id, &before, &quote).await?;
    tx.commit().await?;

    Ok(Json(quote))
}

/// Delete a quote; versions and lines go with it
pub async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    let quote = db::get_quote(&mut *tx, id).await?;
    db::delete_quote(&mut *tx, id).await?;
    audit::log_delete(&mut *tx, &actor, QUOTES, id, &quote).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Versions ====================

pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuoteVersionDetail>>> {
    let mut conn = state.db.acquire().await?;
    db::get_quote(&mut *conn, id).await?;
    let mut details = Vec::new();
    for version in db::quote_versions(&mut *conn, id).await? {
        details.push(db::version_detail(&mut conn, version).await?);
    }
    Ok(Json(details))
}

pub async fn show_version(
    State(state): State<AppState>,
    Path((id, number)): Path<(Uuid, i32)>,
) -> Result<Json<QuoteVersionDetail>> {
    let mut conn = state.db.acquire().await?;
    let version = db::get_quote_version(&mut *conn, id, number).await?;
    Ok(Json(db::version_detail(&mut conn, version).await?))
}

pub async fn create_version(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<CreateQuoteVersion>,
) -> Result<(StatusCode, Json<QuoteVersionDetail>)> {
    body.validate()?;

    let mut tx = state.db.begin().await?;
    db::get_quote(&mut *tx, id).await?;
    db::get_pricing_version(&mut *tx, body.pricing_version_id).await?;

    let number = db::next_version_number(&mut *tx, id).await?;
    let (row, saas_inputs, setup_inputs) = body.into_parts(id, number, actor.as_str());
    let version = db::insert_quote_version(&mut *tx, &row).await?;

    let saas = price_saas_lines(&mut tx, version.id, &saas_inputs).await?;
    let setup = price_setup_lines(&mut tx, version.id, &setup_inputs).await?;
    let detail = save_version(&mut tx, version, saas, setup).await?;

    audit::log_create(&mut *tx, &actor, QUOTE_VERSIONS, detail.version.id, &detail).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Patch a draft version. Line lists that are present replace the stored
/// lines; absent lists keep them. Totals are always recomputed.
pub async fn update_version(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, number)): Path<(Uuid, i32)>,
    JsonBody(patch): JsonBody<UpdateQuoteVersion>,
) -> Result<Json<QuoteVersionDetail>> {
    patch.validate()?;

    let mut tx = state.db.begin().await?;
    let version = db::get_quote_version(&mut *tx, id, number).await?;
    ensure_draft(&version, "edit")?;
    let before = db::version_detail(&mut tx, version).await?;

    let mut row = before.version.clone();
    patch.apply(&mut row);

    let saas = match &patch.saas_products {
        Some(inputs) => price_saas_lines(&mut tx, row.id, inputs).await?,
        None => before.saas_products.clone(),
    };
    let setup = match &patch.setup_packages {
        Some(inputs) => price_setup_lines(&mut tx, row.id, inputs).await?,
        None => before.setup_packages.clone(),
    };
    let detail = save_version(&mut tx, row, saas, setup).await?;

    audit::log_update(&mut *tx, &actor, QUOTE_VERSIONS, detail.version.id, &before, &detail).await?;
    tx.commit().await?;

    Ok(Json(detail))
}

/// Sent and accepted versions are frozen
fn ensure_draft(version: &QuoteVersion, action: &str) -> Result<()> {
    if version.is_frozen() {
        return Err(AppError::bad_request(format!(
            "Cannot {} {} version",
            action,
            version.version_status.to_lowercase()
        )));
    }
    Ok(())
}

pub async fn remove_version(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, number)): Path<(Uuid, i32)>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    let version = db::get_quote_version(&mut *tx, id, number).await?;
    ensure_draft(&version, "delete")?;

    let detail = db::version_detail(&mut tx, version).await?;
    db::delete_quote_version(&mut *tx, detail.version.id).await?;
    db::touch_quote(&mut *tx, id).await?;
    audit::log_delete(&mut *tx, &actor, QUOTE_VERSIONS, detail.version.id, &detail).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use rust_decimal_macros::dec;

    #[test]
    fn test_frozen_versions_refuse_changes() {
        let mut version = fixtures::quote_version();
        assert!(ensure_draft(&version, "edit").is_ok());

        version.version_status = "SENT".into();
        let err = ensure_draft(&version, "edit").unwrap_err();
        assert!(matches!(&err, AppError::BadRequest(msg) if msg == "Cannot edit sent version"));

        version.version_status = "ACCEPTED".into();
        let err = ensure_draft(&version, "delete").unwrap_err();
        assert!(matches!(&err, AppError::BadRequest(msg) if msg == "Cannot delete accepted version"));
    }

    fn saas_line(price: Decimal) -> QuoteSaasLine {
        QuoteSaasLine {
            id: Uuid::new_v4(),
            quote_version_id: Uuid::nil(),
            saas_product_id: Uuid::new_v4(),
            quantity: dec!(1),
            calculated_monthly_price: price,
            notes: None,
        }
    }

    fn setup_line(price: Decimal) -> QuoteSetupLine {
        QuoteSetupLine {
            id: Uuid::new_v4(),
            quote_version_id: Uuid::nil(),
            sku_definition_id: Uuid::new_v4(),
            quantity: 1,
            calculated_price: price,
            custom_scope_notes: None,
            sequence_order: None,
        }
    }

    #[test]
    fn test_set_totals_sums_lines() {
        let mut version = fixtures::quote_version();
        version.projection_years = 1;
        let saas = [saas_line(dec!(2950.00)), saas_line(dec!(600.00))];
        let setup = [setup_line(dec!(64400.00))];

        set_totals(&mut version, &saas, &setup, dec!(3315.00));

        assert_eq!(version.total_saas_monthly, Some(dec!(3550.00)));
        assert_eq!(version.total_saas_annual_year1, Some(dec!(42600.00)));
        assert_eq!(version.total_setup_packages, Some(dec!(64400.00)));
        assert_eq!(version.total_travel, Some(dec!(3315.00)));
        // one year: 42,600 SaaS + 64,400 setup + travel
        assert_eq!(version.total_contracted_amount, Some(dec!(110315.00)));
    }

    #[test]
    fn test_set_totals_without_lines() {
        let mut version = fixtures::quote_version();
        set_totals(&mut version, &[], &[], Decimal::ZERO);
        assert_eq!(version.total_saas_monthly, Some(Decimal::ZERO));
        assert_eq!(version.total_contracted_amount, Some(Decimal::ZERO));
    }
}
