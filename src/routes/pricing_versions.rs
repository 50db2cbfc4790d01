//! Pricing version lifecycle: list, create, patch, lock, clone, compare, delete.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{self, Actor, PRICING_VERSIONS};
use crate::db::{self, VersionFilter};
use crate::error::{AppError, Result};
use crate::form::JsonBody;
use crate::models::requests::{CreatePricingVersion, UpdatePricingVersion};
use crate::models::PricingVersion;
use crate::versioning::{self, VersionComparison};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/pricing-versions", get(list).post(create))
        .route("/api/pricing-versions/current", get(current))
        .route("/api/pricing-versions/compare", get(compare))
        .route(
            "/api/pricing-versions/:id",
            get(show).patch(update).delete(remove),
        )
        .route("/api/pricing-versions/:id/clone", post(clone))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
    pub is_locked: Option<bool>,
    pub is_current: Option<bool>,
}

/// List versions, newest first. `is_locked=false` gives the selectable set.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PricingVersion>>> {
    let (skip, limit) = super::paging(params.skip, params.limit);
    let filter = VersionFilter {
        is_locked: params.is_locked,
        is_current: params.is_current,
        skip,
        limit,
    };
    Ok(Json(db::list_pricing_versions(&state.db, &filter).await?))
}

pub async fn current(State(state): State<AppState>) -> Result<Json<PricingVersion>> {
    let version = db::find_current_pricing_version(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("No current pricing version found"))?;
    Ok(Json(version))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<PricingVersion>> {
    Ok(Json(db::get_pricing_version(&state.db, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(body): JsonBody<CreatePricingVersion>,
) -> Result<(StatusCode, Json<PricingVersion>)> {
    body.validate()?;
    let duplicate = format!("Version number {} already exists", body.version_number);

    let mut tx = state.db.begin().await?;
    if db::version_number_exists(&mut *tx, &body.version_number).await? {
        return Err(AppError::bad_request(duplicate));
    }

    let row = body.into_row(actor.as_str());
    if row.is_current {
        db::unset_current_versions(&mut *tx, None).await?;
    }
    let version = db::insert_pricing_version(&mut *tx, &row)
        .await
        .map_err(|e| e.on_conflict(duplicate))?;
    audit::log_create(&mut *tx, &actor, PRICING_VERSIONS, version.id, &version).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    tracing::info!("Created pricing version {}", version.version_number);
    Ok((StatusCode::CREATED, Json(version)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<UpdatePricingVersion>,
) -> Result<Json<PricingVersion>> {
    let mut tx = state.db.begin().await?;
    let before = db::get_pricing_version(&mut *tx, id).await?;
    if before.is_locked && !patch.allowed_on_locked() {
        return Err(AppError::bad_request("Cannot update locked pricing version"));
    }

    let mut row = before.clone();
    patch.apply(&mut row);
    if patch.is_current == Some(true) {
        db::unset_current_versions(&mut *tx, Some(id)).await?;
    }
    let version = db::update_pricing_version(&mut *tx, &row).await?;
    audit::log_update(&mut *tx, &actor, PRICING_VERSIONS, id, &before, &version).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok(Json(version))
}

pub async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    let version = db::get_pricing_version(&mut *tx, id).await?;
    super::ensure_unlocked(&version, "Cannot delete locked pricing version")?;

    db::delete_pricing_version(&mut *tx, id).await?;
    audit::log_delete(&mut *tx, &actor, PRICING_VERSIONS, id, &version).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CloneParams {
    pub new_version_number: String,
    pub new_description: Option<String>,
}

pub async fn clone(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Query(params): Query<CloneParams>,
) -> Result<(StatusCode, Json<PricingVersion>)> {
    crate::form::check_required("new_version_number", &params.new_version_number)?;
    crate::form::check_len("new_version_number", &params.new_version_number, 20)?;

    let mut tx = state.db.begin().await?;
    let version = versioning::clone_version(
        &mut tx,
        id,
        params.new_version_number.trim(),
        params.new_description,
    )
    .await?;
    audit::log_create(&mut *tx, &actor, PRICING_VERSIONS, version.id, &version).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(version)))
}

#[derive(Debug, Deserialize)]
pub struct CompareParams {
    pub version1_id: Uuid,
    pub version2_id: Uuid,
}

pub async fn compare(
    State(state): State<AppState>,
    Query(params): Query<CompareParams>,
) -> Result<Json<VersionComparison>> {
    let mut conn = state.db.acquire().await?;
    let comparison = versioning::compare(&mut conn, params.version1_id, params.version2_id).await?;
    Ok(Json(comparison))
}
