//! Setup SKU catalog editor.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{self, Actor, SKU_DEFINITIONS};
use crate::db::{self, SkuFilter};
use crate::error::{AppError, Result};
use crate::form::JsonBody;
use crate::models::requests::{CreateSkuDefinition, UpdateSkuDefinition};
use crate::models::SkuDefinition;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/sku-definitions", get(list).post(create))
        .route(
            "/api/sku-definitions/:id",
            get(show).patch(update).delete(remove),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub pricing_version_id: Option<Uuid>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SkuDefinition>>> {
    let (skip, limit) = super::paging(params.skip, params.limit);
    let filter = SkuFilter {
        pricing_version_id: params.pricing_version_id,
        category: params.category.filter(|c| !c.is_empty()),
        is_active: params.is_active,
        skip,
        limit,
    };
    Ok(Json(db::list_sku_definitions(&state.db, &filter).await?))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SkuDefinition>> {
    Ok(Json(db::get_sku_definition(&state.db, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(body): JsonBody<CreateSkuDefinition>,
) -> Result<(StatusCode, Json<SkuDefinition>)> {
    body.validate()?;
    let duplicate = format!(
        "SKU code {} already exists in this pricing version",
        body.sku_code
    );

    let mut tx = state.db.begin().await?;
    super::unlocked_version(
        &mut *tx,
        body.pricing_version_id,
        "Cannot add SKU to locked pricing version",
    )
    .await?;
    if db::sku_code_exists(&mut *tx, body.pricing_version_id, &body.sku_code).await? {
        return Err(AppError::bad_request(duplicate));
    }

    let sku = db::insert_sku_definition(&mut *tx, &body.into_row())
        .await
        .map_err(|e| e.on_conflict(duplicate))?;
    audit::log_create(&mut *tx, &actor, SKU_DEFINITIONS, sku.id, &sku).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(sku)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<UpdateSkuDefinition>,
) -> Result<Json<SkuDefinition>> {
    patch.validate()?;

    let mut tx = state.db.begin().await?;
    let before = db::get_sku_definition(&mut *tx, id).await?;
    super::unlocked_version(
        &mut *tx,
        before.pricing_version_id,
        "Cannot update SKU in locked pricing version",
    )
    .await?;

    let mut row = before.clone();
    patch.apply(&mut row);
    let sku = db::update_sku_definition(&mut *tx, &row).await?;
    audit::log_update(&mut *tx, &actor, SKU_DEFINITIONS, id, &before, &sku).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok(Json(sku))
}

/// Delete a SKU. Quote setup packages hold a foreign key to it, so a SKU
/// that has been quoted stays.
pub async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    let sku = db::get_sku_definition(&mut *tx, id).await?;
    super::unlocked_version(
        &mut *tx,
        sku.pricing_version_id,
        "Cannot delete SKU from locked pricing version",
    )
    .await?;

    db::delete_sku_definition(&mut *tx, id).await?;
    audit::log_delete(&mut *tx, &actor, SKU_DEFINITIONS, id, &sku).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
