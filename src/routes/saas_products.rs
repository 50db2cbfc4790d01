//! SaaS product catalog editor.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{self, Actor, SAAS_PRODUCTS};
use crate::db::{self, ProductFilter};
use crate::error::{AppError, Result};
use crate::form::JsonBody;
use crate::models::requests::{CreateSaasProduct, UpdateSaasProduct};
use crate::models::SaasProduct;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/saas-products", get(list).post(create))
        .route(
            "/api/saas-products/:id",
            get(show).patch(update).delete(remove),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub pricing_version_id: Option<Uuid>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub is_required: Option<bool>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SaasProduct>>> {
    let (skip, limit) = super::paging(params.skip, params.limit);
    let filter = ProductFilter {
        pricing_version_id: params.pricing_version_id,
        category: params.category.filter(|c| !c.is_empty()),
        is_active: params.is_active,
        is_required: params.is_required,
        skip,
        limit,
    };
    Ok(Json(db::list_saas_products(&state.db, &filter).await?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SaasProduct>> {
    Ok(Json(db::get_saas_product(&state.db, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(body): JsonBody<CreateSaasProduct>,
) -> Result<(StatusCode, Json<SaasProduct>)> {
    body.validate()?;
    let duplicate = format!(
        "Product code {} already exists in this pricing version",
        body.product_code
    );

    let mut tx = state.db.begin().await?;
    super::unlocked_version(
        &mut *tx,
        body.pricing_version_id,
        "Cannot add product to locked pricing version",
    )
    .await?;
    if db::product_code_exists(&mut *tx, body.pricing_version_id, &body.product_code).await? {
        return Err(AppError::bad_request(duplicate));
    }

    let product = db::insert_saas_product(&mut *tx, &body.into_row())
        .await
        .map_err(|e| e.on_conflict(duplicate))?;
    audit::log_create(&mut *tx, &actor, SAAS_PRODUCTS, product.id, &product).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<UpdateSaasProduct>,
) -> Result<Json<SaasProduct>> {
    patch.validate()?;

    let mut tx = state.db.begin().await?;
    let before = db::get_saas_product(&mut *tx, id).await?;
    super::unlocked_version(
        &mut *tx,
        before.pricing_version_id,
        "Cannot modify product in locked pricing version",
    )
    .await?;

    let mut row = before.clone();
    patch.apply(&mut row);
    let product = db::update_saas_product(&mut *tx, &row).await?;
    audit::log_update(&mut *tx, &actor, SAAS_PRODUCTS, id, &before, &product).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok(Json(product))
}

pub async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    let product = db::get_saas_product(&mut *tx, id).await?;
    super::unlocked_version(
        &mut *tx,
        product.pricing_version_id,
        "Cannot delete product from locked pricing version",
    )
    .await?;

    db::delete_saas_product(&mut *tx, id).await?;
    audit::log_delete(&mut *tx, &actor, SAAS_PRODUCTS, id, &product).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
