use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{self, Actor, TRAVEL_ZONES};
use crate::db::{self, ZoneFilter};
use crate::error::{AppError, Result};
use crate::form::JsonBody;
use crate::models::requests::{CreateTravelZone, UpdateTravelZone};
use crate::models::TravelZone;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/travel-zones", get(list).post(create))
        .route(
            "/api/travel-zones/:id",
            get(show).patch(update).delete(remove),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub pricing_version_id: Option<Uuid>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TravelZone>>> {
    let (skip, limit) = super::paging(params.skip, params.limit);
    let filter = ZoneFilter {
        pricing_version_id: params.pricing_version_id,
        is_active: params.is_active,
        skip,
        limit,
    };
    Ok(Json(db::list_travel_zones(&state.db, &filter).await?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<TravelZone>> {
    Ok(Json(db::get_travel_zone(&state.db, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(body): JsonBody<CreateTravelZone>,
) -> Result<(StatusCode, Json<TravelZone>)> {
    body.validate()?;
    let duplicate = format!(
        "Zone code {} already exists in this pricing version",
        body.zone_code
    );

    let mut tx = state.db.begin().await?;
    super::unlocked_version(
        &mut *tx,
        body.pricing_version_id,
        "Cannot add travel zone to locked pricing version",
    )
    .await?;
    if db::zone_code_exists(&mut *tx, body.pricing_version_id, &body.zone_code).await? {
        return Err(AppError::bad_request(duplicate));
    }

    let zone = db::insert_travel_zone(&mut *tx, &body.into_row())
        .await
        .map_err(|e| e.on_conflict(duplicate))?;
    audit::log_create(&mut *tx, &actor, TRAVEL_ZONES, zone.id, &zone).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok((StatusCode::CREATED, Json(zone)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<UpdateTravelZone>,
) -> Result<Json<TravelZone>> {
    patch.validate()?;

    let mut tx = state.db.begin().await?;
    let before = db::get_travel_zone(&mut *tx, id).await?;
    super::unlocked_version(
        &mut *tx,
        before.pricing_version_id,
        "Cannot update travel zone in locked pricing version",
    )
    .await?;

    let mut row = before.clone();
    patch.apply(&mut row);
    let zone = db::update_travel_zone(&mut *tx, &row).await?;
    audit::log_update(&mut *tx, &actor, TRAVEL_ZONES, id, &before, &zone).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok(Json(zone))
}

pub async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    let zone = db::get_travel_zone(&mut *tx, id).await?;
    super::unlocked_version(
        &mut *tx,
        zone.pricing_version_id,
        "Cannot delete travel zone from locked pricing version",
    )
    .await?;

    db::delete_travel_zone(&mut *tx, id).await?;
    audit::log_delete(&mut *tx, &actor, TRAVEL_ZONES, id, &zone).await?;
    tx.commit().await?;

    state.cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
