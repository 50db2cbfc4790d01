//! Referral partners. Referrers are global, not owned by a pricing version.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{self, Actor, REFERRERS};
use crate::db;
use crate::error::{AppError, Result};
use crate::form::JsonBody;
use crate::models::requests::{CreateReferrer, UpdateReferrer};
use crate::models::Referrer;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/referrers", get(list).post(create))
        .route(
            "/api/referrers/:id",
            get(show).patch(update).delete(remove),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub is_active: Option<bool>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Referrer>>> {
    Ok(Json(db::list_referrers(&state.db, params.is_active).await?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Referrer>> {
    Ok(Json(db::get_referrer(&state.db, id).await?))
}

fn duplicate(name: &str) -> AppError {
    AppError::bad_request(format!("Referrer {name} already exists"))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(body): JsonBody<CreateReferrer>,
) -> Result<(StatusCode, Json<Referrer>)> {
    body.validate()?;
    let name = body.referrer_name.clone();

    let mut tx = state.db.begin().await?;
    if db::referrer_name_exists(&mut *tx, &name, None).await? {
        return Err(duplicate(&name));
    }
    let referrer = db::insert_referrer(&mut *tx, &body.into_row())
        .await
        .map_err(|e| e.on_conflict(format!("Referrer {name} already exists")))?;
    audit::log_create(&mut *tx, &actor, REFERRERS, referrer.id, &referrer).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(referrer)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<UpdateReferrer>,
) -> Result<Json<Referrer>> {
    patch.validate()?;

    let mut tx = state.db.begin().await?;
    let before = db::get_referrer(&mut *tx, id).await?;
    if let Some(name) = &patch.referrer_name {
        if db::referrer_name_exists(&mut *tx, name, Some(id)).await? {
            return Err(duplicate(name));
        }
    }

    let mut row = before.clone();
    patch.apply(&mut row);
    let referrer = db::update_referrer(&mut *tx, &row).await?;
    audit::log_update(&mut *tx, &actor, REFERRERS, id, &before, &referrer).await?;
    tx.commit().await?;

    Ok(Json(referrer))
}

pub async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    let referrer = db::get_referrer(&mut *tx, id).await?;
    db::delete_referrer(&mut *tx, id).await?;
    audit::log_delete(&mut *tx, &actor, REFERRERS, id, &referrer).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
