//! Reusable quote text (payment terms, assumptions, order form notes) kept
//! per pricing version.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{self, Actor, TEXT_SNIPPETS};
use crate::db::{self, SnippetFilter};
use crate::error::{AppError, Result};
use crate::form::JsonBody;
use crate::models::requests::{CreateTextSnippet, UpdateTextSnippet};
use crate::models::TextSnippet;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/text-snippets", get(list).post(create))
        .route(
            "/api/text-snippets/:id",
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
) -> Result<Json<Vec<TextSnippet>>> {
    let (skip, limit) = super::paging(params.skip, params.limit);
    let filter = SnippetFilter {
        pricing_version_id: params.pricing_version_id,
        category: params.category.filter(|c| !c.is_empty()),
        is_active: params.is_active,
        skip,
        limit,
    };
    Ok(Json(db::list_text_snippets(&state.db, &filter).await?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<TextSnippet>> {
    Ok(Json(db::get_text_snippet(&state.db, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(body): JsonBody<CreateTextSnippet>,
) -> Result<(StatusCode, Json<TextSnippet>)> {
    body.validate()?;
    let duplicate = format!(
        "Snippet key {} already exists in this pricing version",
        body.snippet_key
    );

    let mut tx = state.db.begin().await?;
    super::unlocked_version(
        &mut *tx,
        body.pricing_version_id,
        "Cannot add text snippet to locked pricing version",
    )
    .await?;
    if db::snippet_key_exists(&mut *tx, body.pricing_version_id, &body.snippet_key).await? {
        return Err(AppError::bad_request(duplicate));
    }

    let snippet = db::insert_text_snippet(&mut *tx, &body.into_row())
        .await
        .map_err(|e| e.on_conflict(duplicate))?;
    audit::log_create(&mut *tx, &actor, TEXT_SNIPPETS, snippet.id, &snippet).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(snippet)))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    JsonBody(patch): JsonBody<UpdateTextSnippet>,
) -> Result<Json<TextSnippet>> {
    patch.validate()?;

    let mut tx = state.db.begin().await?;
    let before = db::get_text_snippet(&mut *tx, id).await?;
    super::unlocked_version(
        &mut *tx,
        before.pricing_version_id,
        "Cannot update text snippet in locked pricing version",
    )
    .await?;

    let mut row = before.clone();
    patch.apply(&mut row);
    let snippet = db::update_text_snippet(&mut *tx, &row).await?;
    audit::log_update(&mut *tx, &actor, TEXT_SNIPPETS, id, &before, &snippet).await?;
    tx.commit().await?;

    Ok(Json(snippet))
}

pub async fn remove(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await?;
    let snippet = db::get_text_snippet(&mut *tx, id).await?;
    super::unlocked_version(
        &mut *tx,
        snippet.pricing_version_id,
        "Cannot delete text snippet from locked pricing version",
    )
    .await?;

    db::delete_text_snippet(&mut *tx, id).await?;
    audit::log_delete(&mut *tx, &actor, TEXT_SNIPPETS, id, &snippet).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
