use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::{self, AuditFilter};
use crate::error::Result;
use crate::models::AuditLog;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/audit-logs", get(list))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
}

/// Audit entries, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<AuditLog>>> {
    let (skip, limit) = super::paging(params.skip, params.limit);
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let filter = AuditFilter {
        table_name: non_empty(params.table_name),
        record_id: non_empty(params.record_id),
        user_id: non_empty(params.user_id),
        skip,
        limit,
    };
    Ok(Json(db::list_audit_logs(&state.db, &filter).await?))
}
