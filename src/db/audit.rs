use sqlx::PgExecutor;

use crate::error::Result;
use crate::models::AuditLog;

#[derive(Debug, Default)]
pub struct AuditFilter {
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub user_id: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

pub async fn insert_audit_log<'e>(db: impl PgExecutor<'e>, log: &AuditLog) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (
            id, timestamp, user_id, action, table_name, record_id,
            old_values, new_values, changes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(log.id)
    .bind(log.timestamp)
    .bind(&log.user_id)
    .bind(&log.action)
    .bind(&log.table_name)
    .bind(&log.record_id)
    .bind(&log.old_values)
    .bind(&log.new_values)
    .bind(&log.changes)
    .execute(db)
    .await?;
    Ok(())
}

/// Audit entries, newest first
pub async fn list_audit_logs<'e>(
    db: impl PgExecutor<'e>,
    filter: &AuditFilter,
) -> Result<Vec<AuditLog>> {
    let logs = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT *
        FROM audit_logs
        WHERE ($1::text IS NULL OR table_name = $1)
          AND ($2::text IS NULL OR record_id = $2)
          AND ($3::text IS NULL OR user_id = $3)
        ORDER BY timestamp DESC
        OFFSET $4
        LIMIT $5
        "#,
    )
    .bind(&filter.table_name)
    .bind(&filter.record_id)
    .bind(&filter.user_id)
    .bind(filter.skip)
    .bind(filter.limit)
    .fetch_all(db)
    .await?;
    Ok(logs)
}
