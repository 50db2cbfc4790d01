//! Audit trail for catalog and quote mutations.
//!
//! Handlers write an entry in the same transaction as the change, so a
//! rolled-back mutation leaves no audit row behind.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgExecutor;
use std::convert::Infallible;
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, Result};
use crate::models::AuditLog;

pub const PRICING_VERSIONS: &str = "PricingVersions";
pub const SAAS_PRODUCTS: &str = "SaaSProducts";
pub const SKU_DEFINITIONS: &str = "SKUDefinitions";
pub const TRAVEL_ZONES: &str = "TravelZones";
pub const TEXT_SNIPPETS: &str = "TextSnippets";
pub const REFERRERS: &str = "Referrers";
pub const QUOTES: &str = "Quotes";
pub const QUOTE_VERSIONS: &str = "QuoteVersions";

const USER_HEADER: &str = "x-user-id";
const DEFAULT_USER: &str = "system";

/// Acting user, from the `X-User-Id` header
#[derive(Debug, Clone, PartialEq)]
pub struct Actor(pub String);

impl Actor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_USER);
        Ok(Actor(user.to_string()))
    }
}

fn to_json<T: Serialize>(row: &T) -> Result<Value> {
    serde_json::to_value(row).map_err(|e| AppError::Internal(format!("audit serialization: {}", e)))
}

/// Top-level keys whose values differ, in the new row's key order.
/// `UpdatedAt` is ignored since every save touches it.
pub fn changed_fields(old: &Value, new: &Value) -> Vec<String> {
    let Some(new) = new.as_object() else {
        return Vec::new();
    };
    new.iter()
        .filter(|(key, _)| key.as_str() != "UpdatedAt")
        .filter(|(key, value)| old.get(key.as_str()) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect()
}

pub fn update_summary(old: &Value, new: &Value) -> String {
    let fields = changed_fields(old, new);
    if fields.is_empty() {
        "No fields changed".to_string()
    } else {
        format!("Updated {}", fields.join(", "))
    }
}

fn entry(
    actor: &Actor,
    action: &str,
    table: &str,
    record_id: Uuid,
    old_values: Option<Value>,
    new_values: Option<Value>,
    changes: String,
) -> AuditLog {
    AuditLog {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        user_id: actor.0.clone(),
        action: action.to_string(),
        table_name: table.to_string(),
        record_id: record_id.to_string(),
        old_values,
        new_values,
        changes: Some(changes),
    }
}

pub async fn log_create<'e, T: Serialize>(
    db: impl PgExecutor<'e>,
    actor: &Actor,
    table: &str,
    record_id: Uuid,
    new: &T,
) -> Result<()> {
    let log = entry(
        actor,
        "CREATE",
        table,
        record_id,
        None,
        Some(to_json(new)?),
        format!("Created {} record", table),
    );
    db::insert_audit_log(db, &log).await
}

pub async fn log_update<'e, T: Serialize>(
    db: impl PgExecutor<'e>,
    actor: &Actor,
    table: &str,
    record_id: Uuid,
    old: &T,
    new: &T,
) -> Result<()> {
    let (old, new) = (to_json(old)?, to_json(new)?);
    let summary = update_summary(&old, &new);
    let log = entry(actor, "UPDATE", table, record_id, Some(old), Some(new), summary);
    db::insert_audit_log(db, &log).await
}

pub async fn log_delete<'e, T: Serialize>(
    db: impl PgExecutor<'e>,
    actor: &Actor,
    table: &str,
    record_id: Uuid,
    old: &T,
) -> Result<()> {
    let log = entry(
        actor,
        "DELETE",
        table,
        record_id,
        Some(to_json(old)?),
        None,
        format!("Deleted {} record", table),
    );
    db::insert_audit_log(db, &log).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    async fn actor_for(request: Request<()>) -> Actor {
        let (mut parts, _) = request.into_parts();
        Actor::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_actor_from_header() {
        let request = Request::builder()
            .header("X-User-Id", "jdoe@example.com")
            .body(())
            .unwrap();
        assert_eq!(actor_for(request).await.as_str(), "jdoe@example.com");
    }

    #[tokio::test]
    async fn test_actor_defaults_to_system() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(actor_for(request).await.as_str(), "system");

        let blank = Request::builder().header("X-User-Id", "  ").body(()).unwrap();
        assert_eq!(actor_for(blank).await.as_str(), "system");
    }

    #[test]
    fn test_update_summary_lists_changed_fields() {
        let old = json!({"Name": "Zone A", "HotelRate": "180.00", "UpdatedAt": "t1"});
        let new = json!({"Name": "Zone A", "HotelRate": "195.00", "UpdatedAt": "t2"});
        assert_eq!(update_summary(&old, &new), "Updated HotelRate");

        assert_eq!(update_summary(&old, &old), "No fields changed");
    }

    #[test]
    fn test_entry_shape() {
        let log = entry(
            &Actor("system".into()),
            "DELETE",
            TRAVEL_ZONES,
            Uuid::nil(),
            Some(json!({"ZoneCode": "A"})),
            None,
            format!("Deleted {} record", TRAVEL_ZONES),
        );
        assert_eq!(log.record_id, Uuid::nil().to_string());
        assert_eq!(log.changes.as_deref(), Some("Deleted TravelZones record"));
        assert!(log.new_values.is_none());
    }
}
