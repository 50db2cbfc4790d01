//! HTTP route handlers, one module per resource.

pub mod audit_logs;
pub mod pricing_versions;
pub mod quote_calculations;
pub mod quotes;
pub mod referrers;
pub mod saas_config;
pub mod saas_products;
pub mod sku_definitions;
pub mod text_snippets;
pub mod travel_zones;

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, Result};
use crate::models::PricingVersion;

pub(crate) fn default_limit() -> i64 {
    100
}

/// Clamp list paging to sane bounds
pub(crate) fn paging(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.clamp(1, 1000))
}

/// Load a pricing version that catalog rows may be written under
pub(crate) async fn unlocked_version<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
    locked_message: &str,
) -> Result<PricingVersion> {
    let version = db::get_pricing_version(db, id).await?;
    ensure_unlocked(&version, locked_message)?;
    Ok(version)
}

/// Refuse catalog writes under a locked version
pub(crate) fn ensure_unlocked(version: &PricingVersion, locked_message: &str) -> Result<()> {
    if version.is_locked {
        return Err(AppError::bad_request(locked_message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn test_paging_bounds() {
        assert_eq!(paging(-5, 0), (0, 1));
        assert_eq!(paging(20, 50), (20, 50));
        assert_eq!(paging(0, 10_000), (0, 1000));
    }

    #[test]
    fn test_locked_version_refuses_writes() {
        let mut version = fixtures::pricing_version("2025.1");
        assert!(ensure_unlocked(&version, "Cannot add travel zone to locked pricing version").is_ok());

        version.is_locked = true;
        let err = ensure_unlocked(&version, "Cannot add travel zone to locked pricing version")
            .unwrap_err();
        assert!(matches!(
            &err,
            AppError::BadRequest(msg) if msg == "Cannot add travel zone to locked pricing version"
        ));
    }
}
