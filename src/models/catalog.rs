//! Catalog rows owned by a pricing version, plus the global referrer and
//! mature-integration lists.
//!
//! JSON field names are PascalCase to match the console's form fields.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Named, dated snapshot of catalog pricing
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PricingVersion {
    pub id: Uuid,
    pub version_number: String,
    pub description: Option<String>,
    pub effective_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_current: bool,
    pub is_locked: bool,
}

/// Recurring-billing product priced in up to three usage tiers
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaasProduct {
    pub id: Uuid,
    pub pricing_version_id: Uuid,
    pub product_code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub pricing_model: String,
    pub tier1_min: i32,
    pub tier1_max: i32,
    pub tier1_price: Decimal,
    pub tier2_min: Option<i32>,
    pub tier2_max: Option<i32>,
    pub tier2_price: Option<Decimal>,
    pub tier3_min: Option<i32>,
    pub tier3_max: Option<i32>,
    pub tier3_price: Option<Decimal>,
    pub is_active: bool,
    pub is_required: bool,
    pub sort_order: i32,
    pub product_type: String,
    pub required_parameters: Option<serde_json::Value>,
    pub selection_rules: Option<serde_json::Value>,
    pub pricing_formula: Option<serde_json::Value>,
    #[serde(rename = "RelatedSetupSKUs")]
    pub related_setup_skus: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SaasProduct {
    /// Tier bands as (min, max, price), skipping bands without a price
    pub fn tiers(&self) -> Vec<(Option<i32>, Option<i32>, Decimal)> {
        let mut tiers = vec![(Some(self.tier1_min), Some(self.tier1_max), self.tier1_price)];
        if let Some(price) = self.tier2_price {
            tiers.push((self.tier2_min, self.tier2_max, price));
        }
        if let Some(price) = self.tier3_price {
            tiers.push((self.tier3_min, self.tier3_max, price));
        }
        tiers
    }
}

/// One-time setup / service SKU
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkuDefinition {
    pub id: Uuid,
    pub pricing_version_id: Uuid,
    #[serde(rename = "SKUCode")]
    pub sku_code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub fixed_price: Option<Decimal>,
    pub requires_quantity: bool,
    pub requires_travel_zone: bool,
    pub requires_configuration: bool,
    pub is_active: bool,
    pub sort_order: i32,
    pub earmarked_status: bool,
    pub estimated_hours: Option<i32>,
    pub acceptance_criteria: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Travel cost rates for a region
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TravelZone {
    pub id: Uuid,
    pub pricing_version_id: Uuid,
    pub zone_code: String,
    pub name: String,
    pub description: Option<String>,
    pub mileage_rate: Decimal,
    pub daily_rate: Decimal,
    pub airfare_rate: Option<Decimal>,
    pub hotel_rate: Option<Decimal>,
    pub meals_rate: Option<Decimal>,
    pub rental_car_rate: Option<Decimal>,
    pub parking_rate: Option<Decimal>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reusable order-form or proposal text, keyed per version
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextSnippet {
    pub id: Uuid,
    pub pricing_version_id: Uuid,
    pub snippet_key: String,
    pub snippet_label: String,
    pub content: String,
    pub category: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Referral partner with a default commission rate (percent)
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Referrer {
    pub id: Uuid,
    pub referrer_name: String,
    pub standard_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Third-party system Teller already has an interface for
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatureIntegration {
    pub id: Uuid,
    pub integration_code: String,
    pub system_name: String,
    pub vendor: Option<String>,
    pub comments: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IntegrationType {
    pub id: Uuid,
    pub pricing_version_id: Uuid,
    pub type_code: String,
    pub type_name: String,
    pub description: Option<String>,
    pub monthly_cost: Decimal,
    #[serde(rename = "MatureSetupSKU")]
    pub mature_setup_sku: Option<String>,
    #[serde(rename = "CustomSetupSKU")]
    pub custom_setup_sku: Option<String>,
    pub required_parameters: Option<serde_json::Value>,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationModule {
    pub id: Uuid,
    pub pricing_version_id: Uuid,
    pub module_code: String,
    pub module_name: String,
    pub description: Option<String>,
    #[serde(rename = "SaaSProductId")]
    pub saas_product_id: Option<Uuid>,
    pub sub_parameters: Option<serde_json::Value>,
    pub selection_rules: Option<serde_json::Value>,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Data-driven rule (e.g. COMPLEXITY_FACTOR) stored as a JSON document
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PricingRule {
    pub id: Uuid,
    pub pricing_version_id: Uuid,
    pub rule_code: String,
    pub rule_name: String,
    pub description: Option<String>,
    pub rule_type: String,
    pub configuration: serde_json::Value,
    pub is_active: bool,
    pub sort_order: i32,
}

#[cfg(test)]
mod tests {
    use crate::models::fixtures::product;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tiers_skip_unpriced_bands() {
        let p = product("TEST-001");
        let tiers = p.tiers();
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[1], (Some(1001), Some(5000), dec!(80.00)));
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(product("TEST-001")).unwrap();
        assert_eq!(json["ProductCode"], "TEST-001");
        assert_eq!(json["Tier1Price"], "100.00");
        assert!(json.get("RelatedSetupSKUs").is_some());
        assert!(json.get("PricingVersionId").is_some());
    }
}
