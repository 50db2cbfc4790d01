//! Response DTOs for the calculation and configuration endpoints.
//!
//! Money is computed exactly and emitted as a JSON number rounded to cents.

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::pricing::calculators::round_money;

fn money<S: Serializer>(value: &Decimal, s: S) -> Result<S::Ok, S::Error> {
    rust_decimal::serde::float::serialize(&round_money(*value, 2), s)
}

fn money_option<S: Serializer>(value: &Option<Decimal>, s: S) -> Result<S::Ok, S::Error> {
    rust_decimal::serde::float_option::serialize(&value.map(|v| round_money(v, 2)), s)
}

// ==================== Quote calculations ====================

#[derive(Debug, Clone, Serialize)]
pub struct ComplexityFactorResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub complexity_score: Decimal,
    pub tier: String,
    pub tier_name: String,
    #[serde(serialize_with = "money")]
    pub base_price: Decimal,
    pub estimated_hours: i64,
    pub sku_code: Option<String>,
    pub additional_dept_count: i64,
    #[serde(serialize_with = "money")]
    pub additional_dept_price: Decimal,
    #[serde(serialize_with = "money")]
    pub total_org_setup_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountResponse {
    #[serde(serialize_with = "money")]
    pub saas_monthly_before: Decimal,
    #[serde(serialize_with = "money")]
    pub saas_monthly_after: Decimal,
    #[serde(serialize_with = "money")]
    pub saas_year1_discount_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub saas_all_years_discount_pct: Decimal,
    #[serde(serialize_with = "money")]
    pub setup_before: Decimal,
    #[serde(serialize_with = "money")]
    pub setup_after: Decimal,
    #[serde(serialize_with = "money")]
    pub setup_discount_amount: Decimal,
    #[serde(serialize_with = "money")]
    pub total_discount_year1: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TripCostDetail {
    pub days: i32,
    pub nights: i32,
    pub people: i32,
    #[serde(serialize_with = "money")]
    pub airfare_cost: Decimal,
    #[serde(serialize_with = "money")]
    pub hotel_cost: Decimal,
    #[serde(serialize_with = "money")]
    pub per_diem_cost: Decimal,
    #[serde(serialize_with = "money")]
    pub vehicle_cost: Decimal,
    #[serde(serialize_with = "money")]
    pub trip_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TravelCostResponse {
    pub zone_name: Option<String>,
    pub trips: Vec<TripCostDetail>,
    #[serde(serialize_with = "money")]
    pub total_travel_cost: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearProjection {
    pub year: i32,
    #[serde(serialize_with = "money")]
    pub saas_monthly: Decimal,
    #[serde(serialize_with = "money")]
    pub saas_annual: Decimal,
    #[serde(serialize_with = "money")]
    pub setup: Decimal,
    #[serde(serialize_with = "money")]
    pub travel: Decimal,
    #[serde(serialize_with = "money")]
    pub total: Decimal,
    #[serde(serialize_with = "money_option")]
    pub saas_annual_level_loaded: Option<Decimal>,
    #[serde(serialize_with = "money_option")]
    pub saas_monthly_level_loaded: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiYearProjectionResponse {
    pub years: Vec<YearProjection>,
    #[serde(serialize_with = "money")]
    pub total_contract_value: Decimal,
    pub escalation_model: String,
    pub level_loading_enabled: bool,
    pub teller_payments_discount_applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralCommissionResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub referral_rate: Decimal,
    #[serde(serialize_with = "money")]
    pub commission_amount: Decimal,
}

// ==================== SaaS configuration ====================

/// Recurring product line chosen by the configurator
#[derive(Debug, Clone, Serialize)]
pub struct SelectedProduct {
    pub product_id: Option<Uuid>,
    pub product_code: String,
    pub name: String,
    pub category: String,
    #[serde(serialize_with = "money")]
    pub monthly_cost: Decimal,
    pub quantity: i64,
    #[serde(serialize_with = "money")]
    pub total_monthly_cost: Decimal,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_details: Option<serde_json::Value>,
}

/// One-time setup SKU chosen by the configurator
#[derive(Debug, Clone, Serialize)]
pub struct SelectedSetupSku {
    pub sku_id: Uuid,
    pub sku_code: String,
    pub name: String,
    pub quantity: i64,
    #[serde(serialize_with = "money")]
    pub unit_price: Decimal,
    #[serde(serialize_with = "money")]
    pub total_price: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationResponse {
    pub selected_products: Vec<SelectedProduct>,
    pub setup_skus: Vec<SelectedSetupSku>,
    #[serde(serialize_with = "money")]
    pub total_monthly_cost: Decimal,
    #[serde(serialize_with = "money")]
    pub total_setup_cost: Decimal,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationTypeSummary {
    pub type_code: String,
    pub type_name: String,
    pub description: Option<String>,
    #[serde(serialize_with = "money")]
    pub monthly_cost: Decimal,
    pub mature_setup_sku: Option<String>,
    pub custom_setup_sku: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatureIntegrationSummary {
    pub integration_code: String,
    pub system_name: String,
    pub vendor: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableIntegrationsResponse {
    pub integration_types: Vec<IntegrationTypeSummary>,
    pub mature_integrations: Vec<MatureIntegrationSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub module_code: String,
    pub module_name: String,
    pub description: Option<String>,
    pub sub_parameters: serde_json::Value,
    pub selection_rules: serde_json::Value,
    pub saas_product_code: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableModulesResponse {
    pub modules: Vec<ModuleSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_is_rounded_number() {
        let response = ReferralCommissionResponse {
            referral_rate: dec!(7.5),
            commission_amount: dec!(1234.5678),
        };
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["commission_amount"], serde_json::json!(1234.57));
        assert_eq!(json["referral_rate"], serde_json::json!(7.5));
    }

    #[test]
    fn test_level_loaded_fields_are_null_when_absent() {
        let year = YearProjection {
            year: 1,
            saas_monthly: dec!(100),
            saas_annual: dec!(1200),
            setup: dec!(0),
            travel: dec!(0),
            total: dec!(1200),
            saas_annual_level_loaded: None,
            saas_monthly_level_loaded: None,
        };
        let json = serde_json::to_value(year).unwrap();
        assert!(json["saas_annual_level_loaded"].is_null());
        assert_eq!(json["total"], serde_json::json!(1200.0));
    }
}
