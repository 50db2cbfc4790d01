//! Row builders shared by unit tests.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use uuid::Uuid;

use super::catalog::*;
use super::quote::QuoteVersion;

fn ts() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub fn version_id() -> Uuid {
    Uuid::from_u128(0x2025_0001)
}

pub fn pricing_version(number: &str) -> PricingVersion {
    PricingVersion {
        id: Uuid::new_v4(),
        version_number: number.to_string(),
        description: None,
        effective_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        expiration_date: None,
        created_by: "system".into(),
        created_at: ts(),
        updated_at: ts(),
        is_current: false,
        is_locked: false,
    }
}

/// Two priced tiers: 0-1000 at 100.00, 1001-5000 at 80.00
pub fn product(code: &str) -> SaasProduct {
    SaasProduct {
        id: Uuid::new_v4(),
        pricing_version_id: version_id(),
        product_code: code.to_string(),
        name: code.to_string(),
        description: None,
        category: "Core".into(),
        pricing_model: "Tiered".into(),
        tier1_min: 0,
        tier1_max: 1000,
        tier1_price: dec!(100.00),
        tier2_min: Some(1001),
        tier2_max: Some(5000),
        tier2_price: Some(dec!(80.00)),
        tier3_min: None,
        tier3_max: None,
        tier3_price: None,
        is_active: true,
        is_required: false,
        sort_order: 0,
        product_type: "module".into(),
        required_parameters: None,
        selection_rules: None,
        pricing_formula: None,
        related_setup_skus: None,
        created_at: ts(),
        updated_at: ts(),
    }
}

/// Product with a configuration-driven formula
pub fn configured_product(
    code: &str,
    name: &str,
    product_type: &str,
    price: Decimal,
    formula: Option<Value>,
) -> SaasProduct {
    let mut p = product(code);
    p.name = name.to_string();
    p.product_type = product_type.to_string();
    p.tier1_max = 999_999;
    p.tier1_price = price;
    p.tier2_min = None;
    p.tier2_max = None;
    p.tier2_price = None;
    p.pricing_formula = formula;
    p
}

pub fn sku(code: &str, price: Option<Decimal>) -> SkuDefinition {
    SkuDefinition {
        id: Uuid::new_v4(),
        pricing_version_id: version_id(),
        sku_code: code.to_string(),
        name: code.to_string(),
        description: None,
        category: "Setup".into(),
        fixed_price: price,
        requires_quantity: true,
        requires_travel_zone: false,
        requires_configuration: false,
        is_active: true,
        sort_order: 0,
        earmarked_status: false,
        estimated_hours: None,
        acceptance_criteria: None,
        created_at: ts(),
        updated_at: ts(),
    }
}

/// Airfare 750, hotel 180, meals 60, rental car 125
pub fn zone(code: &str) -> TravelZone {
    TravelZone {
        id: Uuid::new_v4(),
        pricing_version_id: version_id(),
        zone_code: code.to_string(),
        name: format!("Zone {}", code),
        description: None,
        mileage_rate: dec!(0.67),
        daily_rate: dec!(150),
        airfare_rate: Some(dec!(750)),
        hotel_rate: Some(dec!(180)),
        meals_rate: Some(dec!(60)),
        rental_car_rate: Some(dec!(125)),
        parking_rate: None,
        is_active: true,
        sort_order: 0,
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn snippet(key: &str, content: &str) -> TextSnippet {
    TextSnippet {
        id: Uuid::new_v4(),
        pricing_version_id: version_id(),
        snippet_key: key.to_string(),
        snippet_label: key.replace('_', " "),
        content: content.to_string(),
        category: "OrderForm".into(),
        sort_order: 0,
        is_active: true,
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn integration_type(
    code: &str,
    name: &str,
    monthly: Decimal,
    mature: &str,
    custom: &str,
) -> IntegrationType {
    IntegrationType {
        id: Uuid::new_v4(),
        pricing_version_id: version_id(),
        type_code: code.to_string(),
        type_name: name.to_string(),
        description: None,
        monthly_cost: monthly,
        mature_setup_sku: Some(mature.to_string()),
        custom_setup_sku: Some(custom.to_string()),
        required_parameters: None,
        is_active: true,
        sort_order: 0,
    }
}

pub fn mature_integration(code: &str, system: &str) -> MatureIntegration {
    MatureIntegration {
        id: Uuid::new_v4(),
        integration_code: code.to_string(),
        system_name: system.to_string(),
        vendor: None,
        comments: None,
        is_active: true,
        created_at: ts(),
    }
}

pub fn module(
    code: &str,
    name: &str,
    product_id: Option<Uuid>,
    rules: Option<Value>,
) -> ApplicationModule {
    ApplicationModule {
        id: Uuid::new_v4(),
        pricing_version_id: version_id(),
        module_code: code.to_string(),
        module_name: name.to_string(),
        description: None,
        saas_product_id: product_id,
        sub_parameters: None,
        selection_rules: rules,
        is_active: true,
        sort_order: 0,
    }
}

pub fn rule(code: &str, configuration: Value) -> PricingRule {
    PricingRule {
        id: Uuid::new_v4(),
        pricing_version_id: version_id(),
        rule_code: code.to_string(),
        rule_name: code.to_string(),
        description: None,
        rule_type: "complexity".into(),
        configuration,
        is_active: true,
        sort_order: 0,
    }
}

pub fn quote_version() -> QuoteVersion {
    QuoteVersion {
        id: Uuid::new_v4(),
        quote_id: Uuid::new_v4(),
        version_number: 1,
        version_description: Some("Initial version".into()),
        pricing_version_id: version_id(),
        client_data: serde_json::json!({"ClientName": "Riverside County"}),
        projection_years: 5,
        escalation_model: "STANDARD_4PCT".into(),
        multi_year_freeze_years: None,
        level_loading_enabled: false,
        teller_payments_enabled: false,
        discount_config: None,
        referrer_id: None,
        referral_rate_override: None,
        milestone_style: "FIXED_MONTHLY".into(),
        initial_payment_percentage: dec!(25.00),
        project_duration_months: 10,
        travel_zone_id: None,
        travel_config: None,
        total_saas_monthly: None,
        total_saas_annual_year1: None,
        total_setup_packages: None,
        total_travel: None,
        total_contracted_amount: None,
        created_by: "system".into(),
        created_at: ts(),
        version_status: "DRAFT".into(),
    }
}
