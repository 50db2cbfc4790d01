//! Default catalog loaded on startup when `SEED_ON_STARTUP` is set.
//!
//! Seeding is idempotent: global rows are skipped when they already exist
//! and the version catalog is only written when its version number is new.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::Result;
use crate::models::{
    ApplicationModule, IntegrationType, MatureIntegration, PricingRule, PricingVersion, Referrer,
    SaasProduct, SkuDefinition, TextSnippet, TravelZone,
};
use crate::pricing::services::COMPLEXITY_RULE;
use crate::versioning::{self, VersionCatalog};

pub const SEED_VERSION: &str = "2025.1";

fn money(units: i64) -> Decimal {
    Decimal::new(units * 100, 2)
}

fn product(version_id: Uuid, code: &str, name: &str, category: &str, price: i64) -> SaasProduct {
    let now = Utc::now();
    SaasProduct {
        id: Uuid::new_v4(),
        pricing_version_id: version_id,
        product_code: code.to_string(),
        name: name.to_string(),
        description: None,
        category: category.to_string(),
        pricing_model: "Fixed".to_string(),
        tier1_min: 0,
        tier1_max: 999_999,
        tier1_price: money(price),
        tier2_min: None,
        tier2_max: None,
        tier2_price: None,
        tier3_min: None,
        tier3_max: None,
        tier3_price: None,
        is_active: true,
        is_required: false,
        sort_order: 0,
        product_type: "module".to_string(),
        required_parameters: None,
        selection_rules: None,
        pricing_formula: None,
        related_setup_skus: None,
        created_at: now,
        updated_at: now,
    }
}

/// Three-band module product priced by a volume parameter
fn tiered(
    version_id: Uuid,
    code: &str,
    name: &str,
    volume_parameter: &str,
    bands: [(i32, Option<i32>, i64); 3],
) -> SaasProduct {
    let mut p = product(version_id, code, name, "Module", bands[0].2);
    p.pricing_model = "Tiered".to_string();
    p.tier1_min = bands[0].0;
    p.tier1_max = bands[0].1.unwrap_or(999_999);
    p.tier2_min = Some(bands[1].0);
    p.tier2_max = bands[1].1;
    p.tier2_price = Some(money(bands[1].2));
    p.tier3_min = Some(bands[2].0);
    p.tier3_max = bands[2].1;
    p.tier3_price = Some(money(bands[2].2));
    p.pricing_formula = Some(json!({
        "type": "tiered",
        "volumeParameter": volume_parameter,
        "basePrice": bands[0].2,
        "tiers": bands
            .iter()
            .map(|(min, max, price)| json!({"minVolume": min, "maxVolume": max, "price": price}))
            .collect::<Vec<_>>(),
    }));
    p
}

fn base_product(version_id: Uuid, code: &str, name: &str, option: &str, price: i64) -> SaasProduct {
    let mut p = product(version_id, code, name, "Base", price);
    p.product_type = "base".to_string();
    p.pricing_formula = Some(json!({"type": "fixed", "price": price}));
    p.selection_rules = Some(json!({
        "operator": "AND",
        "conditions": [{"type": "parameter_equals", "parameter": "base_product", "value": option}]
    }));
    p.required_parameters = Some(json!([{
        "name": "base_product",
        "type": "string",
        "label": "Base Product",
        "options": ["standard", "basic"],
        "default": "standard"
    }]));
    p.related_setup_skus = Some(json!([{
        "condition": {"type": "always"},
        "skuCode": "ORG-SETUP-BASIC",
        "quantity": 1,
        "reason": format!("Organization setup required for {}", name)
    }]));
    p
}

fn products(version_id: Uuid) -> Vec<SaasProduct> {
    let mut users = product(version_id, "ADDITIONAL-USERS", "Additional Users", "Add-on", 60);
    users.product_type = "addon".to_string();
    users.pricing_model = "Quantity-based".to_string();
    users.sort_order = 10;
    users.pricing_formula = Some(json!({
        "type": "quantity_based",
        "pricePerUnit": 60,
        "quantityParameter": "additional_users"
    }));
    users.selection_rules = Some(json!({
        "conditions": [{"type": "parameter_greater_than", "parameter": "additional_users", "value": 0}]
    }));

    let mut list = vec![
        base_product(version_id, "TELLER-STANDARD", "Teller Standard", "standard", 2950),
        base_product(version_id, "TELLER-BASIC", "Teller Basic", "basic", 1950),
        users,
        tiered(
            version_id,
            "CHECK-SCANNING",
            "Check Recognition / Bulk Scanning",
            "modules.check_recognition.monthly_scans",
            [(0, Some(15_000), 170), (15_001, Some(60_000), 680), (60_001, None, 1030)],
        ),
        tiered(
            version_id,
            "REVENUE-SUBMISSION",
            "Revenue Submission",
            "modules.revenue_submission.number_of_templates",
            [(0, Some(9), 450), (10, Some(60), 700), (61, None, 900)],
        ),
        tiered(
            version_id,
            "TELLER-ONLINE",
            "Online Customer Portal",
            "modules.teller_online.annual_transactions",
            [(0, Some(50_000), 700), (50_001, Some(150_000), 2145), (150_001, None, 3575)],
        ),
        product(version_id, "INTERFACE-BIDIRECTIONAL", "Bi-Directional Interface", "Interface", 285),
        product(version_id, "INTERFACE-PAYMENT-IMPORT", "Payment Import Interface", "Interface", 170),
    ];
    for (i, p) in list.iter_mut().enumerate() {
        if p.sort_order == 0 {
            p.sort_order = i as i32;
        }
    }
    list
}

fn skus(version_id: Uuid) -> Vec<SkuDefinition> {
    let now = Utc::now();
    let rows: [(&str, &str, &str, i64, Option<i32>); 12] = [
        ("ORG-SETUP-BASIC", "Teller Setup - Basic", "Organization", 64_400, Some(280)),
        ("ORG-SETUP-MEDIUM", "Teller Setup - Medium", "Organization", 98_440, Some(428)),
        ("ORG-SETUP-LARGE", "Teller Setup - Large", "Organization", 176_640, Some(768)),
        ("ORG-SETUP-ADDITIONAL-DEPT", "Additional Department", "Organization", 4_140, Some(18)),
        ("CHECK-ICL-SETUP", "Check Recognition / ICL Setup", "Module", 3_680, None),
        ("REV-SUB-BASE", "Revenue Submission Setup", "Module", 5_520, None),
        ("REV-SUB-TEMPLATE-BLOCK", "Revenue Submission Template Block", "Module", 2_760, None),
        ("TELLER-ONLINE-SETUP", "Teller Online Setup", "Module", 9_200, None),
        ("INTEGRATION-MATURE", "Integration - Existing Interface", "Integration", 7_360, None),
        ("INTEGRATION-CUSTOM", "Integration - Custom Development", "Integration", 28_520, None),
        ("TRAINING-SUITE", "Training Suite", "Training", 12_880, None),
        ("PM-STANDARD", "Project Management - Standard", "Project Management", 2_300, None),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (code, name, category, price, hours))| SkuDefinition {
            id: Uuid::new_v4(),
            pricing_version_id: version_id,
            sku_code: code.to_string(),
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            fixed_price: Some(money(*price)),
            requires_quantity: true,
            requires_travel_zone: false,
            requires_configuration: false,
            is_active: true,
            sort_order: i as i32,
            earmarked_status: false,
            estimated_hours: *hours,
            acceptance_criteria: None,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

fn zones(version_id: Uuid) -> Vec<TravelZone> {
    let now = Utc::now();
    let rows = [
        ("ZONE-0", "Denver Metro Colorado", 0),
        ("ZONE-1", "Western US", 750),
        ("ZONE-2", "Mid-Western US", 850),
        ("ZONE-3", "Eastern US", 950),
        ("ZONE-4", "Outside Continental US", 1050),
        ("ZONE-5", "Canada", 950),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (code, name, airfare))| TravelZone {
            id: Uuid::new_v4(),
            pricing_version_id: version_id,
            zone_code: code.to_string(),
            name: name.to_string(),
            description: None,
            mileage_rate: Decimal::ZERO,
            daily_rate: money(60),
            airfare_rate: Some(money(*airfare)),
            hotel_rate: Some(money(180)),
            meals_rate: Some(money(60)),
            rental_car_rate: Some(money(125)),
            parking_rate: None,
            is_active: true,
            sort_order: i as i32,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

fn snippets(version_id: Uuid) -> Vec<TextSnippet> {
    let now = Utc::now();
    let rows = [
        (
            "PAYMENT_TERMS",
            "Payment Terms",
            "Setup fees are invoiced at contract signature. SaaS fees are invoiced annually in advance.",
            "OrderForm",
        ),
        (
            "TRAVEL_TERMS",
            "Travel Terms",
            "Travel is billed at actual cost up to the quoted estimate.",
            "OrderForm",
        ),
        (
            "QUOTE_VALIDITY",
            "Quote Validity",
            "This quote is valid for 30 days from the date issued.",
            "Assumptions",
        ),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (key, label, content, category))| TextSnippet {
            id: Uuid::new_v4(),
            pricing_version_id: version_id,
            snippet_key: key.to_string(),
            snippet_label: label.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            sort_order: i as i32,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

fn integration_types(version_id: Uuid) -> Vec<IntegrationType> {
    let parameters = json!([
        {"name": "system_name", "type": "string", "label": "System Name", "required": true},
        {"name": "vendor", "type": "string", "label": "Vendor", "required": true},
        {"name": "is_new", "type": "boolean", "label": "Is this a new integration?", "default": true}
    ]);
    [
        ("BIDIRECTIONAL", "Bi-Directional Interface", "Real-time bi-directional data sync between systems", 285),
        ("PAYMENT_IMPORT", "Payment Import Interface", "One-way payment import from external system", 170),
    ]
    .iter()
    .enumerate()
    .map(|(i, (code, name, description, monthly))| IntegrationType {
        id: Uuid::new_v4(),
        pricing_version_id: version_id,
        type_code: code.to_string(),
        type_name: name.to_string(),
        description: Some(description.to_string()),
        monthly_cost: money(*monthly),
        mature_setup_sku: Some("INTEGRATION-MATURE".to_string()),
        custom_setup_sku: Some("INTEGRATION-CUSTOM".to_string()),
        required_parameters: Some(parameters.clone()),
        is_active: true,
        sort_order: i as i32 + 1,
    })
    .collect()
}

fn always(sku: &str) -> Value {
    json!({"condition": {"type": "always"}, "skuCode": sku, "quantity": 1})
}

fn modules(version_id: Uuid, products: &[SaasProduct]) -> Vec<ApplicationModule> {
    let product_id = |code: &str| {
        products
            .iter()
            .find(|p| p.product_code == code)
            .map(|p| p.id)
    };
    let rows = [
        (
            "CHECK_RECOGNITION",
            "Check Recognition & Bulk Scanning",
            "Check scanning with MICR recognition and bulk processing",
            product_id("CHECK-SCANNING"),
            json!({
                "monthly_scans": {"type": "number", "label": "Estimated monthly scans", "required": true, "min": 0},
                "icl_enabled": {"type": "boolean", "label": "Image Cash Letter (ICL) submission required?", "default": false}
            }),
            json!({"setupSKUs": [always("CHECK-ICL-SETUP")]}),
        ),
        (
            "REVENUE_SUBMISSION",
            "Revenue Submission",
            "Web-based portal for department revenue submission",
            product_id("REVENUE-SUBMISSION"),
            json!({
                "number_of_templates": {"type": "number", "label": "Number of submission templates", "required": true, "min": 1, "default": 10}
            }),
            json!({"setupSKUs": [
                always("REV-SUB-BASE"),
                {
                    "condition": {"type": "parameter_greater_than", "parameter": "modules.revenue_submission.number_of_templates", "value": 10},
                    "skuCode": "REV-SUB-TEMPLATE-BLOCK",
                    "quantity": 1,
                    "reason": "Templates beyond the first 10"
                }
            ]}),
        ),
        (
            "TELLER_ONLINE",
            "Teller Online",
            "Customer-facing web portal for online payments",
            product_id("TELLER-ONLINE"),
            json!({
                "annual_transactions": {"type": "number", "label": "Estimated annual transactions", "min": 0, "default": 0}
            }),
            json!({"setupSKUs": [always("TELLER-ONLINE-SETUP")]}),
        ),
        (
            "TRAINING",
            "Training",
            "Train-the-trainer and end-user training sessions",
            None,
            json!({}),
            json!({"setupSKUs": [always("TRAINING-SUITE")]}),
        ),
    ];

    rows.into_iter()
        .enumerate()
        .map(
            |(i, (code, name, description, saas_product_id, sub_parameters, selection_rules))| {
                ApplicationModule {
                    id: Uuid::new_v4(),
                    pricing_version_id: version_id,
                    module_code: code.to_string(),
                    module_name: name.to_string(),
                    description: Some(description.to_string()),
                    saas_product_id,
                    sub_parameters: Some(sub_parameters),
                    selection_rules: Some(selection_rules),
                    is_active: true,
                    sort_order: i as i32 + 1,
                }
            },
        )
        .collect()
}

/// Complexity = departments + revenue_templates / 4 + payment_imports
fn complexity_rule(version_id: Uuid) -> PricingRule {
    PricingRule {
        id: Uuid::new_v4(),
        pricing_version_id: version_id,
        rule_code: COMPLEXITY_RULE.to_string(),
        rule_name: "Organization Setup Complexity Factor".to_string(),
        description: Some("Selects the Organization Setup tier".to_string()),
        rule_type: "TIER_FORMULA".to_string(),
        configuration: json!({
            "formula": {
                "type": "weighted_sum",
                "components": [
                    {"parameter": "departments", "weight": 1.0, "label": "Departments"},
                    {"parameter": "revenue_templates", "weight": 0.25, "label": "Revenue Templates"},
                    {"parameter": "payment_imports", "weight": 1.0, "label": "Payment Imports"}
                ]
            },
            "tiers": [
                {"code": "BASIC", "name": "Basic", "min_score": 0, "max_score": 10,
                 "sku_code": "ORG-SETUP-BASIC", "base_price": 64400.00, "estimated_hours": 280},
                {"code": "MEDIUM", "name": "Medium", "min_score": 11, "max_score": 20,
                 "sku_code": "ORG-SETUP-MEDIUM", "base_price": 98440.00, "estimated_hours": 428},
                {"code": "LARGE", "name": "Large", "min_score": 21, "max_score": null,
                 "sku_code": "ORG-SETUP-LARGE", "base_price": 176640.00, "estimated_hours": 768}
            ],
            "additional_items": {
                "source_parameter": "departments",
                "first_included": 1,
                "sku_code": "ORG-SETUP-ADDITIONAL-DEPT",
                "price_per_item": 4140.00,
                "hours_per_item": 18
            }
        }),
        is_active: true,
        sort_order: 0,
    }
}

/// Every catalog row of the seeded pricing version
pub fn default_catalog(version_id: Uuid) -> VersionCatalog {
    let products = products(version_id);
    let modules = modules(version_id, &products);
    VersionCatalog {
        skus: skus(version_id),
        zones: zones(version_id),
        integration_types: integration_types(version_id),
        rules: vec![complexity_rule(version_id)],
        snippets: snippets(version_id),
        modules,
        products,
    }
}

pub fn mature_integrations() -> Vec<MatureIntegration> {
    let now = Utc::now();
    [
        ("TYLER-MUNIS", "Tyler Munis", "Tyler Technologies", "ERP and financial management system"),
        ("TYLER-INCODE", "Tyler Incode", "Tyler Technologies", "Financial and HR system"),
        ("SPRINGBROOK", "Springbrook", "Springbrook Software", "Municipal financial management"),
        ("LOGOS", "Logos", "Logos Technologies", "Financial management system"),
        ("EDEN", "Eden", "Eden Software", "Financial management system"),
        ("CSDC-INCODE", "CSDC Incode", "CSDC Systems", "Financial management system"),
    ]
    .iter()
    .map(|(code, system, vendor, comments)| MatureIntegration {
        id: Uuid::new_v4(),
        integration_code: code.to_string(),
        system_name: system.to_string(),
        vendor: Some(vendor.to_string()),
        comments: Some(comments.to_string()),
        is_active: true,
        created_at: now,
    })
    .collect()
}

pub fn referrers() -> Vec<Referrer> {
    let now = Utc::now();
    [("Standard Partner", 10), ("Preferred Partner", 15)]
        .iter()
        .map(|(name, rate)| Referrer {
            id: Uuid::new_v4(),
            referrer_name: name.to_string(),
            standard_rate: money(*rate),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// Seed global lists and the default pricing version in one transaction
pub async fn seed(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;

    for integration in mature_integrations() {
        db::insert_mature_integration(&mut *tx, &integration).await?;
    }
    for referrer in referrers() {
        if !db::referrer_name_exists(&mut *tx, &referrer.referrer_name, None).await? {
            db::insert_referrer(&mut *tx, &referrer).await?;
        }
    }

    if db::version_number_exists(&mut *tx, SEED_VERSION).await? {
        tx.commit().await?;
        tracing::info!("Pricing version {} already seeded", SEED_VERSION);
        return Ok(());
    }

    let now = Utc::now();
    db::unset_current_versions(&mut *tx, None).await?;
    let version = db::insert_pricing_version(
        &mut *tx,
        &PricingVersion {
            id: Uuid::new_v4(),
            version_number: SEED_VERSION.to_string(),
            description: Some("Default catalog".to_string()),
            effective_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_else(|| now.date_naive()),
            expiration_date: None,
            created_by: "system".to_string(),
            created_at: now,
            updated_at: now,
            is_current: true,
            is_locked: false,
        },
    )
    .await?;

    let catalog = default_catalog(version.id);
    versioning::insert_catalog(&mut tx, &catalog).await?;
    tx.commit().await?;

    tracing::info!(
        "Seeded pricing version {}: {} products, {} SKUs, {} zones, {} modules",
        SEED_VERSION,
        catalog.products.len(),
        catalog.skus.len(),
        catalog.zones.len(),
        catalog.modules.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::configure::{configure, ConfigSnapshot};
    use crate::pricing::requests::ConfigureRequest;
    use crate::pricing::{calculators, round_money};
    use rust_decimal_macros::dec;

    fn snapshot() -> ConfigSnapshot {
        let version_id = Uuid::new_v4();
        let catalog = default_catalog(version_id);
        ConfigSnapshot {
            pricing_version_id: version_id,
            products: catalog.products,
            skus: catalog.skus,
            integration_types: catalog.integration_types,
            modules: catalog.modules,
            rules: catalog.rules,
            mature_integrations: mature_integrations(),
        }
    }

    #[test]
    fn test_default_catalog_links_modules() {
        let catalog = default_catalog(Uuid::new_v4());
        let check = catalog
            .products
            .iter()
            .find(|p| p.product_code == "CHECK-SCANNING")
            .unwrap();
        assert_eq!(catalog.modules[0].saas_product_id, Some(check.id));
        assert_eq!(catalog.modules[3].saas_product_id, None);
        assert_eq!(catalog.skus.len(), 12);
        assert_eq!(catalog.zones.len(), 6);
        assert_eq!(catalog.snippets.len(), 3);
    }

    #[test]
    fn test_seeded_tiers_price_by_band() {
        let catalog = default_catalog(Uuid::new_v4());
        let check = &catalog.products[3];
        assert_eq!(calculators::tier_price(check, dec!(10000)), dec!(170.00));
        assert_eq!(calculators::tier_price(check, dec!(20000)), dec!(680.00));
        assert_eq!(calculators::tier_price(check, dec!(250000)), dec!(1030.00));
    }

    #[test]
    fn test_seeded_zone_travel() {
        let catalog = default_catalog(Uuid::new_v4());
        let zone = &catalog.zones[1];
        let trips: Vec<calculators::Trip> =
            serde_json::from_value(json!([{"days": 2, "people": 2}])).unwrap();
        let cost = calculators::travel_cost(Some(zone), &trips);
        assert_eq!(round_money(cost.total_travel_cost, 2), dec!(3315.00));
    }

    #[test]
    fn test_seeded_complexity_rule() {
        let snap = snapshot();
        let params = json!({"departments": 12, "revenue_templates": 8, "payment_imports": 1});
        let result = calculators::evaluate_complexity(snap.rule(COMPLEXITY_RULE), &params);
        // 12 + 8/4 + 1 = 15
        assert_eq!(result.tier, "MEDIUM");
        assert_eq!(result.additional_dept_count, 11);
    }

    #[test]
    fn test_seeded_configuration() {
        let req: ConfigureRequest = serde_json::from_value(json!({
            "base_product": "basic",
            "additional_users": 2,
            "modules": {"training": {"enabled": true}}
        }))
        .unwrap();
        let result = configure(&snapshot(), &req);

        let codes: Vec<&str> = result
            .selected_products
            .iter()
            .map(|p| p.product_code.as_str())
            .collect();
        assert_eq!(codes, vec!["TELLER-BASIC", "ADDITIONAL-USERS"]);
        assert_eq!(result.total_monthly_cost, dec!(2070));
        let skus: Vec<&str> = result.setup_skus.iter().map(|s| s.sku_code.as_str()).collect();
        assert_eq!(skus, vec!["ORG-SETUP-BASIC", "TRAINING-SUITE"]);
    }
}
