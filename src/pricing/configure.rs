//! Configuration-driven SaaS quote builder.
//!
//! `ConfigSnapshot` holds every active catalog row of one pricing version.
//! `configure` turns a `ConfigureRequest` into product lines, setup SKUs
//! and totals by evaluating the rule documents stored on those rows.

use rust_decimal::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    ApplicationModule, IntegrationType, MatureIntegration, PricingRule, SaasProduct, SkuDefinition,
};
use crate::pricing::calculators::round_money;
use crate::pricing::requests::{ConfigureRequest, IntegrationRequest};
use crate::pricing::responses::{
    AvailableIntegrationsResponse, AvailableModulesResponse, ConfigurationResponse,
    IntegrationTypeSummary, MatureIntegrationSummary, ModuleSummary, SelectedProduct,
    SelectedSetupSku,
};
use crate::pricing::rules::{self, SkuSelection};

/// Active catalog rows of one pricing version, sorted by SortOrder
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    pub pricing_version_id: Uuid,
    pub products: Vec<SaasProduct>,
    pub skus: Vec<SkuDefinition>,
    pub integration_types: Vec<IntegrationType>,
    pub modules: Vec<ApplicationModule>,
    pub rules: Vec<PricingRule>,
    /// Global list, ordered by SystemName
    pub mature_integrations: Vec<MatureIntegration>,
}

impl ConfigSnapshot {
    pub fn product(&self, code: &str) -> Option<&SaasProduct> {
        self.products.iter().find(|p| p.product_code == code)
    }

    pub fn product_by_id(&self, id: Uuid) -> Option<&SaasProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn sku(&self, code: &str) -> Option<&SkuDefinition> {
        self.skus.iter().find(|s| s.sku_code == code)
    }

    pub fn integration_type(&self, code: &str) -> Option<&IntegrationType> {
        self.integration_types.iter().find(|t| t.type_code == code)
    }

    pub fn is_mature(&self, system_name: &str) -> bool {
        self.mature_integrations
            .iter()
            .any(|m| m.system_name == system_name)
    }

    /// Configuration document of an active pricing rule
    pub fn rule(&self, code: &str) -> Option<&Value> {
        self.rules
            .iter()
            .find(|r| r.rule_code == code)
            .map(|r| &r.configuration)
    }

    pub fn available_modules(&self) -> AvailableModulesResponse {
        let empty = || Value::Object(Default::default());
        let modules = self
            .modules
            .iter()
            .map(|m| ModuleSummary {
                module_code: m.module_code.clone(),
                module_name: m.module_name.clone(),
                description: m.description.clone(),
                sub_parameters: m.sub_parameters.clone().unwrap_or_else(empty),
                selection_rules: m.selection_rules.clone().unwrap_or_else(empty),
                saas_product_code: m
                    .saas_product_id
                    .and_then(|id| self.product_by_id(id))
                    .map(|p| p.product_code.clone()),
                sort_order: m.sort_order,
            })
            .collect();
        AvailableModulesResponse { modules }
    }

    pub fn available_integrations(&self) -> AvailableIntegrationsResponse {
        AvailableIntegrationsResponse {
            integration_types: self
                .integration_types
                .iter()
                .map(|t| IntegrationTypeSummary {
                    type_code: t.type_code.clone(),
                    type_name: t.type_name.clone(),
                    description: t.description.clone(),
                    monthly_cost: t.monthly_cost,
                    mature_setup_sku: t.mature_setup_sku.clone(),
                    custom_setup_sku: t.custom_setup_sku.clone(),
                })
                .collect(),
            mature_integrations: self
                .mature_integrations
                .iter()
                .map(|m| MatureIntegrationSummary {
                    integration_code: m.integration_code.clone(),
                    system_name: m.system_name.clone(),
                    vendor: m.vendor.clone(),
                    comments: m.comments.clone(),
                })
                .collect(),
        }
    }
}

fn formula_type(product: &SaasProduct) -> Option<&str> {
    product
        .pricing_formula
        .as_ref()
        .and_then(|f| f.get("type"))
        .and_then(Value::as_str)
}

/// Monthly price of a product; without a formula it is the Tier 1 price
fn product_price(product: &SaasProduct, ctx: &Value) -> Decimal {
    match &product.pricing_formula {
        Some(formula) => rules::calculate_price(formula, ctx),
        None => product.tier1_price,
    }
}

fn setup_line(
    snapshot: &ConfigSnapshot,
    selection: SkuSelection,
    default_reason: impl FnOnce() -> String,
) -> Option<SelectedSetupSku> {
    let sku = snapshot.sku(&selection.sku_code)?;
    let unit_price = sku.fixed_price.unwrap_or_default();
    Some(SelectedSetupSku {
        sku_id: sku.id,
        sku_code: sku.sku_code.clone(),
        name: sku.name.clone(),
        quantity: selection.quantity,
        unit_price,
        total_price: unit_price * Decimal::from(selection.quantity),
        reason: selection.reason.unwrap_or_else(default_reason),
    })
}

#[derive(Default)]
struct Lines {
    products: Vec<SelectedProduct>,
    setup_skus: Vec<SelectedSetupSku>,
}

fn base_product(snapshot: &ConfigSnapshot, req: &ConfigureRequest, ctx: &Value) -> Lines {
    let code = if req.base_product.eq_ignore_ascii_case("basic") {
        "TELLER-BASIC"
    } else {
        "TELLER-STANDARD"
    };
    let Some(product) = snapshot.product(code) else {
        return Lines::default();
    };

    let monthly = product_price(product, ctx);
    let mut lines = Lines::default();
    lines.products.push(SelectedProduct {
        product_id: Some(product.id),
        product_code: product.product_code.clone(),
        name: product.name.clone(),
        category: product.category.clone(),
        monthly_cost: monthly,
        quantity: 1,
        total_monthly_cost: monthly,
        reason: format!("Base {} product", product.name),
        volume: None,
        volume_unit: None,
        integration_details: None,
    });

    let sku_rules = product
        .related_setup_skus
        .as_ref()
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    lines.setup_skus = sku_rules
        .iter()
        .filter_map(|rule| rules::evaluate_sku_rule(rule, ctx))
        .filter_map(|sel| setup_line(snapshot, sel, String::new))
        .collect();
    lines
}

fn addon_included(product: &SaasProduct, ctx: &Value) -> bool {
    let selection = product.selection_rules.as_ref();
    let conditions = selection
        .and_then(|s| s.get("conditions"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if conditions.is_empty() {
        if formula_type(product) != Some("quantity_based") {
            return false;
        }
        return addon_quantity(product, ctx).is_some();
    }

    let operator = selection
        .and_then(|s| s.get("operator"))
        .and_then(Value::as_str)
        .unwrap_or("AND");
    rules::evaluate_all(operator, conditions, ctx)
}

/// Positive whole quantity named by a quantity-based formula
fn addon_quantity(product: &SaasProduct, ctx: &Value) -> Option<i64> {
    let path = product
        .pricing_formula
        .as_ref()?
        .get("quantityParameter")?
        .as_str()?;
    let quantity = rules::lookup(ctx, path).and_then(crate::form::value_to_decimal)?;
    quantity.trunc().to_i64().filter(|q| *q > 0)
}

fn addons(snapshot: &ConfigSnapshot, ctx: &Value) -> Lines {
    let mut lines = Lines::default();
    for product in snapshot.products.iter().filter(|p| p.product_type == "addon") {
        if !addon_included(product, ctx) {
            continue;
        }

        let (unit_price, quantity) = if formula_type(product) == Some("quantity_based") {
            let unit = product
                .pricing_formula
                .as_ref()
                .and_then(|f| f.get("pricePerUnit"))
                .and_then(crate::form::value_to_decimal)
                .unwrap_or(Decimal::ZERO);
            (unit, addon_quantity(product, ctx).unwrap_or(1))
        } else {
            (product_price(product, ctx), 1)
        };

        lines.products.push(SelectedProduct {
            product_id: Some(product.id),
            product_code: product.product_code.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            monthly_cost: unit_price,
            quantity,
            total_monthly_cost: unit_price * Decimal::from(quantity),
            reason: format!("{} {}", quantity, product.name),
            volume: None,
            volume_unit: None,
            integration_details: None,
        });
    }
    lines
}

fn module_enabled(req: &ConfigureRequest, module: &ApplicationModule) -> bool {
    req.modules
        .get(&module.module_code.to_lowercase())
        .and_then(|params| params.get("enabled"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn modules(snapshot: &ConfigSnapshot, req: &ConfigureRequest, ctx: &Value) -> Lines {
    let mut lines = Lines::default();

    for module in snapshot.modules.iter().filter(|m| module_enabled(req, m)) {
        let linked = module.saas_product_id.and_then(|id| snapshot.product_by_id(id));
        if let Some(product) = linked {
            let monthly = product_price(product, ctx);
            let volume_path = product
                .pricing_formula
                .as_ref()
                .and_then(|f| f.get("volumeParameter"))
                .and_then(Value::as_str)
                .filter(|p| !p.is_empty());
            let volume = volume_path.and_then(|p| rules::lookup(ctx, p)).cloned();
            let volume_unit = volume.as_ref().and(volume_path).map(|p| {
                p.rsplit('.').next().unwrap_or(p).replace('_', " ")
            });

            lines.products.push(SelectedProduct {
                product_id: Some(product.id),
                product_code: product.product_code.clone(),
                name: module.module_name.clone(),
                category: "Module".to_string(),
                monthly_cost: monthly,
                quantity: 1,
                total_monthly_cost: monthly,
                reason: format!("{} module enabled", module.module_name),
                volume,
                volume_unit,
                integration_details: None,
            });
        }

        let sku_rules = module
            .selection_rules
            .as_ref()
            .and_then(|r| r.get("setupSKUs"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        lines.setup_skus.extend(
            sku_rules
                .iter()
                .filter_map(|rule| rules::evaluate_sku_rule(rule, ctx))
                .filter_map(|sel| {
                    setup_line(snapshot, sel, || {
                        format!("Required for {}", module.module_name)
                    })
                }),
        );
    }
    lines
}

/// How one integration family is presented
struct IntegrationKind {
    type_code: &'static str,
    product_code: &'static str,
    name_prefix: &'static str,
    reason_prefix: &'static str,
}

const BIDIRECTIONAL: IntegrationKind = IntegrationKind {
    type_code: "BIDIRECTIONAL",
    product_code: "INTERFACE-BIDIRECTIONAL",
    name_prefix: "Bi-Directional Interface",
    reason_prefix: "Bi-directional interface for",
};

const PAYMENT_IMPORT: IntegrationKind = IntegrationKind {
    type_code: "PAYMENT_IMPORT",
    product_code: "INTERFACE-PAYMENT-IMPORT",
    name_prefix: "Payment Import",
    reason_prefix: "Payment import interface for",
};

fn integrations(
    snapshot: &ConfigSnapshot,
    kind: &IntegrationKind,
    requested: &[IntegrationRequest],
) -> Lines {
    let mut lines = Lines::default();
    if requested.is_empty() {
        return lines;
    }
    let Some(int_type) = snapshot.integration_type(kind.type_code) else {
        return lines;
    };
    let product_id = snapshot.product(kind.product_code).map(|p| p.id);

    for integration in requested {
        let system = integration.system_name.as_deref().unwrap_or("Unknown");
        lines.products.push(SelectedProduct {
            product_id,
            product_code: kind.product_code.to_string(),
            name: format!("{}: {}", kind.name_prefix, system),
            category: "Interface".to_string(),
            monthly_cost: int_type.monthly_cost,
            quantity: 1,
            total_monthly_cost: int_type.monthly_cost,
            reason: format!("{} {}", kind.reason_prefix, system),
            volume: None,
            volume_unit: None,
            integration_details: serde_json::to_value(integration).ok(),
        });

        if !integration.is_new {
            continue;
        }
        let (sku_code, reason) = if snapshot.is_mature(system) {
            (
                int_type.mature_setup_sku.as_deref(),
                format!("{} uses existing Teller interface", system),
            )
        } else {
            (
                int_type.custom_setup_sku.as_deref(),
                format!("Custom integration development for {}", system),
            )
        };
        if let Some(code) = sku_code {
            let selection = SkuSelection {
                sku_code: code.to_string(),
                quantity: 1,
                reason: Some(reason),
            };
            lines
                .setup_skus
                .extend(setup_line(snapshot, selection, String::new));
        }
    }
    lines
}

/// Format as US dollars with thousands separators, e.g. `$14,880.00`
pub fn format_usd(amount: Decimal) -> String {
    let rounded = round_money(amount, 2);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn plural(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}

/// Build the configuration for a request: base product, add-ons, enabled
/// modules, then integrations.
pub fn configure(snapshot: &ConfigSnapshot, req: &ConfigureRequest) -> ConfigurationResponse {
    let ctx = serde_json::to_value(req).unwrap_or(Value::Null);

    let base = base_product(snapshot, req, &ctx);
    let addon_lines = addons(snapshot, &ctx);
    let module_lines = modules(snapshot, req, &ctx);
    let bidirectional = integrations(snapshot, &BIDIRECTIONAL, &req.integrations.bidirectional);
    let payment_import = integrations(snapshot, &PAYMENT_IMPORT, &req.integrations.payment_import);

    let base_name = base
        .products
        .first()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "Teller".to_string());
    let module_count = module_lines.products.len();
    let integration_count = bidirectional.products.len() + payment_import.products.len();

    let mut selected_products = Vec::new();
    let mut setup_skus = Vec::new();
    for lines in [base, addon_lines, module_lines, bidirectional, payment_import] {
        selected_products.extend(lines.products);
        setup_skus.extend(lines.setup_skus);
    }

    let total_monthly_cost: Decimal = selected_products.iter().map(|p| p.total_monthly_cost).sum();
    let total_setup_cost: Decimal = setup_skus.iter().map(|s| s.total_price).sum();

    let mut parts = vec![base_name];
    if module_count > 0 {
        parts.push(plural(module_count, "module"));
    }
    if integration_count > 0 {
        parts.push(plural(integration_count, "integration"));
    }
    let summary = format!(
        "{}: {}/mo, {} setup",
        parts.join(", "),
        format_usd(total_monthly_cost),
        format_usd(total_setup_cost)
    );

    ConfigurationResponse {
        selected_products,
        setup_skus,
        total_monthly_cost,
        total_setup_cost,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn snapshot() -> ConfigSnapshot {
        let standard = fixtures::configured_product(
            "TELLER-STANDARD",
            "Teller Standard",
            "base",
            dec!(2950),
            Some(json!({"type": "fixed", "price": 2950.00})),
        );
        let mut users = fixtures::configured_product(
            "ADDITIONAL-USERS",
            "Additional Named User",
            "addon",
            dec!(60),
            Some(json!({"type": "quantity_based", "pricePerUnit": 60, "quantityParameter": "additional_users"})),
        );
        users.category = "Add-on".into();
        let check = fixtures::configured_product(
            "CHECK-RECOGNITION-SAAS",
            "Check Recognition SaaS",
            "module",
            dec!(1030),
            Some(json!({
                "type": "tiered",
                "volumeParameter": "modules.check_recognition.scan_volume",
                "tiers": [
                    {"minVolume": 0, "maxVolume": 50000, "price": 1030},
                    {"minVolume": 50001, "maxVolume": null, "price": 1500}
                ]
            })),
        );
        let bidir = fixtures::configured_product(
            "INTERFACE-BIDIRECTIONAL",
            "Bi-Directional Interface",
            "module",
            dec!(285),
            None,
        );

        let check_module = fixtures::module(
            "CHECK_RECOGNITION",
            "Check Recognition/Bulk Scanning",
            Some(check.id),
            Some(json!({"setupSKUs": [{
                "condition": {"type": "parameter_equals", "parameter": "modules.check_recognition.is_new", "value": true},
                "skuCode": "CHECK-ICL-SETUP",
                "quantity": 1
            }]})),
        );
        let online_module = fixtures::module("TELLER_ONLINE", "Teller Online", None, None);

        ConfigSnapshot {
            pricing_version_id: fixtures::version_id(),
            products: vec![standard, users, check, bidir],
            skus: vec![
                fixtures::sku("CHECK-ICL-SETUP", Some(dec!(12880))),
                fixtures::sku("INTEGRATION-MATURE", Some(dec!(2000))),
                fixtures::sku("INTEGRATION-CUSTOM", Some(dec!(28520))),
            ],
            integration_types: vec![
                fixtures::integration_type(
                    "BIDIRECTIONAL",
                    "Bi-Directional Interface",
                    dec!(285),
                    "INTEGRATION-MATURE",
                    "INTEGRATION-CUSTOM",
                ),
                fixtures::integration_type(
                    "PAYMENT_IMPORT",
                    "Payment Import Interface",
                    dec!(170),
                    "INTEGRATION-MATURE",
                    "INTEGRATION-CUSTOM",
                ),
            ],
            modules: vec![check_module, online_module],
            rules: vec![],
            mature_integrations: vec![fixtures::mature_integration("TYLER-MUNIS", "Tyler Munis")],
        }
    }

    fn request(value: Value) -> ConfigureRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_full_configuration() {
        let req = request(json!({
            "base_product": "standard",
            "additional_users": 3,
            "modules": {
                "check_recognition": {"enabled": true, "is_new": true, "scan_volume": 75000},
                "teller_online": {"enabled": false}
            },
            "integrations": {
                "bidirectional": [{"system_name": "Tyler Munis", "vendor": "Tyler Technologies", "is_new": true}]
            }
        }));
        let result = configure(&snapshot(), &req);

        let codes: Vec<&str> = result
            .selected_products
            .iter()
            .map(|p| p.product_code.as_str())
            .collect();
        assert_eq!(
            codes,
            vec![
                "TELLER-STANDARD",
                "ADDITIONAL-USERS",
                "CHECK-RECOGNITION-SAAS",
                "INTERFACE-BIDIRECTIONAL"
            ]
        );

        let users = &result.selected_products[1];
        assert_eq!(users.monthly_cost, dec!(60));
        assert_eq!(users.quantity, 3);
        assert_eq!(users.total_monthly_cost, dec!(180));
        assert_eq!(users.reason, "3 Additional Named User");

        let check = &result.selected_products[2];
        assert_eq!(check.name, "Check Recognition/Bulk Scanning");
        assert_eq!(check.category, "Module");
        assert_eq!(check.monthly_cost, dec!(1500));
        assert_eq!(check.volume, Some(json!(75000)));
        assert_eq!(check.volume_unit.as_deref(), Some("scan volume"));

        let interface = &result.selected_products[3];
        assert_eq!(interface.name, "Bi-Directional Interface: Tyler Munis");
        assert_eq!(interface.reason, "Bi-directional interface for Tyler Munis");

        let skus: Vec<(&str, &str)> = result
            .setup_skus
            .iter()
            .map(|s| (s.sku_code.as_str(), s.reason.as_str()))
            .collect();
        assert_eq!(
            skus,
            vec![
                ("CHECK-ICL-SETUP", "Required for Check Recognition/Bulk Scanning"),
                ("INTEGRATION-MATURE", "Tyler Munis uses existing Teller interface"),
            ]
        );

        assert_eq!(result.total_monthly_cost, dec!(4915));
        assert_eq!(result.total_setup_cost, dec!(14880));
        assert_eq!(
            result.summary,
            "Teller Standard, 1 module, 1 integration: $4,915.00/mo, $14,880.00 setup"
        );
    }

    #[test]
    fn test_disabled_modules_are_skipped() {
        let req = request(json!({
            "modules": {"check_recognition": {"enabled": false, "is_new": true, "scan_volume": 10}}
        }));
        let result = configure(&snapshot(), &req);
        assert_eq!(result.selected_products.len(), 1);
        assert!(result.setup_skus.is_empty());
        assert_eq!(result.summary, "Teller Standard: $2,950.00/mo, $0.00 setup");
    }

    #[test]
    fn test_custom_integration_and_existing_system() {
        let req = request(json!({
            "integrations": {
                "payment_import": [
                    {"system_name": "Home Grown AR"},
                    {"system_name": "Legacy Cashiering", "is_new": false}
                ]
            }
        }));
        let result = configure(&snapshot(), &req);

        assert_eq!(result.selected_products.len(), 3);
        assert_eq!(result.selected_products[1].name, "Payment Import: Home Grown AR");
        // payment import has no catalog product in this snapshot
        assert_eq!(result.selected_products[1].product_id, None);
        assert_eq!(result.setup_skus.len(), 1);
        assert_eq!(result.setup_skus[0].sku_code, "INTEGRATION-CUSTOM");
        assert_eq!(
            result.setup_skus[0].reason,
            "Custom integration development for Home Grown AR"
        );
        assert!(result.summary.starts_with("Teller Standard, 2 integrations:"));
    }

    #[test]
    fn test_missing_base_product() {
        let req = request(json!({"base_product": "basic"}));
        let result = configure(&snapshot(), &req);
        assert!(result.selected_products.is_empty());
        assert_eq!(result.summary, "Teller: $0.00/mo, $0.00 setup");
    }

    #[test]
    fn test_addon_without_users_is_skipped() {
        let req = request(json!({"additional_users": 0}));
        let result = configure(&snapshot(), &req);
        assert!(result
            .selected_products
            .iter()
            .all(|p| p.product_code != "ADDITIONAL-USERS"));
    }

    #[test]
    fn test_available_modules_and_integrations() {
        let snap = snapshot();
        let modules = snap.available_modules();
        assert_eq!(modules.modules.len(), 2);
        assert_eq!(
            modules.modules[0].saas_product_code.as_deref(),
            Some("CHECK-RECOGNITION-SAAS")
        );
        assert_eq!(modules.modules[1].sub_parameters, json!({}));

        let integrations = snap.available_integrations();
        assert_eq!(integrations.integration_types.len(), 2);
        assert_eq!(integrations.mature_integrations[0].system_name, "Tyler Munis");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(dec!(4445)), "$4,445.00");
        assert_eq!(format_usd(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(format_usd(dec!(999.5)), "$999.50");
        assert_eq!(format_usd(dec!(0)), "$0.00");
    }
}
