//! Request bodies for the catalog editors.
//!
//! Create bodies carry every column; update bodies are PATCH-style and only
//! touch the fields that were sent. `apply` writes a patch onto a loaded row
//! so the query layer can persist the whole row in one UPDATE.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::form::{self, check_len, check_required};

use super::catalog::{
    PricingVersion, Referrer, SaasProduct, SkuDefinition, TextSnippet, TravelZone,
};

fn default_true() -> bool {
    true
}

fn default_product_type() -> String {
    "module".to_string()
}

/// Replace `target` when the patch carries a value
fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

// ==================== Pricing versions ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatePricingVersion {
    pub version_number: String,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub description: Option<String>,
    pub effective_date: NaiveDate,
    #[serde(default, deserialize_with = "form::opt_date")]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub is_locked: bool,
}

impl CreatePricingVersion {
    pub fn validate(&self) -> Result<()> {
        check_required("VersionNumber", &self.version_number)?;
        check_len("VersionNumber", &self.version_number, 20)?;
        if let Some(created_by) = &self.created_by {
            check_len("CreatedBy", created_by, 255)?;
        }
        if let Some(expires) = self.expiration_date {
            if expires < self.effective_date {
                return Err(AppError::validation(
                    "ExpirationDate must not be before EffectiveDate",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePricingVersion {
    #[serde(default, deserialize_with = "form::patch_string")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "form::patch_date")]
    pub expiration_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub is_current: Option<bool>,
    #[serde(default)]
    pub is_locked: Option<bool>,
}

impl UpdatePricingVersion {
    /// A locked version only accepts a patch that unlocks it
    pub fn allowed_on_locked(&self) -> bool {
        self.is_locked == Some(false)
    }

    pub fn apply(&self, row: &mut PricingVersion) {
        set(&mut row.description, &self.description);
        set(&mut row.expiration_date, &self.expiration_date);
        set(&mut row.is_current, &self.is_current);
        set(&mut row.is_locked, &self.is_locked);
    }
}

// ==================== SaaS products ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSaasProduct {
    pub pricing_version_id: Uuid,
    pub product_code: String,
    pub name: String,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub description: Option<String>,
    pub category: String,
    pub pricing_model: String,
    #[serde(deserialize_with = "form::int")]
    pub tier1_min: i32,
    #[serde(deserialize_with = "form::int")]
    pub tier1_max: i32,
    pub tier1_price: Decimal,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub tier2_min: Option<i32>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub tier2_max: Option<i32>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub tier2_price: Option<Decimal>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub tier3_min: Option<i32>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub tier3_max: Option<i32>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub tier3_price: Option<Decimal>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, deserialize_with = "form::int")]
    pub sort_order: i32,
    #[serde(default = "default_product_type")]
    pub product_type: String,
    #[serde(default)]
    pub required_parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub selection_rules: Option<serde_json::Value>,
    #[serde(default)]
    pub pricing_formula: Option<serde_json::Value>,
    #[serde(default, rename = "RelatedSetupSKUs")]
    pub related_setup_skus: Option<serde_json::Value>,
}

impl CreateSaasProduct {
    pub fn validate(&self) -> Result<()> {
        check_required("ProductCode", &self.product_code)?;
        check_len("ProductCode", &self.product_code, 50)?;
        check_required("Name", &self.name)?;
        check_len("Name", &self.name, 255)?;
        check_len("Category", &self.category, 50)?;
        check_len("PricingModel", &self.pricing_model, 50)?;
        check_product_type(&self.product_type)
    }
}

fn check_product_type(product_type: &str) -> Result<()> {
    match product_type {
        "base" | "addon" | "module" => Ok(()),
        other => Err(AppError::validation(format!(
            "ProductType must be base, addon or module (got {})",
            other
        ))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateSaasProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "form::patch_string")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub pricing_model: Option<String>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub tier1_min: Option<i32>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub tier1_max: Option<i32>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub tier1_price: Option<Decimal>,
    #[serde(default, deserialize_with = "form::patch_int")]
    pub tier2_min: Option<Option<i32>>,
    #[serde(default, deserialize_with = "form::patch_int")]
    pub tier2_max: Option<Option<i32>>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub tier2_price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "form::patch_int")]
    pub tier3_min: Option<Option<i32>>,
    #[serde(default, deserialize_with = "form::patch_int")]
    pub tier3_max: Option<Option<i32>>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub tier3_price: Option<Option<Decimal>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "form::patch_json")]
    pub required_parameters: Option<Option<serde_json::Value>>,
    #[serde(default, deserialize_with = "form::patch_json")]
    pub selection_rules: Option<Option<serde_json::Value>>,
    #[serde(default, deserialize_with = "form::patch_json")]
    pub pricing_formula: Option<Option<serde_json::Value>>,
    #[serde(default, rename = "RelatedSetupSKUs", deserialize_with = "form::patch_json")]
    pub related_setup_skus: Option<Option<serde_json::Value>>,
}

impl UpdateSaasProduct {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_required("Name", name)?;
            check_len("Name", name, 255)?;
        }
        if let Some(category) = &self.category {
            check_len("Category", category, 50)?;
        }
        if let Some(model) = &self.pricing_model {
            check_len("PricingModel", model, 50)?;
        }
        if let Some(product_type) = &self.product_type {
            check_product_type(product_type)?;
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut SaasProduct) {
        set(&mut row.name, &self.name);
        set(&mut row.description, &self.description);
        set(&mut row.category, &self.category);
        set(&mut row.pricing_model, &self.pricing_model);
        set(&mut row.tier1_min, &self.tier1_min);
        set(&mut row.tier1_max, &self.tier1_max);
        set(&mut row.tier1_price, &self.tier1_price);
        set(&mut row.tier2_min, &self.tier2_min);
        set(&mut row.tier2_max, &self.tier2_max);
        set(&mut row.tier2_price, &self.tier2_price);
        set(&mut row.tier3_min, &self.tier3_min);
        set(&mut row.tier3_max, &self.tier3_max);
        set(&mut row.tier3_price, &self.tier3_price);
        set(&mut row.is_active, &self.is_active);
        set(&mut row.is_required, &self.is_required);
        set(&mut row.sort_order, &self.sort_order);
        set(&mut row.product_type, &self.product_type);
        set(&mut row.required_parameters, &self.required_parameters);
        set(&mut row.selection_rules, &self.selection_rules);
        set(&mut row.pricing_formula, &self.pricing_formula);
        set(&mut row.related_setup_skus, &self.related_setup_skus);
    }
}

// ==================== SKU definitions ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateSkuDefinition {
    pub pricing_version_id: Uuid,
    #[serde(rename = "SKUCode")]
    pub sku_code: String,
    pub name: String,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub description: Option<String>,
    pub category: String,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub fixed_price: Option<Decimal>,
    #[serde(default = "default_true")]
    pub requires_quantity: bool,
    #[serde(default)]
    pub requires_travel_zone: bool,
    #[serde(default)]
    pub requires_configuration: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "form::int")]
    pub sort_order: i32,
    #[serde(default)]
    pub earmarked_status: bool,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub estimated_hours: Option<i32>,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub acceptance_criteria: Option<String>,
}

impl CreateSkuDefinition {
    pub fn validate(&self) -> Result<()> {
        check_required("SKUCode", &self.sku_code)?;
        check_len("SKUCode", &self.sku_code, 50)?;
        check_required("Name", &self.name)?;
        check_len("Name", &self.name, 255)?;
        check_len("Category", &self.category, 50)?;
        if matches!(self.estimated_hours, Some(h) if h < 0) {
            return Err(AppError::validation("EstimatedHours must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateSkuDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "form::patch_string")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub fixed_price: Option<Option<Decimal>>,
    #[serde(default)]
    pub requires_quantity: Option<bool>,
    #[serde(default)]
    pub requires_travel_zone: Option<bool>,
    #[serde(default)]
    pub requires_configuration: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub earmarked_status: Option<bool>,
    #[serde(default, deserialize_with = "form::patch_int")]
    pub estimated_hours: Option<Option<i32>>,
    #[serde(default, deserialize_with = "form::patch_string")]
    pub acceptance_criteria: Option<Option<String>>,
}

impl UpdateSkuDefinition {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_required("Name", name)?;
            check_len("Name", name, 255)?;
        }
        if let Some(category) = &self.category {
            check_len("Category", category, 50)?;
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut SkuDefinition) {
        set(&mut row.name, &self.name);
        set(&mut row.description, &self.description);
        set(&mut row.category, &self.category);
        set(&mut row.fixed_price, &self.fixed_price);
        set(&mut row.requires_quantity, &self.requires_quantity);
        set(&mut row.requires_travel_zone, &self.requires_travel_zone);
        set(&mut row.requires_configuration, &self.requires_configuration);
        set(&mut row.is_active, &self.is_active);
        set(&mut row.sort_order, &self.sort_order);
        set(&mut row.earmarked_status, &self.earmarked_status);
        set(&mut row.estimated_hours, &self.estimated_hours);
        set(&mut row.acceptance_criteria, &self.acceptance_criteria);
    }
}

// ==================== Travel zones ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTravelZone {
    pub pricing_version_id: Uuid,
    pub zone_code: String,
    pub name: String,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub description: Option<String>,
    pub mileage_rate: Decimal,
    pub daily_rate: Decimal,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub airfare_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub hotel_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub meals_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub rental_car_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub parking_rate: Option<Decimal>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "form::int")]
    pub sort_order: i32,
}

impl CreateTravelZone {
    pub fn validate(&self) -> Result<()> {
        check_required("ZoneCode", &self.zone_code)?;
        check_len("ZoneCode", &self.zone_code, 50)?;
        check_required("Name", &self.name)?;
        check_len("Name", &self.name, 255)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTravelZone {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "form::patch_string")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub mileage_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub daily_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub airfare_rate: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub hotel_rate: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub meals_rate: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub rental_car_rate: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub parking_rate: Option<Option<Decimal>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub sort_order: Option<i32>,
}

impl UpdateTravelZone {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_required("Name", name)?;
            check_len("Name", name, 255)?;
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut TravelZone) {
        set(&mut row.name, &self.name);
        set(&mut row.description, &self.description);
        set(&mut row.mileage_rate, &self.mileage_rate);
        set(&mut row.daily_rate, &self.daily_rate);
        set(&mut row.airfare_rate, &self.airfare_rate);
        set(&mut row.hotel_rate, &self.hotel_rate);
        set(&mut row.meals_rate, &self.meals_rate);
        set(&mut row.rental_car_rate, &self.rental_car_rate);
        set(&mut row.parking_rate, &self.parking_rate);
        set(&mut row.is_active, &self.is_active);
        set(&mut row.sort_order, &self.sort_order);
    }
}

// ==================== Text snippets ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTextSnippet {
    pub pricing_version_id: Uuid,
    pub snippet_key: String,
    pub snippet_label: String,
    pub content: String,
    pub category: String,
    #[serde(default, deserialize_with = "form::int")]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateTextSnippet {
    pub fn validate(&self) -> Result<()> {
        check_required("SnippetKey", &self.snippet_key)?;
        check_len("SnippetKey", &self.snippet_key, 100)?;
        check_required("SnippetLabel", &self.snippet_label)?;
        check_len("SnippetLabel", &self.snippet_label, 255)?;
        check_required("Category", &self.category)?;
        check_len("Category", &self.category, 50)
    }
}

/// Snippet keys are fixed once created; everything else may change
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTextSnippet {
    #[serde(default)]
    pub snippet_label: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateTextSnippet {
    pub fn validate(&self) -> Result<()> {
        if let Some(label) = &self.snippet_label {
            check_required("SnippetLabel", label)?;
            check_len("SnippetLabel", label, 255)?;
        }
        if let Some(category) = &self.category {
            check_required("Category", category)?;
            check_len("Category", category, 50)?;
        }
        Ok(())
    }

    pub fn apply(&self, row: &mut TextSnippet) {
        set(&mut row.snippet_label, &self.snippet_label);
        set(&mut row.content, &self.content);
        set(&mut row.category, &self.category);
        set(&mut row.sort_order, &self.sort_order);
        set(&mut row.is_active, &self.is_active);
    }
}

// ==================== Referrers ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateReferrer {
    pub referrer_name: String,
    pub standard_rate: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateReferrer {
    pub fn validate(&self) -> Result<()> {
        check_required("ReferrerName", &self.referrer_name)?;
        check_len("ReferrerName", &self.referrer_name, 255)?;
        form::check_percent("StandardRate", Some(self.standard_rate))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateReferrer {
    #[serde(default)]
    pub referrer_name: Option<String>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub standard_rate: Option<Decimal>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateReferrer {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.referrer_name {
            check_required("ReferrerName", name)?;
            check_len("ReferrerName", name, 255)?;
        }
        form::check_percent("StandardRate", self.standard_rate)
    }

    pub fn apply(&self, row: &mut Referrer) {
        set(&mut row.referrer_name, &self.referrer_name);
        set(&mut row.standard_rate, &self.standard_rate);
        set(&mut row.is_active, &self.is_active);
    }
}

// ==================== Row construction ====================

impl CreatePricingVersion {
    /// New row; CreatedBy falls back to the acting user
    pub fn into_row(self, actor: &str) -> PricingVersion {
        let now = Utc::now();
        PricingVersion {
            id: Uuid::new_v4(),
            version_number: self.version_number,
            description: self.description,
            effective_date: self.effective_date,
            expiration_date: self.expiration_date,
            created_by: self.created_by.unwrap_or_else(|| actor.to_string()),
            created_at: now,
            updated_at: now,
            is_current: self.is_current,
            is_locked: self.is_locked,
        }
    }
}

impl CreateSaasProduct {
    pub fn into_row(self) -> SaasProduct {
        let now = Utc::now();
        SaasProduct {
            id: Uuid::new_v4(),
            pricing_version_id: self.pricing_version_id,
            product_code: self.product_code,
            name: self.name,
            description: self.description,
            category: self.category,
            pricing_model: self.pricing_model,
            tier1_min: self.tier1_min,
            tier1_max: self.tier1_max,
            tier1_price: self.tier1_price,
            tier2_min: self.tier2_min,
            tier2_max: self.tier2_max,
            tier2_price: self.tier2_price,
            tier3_min: self.tier3_min,
            tier3_max: self.tier3_max,
            tier3_price: self.tier3_price,
            is_active: self.is_active,
            is_required: self.is_required,
            sort_order: self.sort_order,
            product_type: self.product_type,
            required_parameters: self.required_parameters,
            selection_rules: self.selection_rules,
            pricing_formula: self.pricing_formula,
            related_setup_skus: self.related_setup_skus,
            created_at: now,
            updated_at: now,
        }
    }
}

impl CreateSkuDefinition {
    pub fn into_row(self) -> SkuDefinition {
        let now = Utc::now();
        SkuDefinition {
            id: Uuid::new_v4(),
            pricing_version_id: self.pricing_version_id,
            sku_code: self.sku_code,
            name: self.name,
            description: self.description,
            category: self.category,
            fixed_price: self.fixed_price,
            requires_quantity: self.requires_quantity,
            requires_travel_zone: self.requires_travel_zone,
            requires_configuration: self.requires_configuration,
            is_active: self.is_active,
            sort_order: self.sort_order,
            earmarked_status: self.earmarked_status,
            estimated_hours: self.estimated_hours,
            acceptance_criteria: self.acceptance_criteria,
            created_at: now,
            updated_at: now,
        }
    }
}

impl CreateTravelZone {
    pub fn into_row(self) -> TravelZone {
        let now = Utc::now();
        TravelZone {
            id: Uuid::new_v4(),
            pricing_version_id: self.pricing_version_id,
            zone_code: self.zone_code,
            name: self.name,
            description: self.description,
            mileage_rate: self.mileage_rate,
            daily_rate: self.daily_rate,
            airfare_rate: self.airfare_rate,
            hotel_rate: self.hotel_rate,
            meals_rate: self.meals_rate,
            rental_car_rate: self.rental_car_rate,
            parking_rate: self.parking_rate,
            is_active: self.is_active,
            sort_order: self.sort_order,
            created_at: now,
            updated_at: now,
        }
    }
}

impl CreateTextSnippet {
    pub fn into_row(self) -> TextSnippet {
        let now = Utc::now();
        TextSnippet {
            id: Uuid::new_v4(),
            pricing_version_id: self.pricing_version_id,
            snippet_key: self.snippet_key,
            snippet_label: self.snippet_label,
            content: self.content,
            category: self.category,
            sort_order: self.sort_order,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

impl CreateReferrer {
    pub fn into_row(self) -> Referrer {
        let now = Utc::now();
        Referrer {
            id: Uuid::new_v4(),
            referrer_name: self.referrer_name,
            standard_rate: self.standard_rate,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_create_product_from_console_form() {
        let body = json!({
            "PricingVersionId": "6f1c1f43-5a57-4e55-9d8e-8b7d3c0c2d11",
            "ProductCode": "CHECK-SCANNING",
            "Name": "Check Scanning",
            "Description": "",
            "Category": "Module",
            "PricingModel": "Tiered",
            "Tier1Min": "0",
            "Tier1Max": "50000",
            "Tier1Price": "1030",
            "Tier2Min": "",
            "Tier2Max": "",
            "Tier2Price": "",
            "SortOrder": "4"
        });
        let req: CreateSaasProduct = serde_json::from_value(body).unwrap();

        assert_eq!(req.tier1_max, 50000);
        assert_eq!(req.tier1_price, dec!(1030));
        assert_eq!(req.tier2_min, None);
        assert_eq!(req.tier2_price, None);
        assert_eq!(req.description, None);
        assert_eq!(req.sort_order, 4);
        assert!(req.is_active);
        assert_eq!(req.product_type, "module");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_product_rejects_unknown_type() {
        let body = json!({
            "PricingVersionId": "6f1c1f43-5a57-4e55-9d8e-8b7d3c0c2d11",
            "ProductCode": "X",
            "Name": "X",
            "Category": "Core",
            "PricingModel": "Flat",
            "Tier1Min": 0,
            "Tier1Max": 1,
            "Tier1Price": 1,
            "ProductType": "bundle"
        });
        let req: CreateSaasProduct = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_product_only_touches_sent_fields() {
        let mut row = fixtures::product("TEST-001");
        let patch: UpdateSaasProduct = serde_json::from_value(json!({
            "Tier1Price": "125.50",
            "Tier2Price": null,
            "Description": "Updated"
        }))
        .unwrap();
        patch.apply(&mut row);

        assert_eq!(row.tier1_price, dec!(125.50));
        assert_eq!(row.tier2_price, None);
        assert_eq!(row.tier2_min, Some(1001));
        assert_eq!(row.description.as_deref(), Some("Updated"));
        assert_eq!(row.name, "TEST-001");
    }

    #[test]
    fn test_pricing_version_validation() {
        let req: CreatePricingVersion = serde_json::from_value(json!({
            "VersionNumber": "2025.1-this-is-far-too-long",
            "EffectiveDate": "2025-01-01",
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: CreatePricingVersion = serde_json::from_value(json!({
            "VersionNumber": "2025.2",
            "EffectiveDate": "2025-06-01",
            "ExpirationDate": "2025-01-01",
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: CreatePricingVersion = serde_json::from_value(json!({
            "VersionNumber": "2025.2",
            "EffectiveDate": "2025-06-01",
            "ExpirationDate": "",
            "CreatedBy": "pricing@example.com"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(!req.is_current);
    }

    #[test]
    fn test_locked_version_accepts_only_unlock() {
        let unlock: UpdatePricingVersion =
            serde_json::from_value(json!({"IsLocked": false})).unwrap();
        assert!(unlock.allowed_on_locked());

        let edit: UpdatePricingVersion =
            serde_json::from_value(json!({"Description": "x"})).unwrap();
        assert!(!edit.allowed_on_locked());

        let mut row = fixtures::pricing_version("2025.1");
        row.is_locked = true;
        unlock.apply(&mut row);
        assert!(!row.is_locked);
    }

    #[test]
    fn test_update_zone_clears_optional_rate() {
        let mut zone = fixtures::zone("ZONE-2");
        let patch: UpdateTravelZone =
            serde_json::from_value(json!({"ParkingRate": "", "DailyRate": "200"})).unwrap();
        patch.apply(&mut zone);
        assert_eq!(zone.parking_rate, None);
        assert_eq!(zone.daily_rate, dec!(200));
    }

    #[test]
    fn test_referrer_rate_is_a_percentage() {
        let req: CreateReferrer = serde_json::from_value(json!({
            "ReferrerName": "Partner A",
            "StandardRate": "150"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_text_snippet_create_and_patch() {
        let req: CreateTextSnippet = serde_json::from_value(json!({
            "PricingVersionId": "6f1c1f43-5a57-4e55-9d8e-8b7d3c0c2d11",
            "SnippetKey": "PAYMENT_TERMS",
            "SnippetLabel": "Payment terms",
            "Content": "Net 30 from invoice date.",
            "Category": "OrderForm",
            "SortOrder": "2"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        let mut row = req.into_row();
        assert_eq!(row.sort_order, 2);
        assert!(row.is_active);

        let patch: UpdateTextSnippet =
            serde_json::from_value(json!({"Content": "Net 45.", "IsActive": false})).unwrap();
        patch.apply(&mut row);
        assert_eq!(row.content, "Net 45.");
        assert!(!row.is_active);
        assert_eq!(row.snippet_label, "Payment terms");

        let too_long: CreateTextSnippet = serde_json::from_value(json!({
            "PricingVersionId": "6f1c1f43-5a57-4e55-9d8e-8b7d3c0c2d11",
            "SnippetKey": "K".repeat(101),
            "SnippetLabel": "x",
            "Content": "",
            "Category": "Legal"
        }))
        .unwrap();
        assert!(too_long.validate().is_err());

        let blank: UpdateTextSnippet = serde_json::from_value(json!({"Category": " "})).unwrap();
        assert!(blank.validate().is_err());
    }
}
