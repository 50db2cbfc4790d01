//! Quotes, quote versions and their line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::form::{self, check_len, check_required};
use crate::pricing::requests::{check_discount_config, check_travel_config};

pub const STATUS_DRAFT: &str = "DRAFT";
pub const DEFAULT_ESCALATION: &str = "STANDARD_4PCT";
pub const DEFAULT_MILESTONE_STYLE: &str = "FIXED_MONTHLY";

const QUOTE_STATUSES: [&str; 4] = ["DRAFT", "SENT", "ACCEPTED", "DECLINED"];

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Quote {
    pub id: Uuid,
    pub quote_number: String,
    pub client_name: String,
    pub client_organization: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuoteVersion {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub version_number: i32,
    pub version_description: Option<String>,
    pub pricing_version_id: Uuid,
    pub client_data: serde_json::Value,
    pub projection_years: i32,
    pub escalation_model: String,
    pub multi_year_freeze_years: Option<i32>,
    pub level_loading_enabled: bool,
    pub teller_payments_enabled: bool,
    pub discount_config: Option<serde_json::Value>,
    pub referrer_id: Option<Uuid>,
    pub referral_rate_override: Option<Decimal>,
    pub milestone_style: String,
    pub initial_payment_percentage: Decimal,
    pub project_duration_months: i32,
    pub travel_zone_id: Option<Uuid>,
    pub travel_config: Option<serde_json::Value>,
    #[serde(rename = "TotalSaaSMonthly")]
    pub total_saas_monthly: Option<Decimal>,
    #[serde(rename = "TotalSaaSAnnualYear1")]
    pub total_saas_annual_year1: Option<Decimal>,
    pub total_setup_packages: Option<Decimal>,
    pub total_travel: Option<Decimal>,
    pub total_contracted_amount: Option<Decimal>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub version_status: String,
}

impl QuoteVersion {
    /// SENT and ACCEPTED versions are frozen
    pub fn is_frozen(&self) -> bool {
        matches!(self.version_status.as_str(), "SENT" | "ACCEPTED")
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuoteSaasLine {
    pub id: Uuid,
    #[serde(skip)]
    pub quote_version_id: Uuid,
    #[serde(rename = "SaaSProductId")]
    pub saas_product_id: Uuid,
    pub quantity: Decimal,
    pub calculated_monthly_price: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuoteSetupLine {
    pub id: Uuid,
    #[serde(skip)]
    pub quote_version_id: Uuid,
    #[serde(rename = "SKUDefinitionId")]
    pub sku_definition_id: Uuid,
    pub quantity: i32,
    pub calculated_price: Decimal,
    pub custom_scope_notes: Option<String>,
    pub sequence_order: Option<i32>,
}

/// Version row with its line items
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuoteVersionDetail {
    #[serde(flatten)]
    pub version: QuoteVersion,
    #[serde(rename = "SaaSProducts")]
    pub saas_products: Vec<QuoteSaasLine>,
    pub setup_packages: Vec<QuoteSetupLine>,
}

/// Quote with every version, newest version first
#[derive(Debug, Serialize)]
pub struct QuoteWithVersions {
    #[serde(flatten)]
    pub quote: Quote,
    pub versions: Vec<QuoteVersionDetail>,
}

// ==================== Requests ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateQuote {
    pub client_name: String,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub client_organization: Option<String>,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub created_by: Option<String>,
}

impl CreateQuote {
    pub fn validate(&self) -> Result<()> {
        check_required("ClientName", &self.client_name)?;
        check_len("ClientName", &self.client_name, 255)?;
        if let Some(org) = &self.client_organization {
            check_len("ClientOrganization", org, 255)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateQuote {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default, deserialize_with = "form::patch_string")]
    pub client_organization: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdateQuote {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.client_name {
            check_required("ClientName", name)?;
            check_len("ClientName", name, 255)?;
        }
        if let Some(status) = &self.status {
            if !QUOTE_STATUSES.contains(&status.as_str()) {
                return Err(AppError::validation(format!(
                    "Status must be one of {}",
                    QUOTE_STATUSES.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn apply(&self, quote: &mut Quote) {
        if let Some(name) = &self.client_name {
            quote.client_name = name.clone();
        }
        if let Some(org) = &self.client_organization {
            quote.client_organization = org.clone();
        }
        if let Some(status) = &self.status {
            quote.status = status.clone();
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaasLineInput {
    #[serde(rename = "SaaSProductId")]
    pub saas_product_id: Uuid,
    pub quantity: Decimal,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub notes: Option<String>,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetupLineInput {
    #[serde(rename = "SKUDefinitionId")]
    pub sku_definition_id: Uuid,
    #[serde(default = "one", deserialize_with = "form::int")]
    pub quantity: i32,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub custom_scope_notes: Option<String>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub sequence_order: Option<i32>,
}

fn check_lines(saas: &[SaasLineInput], setup: &[SetupLineInput]) -> Result<()> {
    if saas.iter().any(|l| l.quantity < Decimal::ZERO) {
        return Err(AppError::validation("SaaS product Quantity must be >= 0"));
    }
    if setup.iter().any(|l| l.quantity < 1) {
        return Err(AppError::validation("Setup package Quantity must be >= 1"));
    }
    Ok(())
}

fn check_version_settings(
    projection_years: Option<i32>,
    referral_rate_override: Option<Decimal>,
    initial_payment_percentage: Option<Decimal>,
    project_duration_months: Option<i32>,
) -> Result<()> {
    if matches!(projection_years, Some(y) if !(1..=10).contains(&y)) {
        return Err(AppError::validation("ProjectionYears must be between 1 and 10"));
    }
    form::check_percent("ReferralRateOverride", referral_rate_override)?;
    form::check_percent("InitialPaymentPercentage", initial_payment_percentage)?;
    if matches!(project_duration_months, Some(m) if m < 1) {
        return Err(AppError::validation("ProjectDurationMonths must be >= 1"));
    }
    Ok(())
}

fn default_projection_years() -> i32 {
    5
}

fn default_escalation() -> String {
    DEFAULT_ESCALATION.to_string()
}

fn default_milestone_style() -> String {
    DEFAULT_MILESTONE_STYLE.to_string()
}

fn default_initial_payment() -> Decimal {
    Decimal::new(2500, 2)
}

fn default_duration() -> i32 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateQuoteVersion {
    #[serde(default, deserialize_with = "form::opt_string")]
    pub version_description: Option<String>,
    pub pricing_version_id: Uuid,
    pub client_data: serde_json::Value,
    #[serde(default = "default_projection_years", deserialize_with = "form::int")]
    pub projection_years: i32,
    #[serde(default = "default_escalation")]
    pub escalation_model: String,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub multi_year_freeze_years: Option<i32>,
    #[serde(default)]
    pub level_loading_enabled: bool,
    #[serde(default)]
    pub teller_payments_enabled: bool,
    #[serde(default)]
    pub discount_config: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "form::opt_uuid")]
    pub referrer_id: Option<Uuid>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub referral_rate_override: Option<Decimal>,
    #[serde(default = "default_milestone_style")]
    pub milestone_style: String,
    #[serde(default = "default_initial_payment")]
    pub initial_payment_percentage: Decimal,
    #[serde(default = "default_duration", deserialize_with = "form::int")]
    pub project_duration_months: i32,
    #[serde(default, deserialize_with = "form::opt_uuid")]
    pub travel_zone_id: Option<Uuid>,
    #[serde(default)]
    pub travel_config: Option<serde_json::Value>,
    #[serde(default, rename = "SaaSProducts")]
    pub saas_products: Vec<SaasLineInput>,
    #[serde(default)]
    pub setup_packages: Vec<SetupLineInput>,
    #[serde(default, deserialize_with = "form::opt_string")]
    pub created_by: Option<String>,
}

impl CreateQuoteVersion {
    pub fn validate(&self) -> Result<()> {
        check_version_settings(
            Some(self.projection_years),
            self.referral_rate_override,
            Some(self.initial_payment_percentage),
            Some(self.project_duration_months),
        )?;
        check_discount_config(self.discount_config.as_ref())?;
        check_travel_config(self.travel_config.as_ref())?;
        check_lines(&self.saas_products, &self.setup_packages)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateQuoteVersion {
    #[serde(default, deserialize_with = "form::patch_string")]
    pub version_description: Option<Option<String>>,
    #[serde(default)]
    pub client_data: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub projection_years: Option<i32>,
    #[serde(default)]
    pub escalation_model: Option<String>,
    #[serde(default, deserialize_with = "form::patch_int")]
    pub multi_year_freeze_years: Option<Option<i32>>,
    #[serde(default)]
    pub level_loading_enabled: Option<bool>,
    #[serde(default)]
    pub teller_payments_enabled: Option<bool>,
    #[serde(default, deserialize_with = "form::patch_json")]
    pub discount_config: Option<Option<serde_json::Value>>,
    #[serde(default, deserialize_with = "form::patch_uuid")]
    pub referrer_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "form::patch_decimal")]
    pub referral_rate_override: Option<Option<Decimal>>,
    #[serde(default)]
    pub milestone_style: Option<String>,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub initial_payment_percentage: Option<Decimal>,
    #[serde(default, deserialize_with = "form::opt_int")]
    pub project_duration_months: Option<i32>,
    #[serde(default, deserialize_with = "form::patch_uuid")]
    pub travel_zone_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "form::patch_json")]
    pub travel_config: Option<Option<serde_json::Value>>,
    #[serde(default, rename = "SaaSProducts")]
    pub saas_products: Option<Vec<SaasLineInput>>,
    #[serde(default)]
    pub setup_packages: Option<Vec<SetupLineInput>>,
    #[serde(default)]
    pub version_status: Option<String>,
}

impl UpdateQuoteVersion {
    pub fn validate(&self) -> Result<()> {
        check_version_settings(
            self.projection_years,
            self.referral_rate_override.flatten(),
            self.initial_payment_percentage,
            self.project_duration_months,
        )?;
        check_discount_config(self.discount_config.as_ref().and_then(|c| c.as_ref()))?;
        check_travel_config(self.travel_config.as_ref().and_then(|c| c.as_ref()))?;
        check_lines(
            self.saas_products.as_deref().unwrap_or_default(),
            self.setup_packages.as_deref().unwrap_or_default(),
        )
    }

    /// Apply scalar fields; line items are replaced by the caller
    pub fn apply(&self, v: &mut QuoteVersion) {
        if let Some(x) = &self.version_description {
            v.version_description = x.clone();
        }
        if let Some(x) = &self.client_data {
            v.client_data = x.clone();
        }
        if let Some(x) = self.projection_years {
            v.projection_years = x;
        }
        if let Some(x) = &self.escalation_model {
            v.escalation_model = x.clone();
        }
        if let Some(x) = self.multi_year_freeze_years {
            v.multi_year_freeze_years = x;
        }
        if let Some(x) = self.level_loading_enabled {
            v.level_loading_enabled = x;
        }
        if let Some(x) = self.teller_payments_enabled {
            v.teller_payments_enabled = x;
        }
        if let Some(x) = &self.discount_config {
            v.discount_config = x.clone();
        }
        if let Some(x) = self.referrer_id {
            v.referrer_id = x;
        }
        if let Some(x) = self.referral_rate_override {
            v.referral_rate_override = x;
        }
        if let Some(x) = &self.milestone_style {
            v.milestone_style = x.clone();
        }
        if let Some(x) = self.initial_payment_percentage {
            v.initial_payment_percentage = x;
        }
        if let Some(x) = self.project_duration_months {
            v.project_duration_months = x;
        }
        if let Some(x) = self.travel_zone_id {
            v.travel_zone_id = x;
        }
        if let Some(x) = &self.travel_config {
            v.travel_config = x.clone();
        }
        if let Some(x) = &self.version_status {
            v.version_status = x.clone();
        }
    }
}

// ==================== Row construction ====================

/// Next number in a `Q-YYYY-` sequence given the highest issued so far
pub fn next_quote_number(prefix: &str, last: Option<&str>) -> String {
    let seq = last
        .and_then(|n| n.strip_prefix(prefix))
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(0);
    format!("{}{:04}", prefix, seq + 1)
}

impl CreateQuote {
    pub fn into_row(self, quote_number: String, actor: &str) -> Quote {
        let now = Utc::now();
        Quote {
            id: Uuid::new_v4(),
            quote_number,
            client_name: self.client_name,
            client_organization: self.client_organization,
            created_by: self.created_by.unwrap_or_else(|| actor.to_string()),
            created_at: now,
            updated_at: now,
            status: STATUS_DRAFT.to_string(),
        }
    }
}

impl QuoteVersion {
    /// Version 1 of a new quote, priced against `pricing_version_id`
    pub fn initial(quote: &Quote, pricing_version_id: Uuid) -> Self {
        QuoteVersion {
            id: Uuid::new_v4(),
            quote_id: quote.id,
            version_number: 1,
            version_description: Some("Initial version".to_string()),
            pricing_version_id,
            client_data: serde_json::json!({
                "ClientName": quote.client_name,
                "ClientOrganization": quote.client_organization.clone().unwrap_or_default(),
            }),
            projection_years: default_projection_years(),
            escalation_model: default_escalation(),
            multi_year_freeze_years: None,
            level_loading_enabled: false,
            teller_payments_enabled: false,
            discount_config: None,
            referrer_id: None,
            referral_rate_override: None,
            milestone_style: default_milestone_style(),
            initial_payment_percentage: default_initial_payment(),
            project_duration_months: default_duration(),
            travel_zone_id: None,
            travel_config: None,
            total_saas_monthly: None,
            total_saas_annual_year1: None,
            total_setup_packages: None,
            total_travel: None,
            total_contracted_amount: None,
            created_by: quote.created_by.clone(),
            created_at: Utc::now(),
            version_status: STATUS_DRAFT.to_string(),
        }
    }
}

impl CreateQuoteVersion {
    /// Version row plus the requested line items
    pub fn into_parts(
        self,
        quote_id: Uuid,
        version_number: i32,
        actor: &str,
    ) -> (QuoteVersion, Vec<SaasLineInput>, Vec<SetupLineInput>) {
        let version = QuoteVersion {
            id: Uuid::new_v4(),
            quote_id,
            version_number,
            version_description: self.version_description,
            pricing_version_id: self.pricing_version_id,
            client_data: self.client_data,
            projection_years: self.projection_years,
            escalation_model: self.escalation_model,
            multi_year_freeze_years: self.multi_year_freeze_years,
            level_loading_enabled: self.level_loading_enabled,
            teller_payments_enabled: self.teller_payments_enabled,
            discount_config: self.discount_config,
            referrer_id: self.referrer_id,
            referral_rate_override: self.referral_rate_override,
            milestone_style: self.milestone_style,
            initial_payment_percentage: self.initial_payment_percentage,
            project_duration_months: self.project_duration_months,
            travel_zone_id: self.travel_zone_id,
            travel_config: self.travel_config,
            total_saas_monthly: None,
            total_saas_annual_year1: None,
            total_setup_packages: None,
            total_travel: None,
            total_contracted_amount: None,
            created_by: self.created_by.unwrap_or_else(|| actor.to_string()),
            created_at: Utc::now(),
            version_status: STATUS_DRAFT.to_string(),
        };
        (version, self.saas_products, self.setup_packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_version_defaults() {
        let req: CreateQuoteVersion = serde_json::from_value(json!({
            "PricingVersionId": "6f1c1f43-5a57-4e55-9d8e-8b7d3c0c2d11",
            "ClientData": {"ClientName": "Riverside County"},
            "SaaSProducts": [{"SaaSProductId": "0b7b6ad6-5f43-4b8e-8f3c-3d3e7f1f2a01", "Quantity": "1"}],
            "SetupPackages": [{"SKUDefinitionId": "0b7b6ad6-5f43-4b8e-8f3c-3d3e7f1f2a02"}]
        }))
        .unwrap();

        assert_eq!(req.projection_years, 5);
        assert_eq!(req.escalation_model, "STANDARD_4PCT");
        assert_eq!(req.milestone_style, "FIXED_MONTHLY");
        assert_eq!(req.initial_payment_percentage, dec!(25.00));
        assert_eq!(req.project_duration_months, 10);
        assert_eq!(req.setup_packages[0].quantity, 1);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_version_ranges() {
        let req: CreateQuoteVersion = serde_json::from_value(json!({
            "PricingVersionId": "6f1c1f43-5a57-4e55-9d8e-8b7d3c0c2d11",
            "ClientData": {},
            "ProjectionYears": 11
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let patch: UpdateQuoteVersion =
            serde_json::from_value(json!({"ReferralRateOverride": "101"})).unwrap();
        assert!(patch.validate().is_err());

        let patch: UpdateQuoteVersion = serde_json::from_value(json!({
            "SetupPackages": [{"SKUDefinitionId": "0b7b6ad6-5f43-4b8e-8f3c-3d3e7f1f2a02", "Quantity": 0}]
        }))
        .unwrap();
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_version_configs_are_checked() {
        let req: CreateQuoteVersion = serde_json::from_value(json!({
            "PricingVersionId": "6f1c1f43-5a57-4e55-9d8e-8b7d3c0c2d11",
            "ClientData": {},
            "TravelConfig": {"trips": [{"zone_code": "ZONE-2", "days": -1000000, "people": 1}]}
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let patch: UpdateQuoteVersion = serde_json::from_value(json!({
            "DiscountConfig": {"setup_fixed": "79228162514264337593543950335"}
        }))
        .unwrap();
        assert!(patch.validate().is_err());

        let patch: UpdateQuoteVersion = serde_json::from_value(json!({
            "TravelConfig": {"trips": [{"zone_code": "ZONE-2", "days": 3, "people": 2}]},
            "DiscountConfig": {"setup_pct": 10}
        }))
        .unwrap();
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_patch_clears_travel_zone() {
        let mut version = fixtures::quote_version();
        version.travel_zone_id = Some(Uuid::new_v4());
        let patch: UpdateQuoteVersion =
            serde_json::from_value(json!({"TravelZoneId": "", "LevelLoadingEnabled": true}))
                .unwrap();
        patch.apply(&mut version);

        assert_eq!(version.travel_zone_id, None);
        assert!(version.level_loading_enabled);
        assert_eq!(version.projection_years, 5);
    }

    #[test]
    fn test_frozen_statuses() {
        let mut version = fixtures::quote_version();
        assert!(!version.is_frozen());
        version.version_status = "SENT".into();
        assert!(version.is_frozen());
        version.version_status = "ACCEPTED".into();
        assert!(version.is_frozen());
    }

    #[test]
    fn test_detail_flattens_version() {
        let detail = QuoteVersionDetail {
            version: fixtures::quote_version(),
            saas_products: vec![],
            setup_packages: vec![],
        };
        let json = serde_json::to_value(detail).unwrap();
        assert_eq!(json["VersionNumber"], 1);
        assert!(json["SaaSProducts"].is_array());
        assert!(json.get("TotalSaaSAnnualYear1").is_some());
    }

    #[test]
    fn test_next_quote_number() {
        assert_eq!(next_quote_number("Q-2025-", None), "Q-2025-0001");
        assert_eq!(next_quote_number("Q-2025-", Some("Q-2025-0001")), "Q-2025-0002");
        assert_eq!(next_quote_number("Q-2025-", Some("Q-2025-0099")), "Q-2025-0100");
        assert_eq!(next_quote_number("Q-2025-", Some("Q-2025-10000")), "Q-2025-10001");
        assert_eq!(next_quote_number("Q-2026-", Some("Q-2025-0042")), "Q-2026-0001");
    }

    #[test]
    fn test_initial_version_copies_client() {
        let req: CreateQuote = serde_json::from_value(json!({
            "ClientName": "Riverside County",
            "ClientOrganization": ""
        }))
        .unwrap();
        let quote = req.into_row("Q-2025-0001".into(), "alice");
        assert_eq!(quote.created_by, "alice");
        assert_eq!(quote.status, "DRAFT");

        let version = QuoteVersion::initial(&quote, fixtures::version_id());
        assert_eq!(version.version_number, 1);
        assert_eq!(version.version_description.as_deref(), Some("Initial version"));
        assert_eq!(version.client_data["ClientName"], "Riverside County");
        assert_eq!(version.client_data["ClientOrganization"], "");
        assert_eq!(version.initial_payment_percentage, dec!(25.00));
        assert_eq!(version.quote_id, quote.id);
    }

    #[test]
    fn test_quote_status_must_be_known() {
        let patch: UpdateQuote = serde_json::from_value(json!({"Status": "LOST"})).unwrap();
        assert!(patch.validate().is_err());
        let patch: UpdateQuote = serde_json::from_value(json!({"Status": "SENT"})).unwrap();
        assert!(patch.validate().is_ok());
    }
}
