//! Request DTOs for the calculation and configuration endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::form::{self, check_amount};
use crate::pricing::calculators::{DiscountConfig, Trip, MAX_TRIP_DAYS, MAX_TRIP_PEOPLE};

fn one() -> i32 {
    1
}

/// Percentages in 0..=100 and a fixed setup discount within the money range
pub fn check_discount_config(value: Option<&Value>) -> Result<()> {
    let config = DiscountConfig::from_value(value);
    form::check_percent("saas_year1_pct", Some(config.saas_year1_pct))?;
    form::check_percent("saas_all_years_pct", Some(config.saas_all_years_pct))?;
    form::check_percent("setup_pct", Some(config.setup_pct))?;
    check_amount("setup_fixed", config.setup_fixed)
}

fn check_trips(trips: &[Trip]) -> Result<()> {
    if trips.iter().any(|t| !t.is_valid()) {
        return Err(AppError::validation(format!(
            "trip days must be between 1 and {} and people between 1 and {}",
            MAX_TRIP_DAYS, MAX_TRIP_PEOPLE
        )));
    }
    Ok(())
}

/// A stored travel document's `trips` must all parse and be in range
pub fn check_travel_config(config: Option<&Value>) -> Result<()> {
    let Some(trips) = config.and_then(|c| c.get("trips")).filter(|t| !t.is_null()) else {
        return Ok(());
    };
    let trips: Vec<Trip> = serde_json::from_value(trips.clone())
        .map_err(|e| AppError::validation(format!("TravelConfig trips are invalid: {}", e)))?;
    check_trips(&trips)
}

/// Request to calculate the organization setup complexity factor
#[derive(Debug, Deserialize)]
pub struct ComplexityFactorRequest {
    #[serde(default = "one", deserialize_with = "form::int")]
    pub departments: i32,
    #[serde(default, deserialize_with = "form::int")]
    pub revenue_templates: i32,
    #[serde(default, deserialize_with = "form::int")]
    pub payment_imports: i32,
}

impl ComplexityFactorRequest {
    pub fn validate(&self) -> Result<()> {
        if self.departments < 1 {
            return Err(AppError::validation("departments must be >= 1"));
        }
        if self.revenue_templates < 0 || self.payment_imports < 0 {
            return Err(AppError::validation(
                "revenue_templates and payment_imports must be >= 0",
            ));
        }
        Ok(())
    }

    /// Parameters as the rule document sees them
    pub fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "departments": self.departments,
            "revenue_templates": self.revenue_templates,
            "payment_imports": self.payment_imports,
        })
    }
}

/// Request to apply a discount configuration
#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub saas_monthly: Decimal,
    pub setup_total: Decimal,
    #[serde(default)]
    pub discount_config: Option<serde_json::Value>,
}

impl DiscountRequest {
    pub fn validate(&self) -> Result<()> {
        check_amount("saas_monthly", self.saas_monthly)?;
        check_amount("setup_total", self.setup_total)?;
        check_discount_config(self.discount_config.as_ref())
    }
}

/// Request to price travel for a zone
#[derive(Debug, Deserialize)]
pub struct TravelCostRequest {
    #[serde(default, deserialize_with = "form::opt_uuid")]
    pub travel_zone_id: Option<Uuid>,
    #[serde(default)]
    pub trips: Option<Vec<Trip>>,
}

impl TravelCostRequest {
    pub fn validate(&self) -> Result<()> {
        check_trips(self.trips.as_deref().unwrap_or_default())
    }
}

fn default_years() -> i32 {
    5
}

fn default_escalation() -> String {
    crate::models::quote::DEFAULT_ESCALATION.to_string()
}

/// Request to project a contract over several years
#[derive(Debug, Deserialize)]
pub struct MultiYearProjectionRequest {
    pub saas_monthly: Decimal,
    pub setup_total: Decimal,
    #[serde(default = "default_years", deserialize_with = "form::int")]
    pub projection_years: i32,
    #[serde(default = "default_escalation")]
    pub escalation_model: String,
    #[serde(default)]
    pub level_loading_enabled: bool,
    #[serde(default)]
    pub teller_payments_enabled: bool,
    #[serde(default)]
    pub discount_config: Option<serde_json::Value>,
}

impl MultiYearProjectionRequest {
    pub fn validate(&self) -> Result<()> {
        check_amount("saas_monthly", self.saas_monthly)?;
        check_amount("setup_total", self.setup_total)?;
        check_discount_config(self.discount_config.as_ref())?;
        if !(1..=10).contains(&self.projection_years) {
            return Err(AppError::validation(
                "projection_years must be between 1 and 10",
            ));
        }
        Ok(())
    }
}

/// Request to calculate a referral commission
#[derive(Debug, Deserialize)]
pub struct ReferralCommissionRequest {
    pub setup_total: Decimal,
    #[serde(default, deserialize_with = "form::opt_decimal")]
    pub referral_rate: Option<Decimal>,
}

impl ReferralCommissionRequest {
    pub fn validate(&self) -> Result<()> {
        check_amount("setup_total", self.setup_total)?;
        form::check_percent("referral_rate", self.referral_rate)
    }
}

// ==================== SaaS configuration ====================

fn default_base_product() -> String {
    "standard".to_string()
}

fn default_true() -> bool {
    true
}

/// A named third-party system to integrate with
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntegrationRequest {
    #[serde(default)]
    pub system_name: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default = "default_true")]
    pub is_new: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntegrationsRequest {
    #[serde(default)]
    pub bidirectional: Vec<IntegrationRequest>,
    #[serde(default)]
    pub payment_import: Vec<IntegrationRequest>,
}

/// Parameters for the configuration-driven quote builder.
///
/// The whole request (re-serialized) is the context that selection rules
/// and price formulas read, so module volumes are addressed as
/// `modules.<code>.<field>`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigureRequest {
    #[serde(default = "default_base_product")]
    pub base_product: String,
    #[serde(default, deserialize_with = "form::int")]
    pub additional_users: i32,
    #[serde(default)]
    pub modules: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub integrations: IntegrationsRequest,
}

impl ConfigureRequest {
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_product.to_lowercase().as_str(), "standard" | "basic") {
            return Err(AppError::validation(
                "base_product must be 'standard' or 'basic'",
            ));
        }
        if !(0..=999).contains(&self.additional_users) {
            return Err(AppError::validation(
                "additional_users must be between 0 and 999",
            ));
        }
        for (code, params) in &self.modules {
            let fields = params
                .as_object()
                .ok_or_else(|| AppError::validation("each module entry must be an object"))?;
            for (field, value) in fields {
                if value.is_boolean() {
                    continue;
                }
                if let Some(n) = form::value_to_decimal(value) {
                    check_amount(&format!("modules.{}.{}", code, field), n)?;
                }
            }
        }
        Ok(())
    }
}
