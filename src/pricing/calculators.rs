//! Core pricing calculation functions.
//!
//! Pure functions for quote math - no database access. Callers load the
//! catalog rows and rule documents and pass them in.

use rust_decimal::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use crate::form::value_to_decimal;
use crate::models::{QuoteVersion, SaasProduct, TravelZone};
use crate::pricing::expr;
use crate::pricing::responses::{
    ComplexityFactorResponse, DiscountResponse, MultiYearProjectionResponse,
    ReferralCommissionResponse, TravelCostResponse, TripCostDetail, YearProjection,
};
use crate::pricing::rules::lookup;

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use teller_quoter::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

fn hundred() -> Decimal {
    Decimal::ONE_HUNDRED
}

// ==================== Tier pricing ====================

/// Monthly price of a SaaS product for a usage quantity.
///
/// A band matches when `min <= quantity` and `quantity <= max` (an absent
/// bound is open). Bands are tried in order; no match prices at Tier 1.
pub fn tier_price(product: &SaasProduct, quantity: Decimal) -> Decimal {
    product
        .tiers()
        .into_iter()
        .find(|(min, max, _)| {
            min.map_or(true, |m| quantity >= Decimal::from(m))
                && max.map_or(true, |m| quantity <= Decimal::from(m))
        })
        .map(|(_, _, price)| price)
        .unwrap_or(product.tier1_price)
}

// ==================== Discounts ====================

/// Discount settings carried on a quote version as a JSON document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscountConfig {
    pub saas_year1_pct: Decimal,
    pub saas_all_years_pct: Decimal,
    pub setup_fixed: Decimal,
    pub setup_pct: Decimal,
}

impl DiscountConfig {
    /// Read the four known keys; anything missing or non-numeric is zero
    pub fn from_value(value: Option<&Value>) -> Self {
        let field = |key: &str| {
            value
                .and_then(|v| v.get(key))
                .and_then(value_to_decimal)
                .unwrap_or(Decimal::ZERO)
        };
        Self {
            saas_year1_pct: field("saas_year1_pct"),
            saas_all_years_pct: field("saas_all_years_pct"),
            setup_fixed: field("setup_fixed"),
            setup_pct: field("setup_pct"),
        }
    }
}

/// Apply discounts: the all-years SaaS percentage first, the year-1
/// percentage on top; for setup the fixed amount first, then the percentage.
pub fn apply_discounts(
    saas_monthly: Decimal,
    setup_total: Decimal,
    discounts: &DiscountConfig,
) -> DiscountResponse {
    let twelve = Decimal::from(12);

    let saas_monthly_after = saas_monthly * (Decimal::ONE - discounts.saas_all_years_pct / hundred());
    let annual_before = saas_monthly * twelve;
    let annual_after =
        saas_monthly_after * twelve * (Decimal::ONE - discounts.saas_year1_pct / hundred());
    let saas_year1_discount_amount = annual_before - annual_after;

    let setup_after_fixed = (setup_total - discounts.setup_fixed).max(Decimal::ZERO);
    let setup_after = setup_after_fixed * (Decimal::ONE - discounts.setup_pct / hundred());
    let setup_discount_amount = setup_total - setup_after;

    DiscountResponse {
        saas_monthly_before: saas_monthly,
        saas_monthly_after,
        saas_year1_discount_amount,
        saas_all_years_discount_pct: discounts.saas_all_years_pct,
        setup_before: setup_total,
        setup_after,
        setup_discount_amount,
        total_discount_year1: saas_year1_discount_amount + setup_discount_amount,
    }
}

// ==================== Travel ====================

fn default_one() -> i32 {
    1
}

pub const MAX_TRIP_DAYS: i32 = 365;
pub const MAX_TRIP_PEOPLE: i32 = 100;

/// One on-site trip
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Trip {
    #[serde(default = "default_one")]
    pub days: i32,
    #[serde(default = "default_one")]
    pub people: i32,
}

impl Trip {
    pub fn is_valid(&self) -> bool {
        (1..=MAX_TRIP_DAYS).contains(&self.days) && (1..=MAX_TRIP_PEOPLE).contains(&self.people)
    }
}

/// Trips stored in a quote version's TravelConfig (`{"trips": [...]}`).
/// Entries that do not parse or fall outside the trip bounds are skipped.
pub fn trips_from_config(config: Option<&Value>) -> Vec<Trip> {
    config
        .and_then(|c| c.get("trips"))
        .and_then(Value::as_array)
        .map(|trips| {
            trips
                .iter()
                .filter_map(|t| serde_json::from_value::<Trip>(t.clone()).ok())
                .filter(Trip::is_valid)
                .collect()
        })
        .unwrap_or_default()
}

/// Travel cost per trip, with nights = days + 1 (arrive the evening before):
/// airfare × people + hotel × people × nights + meals × people × nights
/// + rental car × nights. Unset zone rates count as zero.
pub fn travel_cost(zone: Option<&TravelZone>, trips: &[Trip]) -> TravelCostResponse {
    let Some(zone) = zone.filter(|_| !trips.is_empty()) else {
        return TravelCostResponse {
            zone_name: None,
            trips: vec![],
            total_travel_cost: Decimal::ZERO,
        };
    };

    let airfare = zone.airfare_rate.unwrap_or_default();
    let hotel = zone.hotel_rate.unwrap_or_default();
    let meals = zone.meals_rate.unwrap_or_default();
    let vehicle = zone.rental_car_rate.unwrap_or_default();

    let details: Vec<TripCostDetail> = trips
        .iter()
        .map(|trip| {
            let nights = trip.days + 1;
            let people = Decimal::from(trip.people);
            let n = Decimal::from(nights);

            let airfare_cost = airfare * people;
            let hotel_cost = hotel * people * n;
            let per_diem_cost = meals * people * n;
            let vehicle_cost = vehicle * n;

            TripCostDetail {
                days: trip.days,
                nights,
                people: trip.people,
                airfare_cost,
                hotel_cost,
                per_diem_cost,
                vehicle_cost,
                trip_total: airfare_cost + hotel_cost + per_diem_cost + vehicle_cost,
            }
        })
        .collect();

    let total_travel_cost: Decimal = details.iter().map(|d| d.trip_total).sum();

    TravelCostResponse {
        zone_name: Some(zone.name.clone()),
        trips: details,
        total_travel_cost,
    }
}

// ==================== Multi-year projection ====================

/// Annual SaaS escalation for an escalation model; unknown models use 4 %
pub fn escalation_rate(model: &str) -> Decimal {
    match model {
        "NONE" => Decimal::ZERO,
        _ => Decimal::new(4, 2),
    }
}

#[derive(Debug, Clone)]
pub struct ProjectionInput<'a> {
    pub saas_monthly: Decimal,
    pub setup_total: Decimal,
    pub projection_years: i32,
    pub escalation_model: &'a str,
    pub level_loading_enabled: bool,
    pub teller_payments_enabled: bool,
    pub discounts: &'a DiscountConfig,
}

/// Project SaaS and setup over the contract term.
///
/// Discounts apply first, then the Teller Payments 10 % reduction. SaaS
/// escalates compound from year 2; the year-1 percentage reduces year 1
/// only; setup lands in year 1. Level loading (more than one year) adds the
/// evenly spread annual and monthly SaaS to every year.
pub fn multi_year_projection(input: &ProjectionInput) -> MultiYearProjectionResponse {
    let twelve = Decimal::from(12);
    let discounts = apply_discounts(input.saas_monthly, input.setup_total, input.discounts);

    let mut base_monthly = discounts.saas_monthly_after;
    if input.teller_payments_enabled {
        base_monthly *= Decimal::new(90, 2);
    }

    let escalation = Decimal::ONE + escalation_rate(input.escalation_model);
    let mut factor = Decimal::ONE;
    let mut years = Vec::new();
    let mut total_contract_value = Decimal::ZERO;

    for year in 1..=input.projection_years {
        if year > 1 {
            factor *= escalation;
        }

        let mut monthly = base_monthly * factor;
        let mut annual = monthly * twelve;
        if year == 1 {
            annual *= Decimal::ONE - input.discounts.saas_year1_pct / hundred();
            monthly = annual / twelve;
        }

        let setup = if year == 1 {
            discounts.setup_after
        } else {
            Decimal::ZERO
        };
        let total = annual + setup;
        total_contract_value += total;

        years.push(YearProjection {
            year,
            saas_monthly: monthly,
            saas_annual: annual,
            setup,
            travel: Decimal::ZERO,
            total,
            saas_annual_level_loaded: None,
            saas_monthly_level_loaded: None,
        });
    }

    if input.level_loading_enabled && input.projection_years > 1 {
        let total_saas: Decimal = years.iter().map(|y| y.saas_annual).sum();
        let level_annual = total_saas / Decimal::from(input.projection_years);
        let level_monthly = level_annual / twelve;
        for year in &mut years {
            year.saas_annual_level_loaded = Some(level_annual);
            year.saas_monthly_level_loaded = Some(level_monthly);
        }
    }

    MultiYearProjectionResponse {
        years,
        total_contract_value,
        escalation_model: input.escalation_model.to_string(),
        level_loading_enabled: input.level_loading_enabled,
        teller_payments_discount_applied: input.teller_payments_enabled,
    }
}

// ==================== Referral ====================

/// Commission on setup; an absent or non-positive rate pays nothing
pub fn referral_commission(setup_total: Decimal, rate: Option<Decimal>) -> ReferralCommissionResponse {
    match rate {
        Some(rate) if rate > Decimal::ZERO => ReferralCommissionResponse {
            referral_rate: rate,
            commission_amount: setup_total * rate / hundred(),
        },
        _ => ReferralCommissionResponse {
            referral_rate: Decimal::ZERO,
            commission_amount: Decimal::ZERO,
        },
    }
}

// ==================== Complexity factor ====================

fn unknown_complexity(score: Decimal, tier_name: &str) -> ComplexityFactorResponse {
    ComplexityFactorResponse {
        complexity_score: score,
        tier: "UNKNOWN".to_string(),
        tier_name: tier_name.to_string(),
        base_price: Decimal::ZERO,
        estimated_hours: 0,
        sku_code: None,
        additional_dept_count: 0,
        additional_dept_price: Decimal::ZERO,
        total_org_setup_price: Decimal::ZERO,
    }
}

fn param(params: &Value, name: &str) -> Decimal {
    lookup(params, name)
        .and_then(value_to_decimal)
        .unwrap_or(Decimal::ZERO)
}

/// Score parameters with a `weighted_sum`, `expression` or `lookup` formula
pub fn complexity_score(formula: &Value, params: &Value) -> Decimal {
    match formula
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("weighted_sum")
    {
        "weighted_sum" => formula
            .get("components")
            .and_then(Value::as_array)
            .map(|components| {
                components
                    .iter()
                    .map(|c| {
                        let name = c.get("parameter").and_then(Value::as_str).unwrap_or("");
                        let weight = c
                            .get("weight")
                            .and_then(value_to_decimal)
                            .unwrap_or(Decimal::ONE);
                        param(params, name) * weight
                    })
                    .sum::<Decimal>()
            })
            .unwrap_or_default(),
        "expression" => {
            let expression = formula
                .get("expression")
                .and_then(Value::as_str)
                .unwrap_or("0");
            let resolve = |name: &str| lookup(params, name).and_then(value_to_decimal);
            expr::evaluate(expression, &resolve).unwrap_or(Decimal::ZERO)
        }
        "lookup" => {
            let name = formula.get("parameter").and_then(Value::as_str).unwrap_or("");
            param(params, name)
        }
        _ => Decimal::ZERO,
    }
}

/// Pick the tier for a score.
///
/// The first tier with `min_score <= score <= max_score` wins (a null bound
/// is open, an absent min is 0). A score that falls in a gap between tiers
/// takes the tier with the greatest min_score not above it; a score below
/// every tier takes the first tier.
pub fn find_tier(tiers: &[Value], score: Decimal) -> Option<&Value> {
    let bound = |tier: &Value, key: &str, absent: Option<Decimal>| match tier.get(key) {
        None => absent,
        Some(v) => value_to_decimal(v),
    };
    let min_of = |tier: &Value| bound(tier, "min_score", Some(Decimal::ZERO));

    let exact = tiers.iter().find(|tier| {
        min_of(tier).map_or(true, |m| score >= m)
            && bound(tier, "max_score", None).map_or(true, |m| score <= m)
    });
    if exact.is_some() {
        return exact;
    }

    tiers
        .iter()
        .filter_map(|tier| min_of(tier).filter(|m| *m <= score).map(|m| (m, tier)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, tier)| tier)
        .or_else(|| tiers.first())
}

/// Evaluate the COMPLEXITY_FACTOR rule document for a set of parameters.
/// With no rule the result is the "Not Configured" placeholder.
pub fn evaluate_complexity(rule: Option<&Value>, params: &Value) -> ComplexityFactorResponse {
    let Some(rule) = rule else {
        return unknown_complexity(Decimal::ZERO, "Not Configured");
    };

    let score = rule
        .get("formula")
        .map(|f| complexity_score(f, params))
        .unwrap_or(Decimal::ZERO);

    let tiers = rule
        .get("tiers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let Some(tier) = find_tier(tiers, score) else {
        return unknown_complexity(score, "No Matching Tier");
    };

    let text = |key: &str| tier.get(key).and_then(Value::as_str).map(str::to_string);
    let base_price = tier
        .get("base_price")
        .and_then(value_to_decimal)
        .unwrap_or(Decimal::ZERO);

    let (additional_dept_count, additional_dept_price) = match rule.get("additional_items") {
        Some(items) if items.is_object() => {
            let source = items
                .get("source_parameter")
                .and_then(Value::as_str)
                .unwrap_or("departments");
            let first_included = items
                .get("first_included")
                .and_then(value_to_decimal)
                .unwrap_or(Decimal::ONE);
            let price_per_item = items
                .get("price_per_item")
                .and_then(value_to_decimal)
                .unwrap_or(Decimal::ZERO);
            let count = (param(params, source) - first_included)
                .max(Decimal::ZERO)
                .trunc();
            (count.to_i64().unwrap_or(0), price_per_item * count)
        }
        _ => (0, Decimal::ZERO),
    };

    ComplexityFactorResponse {
        complexity_score: score,
        tier: text("code").unwrap_or_else(|| "UNKNOWN".to_string()),
        tier_name: text("name").unwrap_or_else(|| "Unknown".to_string()),
        base_price,
        estimated_hours: tier
            .get("estimated_hours")
            .and_then(value_to_decimal)
            .and_then(|h| h.trunc().to_i64())
            .unwrap_or(0),
        sku_code: text("sku_code"),
        additional_dept_count,
        additional_dept_price,
        total_org_setup_price: base_price + additional_dept_price,
    }
}

// ==================== Quote totals ====================

/// Stored totals of a quote version
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteTotals {
    pub saas_monthly: Decimal,
    pub saas_annual_year1: Decimal,
    pub setup: Decimal,
    pub travel: Decimal,
    pub contracted: Decimal,
}

/// Totals for a version from its line sums and travel cost.
///
/// The contracted amount is the multi-year contract value under the
/// version's settings plus travel.
pub fn quote_totals(
    version: &QuoteVersion,
    saas_monthly: Decimal,
    setup: Decimal,
    travel: Decimal,
) -> QuoteTotals {
    let discounts = DiscountConfig::from_value(version.discount_config.as_ref());
    let projection = multi_year_projection(&ProjectionInput {
        saas_monthly,
        setup_total: setup,
        projection_years: version.projection_years,
        escalation_model: &version.escalation_model,
        level_loading_enabled: version.level_loading_enabled,
        teller_payments_enabled: version.teller_payments_enabled,
        discounts: &discounts,
    });

    QuoteTotals {
        saas_monthly,
        saas_annual_year1: saas_monthly * Decimal::from(12),
        setup,
        travel,
        contracted: round_money(projection.total_contract_value + travel, 2),
    }
}
