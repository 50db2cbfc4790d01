//! Serde helpers for console form input.
//!
//! The console posts whatever its inputs hold: numbers may arrive as JSON
//! numbers or as numeric strings, and a cleared optional input arrives as
//! `""`. These helpers coerce numerics and turn blank optionals into `None`.
//!
//! PATCH bodies use the `patch_*` variants, which yield `Option<Option<T>>`:
//! `None` when the field is absent, `Some(None)` when it was sent as null or
//! blank, `Some(Some(v))` otherwise. Pair them with `#[serde(default)]`.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
};
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{de, de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::error::AppError;

/// `axum::Json` body whose rejections answer with the usual `{"detail"}` error
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

/// Convert a JSON scalar into a Decimal (numbers and numeric strings).
pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<Decimal>()
                .ok()
                .or_else(|| Decimal::from_scientific(s).ok())
        }
        Value::Bool(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn to_decimal<E: de::Error>(value: Value) -> Result<Decimal, E> {
    value_to_decimal(&value)
        .ok_or_else(|| E::custom(format!("cannot parse {} as a decimal", value)))
}

fn to_i32<E: de::Error>(value: Value) -> Result<i32, E> {
    let dec = to_decimal::<E>(value)?;
    if !dec.fract().is_zero() {
        return Err(E::custom(format!("expected a whole number, got {}", dec)));
    }
    dec.to_i32()
        .ok_or_else(|| E::custom(format!("{} is out of range", dec)))
}

fn to_date<E: de::Error>(value: Value) -> Result<NaiveDate, E> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            // Accept "2025-01-01" and "2025-01-01T00:00:00"
            let date_part = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map_err(|e| E::custom(format!("invalid date '{}': {}", s, e)))
        }
        other => Err(E::custom(format!("expected a date string, got {}", other))),
    }
}

fn to_string<E: de::Error>(value: Value) -> Result<String, E> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(E::custom(format!("expected a string, got {}", other))),
    }
}

/// Required integer given as a number or a numeric string
pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    to_i32(Value::deserialize(d)?)
}

/// Optional decimal; blank becomes `None`
pub fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
    let v = Value::deserialize(d)?;
    if is_blank(&v) {
        return Ok(None);
    }
    to_decimal(v).map(Some)
}

/// Optional integer; blank becomes `None`
pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    let v = Value::deserialize(d)?;
    if is_blank(&v) {
        return Ok(None);
    }
    to_i32(v).map(Some)
}

/// Optional text; blank becomes `None`
pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Value::deserialize(d)?;
    if is_blank(&v) {
        return Ok(None);
    }
    to_string(v).map(Some)
}

/// Optional date; blank becomes `None`
pub fn opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    let v = Value::deserialize(d)?;
    if is_blank(&v) {
        return Ok(None);
    }
    to_date(v).map(Some)
}

pub fn patch_decimal<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Option<Decimal>>, D::Error> {
    opt_decimal(d).map(Some)
}

pub fn patch_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<i32>>, D::Error> {
    opt_int(d).map(Some)
}

pub fn patch_string<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Option<String>>, D::Error> {
    opt_string(d).map(Some)
}

pub fn patch_date<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Option<NaiveDate>>, D::Error> {
    opt_date(d).map(Some)
}

/// Nullable JSON document (object/array); `null` clears it
pub fn patch_json<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<Value>>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(Some(if v.is_null() { None } else { Some(v) }))
}

/// Nullable id; blank clears it
pub fn patch_uuid<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Option<uuid::Uuid>>, D::Error> {
    let v = Value::deserialize(d)?;
    if is_blank(&v) {
        return Ok(Some(None));
    }
    match v {
        Value::String(s) => s
            .trim()
            .parse::<uuid::Uuid>()
            .map(|id| Some(Some(id)))
            .map_err(|e| de::Error::custom(format!("invalid id '{}': {}", s, e))),
        other => Err(de::Error::custom(format!("expected an id, got {}", other))),
    }
}

/// Optional id; blank becomes `None`
pub fn opt_uuid<'de, D: Deserializer<'de>>(d: D) -> Result<Option<uuid::Uuid>, D::Error> {
    patch_uuid(d).map(|v| v.flatten())
}

/// Largest money amount or volume accepted from a request
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

/// Amount in 0..=MAX_AMOUNT
pub fn check_amount(field: &str, value: Decimal) -> crate::error::Result<()> {
    if value < Decimal::ZERO || value > MAX_AMOUNT {
        return Err(crate::error::AppError::validation(format!(
            "{} must be between 0 and {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(())
}

/// Optional non-negative percentage in 0..=100
pub fn check_percent(field: &str, value: Option<Decimal>) -> crate::error::Result<()> {
    if let Some(v) = value {
        if v < Decimal::ZERO || v > Decimal::ONE_HUNDRED {
            return Err(crate::error::AppError::validation(format!(
                "{} must be between 0 and 100",
                field
            )));
        }
    }
    Ok(())
}

/// Reject strings longer than `max` characters
pub fn check_len(field: &str, value: &str, max: usize) -> crate::error::Result<()> {
    if value.chars().count() > max {
        return Err(crate::error::AppError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Reject blank required strings
pub fn check_required(field: &str, value: &str) -> crate::error::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::error::AppError::validation(format!(
            "{} is required",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct CreateForm {
        #[serde(deserialize_with = "int")]
        sort_order: i32,
        price: Decimal,
        #[serde(default, deserialize_with = "opt_decimal")]
        fixed_price: Option<Decimal>,
        #[serde(default, deserialize_with = "opt_int")]
        tier2_min: Option<i32>,
        #[serde(default, deserialize_with = "opt_string")]
        description: Option<String>,
        #[serde(default, deserialize_with = "opt_date")]
        expiration_date: Option<NaiveDate>,
    }

    #[derive(Debug, Deserialize)]
    struct PatchForm {
        #[serde(default, deserialize_with = "patch_decimal")]
        fixed_price: Option<Option<Decimal>>,
        #[serde(default, deserialize_with = "patch_string")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let form: CreateForm = serde_json::from_value(json!({
            "sort_order": "3",
            "price": "2950.00",
            "fixed_price": "64400",
            "tier2_min": "1001"
        }))
        .unwrap();

        assert_eq!(form.sort_order, 3);
        assert_eq!(form.price, dec!(2950.00));
        assert_eq!(form.fixed_price, Some(dec!(64400)));
        assert_eq!(form.tier2_min, Some(1001));
    }

    #[test]
    fn test_plain_numbers_still_work() {
        let form: CreateForm = serde_json::from_value(json!({
            "sort_order": 1,
            "price": 60.5,
            "fixed_price": 12,
        }))
        .unwrap();

        assert_eq!(form.sort_order, 1);
        assert_eq!(form.price, dec!(60.5));
        assert_eq!(form.fixed_price, Some(dec!(12)));
    }

    #[test]
    fn test_empty_optionals_become_none() {
        let form: CreateForm = serde_json::from_value(json!({
            "sort_order": 0,
            "price": "1",
            "fixed_price": "",
            "tier2_min": "  ",
            "description": "",
            "expiration_date": ""
        }))
        .unwrap();

        assert_eq!(form.fixed_price, None);
        assert_eq!(form.tier2_min, None);
        assert_eq!(form.description, None);
        assert_eq!(form.expiration_date, None);
    }

    #[test]
    fn test_garbage_number_is_rejected() {
        let result: std::result::Result<CreateForm, _> = serde_json::from_value(json!({
            "sort_order": "abc",
            "price": "1"
        }));
        assert!(result.is_err());

        let result: std::result::Result<CreateForm, _> = serde_json::from_value(json!({
            "sort_order": "1.5",
            "price": "1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_date_accepts_datetime_prefix() {
        let form: CreateForm = serde_json::from_value(json!({
            "sort_order": 0,
            "price": 1,
            "expiration_date": "2026-12-31T00:00:00"
        }))
        .unwrap();
        assert_eq!(
            form.expiration_date,
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
    }

    #[test]
    fn test_patch_distinguishes_absent_from_cleared() {
        let absent: PatchForm = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.fixed_price, None);
        assert_eq!(absent.description, None);

        let cleared: PatchForm =
            serde_json::from_value(json!({"fixed_price": null, "description": ""})).unwrap();
        assert_eq!(cleared.fixed_price, Some(None));
        assert_eq!(cleared.description, Some(None));

        let set: PatchForm =
            serde_json::from_value(json!({"fixed_price": "9.99", "description": "x"})).unwrap();
        assert_eq!(set.fixed_price, Some(Some(dec!(9.99))));
        assert_eq!(set.description, Some(Some("x".to_string())));
    }

    #[test]
    fn test_value_to_decimal() {
        assert_eq!(value_to_decimal(&json!(75000)), Some(dec!(75000)));
        assert_eq!(value_to_decimal(&json!("0.25")), Some(dec!(0.25)));
        assert_eq!(value_to_decimal(&json!(true)), Some(dec!(1)));
        assert_eq!(value_to_decimal(&json!(null)), None);
        assert_eq!(value_to_decimal(&json!({"a": 1})), None);
    }

    #[test]
    fn test_checks() {
        assert!(check_percent("rate", Some(dec!(100))).is_ok());
        assert!(check_percent("rate", Some(dec!(100.01))).is_err());
        assert!(check_percent("rate", None).is_ok());
        assert!(check_len("VersionNumber", "2025.1", 20).is_ok());
        assert!(check_len("VersionNumber", &"x".repeat(21), 20).is_err());
        assert!(check_required("Name", "  ").is_err());
        assert!(check_amount("setup_total", MAX_AMOUNT).is_ok());
        assert!(check_amount("setup_total", MAX_AMOUNT + dec!(0.01)).is_err());
        assert!(check_amount("setup_total", dec!(-1)).is_err());
    }
}
