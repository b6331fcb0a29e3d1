//! Defensive parsing of Gamma API market payloads into [`Market`].
//!
//! Upstream JSON is inconsistent: numeric fields arrive as strings or
//! numbers, outcome data is itself JSON-encoded inside string fields,
//! and optional fields are omitted entirely rather than `null`.
//! [`parse_market`] is total: any input it can't make sense of yields
//! [`Market::fallback`] rather than propagating an error or panicking.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{Market, MarketId};

#[derive(Debug, Deserialize)]
struct GammaMarketRaw {
    #[serde(alias = "conditionId")]
    condition_id: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    active: bool,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    outcomes: Option<String>,
    #[serde(default, alias = "outcomePrices")]
    outcome_prices: Option<String>,
    #[serde(default, alias = "clobTokenIds")]
    clob_token_ids: Option<String>,
    #[serde(default, alias = "volumeNum", deserialize_with = "lenient_decimal_opt")]
    volume: Option<Decimal>,
    #[serde(default, alias = "liquidityNum", deserialize_with = "lenient_decimal_opt")]
    liquidity: Option<Decimal>,
    #[serde(default, alias = "endDate")]
    end_date: Option<Value>,
    #[serde(default, alias = "tickSize", deserialize_with = "lenient_decimal_opt")]
    tick_size: Option<Decimal>,
}

fn lenient_decimal_opt<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| any_decimal(&v)))
}

/// Coerce a JSON value that may be a string or a number into a
/// [`Decimal`]. Anything else (including malformed numeric strings)
/// yields `None`.
fn any_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        _ => None,
    }
}

/// Parse a JSON-encoded list of strings stored inside a string field
/// (`outcomes`, `outcomePrices`, `clobTokenIds`). Logs and returns
/// `None` on malformed input rather than propagating an error.
fn parse_json_string_list(raw: Option<&str>, field: &str, condition_id: &str) -> Option<Vec<String>> {
    let raw = raw?;
    serde_json::from_str::<Vec<String>>(raw)
        .map_err(|err| {
            debug!(%field, %condition_id, error = %err, raw, "failed to parse JSON-encoded list field");
        })
        .ok()
}

/// Accept RFC3339, unix-seconds, or `null`/missing for a close-time
/// field.
fn parse_close_time(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

/// Parse one Gamma API market payload. Total: never panics, never
/// returns an error. `fallback_id` is used verbatim if the payload
/// can't even be shape-matched into a market record.
#[must_use]
pub fn parse_market(raw: &Value, fallback_id: MarketId) -> Market {
    let parsed = match serde_json::from_value::<GammaMarketRaw>(raw.clone()) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(id = %fallback_id, error = %err, "market payload did not match the expected shape, using fallback");
            return Market::fallback(fallback_id);
        }
    };

    let outcomes = parse_json_string_list(parsed.outcomes.as_deref(), "outcomes", &parsed.condition_id)
        .unwrap_or_else(|| vec!["Yes".to_string(), "No".to_string()]);
    let outcome_prices =
        parse_json_string_list(parsed.outcome_prices.as_deref(), "outcomePrices", &parsed.condition_id).unwrap_or_default();
    let token_ids =
        parse_json_string_list(parsed.clob_token_ids.as_deref(), "clobTokenIds", &parsed.condition_id).unwrap_or_default();

    let mut prices = HashMap::new();
    for (outcome, price_str) in outcomes.iter().zip(outcome_prices.iter()) {
        if let Some(price) = any_decimal(&Value::String(price_str.clone())) {
            prices.insert(outcome.clone(), price);
        }
    }

    let mut metadata = HashMap::new();
    metadata.insert("condition_id".to_string(), Value::String(parsed.condition_id.clone()));
    if !token_ids.is_empty() {
        metadata.insert(
            "clob_token_ids".to_string(),
            serde_json::to_value(&token_ids).unwrap_or(Value::Null),
        );
    }
    if !parsed.active {
        metadata.insert("active".to_string(), Value::Bool(false));
    }

    Market {
        id: MarketId::new(parsed.condition_id),
        question: parsed.question.unwrap_or_default(),
        outcomes,
        close_time: parse_close_time(parsed.end_date.as_ref()),
        volume: parsed.volume.unwrap_or(Decimal::ZERO),
        liquidity: parsed.liquidity.unwrap_or(Decimal::ZERO),
        prices,
        metadata,
        tick_size: parsed.tick_size.unwrap_or(dec!(0.01)),
        description: parsed.description.unwrap_or_default(),
        closed: parsed.closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_well_formed_gamma_payload() {
        let raw = json!({
            "conditionId": "0xabc123",
            "question": "Will X happen?",
            "active": true,
            "closed": false,
            "outcomes": "[\"Yes\", \"No\"]",
            "outcomePrices": "[\"0.65\", \"0.35\"]",
            "clobTokenIds": "[\"token-yes\", \"token-no\"]",
            "volumeNum": 1081783.60,
            "liquidityNum": 14854.96,
            "endDate": "2026-01-01T00:00:00Z"
        });
        let market = parse_market(&raw, MarketId::new("fallback"));

        assert_eq!(market.id, MarketId::new("0xabc123"));
        assert_eq!(market.outcomes, vec!["Yes".to_string(), "No".to_string()]);
        assert_eq!(market.prices.get("Yes"), Some(&dec!(0.65)));
        assert_eq!(market.prices.get("No"), Some(&dec!(0.35)));
        assert!(market.close_time.is_some());
        assert!(!market.closed);
    }

    #[test]
    fn tolerates_numeric_volume_and_liquidity_as_plain_numbers() {
        let raw = json!({
            "conditionId": "0xdef",
            "active": true,
            "closed": false,
            "volumeNum": 500,
            "liquidityNum": "250.5"
        });
        let market = parse_market(&raw, MarketId::new("fallback"));
        assert_eq!(market.volume, dec!(500));
        assert_eq!(market.liquidity, dec!(250.5));
    }

    #[test]
    fn missing_outcome_data_falls_back_to_yes_no() {
        let raw = json!({"conditionId": "0xghi", "active": true, "closed": false});
        let market = parse_market(&raw, MarketId::new("fallback"));
        assert_eq!(market.outcomes, vec!["Yes".to_string(), "No".to_string()]);
        assert_eq!(market.tick_size, dec!(0.01));
    }

    #[test]
    fn close_time_accepts_unix_seconds() {
        let raw = json!({"conditionId": "0xjkl", "active": true, "closed": false, "endDate": 1_735_689_600});
        let market = parse_market(&raw, MarketId::new("fallback"));
        assert!(market.close_time.is_some());
    }

    #[test]
    fn a_completely_malformed_payload_yields_the_fallback_market() {
        let raw = json!("not even an object");
        let market = parse_market(&raw, MarketId::new("broken"));
        assert!(market.closed);
        assert!(market.outcomes.is_empty());
        assert_eq!(market.id, MarketId::new("broken"));
    }

    #[test]
    fn malformed_json_encoded_outcome_lists_are_skipped_not_panicked_on() {
        let raw = json!({
            "conditionId": "0xmno",
            "active": true,
            "closed": false,
            "outcomes": "not-json",
        });
        let market = parse_market(&raw, MarketId::new("fallback"));
        assert_eq!(market.outcomes, vec!["Yes".to_string(), "No".to_string()]);
    }
}
