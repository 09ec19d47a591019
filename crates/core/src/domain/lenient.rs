//! Tolerant field readers for payloads produced by a language model.
//!
//! Structured payloads arrive with whatever typing the backend chose: amounts as
//! `500000`, `500000.0` or `"500000"`, rates as numbers or strings. Once a payload
//! has matched a known shape these readers never reject a field; unusable values
//! become `None` instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::slot_state::TriState;

pub(crate) fn amount<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(amount_from_value))
}

pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_from_value))
}

pub(crate) fn tri_state<'de, D>(deserializer: D) -> Result<TriState, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(TriState::from_value).unwrap_or_default())
}

pub(crate) fn tri_state_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, TriState>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Object(entries)) = value else {
        return Ok(BTreeMap::new());
    };

    Ok(entries.iter().map(|(key, value)| (key.clone(), TriState::from_value(value))).collect())
}

pub(crate) fn amount_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => {
            if let Some(integer) = number.as_u64() {
                return Some(integer);
            }
            number.as_f64().and_then(whole_won)
        }
        Value::String(raw) => {
            let cleaned = raw.trim().replace(',', "");
            if let Ok(integer) = cleaned.parse::<u64>() {
                return Some(integer);
            }
            cleaned.parse::<f64>().ok().and_then(whole_won)
        }
        _ => None,
    }
}

pub(crate) fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// First key in `keys` whose value reads as text.
pub(crate) fn first_text(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(text_from_value))
}

/// Nearest whole won, or `None` when the value is negative, not finite, or past
/// what a `u64` holds.
pub(crate) fn whole_won(value: f64) -> Option<u64> {
    let rounded = value.round();
    (rounded.is_finite() && rounded >= 0.0 && rounded < u64::MAX as f64).then(|| rounded as u64)
}
