use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::lenient;
use crate::domain::slot_state::{Eligibility, Slots};

/// One suggested product inside a [`RecommendationBundle`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_condition_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_condition_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_recommended: Option<String>,
}

impl RecommendedProduct {
    /// Reads an item from any JSON value. Non-object items yield an empty product so
    /// that one odd entry never invalidates the bundle around it.
    pub fn from_value(value: &Value) -> Self {
        Self {
            bank: lenient::first_text(value, &["bank", "kor_co_nm", "bank_name"]),
            name: lenient::first_text(value, &["name", "fin_prdt_nm", "product_name"]),
            rate: lenient::first_text(value, &["rate", "intr_rate2", "lend_rate_min"]),
            special_condition_raw: lenient::first_text(
                value,
                &["special_condition_raw", "spcl_cnd", "special_condition"],
            ),
            special_condition_summary: lenient::first_text(value, &["special_condition_summary"]),
            why_recommended: lenient::first_text(value, &["why_recommended"]),
        }
    }
}

/// Snapshot of what was known about the user when a bundle was produced.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedState {
    #[serde(default)]
    pub slots: Slots,
    #[serde(default)]
    pub eligibility: Eligibility,
}

/// Product suggestions for one assistant turn. `products` is mandatory; a payload
/// without that array is not a bundle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationBundle {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(deserialize_with = "products")]
    pub products: Vec<RecommendedProduct>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "collected", skip_serializing_if = "Option::is_none")]
    pub collected: Option<CollectedState>,
}

impl RecommendationBundle {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

fn products<'de, D>(deserializer: D) -> Result<Vec<RecommendedProduct>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Vec::<Value>::deserialize(deserializer)?;
    Ok(items.iter().map(RecommendedProduct::from_value).collect())
}

fn collected<'de, D>(deserializer: D) -> Result<Option<CollectedState>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.filter(Value::is_object).and_then(|value| serde_json::from_value(value).ok()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::RecommendationBundle;

    #[test]
    fn empty_products_array_is_a_valid_bundle() {
        let bundle: RecommendationBundle =
            serde_json::from_value(json!({"products": []})).expect("bundle");
        assert!(bundle.is_empty());
        assert!(bundle.product_type.is_none());
    }

    #[test]
    fn missing_products_array_is_rejected() {
        let result = serde_json::from_value::<RecommendationBundle>(json!({"reason": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn numeric_rates_and_upstream_spellings_are_normalized() {
        let bundle: RecommendationBundle = serde_json::from_value(json!({
            "product_type": "적금",
            "products": [
                {"kor_co_nm": "우리은행", "fin_prdt_nm": "WON적금", "rate": 3.5},
                "stray entry"
            ]
        }))
        .expect("bundle");

        assert_eq!(bundle.products.len(), 2);
        assert_eq!(bundle.products[0].bank.as_deref(), Some("우리은행"));
        assert_eq!(bundle.products[0].name.as_deref(), Some("WON적금"));
        assert_eq!(bundle.products[0].rate.as_deref(), Some("3.5"));
        assert_eq!(bundle.products[1], Default::default());
    }

    #[test]
    fn collected_state_round_trips_with_the_bundle() {
        let bundle: RecommendationBundle = serde_json::from_value(json!({
            "products": [],
            "collected": {
                "slots": {"monthly_amount": 500000},
                "eligibility": {"youth": "yes"}
            }
        }))
        .expect("bundle");

        let collected = bundle.collected.expect("collected");
        assert_eq!(collected.slots.monthly_amount, Some(500_000));
        assert_eq!(collected.eligibility.youth.as_str(), "yes");
    }
}
