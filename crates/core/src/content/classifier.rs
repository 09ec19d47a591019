use serde::Serialize;
use serde_json::Value;

use crate::domain::recommendation::RecommendationBundle;
use crate::domain::slot_state::SlotState;

/// Structured text that matched no known schema. `value` is absent when the text
/// did not decode at all.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Unclassified {
    pub raw: String,
    pub value: Option<Value>,
}

/// Typed interpretation of one structured span.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    SlotState(SlotState),
    Recommendation(RecommendationBundle),
    Unclassified(Unclassified),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::SlotState(_) => "slot_state",
            Payload::Recommendation(_) => "recommendation",
            Payload::Unclassified(_) => "unclassified",
        }
    }

    pub fn as_slot_state(&self) -> Option<&SlotState> {
        match self {
            Payload::SlotState(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_recommendation(&self) -> Option<&RecommendationBundle> {
        match self {
            Payload::Recommendation(bundle) => Some(bundle),
            _ => None,
        }
    }
}

/// Decodes `raw` and picks a payload type from the shape of the value.
///
/// A `products` array makes a recommendation bundle. Object `slots`, object
/// `eligibility` and a boolean `meta.user_uncertain` together make a slot state.
/// Anything else, including text that is not JSON, is [`Payload::Unclassified`].
pub fn classify(raw: &str) -> Payload {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => classify_value(raw, value),
        Err(_) => Payload::Unclassified(Unclassified { raw: raw.to_string(), value: None }),
    }
}

pub fn classify_value(raw: &str, value: Value) -> Payload {
    if is_recommendation_shape(&value) {
        if let Ok(bundle) = serde_json::from_value::<RecommendationBundle>(value.clone()) {
            return Payload::Recommendation(bundle);
        }
    } else if is_slot_state_shape(&value) {
        if let Ok(state) = serde_json::from_value::<SlotState>(value.clone()) {
            return Payload::SlotState(state);
        }
    }

    Payload::Unclassified(Unclassified { raw: raw.to_string(), value: Some(value) })
}

fn is_recommendation_shape(value: &Value) -> bool {
    value.get("products").is_some_and(Value::is_array)
}

fn is_slot_state_shape(value: &Value) -> bool {
    value.get("slots").is_some_and(Value::is_object)
        && value.get("eligibility").is_some_and(Value::is_object)
        && value
            .get("meta")
            .and_then(|meta| meta.get("user_uncertain"))
            .is_some_and(Value::is_boolean)
}
