//! Share links carrying a recommendation bundle.
//!
//! A token is the URL-safe base64 of `{"v": 1, "created_at": <RFC 3339>, "data": <bundle>}`.
//! Older links hold the bundle itself without the envelope and are still accepted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::content::classifier::{classify_value, Payload};
use crate::domain::recommendation::RecommendationBundle;

pub const SHARE_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share token is empty")]
    Empty,
    #[error("share token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share token does not hold JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("shared data is not a recommendation bundle")]
    NotABundle,
}

impl ShareError {
    /// The only thing the user is told, whatever went wrong.
    pub fn user_message(&self) -> &'static str {
        "유효하지 않은 공유 링크예요. 링크를 다시 확인해 주세요."
    }
}

/// A decoded share link.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SharedRecommendation {
    /// Envelope version; absent for bare-bundle links.
    pub version: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub bundle: RecommendationBundle,
}

pub fn encode(bundle: &RecommendationBundle) -> Result<String, ShareError> {
    encode_at(bundle, Utc::now())
}

pub fn encode_at(bundle: &RecommendationBundle, created_at: DateTime<Utc>) -> Result<String, ShareError> {
    let envelope = json!({
        "v": SHARE_VERSION,
        "created_at": created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "data": bundle,
    });
    let bytes = serde_json::to_vec(&envelope)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Reads a share token. Padding and the standard base64 alphabet are tolerated.
pub fn decode(token: &str) -> Result<SharedRecommendation, ShareError> {
    let normalized: String = token
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|ch| match ch {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    if normalized.is_empty() {
        return Err(ShareError::Empty);
    }

    let bytes = URL_SAFE_NO_PAD.decode(normalized.as_bytes())?;
    let value: Value = serde_json::from_slice(&bytes)?;

    let shared = if is_envelope(&value) {
        let version = value.get("v").and_then(Value::as_u64);
        let created_at = value
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|timestamp| timestamp.with_timezone(&Utc));
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        SharedRecommendation { version, created_at, bundle: bundle_from(data)? }
    } else {
        SharedRecommendation { version: None, created_at: None, bundle: bundle_from(value)? }
    };

    debug!(
        event_name = "share.link.decoded",
        version = shared.version.unwrap_or_default(),
        products = shared.bundle.products.len(),
        "share link decoded"
    );
    Ok(shared)
}

fn is_envelope(value: &Value) -> bool {
    value.get("data").is_some() && value.get("products").is_none()
}

fn bundle_from(value: Value) -> Result<RecommendationBundle, ShareError> {
    let raw = value.to_string();
    match classify_value(&raw, value) {
        Payload::Recommendation(bundle) => Ok(bundle),
        _ => Err(ShareError::NotABundle),
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
    use base64::Engine;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{decode, encode, encode_at, ShareError};
    use crate::domain::recommendation::{RecommendationBundle, RecommendedProduct};

    fn bundle() -> RecommendationBundle {
        RecommendationBundle {
            product_type: Some("적금".to_string()),
            reason: Some("정기적으로 모으는 목적".to_string()),
            products: vec![RecommendedProduct {
                bank: Some("우리은행".to_string()),
                name: Some("WON적금".to_string()),
                rate: Some("4.1".to_string()),
                ..RecommendedProduct::default()
            }],
            notes: None,
            collected: None,
        }
    }

    #[test]
    fn encoded_link_decodes_to_the_same_bundle() {
        let created_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().expect("timestamp");
        let token = encode_at(&bundle(), created_at).expect("encode");

        assert!(!token.contains('='));
        assert!(!token.contains('+') && !token.contains('/'));

        let shared = decode(&token).expect("decode");
        assert_eq!(shared.version, Some(1));
        assert_eq!(shared.created_at, Some(created_at));
        assert_eq!(shared.bundle, bundle());
    }

    #[test]
    fn bare_bundle_links_are_accepted() {
        let raw = json!({"products": [{"bank": "국민은행"}]}).to_string();
        let token = URL_SAFE_NO_PAD.encode(raw);

        let shared = decode(&token).expect("decode");
        assert_eq!(shared.version, None);
        assert_eq!(shared.bundle.products[0].bank.as_deref(), Some("국민은행"));
    }

    #[test]
    fn padded_standard_alphabet_is_tolerated() {
        let raw = json!({"v": 1, "data": {"products": [], "notes": "??>>"}}).to_string();
        let token = STANDARD.encode(raw);

        let shared = decode(&token).expect("decode");
        assert_eq!(shared.bundle.notes.as_deref(), Some("??>>"));
        assert_eq!(shared.created_at, None);
    }

    #[test]
    fn garbage_is_an_invalid_link() {
        assert!(matches!(decode(""), Err(ShareError::Empty)));
        assert!(matches!(decode("!!!"), Err(ShareError::Base64(_))));
        assert!(matches!(decode(&URL_SAFE_NO_PAD.encode("not json")), Err(ShareError::Json(_))));

        let not_bundle = URL_SAFE_NO_PAD.encode(json!({"v": 1, "data": {"foo": 1}}).to_string());
        let error = decode(&not_bundle).expect_err("not a bundle");
        assert!(matches!(error, ShareError::NotABundle));
        assert!(error.user_message().contains("공유 링크"));
    }

    #[test]
    fn current_time_is_stamped_on_new_links() {
        let before = Utc::now();
        let shared = decode(&encode(&bundle()).expect("encode")).expect("decode");
        let stamped = shared.created_at.expect("created_at");
        assert!(stamped.timestamp() >= before.timestamp() - 1);
    }
}
