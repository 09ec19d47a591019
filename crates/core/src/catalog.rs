//! Canonical product records for catalog rows of unstable upstream shape.
//!
//! Rows reach the advisor from the public product feed, from the local product
//! database and from earlier model output, each with its own field names. They all
//! pass through [`normalize_product`] before anything else reads them.

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::lenient;

const CODE_KEYS: [&str; 3] = ["fin_prdt_cd", "product_code", "id"];
const BANK_KEYS: [&str; 3] = ["kor_co_nm", "bank_name", "bank"];
const NAME_KEYS: [&str; 3] = ["fin_prdt_nm", "product_name", "name"];
const RATE_KEYS: [&str; 6] =
    ["rate", "intr_rate2", "max_rate", "avg_prft_rate", "lend_rate_min", "base_rate"];
const CONDITION_KEYS: [&str; 3] = ["spcl_cnd", "special_condition_raw", "special_condition"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub bank: String,
    pub name: String,
    /// Headline rate in percent: the maximum rate for savings, the minimum
    /// lending rate for loans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    #[serde(default)]
    pub special_condition_raw: String,
}

impl CatalogProduct {
    pub fn new(bank: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: None,
            bank: bank.into(),
            name: name.into(),
            rate: None,
            special_condition_raw: String::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_special_condition(mut self, raw: impl Into<String>) -> Self {
        self.special_condition_raw = raw.into();
        self
    }

    pub fn rate_or_zero(&self) -> Decimal {
        self.rate.unwrap_or(Decimal::ZERO)
    }

    /// Rate as shown to the user; empty when the feed had none.
    pub fn rate_label(&self) -> String {
        self.rate.map(|rate| rate.normalize().to_string()).unwrap_or_default()
    }

    fn dedupe_key(&self) -> DedupeKey {
        match &self.code {
            Some(code) => DedupeKey::Code(code.clone()),
            None => DedupeKey::BankAndName(self.bank.clone(), self.name.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum DedupeKey {
    Code(String),
    BankAndName(String, String),
}

/// Maps one upstream row to a [`CatalogProduct`]. Rows without a product name are
/// dropped.
pub fn normalize_product(row: &Value) -> Option<CatalogProduct> {
    let name = lenient::first_text(row, &NAME_KEYS).filter(|name| !name.trim().is_empty())?;

    Some(CatalogProduct {
        code: lenient::first_text(row, &CODE_KEYS).filter(|code| !code.trim().is_empty()),
        bank: lenient::first_text(row, &BANK_KEYS).unwrap_or_default(),
        name,
        rate: RATE_KEYS.iter().find_map(|key| row.get(*key).and_then(decimal_from_value)),
        special_condition_raw: lenient::first_text(row, &CONDITION_KEYS).unwrap_or_default(),
    })
}

pub fn normalize_products(rows: &[Value]) -> Vec<CatalogProduct> {
    dedupe_products(rows.iter().filter_map(normalize_product).collect())
}

/// Keeps the first occurrence of each product, identified by product code when
/// present and by bank plus name otherwise.
pub fn dedupe_products(products: Vec<CatalogProduct>) -> Vec<CatalogProduct> {
    let mut seen = HashSet::new();
    products.into_iter().filter(|product| seen.insert(product.dedupe_key())).collect()
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(raw) => raw.trim().trim_end_matches('%').replace(',', ""),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{dedupe_products, normalize_product, normalize_products, CatalogProduct};

    #[test]
    fn public_feed_spelling_is_normalized() {
        let product = normalize_product(&json!({
            "fin_prdt_cd": "WR0001",
            "kor_co_nm": "우리은행",
            "fin_prdt_nm": "WON적금",
            "intr_rate2": 4.1,
            "spcl_cnd": "급여이체 시 0.3%p"
        }))
        .expect("product");

        assert_eq!(product.code.as_deref(), Some("WR0001"));
        assert_eq!(product.bank, "우리은행");
        assert_eq!(product.name, "WON적금");
        assert_eq!(product.rate, Some(Decimal::from_str("4.1").expect("decimal")));
        assert_eq!(product.special_condition_raw, "급여이체 시 0.3%p");
    }

    #[test]
    fn database_spelling_and_string_rates_are_normalized() {
        let product = normalize_product(&json!({
            "bank_name": "국민은행",
            "product_name": "KB 청년적금",
            "max_rate": "5.5%",
            "special_condition": ""
        }))
        .expect("product");

        assert_eq!(product.code, None);
        assert_eq!(product.rate_label(), "5.5");
        assert!(product.special_condition_raw.is_empty());
    }

    #[test]
    fn loan_rows_fall_back_to_minimum_lending_rate() {
        let product = normalize_product(&json!({
            "bank": "신한은행",
            "name": "전세대출",
            "lend_rate_min": 3.25
        }))
        .expect("product");
        assert_eq!(product.rate_label(), "3.25");
    }

    #[test]
    fn rows_without_a_name_are_dropped() {
        assert!(normalize_product(&json!({"bank": "우리은행", "rate": 3.0})).is_none());
        assert!(normalize_product(&json!({"name": "  "})).is_none());
        assert!(normalize_product(&json!("not a row")).is_none());
    }

    #[test]
    fn unusable_rates_are_absent() {
        let product = normalize_product(&json!({"name": "X", "rate": "문의"})).expect("product");
        assert_eq!(product.rate, None);
        assert_eq!(product.rate_label(), "");
    }

    #[test]
    fn dedupe_prefers_code_then_bank_and_name() {
        let products = vec![
            CatalogProduct::new("A", "적금1").with_code("C1"),
            CatalogProduct::new("B", "다른이름").with_code("C1"),
            CatalogProduct::new("A", "적금2"),
            CatalogProduct::new("A", "적금2"),
            CatalogProduct::new("A", "적금2").with_code("C2"),
        ];

        let deduped = dedupe_products(products);
        let names: Vec<_> = deduped.iter().map(|product| product.name.as_str()).collect();
        assert_eq!(names, vec!["적금1", "적금2", "적금2"]);
    }

    #[test]
    fn normalize_products_skips_and_dedupes() {
        let rows = vec![
            json!({"fin_prdt_cd": "1", "fin_prdt_nm": "A"}),
            json!({"fin_prdt_cd": "1", "fin_prdt_nm": "A"}),
            json!({"bank": "x"}),
        ];
        assert_eq!(normalize_products(&rows).len(), 1);
    }
}
