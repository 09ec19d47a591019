use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::lenient;

/// Answer to a yes/no proposition. `Unknown` means no evidence either way and is
/// never treated as `No`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    Yes,
    No,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TriState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriState::Yes => "yes",
            TriState::No => "no",
            TriState::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TriState::Unknown)
    }

    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "yes" => TriState::Yes,
                "no" => TriState::No,
                _ => TriState::Unknown,
            },
            Value::Bool(true) => TriState::Yes,
            Value::Bool(false) => TriState::No,
            _ => TriState::Unknown,
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric slots. Unset slots are omitted from the JSON rather than written as
/// `null` or `0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slots {
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub monthly_amount: Option<u64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub lump_sum: Option<u64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub income_monthly: Option<u64>,
    #[serde(default, deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub desired_amount: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotKey {
    MonthlyAmount,
    TermMonths,
    LumpSum,
    IncomeMonthly,
    DesiredAmount,
}

impl SlotKey {
    pub const ALL: [SlotKey; 5] = [
        SlotKey::MonthlyAmount,
        SlotKey::TermMonths,
        SlotKey::LumpSum,
        SlotKey::IncomeMonthly,
        SlotKey::DesiredAmount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKey::MonthlyAmount => "monthly_amount",
            SlotKey::TermMonths => "term_months",
            SlotKey::LumpSum => "lump_sum",
            SlotKey::IncomeMonthly => "income_monthly",
            SlotKey::DesiredAmount => "desired_amount",
        }
    }
}

impl Slots {
    pub fn get(&self, key: SlotKey) -> Option<u64> {
        match key {
            SlotKey::MonthlyAmount => self.monthly_amount,
            SlotKey::TermMonths => self.term_months,
            SlotKey::LumpSum => self.lump_sum,
            SlotKey::IncomeMonthly => self.income_monthly,
            SlotKey::DesiredAmount => self.desired_amount,
        }
    }

    pub fn set(&mut self, key: SlotKey, value: u64) {
        let slot = match key {
            SlotKey::MonthlyAmount => &mut self.monthly_amount,
            SlotKey::TermMonths => &mut self.term_months,
            SlotKey::LumpSum => &mut self.lump_sum,
            SlotKey::IncomeMonthly => &mut self.income_monthly,
            SlotKey::DesiredAmount => &mut self.desired_amount,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        SlotKey::ALL.iter().all(|key| self.get(*key).is_none())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EligibilityKey {
    SalaryTransfer,
    AutoTransfer,
    CardSpend,
    PrimaryBank,
    NonFace,
    Youth,
}

impl EligibilityKey {
    pub const ALL: [EligibilityKey; 6] = [
        EligibilityKey::SalaryTransfer,
        EligibilityKey::AutoTransfer,
        EligibilityKey::CardSpend,
        EligibilityKey::PrimaryBank,
        EligibilityKey::NonFace,
        EligibilityKey::Youth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityKey::SalaryTransfer => "salary_transfer",
            EligibilityKey::AutoTransfer => "auto_transfer",
            EligibilityKey::CardSpend => "card_spend",
            EligibilityKey::PrimaryBank => "primary_bank",
            EligibilityKey::NonFace => "non_face",
            EligibilityKey::Youth => "youth",
        }
    }
}

/// The six promotional conditions. Every field is always serialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    #[serde(default, deserialize_with = "lenient::tri_state")]
    pub salary_transfer: TriState,
    #[serde(default, deserialize_with = "lenient::tri_state")]
    pub auto_transfer: TriState,
    #[serde(default, deserialize_with = "lenient::tri_state")]
    pub card_spend: TriState,
    #[serde(default, deserialize_with = "lenient::tri_state")]
    pub primary_bank: TriState,
    #[serde(default, deserialize_with = "lenient::tri_state")]
    pub non_face: TriState,
    #[serde(default, deserialize_with = "lenient::tri_state")]
    pub youth: TriState,
}

impl Eligibility {
    pub fn get(&self, key: EligibilityKey) -> TriState {
        match key {
            EligibilityKey::SalaryTransfer => self.salary_transfer,
            EligibilityKey::AutoTransfer => self.auto_transfer,
            EligibilityKey::CardSpend => self.card_spend,
            EligibilityKey::PrimaryBank => self.primary_bank,
            EligibilityKey::NonFace => self.non_face,
            EligibilityKey::Youth => self.youth,
        }
    }

    pub fn set(&mut self, key: EligibilityKey, value: TriState) {
        let field = match key {
            EligibilityKey::SalaryTransfer => &mut self.salary_transfer,
            EligibilityKey::AutoTransfer => &mut self.auto_transfer,
            EligibilityKey::CardSpend => &mut self.card_spend,
            EligibilityKey::PrimaryBank => &mut self.primary_bank,
            EligibilityKey::NonFace => &mut self.non_face,
            EligibilityKey::Youth => &mut self.youth,
        };
        *field = value;
    }

    pub fn by_name(&self, name: &str) -> Option<TriState> {
        EligibilityKey::ALL.iter().find(|key| key.as_str() == name).map(|key| self.get(*key))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub user_uncertain: bool,
}

/// Structured understanding of what the user asked for.
///
/// One extraction call produces one `SlotState` from one utterance. Callers thread
/// the running record across turns with [`SlotState::merge`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotState {
    #[serde(default)]
    pub slots: Slots,
    #[serde(default)]
    pub eligibility: Eligibility,
    #[serde(default)]
    pub meta: Meta,
    /// Answers to product-specific conditions found in product terms, keyed by
    /// condition catalog key.
    #[serde(
        default,
        deserialize_with = "lenient::tri_state_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub conditions: BTreeMap<String, TriState>,
}

impl SlotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a newer extraction into this record: present slots replace older
    /// values, known tri-states replace older answers, `unknown` never erases one.
    pub fn merge(&mut self, newer: &SlotState) {
        for key in SlotKey::ALL {
            if let Some(value) = newer.slots.get(key) {
                self.slots.set(key, value);
            }
        }
        for key in EligibilityKey::ALL {
            let answer = newer.eligibility.get(key);
            if answer.is_known() {
                self.eligibility.set(key, answer);
            }
        }
        for (key, answer) in &newer.conditions {
            if answer.is_known() || !self.conditions.contains_key(key) {
                self.conditions.insert(key.clone(), *answer);
            }
        }
        self.meta.user_uncertain = newer.meta.user_uncertain;
    }

    /// Answer recorded for a condition key, checking the fixed eligibility fields
    /// before catalog conditions.
    pub fn answer_for(&self, key: &str) -> TriState {
        self.eligibility
            .by_name(key)
            .or_else(|| self.conditions.get(key).copied())
            .unwrap_or_default()
    }

    pub fn record_answer(&mut self, key: &str, answer: TriState) {
        if let Some(field) = EligibilityKey::ALL.iter().find(|field| field.as_str() == key) {
            self.eligibility.set(*field, answer);
        } else {
            self.conditions.insert(key.to_string(), answer);
        }
    }
}
