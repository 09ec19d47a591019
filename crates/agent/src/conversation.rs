use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use finmate_core::domain::product_type::ProductType;
use finmate_core::domain::slot_state::{SlotKey, SlotState, TriState};

/// What an assistant question is about.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuestionKey {
    Slot(SlotKey),
    Condition(String),
}

impl QuestionKey {
    pub fn condition_key(&self) -> Option<&str> {
        match self {
            QuestionKey::Condition(key) => Some(key),
            QuestionKey::Slot(_) => None,
        }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKey::Slot(slot) => write!(f, "slot:{}", slot.as_str()),
            QuestionKey::Condition(key) => write!(f, "cond:{key}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub key: QuestionKey,
    pub preface: String,
    pub text: String,
}

/// Everything the advisor remembers between turns.
///
/// The value is owned by the caller and replaced wholesale after each turn; the
/// runtime never mutates a state it was handed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationState {
    pub product_type: ProductType,
    pub record: SlotState,
    pub asked: BTreeSet<QuestionKey>,
    pub last_question: Option<Question>,
    pub slot_ask_counts: BTreeMap<SlotKey, u32>,
    pub turns: u32,
}

impl ConversationState {
    pub fn new(product_type: ProductType) -> Self {
        Self {
            product_type,
            record: SlotState::new(),
            asked: BTreeSet::new(),
            last_question: None,
            slot_ask_counts: BTreeMap::new(),
            turns: 0,
        }
    }

    /// Starts a conversation with the product type guessed from its first message.
    pub fn for_opening_message(message: &str) -> Self {
        Self::new(ProductType::infer(message))
    }

    pub fn missing_slots(&self) -> Vec<SlotKey> {
        self.product_type
            .required_slots()
            .iter()
            .copied()
            .filter(|slot| self.record.slots.get(*slot).is_none())
            .collect()
    }

    pub fn slot_ask_count(&self, slot: SlotKey) -> u32 {
        self.slot_ask_counts.get(&slot).copied().unwrap_or(0)
    }

    /// Condition the previous assistant turn asked about, if any.
    pub fn pending_condition(&self) -> Option<&str> {
        self.last_question.as_ref().and_then(|question| question.key.condition_key())
    }
}

fn normalize(message: &str) -> String {
    message.trim().to_lowercase()
}

/// Reads a bare short answer. Longer sentences return `None` and are left to the
/// extractor.
pub fn quick_yes_no(message: &str) -> Option<TriState> {
    match normalize(message).as_str() {
        "예" | "네" | "응" | "ㅇㅇ" | "가능" | "할게" | "할수있어" | "할 수 있어" | "가능해" => {
            Some(TriState::Yes)
        }
        "아니오" | "아니" | "못해" | "불가" | "어려워" | "안돼" | "안 돼" => Some(TriState::No),
        "모름" | "몰라" | "잘 모르겠어" | "글쎄" | "애매" | "대충" | "잘 모르겠다" => {
            Some(TriState::Unknown)
        }
        _ => None,
    }
}

const CONFUSION_MARKERS: [&str; 9] =
    ["무슨", "뭐야", "이해", "잘 모르", "설명", "어떤 뜻", "헷갈", "??", "어케"];

pub fn user_is_confused(message: &str) -> bool {
    let normalized = normalize(message);
    CONFUSION_MARKERS.iter().any(|marker| normalized.contains(marker))
}
