//! Rule-based slot and eligibility extraction.
//!
//! The extractor reads one utterance and returns a fresh [`SlotState`]. It keeps no
//! state between calls; the running record across turns is the caller's to merge.
//!
//! Amount routing reads the product-type label by substring (적금, 예금, 대출). It
//! also routes the abbreviation 주담대 as a loan and the English labels `saving`,
//! `deposit` and `loan` to their families; any other label sends the amount to
//! `lump_sum`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::product_type::ProductFamily;
use crate::domain::slot_state::{SlotKey, SlotState};
use crate::extraction::lexical::{parse_amount, parse_months};
use crate::extraction::signal::ELIGIBILITY_RULES;

const HEDGING_MARKERS: [&str; 9] =
    ["잘모르", "잘 모르", "대충", "아마", "그냥", "가능할지", "모르겠", "애매", "글쎄"];
const PERIODIC_MARKERS: [&str; 4] = ["매달", "월", "한달", "매월"];
const INCOME_MARKERS: [&str; 3] = ["소득", "월급", "연봉"];

/// Input of one extraction call, in the shape the chat backend sends it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub product_type: String,
    /// Questions the assistant asked just before this message. Not consulted by
    /// the rule set; carried so model-based extraction sees the same request.
    #[serde(default)]
    pub last_questions: Vec<String>,
    pub user_message: String,
}

impl ExtractionRequest {
    pub fn new(product_type: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            product_type: product_type.into(),
            last_questions: Vec::new(),
            user_message: user_message.into(),
        }
    }

    pub fn with_last_questions(mut self, questions: Vec<String>) -> Self {
        self.last_questions = questions;
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SlotExtractor;

impl SlotExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, request: &ExtractionRequest) -> SlotState {
        let utterance = request.user_message.as_str();
        let mut state = SlotState::new();

        state.meta.user_uncertain = mentions_any(utterance, &HEDGING_MARKERS);

        if let Some(months) = parse_months(utterance) {
            state.slots.set(SlotKey::TermMonths, u64::from(months));
        }

        if let Some(amount) = parse_amount(utterance) {
            state.slots.set(amount_slot(&request.product_type, utterance), amount);
        }

        for (key, rule) in ELIGIBILITY_RULES.iter() {
            state.eligibility.set(*key, rule.evaluate(utterance));
        }

        debug!(
            event_name = "extraction.rule.completed",
            product_type = %request.product_type,
            slots_filled = SlotKey::ALL.iter().filter(|key| state.slots.get(**key).is_some()).count(),
            user_uncertain = state.meta.user_uncertain,
            "rule-based extraction finished"
        );

        state
    }
}

/// Convenience wrapper over [`SlotExtractor::extract`].
pub fn extract(product_type: &str, prior_questions: &[String], utterance: &str) -> SlotState {
    let request = ExtractionRequest::new(product_type, utterance)
        .with_last_questions(prior_questions.to_vec());
    SlotExtractor::new().extract(&request)
}

/// Slot that receives the single amount found in an utterance.
fn amount_slot(product_type: &str, utterance: &str) -> SlotKey {
    match ProductFamily::for_amount_routing(product_type) {
        Some(ProductFamily::Installment) if mentions_any(utterance, &PERIODIC_MARKERS) => {
            SlotKey::MonthlyAmount
        }
        Some(ProductFamily::Loan) if mentions_any(utterance, &INCOME_MARKERS) => {
            SlotKey::IncomeMonthly
        }
        Some(ProductFamily::Loan) => SlotKey::DesiredAmount,
        _ => SlotKey::LumpSum,
    }
}

fn mentions_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text.contains(marker))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{extract, ExtractionRequest, SlotExtractor};
    use crate::domain::slot_state::{EligibilityKey, SlotState, TriState};

    #[test]
    fn installment_with_periodicity_fills_monthly_amount_and_term() {
        let state = extract("적금", &[], "매달 50만원씩 넣을 건데 1년 정도 생각해요");

        assert_eq!(state.slots.monthly_amount, Some(500_000));
        assert_eq!(state.slots.term_months, Some(12));
        assert_eq!(state.slots.lump_sum, None);
    }

    #[test]
    fn installment_without_periodicity_is_a_lump_sum() {
        let state = extract("적금", &[], "300만원 있어요");
        assert_eq!(state.slots.lump_sum, Some(3_000_000));
        assert_eq!(state.slots.monthly_amount, None);
    }

    #[test]
    fn loan_takes_only_the_first_amount() {
        let state = extract("대출", &[], "월 소득 300만원이고 5천만원 필요해요");

        assert_eq!(state.slots.income_monthly, Some(3_000_000));
        assert_eq!(state.slots.desired_amount, None);
    }

    #[test]
    fn loan_without_income_marker_is_the_desired_amount() {
        let state = extract("전세자금대출", &[], "5천만원 정도 필요해요");
        assert_eq!(state.slots.desired_amount, Some(50_000_000));
    }

    #[test]
    fn deposit_amount_is_a_lump_sum() {
        let state = extract("예금", &[], "1.5억 정도 넣으려고요");
        assert_eq!(state.slots.lump_sum, Some(150_000_000));
    }

    #[test]
    fn abbreviated_and_english_labels_route_to_their_families() {
        assert_eq!(extract("주담대", &[], "3억 필요해요").slots.desired_amount, Some(300_000_000));
        assert_eq!(extract("loan", &[], "연봉 4000만원").slots.income_monthly, Some(40_000_000));
        assert_eq!(extract("saving", &[], "매달 10만원").slots.monthly_amount, Some(100_000));
        assert_eq!(extract("deposit", &[], "500만원").slots.lump_sum, Some(5_000_000));
    }

    #[test]
    fn unrouted_product_types_fall_back_to_lump_sum() {
        let state = extract("연금저축", &[], "매달 30만원");
        assert_eq!(state.slots.lump_sum, Some(300_000));
        assert_eq!(state.slots.monthly_amount, None);
    }

    #[test]
    fn hedging_sets_user_uncertain() {
        assert!(extract("적금", &[], "잘 모르겠는데 대충 30만원?").meta.user_uncertain);
        assert!(!extract("적금", &[], "30만원이요").meta.user_uncertain);
    }

    #[test]
    fn empty_utterance_yields_the_baseline_record() {
        assert_eq!(extract("적금", &[], ""), SlotState::new());
    }

    #[test]
    fn reads_eligibility_from_a_full_introduction() {
        let state = extract(
            "적금",
            &[],
            "나 이번에 취업한 27살인데, 우리은행이 주거래야. 월 50만원씩 12개월 적금 들려는데 어디가 제일 좋아?",
        );

        assert_eq!(state.slots.monthly_amount, Some(500_000));
        assert_eq!(state.slots.term_months, Some(12));
        assert_eq!(state.eligibility.youth, TriState::Yes);
        assert_eq!(state.eligibility.primary_bank, TriState::Yes);
        assert_eq!(state.eligibility.salary_transfer, TriState::Unknown);
    }

    #[test]
    fn prior_questions_do_not_change_the_result() {
        let questions = vec!["매달 얼마 정도 넣을 계획이세요?".to_string()];
        let with_context = SlotExtractor::new().extract(
            &ExtractionRequest::new("적금", "50만원").with_last_questions(questions),
        );
        assert_eq!(with_context, extract("적금", &[], "50만원"));
    }

    #[test]
    fn request_decodes_without_last_questions() {
        let request: ExtractionRequest =
            serde_json::from_str(r#"{"product_type":"예금","user_message":"1억"}"#)
                .expect("request");
        assert!(request.last_questions.is_empty());
    }

    proptest! {
        #[test]
        fn utterances_without_tokens_leave_everything_unset(text in "[a-z ?!.]{0,40}") {
            let state = extract("적금", &[], &text);
            prop_assert!(state.slots.is_empty());
            for key in EligibilityKey::ALL {
                prop_assert_eq!(state.eligibility.get(key), TriState::Unknown);
            }
        }

        #[test]
        fn extraction_is_deterministic(text in "\\PC{0,30}") {
            prop_assert_eq!(extract("예금", &[], &text), extract("예금", &[], &text));
        }
    }
}
