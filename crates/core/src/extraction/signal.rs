//! Yes / no / unknown classification of a single proposition.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::slot_state::{EligibilityKey, TriState};

/// Korean particles that may sit between a subject noun and its predicate.
const PARTICLE: &str = "(?:은|는|도|를|을|으로|로|이|가)?";

/// Classifies `text` against opposing pattern sets.
///
/// The affirmative pattern is checked first and wins when both match.
pub fn detect(text: &str, affirmative: &Regex, negative: &Regex) -> TriState {
    if affirmative.is_match(text) {
        TriState::Yes
    } else if negative.is_match(text) {
        TriState::No
    } else {
        TriState::Unknown
    }
}

#[derive(Clone, Debug)]
pub struct SignalRule {
    affirmative: Regex,
    negative: Regex,
}

impl SignalRule {
    pub fn new(affirmative: &str, negative: &str) -> Result<Self, regex::Error> {
        Ok(Self { affirmative: Regex::new(affirmative)?, negative: Regex::new(negative)? })
    }

    pub fn evaluate(&self, text: &str) -> TriState {
        detect(text, &self.affirmative, &self.negative)
    }
}

/// Fixed rule per eligibility field, in [`EligibilityKey::ALL`] order.
pub(crate) static ELIGIBILITY_RULES: Lazy<Vec<(EligibilityKey, SignalRule)>> = Lazy::new(|| {
    EligibilityKey::ALL
        .iter()
        .map(|key| {
            let (affirmative, negative) = eligibility_patterns(*key);
            let rule = SignalRule::new(&affirmative, &negative)
                .expect("eligibility keyword patterns compile");
            (*key, rule)
        })
        .collect()
});

fn eligibility_patterns(key: EligibilityKey) -> (String, String) {
    let p = PARTICLE;
    match key {
        EligibilityKey::SalaryTransfer => (
            format!(
                r"(급여|월급)\s*(이체|통장){p}\s*(가능|할\s*수|할게|할래|할\s*거|해요|해도|하고|하는|해|돼|되|중|있|받|옮길|바꿀)"
            ),
            format!(r"(급여|월급)\s*(이체|통장){p}\s*(안|못|불가|어려|없|힘들|싫)"),
        ),
        EligibilityKey::AutoTransfer => (
            format!(
                r"자동\s*이체{p}\s*(가능|할\s*수|할게|할래|할\s*거|해요|해도|하고|하는|해|돼|되|중|있|걸)"
            ),
            format!(r"자동\s*이체{p}\s*(안|못|불가|어려|없|힘들|싫)"),
        ),
        EligibilityKey::CardSpend => (
            format!(
                r"카드\s*(실적|사용|결제|이용)?{p}\s*(가능|할\s*수|할게|채울|채워|충분|많이|자주|있|써|쓰|해요|해)"
            ),
            format!(r"카드\s*(실적|사용|결제|이용)?{p}\s*(안|못|불가|어려|없|힘들|싫|거의\s*안|잘\s*안)"),
        ),
        EligibilityKey::PrimaryBank => (
            format!(
                r"주거래\s*(은행)?{p}\s*(이에요|예요|이야|야|에요|맞|있|이고|이라|라서|입니다|임|로\s*(쓰|사용|하))|[가-힣A-Za-z]+(은행|뱅크)(이|가)?\s*주거래"
            ),
            format!(r"주거래\s*(은행)?{p}\s*(없|아니|아냐|안|딱히)"),
        ),
        EligibilityKey::NonFace => (
            format!(
                r"(비대면|모바일|스마트폰|앱|어플|인터넷\s*뱅킹){p}\s*(가입|가능|할게|할\s*수|괜찮|좋|편해|편하|자주|사용|써|쓰|해요|해도)"
            ),
            format!(
                r"(비대면|모바일|스마트폰|앱|어플|인터넷\s*뱅킹){p}\s*(안|못|불가|어려|싫|별로|없|힘들)|(지점|창구|영업점){p}\s*(방문|가서|갈|에서)"
            ),
        ),
        EligibilityKey::Youth => (
            r"청년(이에요|이고|이라|이야|입니다|이예요|\s*맞|\s*해당|\s*조건\s*(돼|되|맞|충족))|사회\s*초년생|대학생|취준생|취업\s*준비|(^|[^0-9])(1[89]|2[0-9]|3[0-4])\s*(살|세)"
                .to_string(),
            r"청년\s*(은|이)?\s*(아니|아냐|아님)|청년\s*(조건|나이)\S*\s*(안|못|넘|지났)|(^|[^0-9])(3[5-9]|[4-9][0-9])\s*(살|세)"
                .to_string(),
        ),
    }
}
