//! Deterministic advisor flow: which question to ask next and when to recommend.
//!
//! The model never chooses products or questions. It can only contribute the
//! extracted [`SlotState`] for a turn; everything after that is decided here.

use finmate_core::catalog::{dedupe_products, CatalogProduct};
use finmate_core::config::AdvisorConfig;
use finmate_core::domain::product_type::{ProductFamily, ProductType};
use finmate_core::domain::recommendation::{
    CollectedState, RecommendationBundle, RecommendedProduct,
};
use finmate_core::domain::slot_state::{SlotKey, SlotState, TriState};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conversation::{quick_yes_no, user_is_confused, ConversationState, Question, QuestionKey};

const SLOT_PREFACE: &str = "조금만 더 물어볼게요 🙂";
const CONDITION_PREFACE: &str = "좋아요. 우대금리(금리 추가)를 받을 수 있는지 이것도 한 번만 볼게요 🙂";
const DRAFT_PREFACE: &str =
    "오케이! 일단 일반 조건 기준으로 후보를 먼저 골라봤어요. (확정은 아니고 '초안'이에요)";
const GAVE_UP_PREFACE: &str =
    "정보가 딱 맞게 안 잡혀도 괜찮아요. 일단 후보를 잡아뒀고, 이것만 답하면 더 좋아져요 🙂";
const REASK_SUFFIX: &str = "괜찮으면 이것만 답해줘요 🙂";
const WHY_RECOMMENDED: &str =
    "현재 답변 기준으로 조건을 맞출 가능성이 높고, 금리/최저금리 기준도 상위권이라서요.";

const SUMMARY_MAX_CHARS: usize = 80;

/// A promotional condition that product terms can mention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionEntry {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    pub patterns: Vec<String>,
    pub question: String,
    #[serde(default)]
    pub explain: Option<String>,
}

impl ConditionEntry {
    pub fn new(key: &str, label: &str, patterns: &[&str], question: &str) -> Self {
        Self {
            key: key.to_string(),
            label: Some(label.to_string()),
            patterns: patterns.iter().map(|pattern| pattern.to_string()).collect(),
            question: question.to_string(),
            explain: None,
        }
    }

    pub fn with_explain(mut self, explain: &str) -> Self {
        self.explain = Some(explain.to_string());
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    fn occurs_in(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| !pattern.is_empty() && text.contains(pattern.as_str()))
    }
}

/// Ordered set of known conditions. Order decides which question comes first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionCatalog {
    entries: Vec<ConditionEntry>,
}

impl ConditionCatalog {
    pub fn new(entries: Vec<ConditionEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.patterns.retain(|pattern| !pattern.trim().is_empty());
                entry
            })
            .collect();
        Self { entries }
    }

    /// Reads a JSON array of entries.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    pub fn entries(&self) -> &[ConditionEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&ConditionEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Entries whose patterns occur in `text`, in catalog order.
    pub fn matching(&self, text: &str) -> Vec<&ConditionEntry> {
        self.entries.iter().filter(|entry| entry.occurs_in(text)).collect()
    }

    /// Keys of conditions that appear in any candidate's terms.
    pub fn condition_keys(&self, products: &[CatalogProduct]) -> Vec<String> {
        let terms = products
            .iter()
            .map(|product| product.special_condition_raw.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.matching(&terms).into_iter().map(|entry| entry.key.clone()).collect()
    }

    /// Conditions that Korean banks commonly attach to savings and loan products.
    pub fn builtin() -> Self {
        Self::new(vec![
            ConditionEntry::new(
                "salary_transfer",
                "급여이체",
                &["급여이체", "급여 이체", "급여실적", "급여 실적"],
                "월급(급여)을 이 은행 통장으로 받을 수 있어요? (예/아니오)",
            )
            .with_explain("급여이체는 월급이 들어오는 통장을 해당 은행으로 지정하는 거예요."),
            ConditionEntry::new(
                "auto_transfer",
                "자동이체",
                &["자동이체", "자동 이체"],
                "공과금이나 카드값 자동이체를 이 은행으로 걸 수 있어요? (예/아니오)",
            )
            .with_explain("통신비, 관리비, 카드대금 같은 돈이 매달 이 은행 계좌에서 빠져나가게 하는 거예요."),
            ConditionEntry::new(
                "card_spend",
                "카드실적",
                &["카드 이용", "카드이용", "카드실적", "카드 실적", "신용카드", "체크카드"],
                "이 은행 카드로 매달 일정 금액 이상 쓸 수 있어요? (예/아니오)",
            )
            .with_explain("그 은행 신용카드나 체크카드로 한 달에 정해진 금액 이상 결제하는 조건이에요."),
            ConditionEntry::new(
                "primary_bank",
                "주거래",
                &["주거래"],
                "이 은행을 주거래 은행으로 쓰고 있어요? (예/아니오)",
            )
            .with_explain("예금, 카드, 이체 같은 거래를 주로 그 은행에서 하고 있으면 주거래로 봐요."),
            ConditionEntry::new(
                "non_face",
                "비대면 가입",
                &["비대면", "인터넷뱅킹", "스마트뱅킹", "모바일", "앱 가입"],
                "앱이나 인터넷으로 비대면 가입해도 괜찮아요? (예/아니오)",
            )
            .with_explain("지점에 가지 않고 은행 앱이나 인터넷뱅킹으로 가입하는 방식이에요."),
            ConditionEntry::new(
                "youth",
                "청년",
                &["청년", "만 34세", "만34세", "사회초년생"],
                "만 19~34세 청년에 해당하세요? (예/아니오)",
            )
            .with_explain("보통 만 19세부터 34세까지를 청년 우대 대상으로 봐요."),
            ConditionEntry::new(
                "first_customer",
                "첫거래",
                &["신규고객", "신규 고객", "첫거래", "첫 거래", "최초 가입"],
                "이 은행과 거래하는 게 처음이에요? (예/아니오)",
            )
            .with_explain("해당 은행 상품에 처음 가입하는 고객에게 주는 우대예요."),
            ConditionEntry::new(
                "blood_donation",
                "헌혈",
                &["헌혈"],
                "최근에 헌혈하신 적 있어요? (예/아니오)",
            )
            .with_explain("헌혈증서나 헌혈 실적이 있으면 금리를 더 주는 상품이 있어요."),
        ])
    }
}

impl Default for ConditionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// One-line description of a product's special conditions.
pub fn summarize_special_condition(raw: &str, catalog: &ConditionCatalog) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "우대조건 정보 없음".to_string();
    }

    let picks = catalog.matching(raw);
    if !picks.is_empty() {
        let mut short =
            picks.iter().take(2).map(|entry| entry.display_label()).collect::<Vec<_>>().join(", ");
        if picks.len() > 2 {
            short.push_str(" 외");
        }
        return format!("주요 우대조건 키워드: {short}");
    }

    let first = raw.split(['\n', '.']).next().unwrap_or_default().trim();
    if first.is_empty() {
        return "우대조건 정보 있음".to_string();
    }
    if first.chars().count() > SUMMARY_MAX_CHARS {
        format!("{}…", first.chars().take(SUMMARY_MAX_CHARS).collect::<String>())
    } else {
        first.to_string()
    }
}

/// Ranking score: higher is better. Loan rates count negatively because a lower
/// lending rate is the better offer.
pub fn score_product(
    family: ProductFamily,
    product: &CatalogProduct,
    record: &SlotState,
    catalog: &ConditionCatalog,
) -> Decimal {
    let rate = product.rate_or_zero();
    let base = if family.is_loan() { -rate } else { rate };

    let matched = catalog.matching(&product.special_condition_raw);
    let mut bonus = Decimal::ZERO;
    for entry in &matched {
        match record.answer_for(&entry.key) {
            TriState::Yes => bonus += Decimal::new(15, 2),
            TriState::No => bonus -= Decimal::new(10, 2),
            TriState::Unknown => {}
        }
    }
    if matched.len() >= 4 {
        bonus -= Decimal::new(10, 2);
    }

    base + bonus
}

/// Best `count` products by score. Ties keep catalog order.
pub fn choose_candidates(
    family: ProductFamily,
    products: &[CatalogProduct],
    record: &SlotState,
    catalog: &ConditionCatalog,
    count: usize,
) -> Vec<CatalogProduct> {
    let mut scored = products
        .iter()
        .map(|product| (score_product(family, product, record, catalog), product.clone()))
        .collect::<Vec<_>>();
    scored.sort_by(|left, right| right.0.cmp(&left.0));

    let mut ranked = dedupe_products(scored.into_iter().map(|(_, product)| product).collect());
    ranked.truncate(count);
    ranked
}

pub fn render_candidates(candidates: &[CatalogProduct]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(index, product)| {
            format!("{}. {} - {} (기준: {})", index + 1, product.bank, product.name, product.rate_label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// What the assistant does with this turn.
#[derive(Clone, Debug, PartialEq)]
pub enum NextStep {
    Ask { question: Question },
    Draft { preface: String, candidates: Vec<CatalogProduct>, question: Question },
    Final { bundle: RecommendationBundle },
}

impl NextStep {
    pub fn stage(&self) -> &'static str {
        match self {
            NextStep::Ask { .. } => "ask",
            NextStep::Draft { .. } => "draft",
            NextStep::Final { .. } => "final",
        }
    }
}

/// Inputs of one planning step besides the conversation state.
pub struct TurnContext<'a> {
    pub message: &'a str,
    /// Facts extracted from `message`, by model or by rules.
    pub extracted: &'a SlotState,
    pub products: &'a [CatalogProduct],
    pub catalog: &'a ConditionCatalog,
    pub config: &'a AdvisorConfig,
}

/// Decides the next step and returns it with the state the next turn starts from.
pub fn plan_next_step(
    previous: &ConversationState,
    turn: &TurnContext<'_>,
) -> (ConversationState, NextStep) {
    let mut state = previous.clone();
    state.turns += 1;

    if let Some(step) = reask_with_explanation(&state, turn) {
        return (state, step);
    }

    if let (Some(answer), Some(condition)) =
        (quick_yes_no(turn.message), state.pending_condition().map(str::to_string))
    {
        state.record.record_answer(&condition, answer);
    }

    state.record.merge(turn.extracted);

    let condition_keys = turn.catalog.condition_keys(turn.products);
    let family = state.product_type.family();

    let missing = state.missing_slots();
    if !missing.is_empty() {
        if let Some(question) = pick_slot_question(&mut state, &missing, turn.config.max_slot_asks) {
            let candidates = choose_candidates(
                family,
                turn.products,
                &state.record,
                turn.catalog,
                turn.config.candidate_count,
            );
            return finish(
                state,
                NextStep::Draft { preface: DRAFT_PREFACE.to_string(), candidates, question },
            );
        }

        if let Some(question) = pick_condition_question(&mut state, &condition_keys, turn.catalog) {
            let candidates = choose_candidates(
                family,
                turn.products,
                &state.record,
                turn.catalog,
                turn.config.candidate_count,
            );
            return finish(
                state,
                NextStep::Draft { preface: GAVE_UP_PREFACE.to_string(), candidates, question },
            );
        }
    }

    if let Some(question) = pick_condition_question(&mut state, &condition_keys, turn.catalog) {
        return finish(state, NextStep::Ask { question });
    }

    let bundle = final_bundle(&state, turn);
    finish(state, NextStep::Final { bundle })
}

fn finish(mut state: ConversationState, step: NextStep) -> (ConversationState, NextStep) {
    state.last_question = match &step {
        NextStep::Ask { question } | NextStep::Draft { question, .. } => Some(question.clone()),
        NextStep::Final { .. } => None,
    };
    debug!(
        event_name = "agent.flow.step_planned",
        stage = step.stage(),
        product_type = %state.product_type,
        turn = state.turns,
        question = %state.last_question.as_ref().map(|question| question.key.to_string()).unwrap_or_default(),
        "advisor next step planned"
    );
    (state, step)
}

fn reask_with_explanation(state: &ConversationState, turn: &TurnContext<'_>) -> Option<NextStep> {
    let last = state.last_question.as_ref()?;
    let condition = last.key.condition_key()?;
    if !user_is_confused(turn.message) {
        return None;
    }
    let explain = turn.catalog.get(condition)?.explain.as_deref()?;

    Some(NextStep::Ask {
        question: Question {
            key: last.key.clone(),
            preface: format!("{explain}\n{REASK_SUFFIX}"),
            text: last.text.clone(),
        },
    })
}

fn pick_slot_question(
    state: &mut ConversationState,
    missing: &[SlotKey],
    max_asks: u32,
) -> Option<Question> {
    let slot = missing.iter().copied().find(|slot| state.slot_ask_count(*slot) < max_asks)?;
    *state.slot_ask_counts.entry(slot).or_insert(0) += 1;

    let key = QuestionKey::Slot(slot);
    state.asked.insert(key.clone());
    Some(Question { key, preface: SLOT_PREFACE.to_string(), text: slot_question(slot).to_string() })
}

fn pick_condition_question(
    state: &mut ConversationState,
    condition_keys: &[String],
    catalog: &ConditionCatalog,
) -> Option<Question> {
    for condition in condition_keys {
        let key = QuestionKey::Condition(condition.clone());
        if state.asked.contains(&key) || state.record.answer_for(condition).is_known() {
            continue;
        }
        let Some(entry) = catalog.get(condition) else {
            continue;
        };
        if entry.question.trim().is_empty() {
            continue;
        }

        state.asked.insert(key.clone());
        return Some(Question {
            key,
            preface: CONDITION_PREFACE.to_string(),
            text: entry.question.clone(),
        });
    }
    None
}

fn slot_question(slot: SlotKey) -> &'static str {
    match slot {
        SlotKey::MonthlyAmount => "매달 얼마 정도 넣을 계획이세요? (예: 30만원)",
        SlotKey::LumpSum => "목돈이 얼마 정도 있으세요? (예: 1000만원)",
        SlotKey::TermMonths => "기간은 어느 정도로 생각하세요? (예: 12개월/24개월)",
        SlotKey::IncomeMonthly => "월 소득(세후 기준 대략) 어느 정도세요? (예: 300만원)",
        SlotKey::DesiredAmount => "필요한 대출 금액은 어느 정도세요? (예: 5000만원)",
    }
}

fn final_bundle(state: &ConversationState, turn: &TurnContext<'_>) -> RecommendationBundle {
    let family = state.product_type.family();
    let candidates = choose_candidates(
        family,
        turn.products,
        &state.record,
        turn.catalog,
        turn.config.candidate_count,
    );

    let reason = match state.product_type {
        ProductType::InstallmentSavings => {
            "정기적으로 모으는 목적이라 적금이 자연스러워요. (금리/우대조건을 같이 봤어요)"
        }
        ProductType::TermDeposit => {
            "목돈을 한 번에 맡기는 목적이라 예금이 자연스러워요. (금리/우대조건을 같이 봤어요)"
        }
        _ => "목적에 맞는 유형으로 금리와 우대조건 기준에서 골랐어요.",
    };
    let notes = if family.is_loan() {
        "우대조건(소득증빙/거래실적 등)에 따라 실제 금리/한도가 달라질 수 있어요."
    } else {
        "급여이체/카드실적/비대면 같은 조건에 따라 금리가 더 올라갈 수 있어요."
    };

    RecommendationBundle {
        product_type: Some(state.product_type.label().to_string()),
        reason: Some(reason.to_string()),
        products: candidates
            .iter()
            .map(|product| RecommendedProduct {
                bank: Some(product.bank.clone()),
                name: Some(product.name.clone()),
                rate: Some(product.rate_label()),
                special_condition_raw: Some(product.special_condition_raw.clone()),
                special_condition_summary: Some(summarize_special_condition(
                    &product.special_condition_raw,
                    turn.catalog,
                )),
                why_recommended: Some(WHY_RECOMMENDED.to_string()),
            })
            .collect(),
        notes: Some(notes.to_string()),
        collected: Some(CollectedState {
            slots: state.record.slots.clone(),
            eligibility: state.record.eligibility,
        }),
    }
}
