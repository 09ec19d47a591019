use std::sync::Arc;

use anyhow::{anyhow, Context};
use finmate_core::catalog::CatalogProduct;
use finmate_core::config::AdvisorConfig;
use finmate_core::content::{segment, ContentBlock, Payload};
use finmate_core::domain::slot_state::SlotState;
use finmate_core::errors::{ApplicationError, DomainError};
use finmate_core::extraction::{ExtractionRequest, SlotExtractor};
use tracing::{info, warn};

use crate::conversation::ConversationState;
use crate::flow::{plan_next_step, render_candidates, ConditionCatalog, NextStep, TurnContext};
use crate::llm::LlmClient;

const EXTRACTION_SYSTEM_PROMPT: &str = r#"너는 금융 상담 파서야.
입력 JSON: {"product_type": "...", "last_questions": ["..."], "user_message": "..."}
출력은 JSON 하나만:
{"slots": {"monthly_amount": 500000, "term_months": 12, "lump_sum": 20000000, "income_monthly": 3000000, "desired_amount": 50000000},
 "eligibility": {"salary_transfer": "yes|no|unknown", "auto_transfer": "...", "card_spend": "...", "primary_bank": "...", "non_face": "...", "youth": "..."},
 "meta": {"user_uncertain": true|false}}
규칙:
- 숫자나 기간이 메시지에 실제로 없으면 slots에 넣지 마.
- 금액은 원 단위로 변환해 (300만원=3000000, 1억=100000000, 5천만=50000000).
- 기간은 개월 수로 (1년=12).
- 사용자가 모름/대충/잘 모르겠어 라고 하면 meta.user_uncertain=true."#;

/// Result of one handled turn.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub state: ConversationState,
    pub step: NextStep,
    pub reply: String,
}

/// Drives one advisory conversation turn at a time.
///
/// The optional model client is only asked to extract facts. When it fails or
/// replies with anything other than a slot-state payload, the rule extractor
/// answers instead.
pub struct AdvisorRuntime {
    extractor: SlotExtractor,
    catalog: ConditionCatalog,
    config: AdvisorConfig,
    llm: Option<Arc<dyn LlmClient>>,
}

impl AdvisorRuntime {
    pub fn new(catalog: ConditionCatalog, config: AdvisorConfig) -> Self {
        Self { extractor: SlotExtractor::new(), catalog, config, llm: None }
    }

    pub fn with_llm(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(client);
        self
    }

    pub fn catalog(&self) -> &ConditionCatalog {
        &self.catalog
    }

    /// Facts in one user message, from the model when one is configured.
    pub async fn extract(&self, request: &ExtractionRequest) -> SlotState {
        let Some(llm) = &self.llm else {
            return self.extractor.extract(request);
        };

        match model_extract(llm.as_ref(), request).await {
            Ok(state) => state,
            Err(error) => {
                warn!(
                    event_name = "agent.extraction.fallback",
                    product_type = %request.product_type,
                    error = %error,
                    "model extraction failed, using rule-based extraction"
                );
                self.extractor.extract(request)
            }
        }
    }

    pub async fn handle_turn(
        &self,
        state: &ConversationState,
        message: &str,
        products: &[CatalogProduct],
    ) -> Result<TurnOutcome, ApplicationError> {
        let last_questions =
            state.last_question.iter().map(|question| question.text.clone()).collect();
        let request = ExtractionRequest::new(state.product_type.label(), message)
            .with_last_questions(last_questions);
        let extracted = self.extract(&request).await;

        let (next_state, step) = plan_next_step(
            state,
            &TurnContext {
                message,
                extracted: &extracted,
                products,
                catalog: &self.catalog,
                config: &self.config,
            },
        );
        let reply = render_step(&step)?;

        info!(
            event_name = "agent.turn.completed",
            stage = step.stage(),
            product_type = %next_state.product_type,
            turn = next_state.turns,
            candidates = products.len(),
            "advisor turn handled"
        );
        Ok(TurnOutcome { state: next_state, step, reply })
    }

    /// Like [`AdvisorRuntime::handle_turn`], but a failure leaves the state as it
    /// was and replies with the user-facing error text.
    pub async fn respond(
        &self,
        state: &ConversationState,
        message: &str,
        products: &[CatalogProduct],
    ) -> (ConversationState, String) {
        match self.handle_turn(state, message, products).await {
            Ok(outcome) => (outcome.state, outcome.reply),
            Err(error) => {
                let correlation_id = format!("turn-{}", state.turns + 1);
                warn!(
                    event_name = "agent.turn.failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "advisor turn failed"
                );
                let interface = error.into_interface(correlation_id);
                (state.clone(), interface.user_message().to_string())
            }
        }
    }
}

async fn model_extract(llm: &dyn LlmClient, request: &ExtractionRequest) -> anyhow::Result<SlotState> {
    let user = serde_json::to_string(request).context("serialize extraction request")?;
    let reply = llm.complete(EXTRACTION_SYSTEM_PROMPT, &user).await?;

    segment(&reply)
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::Structured { payload: Payload::SlotState(state), .. } => Some(state),
            _ => None,
        })
        .ok_or_else(|| anyhow!("model reply held no slot-state payload"))
}

/// Reply text for a planned step. A final step is the bundle JSON alone, so the
/// message is recognized as one structured payload when it is displayed.
pub fn render_step(step: &NextStep) -> Result<String, ApplicationError> {
    match step {
        NextStep::Ask { question } => Ok(join_nonblank(&[&question.preface, &question.text], "\n")),
        NextStep::Draft { preface, candidates, question } => {
            let question_text = join_nonblank(&[&question.preface, &question.text], "\n");
            Ok(join_nonblank(&[preface, &render_candidates(candidates), &question_text], "\n\n"))
        }
        NextStep::Final { bundle } => serde_json::to_string_pretty(bundle).map_err(|error| {
            DomainError::InvariantViolation(format!("recommendation bundle is not serializable: {error}"))
                .into()
        }),
    }
}

fn join_nonblank(parts: &[&str], separator: &str) -> String {
    parts.iter().filter(|part| !part.trim().is_empty()).copied().collect::<Vec<_>>().join(separator)
}
