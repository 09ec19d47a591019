//! Advisor runtime for finmate conversations.
//!
//! Each user turn flows through the same constrained loop:
//! 1. **Extraction** (`runtime`): the optional model client, falling back to the
//!    rule-based extractor in `finmate-core`, turns the message into a `SlotState`.
//! 2. **Planning** (`flow`): the running record decides whether to ask for a slot,
//!    ask about a promotional condition, or recommend.
//! 3. **Rendering** (`runtime`): the planned step becomes reply text. A final
//!    recommendation is sent as one JSON document.
//!
//! Conversation state (`conversation`) is a plain value owned by the caller and
//! replaced after every turn.
//!
//! The model is strictly a parser. It never ranks products or chooses questions.

pub mod conversation;
pub mod flow;
pub mod llm;
pub mod runtime;

pub use conversation::{quick_yes_no, user_is_confused, ConversationState, Question, QuestionKey};
pub use flow::{plan_next_step, ConditionCatalog, ConditionEntry, NextStep, TurnContext};
pub use llm::LlmClient;
pub use runtime::{AdvisorRuntime, TurnOutcome};
