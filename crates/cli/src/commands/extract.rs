use finmate_core::extraction::{ExtractionRequest, SlotExtractor};

use crate::commands::CommandResult;

/// The product type is passed through as written; labels outside the known
/// families route their amount to `lump_sum`.
pub fn run(product_type: &str, questions: &[String], message: &str) -> CommandResult {
    let request =
        ExtractionRequest::new(product_type, message).with_last_questions(questions.to_vec());
    CommandResult::document("extract", &SlotExtractor::new().extract(&request))
}
