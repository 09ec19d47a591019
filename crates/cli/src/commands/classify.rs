use finmate_core::content::classify;

use crate::commands::CommandResult;

/// Classification is total; blank or malformed input comes back as `unclassified`.
pub fn run(raw: &str) -> CommandResult {
    CommandResult::document("classify", &classify(raw))
}
