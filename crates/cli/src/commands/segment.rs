use finmate_core::content::segment;

use crate::commands::CommandResult;

pub fn run(message: &str) -> CommandResult {
    CommandResult::document("segment", &segment(message))
}
