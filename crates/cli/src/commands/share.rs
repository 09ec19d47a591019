use finmate_core::content::{classify, Payload};
use finmate_core::share;
use serde::Serialize;
use tracing::debug;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct EncodedLink {
    token: String,
}

pub fn encode(bundle_json: &str) -> CommandResult {
    let Payload::Recommendation(bundle) = classify(bundle_json) else {
        return CommandResult::invalid_input(
            "share-encode",
            "input is not a recommendation bundle (expected an object with a products array)",
        );
    };

    match share::encode(&bundle) {
        Ok(token) => CommandResult::document("share-encode", &EncodedLink { token }),
        Err(error) => CommandResult::failure("share-encode", "serialization", error.to_string(), 1),
    }
}

pub fn decode(token: &str) -> CommandResult {
    match share::decode(token) {
        Ok(shared) => CommandResult::document("share-decode", &shared),
        Err(error) => {
            debug!(event_name = "cli.share.decode_rejected", error = %error, "share token rejected");
            CommandResult::failure("share-decode", "invalid_link", error.user_message(), 2)
        }
    }
}
