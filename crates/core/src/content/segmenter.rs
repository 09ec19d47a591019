use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::content::classifier::{classify, classify_value, Payload};

pub const FENCE_OPEN: &str = "```json";
pub const FENCE_CLOSE: &str = "```";

static FENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(?i:```json)(.*?)```").expect("fence pattern compiles"));

/// One ordered piece of an assistant message.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Structured { raw: String, payload: Payload, fenced: bool },
}

impl ContentBlock {
    fn text(text: &str) -> Option<Self> {
        (!text.trim().is_empty()).then(|| ContentBlock::Text { text: text.to_string() })
    }

    fn structured(raw: &str, value: Value, fenced: bool) -> Self {
        ContentBlock::Structured {
            raw: raw.to_string(),
            payload: classify_value(raw, value),
            fenced,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ContentBlock::Structured { .. })
    }
}

/// Splits an assistant message into text and structured blocks.
///
/// A message that is entirely one JSON object or array becomes a single unfenced
/// block. Otherwise every "```json" fence with a closing "```" becomes a fenced
/// block holding the verbatim interior, and the text between fences is kept as is.
/// Blank text and blank fence interiors produce no block.
pub fn segment(message: &str) -> Vec<ContentBlock> {
    let trimmed = message.trim();
    if let Some(value) = whole_message_payload(trimmed) {
        debug!(event_name = "content.segment.whole_payload", "message is one structured payload");
        return vec![ContentBlock::structured(trimmed, value, false)];
    }

    let mut blocks = Vec::new();
    let mut cursor = 0;
    for captures in FENCE_PATTERN.captures_iter(message) {
        let (Some(fence), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        blocks.extend(ContentBlock::text(&message[cursor..fence.start()]));

        let raw = inner.as_str();
        if !raw.trim().is_empty() {
            blocks.push(ContentBlock::Structured {
                raw: raw.to_string(),
                payload: classify(raw),
                fenced: true,
            });
        }
        cursor = fence.end();
    }
    blocks.extend(ContentBlock::text(&message[cursor..]));

    debug!(
        event_name = "content.segment.completed",
        blocks = blocks.len(),
        structured = blocks.iter().filter(|block| block.is_structured()).count(),
        "assistant message segmented"
    );
    blocks
}

/// Rebuilds message text from blocks, writing fence markers around fenced blocks.
pub fn reassemble(blocks: &[ContentBlock]) -> String {
    let mut message = String::new();
    for block in blocks {
        match block {
            ContentBlock::Text { text } => message.push_str(text),
            ContentBlock::Structured { raw, fenced: true, .. } => {
                message.push_str(FENCE_OPEN);
                message.push_str(raw);
                message.push_str(FENCE_CLOSE);
            }
            ContentBlock::Structured { raw, fenced: false, .. } => message.push_str(raw),
        }
    }
    message
}

fn whole_message_payload(trimmed: &str) -> Option<Value> {
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(|value| value.is_object() || value.is_array())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{reassemble, segment, ContentBlock};
    use crate::content::classifier::Payload;

    #[test]
    fn whole_json_message_is_one_unfenced_block() {
        let blocks = segment("  {\"products\": []}\n");

        assert_eq!(blocks.len(), 1);
        let ContentBlock::Structured { raw, payload, fenced } = &blocks[0] else {
            panic!("expected structured block");
        };
        assert_eq!(raw, "{\"products\": []}");
        assert!(!fenced);
        assert!(matches!(payload, Payload::Recommendation(_)));
    }

    #[test]
    fn prose_and_fences_keep_their_order() {
        let message = "후보를 골랐어요.\n```json\n{\"products\": []}\n```\n참고하세요.";
        let blocks = segment(message);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], ContentBlock::Text { text: "후보를 골랐어요.\n".to_string() });
        assert!(matches!(
            &blocks[1],
            ContentBlock::Structured { raw, fenced: true, .. } if raw == "\n{\"products\": []}\n"
        ));
        assert_eq!(blocks[2], ContentBlock::Text { text: "\n참고하세요.".to_string() });
    }

    #[test]
    fn plain_text_is_one_block_and_blank_is_none() {
        assert_eq!(segment("안녕하세요"), vec![ContentBlock::Text { text: "안녕하세요".to_string() }]);
        assert!(segment("   \n ").is_empty());
        assert!(segment("").is_empty());
    }

    #[test]
    fn json_scalars_are_not_whole_message_payloads() {
        assert_eq!(segment("42"), vec![ContentBlock::Text { text: "42".to_string() }]);
    }

    #[test]
    fn malformed_fence_content_is_unclassified() {
        let blocks = segment("```json\n{broken\n```");
        let [ContentBlock::Structured { payload: Payload::Unclassified(unclassified), .. }] =
            blocks.as_slice()
        else {
            panic!("expected one unclassified block");
        };
        assert!(unclassified.value.is_none());
    }

    #[test]
    fn unterminated_fence_is_plain_text() {
        let message = "설명입니다 ```json {\"products\": []}";
        assert_eq!(segment(message), vec![ContentBlock::Text { text: message.to_string() }]);
    }

    #[test]
    fn blank_fences_and_blank_gaps_are_dropped() {
        let blocks = segment("```json\n \n```\n  \n```json{\"foo\": 1}```");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], ContentBlock::Structured { raw, .. } if raw == "{\"foo\": 1}"));
    }

    #[test]
    fn opening_marker_is_case_insensitive() {
        let blocks = segment("결과: ```JSON{\"products\": []}```");
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].is_structured());
    }

    fn text_part() -> impl Strategy<Value = String> {
        "[가-힣a-z][가-힣a-z \n.]{0,16}"
    }

    fn fenced_part() -> impl Strategy<Value = String> {
        (0u64..1_000_000, any::<bool>()).prop_map(|(amount, bundle)| {
            let body = if bundle {
                format!("{{\"products\": [{{\"rate\": {amount}}}]}}")
            } else {
                format!(
                    "{{\"slots\": {{\"lump_sum\": {amount}}}, \"eligibility\": {{}}, \"meta\": {{\"user_uncertain\": false}}}}"
                )
            };
            format!("```json\n{body}\n```")
        })
    }

    proptest! {
        #[test]
        fn segmenting_then_reassembling_reproduces_the_message(
            parts in prop::collection::vec(prop_oneof![text_part(), fenced_part()], 1..6)
        ) {
            let message = parts.concat();
            prop_assert_eq!(reassemble(&segment(&message)), message);
        }
    }
}
