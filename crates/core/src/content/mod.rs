//! Interpretation of assistant messages that mix prose and JSON payloads.

pub mod classifier;
pub mod segmenter;

pub use classifier::{classify, Payload, Unclassified};
pub use segmenter::{reassemble, segment, ContentBlock};
