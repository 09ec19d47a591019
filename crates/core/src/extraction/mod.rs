pub mod extractor;
pub mod lexical;
pub mod signal;

pub use extractor::{extract, ExtractionRequest, SlotExtractor};
pub use lexical::{parse_amount, parse_months};
pub use signal::{detect, SignalRule};
