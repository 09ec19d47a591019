//! Conversation-state extraction and assistant-message interpretation for the
//! finmate financial advisor.

pub mod catalog;
pub mod config;
pub mod content;
pub mod domain;
pub mod errors;
pub mod extraction;
pub mod share;

pub use catalog::{dedupe_products, normalize_product, normalize_products, CatalogProduct};
pub use config::{AdvisorConfig, AppConfig, ConfigError, LoadOptions};
pub use content::{classify, reassemble, segment, ContentBlock, Payload, Unclassified};
pub use domain::product_type::{ProductFamily, ProductType};
pub use domain::recommendation::{CollectedState, RecommendationBundle, RecommendedProduct};
pub use domain::slot_state::{Eligibility, EligibilityKey, Meta, SlotKey, SlotState, Slots, TriState};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use extraction::{extract, ExtractionRequest, SlotExtractor};
pub use share::{ShareError, SharedRecommendation};
