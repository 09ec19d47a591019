pub(crate) mod lenient;
pub mod product_type;
pub mod recommendation;
pub mod slot_state;
