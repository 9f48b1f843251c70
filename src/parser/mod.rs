pub mod extract;
pub mod html;
pub mod normalize;

pub use extract::Extractor;
pub use normalize::{normalize_category, parse_count, parse_date};
