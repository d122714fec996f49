pub mod engine;
pub mod intent;
pub mod taxonomy;

pub use engine::{SearchEngine, SearchOutcome, SearchRequest, SortKey, order_suggestions};
pub use intent::{SearchAnalysis, SearchIntent, classify};
