pub mod record;
pub mod store;

pub use record::{AnalyzerResult, ResultRecord, ANALYZER_NAME};
pub use store::{JsonFileStore, MemoryStore, ResultStore};
