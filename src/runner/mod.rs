pub mod analyzer;
pub mod naming;
pub mod process;
pub mod workspace;

pub use analyzer::{classify, BinwalkAnalyzer, ToolRun};
pub use process::{run_tool, ToolOutput};
pub use workspace::{ExtractionDir, ExtractionSummary};
