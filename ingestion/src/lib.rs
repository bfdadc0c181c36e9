pub mod processor;
pub mod relocation;

pub use processor::{IngestionConfig, IngestionError, IngestionPipeline};
pub use relocation::{RelocationError, RelocationManager, RelocationSummary};
