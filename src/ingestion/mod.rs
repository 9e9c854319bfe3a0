pub mod error;
pub mod pipeline;
pub mod result;
pub mod validation;

pub use error::IngestError;
pub use pipeline::IngestionPipeline;
pub use result::{IngestionResult, IngestionStatus};
pub use validation::{EntryValidator, RawEntry, RawMeasurement};
