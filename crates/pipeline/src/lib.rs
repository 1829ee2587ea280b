pub mod complete;
pub mod driver;
pub mod error;
pub mod framer;
pub mod populate;
pub mod writer;

pub use driver::{extract, ArcStream, ExtractorConfig};
pub use error::PipelineError;
