// wtconfig Library
// Work-rule configuration synthesis: schema, validation and rules correction

pub mod config;
pub mod context;
pub mod correction;
pub mod error;
pub mod generator;
pub mod logging;
pub mod persist;
pub mod schema;
pub mod session;
pub mod validation;

pub use context::{ContextAssembler, GenerationContext};
pub use correction::{CorrectionLoop, CorrectionOutcome};
pub use error::{PipelineError, PipelineResult};
pub use generator::{GenerationAdapter, Generator};
pub use persist::{ConfigHandle, FilePersister, Persister};
pub use schema::{AggregateScope, ConfigurationSet, SchemaRegistry};
pub use session::Session;
pub use validation::{ValidationReport, Validator, Verdict};
