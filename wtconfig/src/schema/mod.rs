//! Configuration schema: entities, the aggregate, and the field registry.

pub mod aggregate;
pub mod entities;
pub mod registry;
pub mod samples;
pub mod value;

pub use aggregate::{canonicalize, ConfigurationSet};
pub use entities::*;
pub use registry::{FieldSpec, SchemaRegistry, SemanticType};
pub use value::DynValue;
