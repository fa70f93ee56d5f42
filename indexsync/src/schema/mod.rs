pub mod preset;
pub mod types;

pub use preset::{geonames, SchemaPreset};
pub use types::{Field, FieldType, IndexDefinition};
