//! Mapping catalog for relmap.
//!
//! Definitions describe mapped tables; relationships describe directed edges
//! between them. Both are configured through a [`SchemaBuilder`] and frozen
//! into a read-only [`Schema`].

mod builder;
mod definition;
mod handle;
mod relationship;
mod schema;
mod validate;
mod value;

pub use builder::SchemaBuilder;
pub use definition::{Definition, DefinitionBuilder, DefinitionId, DEFAULT_KEY_COLUMN};
pub use handle::SchemaHandle;
pub use relationship::{JoinTable, Relationship, Resolution};
pub use schema::Schema;
pub use value::{operation_data, OperationData, OperationValue};
