//! relmap core - table definitions and relationship metadata.
//!
//! This crate describes how domain entities map onto tables: keys, columns,
//! relationships (direct or through a join table), soft deletion, and the data
//! merged into write statements. Query generation and execution live elsewhere
//! and consume a finalized [`Schema`].

pub mod catalog;
pub mod document;
pub mod error;

pub use catalog::{
    operation_data, Definition, DefinitionBuilder, DefinitionId, JoinTable, OperationData,
    OperationValue, Relationship, Resolution, Schema, SchemaBuilder, SchemaHandle,
    DEFAULT_KEY_COLUMN,
};
pub use document::{
    JoinDocument, RelationshipDocument, RelationshipKind, SchemaDocument, TableDocument,
};
pub use error::{ConfigError, Error, ValidationError, Violation};
