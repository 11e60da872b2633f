//! JSON schema documents.
//!
//! A document lists every table with its key, flags, columns, write-time data,
//! and relationships. Relationships name their target table, so a document can
//! describe mutual relationships without any ordering constraint.

use crate::catalog::{OperationData, Relationship, Schema, SchemaBuilder, DEFAULT_KEY_COLUMN};
use crate::error::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A whole schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    /// Table descriptions.
    pub tables: Vec<TableDocument>,
}

/// One mapped table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDocument {
    /// Table name.
    pub table: String,
    /// Primary key columns.
    #[serde(default = "default_primary_key")]
    pub primary_key: Vec<String>,
    /// Let the database generate the key.
    #[serde(default)]
    pub auto_increment: bool,
    /// Refuse writes.
    #[serde(default)]
    pub read_only: bool,
    /// Scalar columns.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Soft-delete timestamp column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_delete_column: Option<String>,
    /// Data merged into inserts.
    #[serde(default, skip_serializing_if = "OperationData::is_empty")]
    pub creation_data: OperationData,
    /// Data merged into updates.
    #[serde(default, skip_serializing_if = "OperationData::is_empty")]
    pub modification_data: OperationData,
    /// Data merged into deletes.
    #[serde(default, skip_serializing_if = "OperationData::is_empty")]
    pub deletion_data: OperationData,
    /// Relationships owned by this table.
    #[serde(default)]
    pub relationships: Vec<RelationshipDocument>,
}

/// Cardinality as written in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Single related row.
    ToOne,
    /// Collection of related rows.
    ToMany,
}

/// One relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationshipDocument {
    /// Attribute name.
    pub name: String,
    /// Cardinality.
    pub kind: RelationshipKind,
    /// Related table name.
    pub related: String,
    /// Column on the related table.
    pub foreign_column: String,
    /// Column on the owning table.
    #[serde(default = "default_local_column")]
    pub local_column: String,
    /// Join table, for many-to-many.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<JoinDocument>,
}

/// Join table triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinDocument {
    /// Join table name.
    pub table: String,
    /// Join column matched against the owner.
    pub local_column: String,
    /// Join column matched against the related table.
    pub foreign_column: String,
}

fn default_primary_key() -> Vec<String> {
    vec![DEFAULT_KEY_COLUMN.to_string()]
}

fn default_local_column() -> String {
    DEFAULT_KEY_COLUMN.to_string()
}

impl SchemaDocument {
    /// Parse a document from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Document(e.to_string()))
    }

    /// Read and parse a document file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = json.len(), "schema document read");
        Self::from_json_str(&json)
    }

    /// Render the document as pretty JSON.
    pub fn to_json_string(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Configure a builder from this document without finalizing.
    pub fn configure(&self) -> Result<SchemaBuilder, ConfigError> {
        let mut schema = SchemaBuilder::new();

        // Declare every table first so relationships may point anywhere.
        for table in &self.tables {
            let def =
                schema.define_with_key(table.table.as_str(), table.primary_key.iter().cloned())?;
            if table.auto_increment {
                def.enable_auto_increment()?;
            }
            if table.read_only {
                def.mark_read_only();
            }
            def.add_columns(table.columns.iter().cloned())?;
            if let Some(column) = &table.soft_delete_column {
                def.set_soft_delete_column(column.as_str())?;
            }
            def.set_creation_data(table.creation_data.clone())
                .set_modification_data(table.modification_data.clone())
                .set_deletion_data(table.deletion_data.clone());
        }

        for table in &self.tables {
            for rel in &table.relationships {
                let related = schema
                    .id_of(&rel.related)
                    .ok_or_else(|| ConfigError::UnknownTable(rel.related.clone()))?;
                let mut relationship = Relationship::new(
                    rel.name.as_str(),
                    rel.kind == RelationshipKind::ToMany,
                    related,
                    rel.local_column.as_str(),
                    rel.foreign_column.as_str(),
                );
                if let Some(join) = &rel.join {
                    relationship.attach_join(
                        join.table.as_str(),
                        join.local_column.as_str(),
                        join.foreign_column.as_str(),
                    );
                }
                schema
                    .table_mut(&table.table)?
                    .add_relationship(relationship)?;
            }
        }

        Ok(schema)
    }

    /// Configure, validate, and freeze.
    pub fn build(&self) -> Result<Schema, Error> {
        Ok(self.configure()?.finalize()?)
    }
}
