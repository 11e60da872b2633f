//! Table definitions.

use super::relationship::Relationship;
use super::value::OperationData;
use crate::error::ConfigError;
use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Key column used when none is given.
pub const DEFAULT_KEY_COLUMN: &str = "id";

/// Stable handle to a definition inside one schema arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize,
)]
pub struct DefinitionId {
    registry: u64,
    index: u32,
}

impl DefinitionId {
    pub(crate) fn new(registry: u64, index: u32) -> Self {
        Self { registry, index }
    }

    /// Position of the definition within its schema.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn registry(&self) -> u64 {
        self.registry
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// A mapped table: key, columns, relationships, and write-time data.
///
/// Values of this type only exist inside a finalized [`Schema`](super::Schema)
/// or behind a [`DefinitionBuilder`]; they are never handed out half-built.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Definition {
    id: DefinitionId,
    table: String,
    primary_key: Vec<String>,
    auto_increment: bool,
    read_only: bool,
    columns: Vec<String>,
    relationships: Vec<Relationship>,
    soft_delete_column: Option<String>,
    deletion_data: OperationData,
    creation_data: OperationData,
    modification_data: OperationData,
}

impl Definition {
    /// Arena id of this definition.
    pub fn id(&self) -> DefinitionId {
        self.id
    }

    /// Backing table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary key columns, in key order.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Check if the primary key spans more than one column.
    pub fn is_composite_key(&self) -> bool {
        self.primary_key.len() > 1
    }

    /// Check if the key is generated by the database.
    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Check if writes against this table must be refused.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Scalar columns in declaration order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Check if `name` is a declared column or a key column.
    pub fn has_column(&self, name: &str) -> bool {
        self.primary_key.iter().any(|c| c == name) || self.columns.iter().any(|c| c == name)
    }

    /// Relationships in declaration order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Get a relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name() == name)
    }

    /// Column set on soft delete, if soft deletion is enabled.
    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete_column.as_deref()
    }

    /// Check if deletes are modeled as an update of the soft-delete column.
    pub fn has_soft_delete(&self) -> bool {
        self.soft_delete_column.is_some()
    }

    /// Data merged into delete statements.
    pub fn deletion_data(&self) -> &OperationData {
        &self.deletion_data
    }

    /// Data merged into insert statements.
    pub fn creation_data(&self) -> &OperationData {
        &self.creation_data
    }

    /// Data merged into update statements.
    pub fn modification_data(&self) -> &OperationData {
        &self.modification_data
    }

    pub(crate) fn rebase(&mut self, from: u64, to: u64, index: u32) {
        self.id = DefinitionId::new(to, index);
        for rel in &mut self.relationships {
            rel.rebase(from, to);
        }
    }
}

/// Mutable handle on a definition during the configuration phase.
#[derive(Debug, Clone)]
pub struct DefinitionBuilder {
    def: Definition,
}

impl DefinitionBuilder {
    pub(crate) fn new(
        id: DefinitionId,
        table: String,
        primary_key: Vec<String>,
    ) -> Result<Self, ConfigError> {
        if table.trim().is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        if primary_key.is_empty() {
            return Err(ConfigError::EmptyPrimaryKey { table });
        }
        for (i, column) in primary_key.iter().enumerate() {
            if column.trim().is_empty() {
                return Err(ConfigError::EmptyColumn {
                    table,
                    what: "primary key column",
                });
            }
            if primary_key[..i].contains(column) {
                return Err(ConfigError::DuplicateKeyColumn {
                    table,
                    column: column.clone(),
                });
            }
        }

        Ok(Self {
            def: Definition {
                id,
                table,
                primary_key,
                auto_increment: false,
                read_only: false,
                columns: Vec::new(),
                relationships: Vec::new(),
                soft_delete_column: None,
                deletion_data: OperationData::new(),
                creation_data: OperationData::new(),
                modification_data: OperationData::new(),
            },
        })
    }

    /// Arena id, for use as a relationship target.
    pub fn id(&self) -> DefinitionId {
        self.def.id
    }

    /// Read the definition as configured so far.
    pub fn as_definition(&self) -> &Definition {
        &self.def
    }

    /// Let the database generate the key.
    ///
    /// Fails on a composite key and leaves the flag untouched.
    pub fn enable_auto_increment(&mut self) -> Result<&mut Self, ConfigError> {
        if self.def.is_composite_key() {
            return Err(ConfigError::CompositeAutoIncrement {
                table: self.def.table.clone(),
                key_len: self.def.primary_key.len(),
            });
        }
        self.def.auto_increment = true;
        Ok(self)
    }

    /// Refuse create, update, and delete against this table.
    pub fn mark_read_only(&mut self) -> &mut Self {
        self.def.read_only = true;
        self
    }

    /// Append scalar columns. Names already declared are skipped.
    pub fn add_columns<I, S>(&mut self, names: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(self.empty("column"));
        }

        for name in names {
            if self.def.columns.contains(&name) {
                debug!(table = %self.def.table, column = %name, "column already declared");
                continue;
            }
            self.def.columns.push(name);
        }
        Ok(self)
    }

    /// Add a one-to-one relationship.
    pub fn add_to_one(
        &mut self,
        related: DefinitionId,
        name: impl Into<String>,
        foreign_column: impl Into<String>,
        local_column: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_relationship(Relationship::to_one(
            name,
            related,
            local_column,
            foreign_column,
        ))
    }

    /// Add a one-to-one relationship keyed on the local `id` column.
    pub fn add_to_one_by_key(
        &mut self,
        related: DefinitionId,
        name: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_to_one(related, name, foreign_column, DEFAULT_KEY_COLUMN)
    }

    /// Add a one-to-many relationship.
    pub fn add_to_many(
        &mut self,
        related: DefinitionId,
        name: impl Into<String>,
        foreign_column: impl Into<String>,
        local_column: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_relationship(Relationship::to_many(
            name,
            related,
            local_column,
            foreign_column,
        ))
    }

    /// Add a one-to-many relationship keyed on the local `id` column.
    pub fn add_to_many_by_key(
        &mut self,
        related: DefinitionId,
        name: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        self.add_to_many(related, name, foreign_column, DEFAULT_KEY_COLUMN)
    }

    /// Add a many-to-many relationship resolved through `join_table`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_to_many_through_join(
        &mut self,
        related: DefinitionId,
        name: impl Into<String>,
        foreign_column: impl Into<String>,
        local_column: impl Into<String>,
        join_table: impl Into<String>,
        join_foreign_column: impl Into<String>,
        join_local_column: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        let rel = Relationship::to_many(name, related, local_column, foreign_column).with_join(
            join_table,
            join_local_column,
            join_foreign_column,
        );
        self.add_relationship(rel)
    }

    /// Attach a prebuilt relationship. Names must be unique per definition.
    pub fn add_relationship(&mut self, rel: Relationship) -> Result<&mut Self, ConfigError> {
        if rel.name().trim().is_empty() {
            return Err(self.empty("relationship"));
        }
        if rel.local_column().trim().is_empty() || rel.foreign_column().trim().is_empty() {
            return Err(self.empty("relationship column"));
        }
        if self.def.relationship(rel.name()).is_some() {
            return Err(ConfigError::DuplicateRelationship {
                table: self.def.table.clone(),
                name: rel.name().to_string(),
            });
        }

        debug!(
            table = %self.def.table,
            relationship = rel.name(),
            related = %rel.related_definition(),
            collection = rel.is_collection(),
            join = rel.is_join_resolved(),
            "relationship added"
        );
        self.def.relationships.push(rel);
        Ok(self)
    }

    /// Model deletes as setting `column` instead of removing the row.
    pub fn set_soft_delete_column(
        &mut self,
        column: impl Into<String>,
    ) -> Result<&mut Self, ConfigError> {
        let column = column.into();
        if column.trim().is_empty() {
            return Err(self.empty("soft-delete column"));
        }
        self.def.soft_delete_column = Some(column);
        Ok(self)
    }

    /// Replace the data merged into delete statements.
    pub fn set_deletion_data(&mut self, data: OperationData) -> &mut Self {
        self.def.deletion_data = data;
        self
    }

    /// Replace the data merged into insert statements.
    pub fn set_creation_data(&mut self, data: OperationData) -> &mut Self {
        self.def.creation_data = data;
        self
    }

    /// Replace the data merged into update statements.
    pub fn set_modification_data(&mut self, data: OperationData) -> &mut Self {
        self.def.modification_data = data;
        self
    }

    pub(crate) fn freeze(self) -> Definition {
        self.def
    }

    fn empty(&self, what: &'static str) -> ConfigError {
        ConfigError::EmptyColumn {
            table: self.def.table.clone(),
            what,
        }
    }
}
