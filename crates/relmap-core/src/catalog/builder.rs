//! Configuration-phase registry of definitions.

use super::definition::{Definition, DefinitionBuilder, DefinitionId, DEFAULT_KEY_COLUMN};
use super::schema::Schema;
use super::validate;
use crate::error::{ConfigError, ValidationError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(1);

/// Mint a registry tag no other builder or loaded schema in this process has.
pub(super) fn next_registry() -> u64 {
    NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed)
}

/// Arena of definitions being configured.
///
/// Relationships refer to their targets by [`DefinitionId`], so mutually
/// related definitions can be configured in any order once both are defined.
#[derive(Debug)]
pub struct SchemaBuilder {
    registry: u64,
    definitions: Vec<DefinitionBuilder>,
    tables: HashMap<String, DefinitionId>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            registry: next_registry(),
            definitions: Vec::new(),
            tables: HashMap::new(),
        }
    }

    /// Define a table keyed on a single `id` column.
    pub fn define(
        &mut self,
        table: impl Into<String>,
    ) -> Result<&mut DefinitionBuilder, ConfigError> {
        self.define_with_key(table, [DEFAULT_KEY_COLUMN])
    }

    /// Define a table with an explicit primary key.
    pub fn define_with_key<I, S>(
        &mut self,
        table: impl Into<String>,
        primary_key: I,
    ) -> Result<&mut DefinitionBuilder, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = table.into();
        if self.tables.contains_key(&table) {
            return Err(ConfigError::DuplicateTable(table));
        }

        let index = self.definitions.len() as u32;
        let id = DefinitionId::new(self.registry, index);
        let builder = DefinitionBuilder::new(
            id,
            table.clone(),
            primary_key.into_iter().map(Into::into).collect(),
        )?;

        debug!(
            table = %table,
            id = %id,
            key = ?builder.as_definition().primary_key(),
            "definition declared"
        );
        self.tables.insert(table, id);
        self.definitions.push(builder);
        Ok(&mut self.definitions[index as usize])
    }

    /// Id of a defined table.
    pub fn id_of(&self, table: &str) -> Option<DefinitionId> {
        self.tables.get(table).copied()
    }

    /// Get a definition for further configuration.
    pub fn definition_mut(
        &mut self,
        id: DefinitionId,
    ) -> Result<&mut DefinitionBuilder, ConfigError> {
        if id.registry() != self.registry {
            return Err(ConfigError::UnknownDefinition(id.index()));
        }
        self.definitions
            .get_mut(id.index() as usize)
            .ok_or(ConfigError::UnknownDefinition(id.index()))
    }

    /// Get a definition for further configuration by table name.
    pub fn table_mut(&mut self, table: &str) -> Result<&mut DefinitionBuilder, ConfigError> {
        let id = self
            .id_of(table)
            .ok_or_else(|| ConfigError::UnknownTable(table.to_string()))?;
        self.definition_mut(id)
    }

    /// Get a definition by id.
    pub fn get(&self, id: DefinitionId) -> Option<&DefinitionBuilder> {
        if id.registry() != self.registry {
            return None;
        }
        self.definitions.get(id.index() as usize)
    }

    /// Number of definitions declared so far.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if nothing has been declared.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Validate the whole graph and freeze it.
    ///
    /// Every violation is collected before failing.
    pub fn finalize(self) -> Result<Schema, ValidationError> {
        let frozen: Vec<&Definition> = self
            .definitions
            .iter()
            .map(DefinitionBuilder::as_definition)
            .collect();
        let violations = validate::check(self.registry, &frozen);
        if !violations.is_empty() {
            warn!(violations = violations.len(), "schema validation failed");
            return Err(ValidationError { violations });
        }

        let definitions = self
            .definitions
            .into_iter()
            .map(DefinitionBuilder::freeze)
            .collect();
        let schema = Schema::from_parts(self.registry, definitions);
        info!(definitions = schema.len(), "schema finalized");
        Ok(schema)
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
