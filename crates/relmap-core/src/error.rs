//! Core error types.

use std::fmt;

use thiserror::Error;

/// Errors raised synchronously by a single configuration call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Table name was empty.
    #[error("table name must not be empty")]
    EmptyTable,

    /// Primary key had no columns.
    #[error("primary key of `{table}` must have at least one column")]
    EmptyPrimaryKey {
        /// Table being defined.
        table: String,
    },

    /// A column, relationship, or join name was empty.
    #[error("empty {what} name on `{table}`")]
    EmptyColumn {
        /// Table being configured.
        table: String,
        /// Kind of name that was empty (e.g. "column", "relationship").
        what: &'static str,
    },

    /// The same column appears twice in a primary key.
    #[error("primary key of `{table}` lists `{column}` more than once")]
    DuplicateKeyColumn {
        /// Table being defined.
        table: String,
        /// Repeated column.
        column: String,
    },

    /// Auto increment requested on a composite key.
    #[error("auto increment requires a non-composite key (`{table}` has {key_len} key columns)")]
    CompositeAutoIncrement {
        /// Table being configured.
        table: String,
        /// Number of primary-key columns.
        key_len: usize,
    },

    /// A table was defined twice in one builder.
    #[error("table `{0}` is already defined")]
    DuplicateTable(String),

    /// A relationship name was reused on the same definition.
    #[error("relationship `{name}` is already defined on `{table}`")]
    DuplicateRelationship {
        /// Owning table.
        table: String,
        /// Repeated relationship name.
        name: String,
    },

    /// A table name did not resolve to a definition.
    #[error("unknown table `{0}`")]
    UnknownTable(String),

    /// A definition id was not minted by this builder.
    #[error("definition #{0} does not belong to this schema")]
    UnknownDefinition(u32),
}

/// A single structural problem found while finalizing a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// A relationship points at a definition outside the schema.
    #[error("{table}.{relationship}: related definition #{index} is not part of this schema")]
    DanglingReference {
        /// Owning table.
        table: String,
        /// Relationship name.
        relationship: String,
        /// Arena index carried by the stray id.
        index: u32,
    },

    /// The local column is neither a declared column nor a key column.
    #[error("{table}.{relationship}: local column `{column}` is not declared on `{table}`")]
    UnknownLocalColumn {
        /// Owning table.
        table: String,
        /// Relationship name.
        relationship: String,
        /// Offending column.
        column: String,
    },

    /// The foreign column is not declared on the related definition.
    #[error("{table}.{relationship}: foreign column `{column}` is not declared on `{related}`")]
    UnknownForeignColumn {
        /// Owning table.
        table: String,
        /// Relationship name.
        relationship: String,
        /// Related table.
        related: String,
        /// Offending column.
        column: String,
    },

    /// The join table is one of the two joined tables.
    #[error("{table}.{relationship}: join table `{join_table}` must differ from both sides")]
    JoinTableCollision {
        /// Owning table.
        table: String,
        /// Relationship name.
        relationship: String,
        /// Join table name.
        join_table: String,
    },

    /// The join triple has an empty component.
    #[error("{table}.{relationship}: join table and join columns must not be empty")]
    EmptyJoinColumn {
        /// Owning table.
        table: String,
        /// Relationship name.
        relationship: String,
    },

    /// Soft deletion would overwrite a key column.
    #[error("{table}: soft-delete column `{column}` is part of the primary key")]
    SoftDeleteOnKey {
        /// Owning table.
        table: String,
        /// Soft-delete column.
        column: String,
    },
}

/// Aggregate of every violation found by a finalize pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Violations in definition order, then relationship order.
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Number of violations found.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True when no violation was recorded.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Iterate over the violations.
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "schema validation failed with {} violation(s)",
            self.violations.len()
        )?;
        for (i, violation) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Crate-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Misconfiguration at a single call site.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Whole-graph validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Schema document could not be parsed.
    #[error("invalid schema document: {0}")]
    Document(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
