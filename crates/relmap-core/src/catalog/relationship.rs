//! Relationship descriptors between definitions.

use super::DefinitionId;
use rkyv::{Archive, Deserialize, Serialize};

/// Intermediate table used to resolve a many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct JoinTable {
    /// Join table name.
    pub table: String,
    /// Column on the join table matched against the owner's local column.
    pub local_column: String,
    /// Column on the join table matched against the related foreign column.
    pub foreign_column: String,
}

impl JoinTable {
    /// Create a join table triple.
    pub fn new(
        table: impl Into<String>,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            local_column: local_column.into(),
            foreign_column: foreign_column.into(),
        }
    }

    /// View as `(table, local_column, foreign_column)`.
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.table, &self.local_column, &self.foreign_column)
    }
}

/// How the engine resolves a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// `owner.local_column = related.foreign_column`.
    Direct,
    /// `owner.local_column = join.local_column` and
    /// `join.foreign_column = related.foreign_column`.
    Join(&'a JoinTable),
}

/// A directed edge from an owning definition to a related one.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct Relationship {
    name: String,
    is_collection: bool,
    related: DefinitionId,
    local_column: String,
    foreign_column: String,
    join: Option<JoinTable>,
}

impl Relationship {
    /// Create a direct-match relationship.
    pub fn new(
        name: impl Into<String>,
        is_collection: bool,
        related: DefinitionId,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            is_collection,
            related,
            local_column: local_column.into(),
            foreign_column: foreign_column.into(),
            join: None,
        }
    }

    /// Create a one-to-one relationship.
    pub fn to_one(
        name: impl Into<String>,
        related: DefinitionId,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self::new(name, false, related, local_column, foreign_column)
    }

    /// Create a one-to-many relationship.
    pub fn to_many(
        name: impl Into<String>,
        related: DefinitionId,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        Self::new(name, true, related, local_column, foreign_column)
    }

    /// Resolve through a join table. Overwrites any previous join.
    pub fn attach_join(
        &mut self,
        table: impl Into<String>,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) {
        self.join = Some(JoinTable::new(table, local_column, foreign_column));
    }

    /// By-value form of [`Relationship::attach_join`].
    pub fn with_join(
        mut self,
        table: impl Into<String>,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        self.attach_join(table, local_column, foreign_column);
        self
    }

    /// Attribute name the related data is exposed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for one-to-many and many-to-many.
    pub fn is_collection(&self) -> bool {
        self.is_collection
    }

    /// Target definition.
    pub fn related_definition(&self) -> DefinitionId {
        self.related
    }

    /// Move the target from arena `from` to arena `to`. Targets outside
    /// `from` get registry 0, which no builder mints, so they stay dangling.
    pub(crate) fn rebase(&mut self, from: u64, to: u64) {
        let registry = if self.related.registry() == from { to } else { 0 };
        self.related = DefinitionId::new(registry, self.related.index());
    }

    /// Column on the owning table.
    pub fn local_column(&self) -> &str {
        &self.local_column
    }

    /// Column on the related table.
    pub fn foreign_column(&self) -> &str {
        &self.foreign_column
    }

    /// Join table, when join-resolved.
    pub fn join_info(&self) -> Option<&JoinTable> {
        self.join.as_ref()
    }

    /// Check if this relationship goes through a join table.
    pub fn is_join_resolved(&self) -> bool {
        self.join.is_some()
    }

    /// Resolution strategy for query generation.
    pub fn resolution(&self) -> Resolution<'_> {
        match &self.join {
            Some(join) => Resolution::Join(join),
            None => Resolution::Direct,
        }
    }
}
