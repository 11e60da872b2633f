//! Finalized, read-only definition graph.

use super::builder::next_registry;
use super::definition::{Definition, DefinitionId};
use super::relationship::Relationship;
use super::validate;
use super::value::{OperationData, OperationValue};
use crate::error::{Error, ValidationError};
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// A validated set of definitions. Immutable; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Schema {
    registry: u64,
    definitions: Vec<Definition>,
    tables: BTreeMap<String, u32>,
}

impl Schema {
    pub(crate) fn from_parts(registry: u64, definitions: Vec<Definition>) -> Self {
        let tables = definitions
            .iter()
            .map(|d| (d.table().to_string(), d.id().index()))
            .collect();
        Self {
            registry,
            definitions,
            tables,
        }
    }

    /// Get a definition by id. Ids from other schemas resolve to `None`.
    pub fn definition(&self, id: DefinitionId) -> Option<&Definition> {
        if id.registry() != self.registry {
            return None;
        }
        self.definitions.get(id.index() as usize)
    }

    /// Get a definition by table name.
    pub fn by_table(&self, table: &str) -> Option<&Definition> {
        self.tables
            .get(table)
            .and_then(|&i| self.definitions.get(i as usize))
    }

    /// Id of a table.
    pub fn id_of(&self, table: &str) -> Option<DefinitionId> {
        self.by_table(table).map(Definition::id)
    }

    /// Target definition of a relationship owned by this schema.
    pub fn related(&self, rel: &Relationship) -> Option<&Definition> {
        self.definition(rel.related_definition())
    }

    /// All definitions in declaration order.
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if the schema has no definitions.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions reachable from `start` through relationships, breadth first.
    ///
    /// `start` comes first; each definition appears once even when the graph
    /// has cycles.
    pub fn reachable_from(&self, start: DefinitionId) -> Vec<&Definition> {
        let Some(first) = self.definition(start) else {
            return Vec::new();
        };

        let mut seen = HashSet::from([first.id()]);
        let mut queue = VecDeque::from([first]);
        let mut order = Vec::new();

        while let Some(def) = queue.pop_front() {
            order.push(def);
            for rel in def.relationships() {
                if let Some(next) = self.related(rel) {
                    if seen.insert(next.id()) {
                        queue.push_back(next);
                    }
                }
            }
        }
        order
    }

    /// Hex blake3 digest of the schema's content.
    ///
    /// Independent of declaration order and of the arena the schema was built
    /// in, so equal schemas built separately share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for def in self.tables.values().filter_map(|&i| self.definitions.get(i as usize)) {
            write_str(&mut hasher, def.table());
            write_list(&mut hasher, def.primary_key());
            hasher.update(&[def.is_auto_increment() as u8, def.is_read_only() as u8]);
            write_list(&mut hasher, def.columns());
            write_str(&mut hasher, def.soft_delete_column().unwrap_or(""));
            hasher.update(&[def.has_soft_delete() as u8]);
            for data in [def.creation_data(), def.modification_data(), def.deletion_data()] {
                write_data(&mut hasher, data);
            }

            hasher.update(&(def.relationships().len() as u64).to_le_bytes());
            for rel in def.relationships() {
                write_str(&mut hasher, rel.name());
                hasher.update(&[rel.is_collection() as u8]);
                write_str(&mut hasher, self.related(rel).map_or("", Definition::table));
                write_str(&mut hasher, rel.local_column());
                write_str(&mut hasher, rel.foreign_column());
                match rel.join_info() {
                    Some(join) => {
                        hasher.update(&[1]);
                        write_str(&mut hasher, &join.table);
                        write_str(&mut hasher, &join.local_column);
                        write_str(&mut hasher, &join.foreign_column);
                    }
                    None => {
                        hasher.update(&[0]);
                    }
                }
            }
        }
        hex::encode(hasher.finalize().as_bytes())
    }

    /// Serialize the schema to snapshot bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema from snapshot bytes.
    ///
    /// The loaded schema gets a fresh arena, so ids handed out before the load
    /// (in this process or the one that wrote the snapshot) never resolve
    /// against it. The finalize checks run again on the decoded definitions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        let decoded = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        decoded.rebase()
    }

    fn rebase(self) -> Result<Self, Error> {
        let registry = next_registry();
        let mut definitions = self.definitions;
        for (index, def) in definitions.iter_mut().enumerate() {
            def.rebase(self.registry, registry, index as u32);
        }

        let schema = Self::from_parts(registry, definitions);
        if schema.tables.len() != schema.definitions.len() {
            return Err(Error::Deserialization(
                "snapshot defines a table more than once".to_string(),
            ));
        }

        let violations = {
            let definitions: Vec<&Definition> = schema.definitions.iter().collect();
            validate::check(registry, &definitions)
        };
        if !violations.is_empty() {
            warn!(violations = violations.len(), "snapshot failed validation");
            return Err(ValidationError { violations }.into());
        }

        debug!(definitions = schema.len(), "snapshot loaded");
        Ok(schema)
    }
}

fn write_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn write_list(hasher: &mut blake3::Hasher, items: &[String]) {
    hasher.update(&(items.len() as u64).to_le_bytes());
    for item in items {
        write_str(hasher, item);
    }
}

fn write_data(hasher: &mut blake3::Hasher, data: &OperationData) {
    hasher.update(&(data.len() as u64).to_le_bytes());
    for (column, value) in data {
        write_str(hasher, column);
        match value {
            OperationValue::Null => {
                hasher.update(&[0]);
            }
            OperationValue::Bool(b) => {
                hasher.update(&[1, *b as u8]);
            }
            OperationValue::Int(i) => {
                hasher.update(&[2]);
                hasher.update(&i.to_le_bytes());
            }
            OperationValue::Float(f) => {
                hasher.update(&[3]);
                hasher.update(&f.to_le_bytes());
            }
            OperationValue::String(s) => {
                hasher.update(&[4]);
                write_str(hasher, s);
            }
            OperationValue::Bytes(b) => {
                hasher.update(&[5]);
                hasher.update(&(b.len() as u64).to_le_bytes());
                hasher.update(b);
            }
            OperationValue::CurrentTimestamp => {
                hasher.update(&[6]);
            }
            OperationValue::Expression(e) => {
                hasher.update(&[7]);
                write_str(hasher, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{operation_data, DefinitionId, OperationValue, SchemaBuilder};
    use crate::error::{Error, Violation};

    fn blog(reverse: bool) -> super::Schema {
        let mut schema = SchemaBuilder::new();
        let (users, posts) = if reverse {
            let posts = schema.define("posts").unwrap().id();
            let users = schema.define("users").unwrap().id();
            (users, posts)
        } else {
            let users = schema.define("users").unwrap().id();
            let posts = schema.define("posts").unwrap().id();
            (users, posts)
        };

        schema
            .definition_mut(users)
            .unwrap()
            .enable_auto_increment()
            .unwrap()
            .add_columns(["name", "email"])
            .unwrap()
            .add_to_many_by_key(posts, "posts", "author_id")
            .unwrap();
        schema
            .definition_mut(posts)
            .unwrap()
            .add_columns(["title", "author_id"])
            .unwrap()
            .set_soft_delete_column("deleted_at")
            .unwrap()
            .set_creation_data(operation_data([(
                "created_at",
                OperationValue::CurrentTimestamp,
            )]))
            .add_to_one(users, "author", "id", "author_id")
            .unwrap();
        schema.finalize().unwrap()
    }

    #[test]
    fn test_lookup() {
        let schema = blog(false);

        let posts = schema.by_table("posts").unwrap();
        assert_eq!(schema.id_of("posts"), Some(posts.id()));
        assert_eq!(schema.definition(posts.id()), Some(posts));

        let author = posts.relationship("author").unwrap();
        assert_eq!(schema.related(author).unwrap().table(), "users");
        assert_eq!(schema.table_names(), vec!["posts", "users"]);
        assert!(schema.by_table("comments").is_none());
    }

    #[test]
    fn test_foreign_id_does_not_resolve() {
        let a = blog(false);
        let b = blog(false);
        let users_in_a = a.id_of("users").unwrap();

        assert!(b.definition(users_in_a).is_none());
    }

    #[test]
    fn test_reachable_from_handles_cycles() {
        let schema = blog(false);
        let users = schema.id_of("users").unwrap();

        let tables: Vec<_> = schema
            .reachable_from(users)
            .into_iter()
            .map(|d| d.table())
            .collect();
        assert_eq!(tables, vec!["users", "posts"]);
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = blog(false);
        let b = blog(true);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = blog(false);

        let mut schema = SchemaBuilder::new();
        schema.define("users").unwrap();
        let b = schema.finalize().unwrap();

        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let schema = blog(false);
        let bytes = schema.to_bytes().unwrap();
        let decoded = super::Schema::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.fingerprint(), schema.fingerprint());
        assert_eq!(decoded.table_names(), schema.table_names());

        let posts = decoded.by_table("posts").unwrap();
        let author = posts.relationship("author").unwrap();
        assert_eq!(decoded.related(author).unwrap().table(), "users");
    }

    #[test]
    fn test_snapshot_gets_fresh_arena() {
        let schema = blog(false);
        let decoded = super::Schema::from_bytes(&schema.to_bytes().unwrap()).unwrap();

        // Same registry tag as the snapshot, minted by an unrelated builder.
        let stale = DefinitionId::new(schema.registry, 0);
        assert!(decoded.definition(stale).is_none());
        assert!(decoded.definition(schema.id_of("users").unwrap()).is_none());
        assert!(schema.definition(decoded.id_of("users").unwrap()).is_none());

        let mut later = SchemaBuilder::new();
        let users = later.define("users").unwrap().id();
        assert!(decoded.definition(users).is_none());

        let id = decoded.id_of("users").unwrap();
        assert_eq!(decoded.definition(id).unwrap().table(), "users");
    }

    #[test]
    fn test_snapshot_with_dangling_relationship_rejected() {
        let mut schema = blog(false);
        // users -> posts now points past the end.
        schema.definitions.truncate(1);

        let err = super::Schema::from_bytes(&schema.to_bytes().unwrap()).unwrap_err();
        match err {
            Error::Validation(err) => {
                assert_eq!(err.len(), 1);
                assert!(matches!(
                    &err.violations[0],
                    Violation::DanglingReference { table, index: 1, .. } if table == "users"
                ));
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_with_repeated_table_rejected() {
        let mut schema = blog(false);
        let users = schema.definitions[0].clone();
        schema.definitions.push(users);

        let err = super::Schema::from_bytes(&schema.to_bytes().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(super::Schema::from_bytes(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
