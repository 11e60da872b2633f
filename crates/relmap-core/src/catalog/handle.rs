//! Shared handle to the schema currently in use.

use super::schema::Schema;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Holds the active schema and swaps it atomically on reconfiguration.
///
/// Readers take an `Arc` snapshot and keep using it even while a newer schema
/// is installed; the installed graph itself is never mutated.
#[derive(Debug)]
pub struct SchemaHandle {
    current: RwLock<Arc<Schema>>,
    version: AtomicU64,
}

impl SchemaHandle {
    /// Install `schema` as version 1.
    pub fn new(schema: Schema) -> Self {
        info!(fingerprint = %schema.fingerprint(), version = 1, "schema installed");
        Self {
            current: RwLock::new(Arc::new(schema)),
            version: AtomicU64::new(1),
        }
    }

    /// Current schema.
    pub fn current(&self) -> Arc<Schema> {
        self.current.read().clone()
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Install a new schema and return its version.
    pub fn replace(&self, schema: Schema) -> u64 {
        let fingerprint = schema.fingerprint();
        let mut guard = self.current.write();
        *guard = Arc::new(schema);
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        drop(guard);

        info!(%fingerprint, version, "schema replaced");
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaBuilder;

    fn schema_with(tables: &[&str]) -> Schema {
        let mut schema = SchemaBuilder::new();
        for table in tables {
            schema.define(*table).unwrap();
        }
        schema.finalize().unwrap()
    }

    #[test]
    fn test_replace_bumps_version() {
        let handle = SchemaHandle::new(schema_with(&["users"]));
        assert_eq!(handle.version(), 1);

        let before = handle.current();
        let version = handle.replace(schema_with(&["users", "posts"]));

        assert_eq!(version, 2);
        assert_eq!(handle.version(), 2);
        assert_eq!(before.len(), 1);
        assert_eq!(handle.current().len(), 2);
    }

    #[test]
    fn test_concurrent_readers() {
        let handle = Arc::new(SchemaHandle::new(schema_with(&["users"])));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let schema = handle.current();
                        assert!(schema.by_table("users").is_some());
                    }
                })
            })
            .collect();

        handle.replace(schema_with(&["users", "posts"]));
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(handle.version(), 2);
    }
}
