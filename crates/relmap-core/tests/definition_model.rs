//! Integration tests for the definition and relationship model.

use relmap_core::{
    operation_data, ConfigError, Error, OperationValue, Resolution, Schema, SchemaBuilder,
    SchemaDocument, SchemaHandle, Violation,
};
use std::sync::Arc;

/// users <-> posts (to-many / to-one) and posts <-> tags through post_tags.
fn setup_blog_schema() -> Schema {
    let mut schema = SchemaBuilder::new();

    let tags = schema
        .define("tags")
        .unwrap()
        .add_columns(["label"])
        .unwrap()
        .id();
    let users = schema
        .define("users")
        .unwrap()
        .enable_auto_increment()
        .unwrap()
        .add_columns(["name", "email"])
        .unwrap()
        .id();
    let posts = schema
        .define_with_key("posts", ["id"])
        .unwrap()
        .add_columns(["title", "body", "author_id"])
        .unwrap()
        .set_soft_delete_column("deleted_at")
        .unwrap()
        .set_creation_data(operation_data([
            ("created_at", OperationValue::CurrentTimestamp),
            ("status", OperationValue::from("draft")),
        ]))
        .set_modification_data(operation_data([(
            "updated_at",
            OperationValue::CurrentTimestamp,
        )]))
        .add_to_one(users, "author", "id", "author_id")
        .unwrap()
        .add_to_many_through_join(tags, "tags", "id", "id", "post_tags", "tag_id", "post_id")
        .unwrap()
        .id();

    schema
        .definition_mut(users)
        .unwrap()
        .add_to_many_by_key(posts, "posts", "author_id")
        .unwrap();

    schema.finalize().unwrap()
}

#[test]
fn test_blog_schema_shape() {
    let schema = setup_blog_schema();
    assert_eq!(schema.len(), 3);

    let users = schema.by_table("users").unwrap();
    assert!(users.is_auto_increment());
    assert_eq!(users.columns(), ["name", "email"]);
    assert_eq!(users.relationships().len(), 1);

    let posts = schema.by_table("posts").unwrap();
    assert_eq!(posts.relationships().len(), 2);
    assert!(!posts.relationship("author").unwrap().is_collection());
    assert!(posts.relationship("tags").unwrap().is_collection());
    assert_eq!(posts.soft_delete_column(), Some("deleted_at"));
    assert_eq!(posts.creation_data().len(), 2);
    assert!(posts.deletion_data().is_empty());
}

#[test]
fn test_join_tuple_is_local_side_first() {
    let schema = setup_blog_schema();
    let posts = schema.by_table("posts").unwrap();

    let tags = posts.relationship("tags").unwrap();
    let join = tags.join_info().unwrap();
    assert_eq!(join.as_tuple(), ("post_tags", "post_id", "tag_id"));
    assert_eq!(tags.local_column(), "id");
    assert_eq!(tags.foreign_column(), "id");
    assert_eq!(schema.related(tags).unwrap().table(), "tags");

    let author = posts.relationship("author").unwrap();
    assert!(author.join_info().is_none());
    assert_eq!(author.resolution(), Resolution::Direct);
}

#[test]
fn test_every_add_appends_one_relationship() {
    let mut schema = SchemaBuilder::new();
    let target = schema.define("targets").unwrap().add_columns(["owner_id"]).unwrap().id();
    let owner = schema.define("owners").unwrap();

    owner.add_to_one_by_key(target, "first", "owner_id").unwrap();
    assert_eq!(owner.as_definition().relationships().len(), 1);
    owner.add_to_many_by_key(target, "all", "owner_id").unwrap();
    assert_eq!(owner.as_definition().relationships().len(), 2);

    let kinds: Vec<_> = owner
        .as_definition()
        .relationships()
        .iter()
        .map(|r| r.is_collection())
        .collect();
    assert_eq!(kinds, vec![false, true]);
}

#[test]
fn test_auto_increment_scenarios() {
    let mut schema = SchemaBuilder::new();
    assert!(schema.define("users").unwrap().enable_auto_increment().is_ok());

    let members = schema.define_with_key("members", ["tenant_id", "id"]).unwrap();
    let err = members.enable_auto_increment().unwrap_err();
    assert!(matches!(err, ConfigError::CompositeAutoIncrement { .. }));
    assert!(err
        .to_string()
        .contains("auto increment requires a non-composite key"));
    assert!(!members.as_definition().is_auto_increment());
}

#[test]
fn test_definition_defaults() {
    let mut schema = SchemaBuilder::new();
    schema.define("accounts").unwrap();
    let schema = schema.finalize().unwrap();

    let accounts = schema.by_table("accounts").unwrap();
    assert_eq!(accounts.primary_key(), ["id"]);
    assert!(!accounts.is_auto_increment());
    assert!(!accounts.is_read_only());
    assert!(accounts.soft_delete_column().is_none());
}

#[test]
fn test_mutual_relationships_finalize() {
    let mut schema = SchemaBuilder::new();
    let a = schema.define("parents").unwrap().id();
    let b = schema
        .define("children")
        .unwrap()
        .add_columns(["parent_id"])
        .unwrap()
        .add_to_one(a, "parent", "id", "parent_id")
        .unwrap()
        .id();
    schema
        .definition_mut(a)
        .unwrap()
        .add_to_many_by_key(b, "children", "parent_id")
        .unwrap();

    let schema = schema.finalize().unwrap();
    let reachable = schema.reachable_from(schema.id_of("children").unwrap());
    assert_eq!(reachable.len(), 2);
}

#[test]
fn test_misconfigured_schema_reports_everything() {
    let mut schema = SchemaBuilder::new();
    let users = schema.define("users").unwrap().id();
    schema
        .define("comments")
        .unwrap()
        .add_to_one(users, "author", "id", "author_id")
        .unwrap()
        .add_to_one(users, "editor", "id", "editor_id")
        .unwrap();

    let err = schema.finalize().unwrap_err();
    let columns: Vec<_> = err
        .iter()
        .map(|v| match v {
            Violation::UnknownLocalColumn { column, .. } => column.as_str(),
            other => panic!("Unexpected violation {other:?}"),
        })
        .collect();
    assert_eq!(columns, vec!["author_id", "editor_id"]);

    let err: Error = err.into();
    assert!(err.to_string().contains("2 violation(s)"));
}

#[test]
fn test_document_matches_builder() {
    let doc = SchemaDocument::from_json_str(
        r#"{"tables": [
            {"table": "tags", "columns": ["label"]},
            {"table": "users", "auto_increment": true, "columns": ["name", "email"],
             "relationships": [
                {"name": "posts", "kind": "to_many", "related": "posts", "foreign_column": "author_id"}
             ]},
            {"table": "posts", "columns": ["title", "body", "author_id"],
             "soft_delete_column": "deleted_at",
             "creation_data": {"created_at": "current_timestamp", "status": {"string": "draft"}},
             "modification_data": {"updated_at": "current_timestamp"},
             "relationships": [
                {"name": "author", "kind": "to_one", "related": "users",
                 "foreign_column": "id", "local_column": "author_id"},
                {"name": "tags", "kind": "to_many", "related": "tags",
                 "foreign_column": "id", "local_column": "id",
                 "join": {"table": "post_tags", "local_column": "post_id", "foreign_column": "tag_id"}}
             ]}
        ]}"#,
    )
    .unwrap();

    let from_doc = doc.build().unwrap();
    assert_eq!(from_doc.fingerprint(), setup_blog_schema().fingerprint());
}

#[test]
fn test_snapshot_file_roundtrip() {
    let schema = setup_blog_schema();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blog.relmap");

    std::fs::write(&path, schema.to_bytes().unwrap()).unwrap();
    let loaded = Schema::from_bytes(&std::fs::read(&path).unwrap()).unwrap();

    assert_eq!(loaded.fingerprint(), schema.fingerprint());
    assert_eq!(loaded.len(), schema.len());
    let posts = loaded.by_table("posts").unwrap();
    let tags = posts.relationship("tags").unwrap();
    assert_eq!(loaded.related(tags).unwrap().table(), "tags");
}

#[test]
fn test_loaded_snapshot_ignores_unrelated_builder_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secrets.relmap");

    let mut writer = SchemaBuilder::new();
    writer.define("secrets").unwrap();
    std::fs::write(&path, writer.finalize().unwrap().to_bytes().unwrap()).unwrap();

    let loaded = Schema::from_bytes(&std::fs::read(&path).unwrap()).unwrap();
    let mut unrelated = SchemaBuilder::new();
    let users = unrelated.define("users").unwrap().id();

    assert!(loaded.definition(users).is_none());
    assert_eq!(users.index(), 0);
    let secrets = loaded.id_of("secrets").unwrap();
    assert_eq!(loaded.definition(secrets).unwrap().table(), "secrets");
}

#[test]
fn test_handle_swap_keeps_old_readers_valid() {
    let handle = Arc::new(SchemaHandle::new(setup_blog_schema()));
    let old = handle.current();

    let mut next = SchemaBuilder::new();
    next.define("users").unwrap();
    let version = handle.replace(next.finalize().unwrap());

    assert_eq!(version, 2);
    assert_eq!(old.len(), 3);
    assert_eq!(handle.current().len(), 1);
}
