//! Whole-graph checks run when a schema is finalized.

use super::definition::{Definition, DefinitionId};
use super::relationship::Relationship;
use crate::error::Violation;

/// Walk the relationship graph from every definition and collect violations.
///
/// Each definition is visited once, so cycles terminate. Results are ordered
/// by definition, then by relationship, regardless of traversal order.
pub(super) fn check(registry: u64, definitions: &[&Definition]) -> Vec<Violation> {
    let mut found: Vec<Vec<Violation>> = vec![Vec::new(); definitions.len()];
    let mut visited = vec![false; definitions.len()];

    for root in 0..definitions.len() {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![root];

        while let Some(index) = stack.pop() {
            let owner = definitions[index];
            let out = &mut found[index];
            check_definition(owner, out);

            for rel in owner.relationships() {
                let Some(related) = resolve(registry, definitions, rel.related_definition()) else {
                    out.push(Violation::DanglingReference {
                        table: owner.table().to_string(),
                        relationship: rel.name().to_string(),
                        index: rel.related_definition().index(),
                    });
                    check_local_column(owner, rel, out);
                    continue;
                };

                check_local_column(owner, rel, out);
                check_foreign_column(owner, rel, related, out);
                check_join(owner, rel, related, out);

                let next = related.id().index() as usize;
                if !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
    }

    found.into_iter().flatten().collect()
}

fn resolve<'a>(
    registry: u64,
    definitions: &[&'a Definition],
    id: DefinitionId,
) -> Option<&'a Definition> {
    if id.registry() != registry {
        return None;
    }
    definitions.get(id.index() as usize).copied()
}

fn check_definition(def: &Definition, out: &mut Vec<Violation>) {
    if let Some(column) = def.soft_delete_column() {
        if def.primary_key().iter().any(|k| k == column) {
            out.push(Violation::SoftDeleteOnKey {
                table: def.table().to_string(),
                column: column.to_string(),
            });
        }
    }
}

// Local columns may be any key column even when not listed in `columns`.
fn check_local_column(owner: &Definition, rel: &Relationship, out: &mut Vec<Violation>) {
    if !owner.has_column(rel.local_column()) {
        out.push(Violation::UnknownLocalColumn {
            table: owner.table().to_string(),
            relationship: rel.name().to_string(),
            column: rel.local_column().to_string(),
        });
    }
}

fn check_foreign_column(
    owner: &Definition,
    rel: &Relationship,
    related: &Definition,
    out: &mut Vec<Violation>,
) {
    if !related.has_column(rel.foreign_column()) {
        out.push(Violation::UnknownForeignColumn {
            table: owner.table().to_string(),
            relationship: rel.name().to_string(),
            related: related.table().to_string(),
            column: rel.foreign_column().to_string(),
        });
    }
}

fn check_join(
    owner: &Definition,
    rel: &Relationship,
    related: &Definition,
    out: &mut Vec<Violation>,
) {
    let Some(join) = rel.join_info() else {
        return;
    };

    if [&join.table, &join.local_column, &join.foreign_column]
        .iter()
        .any(|s| s.trim().is_empty())
    {
        out.push(Violation::EmptyJoinColumn {
            table: owner.table().to_string(),
            relationship: rel.name().to_string(),
        });
    }
    if join.table == owner.table() || join.table == related.table() {
        out.push(Violation::JoinTableCollision {
            table: owner.table().to_string(),
            relationship: rel.name().to_string(),
            join_table: join.table.clone(),
        });
    }
}
