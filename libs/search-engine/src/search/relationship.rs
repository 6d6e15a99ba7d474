//! One-hop relationship expansion.
//!
//! Expansion never recurses; callers that need ancestors or descendants further
//! away must iterate themselves and take care of cycles.

use labsearch_criteria::{RelationDirection, RelationType};
use std::collections::BTreeSet;

use super::query_builder::bind::{push_bigint_array, push_text};
use super::query_builder::SelectQuery;
use crate::db::{SqlExecutor, TableMapping};
use crate::{Error, Result};

/// Ids of the entities reached by one hop from `seed_ids`.
///
/// `RelationDirection::Child` follows parent to child, `RelationDirection::Parent`
/// the opposite way.
pub fn expansion_query(
    mapping: &TableMapping,
    seed_ids: &[i64],
    relation_type: RelationType,
    direction: RelationDirection,
) -> Result<SelectQuery> {
    let Some(rel) = mapping.relationships.as_ref() else {
        return Err(Error::UnknownField {
            criterion: match direction {
                RelationDirection::Parent => "ParentsCriterion",
                RelationDirection::Child => "ChildrenCriterion",
            }
            .to_string(),
            field: relation_type.code().to_string(),
        });
    };

    let (seed_field, target_field) = match direction {
        RelationDirection::Child => (&rel.parent_id_field, &rel.child_id_field),
        RelationDirection::Parent => (&rel.child_id_field, &rel.parent_id_field),
    };

    let mut bind_params = Vec::new();
    let seeds_idx = push_bigint_array(&mut bind_params, seed_ids.to_vec());
    let code_idx = push_text(&mut bind_params, relation_type.code().to_string());

    let sql = format!(
        "SELECT DISTINCT e.{id} AS id FROM {rel_table} rel \
         JOIN {table} e ON rel.{target} = e.{id} \
         WHERE rel.{seed} = ANY(${seeds}) \
         AND rel.{type_field} = (SELECT rt.id FROM {types_table} rt WHERE rt.code = ${code}){deleted}",
        id = mapping.id_column,
        rel_table = rel.table,
        table = mapping.entities_table,
        target = target_field,
        seed = seed_field,
        seeds = seeds_idx,
        type_field = rel.relation_type_field,
        types_table = rel.relation_types_table,
        code = code_idx,
        deleted = mapping.not_deleted("e"),
    );

    SelectQuery::new(sql, bind_params)
}

pub async fn find_child_ids(
    executor: &dyn SqlExecutor,
    mapping: &TableMapping,
    parent_ids: &[i64],
    relation_type: RelationType,
) -> Result<BTreeSet<i64>> {
    expand(executor, mapping, parent_ids, relation_type, RelationDirection::Child).await
}

pub async fn find_parent_ids(
    executor: &dyn SqlExecutor,
    mapping: &TableMapping,
    child_ids: &[i64],
    relation_type: RelationType,
) -> Result<BTreeSet<i64>> {
    expand(executor, mapping, child_ids, relation_type, RelationDirection::Parent).await
}

async fn expand(
    executor: &dyn SqlExecutor,
    mapping: &TableMapping,
    seed_ids: &[i64],
    relation_type: RelationType,
    direction: RelationDirection,
) -> Result<BTreeSet<i64>> {
    let query = expansion_query(mapping, seed_ids, relation_type, direction)?;
    if seed_ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let rows = executor.execute(&query).await?;
    rows.iter().map(|row| row.get_i64("id")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Row, SchemaMetadataProvider, SqlValue, StandardSchema};
    use crate::search::query_builder::BindValue;
    use async_trait::async_trait;
    use labsearch_criteria::EntityKind;
    use std::sync::Mutex;

    struct CannedExecutor {
        rows: Vec<Row>,
        executed: Mutex<Vec<SelectQuery>>,
    }

    #[async_trait]
    impl SqlExecutor for CannedExecutor {
        async fn execute(&self, query: &SelectQuery) -> Result<Vec<Row>> {
            self.executed.lock().unwrap().push(query.clone());
            Ok(self.rows.clone())
        }
    }

    fn samples() -> TableMapping {
        StandardSchema::new()
            .table_for(EntityKind::Sample)
            .unwrap()
            .clone()
    }

    #[test]
    fn child_query_projects_child_end() {
        let q = expansion_query(
            &samples(),
            &[1, 2],
            RelationType::ParentChild,
            RelationDirection::Child,
        )
        .unwrap();
        assert_eq!(
            q.sql(),
            "SELECT DISTINCT e.id AS id FROM sample_relationships_all rel \
             JOIN samples_all e ON rel.sample_id_child = e.id \
             WHERE rel.sample_id_parent = ANY($1) \
             AND rel.relationship_id = (SELECT rt.id FROM relationship_types rt WHERE rt.code = $2) \
             AND e.del_id IS NULL"
        );
        assert_eq!(
            q.args(),
            &[
                BindValue::BigIntArray(vec![1, 2]),
                BindValue::Text("PARENT_CHILD".into())
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_relationship_rows_yield_one_id() {
        let executor = CannedExecutor {
            rows: vec![
                Row::new().with("id", SqlValue::Int(5)),
                Row::new().with("id", SqlValue::Int(5)),
                Row::new().with("id", SqlValue::Int(4)),
            ],
            executed: Mutex::new(Vec::new()),
        };
        let ids = find_parent_ids(&executor, &samples(), &[9], RelationType::ParentChild)
            .await
            .unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![4, 5]);

        let executed = executor.executed.lock().unwrap();
        assert!(executed[0].sql().contains("rel.sample_id_child = ANY($1)"));
    }

    #[tokio::test]
    async fn empty_seed_set_skips_the_query() {
        let executor = CannedExecutor {
            rows: vec![Row::new().with("id", SqlValue::Int(1))],
            executed: Mutex::new(Vec::new()),
        };
        let ids = find_child_ids(&executor, &samples(), &[], RelationType::ParentChild)
            .await
            .unwrap();
        assert!(ids.is_empty());
        assert!(executor.executed.lock().unwrap().is_empty());
    }

    #[test]
    fn kinds_without_relationships_are_rejected() {
        let experiments = StandardSchema::new()
            .table_for(EntityKind::Experiment)
            .unwrap()
            .clone();
        let err = expansion_query(
            &experiments,
            &[1],
            RelationType::ParentChild,
            RelationDirection::Child,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }
}
