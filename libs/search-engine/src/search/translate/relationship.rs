use labsearch_criteria::{Criterion, RelationDirection, RelationshipCriterion};

use super::CriteriaCompiler;
use crate::search::query_builder::bind::push_text;
use crate::{Error, Result};

impl CriteriaCompiler<'_> {
    /// Membership test against the entities one relationship hop away from the set
    /// matched by the nested criteria.
    pub(super) fn compile_relationship(
        &mut self,
        criterion: &Criterion,
        relationship: &RelationshipCriterion,
        alias: &str,
    ) -> Result<String> {
        let mapping = self.mapping();
        let Some(rel) = mapping.relationships.as_ref() else {
            return Err(Error::UnknownField {
                criterion: criterion.class_name(),
                field: relationship.relation_type.code().to_string(),
            });
        };

        let nested_alias = self.next_alias("t");
        let nested = self.compile(&relationship.nested, &nested_alias)?;
        let subquery = format!(
            "SELECT {n}.{id} FROM {table} {n} WHERE {pred}{deleted}",
            n = nested_alias,
            id = mapping.id_column,
            table = mapping.entities_table,
            pred = nested,
            deleted = mapping.not_deleted(&nested_alias),
        );

        // The nested criteria describe the other end of the relation.
        let (own_field, other_field) = match relationship.direction {
            RelationDirection::Parent => (&rel.child_id_field, &rel.parent_id_field),
            RelationDirection::Child => (&rel.parent_id_field, &rel.child_id_field),
        };

        let r = self.next_alias("r");
        let rt = self.next_alias("rt");
        let code_idx = push_text(
            &mut self.bind_params,
            relationship.relation_type.code().to_string(),
        );

        Ok(format!(
            "{alias}.{id} IN (SELECT {r}.{own} FROM {rel_table} {r} \
             WHERE {r}.{other} IN ({subquery}) \
             AND {r}.{type_field} = (SELECT {rt}.id FROM {types_table} {rt} WHERE {rt}.code = ${code}))",
            alias = alias,
            id = mapping.id_column,
            r = r,
            own = own_field,
            rel_table = rel.table,
            other = other_field,
            subquery = subquery,
            type_field = rel.relation_type_field,
            rt = rt,
            types_table = rel.relation_types_table,
            code = code_idx,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::context;
    use super::super::translate;
    use crate::search::query_builder::BindValue;
    use crate::Error;
    use labsearch_criteria::{Criterion, EntityKind, RelationType};

    #[test]
    fn parents_criterion_selects_children_of_matching_parents() {
        let criteria = Criterion::with_parents(
            RelationType::ParentChild,
            Criterion::attribute_equals("code", "P1"),
        );
        let q = translate(&context(EntityKind::Sample, criteria)).unwrap();
        assert_eq!(
            q.sql(),
            "SELECT DISTINCT t0.id FROM samples_all t0 WHERE t0.id IN (\
             SELECT r2.sample_id_child FROM sample_relationships_all r2 \
             WHERE r2.sample_id_parent IN (SELECT t1.id FROM samples_all t1 WHERE t1.code = $1 AND t1.del_id IS NULL) \
             AND r2.relationship_id = (SELECT rt3.id FROM relationship_types rt3 WHERE rt3.code = $2)) \
             AND t0.del_id IS NULL"
        );
        assert_eq!(
            q.args(),
            &[
                BindValue::Text("P1".into()),
                BindValue::Text("PARENT_CHILD".into())
            ]
        );
    }

    #[test]
    fn children_criterion_swaps_relationship_ends() {
        let criteria = Criterion::with_children(
            RelationType::ContainerComponent,
            Criterion::and(vec![]),
        );
        let q = translate(&context(EntityKind::Sample, criteria)).unwrap();
        assert!(q.sql().contains("SELECT r2.sample_id_parent FROM sample_relationships_all r2"));
        assert!(q.sql().contains("WHERE r2.sample_id_child IN (SELECT t1.id FROM samples_all t1 WHERE TRUE"));
        assert_eq!(q.args(), &[BindValue::Text("CONTAINER_COMPONENT".into())]);
    }

    #[test]
    fn nested_relationships_get_distinct_aliases() {
        let criteria = Criterion::with_parents(
            RelationType::ParentChild,
            Criterion::with_parents(
                RelationType::ParentChild,
                Criterion::attribute_equals("code", "GRANDPARENT"),
            ),
        );
        let q = translate(&context(EntityKind::DataSet, criteria)).unwrap();
        for alias in ["t1", "t2", "r3", "rt4", "r5", "rt6"] {
            assert!(q.sql().contains(&format!(" {} ", alias)), "missing alias {alias}");
        }
    }

    #[test]
    fn kinds_without_relationships_reject_relationship_criteria() {
        let criteria = Criterion::with_children(RelationType::ParentChild, Criterion::and(vec![]));
        let err = translate(&context(EntityKind::Experiment, criteria)).unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "PARENT_CHILD"));
    }
}
