//! Criteria-to-SQL translation.
//!
//! A criteria tree compiles into a single `SELECT DISTINCT` over the entity table:
//!
//! ```sql
//! SELECT DISTINCT t0.id FROM samples_all t0
//! WHERE (<compiled criteria>) AND t0.del_id IS NULL AND t0.id = ANY($n)
//! ```
//!
//! Composite nodes become parenthesized `AND`/`OR` groups, attribute leaves direct
//! column comparisons, property leaves `EXISTS` subqueries over the property-value
//! table and relationship leaves `IN` subqueries over the relationship table that
//! embed a full translation of the nested criteria.

mod attribute;
mod property;
mod relationship;

use labsearch_criteria::{CompositeCriterion, Criterion};

use super::context::TranslationContext;
use super::query_builder::{BindValue, SelectQuery};
use crate::config::is_sql_identifier;
use crate::db::TableMapping;
use crate::{Error, Result};

/// Alias of the searched entity table in the outermost query.
pub(crate) const ROOT_ALIAS: &str = "t0";

/// Translates the context's criteria into a query selecting the configured id column.
pub fn translate(context: &TranslationContext) -> Result<SelectQuery> {
    let mapping = context.mapping();
    let id_column = context.id_column();
    if !is_sql_identifier(id_column) {
        return Err(Error::InvalidValue(format!(
            "'{}' is not a valid id column",
            id_column
        )));
    }

    let mut compiler = CriteriaCompiler::new(context);
    let predicate = compiler.compile(context.criteria(), ROOT_ALIAS)?;

    let mut sql = format!(
        "SELECT DISTINCT {a}.{id} FROM {table} {a} WHERE {pred}{deleted}",
        a = ROOT_ALIAS,
        id = id_column,
        table = mapping.entities_table,
        pred = predicate,
        deleted = mapping.not_deleted(ROOT_ALIAS),
    );

    if let Some(auth) = context.authorisation().build_sql(
        ROOT_ALIAS,
        &mapping.id_column,
        &mut compiler.bind_params,
    ) {
        sql.push_str(" AND ");
        sql.push_str(&auth);
    }

    tracing::debug!(
        kind = %context.kind(),
        user_id = ?context.user_id(),
        args = compiler.bind_params.len(),
        sql = %sql,
        "Translated search criteria"
    );

    SelectQuery::new(sql, compiler.bind_params)
}

/// Recursive compiler state for one translation: the growing argument list and the
/// counter that keeps subquery aliases unique.
pub(crate) struct CriteriaCompiler<'a> {
    context: &'a TranslationContext,
    pub(crate) bind_params: Vec<BindValue>,
    alias_counter: usize,
}

impl<'a> CriteriaCompiler<'a> {
    pub(crate) fn new(context: &'a TranslationContext) -> Self {
        Self {
            context,
            bind_params: Vec::new(),
            alias_counter: 0,
        }
    }

    fn mapping(&self) -> &'a TableMapping {
        self.context.mapping()
    }

    fn next_alias(&mut self, prefix: &str) -> String {
        self.alias_counter += 1;
        format!("{}{}", prefix, self.alias_counter)
    }

    /// Compiles `criterion` into a boolean SQL expression over the entity row `alias`.
    pub(crate) fn compile(&mut self, criterion: &Criterion, alias: &str) -> Result<String> {
        match criterion {
            Criterion::Composite(c) => self.compile_composite(c, alias),
            Criterion::Attribute(a) => self.compile_attribute(criterion, a, alias),
            Criterion::Property(p) => self.compile_property(criterion, p, alias),
            Criterion::AnyProperty(p) => self.compile_any_property(criterion, p, alias),
            Criterion::Relationship(r) => self.compile_relationship(criterion, r, alias),
        }
    }

    fn compile_composite(&mut self, composite: &CompositeCriterion, alias: &str) -> Result<String> {
        let body = if composite.children.is_empty() {
            composite.operator.identity_sql().to_string()
        } else {
            let mut parts = Vec::with_capacity(composite.children.len());
            for child in &composite.children {
                parts.push(self.compile(child, alias)?);
            }
            if parts.len() == 1 {
                parts.remove(0)
            } else {
                format!("({})", parts.join(&format!(" {} ", composite.operator.as_sql())))
            }
        };

        if composite.negated {
            Ok(format!("NOT ({})", body))
        } else {
            Ok(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SchemaMetadataProvider, StandardSchema};
    use crate::search::context::AuthorisationInformation;
    use crate::search::query_builder::placeholder_indexes;
    use labsearch_criteria::{
        DataType, EntityKind, NumberOperator, PropertyTypeMap, PropertyTypeRecord, RelationType,
        StringOperator,
    };
    use rust_decimal::Decimal;
    use std::sync::Arc;

    pub(super) fn context(kind: EntityKind, criteria: Criterion) -> TranslationContext {
        let mapping = StandardSchema::new().table_for(kind).unwrap().clone();
        TranslationContext::new(mapping, criteria).with_property_types(Arc::new(
            PropertyTypeMap::new(vec![
                PropertyTypeRecord::new("ANSWER", DataType::Integer),
                PropertyTypeRecord::new("NOTES", DataType::MultilineVarchar),
                PropertyTypeRecord::new("FLAG", DataType::Boolean),
                PropertyTypeRecord::internal("NAME", DataType::Varchar),
            ]),
        ))
    }

    #[test]
    fn empty_and_matches_all_rows() {
        let q = translate(&context(EntityKind::Sample, Criterion::and(vec![]))).unwrap();
        assert_eq!(
            q.sql(),
            "SELECT DISTINCT t0.id FROM samples_all t0 WHERE TRUE AND t0.del_id IS NULL"
        );
        assert!(q.args().is_empty());
    }

    #[test]
    fn empty_or_matches_no_rows() {
        let q = translate(&context(EntityKind::Sample, Criterion::or(vec![]))).unwrap();
        assert!(q.sql().contains("WHERE FALSE AND t0.del_id IS NULL"));
    }

    #[test]
    fn composite_joins_children_with_operator() {
        let criteria = Criterion::or(vec![
            Criterion::attribute_equals("code", "S1"),
            Criterion::attribute_equals("perm_id", "20240101-1"),
        ]);
        let q = translate(&context(EntityKind::Sample, criteria)).unwrap();
        assert!(q.sql().contains("WHERE (t0.code ILIKE $1 ESCAPE '\\' OR t0.perm_id ILIKE $2 ESCAPE '\\')"));
        assert_eq!(
            q.args(),
            &[
                BindValue::Text("S1".into()),
                BindValue::Text("20240101-1".into())
            ]
        );
    }

    #[test]
    fn negated_composite_is_wrapped_in_not() {
        let criteria = Criterion::not(Criterion::attribute_equals("code", "S1"));
        let q = translate(&context(EntityKind::Sample, criteria)).unwrap();
        assert!(q.sql().contains("WHERE NOT (t0.code ILIKE $1 ESCAPE '\\')"));
    }

    #[test]
    fn authorisation_is_conjoined_at_top_level() {
        let ctx = context(EntityKind::Sample, Criterion::attribute_equals("code", "S1"))
            .with_authorisation(AuthorisationInformation::visible_ids([7, 8]));
        let q = translate(&ctx).unwrap();
        assert!(q.sql().ends_with("AND t0.id = ANY($2)"));
        assert_eq!(q.args()[1], BindValue::BigIntArray(vec![7, 8]));
    }

    #[test]
    fn projects_configured_id_column() {
        let ctx = context(EntityKind::Sample, Criterion::and(vec![])).with_id_column("perm_id");
        let q = translate(&ctx).unwrap();
        assert!(q.sql().starts_with("SELECT DISTINCT t0.perm_id FROM samples_all t0"));

        let ctx = context(EntityKind::Sample, Criterion::and(vec![])).with_id_column("id, code");
        assert!(matches!(translate(&ctx), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn placeholders_match_arguments_for_mixed_tree() {
        let criteria = Criterion::and(vec![
            Criterion::attribute_equals("code", "S1"),
            Criterion::or(vec![
                Criterion::number_property("ANSWER", NumberOperator::Greater, Decimal::from(10)),
                Criterion::string_property("$NAME", StringOperator::Contains, "buffer"),
                Criterion::any_property(StringOperator::StartsWith, "ph"),
            ]),
            Criterion::with_parents(
                RelationType::ParentChild,
                Criterion::and(vec![
                    Criterion::boolean_property("FLAG", true),
                    Criterion::attribute_equals("code", "P1"),
                ]),
            ),
        ]);
        let ctx = context(EntityKind::Sample, criteria)
            .with_authorisation(AuthorisationInformation::visible_ids([1, 2, 3]));
        let q = translate(&ctx).unwrap();

        let expected: Vec<usize> = (1..=q.args().len()).collect();
        let found: Vec<usize> = placeholder_indexes(q.sql()).into_iter().collect();
        assert_eq!(found, expected);
        assert!(!q.sql().contains("buffer"));
        assert!(!q.sql().contains("S1"));
    }
}
