use labsearch_criteria::{AnyPropertyCriterion, Criterion, PropertyCriterion};

use super::CriteriaCompiler;
use crate::search::query_builder::bind::push_text;
use crate::search::query_builder::clauses::{
    build_string_clause, build_value_clause, is_cast_from_text, TypedExpr,
};
use crate::{Error, Result};

impl CriteriaCompiler<'_> {
    /// `EXISTS` over the property values of the entity, restricted to one property type.
    pub(super) fn compile_property(
        &mut self,
        criterion: &Criterion,
        property: &PropertyCriterion,
        alias: &str,
    ) -> Result<String> {
        let mapping = self.mapping();
        let Some(types) = self.context.property_types() else {
            tracing::error!(
                property = %property.property_code,
                "Property criterion reached translation without property types"
            );
            return Err(Error::Internal(
                "property types were not loaded for a criteria tree with property criteria"
                    .to_string(),
            ));
        };

        let unknown = || Error::UnknownField {
            criterion: criterion.class_name(),
            field: property.property_code.clone(),
        };
        let tables = mapping.properties.as_ref().ok_or_else(unknown)?;
        let record = types.get(&property.property_code).ok_or_else(unknown)?;

        if !property.value_kind().accepts(&record.data_type) {
            return Err(Error::TypeMismatch {
                criterion: criterion.class_name(),
                field: property.property_code.clone(),
                data_type: record.data_type.to_string(),
                data_types: types.describe(),
            });
        }

        let values = self.next_alias("sp");
        let assignments = self.next_alias("etpt");
        let property_types = self.next_alias("pt");

        let code_idx = push_text(&mut self.bind_params, record.code.clone());
        let internal = if record.is_managed_internally { "TRUE" } else { "FALSE" };
        // The planner may evaluate the comparison before the property-type join
        // filters rows, so casts only ever see values of this property type.
        let value_sql = if is_cast_from_text(&record.data_type) {
            format!(
                "CASE WHEN {pt}.code = ${code} AND {pt}.is_managed_internally = {internal} \
                 THEN {v}.value END",
                pt = property_types,
                code = code_idx,
                internal = internal,
                v = values,
            )
        } else {
            format!("{}.value", values)
        };
        let clause = build_value_clause(
            TypedExpr {
                sql: &value_sql,
                data_type: &record.data_type,
                stored_as_text: true,
            },
            &property.value,
            &mut self.bind_params,
        )?;

        Ok(format!(
            "EXISTS (SELECT 1 FROM {vt} {v} \
             JOIN {at} {a} ON {a}.id = {v}.{af} \
             JOIN {ptt} {pt} ON {pt}.id = {a}.{pf} \
             WHERE {v}.{ef} = {alias}.{id} AND {pt}.code = ${code} \
             AND {pt}.is_managed_internally = {internal} AND {clause})",
            vt = tables.values_table,
            v = values,
            at = tables.assignments_table,
            a = assignments,
            af = tables.assignment_field,
            ptt = tables.property_types_table,
            pt = property_types,
            pf = tables.property_type_field,
            ef = tables.entity_id_field,
            alias = alias,
            id = mapping.id_column,
            code = code_idx,
            internal = internal,
            clause = clause,
        ))
    }

    /// `EXISTS` over all property values of the entity, whatever their type.
    pub(super) fn compile_any_property(
        &mut self,
        criterion: &Criterion,
        any: &AnyPropertyCriterion,
        alias: &str,
    ) -> Result<String> {
        let mapping = self.mapping();
        let Some(tables) = mapping.properties.as_ref() else {
            return Err(Error::UnknownField {
                criterion: criterion.class_name(),
                field: "properties".to_string(),
            });
        };

        let values = self.next_alias("sp");
        let value_sql = format!("{}.value", values);
        let clause = build_string_clause(&value_sql, &any.value, &mut self.bind_params)?;

        Ok(format!(
            "EXISTS (SELECT 1 FROM {vt} {v} WHERE {v}.{ef} = {alias}.{id} AND {clause})",
            vt = tables.values_table,
            v = values,
            ef = tables.entity_id_field,
            alias = alias,
            id = mapping.id_column,
            clause = clause,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::context;
    use super::super::translate;
    use crate::search::query_builder::BindValue;
    use crate::search::context::TranslationContext;
    use crate::db::{SchemaMetadataProvider, StandardSchema};
    use crate::Error;
    use labsearch_criteria::{Criterion, EntityKind, NumberOperator, StringOperator};
    use rust_decimal::Decimal;

    #[test]
    fn numeric_property_compiles_to_exists_with_cast() {
        let criteria =
            Criterion::number_property("ANSWER", NumberOperator::Greater, Decimal::from(10));
        let q = translate(&context(EntityKind::Sample, criteria)).unwrap();
        assert_eq!(
            q.sql(),
            "SELECT DISTINCT t0.id FROM samples_all t0 WHERE EXISTS (SELECT 1 FROM sample_properties sp1 \
             JOIN sample_type_property_types etpt2 ON etpt2.id = sp1.stpt_id \
             JOIN property_types pt3 ON pt3.id = etpt2.prty_id \
             WHERE sp1.samp_id = t0.id AND pt3.code = $1 \
             AND pt3.is_managed_internally = FALSE \
             AND (CASE WHEN pt3.code = $1 AND pt3.is_managed_internally = FALSE \
             THEN sp1.value END)::numeric > $2) AND t0.del_id IS NULL"
        );
        assert_eq!(
            q.args(),
            &[
                BindValue::Text("ANSWER".into()),
                BindValue::Numeric(Decimal::from(10))
            ]
        );
    }

    #[test]
    fn typed_casts_are_guarded_by_property_type() {
        let criteria = Criterion::and(vec![
            Criterion::boolean_property("FLAG", true),
            Criterion::string_property("NOTES", StringOperator::Contains, "buffer"),
        ]);
        let q = translate(&context(EntityKind::Sample, criteria)).unwrap();
        assert!(q.sql().contains(
            "(CASE WHEN pt3.code = $1 AND pt3.is_managed_internally = FALSE THEN sp1.value END)::boolean = $2"
        ));
        assert!(q.sql().contains("AND sp4.value ILIKE $4 ESCAPE '\\'"));
    }

    #[test]
    fn internal_property_binds_bare_code() {
        let criteria = Criterion::string_property("$NAME", StringOperator::Equals, "x");
        let q = translate(&context(EntityKind::Sample, criteria)).unwrap();
        assert!(q.sql().contains("pt3.is_managed_internally = TRUE"));
        assert_eq!(q.args()[0], BindValue::Text("NAME".into()));
    }

    #[test]
    fn type_mismatch_is_rechecked_at_translation() {
        let criteria = Criterion::number_property("NOTES", NumberOperator::Less, Decimal::from(1));
        let err = translate(&context(EntityKind::Sample, criteria)).unwrap_err();
        assert!(err.is_user_error());
        assert!(err.to_string().contains("MULTILINE_VARCHAR"));
    }

    #[test]
    fn unknown_property_is_reported() {
        let criteria = Criterion::boolean_property("MISSING", true);
        let err = translate(&context(EntityKind::Sample, criteria)).unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "MISSING"));
    }

    #[test]
    fn missing_property_types_is_internal() {
        let mapping = StandardSchema::new()
            .table_for(EntityKind::Sample)
            .unwrap()
            .clone();
        let ctx = TranslationContext::new(mapping, Criterion::boolean_property("FLAG", true));
        assert!(matches!(translate(&ctx), Err(Error::Internal(_))));
    }

    #[test]
    fn any_property_needs_no_type_lookup() {
        let mapping = StandardSchema::new()
            .table_for(EntityKind::Experiment)
            .unwrap()
            .clone();
        let ctx = TranslationContext::new(
            mapping,
            Criterion::any_property(StringOperator::Contains, "buffer"),
        );
        let q = translate(&ctx).unwrap();
        assert!(q.sql().contains(
            "EXISTS (SELECT 1 FROM experiment_properties sp1 WHERE sp1.expe_id = t0.id AND sp1.value ILIKE $1 ESCAPE '\\')"
        ));
        assert_eq!(q.args(), &[BindValue::Text("%buffer%".into())]);
    }

    #[test]
    fn spaces_have_no_properties() {
        let criteria = Criterion::any_property(StringOperator::Contains, "x");
        let err = translate(&context(EntityKind::Space, criteria)).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }
}
