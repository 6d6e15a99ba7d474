use labsearch_criteria::{AttributeCriterion, Criterion};

use super::CriteriaCompiler;
use crate::search::query_builder::clauses::{build_value_clause, TypedExpr};
use crate::{Error, Result};

impl CriteriaCompiler<'_> {
    pub(super) fn compile_attribute(
        &mut self,
        criterion: &Criterion,
        attribute: &AttributeCriterion,
        alias: &str,
    ) -> Result<String> {
        let mapping = self.mapping();
        let Some(column) = mapping.attribute(&attribute.field) else {
            return Err(Error::UnknownField {
                criterion: criterion.class_name(),
                field: attribute.field.clone(),
            });
        };

        if !attribute.value.kind().accepts(&column.data_type) {
            let known: Vec<String> = mapping
                .attributes
                .iter()
                .map(|(name, c)| format!("{}={}", name, c.data_type))
                .collect();
            return Err(Error::TypeMismatch {
                criterion: criterion.class_name(),
                field: attribute.field.clone(),
                data_type: column.data_type.to_string(),
                data_types: format!("{{{}}}", known.join(", ")),
            });
        }

        let sql = format!("{}.{}", alias, column.column);
        build_value_clause(
            TypedExpr {
                sql: &sql,
                data_type: &column.data_type,
                stored_as_text: false,
            },
            &attribute.value,
            &mut self.bind_params,
        )
    }
}
