use labsearch_criteria::NumberPredicate;

use super::super::bind::push_numeric;
use super::super::BindValue;

pub(super) fn build_number_clause(
    expr: &str,
    pred: &NumberPredicate,
    bind_params: &mut Vec<BindValue>,
) -> String {
    let idx = push_numeric(bind_params, pred.value);
    format!("{} {} ${}", expr, pred.operator.sql_operator(), idx)
}
