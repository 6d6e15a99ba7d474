use labsearch_criteria::{DataType, DateOperator, DatePredicate};

use super::super::bind::{push_date, push_timestamp};
use super::super::BindValue;
use super::TypedExpr;
use crate::Result;

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Compiles a date comparison. A date covers the half-open interval of its precision
/// unit, so `On` is a range check and the strict/non-strict comparisons pick the
/// interval bound they need.
pub(super) fn build_date_clause(
    expr: TypedExpr<'_>,
    pred: &DatePredicate,
    bind_params: &mut Vec<BindValue>,
) -> Result<String> {
    let column = expr.cast();
    let mut bind = |bound: Bound| -> Result<usize> {
        if matches!(expr.data_type, DataType::Date) {
            let (start, end) = pred.value.date_range();
            let value = match bound {
                Bound::Start => start,
                Bound::End => end,
            };
            Ok(push_date(bind_params, value))
        } else {
            let (start, end) = pred.value.utc_range()?;
            let value = match bound {
                Bound::Start => start,
                Bound::End => end,
            };
            Ok(push_timestamp(bind_params, value))
        }
    };

    let clause = match pred.operator {
        DateOperator::On => {
            let start = bind(Bound::Start)?;
            let end = bind(Bound::End)?;
            format!("({c} >= ${} AND {c} < ${})", start, end, c = column)
        }
        DateOperator::Earlier => format!("{} < ${}", column, bind(Bound::Start)?),
        DateOperator::EarlierOrEqual => format!("{} < ${}", column, bind(Bound::End)?),
        DateOperator::Later => format!("{} >= ${}", column, bind(Bound::End)?),
        DateOperator::LaterOrEqual => format!("{} >= ${}", column, bind(Bound::Start)?),
    };
    Ok(clause)
}
