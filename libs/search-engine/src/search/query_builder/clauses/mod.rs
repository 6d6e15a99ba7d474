//! Value predicates compiled against a single SQL expression.

mod date;
mod number;
mod string;

use labsearch_criteria::{DataType, FieldValue};

use super::bind::push_bool;
use super::BindValue;
use crate::Result;

pub(crate) use string::{build_string_clause, escape_like_pattern};

/// A SQL expression whose stored data type is known.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TypedExpr<'a> {
    pub sql: &'a str,
    pub data_type: &'a DataType,
    /// Property values live in a text column and are cast to their data type before
    /// comparison; attribute columns are already typed.
    pub stored_as_text: bool,
}

/// Whether text values of `data_type` need a cast before typed comparison.
pub(crate) fn is_cast_from_text(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Integer | DataType::Real | DataType::Timestamp | DataType::Date | DataType::Boolean
    )
}

impl TypedExpr<'_> {
    /// The expression cast to the SQL type matching its data type.
    pub fn cast(&self) -> String {
        if !self.stored_as_text || !is_cast_from_text(self.data_type) {
            return self.sql.to_string();
        }
        match self.data_type {
            DataType::Integer | DataType::Real => format!("({})::numeric", self.sql),
            DataType::Timestamp => format!("({})::timestamptz", self.sql),
            DataType::Date => format!("({})::date", self.sql),
            DataType::Boolean => format!("({})::boolean", self.sql),
            _ => self.sql.to_string(),
        }
    }
}

/// Compiles `value` into a boolean SQL expression over `expr`.
pub(crate) fn build_value_clause(
    expr: TypedExpr<'_>,
    value: &FieldValue,
    bind_params: &mut Vec<BindValue>,
) -> Result<String> {
    match value {
        FieldValue::String(pred) => build_string_clause(expr.sql, pred, bind_params),
        FieldValue::Number(pred) => Ok(number::build_number_clause(&expr.cast(), pred, bind_params)),
        FieldValue::Date(pred) => date::build_date_clause(expr, pred, bind_params),
        FieldValue::Boolean { value } => {
            let idx = push_bool(bind_params, *value);
            Ok(format!("{} = ${}", expr.cast(), idx))
        }
    }
}
