use labsearch_criteria::{StringOperator, StringPredicate};

use super::super::bind::push_text;
use super::super::BindValue;
use crate::{Error, Result};

/// String comparisons are case-insensitive for every operator. `Equals` is an
/// `ILIKE` without wildcards.
pub(crate) fn build_string_clause(
    expr: &str,
    pred: &StringPredicate,
    bind_params: &mut Vec<BindValue>,
) -> Result<String> {
    let pattern = match pred.operator {
        StringOperator::Any => return Ok(format!("{} IS NOT NULL", expr)),
        _ if pred.value.is_empty() => {
            return Err(Error::Internal(format!(
                "string criterion {:?} on {} has no value",
                pred.operator, expr
            )));
        }
        StringOperator::Equals => escape_like_pattern(&pred.value),
        StringOperator::StartsWith => format!("{}%", escape_like_pattern(&pred.value)),
        StringOperator::EndsWith => format!("%{}", escape_like_pattern(&pred.value)),
        StringOperator::Contains => format!("%{}%", escape_like_pattern(&pred.value)),
    };

    let idx = push_text(bind_params, pattern);
    Ok(format!("{} ILIKE ${} ESCAPE '\\'", expr, idx))
}

pub(crate) fn escape_like_pattern(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            _ => out.push(ch),
        }
    }
    out
}
