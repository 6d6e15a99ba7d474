use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::BindValue;

pub(crate) fn push_text(bind_params: &mut Vec<BindValue>, value: String) -> usize {
    bind_params.push(BindValue::Text(value));
    bind_params.len()
}

pub(crate) fn push_bigint_array(bind_params: &mut Vec<BindValue>, value: Vec<i64>) -> usize {
    bind_params.push(BindValue::BigIntArray(value));
    bind_params.len()
}

pub(crate) fn push_bigint(bind_params: &mut Vec<BindValue>, value: i64) -> usize {
    bind_params.push(BindValue::BigInt(value));
    bind_params.len()
}

pub(crate) fn push_numeric(bind_params: &mut Vec<BindValue>, value: Decimal) -> usize {
    bind_params.push(BindValue::Numeric(value));
    bind_params.len()
}

pub(crate) fn push_float(bind_params: &mut Vec<BindValue>, value: f64) -> usize {
    bind_params.push(BindValue::Float(value));
    bind_params.len()
}

pub(crate) fn push_timestamp(bind_params: &mut Vec<BindValue>, value: DateTime<Utc>) -> usize {
    bind_params.push(BindValue::Timestamp(value));
    bind_params.len()
}

pub(crate) fn push_date(bind_params: &mut Vec<BindValue>, value: NaiveDate) -> usize {
    bind_params.push(BindValue::Date(value));
    bind_params.len()
}

pub(crate) fn push_bool(bind_params: &mut Vec<BindValue>, value: bool) -> usize {
    bind_params.push(BindValue::Boolean(value));
    bind_params.len()
}
