//! SQL building blocks shared by the translators.
//!
//! Every translator produces a [`SelectQuery`]: SQL text with `$n` placeholders plus
//! the values bound to them, in placeholder order. User-supplied values only ever
//! travel in the argument list.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::{Error, Result};

pub(crate) mod bind;
pub(crate) mod clauses;

/// Bind values for `sqlx` queries.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    BigInt(i64),
    BigIntArray(Vec<i64>),
    Numeric(Decimal),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Boolean(bool),
}

/// SQL text together with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    sql: String,
    args: Vec<BindValue>,
}

impl SelectQuery {
    /// Builds a query, checking that every argument is referenced by exactly one
    /// placeholder index and every placeholder has an argument.
    pub fn new(sql: String, args: Vec<BindValue>) -> Result<Self> {
        let used = placeholder_indexes(&sql);
        let expected: BTreeSet<usize> = (1..=args.len()).collect();
        if used != expected {
            tracing::error!(sql = %sql, args = args.len(), "Placeholder/argument mismatch");
            return Err(Error::Internal(format!(
                "query uses placeholders {:?} but has {} arguments",
                used,
                args.len()
            )));
        }
        Ok(Self { sql, args })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[BindValue] {
        &self.args
    }

    pub fn into_parts(self) -> (String, Vec<BindValue>) {
        (self.sql, self.args)
    }
}

/// Distinct `$n` placeholder indexes referenced by `sql`.
///
/// Quoted literals are skipped, so a `$` inside `'...'` is not counted.
pub fn placeholder_indexes(sql: &str) -> BTreeSet<usize> {
    let mut out = BTreeSet::new();
    let bytes = sql.as_bytes();
    let mut in_literal = false;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                in_literal = !in_literal;
                i += 1;
            }
            b'$' if !in_literal => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end > start {
                    if let Ok(n) = sql[start..end].parse::<usize>() {
                        out.insert(n);
                    }
                }
                i = end.max(i + 1);
            }
            _ => i += 1,
        }
    }
    out
}
