//! Typed value predicates carried by leaf criteria.

use crate::data_type::DataType;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic kind of a criterion value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Date,
    Boolean,
}

impl ValueKind {
    /// Whether a value of this kind may be compared against a field stored as `data_type`.
    pub fn accepts(self, data_type: &DataType) -> bool {
        match self {
            Self::String => matches!(
                data_type,
                DataType::Varchar | DataType::MultilineVarchar | DataType::Hyperlink | DataType::Xml
            ),
            Self::Number => matches!(data_type, DataType::Integer | DataType::Real),
            Self::Date => matches!(data_type, DataType::Timestamp | DataType::Date),
            Self::Boolean => matches!(data_type, DataType::Boolean),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::Boolean => "Boolean",
        }
    }
}

/// String comparison operator. Every operator ignores case, `Equals` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringOperator {
    Equals,
    StartsWith,
    EndsWith,
    Contains,
    /// Matches any non-null value.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringPredicate {
    pub operator: StringOperator,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberOperator {
    Equals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl NumberOperator {
    pub fn sql_operator(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberPredicate {
    pub operator: NumberOperator,
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOperator {
    On,
    Earlier,
    EarlierOrEqual,
    Later,
    LaterOrEqual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePredicate {
    pub operator: DateOperator,
    pub value: DateValue,
}

/// Value predicate of a leaf criterion; the variant fixes the value kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValue {
    String(StringPredicate),
    Number(NumberPredicate),
    Date(DatePredicate),
    Boolean { value: bool },
}

impl FieldValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Number(_) => ValueKind::Number,
            Self::Date(_) => ValueKind::Date,
            Self::Boolean { .. } => ValueKind::Boolean,
        }
    }

    pub fn string(operator: StringOperator, value: impl Into<String>) -> Self {
        Self::String(StringPredicate {
            operator,
            value: value.into(),
        })
    }

    pub fn number(operator: NumberOperator, value: Decimal) -> Self {
        Self::Number(NumberPredicate { operator, value })
    }

    pub fn date(operator: DateOperator, value: DateValue) -> Self {
        Self::Date(DatePredicate { operator, value })
    }

    pub fn boolean(value: bool) -> Self {
        Self::Boolean { value }
    }
}

/// Granularity of a user-supplied date; equality covers one whole unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePrecision {
    Day,
    Minute,
    Second,
}

/// A parsed point in time together with the precision it was written with.
///
/// Accepted forms are `yyyy-MM-dd`, `yyyy-MM-dd HH:mm` and `yyyy-MM-dd HH:mm:ss`,
/// optionally followed by a time zone offset (`+hh`, `+hh:mm`, `-hhmm`). Without an
/// offset the value is interpreted as UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateValue {
    local: NaiveDateTime,
    offset: FixedOffset,
    precision: DatePrecision,
    raw: String,
}

impl DateValue {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (body, offset) = split_offset(trimmed)?;
        let body = body.trim();

        let (local, precision) = if let Ok(d) = NaiveDate::parse_from_str(body, "%Y-%m-%d") {
            (d.and_hms_opt(0, 0, 0).ok_or_else(|| invalid_date(raw))?, DatePrecision::Day)
        } else if let Ok(dt) = NaiveDateTime::parse_from_str(body, "%Y-%m-%d %H:%M:%S") {
            (dt, DatePrecision::Second)
        } else if let Ok(dt) = NaiveDateTime::parse_from_str(body, "%Y-%m-%d %H:%M") {
            (dt, DatePrecision::Minute)
        } else {
            return Err(invalid_date(raw));
        };

        Ok(Self {
            local,
            offset,
            precision,
            raw: trimmed.to_string(),
        })
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    /// Half-open UTC interval `[start, end)` covered by this value.
    pub fn utc_range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self
            .offset
            .from_local_datetime(&self.local)
            .single()
            .ok_or_else(|| invalid_date(&self.raw))?
            .with_timezone(&Utc);
        Ok((start, start + self.unit()))
    }

    /// Half-open calendar-day interval `[start, end)` in the value's own time zone.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        let start = self.local.date();
        let end = start.succ_opt().unwrap_or(start);
        (start, end)
    }

    fn unit(&self) -> Duration {
        match self.precision {
            DatePrecision::Day => Duration::days(1),
            DatePrecision::Minute => Duration::minutes(1),
            DatePrecision::Second => Duration::seconds(1),
        }
    }
}

impl TryFrom<String> for DateValue {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DateValue> for String {
    fn from(value: DateValue) -> Self {
        value.raw
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split_offset(input: &str) -> Result<(&str, FixedOffset)> {
    // The date part itself contains '-' at positions 4 and 7.
    let tz_start = input
        .char_indices()
        .skip(10)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i);

    let Some(pos) = tz_start else {
        return Ok((input, utc_offset()));
    };

    let (body, tz) = input.split_at(pos);
    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let digits: String = tz[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) || !(digits.len() == 2 || digits.len() == 4) {
        return Err(invalid_date(input));
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid_date(input))?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..].parse().map_err(|_| invalid_date(input))?
    } else {
        0
    };
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| invalid_date(input))?;
    Ok((body, offset))
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

fn invalid_date(raw: &str) -> Error {
    Error::InvalidValue(format!(
        "'{raw}' is not a date; expected yyyy-MM-dd, yyyy-MM-dd HH:mm or yyyy-MM-dd HH:mm:ss"
    ))
}
