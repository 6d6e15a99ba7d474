//! Sort specifications for ordering a pre-filtered ID set

use serde::{Deserialize, Serialize};

/// Prefix marking a sort field as a property rather than an attribute.
const PROPERTY_FIELD_PREFIX: &str = "PROPERTY";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "lowercase")]
pub enum SortField {
    Attribute(String),
    Property(String),
}

impl SortField {
    /// Parses the textual form used by API callers: `PROPERTY<CODE>` names a property,
    /// anything else an attribute.
    pub fn parse(field: &str) -> Self {
        match field.strip_prefix(PROPERTY_FIELD_PREFIX) {
            Some(code) if !code.is_empty() => Self::Property(code.to_string()),
            _ => Self::Attribute(field.to_string()),
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self, Self::Property(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    pub field: SortField,
    #[serde(default)]
    pub order: SortOrder,
}

impl Sorting {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Desc,
        }
    }
}

/// Ordered list of sortings plus optional paging over the sorted IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOptions {
    #[serde(default)]
    pub sortings: Vec<Sorting>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl SortOptions {
    pub fn new(sortings: Vec<Sorting>) -> Self {
        Self {
            sortings,
            ..Self::default()
        }
    }

    pub fn with_paging(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn references_properties(&self) -> bool {
        self.sortings.iter().any(|s| s.field.is_property())
    }

    pub fn is_empty(&self) -> bool {
        self.sortings.is_empty()
    }
}
