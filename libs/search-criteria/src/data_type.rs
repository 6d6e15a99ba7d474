//! Property types and their stored data types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix that addresses internally managed property types in criteria and sort fields.
pub const INTERNAL_PROPERTY_PREFIX: char = '$';

/// Stored data type of a property, as recorded in the data-types table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    Integer,
    Real,
    Varchar,
    MultilineVarchar,
    Hyperlink,
    Xml,
    Timestamp,
    Date,
    Boolean,
    ControlledVocabulary,
    Material,
    Sample,
    Json,
    /// A data type code this engine does not interpret.
    Other(String),
}

impl DataType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "INTEGER" => Self::Integer,
            "REAL" => Self::Real,
            "VARCHAR" => Self::Varchar,
            "MULTILINE_VARCHAR" => Self::MultilineVarchar,
            "HYPERLINK" => Self::Hyperlink,
            "XML" => Self::Xml,
            "TIMESTAMP" => Self::Timestamp,
            "DATE" => Self::Date,
            "BOOLEAN" => Self::Boolean,
            "CONTROLLEDVOCABULARY" => Self::ControlledVocabulary,
            "MATERIAL" => Self::Material,
            "SAMPLE" => Self::Sample,
            "JSON" => Self::Json,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Varchar => "VARCHAR",
            Self::MultilineVarchar => "MULTILINE_VARCHAR",
            Self::Hyperlink => "HYPERLINK",
            Self::Xml => "XML",
            Self::Timestamp => "TIMESTAMP",
            Self::Date => "DATE",
            Self::Boolean => "BOOLEAN",
            Self::ControlledVocabulary => "CONTROLLEDVOCABULARY",
            Self::Material => "MATERIAL",
            Self::Sample => "SAMPLE",
            Self::Json => "JSON",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for DataType {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of the property-type catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyTypeRecord {
    pub code: String,
    pub data_type: DataType,
    #[serde(default)]
    pub is_managed_internally: bool,
}

impl PropertyTypeRecord {
    pub fn new(code: impl Into<String>, data_type: DataType) -> Self {
        Self {
            code: code.into(),
            data_type,
            is_managed_internally: false,
        }
    }

    pub fn internal(code: impl Into<String>, data_type: DataType) -> Self {
        Self {
            code: code.into(),
            data_type,
            is_managed_internally: true,
        }
    }

    /// Code under which criteria reference this property (`$CODE` when internal).
    pub fn lookup_code(&self) -> String {
        if self.is_managed_internally {
            format!("{}{}", INTERNAL_PROPERTY_PREFIX, self.code)
        } else {
            self.code.clone()
        }
    }
}

/// Map from lookup code to property-type record, loaded once per translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTypeMap {
    by_code: BTreeMap<String, PropertyTypeRecord>,
}

impl PropertyTypeMap {
    pub fn new(records: impl IntoIterator<Item = PropertyTypeRecord>) -> Self {
        let by_code = records
            .into_iter()
            .map(|r| (r.lookup_code(), r))
            .collect();
        Self { by_code }
    }

    pub fn get(&self, lookup_code: &str) -> Option<&PropertyTypeRecord> {
        self.by_code.get(lookup_code)
    }

    pub fn data_type(&self, lookup_code: &str) -> Option<&DataType> {
        self.get(lookup_code).map(|r| &r.data_type)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// `{CODE=TYPE, ...}` rendering used in diagnostics.
    pub fn describe(&self) -> String {
        let entries: Vec<String> = self
            .by_code
            .iter()
            .map(|(code, r)| format!("{}={}", code, r.data_type))
            .collect();
        format!("{{{}}}", entries.join(", "))
    }
}

impl FromIterator<PropertyTypeRecord> for PropertyTypeMap {
    fn from_iter<I: IntoIterator<Item = PropertyTypeRecord>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_properties_are_keyed_with_prefix() {
        let map = PropertyTypeMap::new(vec![
            PropertyTypeRecord::new("NAME", DataType::Varchar),
            PropertyTypeRecord::internal("NAME", DataType::Integer),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.data_type("NAME"), Some(&DataType::Varchar));
        assert_eq!(map.data_type("$NAME"), Some(&DataType::Integer));
        assert_eq!(map.describe(), "{$NAME=INTEGER, NAME=VARCHAR}");
    }

    #[test]
    fn unknown_data_type_codes_are_preserved() {
        let dt = DataType::from_code("ARRAY_STRING");
        assert_eq!(dt, DataType::Other("ARRAY_STRING".to_string()));
        assert_eq!(dt.to_string(), "ARRAY_STRING");
    }
}
