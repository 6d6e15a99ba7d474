//! Error types for search criteria

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A criterion's value kind disagrees with the stored data type of its field.
    #[error(
        "Criterion of type {criterion} cannot be applied to the data type {data_type}. \
         [fieldName={field}, dataTypeByPropertyCode={data_types}]"
    )]
    TypeMismatch {
        criterion: String,
        field: String,
        data_type: String,
        data_types: String,
    },

    /// A criterion references a field, property or relation that the schema does not know.
    #[error("Unknown field '{field}' referenced by {criterion}")]
    UnknownField { criterion: String, field: String },

    #[error("Invalid search value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, Error>;
