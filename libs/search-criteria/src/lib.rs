//! Search criteria model
//!
//! This crate holds the closed input language of the search engine:
//!
//! - `criterion`: the boolean criteria tree (composites and leaf criteria)
//! - `value`: typed value predicates (string, number, date, boolean)
//! - `data_type`: property types and the live property-code to data-type map
//! - `sort`: sort specifications for ID ordering
//! - `validate`: the type-consistency check between criteria and stored data types
//!
//! The crate performs no I/O. Everything that needs the database (schema metadata,
//! property-type loading, SQL generation) lives in the engine crate.
//!
//! # Example
//!
//! ```rust
//! use labsearch_criteria::{
//!     validate, Criterion, DataType, NumberOperator, PropertyTypeMap, PropertyTypeRecord,
//! };
//!
//! let criteria = Criterion::and(vec![
//!     Criterion::attribute_equals("code", "DS1"),
//!     Criterion::number_property("ANSWER", NumberOperator::Greater, 10.into()),
//! ]);
//!
//! let types = PropertyTypeMap::new(vec![PropertyTypeRecord::new("ANSWER", DataType::Varchar)]);
//! assert!(validate(&criteria, &types).is_err());
//! ```

pub mod criterion;
pub mod data_type;
pub mod error;
pub mod kind;
pub mod sort;
pub mod validate;
pub mod value;

pub use criterion::{
    AnyPropertyCriterion, AttributeCriterion, CompositeCriterion, Criterion, LogicalOperator,
    PropertyCriterion, RelationDirection, RelationType, RelationshipCriterion,
};
pub use data_type::{DataType, PropertyTypeMap, PropertyTypeRecord, INTERNAL_PROPERTY_PREFIX};
pub use error::{Error, Result};
pub use kind::EntityKind;
pub use sort::{SortField, SortOptions, SortOrder, Sorting};
pub use validate::validate;
pub use value::{
    DateOperator, DatePrecision, DatePredicate, DateValue, FieldValue, NumberOperator,
    NumberPredicate, StringOperator, StringPredicate, ValueKind,
};
