//! Database collaborators: schema metadata, SQL execution and the property-type catalog.

pub mod catalog;
pub mod executor;
pub mod schema;

pub use catalog::{load_property_types, PropertyTypeCache};
pub use executor::{PgExecutor, Row, SqlExecutor, SqlValue};
pub use schema::{
    AttributeColumn, GlobalSearchColumns, PropertyTables, RelationshipTables,
    SchemaMetadataProvider, StandardSchema, TableMapping,
};
