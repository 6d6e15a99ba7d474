//! Schema metadata: where each entity kind lives in the database.
//!
//! Table and column names in a [`TableMapping`] are spliced into SQL text, so they
//! must come from trusted code (such as [`StandardSchema`]), never from user input.

use labsearch_criteria::{DataType, EntityKind};
use std::collections::BTreeMap;

/// Relationship table linking entities of one kind to each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTables {
    pub table: String,
    pub parent_id_field: String,
    pub child_id_field: String,
    pub relation_type_field: String,
    /// Table holding `id`/`code` rows for the relation types.
    pub relation_types_table: String,
}

/// Generic property-value storage of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyTables {
    /// One row per (entity, property) with a text `value` column.
    pub values_table: String,
    pub entity_id_field: String,
    /// Column of the values table pointing at the entity-type/property-type link.
    pub assignment_field: String,
    pub assignments_table: String,
    /// Column of the link table pointing at the property type.
    pub property_type_field: String,
    pub property_types_table: String,
    pub data_types_table: String,
}

/// A fixed, typed column of an entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeColumn {
    pub column: String,
    pub data_type: DataType,
}

impl AttributeColumn {
    pub fn new(column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            column: column.into(),
            data_type,
        }
    }
}

/// Columns and expressions used by global search. Expressions refer to the entity
/// table under the alias `t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSearchColumns {
    pub code_column: String,
    pub perm_id_column: Option<String>,
    /// Free-text columns searched alongside property values.
    pub text_columns: Vec<String>,
    pub identifier_sql: String,
    pub type_code_sql: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    pub kind: EntityKind,
    pub entities_table: String,
    /// Primary key column.
    pub id_column: String,
    /// Rows with a non-null value here are deleted and never returned.
    pub deletion_column: Option<String>,
    pub attribute_types_table: Option<String>,
    pub relationships: Option<RelationshipTables>,
    pub properties: Option<PropertyTables>,
    /// Attribute name, as used by criteria and sort fields, to column.
    pub attributes: BTreeMap<String, AttributeColumn>,
    pub global_search: GlobalSearchColumns,
}

impl TableMapping {
    pub fn attribute(&self, name: &str) -> Option<&AttributeColumn> {
        self.attributes.get(name)
    }

    /// ` AND {alias}.del_id IS NULL`, or nothing for kinds without soft deletion.
    pub(crate) fn not_deleted(&self, alias: &str) -> String {
        match &self.deletion_column {
            Some(col) => format!(" AND {}.{} IS NULL", alias, col),
            None => String::new(),
        }
    }
}

/// Maps entity kinds to their tables. Implemented by the persistence layer.
pub trait SchemaMetadataProvider: Send + Sync {
    fn table_for(&self, kind: EntityKind) -> Option<&TableMapping>;

    /// Property-type catalog tables shared by all kinds.
    fn property_catalog(&self) -> Option<&PropertyTables> {
        EntityKind::ALL
            .iter()
            .find_map(|k| self.table_for(*k).and_then(|m| m.properties.as_ref()))
    }
}

/// The standard openBIS table layout.
#[derive(Debug, Clone)]
pub struct StandardSchema {
    mappings: BTreeMap<EntityKind, TableMapping>,
}

impl Default for StandardSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardSchema {
    pub fn new() -> Self {
        let mappings = EntityKind::ALL
            .into_iter()
            .map(|kind| (kind, standard_mapping(kind)))
            .collect();
        Self { mappings }
    }
}

impl SchemaMetadataProvider for StandardSchema {
    fn table_for(&self, kind: EntityKind) -> Option<&TableMapping> {
        self.mappings.get(&kind)
    }
}

fn standard_mapping(kind: EntityKind) -> TableMapping {
    match kind {
        EntityKind::Space => TableMapping {
            kind,
            entities_table: "spaces".into(),
            id_column: "id".into(),
            deletion_column: None,
            attribute_types_table: None,
            relationships: None,
            properties: None,
            attributes: attributes(&[
                ("id", "id", DataType::Integer),
                ("code", "code", DataType::Varchar),
                ("description", "description", DataType::MultilineVarchar),
                ("registration_date", "registration_timestamp", DataType::Timestamp),
            ]),
            global_search: GlobalSearchColumns {
                code_column: "code".into(),
                perm_id_column: None,
                text_columns: vec!["code".into(), "description".into()],
                identifier_sql: "'/' || t.code".into(),
                type_code_sql: None,
            },
        },
        EntityKind::Project => TableMapping {
            kind,
            entities_table: "projects".into(),
            id_column: "id".into(),
            deletion_column: None,
            attribute_types_table: None,
            relationships: None,
            properties: None,
            attributes: attributes(&[
                ("id", "id", DataType::Integer),
                ("code", "code", DataType::Varchar),
                ("perm_id", "perm_id", DataType::Varchar),
                ("description", "description", DataType::MultilineVarchar),
                ("registration_date", "registration_timestamp", DataType::Timestamp),
                ("modification_date", "modification_timestamp", DataType::Timestamp),
            ]),
            global_search: GlobalSearchColumns {
                code_column: "code".into(),
                perm_id_column: Some("perm_id".into()),
                text_columns: vec!["code".into(), "description".into()],
                identifier_sql: "'/' || (SELECT s.code FROM spaces s WHERE s.id = t.space_id) || '/' || t.code".into(),
                type_code_sql: None,
            },
        },
        EntityKind::Experiment => TableMapping {
            kind,
            entities_table: "experiments_all".into(),
            id_column: "id".into(),
            deletion_column: Some("del_id".into()),
            attribute_types_table: Some("experiment_types".into()),
            relationships: None,
            properties: Some(property_tables(
                "experiment_properties",
                "expe_id",
                "etpt_id",
                "experiment_type_property_types",
            )),
            attributes: attributes(&[
                ("id", "id", DataType::Integer),
                ("code", "code", DataType::Varchar),
                ("perm_id", "perm_id", DataType::Varchar),
                ("registration_date", "registration_timestamp", DataType::Timestamp),
                ("modification_date", "modification_timestamp", DataType::Timestamp),
            ]),
            global_search: GlobalSearchColumns {
                code_column: "code".into(),
                perm_id_column: Some("perm_id".into()),
                text_columns: vec!["code".into()],
                identifier_sql: "(SELECT '/' || s.code || '/' || p.code FROM projects p JOIN spaces s ON s.id = p.space_id WHERE p.id = t.proj_id) || '/' || t.code".into(),
                type_code_sql: Some("(SELECT et.code FROM experiment_types et WHERE et.id = t.exty_id)".into()),
            },
        },
        EntityKind::Sample => TableMapping {
            kind,
            entities_table: "samples_all".into(),
            id_column: "id".into(),
            deletion_column: Some("del_id".into()),
            attribute_types_table: Some("sample_types".into()),
            relationships: Some(RelationshipTables {
                table: "sample_relationships_all".into(),
                parent_id_field: "sample_id_parent".into(),
                child_id_field: "sample_id_child".into(),
                relation_type_field: "relationship_id".into(),
                relation_types_table: "relationship_types".into(),
            }),
            properties: Some(property_tables(
                "sample_properties",
                "samp_id",
                "stpt_id",
                "sample_type_property_types",
            )),
            attributes: attributes(&[
                ("id", "id", DataType::Integer),
                ("code", "code", DataType::Varchar),
                ("perm_id", "perm_id", DataType::Varchar),
                ("registration_date", "registration_timestamp", DataType::Timestamp),
                ("modification_date", "modification_timestamp", DataType::Timestamp),
            ]),
            global_search: GlobalSearchColumns {
                code_column: "code".into(),
                perm_id_column: Some("perm_id".into()),
                text_columns: vec!["code".into()],
                identifier_sql: "COALESCE('/' || (SELECT s.code FROM spaces s WHERE s.id = t.space_id) || '/', '/') || t.code".into(),
                type_code_sql: Some("(SELECT st.code FROM sample_types st WHERE st.id = t.saty_id)".into()),
            },
        },
        EntityKind::DataSet => TableMapping {
            kind,
            entities_table: "data_all".into(),
            id_column: "id".into(),
            deletion_column: Some("del_id".into()),
            attribute_types_table: Some("data_set_types".into()),
            relationships: Some(RelationshipTables {
                table: "data_set_relationships_all".into(),
                parent_id_field: "data_id_parent".into(),
                child_id_field: "data_id_child".into(),
                relation_type_field: "relationship_id".into(),
                relation_types_table: "relationship_types".into(),
            }),
            properties: Some(property_tables(
                "data_set_properties",
                "ds_id",
                "dstpt_id",
                "data_set_type_property_types",
            )),
            attributes: attributes(&[
                ("id", "id", DataType::Integer),
                ("code", "code", DataType::Varchar),
                ("perm_id", "code", DataType::Varchar),
                ("registration_date", "registration_timestamp", DataType::Timestamp),
                ("modification_date", "modification_timestamp", DataType::Timestamp),
            ]),
            global_search: GlobalSearchColumns {
                code_column: "code".into(),
                perm_id_column: Some("code".into()),
                text_columns: vec!["code".into()],
                identifier_sql: "t.code".into(),
                type_code_sql: Some("(SELECT dt.code FROM data_set_types dt WHERE dt.id = t.dsty_id)".into()),
            },
        },
        EntityKind::Material => TableMapping {
            kind,
            entities_table: "materials".into(),
            id_column: "id".into(),
            deletion_column: None,
            attribute_types_table: Some("material_types".into()),
            relationships: None,
            properties: Some(property_tables(
                "material_properties",
                "mate_id",
                "mtpt_id",
                "material_type_property_types",
            )),
            attributes: attributes(&[
                ("id", "id", DataType::Integer),
                ("code", "code", DataType::Varchar),
                ("registration_date", "registration_timestamp", DataType::Timestamp),
                ("modification_date", "modification_timestamp", DataType::Timestamp),
            ]),
            global_search: GlobalSearchColumns {
                code_column: "code".into(),
                perm_id_column: None,
                text_columns: vec!["code".into()],
                identifier_sql: "t.code || ' (' || (SELECT mt.code FROM material_types mt WHERE mt.id = t.maty_id) || ')'".into(),
                type_code_sql: Some("(SELECT mt.code FROM material_types mt WHERE mt.id = t.maty_id)".into()),
            },
        },
    }
}

fn property_tables(
    values_table: &str,
    entity_id_field: &str,
    assignment_field: &str,
    assignments_table: &str,
) -> PropertyTables {
    PropertyTables {
        values_table: values_table.into(),
        entity_id_field: entity_id_field.into(),
        assignment_field: assignment_field.into(),
        assignments_table: assignments_table.into(),
        property_type_field: "prty_id".into(),
        property_types_table: "property_types".into(),
        data_types_table: "data_types".into(),
    }
}

fn attributes(defs: &[(&str, &str, DataType)]) -> BTreeMap<String, AttributeColumn> {
    defs.iter()
        .map(|(name, column, data_type)| {
            (name.to_string(), AttributeColumn::new(*column, data_type.clone()))
        })
        .collect()
}
