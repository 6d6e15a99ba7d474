//! Minimal openBIS-style tables and row builders for database tests.

use anyhow::Context as _;
use sqlx::PgPool;

const SCHEMA_SQL: &[&str] = &[
    "CREATE TABLE spaces (id BIGINT PRIMARY KEY, code TEXT NOT NULL, description TEXT, \
     registration_timestamp TIMESTAMPTZ NOT NULL DEFAULT now())",
    "CREATE TABLE data_types (id BIGINT PRIMARY KEY, code TEXT NOT NULL)",
    "CREATE TABLE property_types (id BIGSERIAL PRIMARY KEY, code TEXT NOT NULL, \
     daty_id BIGINT NOT NULL REFERENCES data_types(id), \
     is_managed_internally BOOLEAN NOT NULL DEFAULT FALSE)",
    "CREATE TABLE sample_types (id BIGINT PRIMARY KEY, code TEXT NOT NULL)",
    "CREATE TABLE samples_all (id BIGINT PRIMARY KEY, code TEXT NOT NULL, perm_id TEXT NOT NULL, \
     saty_id BIGINT NOT NULL REFERENCES sample_types(id), space_id BIGINT REFERENCES spaces(id), \
     del_id BIGINT, registration_timestamp TIMESTAMPTZ NOT NULL DEFAULT now(), \
     modification_timestamp TIMESTAMPTZ NOT NULL DEFAULT now())",
    "CREATE TABLE sample_type_property_types (id BIGSERIAL PRIMARY KEY, \
     saty_id BIGINT NOT NULL REFERENCES sample_types(id), \
     prty_id BIGINT NOT NULL REFERENCES property_types(id))",
    "CREATE TABLE sample_properties (id BIGSERIAL PRIMARY KEY, \
     samp_id BIGINT NOT NULL REFERENCES samples_all(id), \
     stpt_id BIGINT NOT NULL REFERENCES sample_type_property_types(id), value TEXT)",
    "CREATE TABLE relationship_types (id BIGINT PRIMARY KEY, code TEXT NOT NULL)",
    "CREATE TABLE sample_relationships_all (id BIGSERIAL PRIMARY KEY, \
     sample_id_parent BIGINT NOT NULL REFERENCES samples_all(id), \
     sample_id_child BIGINT NOT NULL REFERENCES samples_all(id), \
     relationship_id BIGINT NOT NULL REFERENCES relationship_types(id))",
    "INSERT INTO data_types (id, code) VALUES \
     (1, 'VARCHAR'), (2, 'INTEGER'), (3, 'REAL'), (4, 'BOOLEAN'), (5, 'TIMESTAMP'), \
     (6, 'MULTILINE_VARCHAR')",
    "INSERT INTO relationship_types (id, code) VALUES (1, 'PARENT_CHILD'), (2, 'CONTAINER_COMPONENT')",
    "INSERT INTO spaces (id, code) VALUES (1, 'LAB')",
    "INSERT INTO sample_types (id, code) VALUES (1, 'CELL_CULTURE')",
];

pub async fn create_schema(pool: &PgPool) -> anyhow::Result<()> {
    for statement in SCHEMA_SQL {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("run fixture statement: {statement}"))?;
    }
    Ok(())
}

/// Declares a property type and assigns it to the only sample type.
pub async fn insert_property_type(
    pool: &PgPool,
    code: &str,
    data_type: &str,
    internal: bool,
) -> anyhow::Result<()> {
    sqlx::query(
        "WITH pt AS ( \
           INSERT INTO property_types (code, daty_id, is_managed_internally) \
           SELECT $1, dt.id, $3 FROM data_types dt WHERE dt.code = $2 RETURNING id) \
         INSERT INTO sample_type_property_types (saty_id, prty_id) SELECT 1, pt.id FROM pt",
    )
    .bind(code)
    .bind(data_type)
    .bind(internal)
    .execute(pool)
    .await
    .context("insert property type")?;
    Ok(())
}

pub async fn insert_sample(pool: &PgPool, id: i64, code: &str) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO samples_all (id, code, perm_id, saty_id, space_id) VALUES ($1, $2, $3, 1, 1)",
    )
    .bind(id)
    .bind(code)
    .bind(format!("20240101-{id}"))
    .execute(pool)
    .await
    .context("insert sample")?;
    Ok(())
}

pub async fn delete_sample(pool: &PgPool, id: i64) -> anyhow::Result<()> {
    sqlx::query("UPDATE samples_all SET del_id = 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .context("mark sample deleted")?;
    Ok(())
}

pub async fn set_property(
    pool: &PgPool,
    sample_id: i64,
    property_code: &str,
    value: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO sample_properties (samp_id, stpt_id, value) \
         SELECT $1, stpt.id, $3 FROM sample_type_property_types stpt \
         JOIN property_types pt ON pt.id = stpt.prty_id WHERE pt.code = $2",
    )
    .bind(sample_id)
    .bind(property_code)
    .bind(value)
    .execute(pool)
    .await
    .context("insert sample property")?;
    Ok(())
}

pub async fn link_samples(
    pool: &PgPool,
    parent_id: i64,
    child_id: i64,
    relation_code: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO sample_relationships_all (sample_id_parent, sample_id_child, relationship_id) \
         SELECT $1, $2, rt.id FROM relationship_types rt WHERE rt.code = $3",
    )
    .bind(parent_id)
    .bind(child_id)
    .bind(relation_code)
    .execute(pool)
    .await
    .context("insert sample relationship")?;
    Ok(())
}
