use labsearch_criteria::{EntityKind, PropertyTypeMap};
use std::sync::Arc;

use super::SearchEngine;
use crate::db::{load_property_types, SqlValue, TableMapping};
use crate::search::query_builder::SelectQuery;
use crate::{Error, Result};

impl SearchEngine {
    pub(super) fn mapping(&self, kind: EntityKind) -> Result<&TableMapping> {
        self.schema
            .table_for(kind)
            .ok_or_else(|| Error::InvalidValue(format!("object kind {} is not searchable", kind)))
    }

    /// Property-type map for `mapping`, from the injected cache or freshly loaded.
    pub(super) async fn property_types(
        &self,
        mapping: &TableMapping,
    ) -> Result<Arc<PropertyTypeMap>> {
        let Some(tables) = mapping
            .properties
            .as_ref()
            .or_else(|| self.schema.property_catalog())
        else {
            return Ok(Arc::new(PropertyTypeMap::default()));
        };

        match &self.property_type_cache {
            Some(cache) => cache.get_or_load(self.executor.as_ref(), tables).await,
            None => Ok(Arc::new(
                load_property_types(self.executor.as_ref(), tables).await?,
            )),
        }
    }

    /// Runs `query` and reads `column` of every row as an id, in row order.
    pub(super) async fn fetch_ids(&self, query: &SelectQuery, column: &str) -> Result<Vec<i64>> {
        let rows = self.executor.execute(query).await?;
        rows.iter().map(|row| row.get_i64(column)).collect()
    }

    /// Runs `query` and reads `column` of every row as it was stored, in row order.
    pub(super) async fn fetch_values(
        &self,
        query: &SelectQuery,
        column: &str,
    ) -> Result<Vec<SqlValue>> {
        let rows = self.executor.execute(query).await?;
        rows.into_iter()
            .map(|mut row| {
                row.take(column).ok_or_else(|| {
                    Error::Executor(format!("column '{}' missing from result row", column))
                })
            })
            .collect()
    }
}
