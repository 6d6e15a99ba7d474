//! Property-type catalog lookups

use labsearch_criteria::{DataType, PropertyTypeMap, PropertyTypeRecord};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use super::executor::SqlExecutor;
use super::schema::PropertyTables;
use crate::search::query_builder::SelectQuery;
use crate::Result;

/// Query joining property types with their data types.
pub fn property_types_query(tables: &PropertyTables) -> Result<SelectQuery> {
    let sql = format!(
        "SELECT pt.code AS code, dt.code AS data_type, pt.is_managed_internally AS is_managed_internally \
         FROM {} pt JOIN {} dt ON pt.daty_id = dt.id",
        tables.property_types_table, tables.data_types_table
    );
    SelectQuery::new(sql, Vec::new())
}

/// Loads the full property-code to data-type map.
pub async fn load_property_types(
    executor: &dyn SqlExecutor,
    tables: &PropertyTables,
) -> Result<PropertyTypeMap> {
    let query = property_types_query(tables)?;
    let rows = executor.execute(&query).await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(PropertyTypeRecord {
            code: row.get_str("code")?.to_string(),
            data_type: DataType::from_code(row.get_str("data_type")?),
            is_managed_internally: row.get_bool("is_managed_internally")?,
        });
    }

    tracing::debug!(count = records.len(), "Loaded property types");
    Ok(PropertyTypeMap::new(records))
}

/// Cross-request cache of property-type maps, keyed by property-types table.
///
/// Only used when injected into the engine. Whoever changes property types must call
/// [`PropertyTypeCache::invalidate`]; entries are otherwise never refreshed.
pub struct PropertyTypeCache {
    cache: Mutex<LruCache<String, Arc<PropertyTypeMap>>>,
}

impl PropertyTypeCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn get_or_load(
        &self,
        executor: &dyn SqlExecutor,
        tables: &PropertyTables,
    ) -> Result<Arc<PropertyTypeMap>> {
        let key = tables.property_types_table.clone();

        {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(map) = cache.get(&key) {
                tracing::debug!(table = %key, "Property types served from cache");
                return Ok(map.clone());
            }
        }

        let map = Arc::new(load_property_types(executor, tables).await?);

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.put(key, map.clone());
        Ok(map)
    }

    /// Clear all cached property-type maps.
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
