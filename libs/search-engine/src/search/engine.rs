//! Search engine facade.
//!
//! The SearchEngine is responsible for:
//! - Loading property types when criteria or sortings need them
//! - Validating criteria before any search SQL runs
//! - Translating and executing criteria searches, sorts and relationship expansion
//! - Running the two-phase global search under a timeout

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::db::{PropertyTypeCache, SchemaMetadataProvider, SqlExecutor};

mod api;
mod execute;
mod global;

/// Entry point for the business layer. Cheap to share behind an `Arc`; holds no
/// per-request state.
pub struct SearchEngine {
    executor: Arc<dyn SqlExecutor>,
    schema: Arc<dyn SchemaMetadataProvider>,
    config: SearchConfig,
    property_type_cache: Option<Arc<PropertyTypeCache>>,
}
