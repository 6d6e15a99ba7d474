use labsearch_criteria::{validate, Criterion, EntityKind, RelationType, SortOptions};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::SearchEngine;
use crate::config::{Config, SearchConfig};
use crate::db::{
    PgExecutor, PropertyTypeCache, SchemaMetadataProvider, SqlExecutor, SqlValue, StandardSchema,
};
use crate::search::context::{AuthorisationInformation, TranslationContext};
use crate::search::order::translate_order;
use crate::search::relationship;
use crate::search::translate::translate;
use crate::Result;

impl SearchEngine {
    /// Create a new search engine. Property types are read fresh for every request
    /// unless a cache is injected with [`SearchEngine::with_property_type_cache`].
    pub fn new(
        executor: Arc<dyn SqlExecutor>,
        schema: Arc<dyn SchemaMetadataProvider>,
        config: SearchConfig,
    ) -> Self {
        Self {
            executor,
            schema,
            config,
            property_type_cache: None,
        }
    }

    /// Connects to PostgreSQL and uses the standard table layout.
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let executor = PgExecutor::connect(&config.database).await?;
        tracing::info!(
            pool_max_size = config.database.pool_max_size,
            "Search engine connected"
        );
        Ok(Self::new(
            Arc::new(executor),
            Arc::new(StandardSchema::new()),
            config.search.clone(),
        ))
    }

    pub fn with_property_type_cache(mut self, cache: Arc<PropertyTypeCache>) -> Self {
        self.property_type_cache = Some(cache);
        self
    }

    /// Drop cached property types, if a cache is in use.
    pub fn invalidate_property_types(&self) {
        if let Some(cache) = &self.property_type_cache {
            cache.invalidate();
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Entity ids of `kind` matching `criteria` and visible under `authorisation`.
    ///
    /// Without sortings or paging the ids come back ascending. Otherwise they are
    /// ordered by the sortings with the id as final tie-break, then paged.
    #[tracing::instrument(skip_all, fields(kind = %kind))]
    pub async fn search_ids(
        &self,
        kind: EntityKind,
        criteria: &Criterion,
        sort: &SortOptions,
        authorisation: &AuthorisationInformation,
    ) -> Result<Vec<i64>> {
        let (context, mut ids) = self.matching_ids(kind, criteria, sort, authorisation).await?;

        if sort.sortings.is_empty() && sort.limit.is_none() && sort.offset.is_none() {
            ids.sort_unstable();
            return Ok(ids);
        }
        if ids.is_empty() {
            return Ok(ids);
        }

        let query = translate_order(&context, &ids)?;
        self.fetch_ids(&query, context.id_column()).await
    }

    /// Like [`SearchEngine::search_ids`], but returns the values of the configured
    /// `search.id_column` (for example `perm_id`) in the same order.
    #[tracing::instrument(skip_all, fields(kind = %kind, column = %self.config.id_column))]
    pub async fn search_identifiers(
        &self,
        kind: EntityKind,
        criteria: &Criterion,
        sort: &SortOptions,
        authorisation: &AuthorisationInformation,
    ) -> Result<Vec<SqlValue>> {
        let (context, ids) = self.matching_ids(kind, criteria, sort, authorisation).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let context = context.with_id_column(self.config.id_column.clone());
        let query = translate_order(&context, &ids)?;
        self.fetch_values(&query, context.id_column()).await
    }

    /// Validates and runs the criteria query, returning unordered entity ids together
    /// with the context used, so callers can order the result.
    async fn matching_ids(
        &self,
        kind: EntityKind,
        criteria: &Criterion,
        sort: &SortOptions,
        authorisation: &AuthorisationInformation,
    ) -> Result<(TranslationContext, Vec<i64>)> {
        let mapping = self.mapping(kind)?;
        let mut context = TranslationContext::new(mapping.clone(), criteria.clone())
            .with_authorisation(authorisation.clone())
            .with_sort_options(sort.clone());

        if context.needs_property_types() {
            let types = self.property_types(mapping).await?;
            validate(criteria, &types)?;
            context = context.with_property_types(types);
        }

        let query = translate(&context)?;
        let ids = self.fetch_ids(&query, context.id_column()).await?;
        tracing::debug!(matched = ids.len(), "Criteria search executed");
        Ok((context, ids))
    }

    /// Orders an already filtered id set. Ids not of `kind` (or deleted) drop out.
    #[tracing::instrument(skip_all, fields(kind = %kind, ids = ids.len()))]
    pub async fn sort_ids(
        &self,
        kind: EntityKind,
        ids: &[i64],
        sort: &SortOptions,
    ) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mapping = self.mapping(kind)?;
        let mut context = TranslationContext::new(mapping.clone(), Criterion::and(vec![]))
            .with_sort_options(sort.clone());
        if context.needs_property_types() {
            context = context.with_property_types(self.property_types(mapping).await?);
        }

        let query = translate_order(&context, ids)?;
        self.fetch_ids(&query, context.id_column()).await
    }

    /// Children one hop away from `parent_ids`.
    #[tracing::instrument(skip_all, fields(kind = %kind, seeds = parent_ids.len()))]
    pub async fn find_child_ids(
        &self,
        kind: EntityKind,
        parent_ids: &[i64],
        relation_type: RelationType,
    ) -> Result<BTreeSet<i64>> {
        let mapping = self.mapping(kind)?;
        relationship::find_child_ids(self.executor.as_ref(), mapping, parent_ids, relation_type)
            .await
    }

    /// Parents one hop away from `child_ids`.
    #[tracing::instrument(skip_all, fields(kind = %kind, seeds = child_ids.len()))]
    pub async fn find_parent_ids(
        &self,
        kind: EntityKind,
        child_ids: &[i64],
        relation_type: RelationType,
    ) -> Result<BTreeSet<i64>> {
        let mapping = self.mapping(kind)?;
        relationship::find_parent_ids(self.executor.as_ref(), mapping, child_ids, relation_type)
            .await
    }
}
