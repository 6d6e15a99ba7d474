use labsearch_criteria::EntityKind;

use super::SearchEngine;
use crate::search::global::{
    ids_by_kind, parse_candidates, parse_total, reconcile, sort_records, translate_details,
    translate_short, GlobalSearchContext, GlobalSearchRecord, GlobalSearchSorting,
};
use crate::{Error, Result};

impl SearchEngine {
    /// Global search context carrying the configured text search configuration,
    /// code match boost and default page size.
    pub fn global_search_context(
        &self,
        text: impl Into<String>,
        object_kinds: impl IntoIterator<Item = EntityKind>,
    ) -> GlobalSearchContext {
        GlobalSearchContext::new(text, object_kinds)
            .with_text_search_config(self.config.text_search_config.clone())
            .with_code_match_boost(self.config.code_match_rank_boost)
            .with_paging(Some(self.config.global_search_page_size), None)
    }

    /// Two-phase global search: rank candidates, fetch their details, reconcile.
    ///
    /// The whole search runs under the configured timeout. On expiry nothing is
    /// returned, not even the phase-1 candidates.
    #[tracing::instrument(skip_all, fields(kinds = context.object_kinds().len()))]
    pub async fn global_search(
        &self,
        context: &GlobalSearchContext,
        sortings: &[GlobalSearchSorting],
    ) -> Result<Vec<GlobalSearchRecord>> {
        let timeout = self.config.global_search_timeout();
        let mut records = tokio::time::timeout(timeout, self.run_global_search(context))
            .await
            .map_err(|_| {
                tracing::warn!(?timeout, "Global search timed out");
                Error::Timeout(timeout)
            })??;

        sort_records(&mut records, sortings);
        Ok(records)
    }

    /// Number of global search candidates, ignoring paging.
    #[tracing::instrument(skip_all, fields(kinds = context.object_kinds().len()))]
    pub async fn global_search_count(&self, context: &GlobalSearchContext) -> Result<i64> {
        if context.object_kinds().is_empty() {
            return Ok(0);
        }

        let timeout = self.config.global_search_timeout();
        let query = translate_short(self.schema.as_ref(), context, true)?;
        let rows = tokio::time::timeout(timeout, self.executor.execute(&query))
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        parse_total(&rows)
    }

    async fn run_global_search(
        &self,
        context: &GlobalSearchContext,
    ) -> Result<Vec<GlobalSearchRecord>> {
        if context.object_kinds().is_empty() {
            tracing::debug!("Global search without object kinds");
            return Ok(Vec::new());
        }

        let short = translate_short(self.schema.as_ref(), context, false)?;
        let candidates = parse_candidates(&self.executor.execute(&short).await?)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let details = translate_details(self.schema.as_ref(), context, &ids_by_kind(&candidates))?;
        let rows = self.executor.execute(&details).await?;
        let records = reconcile(context, &candidates, &rows)?;
        tracing::debug!(
            candidates = candidates.len(),
            records = records.len(),
            "Global search reconciled"
        );
        Ok(records)
    }
}
