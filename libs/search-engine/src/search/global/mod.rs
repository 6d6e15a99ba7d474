//! Two-phase global full-text search.
//!
//! Phase 1 ([`translate_short`]) ranks candidates of every requested object kind in a
//! single `UNION ALL` query, tagging each row with the object kind ordinal. Phase 2
//! ([`translate_details`]) fetches display rows for exactly those candidates, without
//! re-ranking. [`reconcile`] then puts the detail rows back into phase-1 order and
//! copies the phase-1 rank onto each of them.

mod details;
mod highlight;
mod reconcile;
mod short;
mod text_query;

pub use details::translate_details;
pub use highlight::{strip_highlights, substring_spans, HIGHLIGHT_START, HIGHLIGHT_STOP};
pub use reconcile::{ids_by_kind, parse_candidates, reconcile, sort_records};
pub use short::{parse_total, translate_short};

use labsearch_criteria::{EntityKind, SortOrder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::context::AuthorisationInformation;
use super::query_builder::bind::{push_float, push_text};
use super::query_builder::clauses::escape_like_pattern;
use super::query_builder::BindValue;
use crate::config::is_sql_identifier;
use crate::db::TableMapping;
use crate::{Error, Result};

/// Alias of the entity table inside global search queries.
pub(crate) const ENTITY_ALIAS: &str = "t";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalSearchMode {
    /// Full-text match of a boolean text query.
    #[default]
    Match,
    /// Case-insensitive substring match.
    Contains,
}

/// Input of one global search.
#[derive(Debug, Clone)]
pub struct GlobalSearchContext {
    text: String,
    mode: GlobalSearchMode,
    object_kinds: Vec<EntityKind>,
    with_matches: bool,
    limit: Option<i64>,
    offset: Option<i64>,
    authorisation: BTreeMap<EntityKind, AuthorisationInformation>,
    text_search_config: String,
    code_match_boost: f64,
}

impl GlobalSearchContext {
    /// Object kinds are deduplicated and kept in ordinal order.
    pub fn new(text: impl Into<String>, object_kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        let mut object_kinds: Vec<EntityKind> = object_kinds.into_iter().collect();
        object_kinds.sort();
        object_kinds.dedup();
        Self {
            text: text.into(),
            mode: GlobalSearchMode::default(),
            object_kinds,
            with_matches: false,
            limit: None,
            offset: None,
            authorisation: BTreeMap::new(),
            text_search_config: "simple".to_string(),
            code_match_boost: 10.0,
        }
    }

    pub fn with_mode(mut self, mode: GlobalSearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Also return the best property match and exact code/perm id matches per record.
    pub fn with_matches(mut self, with_matches: bool) -> Self {
        self.with_matches = with_matches;
        self
    }

    pub fn with_paging(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    /// Restricts candidates of `kind` to what the acting user may see. Kinds without
    /// an entry are unrestricted.
    pub fn with_authorisation(
        mut self,
        kind: EntityKind,
        authorisation: AuthorisationInformation,
    ) -> Self {
        self.authorisation.insert(kind, authorisation);
        self
    }

    pub fn with_text_search_config(mut self, config: impl Into<String>) -> Self {
        self.text_search_config = config.into();
        self
    }

    pub fn with_code_match_boost(mut self, boost: f64) -> Self {
        self.code_match_boost = boost;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> GlobalSearchMode {
        self.mode
    }

    pub fn object_kinds(&self) -> &[EntityKind] {
        &self.object_kinds
    }

    pub fn wants_matches(&self) -> bool {
        self.with_matches
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn authorisation(&self, kind: EntityKind) -> &AuthorisationInformation {
        static UNRESTRICTED: AuthorisationInformation = AuthorisationInformation::InstanceRole;
        self.authorisation.get(&kind).unwrap_or(&UNRESTRICTED)
    }

    pub fn text_search_config(&self) -> &str {
        &self.text_search_config
    }

    pub fn code_match_boost(&self) -> f64 {
        self.code_match_boost
    }

    /// Upper-cased, trimmed search text compared against codes and perm ids.
    pub(crate) fn code_text(&self) -> String {
        self.text.trim().to_uppercase()
    }

    fn check(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::InvalidValue(
                "global search text must not be empty".to_string(),
            ));
        }
        if !is_sql_identifier(&self.text_search_config) {
            return Err(Error::InvalidValue(format!(
                "'{}' is not a valid text search configuration",
                self.text_search_config
            )));
        }
        Ok(())
    }
}

/// Phase-1 result row.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSearchCandidate {
    pub kind: EntityKind,
    pub id: i64,
    pub rank: f64,
}

/// Matched character range `[start, end)` inside a match value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

/// Why a record matched: a property (by code, `$`-prefixed when internal) or an
/// attribute such as `code` or `perm_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMatch {
    pub field: String,
    pub value: String,
    pub spans: Vec<MatchSpan>,
}

/// Reconciled global search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSearchRecord {
    pub kind: EntityKind,
    pub id: i64,
    pub rank: f64,
    pub code: String,
    pub perm_id: Option<String>,
    pub identifier: Option<String>,
    pub type_code: Option<String>,
    pub matches: Vec<PropertyMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalSearchSortField {
    Score,
    ObjectKind,
    PermId,
    Identifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSearchSorting {
    pub field: GlobalSearchSortField,
    #[serde(default)]
    pub order: SortOrder,
}

/// SQL fragments testing and scoring a text expression against the search text.
/// Placeholders are bound once and reused by every fragment.
pub(crate) enum TextMatcher {
    FullText { config: String, tsquery: String },
    Substring { pattern_idx: usize },
}

impl TextMatcher {
    pub(crate) fn new(context: &GlobalSearchContext, bind_params: &mut Vec<BindValue>) -> Self {
        match context.mode() {
            GlobalSearchMode::Match => {
                let config = context.text_search_config().to_string();
                let tsquery = text_query::compile_text_query(context.text(), &config, bind_params)
                    .unwrap_or_else(|| {
                        tracing::debug!(text = %context.text(), "Falling back to websearch_to_tsquery");
                        text_query::fallback_text_query(context.text(), &config, bind_params)
                    });
                Self::FullText { config, tsquery }
            }
            GlobalSearchMode::Contains => {
                let pattern = format!("%{}%", escape_like_pattern(context.text().trim()));
                Self::Substring {
                    pattern_idx: push_text(bind_params, pattern),
                }
            }
        }
    }

    pub(crate) fn matches(&self, expr: &str) -> String {
        match self {
            Self::FullText { config, tsquery } => {
                format!("to_tsvector('{}', {}) @@ {}", config, expr, tsquery)
            }
            Self::Substring { pattern_idx } => {
                format!("{} ILIKE ${} ESCAPE '\\'", expr, pattern_idx)
            }
        }
    }

    pub(crate) fn rank(&self, expr: &str) -> String {
        match self {
            Self::FullText { config, tsquery } => {
                format!("ts_rank(to_tsvector('{}', {}), {})", config, expr, tsquery)
            }
            Self::Substring { .. } => "1.0::real".to_string(),
        }
    }

    /// The matched value with hits wrapped in [`HIGHLIGHT_START`]/[`HIGHLIGHT_STOP`]
    /// for full-text search, the plain value for substring search.
    pub(crate) fn headline(&self, expr: &str) -> String {
        match self {
            Self::FullText { config, tsquery } => format!(
                "ts_headline('{}', {}, {}, 'StartSel={}, StopSel={}, HighlightAll=TRUE')",
                config, expr, tsquery, HIGHLIGHT_START, HIGHLIGHT_STOP
            ),
            Self::Substring { .. } => expr.to_string(),
        }
    }
}

/// `CASE` adding the code match boost when code or perm id equal the search text.
pub(crate) fn code_match_sql(
    mapping: &TableMapping,
    code_text_idx: usize,
    boost_idx: usize,
) -> String {
    format!(
        "CASE WHEN {} THEN ${} ELSE 0 END",
        exact_code_condition(mapping, code_text_idx),
        boost_idx
    )
}

pub(crate) fn exact_code_condition(mapping: &TableMapping, code_text_idx: usize) -> String {
    let columns = &mapping.global_search;
    let mut condition = format!(
        "UPPER({}.{}) = ${}",
        ENTITY_ALIAS, columns.code_column, code_text_idx
    );
    if let Some(perm_id) = &columns.perm_id_column {
        if perm_id != &columns.code_column {
            condition.push_str(&format!(
                " OR UPPER({}.{}) = ${}",
                ENTITY_ALIAS, perm_id, code_text_idx
            ));
        }
    }
    format!("({})", condition)
}

/// Binds shared by every phase-1 branch: search text for code matches and the boost.
pub(crate) fn push_code_match_binds(
    context: &GlobalSearchContext,
    bind_params: &mut Vec<BindValue>,
) -> (usize, usize) {
    let code_text_idx = push_text(bind_params, context.code_text());
    let boost_idx = push_float(bind_params, context.code_match_boost());
    (code_text_idx, boost_idx)
}
