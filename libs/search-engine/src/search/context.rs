//! Per-request translation input.

use labsearch_criteria::{Criterion, EntityKind, LogicalOperator, PropertyTypeMap, SortOptions};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::query_builder::bind::push_bigint_array;
use super::query_builder::BindValue;
use crate::db::TableMapping;

/// Visibility restriction computed by the authorization layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthorisationInformation {
    /// The acting user may see every entity.
    #[default]
    InstanceRole,
    /// The acting user may see only these entity ids.
    VisibleIds(BTreeSet<i64>),
}

impl AuthorisationInformation {
    pub fn visible_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::VisibleIds(ids.into_iter().collect())
    }

    /// Predicate restricting `{alias}.{id_column}` to visible rows, if any restriction applies.
    pub(crate) fn build_sql(
        &self,
        alias: &str,
        id_column: &str,
        bind_params: &mut Vec<BindValue>,
    ) -> Option<String> {
        match self {
            Self::InstanceRole => None,
            Self::VisibleIds(ids) => {
                let idx = push_bigint_array(bind_params, ids.iter().copied().collect());
                Some(format!("{}.{} = ANY(${})", alias, id_column, idx))
            }
        }
    }
}

/// Everything one criteria or sort translation needs. Built once per request and
/// not modified afterwards.
#[derive(Debug, Clone)]
pub struct TranslationContext {
    user_id: Option<i64>,
    mapping: TableMapping,
    criteria: Criterion,
    id_column: String,
    authorisation: AuthorisationInformation,
    property_types: Option<Arc<PropertyTypeMap>>,
    sort_options: SortOptions,
}

impl TranslationContext {
    pub fn new(mapping: TableMapping, criteria: Criterion) -> Self {
        let id_column = mapping.id_column.clone();
        Self {
            user_id: None,
            mapping,
            criteria,
            id_column,
            authorisation: AuthorisationInformation::default(),
            property_types: None,
            sort_options: SortOptions::default(),
        }
    }

    /// Context whose root combines `criteria` with `operator`.
    pub fn with_criteria_list(
        mapping: TableMapping,
        operator: LogicalOperator,
        criteria: Vec<Criterion>,
    ) -> Self {
        let root = match operator {
            LogicalOperator::And => Criterion::and(criteria),
            LogicalOperator::Or => Criterion::or(criteria),
        };
        Self::new(mapping, root)
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    pub fn with_authorisation(mut self, authorisation: AuthorisationInformation) -> Self {
        self.authorisation = authorisation;
        self
    }

    pub fn with_property_types(mut self, property_types: Arc<PropertyTypeMap>) -> Self {
        self.property_types = Some(property_types);
        self
    }

    pub fn with_sort_options(mut self, sort_options: SortOptions) -> Self {
        self.sort_options = sort_options;
        self
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn kind(&self) -> EntityKind {
        self.mapping.kind
    }

    pub fn mapping(&self) -> &TableMapping {
        &self.mapping
    }

    pub fn criteria(&self) -> &Criterion {
        &self.criteria
    }

    /// Operator of the root composite; a single leaf behaves as `AND`.
    pub fn operator(&self) -> LogicalOperator {
        match &self.criteria {
            Criterion::Composite(c) => c.operator,
            _ => LogicalOperator::And,
        }
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn authorisation(&self) -> &AuthorisationInformation {
        &self.authorisation
    }

    pub fn property_types(&self) -> Option<&PropertyTypeMap> {
        self.property_types.as_deref()
    }

    pub fn sort_options(&self) -> &SortOptions {
        &self.sort_options
    }

    /// Whether the criteria or the sortings reference properties, i.e. whether the
    /// property-type map must be loaded before translating.
    pub fn needs_property_types(&self) -> bool {
        self.criteria.references_properties() || self.sort_options.references_properties()
    }
}
