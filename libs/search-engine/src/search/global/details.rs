use labsearch_criteria::EntityKind;
use std::collections::{BTreeMap, BTreeSet};

use super::{GlobalSearchContext, TextMatcher, ENTITY_ALIAS};
use crate::db::{SchemaMetadataProvider, TableMapping};
use crate::search::query_builder::bind::push_bigint_array;
use crate::search::query_builder::{BindValue, SelectQuery};
use crate::{Error, Result};

/// Phase-2 query: display rows for the phase-1 candidates, grouped by kind.
///
/// Relevance is not recomputed and rows come back in no particular order; see
/// [`super::reconcile`]. When the context asks for matches, each row also carries
/// the best matching property (`match_field`, `match_headline`).
pub fn translate_details(
    schema: &dyn SchemaMetadataProvider,
    context: &GlobalSearchContext,
    ids_by_kind: &BTreeMap<EntityKind, BTreeSet<i64>>,
) -> Result<SelectQuery> {
    context.check()?;
    if ids_by_kind.values().all(BTreeSet::is_empty) {
        return Err(Error::Internal(
            "global search details requested without candidates".to_string(),
        ));
    }

    let mut targets = Vec::with_capacity(ids_by_kind.len());
    for (kind, ids) in ids_by_kind.iter().filter(|(_, ids)| !ids.is_empty()) {
        let mapping = schema.table_for(*kind).ok_or_else(|| {
            Error::Internal(format!("candidate of unmapped object kind {}", kind))
        })?;
        targets.push((mapping, ids));
    }

    // Only bind the text query when some branch actually searches property values.
    let mut bind_params = Vec::new();
    let with_matches = context.wants_matches();
    let matcher = (with_matches && targets.iter().any(|(m, _)| m.properties.is_some()))
        .then(|| TextMatcher::new(context, &mut bind_params));

    let branches: Vec<String> = targets
        .into_iter()
        .map(|(mapping, ids)| {
            build_branch(mapping, ids, with_matches, matcher.as_ref(), &mut bind_params)
        })
        .collect();

    let sql = branches.join(" UNION ALL ");
    tracing::debug!(
        kinds = branches.len(),
        args = bind_params.len(),
        sql = %sql,
        "Translated global search details query"
    );
    SelectQuery::new(sql, bind_params)
}

fn build_branch(
    mapping: &TableMapping,
    ids: &BTreeSet<i64>,
    with_matches: bool,
    matcher: Option<&TextMatcher>,
    bind_params: &mut Vec<BindValue>,
) -> String {
    let t = ENTITY_ALIAS;
    let columns = &mapping.global_search;
    let ids_idx = push_bigint_array(bind_params, ids.iter().copied().collect());

    let perm_id = columns
        .perm_id_column
        .as_ref()
        .map(|c| format!("({}.{})::text", t, c))
        .unwrap_or_else(|| "NULL::text".to_string());
    let type_code = columns
        .type_code_sql
        .as_ref()
        .map(|sql| format!("({})::text", sql))
        .unwrap_or_else(|| "NULL::text".to_string());

    let (match_columns, lateral) = match (matcher, &mapping.properties) {
        _ if !with_matches => (String::new(), String::new()),
        (Some(matcher), Some(props)) => (
            ", m.field AS match_field, m.headline AS match_headline".to_string(),
            format!(
                " LEFT JOIN LATERAL (SELECT CASE WHEN pt.is_managed_internally \
                 THEN '$' || pt.code ELSE pt.code END AS field, {headline} AS headline \
                 FROM {vt} sp JOIN {at} a ON a.id = sp.{af} \
                 JOIN {ptt} pt ON pt.id = a.{pf} \
                 WHERE sp.{ef} = {t}.{id} AND {matches} \
                 ORDER BY {rank} DESC, pt.code ASC LIMIT 1) m ON TRUE",
                headline = matcher.headline("sp.value"),
                vt = props.values_table,
                at = props.assignments_table,
                af = props.assignment_field,
                ptt = props.property_types_table,
                pf = props.property_type_field,
                ef = props.entity_id_field,
                t = t,
                id = mapping.id_column,
                matches = matcher.matches("sp.value"),
                rank = matcher.rank("sp.value"),
            ),
        ),
        _ => (
            ", NULL::text AS match_field, NULL::text AS match_headline".to_string(),
            String::new(),
        ),
    };

    format!(
        "(SELECT {ordinal} AS object_kind_ordinal, {t}.{id} AS id, ({t}.{code})::text AS code, \
         {perm_id} AS perm_id, ({identifier})::text AS identifier, {type_code} AS type_code\
         {match_columns} FROM {table} {t}{lateral} WHERE {t}.{id} = ANY(${ids}))",
        ordinal = mapping.kind.ordinal(),
        t = t,
        id = mapping.id_column,
        code = columns.code_column,
        perm_id = perm_id,
        identifier = columns.identifier_sql,
        type_code = type_code,
        match_columns = match_columns,
        table = mapping.entities_table,
        lateral = lateral,
        ids = ids_idx,
    )
}
