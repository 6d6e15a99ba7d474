use super::{
    code_match_sql, exact_code_condition, push_code_match_binds, GlobalSearchContext,
    TextMatcher, ENTITY_ALIAS,
};
use crate::db::{Row, SchemaMetadataProvider, TableMapping};
use crate::search::query_builder::bind::push_bigint;
use crate::search::query_builder::{BindValue, SelectQuery};
use crate::{Error, Result};

/// Phase-1 query: one ranked branch per object kind, combined with `UNION ALL`.
///
/// Rows carry `object_kind_ordinal`, `id` and `rank`, ordered by rank descending,
/// then ordinal and id. With `only_count` the same candidates are counted instead
/// (single `total` column, no paging).
pub fn translate_short(
    schema: &dyn SchemaMetadataProvider,
    context: &GlobalSearchContext,
    only_count: bool,
) -> Result<SelectQuery> {
    context.check()?;
    if context.object_kinds().is_empty() {
        return Err(Error::InvalidValue(
            "global search needs at least one object kind".to_string(),
        ));
    }

    let mut bind_params = Vec::new();
    let (code_text_idx, boost_idx) = push_code_match_binds(context, &mut bind_params);
    let matcher = TextMatcher::new(context, &mut bind_params);

    let mut branches = Vec::with_capacity(context.object_kinds().len());
    for kind in context.object_kinds() {
        let mapping = schema.table_for(*kind).ok_or_else(|| {
            Error::InvalidValue(format!("object kind {} is not searchable", kind))
        })?;
        branches.push(build_branch(
            context,
            mapping,
            &matcher,
            code_text_idx,
            boost_idx,
            &mut bind_params,
        ));
    }
    let candidates = branches.join(" UNION ALL ");

    let sql = if only_count {
        format!("SELECT COUNT(*) AS total FROM ({}) c", candidates)
    } else {
        let mut sql = format!(
            "SELECT c.object_kind_ordinal, c.id, c.rank FROM ({}) c \
             ORDER BY c.rank DESC, c.object_kind_ordinal ASC, c.id ASC",
            candidates
        );
        if let Some(limit) = context.limit() {
            let idx = push_bigint(&mut bind_params, limit);
            sql.push_str(&format!(" LIMIT ${}", idx));
        }
        if let Some(offset) = context.offset() {
            let idx = push_bigint(&mut bind_params, offset);
            sql.push_str(&format!(" OFFSET ${}", idx));
        }
        sql
    };

    tracing::debug!(
        kinds = context.object_kinds().len(),
        only_count,
        args = bind_params.len(),
        sql = %sql,
        "Translated global search short query"
    );
    SelectQuery::new(sql, bind_params)
}

/// Total from a counting phase-1 query.
pub fn parse_total(rows: &[Row]) -> Result<i64> {
    match rows.first() {
        Some(row) => row.get_i64("total"),
        None => Ok(0),
    }
}

fn build_branch(
    context: &GlobalSearchContext,
    mapping: &TableMapping,
    matcher: &TextMatcher,
    code_text_idx: usize,
    boost_idx: usize,
    bind_params: &mut Vec<BindValue>,
) -> String {
    let t = ENTITY_ALIAS;
    let columns = &mapping.global_search;

    let mut documents: Vec<String> = columns
        .text_columns
        .iter()
        .map(|c| format!("SELECT ({}.{})::text AS value", t, c))
        .collect();
    if let Some(props) = &mapping.properties {
        documents.push(format!(
            "SELECT sp.value FROM {} sp WHERE sp.{} = {}.{}",
            props.values_table, props.entity_id_field, t, mapping.id_column
        ));
    }

    let mut conditions = Vec::new();
    if let Some(deletion) = &mapping.deletion_column {
        conditions.push(format!("{}.{} IS NULL", t, deletion));
    }
    if let Some(auth) =
        context
            .authorisation(mapping.kind)
            .build_sql(t, &mapping.id_column, bind_params)
    {
        conditions.push(auth);
    }
    let where_sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let mut group_by = vec![
        format!("{}.{}", t, mapping.id_column),
        format!("{}.{}", t, columns.code_column),
    ];
    if let Some(perm_id) = &columns.perm_id_column {
        if perm_id != &columns.code_column {
            group_by.push(format!("{}.{}", t, perm_id));
        }
    }

    format!(
        "(SELECT {ordinal} AS object_kind_ordinal, {t}.{id} AS id, \
         (COALESCE(MAX({rank}), 0) + {boost})::float8 AS rank \
         FROM {table} {t} LEFT JOIN LATERAL ({documents}) d ON TRUE{where_sql} \
         GROUP BY {group_by} \
         HAVING COALESCE(bool_or({matches}), FALSE) OR {exact})",
        ordinal = mapping.kind.ordinal(),
        t = t,
        id = mapping.id_column,
        rank = matcher.rank("d.value"),
        boost = code_match_sql(mapping, code_text_idx, boost_idx),
        table = mapping.entities_table,
        documents = documents.join(" UNION ALL "),
        where_sql = where_sql,
        group_by = group_by.join(", "),
        matches = matcher.matches("d.value"),
        exact = exact_code_condition(mapping, code_text_idx),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqlValue, StandardSchema};
    use crate::search::context::AuthorisationInformation;
    use crate::search::global::GlobalSearchMode;
    use labsearch_criteria::EntityKind;

    #[test]
    fn single_kind_branch() {
        let ctx = GlobalSearchContext::new("yeast", [EntityKind::Sample]);
        let q = translate_short(&StandardSchema::new(), &ctx, false).unwrap();
        assert_eq!(
            q.sql(),
            "SELECT c.object_kind_ordinal, c.id, c.rank FROM (\
             (SELECT 3 AS object_kind_ordinal, t.id AS id, \
             (COALESCE(MAX(ts_rank(to_tsvector('simple', d.value), plainto_tsquery('simple', $3))), 0) \
             + CASE WHEN (UPPER(t.code) = $1 OR UPPER(t.perm_id) = $1) THEN $2 ELSE 0 END)::float8 AS rank \
             FROM samples_all t LEFT JOIN LATERAL (SELECT (t.code)::text AS value UNION ALL \
             SELECT sp.value FROM sample_properties sp WHERE sp.samp_id = t.id) d ON TRUE \
             WHERE t.del_id IS NULL \
             GROUP BY t.id, t.code, t.perm_id \
             HAVING COALESCE(bool_or(to_tsvector('simple', d.value) @@ plainto_tsquery('simple', $3)), FALSE) \
             OR (UPPER(t.code) = $1 OR UPPER(t.perm_id) = $1))\
             ) c ORDER BY c.rank DESC, c.object_kind_ordinal ASC, c.id ASC"
        );
        assert_eq!(
            q.args(),
            &[
                BindValue::Text("YEAST".into()),
                BindValue::Float(10.0),
                BindValue::Text("yeast".into())
            ]
        );
    }

    #[test]
    fn kinds_are_combined_with_union_all_and_share_binds() {
        let ctx = GlobalSearchContext::new(
            "yeast",
            [EntityKind::Sample, EntityKind::Space, EntityKind::Experiment],
        );
        let q = translate_short(&StandardSchema::new(), &ctx, false).unwrap();
        assert_eq!(q.sql().matches(" UNION ALL (SELECT ").count(), 2);
        assert!(q.sql().contains("(SELECT 0 AS object_kind_ordinal"));
        assert!(q.sql().contains("(SELECT 2 AS object_kind_ordinal"));
        assert!(q.sql().contains("FROM spaces t LEFT JOIN LATERAL"));
        assert_eq!(q.args().len(), 3);
    }

    #[test]
    fn count_query_wraps_candidates_without_paging() {
        let ctx = GlobalSearchContext::new("yeast", [EntityKind::Sample]).with_paging(Some(10), None);
        let q = translate_short(&StandardSchema::new(), &ctx, true).unwrap();
        assert!(q.sql().starts_with("SELECT COUNT(*) AS total FROM ((SELECT 3"));
        assert!(!q.sql().contains("LIMIT"));
        assert!(!q.sql().contains("ORDER BY"));
    }

    #[test]
    fn paging_and_authorisation_are_bound() {
        let ctx = GlobalSearchContext::new("yeast", [EntityKind::Sample])
            .with_paging(Some(20), Some(40))
            .with_authorisation(
                EntityKind::Sample,
                AuthorisationInformation::visible_ids([1, 2]),
            );
        let q = translate_short(&StandardSchema::new(), &ctx, false).unwrap();
        assert!(q.sql().contains("WHERE t.del_id IS NULL AND t.id = ANY($4)"));
        assert!(q.sql().ends_with("c.id ASC LIMIT $5 OFFSET $6"));
        assert_eq!(
            q.args()[3..],
            [
                BindValue::BigIntArray(vec![1, 2]),
                BindValue::BigInt(20),
                BindValue::BigInt(40)
            ]
        );
    }

    #[test]
    fn contains_mode_uses_ilike() {
        let ctx = GlobalSearchContext::new("east", [EntityKind::Material])
            .with_mode(GlobalSearchMode::Contains);
        let q = translate_short(&StandardSchema::new(), &ctx, false).unwrap();
        assert!(q.sql().contains("COALESCE(MAX(1.0::real), 0)"));
        assert!(q.sql().contains("bool_or(d.value ILIKE $3 ESCAPE '\\')"));
        assert!(q.sql().contains("HAVING COALESCE(bool_or(d.value ILIKE $3 ESCAPE '\\'), FALSE) OR (UPPER(t.code) = $1)"));
        assert_eq!(q.args()[2], BindValue::Text("%east%".into()));
    }

    #[test]
    fn malformed_query_falls_back_to_websearch() {
        let ctx = GlobalSearchContext::new("(yeast", [EntityKind::Sample]);
        let q = translate_short(&StandardSchema::new(), &ctx, false).unwrap();
        assert!(q.sql().contains("websearch_to_tsquery('simple', $3)"));
    }

    #[test]
    fn empty_kinds_and_blank_text_are_rejected() {
        let schema = StandardSchema::new();
        let ctx = GlobalSearchContext::new("yeast", []);
        assert!(matches!(
            translate_short(&schema, &ctx, false),
            Err(Error::InvalidValue(_))
        ));
        let ctx = GlobalSearchContext::new(" ", [EntityKind::Sample]);
        assert!(matches!(
            translate_short(&schema, &ctx, false),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn total_defaults_to_zero() {
        assert_eq!(parse_total(&[]).unwrap(), 0);
        let rows = vec![Row::new().with("total", SqlValue::Int(7))];
        assert_eq!(parse_total(&rows).unwrap(), 7);
    }
}
