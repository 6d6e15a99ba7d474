use labsearch_criteria::{EntityKind, SortOrder};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::highlight::{strip_highlights, substring_spans};
use super::{
    GlobalSearchCandidate, GlobalSearchContext, GlobalSearchMode, GlobalSearchRecord,
    GlobalSearchSortField, GlobalSearchSorting, MatchSpan, PropertyMatch,
};
use crate::db::Row;
use crate::{Error, Result};

fn kind_of(row: &Row) -> Result<EntityKind> {
    let ordinal = row.get_i64("object_kind_ordinal")?;
    EntityKind::from_ordinal(ordinal)
        .ok_or_else(|| Error::Executor(format!("unknown object kind ordinal {}", ordinal)))
}

/// Reads phase-1 rows, keeping their order.
pub fn parse_candidates(rows: &[Row]) -> Result<Vec<GlobalSearchCandidate>> {
    rows.iter()
        .map(|row| {
            Ok(GlobalSearchCandidate {
                kind: kind_of(row)?,
                id: row.get_i64("id")?,
                rank: row.get_f64("rank")?,
            })
        })
        .collect()
}

/// Candidate ids partitioned by kind, the input of the details query.
pub fn ids_by_kind(candidates: &[GlobalSearchCandidate]) -> BTreeMap<EntityKind, BTreeSet<i64>> {
    let mut out: BTreeMap<EntityKind, BTreeSet<i64>> = BTreeMap::new();
    for c in candidates {
        out.entry(c.kind).or_default().insert(c.id);
    }
    out
}

/// Merges phase-2 rows back into phase-1 order.
///
/// Every record takes the rank its candidate had in phase 1. Rows that match no
/// candidate, or repeat one, are dropped with a warning; so are candidates that no
/// longer have a detail row (deleted between the two phases).
pub fn reconcile(
    context: &GlobalSearchContext,
    candidates: &[GlobalSearchCandidate],
    details: &[Row],
) -> Result<Vec<GlobalSearchRecord>> {
    let positions: HashMap<(EntityKind, i64), usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| ((c.kind, c.id), i))
        .collect();

    let mut slots: Vec<Option<GlobalSearchRecord>> = vec![None; candidates.len()];
    for row in details {
        let kind = kind_of(row)?;
        let id = row.get_i64("id")?;
        let Some(&position) = positions.get(&(kind, id)) else {
            tracing::warn!(kind = %kind, id, "Detail row without phase-1 candidate");
            continue;
        };
        if slots[position].is_some() {
            tracing::warn!(kind = %kind, id, "Duplicate detail row");
            continue;
        }
        slots[position] = Some(build_record(context, &candidates[position], row)?);
    }

    let missing = slots.iter().filter(|s| s.is_none()).count();
    if missing > 0 {
        tracing::warn!(missing, "Candidates vanished between global search phases");
    }

    Ok(slots.into_iter().flatten().collect())
}

fn build_record(
    context: &GlobalSearchContext,
    candidate: &GlobalSearchCandidate,
    row: &Row,
) -> Result<GlobalSearchRecord> {
    let code = row.get_str("code")?.to_string();
    let perm_id = row.get_opt_str("perm_id")?.map(str::to_string);

    let mut matches = Vec::new();
    if context.wants_matches() {
        if let (Some(field), Some(headline)) = (
            row.get_opt_str("match_field")?,
            row.get_opt_str("match_headline")?,
        ) {
            matches.push(property_match(context, field, headline));
        }

        let code_text = context.code_text();
        if code.to_uppercase() == code_text {
            matches.push(whole_value_match("code", &code));
        }
        if let Some(perm_id) = perm_id.as_deref() {
            if perm_id != code && perm_id.to_uppercase() == code_text {
                matches.push(whole_value_match("perm_id", perm_id));
            }
        }
    }

    Ok(GlobalSearchRecord {
        kind: candidate.kind,
        id: candidate.id,
        rank: candidate.rank,
        code,
        perm_id,
        identifier: row.get_opt_str("identifier")?.map(str::to_string),
        type_code: row.get_opt_str("type_code")?.map(str::to_string),
        matches,
    })
}

fn property_match(context: &GlobalSearchContext, field: &str, headline: &str) -> PropertyMatch {
    let (value, spans) = match context.mode() {
        GlobalSearchMode::Match => strip_highlights(headline),
        GlobalSearchMode::Contains => (
            headline.to_string(),
            substring_spans(headline, context.text().trim()),
        ),
    };
    PropertyMatch {
        field: field.to_string(),
        value,
        spans,
    }
}

fn whole_value_match(field: &str, value: &str) -> PropertyMatch {
    PropertyMatch {
        field: field.to_string(),
        value: value.to_string(),
        spans: vec![MatchSpan {
            start: 0,
            end: value.chars().count(),
        }],
    }
}

/// Stable re-sort of reconciled records. Records equal under every sorting keep
/// their phase-1 order; missing perm ids and identifiers sort last when ascending.
pub fn sort_records(records: &mut [GlobalSearchRecord], sortings: &[GlobalSearchSorting]) {
    if sortings.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        sortings
            .iter()
            .map(|s| {
                let ordering = compare(a, b, s.field);
                match s.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

fn compare(a: &GlobalSearchRecord, b: &GlobalSearchRecord, field: GlobalSearchSortField) -> Ordering {
    match field {
        GlobalSearchSortField::Score => a.rank.total_cmp(&b.rank),
        GlobalSearchSortField::ObjectKind => a.kind.cmp(&b.kind),
        GlobalSearchSortField::PermId => nulls_last(a.perm_id.as_deref(), b.perm_id.as_deref()),
        GlobalSearchSortField::Identifier => {
            nulls_last(a.identifier.as_deref(), b.identifier.as_deref())
        }
    }
}

fn nulls_last(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlValue;

    fn candidate(kind: EntityKind, id: i64, rank: f64) -> GlobalSearchCandidate {
        GlobalSearchCandidate { kind, id, rank }
    }

    fn detail(kind: EntityKind, id: i64, code: &str) -> Row {
        Row::new()
            .with("object_kind_ordinal", SqlValue::Int(kind.ordinal().into()))
            .with("id", SqlValue::Int(id))
            .with("code", SqlValue::Text(code.into()))
            .with("perm_id", SqlValue::Null)
            .with("identifier", SqlValue::Text(format!("/LAB/{}", code)))
            .with("type_code", SqlValue::Null)
    }

    fn context() -> GlobalSearchContext {
        GlobalSearchContext::new("yeast", EntityKind::ALL)
    }

    #[test]
    fn restores_phase_one_order_and_ranks() {
        let candidates = vec![
            candidate(EntityKind::Sample, 1, 0.9),
            candidate(EntityKind::Experiment, 1, 0.4),
        ];
        let details = vec![
            detail(EntityKind::Experiment, 1, "EXP1"),
            detail(EntityKind::Sample, 1, "S1"),
        ];

        let records = reconcile(&context(), &candidates, &details).unwrap();
        let got: Vec<_> = records.iter().map(|r| (r.kind, r.id, r.rank)).collect();
        assert_eq!(
            got,
            vec![
                (EntityKind::Sample, 1, 0.9),
                (EntityKind::Experiment, 1, 0.4)
            ]
        );
        assert_eq!(records[0].identifier.as_deref(), Some("/LAB/S1"));
    }

    #[test]
    fn drops_unknown_duplicate_and_missing_rows() {
        let candidates = vec![
            candidate(EntityKind::Sample, 1, 1.0),
            candidate(EntityKind::Sample, 2, 0.5),
            candidate(EntityKind::Sample, 3, 0.1),
        ];
        let details = vec![
            detail(EntityKind::Sample, 3, "S3"),
            detail(EntityKind::Material, 3, "M3"),
            detail(EntityKind::Sample, 1, "S1"),
            detail(EntityKind::Sample, 1, "S1-again"),
        ];

        let records = reconcile(&context(), &candidates, &details).unwrap();
        let codes: Vec<_> = records.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["S1", "S3"]);
    }

    #[test]
    fn parses_candidates_in_row_order() {
        let rows = vec![
            Row::new()
                .with("object_kind_ordinal", SqlValue::Int(4))
                .with("id", SqlValue::Int(8))
                .with("rank", SqlValue::Float(0.7)),
            Row::new()
                .with("object_kind_ordinal", SqlValue::Int(0))
                .with("id", SqlValue::Int(2))
                .with("rank", SqlValue::Float(0.2)),
        ];
        let candidates = parse_candidates(&rows).unwrap();
        assert_eq!(
            candidates,
            vec![
                candidate(EntityKind::DataSet, 8, 0.7),
                candidate(EntityKind::Space, 2, 0.2)
            ]
        );

        let by_kind = ids_by_kind(&candidates);
        assert_eq!(by_kind[&EntityKind::DataSet], BTreeSet::from([8]));
        assert_eq!(by_kind[&EntityKind::Space], BTreeSet::from([2]));
    }

    #[test]
    fn unknown_ordinal_is_an_executor_error() {
        let rows = vec![Row::new()
            .with("object_kind_ordinal", SqlValue::Int(42))
            .with("id", SqlValue::Int(1))
            .with("rank", SqlValue::Float(1.0))];
        assert!(matches!(parse_candidates(&rows), Err(Error::Executor(_))));
    }

    #[test]
    fn matches_from_headline_and_exact_code() {
        let ctx = GlobalSearchContext::new("s1", [EntityKind::Sample]).with_matches(true);
        let candidates = vec![candidate(EntityKind::Sample, 1, 10.5)];
        let details = vec![detail(EntityKind::Sample, 1, "S1")
            .with("perm_id", SqlValue::Text("20240101-1".into()))
            .with("match_field", SqlValue::Text("$NAME".into()))
            .with("match_headline", SqlValue::Text("tube <<S1>> rack".into()))];

        let records = reconcile(&ctx, &candidates, &details).unwrap();
        assert_eq!(
            records[0].matches,
            vec![
                PropertyMatch {
                    field: "$NAME".into(),
                    value: "tube S1 rack".into(),
                    spans: vec![MatchSpan { start: 5, end: 7 }],
                },
                PropertyMatch {
                    field: "code".into(),
                    value: "S1".into(),
                    spans: vec![MatchSpan { start: 0, end: 2 }],
                },
            ]
        );
    }

    #[test]
    fn contains_mode_spans_come_from_substring_search() {
        let ctx = GlobalSearchContext::new("east", [EntityKind::Sample])
            .with_mode(GlobalSearchMode::Contains)
            .with_matches(true);
        let candidates = vec![candidate(EntityKind::Sample, 1, 1.0)];
        let details = vec![detail(EntityKind::Sample, 1, "S1")
            .with("match_field", SqlValue::Text("NOTES".into()))
            .with("match_headline", SqlValue::Text("Yeast feast".into()))];

        let records = reconcile(&ctx, &candidates, &details).unwrap();
        assert_eq!(
            records[0].matches[0].spans,
            vec![MatchSpan { start: 1, end: 5 }, MatchSpan { start: 7, end: 11 }]
        );
    }

    #[test]
    fn sorting_is_stable_with_nulls_last() {
        let mut records = reconcile(
            &context(),
            &[
                candidate(EntityKind::Sample, 1, 0.5),
                candidate(EntityKind::Sample, 2, 0.9),
                candidate(EntityKind::Space, 3, 0.5),
            ],
            &[
                detail(EntityKind::Sample, 1, "B"),
                detail(EntityKind::Sample, 2, "A").with("identifier", SqlValue::Null),
                detail(EntityKind::Space, 3, "C"),
            ],
        )
        .unwrap();

        sort_records(
            &mut records,
            &[GlobalSearchSorting {
                field: GlobalSearchSortField::Identifier,
                order: SortOrder::Asc,
            }],
        );
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);

        sort_records(
            &mut records,
            &[GlobalSearchSorting {
                field: GlobalSearchSortField::Score,
                order: SortOrder::Desc,
            }],
        );
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}
