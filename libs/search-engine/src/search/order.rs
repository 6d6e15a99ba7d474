//! ID-set ordering.
//!
//! Sorts a pre-filtered set of entity ids. Every order query ends with the entity id
//! ascending as tie-break so paging through the result is stable.

use labsearch_criteria::{DataType, SortField, Sorting};

use super::context::TranslationContext;
use super::query_builder::bind::{push_bigint, push_bigint_array, push_text};
use super::query_builder::{BindValue, SelectQuery};
use super::translate::ROOT_ALIAS;
use crate::config::is_sql_identifier;
use crate::db::TableMapping;
use crate::{Error, Result};

/// Builds the query ordering `ids` by the context's sort options.
///
/// `ids` are entity ids of the mapping's id column. The query projects the context's
/// id column, which may be a different one such as the perm id.
pub fn translate_order(context: &TranslationContext, ids: &[i64]) -> Result<SelectQuery> {
    let mapping = context.mapping();
    let id_column = context.id_column();
    if !is_sql_identifier(id_column) {
        return Err(Error::InvalidValue(format!(
            "'{}' is not a valid id column",
            id_column
        )));
    }

    let mut bind_params = Vec::new();
    let ids_idx = push_bigint_array(&mut bind_params, ids.to_vec());

    let mut order_by = Vec::with_capacity(context.sort_options().sortings.len() + 1);
    for (i, sorting) in context.sort_options().sortings.iter().enumerate() {
        order_by.push(sort_expr(context, mapping, sorting, i + 1, &mut bind_params)?);
    }
    order_by.push(format!("{}.{} ASC", ROOT_ALIAS, mapping.id_column));

    let mut sql = format!(
        "SELECT {a}.{projected} FROM {table} {a} WHERE {a}.{id} = ANY(${ids}) ORDER BY {order}",
        a = ROOT_ALIAS,
        projected = id_column,
        id = mapping.id_column,
        table = mapping.entities_table,
        ids = ids_idx,
        order = order_by.join(", "),
    );

    let options = context.sort_options();
    if let Some(limit) = options.limit {
        let idx = push_bigint(&mut bind_params, limit);
        sql.push_str(&format!(" LIMIT ${}", idx));
    }
    if let Some(offset) = options.offset {
        let idx = push_bigint(&mut bind_params, offset);
        sql.push_str(&format!(" OFFSET ${}", idx));
    }

    tracing::debug!(kind = %context.kind(), ids = ids.len(), sql = %sql, "Translated sort");
    SelectQuery::new(sql, bind_params)
}

fn sort_expr(
    context: &TranslationContext,
    mapping: &TableMapping,
    sorting: &Sorting,
    position: usize,
    bind_params: &mut Vec<BindValue>,
) -> Result<String> {
    let direction = sorting.order.as_sql();
    match &sorting.field {
        SortField::Attribute(name) => {
            let column = mapping.attribute(name).ok_or_else(|| Error::UnknownField {
                criterion: "SortOptions".to_string(),
                field: name.clone(),
            })?;
            Ok(format!(
                "{}.{} {} NULLS LAST",
                ROOT_ALIAS, column.column, direction
            ))
        }
        SortField::Property(code) => {
            let unknown = || Error::UnknownField {
                criterion: "SortOptions".to_string(),
                field: code.clone(),
            };
            let types = context.property_types().ok_or_else(|| {
                Error::Internal("property types were not loaded for a property sort".to_string())
            })?;
            let tables = mapping.properties.as_ref().ok_or_else(unknown)?;
            let record = types.get(code).ok_or_else(unknown)?;

            let code_idx = push_text(bind_params, record.code.clone());
            let v = format!("so{}", position);
            let a = format!("soa{}", position);
            let pt = format!("sopt{}", position);
            let aggregate = match record.data_type {
                DataType::Integer | DataType::Real => format!("MIN(({}.value)::numeric)", v),
                DataType::Timestamp => format!("MIN(({}.value)::timestamptz)", v),
                DataType::Date => format!("MIN(({}.value)::date)", v),
                DataType::Boolean => format!("bool_and(({}.value)::boolean)", v),
                _ => format!("MIN({}.value)", v),
            };

            Ok(format!(
                "(SELECT {agg} FROM {vt} {v} \
                 JOIN {at} {a} ON {a}.id = {v}.{af} \
                 JOIN {ptt} {pt} ON {pt}.id = {a}.{pf} \
                 WHERE {v}.{ef} = {root}.{id} AND {pt}.code = ${code} \
                 AND {pt}.is_managed_internally = {internal}) {dir} NULLS LAST",
                agg = aggregate,
                vt = tables.values_table,
                v = v,
                at = tables.assignments_table,
                a = a,
                af = tables.assignment_field,
                ptt = tables.property_types_table,
                pt = pt,
                pf = tables.property_type_field,
                ef = tables.entity_id_field,
                root = ROOT_ALIAS,
                id = mapping.id_column,
                code = code_idx,
                internal = if record.is_managed_internally { "TRUE" } else { "FALSE" },
                dir = direction,
            ))
        }
    }
}
