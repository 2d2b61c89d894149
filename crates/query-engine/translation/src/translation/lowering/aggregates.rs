//! Reporting dimensions: how many root records share each value of some fields.

use query_engine_metadata::metadata::PRIMARY_KEY_FIELD;
use query_engine_sql::sql;

use super::root::filtered;
use super::{COUNT_COLUMN, VALUE_COLUMN};
use crate::translation::error::Error;
use crate::translation::helpers::Env;
use crate::translation::query::{SearchPlan, StatsPlan};

/// `SELECT concat_ws(delimiter, fields...) AS value, COUNT(DISTINCT root.pk) AS count ...
/// GROUP BY 1`, most frequent values first.
pub fn translate_stats(
    env: &Env,
    plan: &SearchPlan,
    stats: &StatsPlan,
) -> Result<sql::ast::Select, Error> {
    let (mut joins, where_) = filtered(env, plan)?;

    let mut args = vec![sql::ast::Expression::Value(sql::ast::Value::String(
        stats.delimiter.clone(),
    ))];
    for field in &stats.fields {
        let (column, _) = joins.column(field)?;
        args.push(sql::helpers::cast(column, "text"));
    }
    let key_column = env.lookup_column(&plan.root_entity, PRIMARY_KEY_FIELD)?;
    let key = sql::helpers::make_column_reference(joins.root_alias(), &key_column.name);

    let mut select = sql::helpers::simple_select(vec![
        (
            sql::helpers::make_column_alias(VALUE_COLUMN.to_string()),
            sql::ast::Expression::FunctionCall {
                function: sql::ast::Function::ConcatWs,
                args,
            },
        ),
        (
            sql::helpers::make_column_alias(COUNT_COLUMN.to_string()),
            sql::ast::Expression::Count(sql::ast::CountType::Distinct(key)),
        ),
    ]);
    select.from = Some(joins.from()?);
    select.joins = joins.into_joins();
    select.where_ = sql::ast::Where(where_);
    select.group_by = sql::ast::GroupBy {
        elements: vec![sql::ast::Expression::Value(sql::ast::Value::Int8(1))],
    };
    select.order_by = sql::ast::OrderBy {
        elements: vec![
            sql::ast::OrderByElement {
                target: sql::ast::Expression::Value(sql::ast::Value::Int8(2)),
                direction: sql::ast::OrderByDirection::Desc,
            },
            sql::ast::OrderByElement {
                target: sql::ast::Expression::Value(sql::ast::Value::Int8(1)),
                direction: sql::ast::OrderByDirection::Asc,
            },
        ],
    };
    Ok(select)
}
