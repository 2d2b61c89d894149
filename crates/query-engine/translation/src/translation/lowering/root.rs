//! The selects over the root records of a search: the rows of a page and their total count.

use query_engine_metadata::metadata::PRIMARY_KEY_FIELD;
use query_engine_sql::sql;

use super::filtering::translate_predicate;
use super::joins::{JoinKind, Joins};
use super::{KEY_COLUMN, RECORD_COLUMN, ROOT_ALIAS};
use crate::translation::error::Error;
use crate::translation::helpers::Env;
use crate::translation::query::{OrderDirection, SearchPlan};

/// The root table joined to whatever the predicate needs, and the translated predicate.
pub fn filtered<'a>(
    env: &Env<'a>,
    plan: &SearchPlan,
) -> Result<(Joins<'a>, sql::ast::Expression), Error> {
    let mut joins = Joins::new(*env, &plan.root_entity, ROOT_ALIAS, JoinKind::Left)?;
    let where_ = match &plan.predicate {
        None => sql::helpers::true_expr(),
        Some(predicate) => translate_predicate(&mut joins, predicate)?,
    };
    Ok((joins, where_))
}

fn distinct(joins: &mut Joins, plan: &SearchPlan) -> Result<sql::ast::Distinct, Error> {
    if plan.distinct_fields.is_empty() {
        return Ok(sql::ast::Distinct::All);
    }
    let expressions = plan
        .distinct_fields
        .iter()
        .map(|field| joins.column(field).map(|(column, _)| column))
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(sql::ast::Distinct::On(expressions))
}

/// One page of root records, in plan order.
pub fn translate_rows(env: &Env, plan: &SearchPlan) -> Result<sql::ast::Select, Error> {
    let (mut joins, where_) = filtered(env, plan)?;

    let (key, _) = joins.column(PRIMARY_KEY_FIELD)?;
    let mut select_list = vec![
        (
            sql::helpers::make_column_alias(KEY_COLUMN.to_string()),
            sql::helpers::cast(key, "text"),
        ),
        (
            sql::helpers::make_column_alias(RECORD_COLUMN.to_string()),
            sql::ast::Expression::RowToJson(sql::ast::TableReference::AliasedTable(
                joins.root_alias().clone(),
            )),
        ),
    ];
    for annotation in &plan.annotations {
        let (column, _) = joins.column(&annotation.path)?;
        select_list.push((
            sql::helpers::make_column_alias(annotation.name.clone()),
            sql::helpers::cast(column, "text"),
        ));
    }

    let distinct = distinct(&mut joins, plan)?;
    let mut order_by = vec![];
    for element in &plan.order_by {
        let (target, _) = joins.column(&element.path)?;
        order_by.push(sql::ast::OrderByElement {
            target,
            direction: match element.direction {
                OrderDirection::Asc => sql::ast::OrderByDirection::Asc,
                OrderDirection::Desc => sql::ast::OrderByDirection::Desc,
            },
        });
    }

    let mut select = sql::helpers::simple_select(select_list);
    select.distinct = distinct;
    select.from = Some(joins.from()?);
    select.joins = joins.into_joins();
    select.where_ = sql::ast::Where(where_);
    select.order_by = sql::ast::OrderBy { elements: order_by };
    select.limit = sql::ast::Limit {
        limit: plan.limit,
        offset: plan.offset,
    };
    Ok(select)
}

/// The number of rows the search returns without pagination.
pub fn translate_count(env: &Env, plan: &SearchPlan) -> Result<sql::ast::Select, Error> {
    let (mut joins, where_) = filtered(env, plan)?;
    let distinct = distinct(&mut joins, plan)?;
    let mut inner = sql::helpers::select_one(joins.from()?, vec![], where_);
    inner.distinct = distinct;
    inner.joins = joins.into_joins();
    Ok(sql::helpers::count_select(inner))
}
