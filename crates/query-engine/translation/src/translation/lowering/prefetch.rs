//! Loading the records related to a page of root records.

use query_engine_metadata::metadata::{join_tokens, path_tokens, PRIMARY_KEY_FIELD};
use query_engine_sql::sql;

use super::filtering::translate_predicate;
use super::joins::{JoinKind, Joins};
use super::{KEY_COLUMN, RECORD_COLUMN, ROOT_ALIAS, ROOT_KEY_COLUMN, SUBQUERY_ALIAS};
use crate::translation::error::Error;
use crate::translation::helpers::Env;
use crate::translation::query::prefetch::extends;
use crate::translation::query::{PrefetchPlan, SearchPlan};

/// Every path to load for a plan: each planned prefetch, preceded by the paths it passes through
/// that are not planned themselves. Those keep the prefetch's filter when they extend its
/// instance's path.
pub fn prefetch_steps(env: &Env, plan: &SearchPlan) -> Result<Vec<PrefetchPlan>, Error> {
    let is_planned = |steps: &[PrefetchPlan], path: &str| {
        plan.prefetch.iter().chain(steps).any(|planned| planned.path == path)
    };
    let mut steps: Vec<PrefetchPlan> = vec![];
    for prefetch in &plan.prefetch {
        let hops = path_tokens(&prefetch.path);
        for depth in 1..hops.len() {
            let path = join_tokens(hops[..depth].iter().copied());
            if !is_planned(&steps, &path) {
                let filter = prefetch
                    .filter
                    .as_ref()
                    .filter(|filter| filter.path == path || extends(&path, &filter.path))
                    .cloned();
                steps.push(PrefetchPlan {
                    entity: env.walk(&plan.root_entity, &path)?.to_string(),
                    path,
                    filter,
                });
            }
        }
        if !steps.iter().any(|step| step.path == prefetch.path) {
            steps.push(prefetch.clone());
        }
    }
    Ok(steps)
}

/// The records at `prefetch.path` of the root records keyed by `root_keys`, one row per pair of
/// root record and related record.
pub fn translate_prefetch(
    env: &Env,
    plan: &SearchPlan,
    prefetch: &PrefetchPlan,
    root_keys: &[String],
) -> Result<sql::ast::Select, Error> {
    let mut joins = Joins::new(*env, &plan.root_entity, ROOT_ALIAS, JoinKind::Inner)?;
    let (root_key, _) = joins.column(PRIMARY_KEY_FIELD)?;
    let (target_alias, _) = joins.table(&prefetch.path)?;
    let (target_key, _) =
        joins.column(&join_tokens([prefetch.path.as_str(), PRIMARY_KEY_FIELD]))?;

    let mut where_ = if root_keys.is_empty() {
        sql::helpers::false_expr()
    } else {
        sql::ast::Expression::BinaryArrayOperation {
            left: Box::new(sql::helpers::cast(root_key.clone(), "text")),
            operator: sql::ast::BinaryArrayOperator::In,
            right: root_keys
                .iter()
                .map(|key| sql::ast::Expression::Value(sql::ast::Value::String(key.clone())))
                .collect(),
        }
    };

    if let Some(filter) = &prefetch.filter {
        let mut subquery_joins = Joins::new(*env, &filter.entity, SUBQUERY_ALIAS, JoinKind::Left)?;
        let matching = translate_predicate(&mut subquery_joins, &filter.predicate)?;
        let (subquery_key, _) = subquery_joins.column(PRIMARY_KEY_FIELD)?;
        let (filtered_key, _) =
            joins.column(&join_tokens([filter.path.as_str(), PRIMARY_KEY_FIELD]))?;
        let mut subquery = sql::helpers::simple_select(vec![(
            sql::helpers::make_column_alias(KEY_COLUMN.to_string()),
            subquery_key,
        )]);
        subquery.from = Some(subquery_joins.from()?);
        subquery.joins = subquery_joins.into_joins();
        subquery.where_ = sql::ast::Where(matching);
        where_ = sql::helpers::and(
            where_,
            sql::ast::Expression::InSelect {
                expression: Box::new(filtered_key),
                select: Box::new(subquery),
            },
        );
    }

    let mut select = sql::helpers::simple_select(vec![
        (
            sql::helpers::make_column_alias(ROOT_KEY_COLUMN.to_string()),
            sql::helpers::cast(root_key.clone(), "text"),
        ),
        (
            sql::helpers::make_column_alias(RECORD_COLUMN.to_string()),
            sql::ast::Expression::RowToJson(sql::ast::TableReference::AliasedTable(target_alias)),
        ),
    ]);
    select.distinct = sql::ast::Distinct::On(vec![root_key.clone(), target_key.clone()]);
    select.from = Some(joins.from()?);
    select.joins = joins.into_joins();
    select.where_ = sql::ast::Where(where_);
    select.order_by = sql::ast::OrderBy {
        elements: vec![
            sql::ast::OrderByElement {
                target: root_key,
                direction: sql::ast::OrderByDirection::Asc,
            },
            sql::ast::OrderByElement {
                target: target_key,
                direction: sql::ast::OrderByDirection::Asc,
            },
        ],
    };
    Ok(select)
}
