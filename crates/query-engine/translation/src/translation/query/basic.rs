//! Build queries from a single field comparison, starting from a format's default tree.

use query_engine_metadata::metadata::FieldMeta;
use query_engine_models::{Comparator, Condition, Query, Search};

use super::plan::{plan_search, SearchOptions, SearchPlan, StatsPlan};
use crate::translation::error::Error;
use crate::translation::helpers::Env;

/// A fresh query holding the default tree of every format, with `format_id` (or the first
/// format) selected.
pub fn default_query(env: &Env, format_id: Option<&str>) -> Result<Query, Error> {
    let metadata = env.metadata();
    let selected_format_id = match format_id {
        Some(format_id) => {
            env.lookup_format(format_id)?;
            format_id.to_string()
        }
        None => metadata
            .format_ids()
            .first()
            .map(ToString::to_string)
            .ok_or_else(|| Error::UnknownFormat(String::new()))?,
    };
    let searches = metadata
        .formats
        .0
        .iter()
        .map(|(format_id, format)| {
            (
                format_id.clone(),
                Search {
                    name: format.name.clone(),
                    tree: format.default_tree(),
                },
            )
        })
        .collect();
    Ok(Query {
        selected_format_id,
        searches,
    })
}

/// A field of an instance, with its path relative to the format's root.
fn lookup_field<'a>(
    env: &Env<'a>,
    format_id: &str,
    instance_name: &str,
    field_name: &str,
) -> Result<(String, &'a FieldMeta), Error> {
    let format = env.lookup_format(format_id)?;
    let instance = format
        .instance(instance_name)
        .ok_or_else(|| Error::UnknownInstance {
            format: format_id.to_string(),
            instance: instance_name.to_string(),
        })?;
    let path = instance.field_path(field_name);
    let meta = instance
        .fields
        .get(field_name)
        .ok_or_else(|| Error::UnknownField {
            format: format_id.to_string(),
            path: path.clone(),
        })?;
    Ok((path, meta))
}

/// A query whose selected search is the default tree of `format_id` with its only empty
/// condition filled in. `units` defaults to the field's default units.
pub fn new_basic_query(
    env: &Env,
    format_id: &str,
    instance_name: &str,
    field_name: &str,
    comparator: Comparator,
    value: &str,
    units: Option<&str>,
) -> Result<Query, Error> {
    let (field_path, meta) = lookup_field(env, format_id, instance_name, field_name)?;
    let units = units.map_or_else(|| meta.units_spec().default, ToString::to_string);

    let mut query = default_query(env, Some(format_id))?;
    let search = query
        .searches
        .get_mut(format_id)
        .ok_or_else(|| Error::UnknownFormat(format_id.to_string()))?;
    let slots = search.tree.count_empty_conditions();
    if slots != 1 {
        return Err(Error::BasicQuerySlot {
            format: format_id.to_string(),
            count: slots,
        });
    }
    search.tree = search
        .tree
        .map_conditions(&mut |condition: &Condition| -> Result<Condition, Error> {
            if condition.is_empty() {
                Ok(Condition {
                    field_path: field_path.clone(),
                    comparator,
                    value: value.to_string(),
                    units: units.clone(),
                    is_static: false,
                    pos: condition.pos.clone(),
                })
            } else {
                Ok(condition.clone())
            }
        })?;

    super::compile_query(env.metadata(), &query, Some(format_id))?;
    Ok(query)
}

/// The displayed field standing in for a field that is searchable but not displayed.
pub fn handoff_field(
    env: &Env,
    format_id: &str,
    instance_name: &str,
    field_name: &str,
) -> Result<Option<String>, Error> {
    let (_, meta) = lookup_field(env, format_id, instance_name, field_name)?;
    if meta.searchable && !meta.displayed {
        Ok(meta.handoff_field.clone())
    } else {
        Ok(None)
    }
}

/// Plan a search listing the distinct values of `handoff_field` over the records matched by
/// `query`. They come back as the values of the stats dimension named `handoff`.
pub fn plan_handoff_lookup(
    env: &Env,
    query: &Query,
    instance_name: &str,
    handoff_field: &str,
) -> Result<SearchPlan, Error> {
    let format_id = query.selected_format_id.as_str();
    let (handoff_path, _) = lookup_field(env, format_id, instance_name, handoff_field)?;
    let mut plan = plan_search(env, query, &SearchOptions::default())?;
    plan.stats = vec![StatsPlan {
        name: HANDOFF_STATS.to_string(),
        display_name: handoff_path.clone(),
        fields: vec![handoff_path],
        delimiter: String::new(),
        top_n: 2,
    }];
    Ok(plan)
}

/// The name of the stats dimension of a handoff lookup.
pub const HANDOFF_STATS: &str = "handoff";
