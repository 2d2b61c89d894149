//! Everything a backend needs to run a search, independent of the backend.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use query_engine_metadata::metadata::{Format, PRIMARY_KEY_FIELD};
use query_engine_models::tree::split_field_path;
use query_engine_models::{is_query_populated, Node, Query};

use super::distinct::{natural_ordering, resolve_distinct_fields};
use super::filtering::compile;
use super::predicate::Predicate;
use super::prefetch::{plan_prefetches, Prefetch};
use crate::translation::error::Error;
use crate::translation::helpers::{Env, FieldCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// Pagination, ordering and reporting options of a search.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    /// A field path relative to the format's root.
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub order_direction: OrderDirection,
    #[serde(default)]
    pub compute_stats: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderElement {
    pub path: String,
    pub direction: OrderDirection,
}

/// Restricts prefetched records to those reached through records of `instance` matching the
/// search re-rooted at that instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryFilter {
    pub instance: String,
    /// The join path of `instance`, equal to or a prefix of the prefetched path.
    pub path: String,
    pub entity: String,
    /// Paths are relative to `entity`.
    pub predicate: Predicate,
}

/// Loading of the records related to the root records at one path.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchPlan {
    pub path: String,
    pub entity: String,
    pub filter: Option<SubqueryFilter>,
}

/// A value added to every row, such as the key of the related record of a split row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub path: String,
}

/// The distinct values of some fields over the whole result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsPlan {
    pub name: String,
    pub display_name: String,
    pub fields: Vec<String>,
    pub delimiter: String,
    pub top_n: usize,
}

/// A search, ready to be handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub format_id: String,
    pub root_entity: String,
    /// `None` matches every root record.
    pub predicate: Option<Predicate>,
    pub distinct_fields: Vec<String>,
    pub order_by: Vec<OrderElement>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub annotations: Vec<Annotation>,
    pub prefetch: Vec<PrefetchPlan>,
    pub stats: Vec<StatsPlan>,
}

/// Plan the selected search of a query. The query must be populated.
pub fn plan_search(
    env: &Env,
    query: &Query,
    options: &SearchOptions,
) -> Result<SearchPlan, Error> {
    if !is_query_populated(query) {
        return Err(Error::NotPopulated);
    }
    let predicate = super::compile_query(env.metadata(), query, None)?;
    let format_id = query.selected_format_id.as_str();
    let format = env.lookup_format(format_id)?;
    let tree = query
        .selected_tree()
        .ok_or_else(|| Error::UnknownFormat(format_id.to_string()))?;
    plan_compiled(env, format_id, format, tree, predicate, options)
}

/// Plan a search whose tree has already been compiled.
pub fn plan_compiled(
    env: &Env,
    format_id: &str,
    format: &Format,
    tree: &Node,
    predicate: Option<Predicate>,
    options: &SearchOptions,
) -> Result<SearchPlan, Error> {
    let span = tracing::info_span!("Plan search", format = format_id);
    let _enter = span.enter();

    let root_entity = format.root_entity.as_str();
    let order_by = options.order_by.as_deref();
    if let Some(order_by) = order_by {
        let (relationship_path, field) = split_field_path(order_by);
        let entity = env.walk(root_entity, relationship_path)?;
        env.lookup_column(entity, field)?;
    }

    // rows of the root repeat when a path used by the search fans out
    let mut assume_distinct = true;
    let searched_paths = predicate
        .iter()
        .flat_map(Predicate::paths)
        .chain(order_by);
    for path in searched_paths {
        let (relationship_path, _) = split_field_path(path);
        if env.crosses_many(root_entity, relationship_path)? {
            assume_distinct = false;
        }
    }
    let distinct_fields = resolve_distinct_fields(env, format, order_by, assume_distinct, false)?;

    let mut order_elements = vec![];
    if let Some(order_by) = order_by {
        order_elements.push(OrderElement {
            path: order_by.to_string(),
            direction: options.order_direction,
        });
    }
    if distinct_fields.is_empty() {
        for key in natural_ordering(env, root_entity)? {
            order_elements.push(OrderElement {
                path: key.path,
                direction: direction(key.descending),
            });
        }
    } else {
        let descending = naturally_descending(env, format)?;
        order_elements.extend(distinct_fields.iter().map(|field| OrderElement {
            path: field.clone(),
            direction: direction(descending.contains(field)),
        }));
    }
    order_elements.push(OrderElement {
        path: PRIMARY_KEY_FIELD.to_string(),
        direction: OrderDirection::Asc,
    });
    let mut unique_order = Vec::with_capacity(order_elements.len());
    for element in order_elements {
        if !unique_order
            .iter()
            .any(|seen: &OrderElement| seen.path == element.path)
        {
            unique_order.push(element);
        }
    }

    let mut prefetch = vec![];
    for planned in plan_prefetches(format_id, format, tree)? {
        match planned {
            Prefetch::Path(path) => prefetch.push(PrefetchPlan {
                entity: env.walk(root_entity, &path)?.to_string(),
                path,
                filter: None,
            }),
            Prefetch::Subquery {
                path,
                tree,
                instance,
            } => {
                let catalog = FieldCatalog::rooted_at(format_id, format, &instance)?;
                let (instance_path, instance_entity) =
                    catalog_instance(format_id, format, &instance)?;
                let filter = compile(&tree, &catalog)?.map(|predicate| SubqueryFilter {
                    instance,
                    path: instance_path,
                    entity: instance_entity,
                    predicate,
                });
                prefetch.push(PrefetchPlan {
                    entity: env.walk(root_entity, &path)?.to_string(),
                    path,
                    filter,
                });
            }
        }
    }

    let annotations = format
        .model_instances
        .values()
        .filter(|instance| instance.many_related.split_rows)
        .filter_map(|instance| {
            instance
                .many_related
                .root_annotation_field
                .as_ref()
                .map(|name| Annotation {
                    name: name.clone(),
                    path: instance.field_path(PRIMARY_KEY_FIELD),
                })
        })
        .collect();

    let stats = if options.compute_stats {
        format
            .stats
            .iter()
            .map(|(name, dimension)| StatsPlan {
                name: name.clone(),
                display_name: dimension.display_name.clone(),
                fields: dimension.fields.clone(),
                delimiter: dimension.delimiter.clone(),
                top_n: dimension.top_n,
            })
            .collect()
    } else {
        vec![]
    };

    tracing::debug!(
        distinct_fields = ?distinct_fields,
        prefetches = prefetch.len(),
        "planned search"
    );

    Ok(SearchPlan {
        format_id: format_id.to_string(),
        root_entity: root_entity.to_string(),
        predicate,
        distinct_fields,
        order_by: unique_order,
        limit: options.limit,
        offset: options.offset,
        annotations,
        prefetch,
        stats,
    })
}

fn direction(descending: bool) -> OrderDirection {
    if descending {
        OrderDirection::Desc
    } else {
        OrderDirection::Asc
    }
}

/// The field paths the root or one of the instances of `format` orders by descending.
fn naturally_descending(env: &Env, format: &Format) -> Result<BTreeSet<String>, Error> {
    let mut descending = BTreeSet::new();
    for instance in format.model_instances.values() {
        for key in natural_ordering(env, &instance.entity)? {
            if key.descending {
                descending.insert(instance.field_path(&key.path));
            }
        }
    }
    Ok(descending)
}

/// The join path and entity of an instance.
fn catalog_instance(
    format_id: &str,
    format: &Format,
    instance: &str,
) -> Result<(String, String), Error> {
    format
        .instance(instance)
        .map(|instance| (instance.join_path.clone(), instance.entity.clone()))
        .ok_or_else(|| Error::UnknownInstance {
            format: format_id.to_string(),
            instance: instance.to_string(),
        })
}
