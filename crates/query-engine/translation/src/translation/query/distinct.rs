//! Work out which fields make an output row unique.
//!
//! Joining a root record to several related records repeats the root record. Whether that is
//! wanted depends on the instance: a "split rows" instance shows one row per related record, any
//! other instance is merged into the root's row. The fields returned here are handed to the
//! backend's `DISTINCT ON`, so database rows match the rows a person sees.

use query_engine_metadata::metadata::{
    join_tokens, parse_ordering_field, Format, RelationshipKind, PRIMARY_KEY_FIELD,
};

use crate::translation::error::Error;
use crate::translation::helpers::Env;

/// An entry of an entity's natural ordering, resolved down to a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingKey {
    pub path: String,
    pub descending: bool,
}

/// The natural ordering of an entity, with foreign keys replaced by the ordering of the entity
/// they point at. A foreign key to an entity already being resolved orders by its key instead.
pub fn natural_ordering(env: &Env, entity_name: &str) -> Result<Vec<OrderingKey>, Error> {
    let mut visiting = vec![];
    resolve_ordering(env, entity_name, &mut visiting)
}

fn resolve_ordering(
    env: &Env,
    entity_name: &str,
    visiting: &mut Vec<String>,
) -> Result<Vec<OrderingKey>, Error> {
    let entity = env.lookup_entity(entity_name)?;
    visiting.push(entity_name.to_string());

    let mut keys = vec![];
    for entry in &entity.ordering {
        let ordering = parse_ordering_field(entry);
        let foreign_key = entity
            .relationships
            .get(ordering.field)
            .filter(|relationship| relationship.kind == RelationshipKind::ForeignKey)
            .filter(|_| entity.column(ordering.field).is_none());
        match foreign_key {
            None => keys.push(OrderingKey {
                path: ordering.field.to_string(),
                descending: ordering.descending,
            }),
            Some(relationship) => {
                let target_keys = if visiting.contains(&relationship.target) {
                    vec![]
                } else {
                    resolve_ordering(env, &relationship.target, visiting)?
                };
                if target_keys.is_empty() {
                    keys.push(OrderingKey {
                        path: join_tokens([ordering.field, PRIMARY_KEY_FIELD]),
                        descending: ordering.descending,
                    });
                }
                keys.extend(target_keys.into_iter().map(|key| OrderingKey {
                    path: join_tokens([ordering.field, key.path.as_str()]),
                    descending: key.descending != ordering.descending,
                }));
            }
        }
    }

    visiting.pop();
    Ok(keys)
}

/// The fields that make output rows of `format` unique, as paths relative to its root.
///
/// * every split-rows instance (every many-to-many instance when `split_all`) contributes its
///   declared distinct fields, or its natural ordering and key when it has none or `split_all`;
/// * when anything was contributed, the root's natural ordering and key come first, preceded by
///   `order_by` unless that is already included;
/// * otherwise the root's key alone, unless rows are `assume_distinct` already.
///
/// Duplicates are removed, keeping the first occurrence.
pub fn resolve_distinct_fields(
    env: &Env,
    format: &Format,
    order_by: Option<&str>,
    assume_distinct: bool,
    split_all: bool,
) -> Result<Vec<String>, Error> {
    let mut instance_fields = vec![];
    for instance in format.model_instances.values() {
        if instance.join_path.is_empty() {
            continue;
        }
        let split = instance.many_related.split_rows
            || (split_all && instance.many_related.is_many_to_many);
        if !split {
            continue;
        }
        let fields = match (&instance.distinct_fields, split_all) {
            (Some(distinct_fields), false) => distinct_fields.clone(),
            _ => natural_ordering(env, &instance.entity)?
                .into_iter()
                .map(|key| key.path)
                .chain([PRIMARY_KEY_FIELD.to_string()])
                .collect(),
        };
        instance_fields.extend(fields.iter().map(|field| instance.field_path(field)));
    }

    let mut fields = vec![];
    if !instance_fields.is_empty() {
        if let Some(order_by) = order_by {
            if !instance_fields.iter().any(|field| field == order_by) {
                fields.push(order_by.to_string());
            }
        }
        fields.extend(
            natural_ordering(env, &format.root_entity)?
                .into_iter()
                .map(|key| key.path),
        );
        fields.push(PRIMARY_KEY_FIELD.to_string());
        fields.extend(instance_fields);
    } else if !assume_distinct {
        fields.push(PRIMARY_KEY_FIELD.to_string());
    }

    let mut unique = Vec::with_capacity(fields.len());
    for field in fields {
        if !unique.contains(&field) {
            unique.push(field);
        }
    }
    Ok(unique)
}
