//! Consistency checks run once, when the metadata is built.
//!
//! Query translation relies on these holding: join paths and reverse join paths must describe the
//! same tree of instances, so that any field path can be rewritten relative to any instance.

use std::collections::BTreeMap;

use thiserror::Error;

use query_engine_models::tree::split_field_path;
use query_engine_models::validation::check_has_empty_slot;
use query_engine_models::TreeError;

use super::database::{parse_ordering_field, EntityInfo, RelationshipKind};
use super::formats::{Format, ModelInstance};
use super::{path_tokens, Metadata};

/// The metadata is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("entity '{entity}': {message}")]
    InvalidEntity { entity: String, message: String },
    #[error("format '{format}' refers to unknown entity '{entity}'")]
    UnknownEntity { format: String, entity: String },
    #[error("format '{format}' must have exactly one root instance, found {count}")]
    RootInstance { format: String, count: usize },
    #[error("format '{format}', instance '{instance}': {message}")]
    InvalidJoinPath {
        format: String,
        instance: String,
        message: String,
    },
    #[error("format '{format}': instances '{first}' and '{second}' share the join path '{join_path}'")]
    AmbiguousJoinPath {
        format: String,
        first: String,
        second: String,
        join_path: String,
    },
    #[error("format '{format}', instance '{instance}', field '{field}': {message}")]
    InvalidField {
        format: String,
        instance: String,
        field: String,
        message: String,
    },
    #[error("format '{format}': invalid default tree: {source}")]
    InvalidDefaultTree { format: String, source: TreeError },
    #[error("format '{format}': {message}")]
    InvalidFormat { format: String, message: String },
}

impl Metadata {
    /// Check the consistency of every entity and format.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (entity_name, entity) in &self.entities.0 {
            self.validate_entity(entity_name, entity)?;
        }
        for (format_id, format) in &self.formats.0 {
            self.validate_format(format_id, format)?;
        }
        Ok(())
    }

    fn validate_entity(
        &self,
        entity_name: &str,
        entity: &EntityInfo,
    ) -> Result<(), ValidationError> {
        let invalid = |message: String| ValidationError::InvalidEntity {
            entity: entity_name.to_string(),
            message,
        };
        if entity.primary_key_column().is_none() {
            return Err(invalid(format!(
                "primary key '{}' is not a column",
                entity.primary_key
            )));
        }
        for (relationship_name, relationship) in &entity.relationships {
            let target = self.entity(&relationship.target).ok_or_else(|| {
                invalid(format!(
                    "relationship '{relationship_name}' targets unknown entity '{}'",
                    relationship.target
                ))
            })?;
            match (&relationship.kind, &relationship.through) {
                (RelationshipKind::ManyToMany, None) => {
                    return Err(invalid(format!(
                        "many-to-many relationship '{relationship_name}' has no through table"
                    )))
                }
                (RelationshipKind::ManyToMany, Some(through)) => {
                    if through.source_mapping.keys().any(|c| !entity.columns.contains_key(c))
                        || through.target_mapping.values().any(|c| !target.columns.contains_key(c))
                        || through.source_mapping.is_empty()
                        || through.target_mapping.is_empty()
                    {
                        return Err(invalid(format!(
                            "relationship '{relationship_name}' has an invalid through table mapping"
                        )));
                    }
                }
                (_, _) => {
                    if relationship.column_mapping.is_empty()
                        || relationship.column_mapping.iter().any(|(source, target_column)| {
                            !entity.columns.contains_key(source)
                                || !target.columns.contains_key(target_column)
                        })
                    {
                        return Err(invalid(format!(
                            "relationship '{relationship_name}' has an invalid column mapping"
                        )));
                    }
                }
            }
        }
        for entry in &entity.ordering {
            let ordering = parse_ordering_field(entry);
            let is_column = entity.column(ordering.field).is_some();
            let is_foreign_key = entity
                .relationships
                .get(ordering.field)
                .is_some_and(|r| r.kind == RelationshipKind::ForeignKey);
            if !is_column && !is_foreign_key {
                return Err(invalid(format!(
                    "ordering field '{}' is neither a column nor a foreign key",
                    ordering.field
                )));
            }
        }
        Ok(())
    }

    /// Follow relationship hops from an entity, returning the entity reached.
    fn walk<'a>(&'a self, from_entity: &'a str, path: &str) -> Result<&'a str, String> {
        let mut current = from_entity;
        for hop in path_tokens(path) {
            let entity = self
                .entity(current)
                .ok_or_else(|| format!("unknown entity '{current}'"))?;
            let relationship = entity
                .relationships
                .get(hop)
                .ok_or_else(|| format!("entity '{current}' has no relationship '{hop}'"))?;
            current = relationship.target.as_str();
        }
        Ok(current)
    }

    fn validate_format(&self, format_id: &str, format: &Format) -> Result<(), ValidationError> {
        if self.entity(&format.root_entity).is_none() {
            return Err(ValidationError::UnknownEntity {
                format: format_id.to_string(),
                entity: format.root_entity.clone(),
            });
        }

        let roots = format
            .model_instances
            .values()
            .filter(|instance| instance.join_path.is_empty())
            .count();
        if roots != 1 {
            return Err(ValidationError::RootInstance {
                format: format_id.to_string(),
                count: roots,
            });
        }

        let mut join_paths: BTreeMap<&str, &str> = BTreeMap::new();
        for (instance_name, instance) in &format.model_instances {
            if let Some(first) =
                join_paths.insert(instance.join_path.as_str(), instance_name.as_str())
            {
                return Err(ValidationError::AmbiguousJoinPath {
                    format: format_id.to_string(),
                    first: first.to_string(),
                    second: instance_name.clone(),
                    join_path: instance.join_path.clone(),
                });
            }
            self.validate_instance(format_id, format, instance_name, instance)?;
        }

        // a child reached by walking straight back over the parent's reverse hop would make the
        // instances a graph rather than a tree
        for (instance_name, instance) in &format.model_instances {
            if let Some(back) = path_tokens(&instance.reverse_join_path).first() {
                let looping = format!(
                    "{}{}{back}",
                    instance.join_path,
                    query_engine_models::PATH_DELIMITER
                );
                if join_paths.contains_key(looping.as_str()) {
                    return Err(ValidationError::InvalidJoinPath {
                        format: format_id.to_string(),
                        instance: instance_name.clone(),
                        message: format!("join path '{looping}' leads back to the root"),
                    });
                }
            }
        }

        let default_tree = format.default_tree();
        check_has_empty_slot(&default_tree).map_err(|source| ValidationError::InvalidDefaultTree {
            format: format_id.to_string(),
            source,
        })?;
        for condition in default_tree.conditions() {
            let (instance_path, field_name) = condition.split_path();
            let resolved = format
                .instance_by_join_path(instance_path)
                .and_then(|(_, instance)| instance.fields.get(field_name));
            match resolved {
                None => {
                    return Err(ValidationError::InvalidFormat {
                        format: format_id.to_string(),
                        message: format!(
                            "default tree field '{}' is not a field of the format",
                            condition.field_path
                        ),
                    })
                }
                Some(meta) if !meta.units_spec().is_selectable(&condition.units) => {
                    return Err(ValidationError::InvalidFormat {
                        format: format_id.to_string(),
                        message: format!(
                            "default tree field '{}' does not accept units '{}'",
                            condition.field_path, condition.units
                        ),
                    })
                }
                Some(_) => {}
            }
        }

        for (stat_name, dimension) in &format.stats {
            for field_path in &dimension.fields {
                let (instance_path, field_name) = split_field_path(field_path);
                if format
                    .instance_by_join_path(instance_path)
                    .and_then(|(_, instance)| self.entity(&instance.entity))
                    .and_then(|entity| entity.column(field_name))
                    .is_none()
                {
                    return Err(ValidationError::InvalidFormat {
                        format: format_id.to_string(),
                        message: format!(
                            "stat '{stat_name}' field '{field_path}' does not resolve"
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_instance(
        &self,
        format_id: &str,
        format: &Format,
        instance_name: &str,
        instance: &ModelInstance,
    ) -> Result<(), ValidationError> {
        let invalid_join = |message: String| ValidationError::InvalidJoinPath {
            format: format_id.to_string(),
            instance: instance_name.to_string(),
            message,
        };

        let entity = self
            .entity(&instance.entity)
            .ok_or_else(|| ValidationError::UnknownEntity {
                format: format_id.to_string(),
                entity: instance.entity.clone(),
            })?;

        let reached = self.walk(&format.root_entity, &instance.join_path).map_err(invalid_join)?;
        if reached != instance.entity {
            return Err(invalid_join(format!(
                "join path '{}' reaches '{reached}' instead of '{}'",
                instance.join_path, instance.entity
            )));
        }
        let back = self
            .walk(&instance.entity, &instance.reverse_join_path)
            .map_err(invalid_join)?;
        if back != format.root_entity {
            return Err(invalid_join(format!(
                "reverse join path '{}' reaches '{back}' instead of '{}'",
                instance.reverse_join_path, format.root_entity
            )));
        }
        if path_tokens(&instance.join_path).len() != path_tokens(&instance.reverse_join_path).len()
        {
            return Err(invalid_join(format!(
                "join path '{}' and reverse join path '{}' differ in length",
                instance.join_path, instance.reverse_join_path
            )));
        }

        if let Some(distinct_fields) = &instance.distinct_fields {
            for field in distinct_fields {
                let first = path_tokens(field).first().copied().unwrap_or_default();
                if entity.column(first).is_none() && !entity.relationships.contains_key(first) {
                    return Err(invalid_join(format!("distinct field '{field}' does not resolve")));
                }
            }
        }

        for (field_name, meta) in &instance.fields {
            let invalid_field = |message: String| ValidationError::InvalidField {
                format: format_id.to_string(),
                instance: instance_name.to_string(),
                field: field_name.clone(),
                message,
            };
            if entity.column(field_name).is_none() {
                return Err(invalid_field(format!(
                    "not a column of entity '{}'",
                    instance.entity
                )));
            }
            if meta.searchable && !meta.displayed {
                let handoff = meta.handoff_field.as_ref().ok_or_else(|| {
                    invalid_field(
                        "searchable but not displayed, and has no handoff field".to_string(),
                    )
                })?;
                match instance.fields.get(handoff) {
                    Some(target) if target.displayed => {}
                    _ => {
                        return Err(invalid_field(format!(
                            "handoff field '{handoff}' is not a displayed field of the instance"
                        )))
                    }
                }
            }
            if let Some(units) = &meta.units {
                if !units.family.contains(&units.default) {
                    return Err(invalid_field(format!(
                        "default unit '{}' is not part of {:?}",
                        units.default, units.family
                    )));
                }
                if let Some(selectable) = &units.selectable {
                    if let Some(unit) = selectable.iter().find(|u| !units.family.contains(u)) {
                        return Err(invalid_field(format!(
                            "selectable unit '{unit}' is not part of {:?}",
                            units.family
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
