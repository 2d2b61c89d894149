//! Helpers for looking things up in the metadata while translating.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::{
    self, path_tokens, ColumnInfo, EntityInfo, FieldMeta, Format, ModelInstance, Relationship,
};

use super::error::Error;
use super::query::reroot;

/// Static information from the metadata.
#[derive(Debug, Clone, Copy)]
pub struct Env<'a> {
    metadata: &'a metadata::Metadata,
}

impl<'a> Env<'a> {
    pub fn new(metadata: &'a metadata::Metadata) -> Env<'a> {
        Env { metadata }
    }

    pub fn metadata(&self) -> &'a metadata::Metadata {
        self.metadata
    }

    /// Lookup a format in the metadata.
    pub fn lookup_format(&self, format_id: &str) -> Result<&'a Format, Error> {
        self.metadata
            .format(format_id)
            .ok_or_else(|| Error::UnknownFormat(format_id.to_string()))
    }

    /// Lookup an entity in the metadata.
    pub fn lookup_entity(&self, entity_name: &str) -> Result<&'a EntityInfo, Error> {
        self.metadata
            .entity(entity_name)
            .ok_or_else(|| Error::UnknownEntity(entity_name.to_string()))
    }

    /// Lookup a relationship of an entity.
    pub fn lookup_relationship(
        &self,
        entity_name: &str,
        relationship_name: &str,
    ) -> Result<&'a Relationship, Error> {
        self.lookup_entity(entity_name)?
            .relationships
            .get(relationship_name)
            .ok_or_else(|| Error::UnknownRelationship {
                entity: entity_name.to_string(),
                relationship: relationship_name.to_string(),
            })
    }

    /// Lookup a column of an entity, resolving the `pk` alias.
    pub fn lookup_column(&self, entity_name: &str, field: &str) -> Result<&'a ColumnInfo, Error> {
        self.lookup_entity(entity_name)?
            .column(field)
            .ok_or_else(|| Error::UnknownColumn {
                entity: entity_name.to_string(),
                column: field.to_string(),
            })
    }

    /// Follow relationship hops from an entity, returning the name of the entity reached.
    pub fn walk<'b>(&self, from_entity: &'b str, relationship_path: &str) -> Result<&'b str, Error>
    where
        'a: 'b,
    {
        let mut current = from_entity;
        for hop in path_tokens(relationship_path) {
            current = self.lookup_relationship(current, hop)?.target.as_str();
        }
        Ok(current)
    }

    /// Does any hop along the path fan out to several records?
    pub fn crosses_many(&self, from_entity: &str, relationship_path: &str) -> Result<bool, Error> {
        let mut current: &str = from_entity;
        let mut many = false;
        for hop in path_tokens(relationship_path) {
            let relationship = self.lookup_relationship(current, hop)?;
            many |= relationship.is_many();
            current = relationship.target.as_str();
        }
        Ok(many)
    }
}

/// A searchable field as seen from some root instance of a format.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry<'a> {
    pub instance_name: &'a str,
    pub instance: &'a ModelInstance,
    pub field_name: &'a str,
    pub meta: &'a FieldMeta,
}

/// The fields of a format, keyed by their path relative to one of its instances.
#[derive(Debug, Clone)]
pub struct FieldCatalog<'a> {
    format_id: String,
    root_instance: &'a str,
    entries: BTreeMap<String, CatalogEntry<'a>>,
}

impl<'a> FieldCatalog<'a> {
    /// The catalog of a format, with paths relative to its root instance.
    pub fn new(format_id: &str, format: &'a Format) -> Result<FieldCatalog<'a>, Error> {
        let (root_instance, _) = format.root_instance().ok_or_else(|| Error::UnknownInstance {
            format: format_id.to_string(),
            instance: String::new(),
        })?;
        Self::rooted_at(format_id, format, root_instance)
    }

    /// The catalog of a format, with paths relative to `root_instance`.
    pub fn rooted_at(
        format_id: &str,
        format: &'a Format,
        root_instance: &str,
    ) -> Result<FieldCatalog<'a>, Error> {
        let (root_instance, _) = format
            .model_instances
            .get_key_value(root_instance)
            .ok_or_else(|| Error::UnknownInstance {
                format: format_id.to_string(),
                instance: root_instance.to_string(),
            })?;

        let instance_paths = reroot::instance_paths(format_id, format, root_instance)?;
        let mut entries = BTreeMap::new();
        for (instance_path, instance_name) in instance_paths {
            let instance = &format.model_instances[instance_name];
            for (field_name, meta) in &instance.fields {
                entries.insert(
                    metadata::join_tokens([instance_path.as_str(), field_name.as_str()]),
                    CatalogEntry {
                        instance_name,
                        instance,
                        field_name,
                        meta,
                    },
                );
            }
        }
        Ok(FieldCatalog {
            format_id: format_id.to_string(),
            root_instance,
            entries,
        })
    }

    pub fn format_id(&self) -> &str {
        &self.format_id
    }

    /// The instance paths are relative to.
    pub fn root_instance(&self) -> &'a str {
        self.root_instance
    }

    /// Lookup a field by its path.
    pub fn lookup(&self, field_path: &str) -> Result<&CatalogEntry<'a>, Error> {
        self.entries
            .get(field_path)
            .ok_or_else(|| Error::UnknownField {
                format: self.format_id.clone(),
                path: field_path.to_string(),
            })
    }

    /// Every field path, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
