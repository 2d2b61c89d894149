//! Tables joined to a root table along relationship paths.

use std::collections::BTreeMap;

use query_engine_metadata::metadata::{join_tokens, path_tokens, ColumnInfo, EntityInfo};
use query_engine_models::tree::split_field_path;
use query_engine_models::PATH_DELIMITER;
use query_engine_sql::sql;

use crate::translation::error::Error;
use crate::translation::helpers::Env;

/// How joined tables are attached to the root table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Keep root rows without related records.
    Left,
    /// Keep only root rows with related records.
    Inner,
}

/// The root table of a select and the tables joined to it so far.
///
/// Every relationship path is joined once and aliased by the path itself, so that columns of the
/// same related record are read from the same row.
#[derive(Debug)]
pub struct Joins<'a> {
    env: Env<'a>,
    kind: JoinKind,
    root_entity: String,
    root_alias: sql::ast::TableAlias,
    next_index: u64,
    tables: BTreeMap<String, (sql::ast::TableAlias, String)>,
    joins: Vec<sql::ast::Join>,
}

fn table_reference(entity: &EntityInfo) -> sql::ast::TableReference {
    sql::helpers::make_db_table(&entity.schema_name, &entity.table_name)
}

impl<'a> Joins<'a> {
    pub fn new(
        env: Env<'a>,
        root_entity: &str,
        root_alias: &str,
        kind: JoinKind,
    ) -> Result<Joins<'a>, Error> {
        env.lookup_entity(root_entity)?;
        Ok(Joins {
            env,
            kind,
            root_entity: root_entity.to_string(),
            root_alias: sql::helpers::make_table_alias(0, root_alias.to_string()),
            next_index: 1,
            tables: BTreeMap::new(),
            joins: vec![],
        })
    }

    pub fn root_alias(&self) -> &sql::ast::TableAlias {
        &self.root_alias
    }

    /// The FROM clause selecting the root table.
    pub fn from(&self) -> Result<sql::ast::From, Error> {
        let entity = self.env.lookup_entity(&self.root_entity)?;
        Ok(sql::ast::From::Table {
            reference: table_reference(entity),
            alias: self.root_alias.clone(),
        })
    }

    /// The joins added so far, in the order they must appear.
    pub fn into_joins(self) -> Vec<sql::ast::Join> {
        self.joins
    }

    /// A column, given its field path relative to the root. Joins the tables it needs.
    pub fn column(
        &mut self,
        field_path: &str,
    ) -> Result<(sql::ast::Expression, &'a ColumnInfo), Error> {
        let (relationship_path, field) = split_field_path(field_path);
        let (alias, entity_name) = self.table(relationship_path)?;
        let column = self.env.lookup_column(&entity_name, field)?;
        Ok((sql::helpers::make_column(&alias, &column.name), column))
    }

    /// The alias and entity of the table reached by a relationship path. Joins the tables it
    /// needs.
    pub fn table(
        &mut self,
        relationship_path: &str,
    ) -> Result<(sql::ast::TableAlias, String), Error> {
        let mut alias = self.root_alias.clone();
        let mut entity_name = self.root_entity.clone();
        let hops = path_tokens(relationship_path);
        for (depth, hop) in hops.iter().enumerate() {
            let path = join_tokens(hops[..=depth].iter().copied());
            if let Some((known_alias, known_entity)) = self.tables.get(&path) {
                alias = known_alias.clone();
                entity_name = known_entity.clone();
                continue;
            }
            let target_alias = self.join_hop(&alias, &entity_name, hop, &path)?;
            let target_entity = self.env.lookup_relationship(&entity_name, hop)?.target.clone();
            self.tables
                .insert(path, (target_alias.clone(), target_entity.clone()));
            alias = target_alias;
            entity_name = target_entity;
        }
        Ok((alias, entity_name))
    }

    fn make_alias(&mut self, name: String) -> sql::ast::TableAlias {
        let index = self.next_index;
        self.next_index += 1;
        sql::helpers::make_table_alias(index, name)
    }

    fn push(
        &mut self,
        reference: sql::ast::TableReference,
        alias: sql::ast::TableAlias,
        on: sql::ast::Expression,
    ) {
        let join = sql::ast::JoinOn {
            reference,
            alias,
            on,
        };
        self.joins.push(match self.kind {
            JoinKind::Left => sql::ast::Join::LeftOuterJoin(join),
            JoinKind::Inner => sql::ast::Join::InnerJoin(join),
        });
    }

    fn column_name(&self, entity_name: &str, column: &str) -> Result<String, Error> {
        Ok(self.env.lookup_column(entity_name, column)?.name.clone())
    }

    /// Join the target of one relationship hop, through its association table if it has one.
    fn join_hop(
        &mut self,
        source_alias: &sql::ast::TableAlias,
        source_entity: &str,
        hop: &str,
        path: &str,
    ) -> Result<sql::ast::TableAlias, Error> {
        let relationship = self.env.lookup_relationship(source_entity, hop)?;
        let target = self.env.lookup_entity(&relationship.target)?;
        let target_alias = self.make_alias(path.to_string());

        if let Some(through) = &relationship.through {
            let through_alias = self.make_alias(format!("{path}{PATH_DELIMITER}through"));
            let mut on_source = vec![];
            for (source_column, through_column) in &through.source_mapping {
                on_source.push(sql::helpers::equals(
                    sql::helpers::make_column(
                        source_alias,
                        &self.column_name(source_entity, source_column)?,
                    ),
                    sql::helpers::make_column(&through_alias, through_column),
                ));
            }
            let mut on_target = vec![];
            for (through_column, target_column) in &through.target_mapping {
                on_target.push(sql::helpers::equals(
                    sql::helpers::make_column(&through_alias, through_column),
                    sql::helpers::make_column(
                        &target_alias,
                        &self.column_name(&relationship.target, target_column)?,
                    ),
                ));
            }
            self.push(
                sql::helpers::make_db_table(&through.schema_name, &through.table_name),
                through_alias,
                sql::helpers::and_all(on_source),
            );
            self.push(
                table_reference(target),
                target_alias.clone(),
                sql::helpers::and_all(on_target),
            );
        } else {
            let mut on = vec![];
            for (source_column, target_column) in &relationship.column_mapping {
                on.push(sql::helpers::equals(
                    sql::helpers::make_column(
                        source_alias,
                        &self.column_name(source_entity, source_column)?,
                    ),
                    sql::helpers::make_column(
                        &target_alias,
                        &self.column_name(&relationship.target, target_column)?,
                    ),
                ));
            }
            self.push(
                table_reference(target),
                target_alias.clone(),
                sql::helpers::and_all(on),
            );
        }
        Ok(target_alias)
    }
}
