//! Compile a query tree into a predicate.

use query_engine_models::{Combinator, Condition, Group, Node};

use super::predicate::{ComparisonOperator, Predicate};
use super::units;
use crate::translation::error::Error;
use crate::translation::helpers::FieldCatalog;

/// Compile a tree whose paths are relative to the catalog's root.
///
/// A group without children matches nothing in particular and compiles to `None`, which makes
/// every group containing it `None` as well.
pub fn compile(node: &Node, catalog: &FieldCatalog) -> Result<Option<Predicate>, Error> {
    match node {
        Node::Group(group) => compile_group(group, catalog),
        Node::Condition(condition) => compile_condition(condition, catalog).map(Some),
    }
}

fn compile_group(group: &Group, catalog: &FieldCatalog) -> Result<Option<Predicate>, Error> {
    let combine: fn(Predicate, Predicate) -> Predicate = match group.combinator {
        Combinator::All => Predicate::and,
        Combinator::Any => Predicate::or,
    };
    let mut compiled: Option<Predicate> = None;
    for child in &group.children {
        let Some(predicate) = compile(child, catalog)? else {
            return Ok(None);
        };
        compiled = Some(match compiled {
            None => predicate,
            Some(left) => combine(left, predicate),
        });
    }
    Ok(compiled)
}

fn compile_condition(condition: &Condition, catalog: &FieldCatalog) -> Result<Predicate, Error> {
    let path = condition.field_path.as_str();
    let entry = catalog.lookup(path)?;
    if !entry.meta.searchable {
        return Err(Error::FieldNotSearchable {
            path: path.to_string(),
        });
    }
    let base = condition.comparator.base;
    if !entry.meta.r#type.comparators().contains(&base) {
        return Err(Error::ComparatorNotSupported {
            path: path.to_string(),
            comparator: condition.comparator.name(),
        });
    }

    let predicate = match ComparisonOperator::from_base(base) {
        // null checks ignore the value and its units
        None => Predicate::IsNull {
            path: path.to_string(),
        },
        Some(operator) => Predicate::Compare {
            path: path.to_string(),
            operator,
            value: units::convert(catalog, path, &condition.units, &condition.value)?,
        },
    };
    Ok(if condition.comparator.negated {
        Predicate::negate(predicate)
    } else {
        predicate
    })
}
