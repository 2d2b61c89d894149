//! Translate a predicate into a boolean SQL expression.

use query_engine_sql::sql;

use super::joins::Joins;
use crate::translation::error::Error;
use crate::translation::query::{ComparisonOperator, Predicate};

/// Translate a predicate whose paths are relative to the root of `joins`.
pub fn translate_predicate(
    joins: &mut Joins,
    predicate: &Predicate,
) -> Result<sql::ast::Expression, Error> {
    match predicate {
        Predicate::And { left, right } => Ok(sql::ast::Expression::And {
            left: Box::new(translate_predicate(joins, left)?),
            right: Box::new(translate_predicate(joins, right)?),
        }),
        Predicate::Or { left, right } => Ok(sql::ast::Expression::Or {
            left: Box::new(translate_predicate(joins, left)?),
            right: Box::new(translate_predicate(joins, right)?),
        }),
        Predicate::Not(predicate) => Ok(sql::ast::Expression::Not(Box::new(
            translate_predicate(joins, predicate)?,
        ))),
        Predicate::IsNull { path } => {
            let (column, _) = joins.column(path)?;
            Ok(sql::ast::Expression::UnaryOperation {
                expression: Box::new(column),
                operator: sql::ast::UnaryOperator::IsNull,
            })
        }
        Predicate::Compare {
            path,
            operator,
            value,
        } => {
            let (column, info) = joins.column(path)?;
            let textual = info.r#type.is_textual();
            let value = value.to_string();
            let escaped = escape_like(&value);

            let operator = match operator {
                ComparisonOperator::Equals if textual => {
                    return Ok(ilike(column, textual, escaped));
                }
                ComparisonOperator::Contains => {
                    return Ok(ilike(column, textual, format!("%{escaped}%")));
                }
                ComparisonOperator::StartsWith => {
                    return Ok(ilike(column, textual, format!("{escaped}%")));
                }
                ComparisonOperator::EndsWith => {
                    return Ok(ilike(column, textual, format!("%{escaped}")));
                }
                ComparisonOperator::Equals => sql::ast::BinaryOperator::Equals,
                ComparisonOperator::LessThan => sql::ast::BinaryOperator::LessThan,
                ComparisonOperator::LessThanOrEqualTo => {
                    sql::ast::BinaryOperator::LessThanOrEqualTo
                }
                ComparisonOperator::GreaterThan => sql::ast::BinaryOperator::GreaterThan,
                ComparisonOperator::GreaterThanOrEqualTo => {
                    sql::ast::BinaryOperator::GreaterThanOrEqualTo
                }
            };
            let value = sql::ast::Expression::Value(sql::ast::Value::String(value));
            let right = if textual {
                value
            } else {
                sql::helpers::cast(value, info.r#type.type_name())
            };
            Ok(sql::ast::Expression::BinaryOperation {
                left: Box::new(column),
                operator,
                right: Box::new(right),
            })
        }
    }
}

/// `column ILIKE pattern`, reading non-text columns as text.
fn ilike(column: sql::ast::Expression, textual: bool, pattern: String) -> sql::ast::Expression {
    let column = if textual {
        column
    } else {
        sql::helpers::cast(column, "text")
    };
    sql::ast::Expression::BinaryOperation {
        left: Box::new(column),
        operator: sql::ast::BinaryOperator::CaseInsensitiveLike,
        right: Box::new(sql::ast::Expression::Value(sql::ast::Value::String(
            pattern,
        ))),
    }
}

/// Escape the characters LIKE treats specially.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
