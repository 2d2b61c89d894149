//! Helpers for building sql::ast types in certain shapes and patterns.

use super::ast::*;

// Empty clauses //

/// An empty `WHERE` clause.
pub fn empty_where() -> Expression {
    true_expr()
}

/// An empty `GROUP BY` clause.
pub fn empty_group_by() -> GroupBy {
    GroupBy { elements: vec![] }
}

/// An empty `ORDER BY` clause.
pub fn empty_order_by() -> OrderBy {
    OrderBy { elements: vec![] }
}

/// Empty `LIMIT` and `OFFSET` clauses.
pub fn empty_limit() -> Limit {
    Limit {
        limit: None,
        offset: None,
    }
}

/// A `true` expression.
pub fn true_expr() -> Expression {
    Expression::Value(Value::Bool(true))
}

/// A `false` expression.
pub fn false_expr() -> Expression {
    Expression::Value(Value::Bool(false))
}

// Combinators //

/// `left AND right`, dropping trivially true operands.
pub fn and(left: Expression, right: Expression) -> Expression {
    if left == true_expr() {
        right
    } else if right == true_expr() {
        left
    } else {
        Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Conjunction of every expression; `true` when there are none.
pub fn and_all(expressions: impl IntoIterator<Item = Expression>) -> Expression {
    expressions.into_iter().fold(true_expr(), and)
}

/// `left = right`
pub fn equals(left: Expression, right: Expression) -> Expression {
    Expression::BinaryOperation {
        left: Box::new(left),
        operator: BinaryOperator::Equals,
        right: Box::new(right),
    }
}

/// `CAST(expression AS type)`
pub fn cast(expression: Expression, type_name: &str) -> Expression {
    Expression::Cast {
        expression: Box::new(expression),
        r#type: ScalarType(type_name.to_string()),
    }
}

// Aliasing //

/// Create table aliases using this function so we build everything in one place.
pub fn make_table_alias(unique_index: u64, name: String) -> TableAlias {
    TableAlias { unique_index, name }
}

/// Create column aliases using this function so we build everything in one place.
pub fn make_column_alias(name: String) -> ColumnAlias {
    ColumnAlias { name }
}

/// A reference to a table of the database.
pub fn make_db_table(schema: &str, table: &str) -> TableReference {
    TableReference::DBTable {
        schema: SchemaName(schema.to_string()),
        table: TableName(table.to_string()),
    }
}

/// A column of an aliased table.
pub fn make_column(alias: &TableAlias, column: &str) -> Expression {
    Expression::ColumnReference(make_column_reference(alias, column))
}

pub fn make_column_reference(alias: &TableAlias, column: &str) -> ColumnReference {
    ColumnReference::TableColumn {
        table: TableReference::AliasedTable(alias.clone()),
        name: ColumnName(column.to_string()),
    }
}

// SELECTs //

/// Build a simple select with a select list and the rest are empty.
pub fn simple_select(select_list: Vec<(ColumnAlias, Expression)>) -> Select {
    Select {
        distinct: Distinct::All,
        select_list: SelectList::SelectList(select_list),
        from: None,
        joins: vec![],
        where_: Where(empty_where()),
        group_by: empty_group_by(),
        order_by: empty_order_by(),
        limit: empty_limit(),
    }
}

/// Build a `SELECT 1` from a table and its joins.
pub fn select_one(from: From, joins: Vec<Join>, where_: Expression) -> Select {
    Select {
        distinct: Distinct::All,
        select_list: SelectList::Select1,
        from: Some(from),
        joins,
        where_: Where(where_),
        group_by: empty_group_by(),
        order_by: empty_order_by(),
        limit: empty_limit(),
    }
}

/// `SELECT COUNT(*) AS "count" FROM (inner) AS "counted"`
pub fn count_select(inner: Select) -> Select {
    let mut select = simple_select(vec![(
        make_column_alias("count".to_string()),
        Expression::Count(CountType::Star),
    )]);
    select.from = Some(From::Select {
        select: Box::new(inner),
        alias: make_table_alias(0, "counted".to_string()),
    });
    select
}
