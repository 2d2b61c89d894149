//! Common functions used across test cases.

use std::path::Path;

use labquery_configuration::environment::FixedEnvironment;
use query_engine_metadata::metadata::Metadata;
use query_engine_models::Query;
use query_engine_sql::sql;

const CONFIGURATION: &str =
    include_str!("../../../../tests/tests-common/fixtures/laboratory/configuration.json");

/// The metadata of the laboratory fixture.
pub fn metadata() -> anyhow::Result<Metadata> {
    let parsed = labquery_configuration::parse_configuration_str(
        CONFIGURATION,
        Path::new("configuration.json"),
    )?;
    let configuration = labquery_configuration::make_runtime_configuration(
        parsed,
        FixedEnvironment::from([(
            labquery_configuration::DEFAULT_CONNECTION_URI_VARIABLE.into(),
            "the translation tests do not rely on a database connection".into(),
        )]),
    )?;
    Ok(Metadata::clone(&configuration.metadata))
}

pub fn condition(
    field_path: &str,
    comparator: &str,
    value: &str,
    units: &str,
) -> serde_json::Value {
    serde_json::json!({
        "type": "query",
        "pos": "",
        "static": false,
        "fld": field_path,
        "ncmp": comparator,
        "val": value,
        "units": units
    })
}

pub fn group(combinator: &str, children: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "type": "group",
        "val": combinator,
        "static": false,
        "queryGroup": children
    })
}

/// A query holding a single search, selected.
pub fn query(format_id: &str, tree: serde_json::Value) -> anyhow::Result<Query> {
    Ok(Query::from_json(serde_json::json!({
        "selectedtemplate": format_id,
        "searches": { format_id: { "name": format_id, "tree": tree } }
    }))?)
}

/// The string parameters of a statement, in order.
pub fn params(statement: &sql::string::SQL) -> Vec<&str> {
    statement
        .params
        .iter()
        .map(|param| match param {
            sql::string::Param::String(value) => value.as_str(),
        })
        .collect()
}

/// Pretty-print a statement for failure messages.
pub fn pretty(statement: &sql::string::SQL) -> String {
    sqlformat::format(
        &statement.sql,
        &sqlformat::QueryParams::None,
        sqlformat::FormatOptions::default(),
    )
}
