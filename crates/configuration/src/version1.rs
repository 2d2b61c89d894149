//! Version 1 of the configuration file format.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info_span, Instrument};

use query_engine_metadata::metadata::{Entities, Formats};

use crate::configuration::configuration_jsonschema;
use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::values::{ConnectionUri, PoolSettings, Secret};

const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";
pub const DEFAULT_CONNECTION_URI_VARIABLE: &str = "LABQUERY_DATABASE_URL";

/// The configuration file: how to reach the database, and the reporting schema on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    /// Which version of the configuration format are we using
    pub version: u32,
    /// Connection string for the PostgreSQL database holding the records
    pub connection_uri: ConnectionUri,
    #[serde(skip_serializing_if = "PoolSettings::is_default")]
    #[serde(default)]
    pub pool_settings: PoolSettings,
    /// The record types and the tables they are stored in
    #[serde(default)]
    pub entities: Entities,
    /// The reporting formats, in the order they are offered
    #[serde(default)]
    pub formats: Formats,
}

impl ParsedConfiguration {
    /// A configuration without any entity or format, reading its connection string from the
    /// environment.
    pub fn initial() -> Self {
        ParsedConfiguration {
            version: CURRENT_VERSION,
            connection_uri: ConnectionUri(Secret::FromEnvironment {
                variable: DEFAULT_CONNECTION_URI_VARIABLE.to_string(),
            }),
            pool_settings: PoolSettings::default(),
            entities: Entities::empty(),
            formats: Formats::empty(),
        }
    }
}

/// Parse the contents of a configuration file. `file_path` is only used in errors.
pub fn parse_configuration_str(
    contents: &str,
    file_path: &Path,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let parsed_config: ParsedConfiguration =
        serde_json::from_str(contents).map_err(|error| ParseConfigurationError::ParseError {
            file_path: file_path.to_path_buf(),
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        })?;
    if parsed_config.version != CURRENT_VERSION {
        return Err(ParseConfigurationError::UnsupportedVersion(
            parsed_config.version,
        ));
    }
    Ok(parsed_config)
}

/// Parse the configuration format from a directory.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    async {
        let configuration_file_contents = fs::read_to_string(&configuration_file)
            .await
            .map_err(|err| {
                ParseConfigurationError::IoErrorButStringified(format!(
                    "{}: {}",
                    &configuration_file.display(),
                    err
                ))
            })?;
        parse_configuration_str(&configuration_file_contents, &configuration_file)
    }
    .instrument(info_span!(
        "Parse configuration",
        file = %configuration_file.display()
    ))
    .await
}

/// Write the parsed configuration, and the JSON schema it follows, into a directory on disk.
pub async fn write_parsed_configuration(
    parsed_config: &ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    fs::write(
        configuration_file,
        serde_json::to_string_pretty(parsed_config)? + "\n",
    )
    .await?;

    let configuration_jsonschema_file_path =
        out_dir.as_ref().join(CONFIGURATION_JSONSCHEMA_FILENAME);
    fs::write(
        &configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&configuration_jsonschema())? + "\n",
    )
    .await?;

    Ok(())
}
