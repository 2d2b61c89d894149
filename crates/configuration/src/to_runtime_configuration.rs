//! Convert a parsed configuration into the configuration used at runtime.

use std::sync::Arc;

use query_engine_metadata::metadata;

use crate::configuration::Configuration;
use crate::environment::Environment;
use crate::error::MakeRuntimeConfigurationError;
use crate::version1::ParsedConfiguration;

/// Resolve the secrets of a parsed configuration and check its metadata.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let connection_uri = parsed_config
        .connection_uri
        .0
        .resolve(&environment)
        .map_err(|error| MakeRuntimeConfigurationError::Secret {
            path: "connectionUri".to_string(),
            error,
        })?;

    let metadata = runtime_metadata(&parsed_config)?;

    Ok(Configuration {
        metadata: Arc::new(metadata),
        pool_settings: parsed_config.pool_settings,
        connection_uri,
    })
}

/// Check the metadata of a parsed configuration, without resolving any secret.
pub fn runtime_metadata(
    parsed_config: &ParsedConfiguration,
) -> Result<metadata::Metadata, MakeRuntimeConfigurationError> {
    let metadata = metadata::Metadata {
        entities: parsed_config.entities.clone(),
        formats: parsed_config.formats.clone(),
    };
    metadata.validate()?;
    tracing::debug!(
        entities = metadata.entities.0.len(),
        formats = metadata.formats.0.len(),
        "metadata validated"
    );
    Ok(metadata)
}
