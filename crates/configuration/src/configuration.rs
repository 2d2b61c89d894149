//! The configuration used at runtime.

use std::sync::Arc;

use schemars::{gen::SchemaSettings, schema::RootSchema};

use query_engine_metadata::metadata;

use crate::values::PoolSettings;
use crate::version1::ParsedConfiguration;

/// Everything needed to serve searches.
///
/// Produced from a `ParsedConfiguration` by `make_runtime_configuration`, once secrets have been
/// resolved and the metadata has been checked. The metadata is shared by every search.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub metadata: Arc<metadata::Metadata>,
    pub pool_settings: PoolSettings,
    pub connection_uri: String,
}

/// The JSON schema of the configuration file.
pub fn configuration_jsonschema() -> RootSchema {
    SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<ParsedConfiguration>()
}
