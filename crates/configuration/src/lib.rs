//! The configuration of a labquery deployment: where the database is, and the reporting schema
//! served on top of it.

pub mod configuration;
pub mod environment;
pub mod error;
pub mod to_runtime_configuration;
pub mod values;
pub mod version1;

pub use configuration::Configuration;
pub use to_runtime_configuration::{make_runtime_configuration, runtime_metadata};
pub use values::{ConnectionUri, PoolSettings, Secret};
pub use version1::{
    parse_configuration, parse_configuration_str, write_parsed_configuration, ParsedConfiguration,
    CONFIGURATION_FILENAME, CONFIGURATION_JSONSCHEMA_FILENAME, DEFAULT_CONNECTION_URI_VARIABLE,
};
