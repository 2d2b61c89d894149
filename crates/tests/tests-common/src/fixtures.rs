//! The laboratory fixture: orders of samples taken from animals, tagged and grouped by customer.

use std::path::Path;

use labquery_configuration::environment::FixedEnvironment;
use labquery_configuration::{make_runtime_configuration, parse_configuration_str, Configuration};

use crate::memory::{Dataset, InMemoryBackend};

/// The configuration file of the fixture.
pub const LABORATORY_CONFIGURATION: &str =
    include_str!("../fixtures/laboratory/configuration.json");

/// The records of the fixture, by table.
pub const LABORATORY_DATA: &str = include_str!("../fixtures/laboratory/data.json");

/// Connection string handed to configurations that are never connected.
pub const UNUSED_CONNECTION_URI: &str = "postgresql://tests-do-not-connect";

/// Initialise test logging once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The runtime configuration of the fixture.
pub fn laboratory_configuration() -> anyhow::Result<Configuration> {
    let parsed = parse_configuration_str(
        LABORATORY_CONFIGURATION,
        Path::new("fixtures/laboratory/configuration.json"),
    )?;
    let configuration = make_runtime_configuration(
        parsed,
        FixedEnvironment::from([(
            labquery_configuration::DEFAULT_CONNECTION_URI_VARIABLE.into(),
            UNUSED_CONNECTION_URI.to_string(),
        )]),
    )?;
    Ok(configuration)
}

pub fn laboratory_dataset() -> anyhow::Result<Dataset> {
    Ok(serde_json::from_str(LABORATORY_DATA)?)
}

/// A backend holding the records of the fixture.
pub fn laboratory_backend() -> anyhow::Result<InMemoryBackend> {
    Ok(InMemoryBackend::new(laboratory_dataset()?))
}
