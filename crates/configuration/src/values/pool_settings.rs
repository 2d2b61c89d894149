use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How searches share connections to the database. Missing settings take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolSettings {
    /// Connections kept open at most
    pub max_connections: u32,
    /// Seconds a search waits for a free connection before failing
    pub pool_timeout: u64,
    /// Seconds an unused connection stays open; `null` keeps it open
    pub idle_timeout: Option<u64>,
    /// Seconds after which a connection is replaced; `null` never replaces it
    pub connection_lifetime: Option<u64>,
}

impl PoolSettings {
    pub fn is_default(&self) -> bool {
        *self == PoolSettings::default()
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout.map(Duration::from_secs)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        self.connection_lifetime.map(Duration::from_secs)
    }
}

impl Default for PoolSettings {
    fn default() -> PoolSettings {
        PoolSettings {
            max_connections: 20,
            pool_timeout: 30,
            idle_timeout: Some(180),
            connection_lifetime: Some(600),
        }
    }
}
