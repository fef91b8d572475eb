use crate::{env_required, ConfigError, FromEnv};

/// NATS connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NatsConfig {
    /// Seed servers, e.g. `nats://localhost:4222`
    pub servers: Vec<String>,
}

impl NatsConfig {
    pub fn new(servers: Vec<String>) -> Self {
        Self { servers }
    }

    /// Split a comma separated server list, dropping blanks
    pub fn parse_servers(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl FromEnv for NatsConfig {
    /// Requires NATS_SERVERS (comma separated, at least one entry).
    /// NATS_SERVER_URL is read when NATS_SERVERS is unset.
    fn from_env() -> Result<Self, ConfigError> {
        let raw = env_required("NATS_SERVERS")
            .or_else(|err| env_required("NATS_SERVER_URL").map_err(|_| err))?;
        let servers = Self::parse_servers(&raw);

        if servers.is_empty() {
            return Err(ConfigError::ParseError {
                key: "NATS_SERVERS".to_string(),
                details: "expected at least one server URL".to_string(),
            });
        }

        Ok(Self { servers })
    }
}
