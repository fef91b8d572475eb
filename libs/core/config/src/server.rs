use crate::{env_or_default, env_required_parse, ConfigError, FromEnv};
use std::net::Ipv4Addr;

/// Listener configuration for the service's HTTP health endpoint
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// - PORT: required
    /// - HOST: defaults to 0.0.0.0
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_required_parse("PORT")?;

        Ok(Self { host, port })
    }
}
