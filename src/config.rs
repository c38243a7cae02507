//! Command line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(name = "relay")]
#[command(about = "Fan requests out to agents and stream the results to an A2UI surface")]
#[command(version)]
pub struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 3000, env = "RELAY_PORT")]
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1", env = "RELAY_BIND")]
    pub bind: String,

    /// Component catalog served to every surface
    #[arg(long, default_value = "web/a2ui.catalog.json", env = "RELAY_CATALOG")]
    pub catalog: PathBuf,

    /// Data-model bindings: defaults, agents and result projections
    #[arg(long, default_value = "web/a2ui.bindings.json", env = "RELAY_BINDINGS")]
    pub bindings: PathBuf,

    /// Override an agent address, as `name=url` (repeatable)
    #[arg(long = "agent", env = "RELAY_AGENTS", value_delimiter = ',')]
    pub agents: Vec<AgentOverride>,

    /// Timeout of a single agent call, in milliseconds
    #[arg(long, default_value_t = 20_000, env = "RELAY_RPC_TIMEOUT_MS")]
    pub rpc_timeout_ms: u64,

    /// Interval between heartbeat comments on UI streams, in seconds
    #[arg(long, default_value_t = 15, env = "RELAY_HEARTBEAT_SECS")]
    pub heartbeat_secs: u64,
}

impl Cli {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let ip: IpAddr = self.bind.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

/// Replacement address for a named agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOverride {
    pub name: String,
    pub url: Url,
}

#[derive(Debug, Error, PartialEq)]
pub enum AgentOverrideError {
    #[error("expected name=url, got {0:?}")]
    MissingSeparator(String),

    #[error("agent name is empty in {0:?}")]
    EmptyName(String),

    #[error("invalid url for agent {name}: {source}")]
    InvalidUrl {
        name: String,
        source: url::ParseError,
    },
}

impl FromStr for AgentOverride {
    type Err = AgentOverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, url) = s
            .split_once('=')
            .ok_or_else(|| AgentOverrideError::MissingSeparator(s.to_string()))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AgentOverrideError::EmptyName(s.to_string()));
        }

        let url = Url::parse(url.trim()).map_err(|source| AgentOverrideError::InvalidUrl {
            name: name.to_string(),
            source,
        })?;

        Ok(AgentOverride {
            name: name.to_string(),
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["relay"]).unwrap();
        assert_eq!(cli.port, 3000);
        assert_eq!(cli.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
        assert_eq!(cli.rpc_timeout(), Duration::from_secs(20));
        assert_eq!(cli.heartbeat_interval(), Duration::from_secs(15));
        assert!(cli.agents.is_empty());
    }

    #[test]
    fn test_agent_overrides() {
        let cli = Cli::try_parse_from([
            "relay",
            "--agent",
            "weather=http://localhost:3001",
            "--agent",
            "flight=http://localhost:3002,hotel=http://localhost:3003",
        ])
        .unwrap();

        let names: Vec<&str> = cli.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["weather", "flight", "hotel"]);
        assert_eq!(cli.agents[0].url.as_str(), "http://localhost:3001/");
    }

    #[test]
    fn test_invalid_agent_override() {
        assert_eq!(
            "weather".parse::<AgentOverride>(),
            Err(AgentOverrideError::MissingSeparator("weather".to_string()))
        );
        assert_eq!(
            " =http://localhost".parse::<AgentOverride>(),
            Err(AgentOverrideError::EmptyName(" =http://localhost".to_string()))
        );
        assert!(matches!(
            "weather=not a url".parse::<AgentOverride>(),
            Err(AgentOverrideError::InvalidUrl { .. })
        ));
        assert!(Cli::try_parse_from(["relay", "--agent", "weather"]).is_err());
    }

    #[test]
    fn test_ipv6_bind() {
        let cli = Cli::try_parse_from(["relay", "--bind", "::1", "--port", "8080"]).unwrap();
        assert_eq!(cli.socket_addr().unwrap().to_string(), "[::1]:8080");
    }
}
