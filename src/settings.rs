// src/settings.rs
//! Runtime configuration.
//!
//! Layered with the `config` crate, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. Optional `config/default.{toml,json,yaml}` file
//! 3. Environment variables prefixed `DID__`, e.g. `DID__SERVER__PORT=8080`

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
}

/// Ledger settings.
///
/// Both proofs are opaque placeholders stored in blocks as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Proof stamped on every block sealed after a state change
    pub seal_proof: u64,
    /// Proof of the genesis block
    pub genesis_proof: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub ledger: LedgerSettings,
    /// Default `env_logger` filter; `RUST_LOG` takes precedence
    pub log_level: String,
}

impl Settings {
    /// Loads settings from defaults, the optional config file and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("DID").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("ledger.seal_proof", 12345)?
            .set_default("ledger.genesis_proof", 100)?
            .set_default("log_level", "info")
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            seal_proof: 12345,
            genesis_proof: crate::blockchain::ledger::GENESIS_PROOF,
        }
    }
}
