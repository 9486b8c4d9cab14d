//! Client configuration.
//!
//! Values come from the process environment (optionally seeded from a `.env`
//! file). Everything has a default that works against a local validator.

use std::time::Duration;

use chain_sol::{Address, InstructionCatalog};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const DEFAULT_RPC_PORT: u16 = 8899;

/// Commitment level sent with every RPC request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl std::str::FromStr for Commitment {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(ClientError::Config(format!("unknown commitment {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// JSON-RPC endpoint of the node.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Per-request HTTP timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long to wait for a submitted transaction to be confirmed.
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,

    /// Fixed delay between status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for the ledger to reach a target slot.
    #[serde(default = "default_slot_timeout_ms")]
    pub slot_timeout_ms: u64,

    #[serde(default)]
    pub commitment: Commitment,
}

fn default_rpc_url() -> String {
    format!("http://127.0.0.1:{DEFAULT_RPC_PORT}")
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_confirm_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_slot_timeout_ms() -> u64 {
    5_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            rpc_url: default_rpc_url(),
            request_timeout_ms: default_request_timeout_ms(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            slot_timeout_ms: default_slot_timeout_ms(),
            commitment: Commitment::default(),
        }
    }
}

impl ClientConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// `SOLANA_RPC_URL` wins over `SOLANA_HOST`, which expands to
    /// `http://{host}:8899`. Timeouts are read in milliseconds.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ClientConfig::default();

        let rpc_url = match (lookup("SOLANA_RPC_URL"), lookup("SOLANA_HOST")) {
            (Some(url), _) if !url.trim().is_empty() => url.trim().to_string(),
            (_, Some(host)) if !host.trim().is_empty() => {
                format!("http://{}:{DEFAULT_RPC_PORT}", host.trim())
            }
            _ => defaults.rpc_url,
        };

        let millis = |key: &str, default: u64| -> Result<u64, ClientError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ClientError::Config(format!("{key} must be a whole number of milliseconds, got {raw:?}"))
                }),
            }
        };

        let commitment = match lookup("SOLANA_COMMITMENT") {
            Some(raw) => raw.trim().parse()?,
            None => defaults.commitment,
        };

        let config = ClientConfig {
            rpc_url,
            request_timeout_ms: millis("SOLANA_REQUEST_TIMEOUT_MS", defaults.request_timeout_ms)?,
            confirm_timeout_ms: millis("SOLANA_CONFIRM_TIMEOUT_MS", defaults.confirm_timeout_ms)?,
            poll_interval_ms: millis("SOLANA_POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
            slot_timeout_ms: millis("SOLANA_SLOT_TIMEOUT_MS", defaults.slot_timeout_ms)?,
            commitment,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "rpc url must be http(s), got {:?}",
                self.rpc_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::Config("poll interval must be non-zero".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn slot_timeout(&self) -> Duration {
        Duration::from_millis(self.slot_timeout_ms)
    }
}

/// Deployed addresses of the three programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub counter: Address,
    pub round: Address,
    pub username: Address,
}

impl ProgramIds {
    pub fn from_env(catalog: &InstructionCatalog) -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(catalog, |key| std::env::var(key).ok())
    }

    /// Read `{program}_PROGRAM_ID` for each program, falling back to the
    /// address its definitions declare.
    pub fn from_lookup<F>(catalog: &InstructionCatalog, lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |program: &str| -> Result<Address, ClientError> {
            let key = format!("{program}_PROGRAM_ID");
            if let Some(raw) = lookup(&key) {
                return raw
                    .trim()
                    .parse()
                    .map_err(|e| ClientError::Config(format!("{key}: {e}")));
            }
            catalog.program_address(program)?.ok_or_else(|| {
                ClientError::Config(format!("{key} is not set and {program} declares no address"))
            })
        };

        Ok(ProgramIds {
            counter: resolve("counter")?,
            round: resolve("round")?,
            username: resolve("username")?,
        })
    }
}
