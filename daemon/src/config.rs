//! Daemon configuration with TOML file support.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use subledger_types::{AccountId, Amount, SubscriptionPeriod};
use subledger_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid [ledger] section: {0}")]
    Ledger(String),
}

/// Configuration for the subledger daemon.
///
/// Loaded from a TOML file via [`DaemonConfig::from_toml_file`]; every field has a
/// default, so an empty file is valid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Address the RPC server binds to.
    #[serde(default = "default_rpc_bind")]
    pub rpc_bind: String,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ledger parameters used by `subledger init`.
    #[serde(default)]
    pub ledger: Option<LedgerSection>,
}

/// The `[ledger]` table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerSection {
    pub period: Option<SubscriptionPeriod>,
    /// Decimal string; TOML integers cannot hold the full amount range.
    pub period_cost: Option<String>,
    pub owner: Option<String>,
}

/// Fully resolved ledger parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerParams {
    pub period: SubscriptionPeriod,
    pub period_cost: Amount,
    pub owner: AccountId,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./subledger_data")
}

fn default_map_size_mb() -> usize {
    1024
}

fn default_rpc_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    7090
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// LMDB map size in bytes.
    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    /// Merge the `[ledger]` table with command-line overrides.
    ///
    /// The period defaults to weekly; cost and owner have no default.
    pub fn ledger_params(&self, overrides: &LedgerSection) -> Result<LedgerParams, ConfigError> {
        let file = self.ledger.clone().unwrap_or_default();

        let period = overrides
            .period
            .or(file.period)
            .unwrap_or(SubscriptionPeriod::Weekly);

        let period_cost = overrides
            .period_cost
            .as_ref()
            .or(file.period_cost.as_ref())
            .ok_or_else(|| ConfigError::Ledger("period_cost is required".to_string()))?
            .parse::<Amount>()
            .map_err(|e| ConfigError::Ledger(format!("period_cost: {e}")))?;

        let owner = overrides
            .owner
            .as_ref()
            .or(file.owner.as_ref())
            .ok_or_else(|| ConfigError::Ledger("owner is required".to_string()))?;
        let owner = AccountId::parse(owner.as_str())
            .map_err(|e| ConfigError::Ledger(format!("owner: {e}")))?;

        Ok(LedgerParams {
            period,
            period_cost,
            owner,
        })
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            rpc_bind: default_rpc_bind(),
            rpc_port: default_rpc_port(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            ledger: None,
        }
    }
}
