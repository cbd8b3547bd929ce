//! Configuration file management.
//!
//! Read from `$TESSERA_DATA_DIR/config.toml`; every section and field is
//! optional and falls back to the defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessera_ledger::AccessPolicy;
use tessera_oracle::OracleConfig;
use tessera_types::{parse_account_id, AccountId};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TESSERA_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub oracle: OracleSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Ledger access settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Owner account id, hex. Empty = the daemon's operator account.
    #[serde(default)]
    pub owner: String,
    /// Accounts allowed to record sales, hex.
    #[serde(default)]
    pub recorders: Vec<String>,
    /// Let any caller record sales.
    #[serde(default)]
    pub open_recording: bool,
}

/// Decryption oracle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSection {
    /// Baby-step table holds 2^bits points.
    #[serde(default = "default_dlog_table_bits")]
    pub dlog_table_bits: u32,
    /// Giant steps before decryption gives up. Values at or above
    /// `2^dlog_table_bits * max_giant_steps` cannot be decrypted; the
    /// defaults cover `[0, 2^32)`.
    #[serde(default = "default_max_giant_steps")]
    pub max_giant_steps: u64,
    /// How often the relay fulfils queued requests.
    #[serde(default = "default_relay_interval_ms")]
    pub relay_interval_ms: u64,
    #[serde(default = "default_signer_count")]
    pub signer_count: usize,
    #[serde(default = "default_signer_threshold")]
    pub signer_threshold: usize,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

fn default_dlog_table_bits() -> u32 {
    16
}

fn default_max_giant_steps() -> u64 {
    1 << 16
}

fn default_relay_interval_ms() -> u64 {
    500
}

fn default_signer_count() -> usize {
    3
}

fn default_signer_threshold() -> usize {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            dlog_table_bits: default_dlog_table_bits(),
            max_giant_steps: default_max_giant_steps(),
            relay_interval_ms: default_relay_interval_ms(),
            signer_count: default_signer_count(),
            signer_threshold: default_signer_threshold(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Oracle parameters.
    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            dlog_table_bits: self.oracle.dlog_table_bits,
            max_giant_steps: self.oracle.max_giant_steps,
            signer_count: self.oracle.signer_count,
            signer_threshold: self.oracle.signer_threshold,
        }
    }

    /// Build the ledger access policy. An empty owner falls back to `operator`.
    pub fn access_policy(&self, operator: AccountId) -> anyhow::Result<AccessPolicy> {
        let owner = if self.ledger.owner.is_empty() {
            operator
        } else {
            parse_account_id(&self.ledger.owner)?
        };
        let recorders = self
            .ledger
            .recorders
            .iter()
            .map(|r| parse_account_id(r))
            .collect::<Result<Vec<_>, _>>()?;
        let policy = if self.ledger.open_recording {
            AccessPolicy::open(owner)
        } else {
            AccessPolicy::new(owner)
        };
        Ok(policy.with_recorders(recorders))
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Tessera")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".tessera")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/tessera"))
}
