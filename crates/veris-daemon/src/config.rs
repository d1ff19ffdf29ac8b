//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use veris_oracle::OracleGenesis;
use veris_types::IdentityId;

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Node settings.
    #[serde(default)]
    pub node: NodeConfig,
    /// Genesis oracle parameters, used when the database is fresh.
    #[serde(default)]
    pub genesis: GenesisConfig,
}

/// Node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Genesis oracle parameters.
///
/// Only consulted when no snapshot exists yet; afterwards the persisted
/// state is authoritative and parameters change through admin operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Expected global supply across all tracked chains.
    #[serde(default = "default_expected_supply")]
    pub expected_supply: u64,
    /// Distinct matching reports required to finalize.
    #[serde(default = "default_required_signatures")]
    pub required_signatures: u32,
    /// Deviation alarm threshold in basis points.
    #[serde(default = "default_deviation_threshold_bps")]
    pub deviation_threshold_bps: u64,
    /// Hex-encoded 32-byte identity granted Admin and Emergency.
    #[serde(default)]
    pub admin_identity: String,
}

// Default value functions

fn default_log_level() -> String {
    "info".to_string()
}

fn default_expected_supply() -> u64 {
    1_000_000
}

fn default_required_signatures() -> u32 {
    1
}

fn default_deviation_threshold_bps() -> u64 {
    100
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            log_level: default_log_level(),
        }
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            expected_supply: default_expected_supply(),
            required_signatures: default_required_signatures(),
            deviation_threshold_bps: default_deviation_threshold_bps(),
            admin_identity: String::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.node.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.node.data_dir)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("VERIS_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("VERIS_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Veris")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".veris")
        }
    }
}

impl GenesisConfig {
    /// Parse the configured admin identity.
    pub fn admin(&self) -> anyhow::Result<IdentityId> {
        if self.admin_identity.is_empty() {
            anyhow::bail!("genesis.admin_identity is required for a fresh database");
        }
        let bytes = hex::decode(&self.admin_identity)?;
        IdentityId::try_from(bytes.as_slice())
            .map_err(|_| anyhow::anyhow!("admin_identity must be 32 bytes of hex"))
    }

    /// Build the oracle genesis parameters.
    pub fn to_genesis(&self) -> anyhow::Result<OracleGenesis> {
        Ok(OracleGenesis {
            expected_supply: self.expected_supply,
            required_signatures: self.required_signatures,
            deviation_threshold_bps: self.deviation_threshold_bps,
            admin: self.admin()?,
        })
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/veris"))
}
