pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratus_cloud::PollConfig;

const CONFIG_ENV: &str = "STRATUS_CONFIG_PATH";
const REGION_ENV: &str = "STRATUS_REGION";
const PROFILE_ENV: &str = "STRATUS_PROFILE";
const CANDIDATES: [&str; 2] = ["stratus.local.yaml", "stratus.yaml"];

/// Runtime configuration for resource reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StratusConfig {
    /// AWS region for the API clients (falls back to the SDK's own resolution)
    pub region: Option<String>,

    /// Named credentials profile
    pub profile: Option<String>,

    /// Bounds for long-running lifecycle operations
    pub timeouts: Timeouts,

    /// Backoff for status polling
    pub poll: PollConfig,
}

/// Per-operation timeouts, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub create_secs: u64,
    pub update_secs: u64,
    pub delete_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        // 30 minutes
        Self {
            create_secs: 1800,
            update_secs: 1800,
            delete_secs: 1800,
        }
    }
}

impl Timeouts {
    pub fn create(&self) -> Duration {
        Duration::from_secs(self.create_secs)
    }

    pub fn update(&self) -> Duration {
        Duration::from_secs(self.update_secs)
    }

    pub fn delete(&self) -> Duration {
        Duration::from_secs(self.delete_secs)
    }
}

impl StratusConfig {
    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: StratusConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load the discovered config file, or defaults when there is none
    ///
    /// Environment overrides are applied in both cases.
    pub fn load_or_default() -> Result<Self> {
        let mut config = match find_config_file() {
            Ok(path) => Self::load(path)?,
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override region and profile from `STRATUS_REGION` / `STRATUS_PROFILE`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(region) = std::env::var(REGION_ENV) {
            self.region = Some(region);
        }
        if let Ok(profile) = std::env::var(PROFILE_ENV) {
            self.profile = Some(profile);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.poll.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "poll.multiplier must be at least 1.0 (got {})",
                self.poll.multiplier
            )));
        }
        if self.poll.initial_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll.initial_delay_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// グローバル設定ファイルのパス (~/.config/stratus/stratus.yaml)
///
/// 存在確認もディレクトリ作成もしない
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stratus").join("stratus.yaml"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 STRATUS_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: stratus.local.yaml, stratus.yaml
/// 3. ./.stratus/ ディレクトリ内: 同様の順序
/// 4. ~/.config/stratus/stratus.yaml (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.stratus/ ディレクトリで検索
    let stratus_dir = current_dir.join(".stratus");
    if stratus_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = stratus_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル
    if let Some(global_config) = global_config_path() {
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}
