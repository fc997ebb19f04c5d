//! OpenStack 接続設定
//!
//! `~/.config/stackflow/openstack.yaml` を読み込み、`OS_*` 環境変数で上書きする。

use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "openstack.yaml";
const DEFAULT_TIMEOUT_SECS: u64 = 10 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSettings {
    /// 事前に発行された Keystone トークン
    pub auth_token: Option<String>,
    pub region: Option<String>,
    pub networking_endpoint: Option<String>,
    pub clustering_endpoint: Option<String>,
    pub create_timeout_secs: u64,
    pub delete_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            auth_token: None,
            region: None,
            networking_endpoint: None,
            clustering_endpoint: None,
            create_timeout_secs: DEFAULT_TIMEOUT_SECS,
            delete_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProviderSettings {
    /// 設定ファイルのパス
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config_dir()?.join(SETTINGS_FILE))
    }

    /// 設定ファイル + 環境変数から読み込む
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// 指定したファイル (存在しなければ既定値) + 環境変数から読み込む
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::default()
        };

        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        let overrides = [
            ("OS_AUTH_TOKEN", &mut self.auth_token),
            ("OS_REGION_NAME", &mut self.region),
            ("OS_NETWORK_ENDPOINT", &mut self.networking_endpoint),
            ("OS_CLUSTERING_ENDPOINT", &mut self.clustering_endpoint),
        ];
        for (var, field) in overrides {
            match std::env::var(var) {
                Ok(value) if !value.is_empty() => *field = Some(value),
                _ => {}
            }
        }
    }

    pub fn require_token(&self) -> Result<&str> {
        self.auth_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }
}
