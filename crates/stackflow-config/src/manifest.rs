//! スタックのマニフェスト (stack.yaml)
//!
//! ```yaml
//! resources:
//!   - type: network
//!     name: private
//!     config:
//!       name: private-net
//!       admin_state_up: "true"
//!   - type: clustering_profile
//!     name: web
//!     config:
//!       name: web
//!       spec:
//!         flavor: m1.small
//! ```

use crate::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

const DEFAULT_PROVIDER: &str = "openstack";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestResource {
    #[serde(rename = "type")]
    pub resource_type: String,

    pub name: String,

    #[serde(default = "default_provider")]
    pub provider: String,

    /// リソース種別ごとの設定 (型チェックはプロバイダ側で行う)
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl ManifestResource {
    /// `type:name`
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.name)
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// `path` はエラーメッセージ用
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: String| ConfigError::InvalidManifest {
            path: path.to_path_buf(),
            message,
        };

        let mut seen = BTreeSet::new();
        for resource in &self.resources {
            if resource.resource_type.is_empty() || resource.name.is_empty() {
                return Err(invalid("type と name は必須です".to_string()));
            }
            if !resource.config.is_object() {
                return Err(invalid(format!(
                    "{} の config はマップである必要があります",
                    resource.key()
                )));
            }
            if !seen.insert(resource.key()) {
                return Err(invalid(format!("{} が重複しています", resource.key())));
            }
        }
        Ok(())
    }
}
