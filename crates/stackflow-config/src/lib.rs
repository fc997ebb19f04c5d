pub mod error;
pub mod manifest;
pub mod settings;

pub use error::*;
pub use manifest::{Manifest, ManifestResource};
pub use settings::ProviderSettings;

use std::path::PathBuf;

/// StackFlowの設定ディレクトリ (~/.config/stackflow)
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackflow"))
}

/// プロジェクトのマニフェストファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 STACKFLOW_MANIFEST (直接パス指定)
/// 2. カレントディレクトリ: stack.local.yaml, stack.yaml
/// 3. ./.stackflow/ ディレクトリ内: 同様の順序
pub fn find_manifest() -> Result<PathBuf> {
    if let Ok(manifest_path) = std::env::var("STACKFLOW_MANIFEST") {
        let path = PathBuf::from(manifest_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = ["stack.local.yaml", "stack.yaml"];

    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let stack_dir = current_dir.join(".stackflow");
    if stack_dir.is_dir() {
        for filename in &candidates {
            let path = stack_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err(ConfigError::ManifestNotFound)
}
