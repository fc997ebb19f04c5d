use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "マニフェストが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: stack.local.yaml, stack.yaml\n\
        - ./.stackflow/ ディレクトリ\n\
        または STACKFLOW_MANIFEST 環境変数で直接指定できます"
    )]
    ManifestNotFound,

    #[error("マニフェストが不正です ({path}): {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error(
        "認証トークンが設定されていません。OS_AUTH_TOKEN 環境変数か \
        ~/.config/stackflow/openstack.yaml の auth_token を設定してください"
    )]
    MissingToken,

    #[error("YAML パースエラー ({path}): {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
