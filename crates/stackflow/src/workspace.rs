use anyhow::Context;
use colored::Colorize;
use stackflow_cloud::{
    ActionType, ApplyResult, GlobalState, Plan, ProviderState, ResourceConfig, ResourceSet,
    StateLock, StateManager, Timeouts,
};
use stackflow_cloud_openstack::{ClientConfig, OpenStackClient, OpenStackProvider, PROVIDER_NAME};
use stackflow_config::{Manifest, ProviderSettings};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// マニフェストとプロジェクトルート
pub struct Workspace {
    pub root: PathBuf,
    pub manifest_path: PathBuf,
    pub desired: ResourceSet,
}

impl Workspace {
    pub fn load() -> anyhow::Result<Self> {
        let manifest_path = stackflow_config::find_manifest()?;
        let manifest = Manifest::load(&manifest_path)?;

        let mut desired = ResourceSet::new();
        for resource in manifest.resources {
            desired.add(ResourceConfig::new(
                resource.resource_type,
                resource.name,
                resource.provider,
                resource.config,
            ));
        }

        tracing::debug!(
            manifest = %manifest_path.display(),
            resources = desired.len(),
            "Loaded manifest"
        );

        Ok(Self {
            root: project_root_of(&manifest_path)?,
            manifest_path,
            desired,
        })
    }

    pub fn print_header(&self) {
        println!(
            "マニフェスト: {}",
            self.manifest_path.display().to_string().cyan()
        );
    }
}

/// マニフェストの置き場所からプロジェクトルートを決める (.stackflow/ 内ならその親)
fn project_root_of(manifest_path: &Path) -> anyhow::Result<PathBuf> {
    let dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let dir = if dir.as_os_str().is_empty() {
        std::env::current_dir()?
    } else {
        dir
    };

    if dir.file_name().is_some_and(|n| n == ".stackflow") {
        if let Some(parent) = dir.parent() {
            return Ok(parent.to_path_buf());
        }
    }
    Ok(dir)
}

/// マニフェストがあればそのルート、なければカレントディレクトリ
pub fn project_root() -> anyhow::Result<PathBuf> {
    match stackflow_config::find_manifest() {
        Ok(path) => project_root_of(&path),
        Err(_) => Ok(std::env::current_dir()?),
    }
}

/// 設定ファイルと環境変数から OpenStack プロバイダを組み立てる
pub fn build_provider() -> anyhow::Result<OpenStackProvider> {
    let settings = ProviderSettings::load()?;
    let token = settings.require_token()?.to_string();

    let client = OpenStackClient::new(ClientConfig {
        auth_token: token,
        networking_endpoint: settings.networking_endpoint.clone(),
        clustering_endpoint: settings.clustering_endpoint.clone(),
    })
    .context("OpenStack クライアントの初期化に失敗しました")?;

    let timeouts = Timeouts {
        create: Duration::from_secs(settings.create_timeout_secs),
        delete: Duration::from_secs(settings.delete_timeout_secs),
        ..Default::default()
    };

    Ok(OpenStackProvider::new(client, settings.region, timeouts))
}

/// ロックを保持した状態ファイルの読み書き
pub struct StateSession {
    manager: StateManager,
    lock: StateLock,
    global: GlobalState,
}

impl StateSession {
    pub async fn open(root: &Path) -> anyhow::Result<Self> {
        let manager = StateManager::new(root);
        let lock = manager
            .acquire_lock()
            .await
            .context("状態ファイルのロックを取得できませんでした")?;
        let global = manager.load().await?;
        Ok(Self {
            manager,
            lock,
            global,
        })
    }

    pub fn provider_state(&self) -> ProviderState {
        self.global.provider_state(PROVIDER_NAME)
    }

    /// 状態を書き戻してロックを解放
    pub async fn commit(mut self, state: ProviderState) -> anyhow::Result<()> {
        self.global.set_provider_state(PROVIDER_NAME, state);
        self.manager.save(&self.global).await?;
        self.lock.release().await?;
        Ok(())
    }

    /// 書き戻さずにロックを解放
    pub async fn close(self) -> anyhow::Result<()> {
        self.lock.release().await?;
        Ok(())
    }
}

pub fn print_plan(plan: &Plan) {
    if !plan.has_changes() {
        println!("{}", "✓ 変更はありません。".green());
        return;
    }

    println!("{}", "実行計画:".bold());
    for action in plan.changes() {
        let line = action.describe();
        let line = match action.action_type {
            ActionType::Create => format!("  + {}", line).green(),
            ActionType::Update => format!("  ~ {}", line).yellow(),
            ActionType::Replace => format!("-/+ {}", line).magenta(),
            ActionType::Delete => format!("  - {}", line).red(),
            ActionType::NoOp => format!("    {}", line).dimmed(),
        };
        println!("{}", line);
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

/// 結果を表示し、失敗があればエラーにする
pub fn report(result: &ApplyResult) -> anyhow::Result<()> {
    for ok in &result.succeeded {
        println!("  {} {}: {}", "✓".green(), ok.resource_key.cyan(), ok.message);
    }
    for failed in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failed.resource_key.cyan(),
            failed.error.as_deref().unwrap_or("")
        );
    }
    println!();
    println!(
        "完了: 成功 {} 件, 失敗 {} 件 ({} ms)",
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms
    );

    if result.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} 件の操作が失敗しました", result.failed.len()))
    }
}
