use crate::workspace::{self, StateSession};
use colored::Colorize;
use stackflow_cloud::{ApplyResult, CloudProvider};

pub async fn handle(resource: Option<String>, yes: bool) -> anyhow::Result<()> {
    let root = workspace::project_root()?;

    let provider = workspace::build_provider()?;
    let session = StateSession::open(&root).await?;
    let mut state = session.provider_state();

    let targets: Vec<String> = match &resource {
        Some(key) => {
            if state.get(key).is_none() {
                session.close().await?;
                return Err(anyhow::anyhow!(
                    "リソース '{}' は管理されていません。\n管理中のリソース: {}",
                    key,
                    state.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(", ")
                ));
            }
            vec![key.clone()]
        }
        None => state.iter().map(|(k, _)| k.clone()).collect(),
    };

    if targets.is_empty() {
        session.close().await?;
        println!("{}", "削除するリソースはありません。".yellow());
        return Ok(());
    }

    println!("{}", format!("削除対象 ({} 個):", targets.len()).bold());
    for key in &targets {
        let id = state.get(key).map(|r| r.id.as_str()).unwrap_or("");
        println!("  - {} ({})", key.red(), id);
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        session.close().await?;
        println!();
        println!("{}", "警告: リモートのリソースを削除します。".yellow());
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    println!();
    let result = match resource {
        Some(key) => {
            let mut result = ApplyResult::new();
            let start = std::time::Instant::now();
            match provider.destroy(&key, &mut state).await {
                Ok(()) => result.add_success(&key, "deleted"),
                Err(e) => result.add_failure(&key, e),
            }
            result.duration_ms = start.elapsed().as_millis() as u64;
            result
        }
        None => provider.destroy_all(&mut state).await?,
    };

    session.commit(state).await?;
    workspace::report(&result)
}
