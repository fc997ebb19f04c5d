use crate::workspace::{self, StateSession};
use colored::Colorize;
use stackflow_cloud::CloudProvider;

pub async fn handle() -> anyhow::Result<()> {
    println!("{}", "状態を更新中...".blue());
    let root = workspace::project_root()?;

    let provider = workspace::build_provider()?;
    let session = StateSession::open(&root).await?;
    let mut state = session.provider_state();
    let before = state.len();

    provider.refresh(&mut state).await?;
    let after = state.len();
    session.commit(state).await?;

    println!("{}", "✓ 状態を更新しました".green());
    println!("  管理中のリソース: {}個", after);
    if after < before {
        println!(
            "  {}",
            format!("{}個のリソースがリモートから消えていました", before - after).yellow()
        );
    }
    Ok(())
}
