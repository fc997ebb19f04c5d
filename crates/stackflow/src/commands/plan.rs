use crate::workspace::{self, StateSession, Workspace};
use colored::Colorize;
use stackflow_cloud::CloudProvider;

pub async fn handle() -> anyhow::Result<()> {
    println!("{}", "実行計画を作成中...".blue());
    let ws = Workspace::load()?;
    ws.print_header();

    let provider = workspace::build_provider()?;
    let session = StateSession::open(&ws.root).await?;
    let mut state = session.provider_state();

    // 計画のためのリフレッシュは状態ファイルには書き戻さない
    provider.refresh(&mut state).await?;
    session.close().await?;

    let plan = provider.plan(&ws.desired, &state).await?;
    println!();
    workspace::print_plan(&plan);

    Ok(())
}
