use crate::workspace::{self, StateSession, Workspace};
use colored::Colorize;
use stackflow_cloud::CloudProvider;

pub async fn handle(auto_approve: bool) -> anyhow::Result<()> {
    println!("{}", "変更を適用します...".blue().bold());
    let ws = Workspace::load()?;
    ws.print_header();

    let provider = workspace::build_provider()?;
    let session = StateSession::open(&ws.root).await?;
    let mut state = session.provider_state();

    provider.refresh(&mut state).await?;
    let plan = provider.plan(&ws.desired, &state).await?;
    println!();
    workspace::print_plan(&plan);

    if !plan.has_changes() {
        session.commit(state).await?;
        return Ok(());
    }

    // 確認（--auto-approveが指定されていない場合）
    if !auto_approve {
        session.close().await?;
        println!();
        println!("実行するには --auto-approve オプションを指定してください");
        return Ok(());
    }

    println!();
    println!("{}", "適用中...".blue());
    let result = provider.apply(&plan, &ws.desired, &mut state).await;

    // 失敗しても途中までの結果は保存する
    session.commit(state).await?;
    workspace::report(&result?)
}
