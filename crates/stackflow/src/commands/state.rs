use crate::workspace;
use colored::Colorize;
use stackflow_cloud::StateManager;

pub async fn handle() -> anyhow::Result<()> {
    let root = workspace::project_root()?;
    let global = StateManager::new(&root).load().await?;

    if global.resources.is_empty() {
        println!("{}", "管理中のリソースはありません。".yellow());
        return Ok(());
    }

    println!("{}", format!("管理中のリソース ({} 個):", global.resources.len()).bold());
    for (key, resource) in &global.resources {
        let name = resource
            .get_attribute::<String>("name")
            .unwrap_or_default();
        println!(
            "  {} {} [{}] {}",
            key.cyan(),
            resource.id,
            resource.status,
            name.dimmed()
        );
    }
    println!();
    println!("最終更新: {}", global.updated_at.to_rfc3339());

    Ok(())
}
