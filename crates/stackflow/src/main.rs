mod commands;
mod workspace;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stack")]
#[command(about = "宣言するだけ。OpenStack のリソースは、マニフェストのとおりに。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// マニフェストと現在の状態の差分を表示
    Plan,
    /// 差分を適用
    Apply {
        /// 確認なしで実行
        #[arg(short = 'y', long)]
        auto_approve: bool,
    },
    /// 管理中のリソースを再読み込みして状態を更新
    Refresh,
    /// リソースを削除
    Destroy {
        /// 削除対象 (type:name)。省略時は全リソース
        resource: Option<String>,
        /// 確認なしで実行
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// 状態ファイルの内容を表示
    State,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力 (RUST_LOG で制御)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            println!("stackflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::State => {
            commands::state::handle().await?;
        }
        Commands::Plan => {
            commands::plan::handle().await?;
        }
        Commands::Apply { auto_approve } => {
            commands::apply::handle(auto_approve).await?;
        }
        Commands::Refresh => {
            commands::refresh::handle().await?;
        }
        Commands::Destroy { resource, yes } => {
            commands::destroy::handle(resource, yes).await?;
        }
    }

    Ok(())
}
