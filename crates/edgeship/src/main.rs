mod commands;
mod context;
mod prompt;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edgeship")]
#[command(about = "静的サイトを S3 + CloudFront へ。何度実行しても同じ結果に。", long_about = None)]
struct Cli {
    /// site.kdl のパス（省略時は自動検出）
    #[arg(short, long, global = true, env = "EDGESHIP_CONFIG")]
    config: Option<PathBuf>,

    /// 詳細ログを表示
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// サイトをデプロイ（バケット・CDN・証明書・DNS を収束させる）
    Deploy {
        /// 既存 DNS レコードの付け替えを確認なしで許可
        #[arg(short, long)]
        yes: bool,
        /// 結果を JSON で出力
        #[arg(long)]
        json: bool,
        /// コンテンツのアップロードと invalidation をスキップ
        #[arg(long)]
        skip_publish: bool,
    },
    /// 設定を検証
    Validate,
    /// 現在のデプロイ状態を表示
    Status,
    /// スタックと DNS レコードを削除
    Destroy {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// バージョン情報を表示
    Version,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout は結果出力（--json を含む）に使うので、ログは stderr へ
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Version => {
            println!("edgeship {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Validate => {
            commands::validate::handle(config)?;
        }
        Commands::Deploy {
            yes,
            json,
            skip_publish,
        } => {
            commands::deploy::handle(config, yes, json, skip_publish).await?;
        }
        Commands::Status => {
            commands::status::handle(config).await?;
        }
        Commands::Destroy { yes } => {
            commands::destroy::handle(config, yes).await?;
        }
    }

    Ok(())
}
