use crate::context;
use colored::Colorize;
use std::path::Path;

pub async fn handle(config: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    let (path, spec) = context::load_spec(config)?;

    println!("{}", "削除対象:".bold());
    context::print_site_file(&path);
    println!("  スタック: {}", spec.stack_name.cyan());
    println!("  ドメイン: {}", spec.domain.cyan());
    println!("  バケット: {}", spec.bucket_name.cyan());

    if !yes {
        println!();
        println!(
            "{}",
            "警告: 配信を停止し、バケットの中身ごとスタックを削除します。".yellow()
        );
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    println!();
    println!("{}", "削除中...".blue());
    let orchestrator = context::orchestrator(&spec).await?;
    let result = orchestrator.teardown(&spec).await;
    super::print_result(&result);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
