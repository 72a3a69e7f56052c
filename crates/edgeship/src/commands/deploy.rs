use crate::context;
use crate::prompt::StdinResolver;
use colored::Colorize;
use edgeship_deploy::{ConflictResolver, FixedAnswer};
use std::path::Path;

pub async fn handle(
    config: Option<&Path>,
    yes: bool,
    json: bool,
    skip_publish: bool,
) -> anyhow::Result<()> {
    let (path, mut spec) = context::load_spec(config)?;
    if skip_publish {
        spec.source_dir = None;
    }

    if !json {
        println!("{}", "デプロイを開始します...".blue().bold());
        context::print_site_file(&path);
        println!("サイト: {}", spec.site.cyan());
        println!("ドメイン: {}", spec.domain.cyan());
        println!("DNS: {}", spec.dns.name());
        match &spec.source_dir {
            Some(source) => println!("コンテンツ: {}", source.display()),
            None => println!("コンテンツ: {}", "(アップロードしない)".dimmed()),
        }
    }

    // --json では標準出力を汚さないよう対話しない
    let resolver: Box<dyn ConflictResolver> = if yes {
        Box::new(FixedAnswer(true))
    } else if json {
        Box::new(FixedAnswer(false))
    } else {
        Box::new(StdinResolver)
    };

    let orchestrator = context::orchestrator(&spec).await?;
    let result = orchestrator.deploy(&spec, resolver.as_ref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        super::print_result(&result);
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
