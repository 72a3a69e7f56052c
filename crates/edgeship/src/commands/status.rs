use crate::context;
use colored::Colorize;
use std::path::Path;

pub async fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    let (path, spec) = context::load_spec(config)?;
    context::print_site_file(&path);

    let orchestrator = context::orchestrator(&spec).await?;
    let status = orchestrator.status(&spec).await?;

    println!();
    println!("{} ({})", status.site.bold(), status.domain.cyan());

    println!();
    println!("{}", "スタック:".bold());
    match &status.stack {
        Some(stack) => {
            println!("  {} {}", stack.name.cyan(), stack.status);
            if let Some(reason) = &stack.status_reason {
                println!("  理由: {}", reason.dimmed());
            }
            let mut outputs: Vec<_> = stack.outputs.iter().collect();
            outputs.sort();
            for (key, value) in outputs {
                println!("    {}: {}", key, value);
            }
        }
        None => println!("  {}", "(未作成)".dimmed()),
    }

    println!();
    println!("{}", "証明書:".bold());
    match &status.certificate {
        Some(certificate) => {
            println!("  {} {}", certificate.id.cyan(), certificate.status);
            println!("  SAN: {}", certificate.sans.join(", "));
        }
        None => println!("  {}", "(なし)".dimmed()),
    }

    println!();
    println!("{}", "DNS レコード:".bold());
    if status.records.is_empty() {
        println!("  {}", "(なし)".dimmed());
    }
    for record in &status.records {
        println!("  {}", record);
    }

    Ok(())
}
