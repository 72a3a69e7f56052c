pub mod deploy;
pub mod destroy;
pub mod status;
pub mod validate;

use colored::Colorize;
use edgeship_deploy::{DeploymentOutcome, ReconciliationResult};

/// 実行結果を人間向けに表示
pub(crate) fn print_result(result: &ReconciliationResult) {
    println!();
    let headline = format!("{} ({})", result.message, result.outcome);
    match result.outcome {
        DeploymentOutcome::Failed => println!("{} {}", "✗".red().bold(), headline.red()),
        DeploymentOutcome::Skipped => println!("{} {}", "-".yellow(), headline.yellow()),
        _ => println!("{} {}", "✓".green().bold(), headline.green()),
    }

    if let Some(bucket) = &result.bucket_name {
        println!("  バケット: {}", bucket.cyan());
    }
    if let Some(id) = &result.distribution_id {
        println!("  ディストリビューション: {}", id.cyan());
    }
    if let Some(domain) = &result.distribution_domain {
        println!("  配信ドメイン: {}", domain.cyan());
    }
    if let Some(certificate) = &result.certificate_id {
        println!("  証明書: {}", certificate.cyan());
    }

    if !result.warnings.is_empty() {
        println!();
        for warning in &result.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }
}
