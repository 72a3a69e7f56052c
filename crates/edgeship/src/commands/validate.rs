use crate::context;
use colored::Colorize;
use std::path::Path;

pub fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let (path, spec) = match context::load_spec(config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    context::print_site_file(&path);
    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  サイト: {}", spec.site.cyan());
    println!("  ドメイン: {}", spec.domain.cyan());
    if let Some(www) = spec.www_domain() {
        println!("    - {}", www);
    }
    println!("  リージョン: {}", spec.region);
    println!("  バケット: {}", spec.bucket_name);
    println!("  スタック: {}", spec.stack_name);
    println!(
        "  証明書: {}",
        spec.certificate_id.as_deref().unwrap_or("(自動発行)")
    );
    println!("  SAN: {}", spec.required_sans().join(", "));
    println!("  DNS: {}", spec.dns.name());
    if let Some(source) = &spec.source_dir {
        println!("  コンテンツ: {}", source.display());
    }
    println!(
        "  キャッシュ TTL: min={} default={} max={}",
        spec.cache.min_ttl, spec.cache.default_ttl, spec.cache.max_ttl
    );
    println!("  価格クラス: {}", spec.price_class);
    if !spec.tags.is_empty() {
        println!("  タグ:");
        for (key, value) in &spec.tags {
            println!("    - {}={}", key, value);
        }
    }

    Ok(())
}
