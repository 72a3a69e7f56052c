//! 対話的な確認

use colored::Colorize;
use edgeship_deploy::{ConflictResolver, DnsConflict};
use std::io::Write;

/// 既存レコードの付け替えを標準入力で確認する
pub struct StdinResolver;

impl ConflictResolver for StdinResolver {
    fn confirm_migration(&self, conflict: &DnsConflict) -> bool {
        println!();
        println!("{} {}", "⚠".yellow(), conflict);
        print!("このレコードを削除して edgeship の配信先に切り替えますか？ [y/N]: ");
        if std::io::stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        match std::io::stdin().read_line(&mut input) {
            Ok(_) => input.trim().eq_ignore_ascii_case("y"),
            Err(e) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}
