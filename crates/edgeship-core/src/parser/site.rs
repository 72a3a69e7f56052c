//! site ノードのパース

use crate::error::{CoreError, Result};
use crate::model::SiteConfig;
use kdl::KdlNode;
use std::path::PathBuf;

fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn all_strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

fn u32_value(node: &KdlNode, value: Option<i128>) -> Result<u32> {
    value
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            CoreError::InvalidConfig(format!(
                "{} には 0 以上の整数を指定してください",
                node.name().value()
            ))
        })
}

/// site ノードをパース
pub fn parse_site(node: &KdlNode) -> Result<SiteConfig> {
    let name = first_string(node)
        .ok_or_else(|| CoreError::InvalidConfig("site requires a name".to_string()))?;

    let mut site = SiteConfig::new(name);

    let Some(children) = node.children() else {
        return Ok(site);
    };

    for child in children.nodes() {
        match child.name().value() {
            "domain" => site.domain = first_string(child),
            "region" => site.region = first_string(child),
            "bucket" => site.bucket = first_string(child),
            "certificate" | "certificate-arn" | "certificate_arn" => {
                site.certificate = first_string(child)
            }
            "stack" | "stack-name" | "stack_name" => site.stack = first_string(child),
            "source" => site.source = first_string(child).map(PathBuf::from),
            "index-document" | "index_document" => site.index_document = first_string(child),
            "error-document" | "error_document" => site.error_document = first_string(child),
            "price-class" | "price_class" => site.price_class = first_string(child),
            "extra-sans" | "extra_sans" => {
                // 複数の SAN を引数として受け取る
                site.extra_sans = all_strings(child);
            }
            "certificate-wait-minutes" | "certificate_wait_minutes" => {
                let value = child.entries().first().and_then(|e| e.value().as_integer());
                site.certificate_wait_minutes = Some(u32_value(child, value)?);
            }
            "cache" => {
                // 例: cache default-ttl=86400 max-ttl=31536000
                for entry in child.entries() {
                    let Some(key) = entry.name().map(|n| n.value()) else {
                        continue;
                    };
                    let value = u32_value(child, entry.value().as_integer())?;
                    match key {
                        "min-ttl" | "min_ttl" => site.cache.min_ttl = value,
                        "default-ttl" | "default_ttl" => site.cache.default_ttl = value,
                        "max-ttl" | "max_ttl" => site.cache.max_ttl = value,
                        other => tracing::warn!("Unknown cache setting ignored: {}", other),
                    }
                }
            }
            "tags" => {
                // 例: tags team="web" env="prod"
                for entry in child.entries() {
                    if let (Some(key), Some(value)) =
                        (entry.name().map(|n| n.value()), entry.value().as_string())
                    {
                        site.tags.insert(key.to_string(), value.to_string());
                    }
                }
            }
            "dns" => {
                site.dns_provider = first_string(child);
                if let Some(dns_children) = child.children() {
                    for setting in dns_children.nodes() {
                        if let Some(value) = first_string(setting) {
                            site.dns_settings
                                .insert(setting.name().value().to_string(), value);
                        }
                    }
                }
            }
            other => {
                return Err(CoreError::InvalidConfig(format!(
                    "site '{}' に未知の設定があります: {}",
                    site.name, other
                )));
            }
        }
    }

    Ok(site)
}
