//! コマンド共通の設定読み込みとクラウド接続

use colored::Colorize;
use edgeship_cloud::DnsProvider;
use edgeship_cloud_aws::AwsCloud;
use edgeship_cloud_cloudflare::{CloudflareDns, DnsConfig};
use edgeship_core::{DeploymentSpec, DnsProviderConfig};
use edgeship_deploy::{CloudServices, Orchestrator};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 設定ファイルを探して検証済みの DeploymentSpec を返す
pub fn load_spec(config: Option<&Path>) -> anyhow::Result<(PathBuf, DeploymentSpec)> {
    let path = edgeship_config::resolve_site_file(config)?;
    let site = edgeship_core::parse_site_file(&path)?;
    let spec = DeploymentSpec::try_from(site)?;
    Ok((path, spec))
}

/// 設定ファイルの場所を表示
pub fn print_site_file(path: &Path) {
    println!("設定ファイル: {}", path.display().to_string().cyan());
}

/// 設定に応じた DNS プロバイダーを生成
pub fn dns_provider(aws: &AwsCloud, config: &DnsProviderConfig) -> anyhow::Result<Arc<dyn DnsProvider>> {
    match config {
        DnsProviderConfig::Route53 { hosted_zone_id } => {
            Ok(Arc::new(aws.route53(hosted_zone_id.clone())))
        }
        DnsProviderConfig::Cloudflare {
            zone_id,
            api_token_env,
        } => {
            let config = DnsConfig::from_env(api_token_env, zone_id.clone())?;
            Ok(Arc::new(CloudflareDns::new(config)))
        }
    }
}

/// AWS の各アダプターを束ねた Orchestrator を生成
pub async fn orchestrator(spec: &DeploymentSpec) -> anyhow::Result<Orchestrator> {
    let aws = AwsCloud::from_env(&spec.region).await;
    let dns = dns_provider(&aws, &spec.dns)?;

    let cloud = CloudServices {
        stacks: Arc::new(aws.stacks()),
        storage: Arc::new(aws.storage()),
        cdn: Arc::new(aws.cdn()),
        certificates: Arc::new(aws.certificates()),
        template: Arc::new(aws.template()),
    };

    Ok(Orchestrator::new(cloud, dns).with_publisher(Arc::new(aws.publisher())))
}
