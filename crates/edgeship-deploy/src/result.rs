//! Terminal result of a reconciliation run

use serde::{Deserialize, Serialize};

/// What a run did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentOutcome {
    Created,
    Updated,
    Unchanged,
    /// An existing distribution already serving the domain was reused
    Adopted,
    /// The operator declined to replace a foreign DNS record
    Skipped,
    Failed,
    Destroyed,
}

impl DeploymentOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, DeploymentOutcome::Failed)
    }
}

impl std::fmt::Display for DeploymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeploymentOutcome::Created => "created",
            DeploymentOutcome::Updated => "updated",
            DeploymentOutcome::Unchanged => "unchanged",
            DeploymentOutcome::Adopted => "adopted",
            DeploymentOutcome::Skipped => "skipped",
            DeploymentOutcome::Failed => "failed",
            DeploymentOutcome::Destroyed => "destroyed",
        };
        write!(f, "{}", label)
    }
}

/// The only value the orchestrator returns to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub success: bool,
    pub outcome: DeploymentOutcome,
    pub site: String,
    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ReconciliationResult {
    pub(crate) fn new(site: &str, domain: &str) -> Self {
        Self {
            success: false,
            outcome: DeploymentOutcome::Failed,
            site: site.to_string(),
            domain: domain.to_string(),
            bucket_name: None,
            distribution_id: None,
            distribution_domain: None,
            certificate_id: None,
            message: String::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self, outcome: DeploymentOutcome, message: impl Into<String>) {
        self.outcome = outcome;
        self.success = outcome.is_success();
        self.message = message.into();
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.finish(DeploymentOutcome::Failed, message);
    }

    /// Message followed by any warnings, one per line
    pub fn summary(&self) -> String {
        let mut lines = vec![self.message.clone()];
        lines.extend(self.warnings.iter().map(|w| format!("warning: {}", w)));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_serialization() {
        let mut result = ReconciliationResult::new("marketing", "example.com");
        result.fail("Timeout waiting for DNS validation options of certificate arn:1");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["outcome"], "failed");
        assert!(json.get("bucket_name").is_none());
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn test_skipped_is_success() {
        let mut result = ReconciliationResult::new("marketing", "example.com");
        result.finish(DeploymentOutcome::Skipped, "skipped");
        assert!(result.success);
    }

    #[test]
    fn test_summary_lists_warnings() {
        let mut result = ReconciliationResult::new("marketing", "example.com");
        result.finish(DeploymentOutcome::Created, "Deployed example.com");
        result.warnings.push("www.example.com CNAME failed".to_string());
        assert_eq!(
            result.summary(),
            "Deployed example.com\nwarning: www.example.com CNAME failed"
        );
    }
}
