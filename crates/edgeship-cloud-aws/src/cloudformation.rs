//! CloudFormation stack adapter

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::types::{OnFailure, Parameter, Stack, StackEvent, Tag};
use edgeship_cloud::{StackApi, StackDescription, StackRequest, StackState};
use std::collections::HashMap;

/// Events inspected when collecting failure reasons
const EVENT_WINDOW: usize = 50;

/// [`StackApi`] over CloudFormation
pub struct CloudFormationStacks {
    client: Client,
}

impl CloudFormationStacks {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    fn parameters(request: &StackRequest) -> Vec<Parameter> {
        let mut keys: Vec<&String> = request.parameters.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(&request.parameters[key])
                    .build()
            })
            .collect()
    }

    fn tags(request: &StackRequest) -> Result<Vec<Tag>> {
        let mut keys: Vec<&String> = request.tags.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                Ok(Tag::builder()
                    .key(key)
                    .value(&request.tags[key])
                    .build())
            })
            .collect()
    }
}

#[async_trait]
impl StackApi for CloudFormationStacks {
    async fn describe_stack(&self, name: &str) -> edgeship_cloud::Result<Option<StackDescription>> {
        let output = match self.client.describe_stacks().stack_name(name).send().await {
            Ok(output) => output,
            Err(err) => {
                let err = AwsError::api("DescribeStacks", err);
                if is_missing_stack(&err) {
                    tracing::debug!("Stack {} does not exist", name);
                    return Ok(None);
                }
                return Err(err.into());
            }
        };

        let stacks = output.stacks();
        Ok(stacks.first().map(|stack| describe(name, stack)))
    }

    async fn create_stack(&self, request: &StackRequest) -> edgeship_cloud::Result<String> {
        tracing::info!("CreateStack {}", request.name);
        let on_failure = if request.delete_on_failure {
            OnFailure::Delete
        } else {
            OnFailure::Rollback
        };

        let output = self
            .client
            .create_stack()
            .stack_name(&request.name)
            .template_body(&request.template_body)
            .set_parameters(Some(Self::parameters(request)))
            .set_tags(Some(Self::tags(request)?))
            .on_failure(on_failure)
            .send()
            .await
            .map_err(|e| AwsError::api("CreateStack", e))?;

        Ok(output
            .stack_id()
            .map(str::to_string)
            .unwrap_or_else(|| request.name.clone()))
    }

    async fn update_stack(&self, request: &StackRequest) -> edgeship_cloud::Result<String> {
        tracing::info!("UpdateStack {}", request.name);
        let output = self
            .client
            .update_stack()
            .stack_name(&request.name)
            .template_body(&request.template_body)
            .set_parameters(Some(Self::parameters(request)))
            .set_tags(Some(Self::tags(request)?))
            .send()
            .await
            .map_err(|e| AwsError::api("UpdateStack", e))?;

        Ok(output
            .stack_id()
            .map(str::to_string)
            .unwrap_or_else(|| request.name.clone()))
    }

    async fn delete_stack(&self, name: &str) -> edgeship_cloud::Result<()> {
        tracing::info!("DeleteStack {}", name);
        self.client
            .delete_stack()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::api("DeleteStack", e))?;
        Ok(())
    }

    async fn failure_reasons(&self, name: &str) -> edgeship_cloud::Result<Vec<String>> {
        let output = self
            .client
            .describe_stack_events()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::api("DescribeStackEvents", e))?;

        let events: Vec<ResourceEvent> = output
            .stack_events()
            .iter()
            .take(EVENT_WINDOW)
            .map(ResourceEvent::from)
            .collect();
        Ok(failure_reasons(&events))
    }
}

fn is_missing_stack(err: &AwsError) -> bool {
    matches!(err, AwsError::Api { message, .. } if message.contains("does not exist"))
}

fn describe(requested: &str, stack: &Stack) -> StackDescription {
    let outputs: HashMap<String, String> = stack
        .outputs()
        .iter()
        .filter_map(|output| {
            Some((
                output.output_key()?.to_string(),
                output.output_value()?.to_string(),
            ))
        })
        .collect();

    StackDescription {
        name: stack.stack_name().unwrap_or(requested).to_string(),
        id: stack.stack_id().map(str::to_string),
        status: stack
            .stack_status()
            .map(|s| StackState::parse(s.as_str()))
            .unwrap_or_else(|| StackState::Other("UNKNOWN".to_string())),
        status_reason: stack.stack_status_reason().map(str::to_string),
        outputs,
    }
}

/// Resource event reduced to the fields failure reporting needs
#[derive(Debug, Clone)]
struct ResourceEvent {
    logical_id: Option<String>,
    status: String,
    reason: Option<String>,
}

impl From<&StackEvent> for ResourceEvent {
    fn from(event: &StackEvent) -> Self {
        Self {
            logical_id: event.logical_resource_id().map(str::to_string),
            status: event
                .resource_status()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            reason: event.resource_status_reason().map(str::to_string),
        }
    }
}

/// `{logical id}: {reason}` of failed resources, oldest first
///
/// Events arrive newest first. Cancellations caused by another resource failing
/// carry no information and are skipped.
fn failure_reasons(events: &[ResourceEvent]) -> Vec<String> {
    let mut reasons: Vec<String> = Vec::new();

    for event in events.iter().rev() {
        if !event.status.ends_with("_FAILED") {
            continue;
        }
        let Some(reason) = &event.reason else {
            continue;
        };
        if reason.contains("cancelled") {
            continue;
        }

        let reason = match &event.logical_id {
            Some(id) => format!("{}: {}", id, reason),
            None => reason.clone(),
        };
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }

    reasons
}
