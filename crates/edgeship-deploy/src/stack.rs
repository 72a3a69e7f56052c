//! Stack lifecycle controller
//!
//! Drives the provisioning stack through create/update/delete and classifies the
//! states it ends up in. The only idempotent special case is the provider's
//! "no updates are to be performed" response, which is success.

use crate::error::Result;
use edgeship_cloud::{
    CloudError, Poll, PollOutcome, PollPolicy, StackApi, StackDescription, StackRequest,
    StackState, poll_until,
};

/// Result of converging the stack
#[derive(Debug, Clone)]
pub enum StackOutcome {
    Created(StackDescription),
    Updated(StackDescription),
    NoChangesNeeded(StackDescription),
    Failed(String),
}

impl StackOutcome {
    /// The settled stack, unless converging failed
    pub fn description(&self) -> Option<&StackDescription> {
        match self {
            StackOutcome::Created(d) | StackOutcome::Updated(d) | StackOutcome::NoChangesNeeded(d) => {
                Some(d)
            }
            StackOutcome::Failed(_) => None,
        }
    }
}

/// Result of deleting the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownOutcome {
    Deleted,
    Absent,
    Failed(String),
}

/// The site's stack as found before a run
#[derive(Debug, Clone)]
pub enum ExistingStack {
    /// Never created, or deleted (after waiting out a running delete)
    Absent,
    /// Settled in a state that accepts updates
    Live(StackDescription),
    /// Settled in a state that only allows delete and re-create
    Replaceable(StackDescription),
    TimedOut(String),
}

/// Whether an update error means the stack already matches the template
pub fn is_no_updates_error(message: &str) -> bool {
    message.to_ascii_lowercase().contains("no updates are to be performed")
}

/// Whether a failure reason is the CDN's new-account verification restriction
pub fn is_account_verification_error(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("account must be verified")
        || message.contains("verify your account")
        || message.contains("account verification")
}

/// Where a stack ended up after waiting out in-progress states
enum Settled {
    Absent,
    Present(StackDescription),
    TimedOut(Option<StackState>),
}

/// Wait until the stack is absent or no longer in an in-progress state
async fn settle(api: &dyn StackApi, stack: &str, policy: &PollPolicy) -> Result<Settled> {
    let outcome = poll_until(policy, |_| async move {
        match api.describe_stack(stack).await? {
            None => Ok::<_, CloudError>(Poll::Ready(None)),
            Some(description) if description.status.is_in_progress() => {
                tracing::debug!("Stack {} is {}", stack, description.status);
                Ok(Poll::Pending(description.status))
            }
            Some(description) => Ok(Poll::Ready(Some(description))),
        }
    })
    .await?;

    Ok(match outcome {
        PollOutcome::Ready(None) => Settled::Absent,
        PollOutcome::Ready(Some(description)) if description.status.is_deleted() => {
            Settled::Absent
        }
        PollOutcome::Ready(Some(description)) => Settled::Present(description),
        PollOutcome::TimedOut { last, .. } => Settled::TimedOut(last),
    })
}

/// Wait out in-progress states and classify the stack
pub async fn inspect(api: &dyn StackApi, name: &str, policy: &PollPolicy) -> Result<ExistingStack> {
    Ok(match settle(api, name, policy).await? {
        Settled::Absent => ExistingStack::Absent,
        Settled::Present(description) if description.status.is_unrecoverable() => {
            ExistingStack::Replaceable(description)
        }
        Settled::Present(description) => ExistingStack::Live(description),
        Settled::TimedOut(last) => ExistingStack::TimedOut(timeout_message(name, last)),
    })
}

fn timeout_message(stack: &str, last: Option<StackState>) -> String {
    match last {
        Some(state) => format!("Timed out waiting for stack {} (last status {})", stack, state),
        None => format!("Timed out waiting for stack {}", stack),
    }
}

/// Status reason plus reasons of failed resource events
async fn failure_reason(
    api: &dyn StackApi,
    stack: &str,
    status: Option<&StackDescription>,
) -> String {
    let mut reasons: Vec<String> = Vec::new();
    if let Some(description) = status {
        reasons.push(format!("stack {} is {}", description.name, description.status));
        reasons.extend(description.status_reason.clone());
    }

    match api.failure_reasons(stack).await {
        Ok(events) => reasons.extend(events),
        Err(e) => tracing::warn!("Could not read failure events of {}: {}", stack, e),
    }

    if reasons.is_empty() {
        format!("stack {} failed", stack)
    } else {
        reasons.join("; ")
    }
}

/// Converge the stack to the requested template
///
/// - absent → create, wait for `CREATE_COMPLETE`
/// - present → update, wait for `UPDATE_COMPLETE`; "no updates" is `NoChangesNeeded`
/// - in progress (including a still-unwinding delete) → wait, then decide
/// - unrecoverable (`ROLLBACK_COMPLETE`, ...) → delete, wait, then create
pub async fn converge(
    api: &dyn StackApi,
    request: &StackRequest,
    policy: &PollPolicy,
) -> Result<StackOutcome> {
    let name = request.name.as_str();

    let current = match settle(api, name, policy).await? {
        Settled::TimedOut(last) => return Ok(StackOutcome::Failed(timeout_message(name, last))),
        Settled::Absent => None,
        Settled::Present(description) if description.status.is_unrecoverable() => {
            tracing::info!(
                "Stack {} is {} and cannot be updated; replacing it",
                name,
                description.status
            );
            api.delete_stack(name).await?;
            match settle(api, name, policy).await? {
                Settled::Absent => None,
                Settled::Present(description) => {
                    let reason = failure_reason(api, name, Some(&description)).await;
                    return Ok(StackOutcome::Failed(reason));
                }
                Settled::TimedOut(last) => {
                    return Ok(StackOutcome::Failed(timeout_message(name, last)));
                }
            }
        }
        Settled::Present(description) => Some(description),
    };

    match current {
        None => create(api, request, policy).await,
        Some(existing) => update(api, request, existing, policy).await,
    }
}

async fn create(
    api: &dyn StackApi,
    request: &StackRequest,
    policy: &PollPolicy,
) -> Result<StackOutcome> {
    tracing::info!("Creating stack {}", request.name);
    let stack_id = api.create_stack(request).await?;

    // 削除済みスタックも参照できるよう、以降はIDで追跡する
    match settle(api, &stack_id, policy).await? {
        Settled::Present(description) if description.status == StackState::CreateComplete => {
            tracing::info!("Stack {} created", request.name);
            Ok(StackOutcome::Created(description))
        }
        Settled::Present(description) => {
            let reason = failure_reason(api, &stack_id, Some(&description)).await;
            Ok(StackOutcome::Failed(reason))
        }
        Settled::Absent => {
            let reason = failure_reason(api, &stack_id, None).await;
            Ok(StackOutcome::Failed(format!(
                "stack {} was rolled back and deleted: {}",
                request.name, reason
            )))
        }
        Settled::TimedOut(last) => Ok(StackOutcome::Failed(timeout_message(&request.name, last))),
    }
}

async fn update(
    api: &dyn StackApi,
    request: &StackRequest,
    existing: StackDescription,
    policy: &PollPolicy,
) -> Result<StackOutcome> {
    tracing::info!("Updating stack {} ({})", request.name, existing.status);

    let stack_id = match api.update_stack(request).await {
        Ok(id) => id,
        Err(e) => {
            return match e.api_message() {
                Some(msg) if is_no_updates_error(msg) => {
                    tracing::info!("Stack {} is already up to date", request.name);
                    Ok(StackOutcome::NoChangesNeeded(existing))
                }
                Some(msg) => Ok(StackOutcome::Failed(msg.to_string())),
                None => Err(e.into()),
            };
        }
    };

    match settle(api, &stack_id, policy).await? {
        Settled::Present(description) if description.status == StackState::UpdateComplete => {
            tracing::info!("Stack {} updated", request.name);
            Ok(StackOutcome::Updated(description))
        }
        Settled::Present(description) => {
            let reason = failure_reason(api, &stack_id, Some(&description)).await;
            Ok(StackOutcome::Failed(reason))
        }
        Settled::Absent => Ok(StackOutcome::Failed(format!(
            "stack {} disappeared during update",
            request.name
        ))),
        Settled::TimedOut(last) => Ok(StackOutcome::Failed(timeout_message(&request.name, last))),
    }
}

/// Delete the stack and wait until it is gone
pub async fn teardown(api: &dyn StackApi, name: &str, policy: &PollPolicy) -> Result<TeardownOutcome> {
    let stack_id = match settle(api, name, policy).await? {
        Settled::Absent => return Ok(TeardownOutcome::Absent),
        Settled::TimedOut(last) => return Ok(TeardownOutcome::Failed(timeout_message(name, last))),
        Settled::Present(description) => description.id.unwrap_or_else(|| name.to_string()),
    };

    tracing::info!("Deleting stack {}", name);
    api.delete_stack(name).await?;

    match settle(api, &stack_id, policy).await? {
        Settled::Absent => Ok(TeardownOutcome::Deleted),
        Settled::Present(description) => {
            let reason = failure_reason(api, &stack_id, Some(&description)).await;
            Ok(TeardownOutcome::Failed(reason))
        }
        Settled::TimedOut(last) => Ok(TeardownOutcome::Failed(timeout_message(name, last))),
    }
}
