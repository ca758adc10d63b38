//! Concurrent component deployment.
//!
//! A deployment batch fans out as independently spawned tasks; one
//! component's failure neither cancels nor delays its siblings. Each
//! spec yields exactly one [`DeploymentResult`], in completion order.

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, Stream};
use tracing::{error, info};

use crate::component::{ComponentSpec, InstanceId};
use crate::error::DeployError;
use crate::runtime::RuntimeContext;

/// Outcome of deploying a single [`ComponentSpec`]. Immutable once
/// produced.
#[derive(Debug)]
pub struct DeploymentResult {
    identifier: String,
    outcome: Result<InstanceId, DeployError>,
}

impl DeploymentResult {
    /// Identifier of the spec this result belongs to.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Instance id of a successful deployment.
    #[must_use]
    pub fn instance_id(&self) -> Option<InstanceId> {
        self.outcome.as_ref().ok().copied()
    }

    /// Cause of a failed deployment.
    #[must_use]
    pub fn error(&self) -> Option<&DeployError> {
        self.outcome.as_ref().err()
    }
}

/// Fans a batch of component specs out as concurrent deployments.
pub struct DeploymentCoordinator;

impl DeploymentCoordinator {
    /// Deploy every spec concurrently against `ctx`.
    ///
    /// Deployments start immediately; the returned stream only observes
    /// them. The stream is finite, one result per spec, and not
    /// restartable. A deployment task that panics is reported as a
    /// failure for its spec.
    pub fn deploy_all(
        ctx: &Arc<RuntimeContext>,
        specs: Vec<ComponentSpec>,
    ) -> impl Stream<Item = DeploymentResult> {
        let tasks: FuturesUnordered<_> = specs
            .into_iter()
            .map(|spec| {
                let ctx = Arc::clone(ctx);
                let identifier = spec.identifier.clone();
                let task = tokio::spawn(async move { deploy_one(&ctx, spec).await });
                async move {
                    match task.await {
                        Ok(result) => result,
                        Err(_) => {
                            error!(component = %identifier, "deployment task panicked");
                            DeploymentResult {
                                identifier: identifier.clone(),
                                outcome: Err(DeployError::Panicked(identifier)),
                            }
                        }
                    }
                }
            })
            .collect();
        tasks
    }
}

async fn deploy_one(ctx: &RuntimeContext, spec: ComponentSpec) -> DeploymentResult {
    let outcome = ctx.deploy(&spec.identifier, &spec.options).await;
    match &outcome {
        Ok(instance) => {
            info!(component = %spec.identifier, instance = %instance, "component deployed");
        }
        Err(error) => {
            error!(component = %spec.identifier, error = %error, "component could not be deployed");
        }
    }
    DeploymentResult {
        identifier: spec.identifier,
        outcome,
    }
}
