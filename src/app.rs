//! End-to-end launcher: resolve the config, bring the runtime up, deploy
//! the declared component batch.

use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use tracing::info;

use crate::cluster::ClusterMembership;
use crate::component::ComponentRegistry;
use crate::config::{self, ConfigDocument};
use crate::deploy::{DeploymentCoordinator, DeploymentResult};
use crate::error::Result;
use crate::runtime::{RuntimeContext, RuntimeFactory};

/// Orchestrator entry point tying config resolution, runtime creation
/// and batch deployment together.
pub struct Launcher {
    registry: ComponentRegistry,
    membership: Option<Arc<dyn ClusterMembership>>,
}

impl Launcher {
    #[must_use]
    pub fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry,
            membership: None,
        }
    }

    /// Use `membership` when the configuration asks for a clustered
    /// runtime.
    #[must_use]
    pub fn with_membership(mut self, membership: Arc<dyn ClusterMembership>) -> Self {
        self.membership = Some(membership);
        self
    }

    /// Resolve the document at `config_path` and launch it.
    ///
    /// Startup errors abort before anything is deployed; per-component
    /// deployment failures do not.
    pub async fn launch(self, config_path: impl AsRef<Path>) -> Result<LaunchReport> {
        let document = config::resolve(config_path)?;
        self.launch_document(document).await
    }

    /// Launch an already resolved configuration document.
    pub async fn launch_document(self, document: ConfigDocument) -> Result<LaunchReport> {
        let factory = match self.membership {
            Some(membership) => RuntimeFactory::with_membership(membership),
            None => RuntimeFactory::new(),
        };
        let ctx = factory
            .create(document.runtime_options.clone(), self.registry)
            .await?;

        let specs = document.specs();
        info!(components = specs.len(), "deploying component batch");
        let results: Vec<DeploymentResult> =
            DeploymentCoordinator::deploy_all(&ctx, specs).collect().await;

        let deployed = results.iter().filter(|result| result.is_success()).count();
        let failed = results.len() - deployed;
        info!(deployed, failed, "deployment batch finished");

        Ok(LaunchReport { ctx, results })
    }
}

/// Outcome of a launch: the live context plus per-component results.
pub struct LaunchReport {
    ctx: Arc<RuntimeContext>,
    results: Vec<DeploymentResult>,
}

impl LaunchReport {
    #[must_use]
    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.ctx
    }

    #[must_use]
    pub fn results(&self) -> &[DeploymentResult] {
        &self.results
    }
}
