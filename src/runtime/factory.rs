//! Runtime construction for standalone and clustered modes.
//!
//! The factory owns the two shutdown trigger paths: standalone runtimes
//! arm a process-signal listener, clustered runtimes arm a membership
//! lifecycle listener. Exactly one trigger is armed per context; both
//! paths converge on [`ShutdownCoordinator::trigger`].

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cluster::{ClusterHandle, ClusterMembership, LifecycleEvent};
use crate::component::ComponentRegistry;
use crate::config::RuntimeOptions;
use crate::error::StartupError;
use crate::runtime::context::RuntimeContext;
use crate::shutdown::ShutdownCoordinator;

/// Builds running [`RuntimeContext`]s from [`RuntimeOptions`].
pub struct RuntimeFactory {
    membership: Option<Arc<dyn ClusterMembership>>,
}

impl RuntimeFactory {
    /// Factory for standalone runtimes only.
    #[must_use]
    pub fn new() -> Self {
        Self { membership: None }
    }

    /// Factory able to join a cluster through `membership`.
    #[must_use]
    pub fn with_membership(membership: Arc<dyn ClusterMembership>) -> Self {
        Self {
            membership: Some(membership),
        }
    }

    /// Create a running runtime, arming exactly one shutdown trigger.
    pub async fn create(
        &self,
        options: RuntimeOptions,
        registry: ComponentRegistry,
    ) -> Result<Arc<RuntimeContext>, StartupError> {
        if options.clustered {
            self.create_clustered(options, registry).await
        } else {
            Ok(Self::create_standalone(options, registry))
        }
    }

    fn create_standalone(
        options: RuntimeOptions,
        registry: ComponentRegistry,
    ) -> Arc<RuntimeContext> {
        let ctx = RuntimeContext::standalone(options, registry);
        ctx.mark_running();
        arm_signal_trigger(&ctx);
        info!("standalone runtime started");
        ctx
    }

    async fn create_clustered(
        &self,
        options: RuntimeOptions,
        registry: ComponentRegistry,
    ) -> Result<Arc<RuntimeContext>, StartupError> {
        let membership = self
            .membership
            .clone()
            .ok_or(StartupError::NoMembershipProvider)?;
        let cluster_config = options
            .cluster_config
            .clone()
            .ok_or(StartupError::ClusterConfigMissing)?;
        if !cluster_config.is_file() {
            return Err(StartupError::ClusterConfigNotFound {
                path: cluster_config,
            });
        }

        let handle = membership.join(&cluster_config).await?;
        let ctx = RuntimeContext::clustered(options, registry, Arc::downgrade(&handle));
        ctx.mark_running();
        arm_lifecycle_trigger(&ctx, handle);
        info!(cluster_config = %cluster_config.display(), "clustered runtime started");
        Ok(ctx)
    }
}

impl Default for RuntimeFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Arm the standalone trigger: SIGINT/SIGTERM drains the runtime once.
fn arm_signal_trigger(ctx: &Arc<RuntimeContext>) {
    if !ctx.arm_trigger() {
        warn!("shutdown trigger already armed for this runtime");
        return;
    }
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        termination_signal().await;
        info!("termination signal received");
        ShutdownCoordinator::trigger(&ctx).await;
    });
}

/// Arm the clustered trigger: a `ShuttingDown` lifecycle event for this
/// member drains the runtime once.
fn arm_lifecycle_trigger(ctx: &Arc<RuntimeContext>, handle: Arc<dyn ClusterHandle>) {
    if !ctx.arm_trigger() {
        warn!("shutdown trigger already armed for this runtime");
        return;
    }
    let ctx = Arc::clone(ctx);
    let mut events = handle.subscribe_lifecycle();
    tokio::spawn(async move {
        // The listener holds the strong handle; the context only keeps a
        // weak reference for latch lookups.
        let _handle = handle;
        loop {
            match events.recv().await {
                Ok(LifecycleEvent::ShuttingDown) => {
                    info!("cluster member shutting down");
                    ShutdownCoordinator::trigger(&ctx).await;
                    break;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "lifecycle event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("lifecycle event stream closed");
                    break;
                }
            }
        }
    });
}

async fn termination_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(error) => {
                warn!(error = %error, "could not install SIGTERM handler");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
