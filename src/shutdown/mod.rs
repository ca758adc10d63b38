//! Coordinated drain of deployed components ahead of termination.
//!
//! One coordinator serves both the standalone and the clustered shutdown
//! paths; the difference between them is confined to which
//! [`DrainLatch`] implementation signals completion. The latch wait is
//! the single place the shutdown path is allowed to block, and it is
//! always bounded by a timeout so a hung undeploy can never prevent
//! process exit.

mod latch;

pub use latch::{DrainLatch, LocalDrainLatch, WaitOutcome};

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::component::InstanceId;
use crate::error::UndeployError;
use crate::runtime::RuntimeContext;

/// Well-known name of the cluster-wide drain latch. Any party awaiting
/// this name observes drain completion.
pub const SHUTDOWN_LATCH: &str = "shutdown.latch";

/// Drives the Running → Draining → Terminated transition.
pub struct ShutdownCoordinator;

impl ShutdownCoordinator {
    /// Entry point shared by every trigger path (process signal, cluster
    /// lifecycle event, embedder request).
    ///
    /// Selects the latch by the context's clustered capability: the
    /// named cluster latch when a membership handle is reachable, a fresh
    /// local latch otherwise. Applies the configured drain timeout.
    /// Safe to call from multiple triggers; only the first performs the
    /// drain.
    pub async fn trigger(ctx: &Arc<RuntimeContext>) {
        let timeout = ctx.drain_timeout();
        let latch: Arc<dyn DrainLatch> = match ctx.shutdown_latch() {
            Some(latch) => {
                latch.try_set_count(1);
                latch
            }
            None => Arc::new(LocalDrainLatch::new(1)),
        };
        Self::drain_and_wait(ctx, latch, timeout).await;
    }

    /// Undeploy every active instance and wait for completion, bounded by
    /// `timeout`.
    ///
    /// The latch must arrive with a count of at least one; it is
    /// decremented once, when every snapshotted undeploy has completed.
    /// Never panics and never returns an error: undeploy failures are
    /// logged, and a timeout terminates the context anyway.
    pub async fn drain_and_wait(
        ctx: &Arc<RuntimeContext>,
        latch: Arc<dyn DrainLatch>,
        timeout: Duration,
    ) {
        if !ctx.begin_drain() {
            debug!("drain already in progress or finished, ignoring trigger");
            return;
        }

        let snapshot = ctx.active_instance_ids();
        info!(instances = snapshot.len(), "draining runtime");

        let drain_ctx = Arc::clone(ctx);
        let drain_latch = Arc::clone(&latch);
        tokio::spawn(async move {
            let undeploys: Vec<_> = snapshot
                .into_iter()
                .map(|instance| {
                    let ctx = Arc::clone(&drain_ctx);
                    tokio::spawn(async move { undeploy_one(&ctx, instance).await })
                })
                .collect();
            join_all(undeploys).await;
            drain_latch.count_down();
        });

        match latch.wait(timeout).await {
            WaitOutcome::Completed => info!("drain complete"),
            WaitOutcome::TimedOut => warn!(
                timeout_ms = timeout.as_millis() as u64,
                "drain timed out, terminating with undeploys still in flight"
            ),
        }

        ctx.finish_drain();
    }
}

async fn undeploy_one(ctx: &RuntimeContext, instance: InstanceId) {
    match ctx.undeploy(instance).await {
        Ok(()) => info!(instance = %instance, "component undeployed"),
        Err(UndeployError::UnknownInstance(_)) => {
            debug!(instance = %instance, "instance already gone before drain reached it");
        }
        Err(error) => {
            warn!(instance = %instance, error = %error, "component could not be undeployed");
        }
    }
}
