//! The live handle to a running runtime instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::anyhow;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{oneshot, watch};

use crate::cluster::ClusterHandle;
use crate::component::{Component, ComponentRegistry, InstanceId};
use crate::config::RuntimeOptions;
use crate::error::{DeployError, UndeployError};
use crate::shutdown::{DrainLatch, SHUTDOWN_LATCH};

/// Lifecycle states of a [`RuntimeContext`].
///
/// Transitions are strictly Created → Running → Draining → Terminated;
/// no transition skips a state and Draining is entered at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    Draining,
    Terminated,
}

/// Reply channel handed to an instance task along with a stop request.
type StopReply = oneshot::Sender<anyhow::Result<()>>;

/// Control handle for one deployed instance, kept in the active set.
struct InstanceHandle {
    identifier: String,
    stop_tx: oneshot::Sender<StopReply>,
}

/// The live handle to a running runtime, standalone or clustered.
///
/// Owns the set of currently deployed component instances and the
/// lifecycle state machine. When clustered it additionally holds a
/// non-owning reference to the membership handle, used only for latch
/// lookups.
pub struct RuntimeContext {
    options: RuntimeOptions,
    registry: ComponentRegistry,
    instances: DashMap<InstanceId, InstanceHandle>,
    state: watch::Sender<LifecycleState>,
    trigger_armed: AtomicBool,
    cluster: Option<Weak<dyn ClusterHandle>>,
}

impl RuntimeContext {
    pub(crate) fn standalone(options: RuntimeOptions, registry: ComponentRegistry) -> Arc<Self> {
        Self::new(options, registry, None)
    }

    pub(crate) fn clustered(
        options: RuntimeOptions,
        registry: ComponentRegistry,
        cluster: Weak<dyn ClusterHandle>,
    ) -> Arc<Self> {
        Self::new(options, registry, Some(cluster))
    }

    fn new(
        options: RuntimeOptions,
        registry: ComponentRegistry,
        cluster: Option<Weak<dyn ClusterHandle>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            options,
            registry,
            instances: DashMap::new(),
            state: watch::channel(LifecycleState::Created).0,
            trigger_armed: AtomicBool::new(false),
            cluster,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    #[must_use]
    pub fn lifecycle(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Wait until the context reaches [`LifecycleState::Terminated`].
    pub async fn terminated(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == LifecycleState::Terminated).await;
    }

    #[must_use]
    pub fn is_clustered(&self) -> bool {
        self.cluster.is_some()
    }

    /// Bound on the shutdown drain wait.
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        self.options.drain_timeout()
    }

    /// Runtime options this context was created from.
    #[must_use]
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Identifiers of all currently active instances.
    #[must_use]
    pub fn active_instance_ids(&self) -> Vec<InstanceId> {
        self.instances.iter().map(|entry| *entry.key()).collect()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.instances.len()
    }

    /// Deploy one component instance by identifier.
    ///
    /// Deployments are refused once Draining has begun; a deployment
    /// racing with the start of Draining is reverted rather than left
    /// running unsupervised.
    pub async fn deploy(
        &self,
        identifier: &str,
        options: &Value,
    ) -> Result<InstanceId, DeployError> {
        if self.state() != LifecycleState::Running {
            return Err(DeployError::Draining(identifier.to_string()));
        }

        if !options.is_object() && !options.is_null() {
            return Err(DeployError::InvalidOptions {
                identifier: identifier.to_string(),
                reason: "deployment options must be a JSON object".into(),
            });
        }

        let mut component = self
            .registry
            .instantiate(identifier)
            .ok_or_else(|| DeployError::UnknownComponent(identifier.to_string()))?;

        component
            .start(options)
            .await
            .map_err(|source| DeployError::Start {
                identifier: identifier.to_string(),
                source,
            })?;

        let instance = InstanceId::new();
        let (stop_tx, stop_rx) = oneshot::channel();
        self.instances.insert(
            instance,
            InstanceHandle {
                identifier: identifier.to_string(),
                stop_tx,
            },
        );
        tokio::spawn(instance_task(component, stop_rx));

        // Draining may have begun while the component was starting. The
        // drain snapshot either caught this instance (its undeploy will
        // find it) or missed it (ours will); remove-then-stop keeps the
        // two from overlapping.
        if self.state() != LifecycleState::Running {
            let _ = self.undeploy(instance).await;
            return Err(DeployError::Draining(identifier.to_string()));
        }

        Ok(instance)
    }

    /// Undeploy one active instance, stopping its component.
    pub async fn undeploy(&self, instance: InstanceId) -> Result<(), UndeployError> {
        let Some((_, handle)) = self.instances.remove(&instance) else {
            return Err(UndeployError::UnknownInstance(instance));
        };
        let InstanceHandle {
            identifier,
            stop_tx,
        } = handle;

        let (reply_tx, reply_rx) = oneshot::channel();
        if stop_tx.send(reply_tx).is_err() {
            return Err(UndeployError::Stop {
                instance,
                identifier,
                source: anyhow!("instance task is gone"),
            });
        }

        match reply_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(UndeployError::Stop {
                instance,
                identifier,
                source,
            }),
            Err(_) => Err(UndeployError::Stop {
                instance,
                identifier,
                source: anyhow!("instance task dropped the stop request"),
            }),
        }
    }

    /// Claim the single shutdown trigger slot. The first caller gets
    /// `true`; arming a second trigger is a no-op for the caller.
    pub(crate) fn arm_trigger(&self) -> bool {
        self.trigger_armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn mark_running(&self) -> bool {
        self.transition(LifecycleState::Created, LifecycleState::Running)
    }

    /// Enter Draining. Returns `false` when the context is not Running,
    /// which dedupes concurrent shutdown triggers.
    pub(crate) fn begin_drain(&self) -> bool {
        self.transition(LifecycleState::Running, LifecycleState::Draining)
    }

    pub(crate) fn finish_drain(&self) {
        self.transition(LifecycleState::Draining, LifecycleState::Terminated);
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        let mut moved = false;
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                moved = true;
                true
            } else {
                false
            }
        });
        moved
    }

    /// The cluster-wide drain latch, when the membership handle is still
    /// reachable.
    pub(crate) fn shutdown_latch(&self) -> Option<Arc<dyn DrainLatch>> {
        let handle = self.cluster.as_ref()?.upgrade()?;
        Some(handle.latch(SHUTDOWN_LATCH))
    }
}

/// Parks a started component until its stop request arrives.
///
/// Dropping the [`InstanceHandle`] without an undeploy ends the task and
/// drops the component without calling `stop`.
async fn instance_task(
    mut component: Box<dyn Component>,
    stop_rx: oneshot::Receiver<StopReply>,
) {
    if let Ok(reply) = stop_rx.await {
        let result = component.stop().await;
        let _ = reply.send(result);
    }
}
