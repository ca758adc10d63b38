//! Single-process cluster membership backend for tests.
//!
//! Members joined through the same [`InProcessCluster`] share named drain
//! latches, reproducing the distributed-latch semantics without an
//! external coordination service: any member may decrement, the first
//! decrement to zero releases every waiter.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::cluster::{ClusterHandle, ClusterMembership, LifecycleEvent};
use crate::error::StartupError;
use crate::shutdown::{DrainLatch, LocalDrainLatch};

#[derive(Default)]
struct ClusterState {
    latches: Mutex<HashMap<String, Arc<LocalDrainLatch>>>,
    members: Mutex<Vec<Arc<InProcessMember>>>,
}

impl ClusterState {
    fn latch(&self, name: &str) -> Arc<dyn DrainLatch> {
        let mut latches = self.latches.lock();
        let latch = latches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(LocalDrainLatch::new(0)));
        let latch: Arc<dyn DrainLatch> = latch.clone();
        latch
    }
}

/// In-process membership backend. Cloning shares the cluster state.
#[derive(Clone, Default)]
pub struct InProcessCluster {
    state: Arc<ClusterState>,
}

impl InProcessCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a member handle without a topology file, for tests that
    /// wire handles directly.
    pub fn member(&self) -> Arc<InProcessMember> {
        let (events, _) = broadcast::channel(16);
        let member = Arc::new(InProcessMember {
            state: Arc::clone(&self.state),
            events,
        });
        self.state.members.lock().push(Arc::clone(&member));
        member
    }

    /// Handles of every joined member, in join order.
    pub fn members(&self) -> Vec<Arc<InProcessMember>> {
        self.state.members.lock().clone()
    }

    /// Look up the named latch exactly as a member would.
    pub fn latch(&self, name: &str) -> Arc<dyn DrainLatch> {
        self.state.latch(name)
    }
}

#[async_trait]
impl ClusterMembership for InProcessCluster {
    async fn join(&self, config: &Path) -> Result<Arc<dyn ClusterHandle>, StartupError> {
        if !config.is_file() {
            return Err(StartupError::ClusterConfigNotFound {
                path: config.to_path_buf(),
            });
        }
        let member = self.member();
        let _ = member.events.send(LifecycleEvent::Joined);
        Ok(member)
    }
}

/// One joined member's handle.
pub struct InProcessMember {
    state: Arc<ClusterState>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl InProcessMember {
    /// Emit `ShuttingDown` to this member, as the backend would when the
    /// member is about to leave.
    pub fn initiate_shutdown(&self) {
        let _ = self.events.send(LifecycleEvent::ShuttingDown);
    }
}

impl ClusterHandle for InProcessMember {
    fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    fn latch(&self, name: &str) -> Arc<dyn DrainLatch> {
        self.state.latch(name)
    }
}
