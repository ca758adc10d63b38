//! Interface boundary to the external cluster membership service.
//!
//! The orchestrator never implements group coordination itself; it joins
//! through a [`ClusterMembership`] implementation supplied by the
//! embedding application, and afterwards uses the returned
//! [`ClusterHandle`] only for lifecycle events and named latch lookups.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::StartupError;
use crate::shutdown::DrainLatch;

/// Membership lifecycle events observed by a joined member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// This member has joined the cluster.
    Joined,
    /// This member is about to leave; deployed components must drain.
    ShuttingDown,
}

/// Group-coordination backend capable of admitting this process as a
/// member.
#[async_trait]
pub trait ClusterMembership: Send + Sync {
    /// Join the cluster described by the topology configuration at
    /// `config`.
    async fn join(&self, config: &Path) -> Result<Arc<dyn ClusterHandle>, StartupError>;
}

/// Live handle to this process's cluster membership.
///
/// Lookups and subscriptions only; the handle never owns the lifecycle
/// of other members.
pub trait ClusterHandle: Send + Sync {
    /// Subscribe to membership lifecycle events for this member.
    fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent>;

    /// Look up the named cluster-wide drain latch, creating it lazily.
    fn latch(&self, name: &str) -> Arc<dyn DrainLatch>;
}
