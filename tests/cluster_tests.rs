//! Integration tests for clustered runtimes and the shared drain latch.

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tempfile::NamedTempFile;

use drydock::cluster::ClusterHandle;
use drydock::component::{ComponentRegistry, ComponentSpec};
use drydock::config::RuntimeOptions;
use drydock::deploy::DeploymentCoordinator;
use drydock::error::StartupError;
use drydock::runtime::{LifecycleState, RuntimeContext, RuntimeFactory};
use drydock::shutdown::{DrainLatch, WaitOutcome, SHUTDOWN_LATCH};
use drydock::testkit::cluster::InProcessCluster;
use drydock::testkit::component::{CountingComponent, LifecycleCounters};

fn topology_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"members": ["127.0.0.1:5701"]}}"#).unwrap();
    file
}

fn clustered_options(path: &Path) -> RuntimeOptions {
    RuntimeOptions {
        clustered: true,
        cluster_config: Some(path.to_path_buf()),
        ..Default::default()
    }
}

async fn clustered_context_with_counting(
    cluster: &InProcessCluster,
    topology: &Path,
    count: usize,
) -> (Arc<RuntimeContext>, Arc<LifecycleCounters>) {
    let counters = Arc::new(LifecycleCounters::default());
    let mut registry = ComponentRegistry::new();
    let identifiers: Vec<String> = (0..count).map(|i| format!("component-{i}")).collect();
    for identifier in &identifiers {
        let shared = Arc::clone(&counters);
        registry.register(identifier.clone(), move || {
            CountingComponent::new(Arc::clone(&shared))
        });
    }

    let factory = RuntimeFactory::with_membership(Arc::new(cluster.clone()));
    let ctx = factory
        .create(clustered_options(topology), registry)
        .await
        .unwrap();

    let specs: Vec<_> = identifiers
        .into_iter()
        .map(|identifier| ComponentSpec::new(identifier, Value::Null))
        .collect();
    let results: Vec<_> = DeploymentCoordinator::deploy_all(&ctx, specs).collect().await;
    assert!(results.iter().all(|result| result.is_success()));

    (ctx, counters)
}

#[tokio::test]
async fn test_member_drains_on_shutting_down_event() {
    let topology = topology_file();
    let cluster = InProcessCluster::new();
    let (ctx, counters) =
        clustered_context_with_counting(&cluster, topology.path(), 3).await;
    assert_eq!(ctx.active_count(), 3);
    assert!(ctx.is_clustered());

    // Another party awaiting the well-known latch name observes completion.
    let observer = cluster.member();
    let observer_latch = observer.latch(SHUTDOWN_LATCH);

    cluster.members()[0].initiate_shutdown();

    tokio::time::timeout(Duration::from_secs(5), ctx.terminated())
        .await
        .unwrap();

    assert_eq!(counters.stopped(), 3);
    assert_eq!(ctx.state(), LifecycleState::Terminated);
    assert_eq!(
        observer_latch.wait(Duration::from_secs(1)).await,
        WaitOutcome::Completed
    );
    assert_eq!(cluster.latch(SHUTDOWN_LATCH).count(), 0);
}

#[tokio::test]
async fn test_two_members_drain_independently() {
    let topology = topology_file();
    let cluster = InProcessCluster::new();
    let (ctx_a, counters_a) =
        clustered_context_with_counting(&cluster, topology.path(), 2).await;
    let (ctx_b, counters_b) =
        clustered_context_with_counting(&cluster, topology.path(), 2).await;

    let members = cluster.members();
    members[0].initiate_shutdown();
    members[1].initiate_shutdown();

    tokio::time::timeout(Duration::from_secs(5), async {
        ctx_a.terminated().await;
        ctx_b.terminated().await;
    })
    .await
    .unwrap();

    // A member may terminate while its own undeploys are still in flight
    // when the other member already drove the shared latch to zero; the
    // undeploys themselves must still all complete.
    tokio::time::timeout(Duration::from_secs(5), async {
        while counters_a.stopped() < 2 || counters_b.stopped() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(counters_a.stopped(), 2);
    assert_eq!(counters_b.stopped(), 2);
}

#[tokio::test]
async fn test_missing_cluster_config_aborts_startup() {
    let cluster = InProcessCluster::new();
    let counters = Arc::new(LifecycleCounters::default());
    let mut registry = ComponentRegistry::new();
    let shared = Arc::clone(&counters);
    registry.register("feed", move || CountingComponent::new(Arc::clone(&shared)));

    let factory = RuntimeFactory::with_membership(Arc::new(cluster.clone()));
    let result = factory
        .create(
            clustered_options(Path::new("/nonexistent/topology.json")),
            registry,
        )
        .await;

    assert!(matches!(
        result,
        Err(StartupError::ClusterConfigNotFound { .. })
    ));
    assert_eq!(counters.started(), 0);
    assert!(cluster.members().is_empty());
}
