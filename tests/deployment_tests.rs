//! Integration tests for concurrent batch deployment.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::{json, Value};

use drydock::component::{ComponentRegistry, ComponentSpec};
use drydock::config::RuntimeOptions;
use drydock::deploy::DeploymentCoordinator;
use drydock::error::DeployError;
use drydock::runtime::{RuntimeContext, RuntimeFactory};
use drydock::testkit::component::{
    CapturingComponent, CountingComponent, FailingComponent, LifecycleCounters,
    OptionCheckedComponent, OptionsProbe,
};

async fn running_context(registry: ComponentRegistry) -> Arc<RuntimeContext> {
    RuntimeFactory::new()
        .create(RuntimeOptions::default(), registry)
        .await
        .unwrap()
}

fn counting_registry(
    identifiers: &[&str],
    counters: &Arc<LifecycleCounters>,
) -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    for identifier in identifiers {
        let shared = Arc::clone(counters);
        registry.register(*identifier, move || {
            CountingComponent::new(Arc::clone(&shared))
        });
    }
    registry
}

#[tokio::test]
async fn test_all_valid_specs_deploy() {
    let counters = Arc::new(LifecycleCounters::default());
    let registry = counting_registry(&["feed", "ticker", "writer"], &counters);
    let ctx = running_context(registry).await;

    let specs = vec![
        ComponentSpec::new("feed", Value::Null),
        ComponentSpec::new("ticker", Value::Null),
        ComponentSpec::new("writer", Value::Null),
    ];
    let results: Vec<_> = DeploymentCoordinator::deploy_all(&ctx, specs).collect().await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|result| result.is_success()));
    assert_eq!(ctx.active_count(), 3);
    assert_eq!(counters.started(), 3);
}

#[tokio::test]
async fn test_invalid_options_fail_only_their_component() {
    let counters = Arc::new(LifecycleCounters::default());
    let mut registry = counting_registry(&["feed", "writer"], &counters);
    registry.register("ticker", || OptionCheckedComponent);
    let ctx = running_context(registry).await;

    let specs = vec![
        ComponentSpec::new("feed", Value::Null),
        // Missing the required `port` option.
        ComponentSpec::new("ticker", json!({"host": "localhost"})),
        ComponentSpec::new("writer", Value::Null),
    ];
    let results: Vec<_> = DeploymentCoordinator::deploy_all(&ctx, specs).collect().await;

    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().filter(|result| result.is_success()).count(), 2);

    let failed = results.iter().find(|result| !result.is_success()).unwrap();
    assert_eq!(failed.identifier(), "ticker");
    assert!(matches!(failed.error(), Some(DeployError::Start { .. })));

    assert_eq!(ctx.active_count(), 2);
}

#[tokio::test]
async fn test_batch_yields_one_result_per_spec_regardless_of_failures() {
    let counters = Arc::new(LifecycleCounters::default());
    let mut registry = ComponentRegistry::new();
    for i in 0..12 {
        let identifier = format!("component-{i}");
        if i % 3 == 0 {
            registry.register(identifier, || FailingComponent);
        } else {
            let shared = Arc::clone(&counters);
            registry.register(identifier, move || {
                CountingComponent::new(Arc::clone(&shared))
            });
        }
    }
    let ctx = running_context(registry).await;

    let specs: Vec<_> = (0..12)
        .map(|i| ComponentSpec::new(format!("component-{i}"), Value::Null))
        .collect();
    let results: Vec<_> = DeploymentCoordinator::deploy_all(&ctx, specs).collect().await;

    assert_eq!(results.len(), 12);
    assert_eq!(results.iter().filter(|result| !result.is_success()).count(), 4);
    assert_eq!(results.iter().filter(|result| result.is_success()).count(), 8);

    // Exactly one result per spec, whatever the arrival order.
    let seen: BTreeSet<_> = results.iter().map(|result| result.identifier().to_string()).collect();
    assert_eq!(seen.len(), 12);

    assert_eq!(ctx.active_count(), 8);
    assert_eq!(counters.started(), 8);
}

#[tokio::test]
async fn test_deployment_options_pass_through_opaquely() {
    let probe = Arc::new(OptionsProbe::default());
    let mut registry = ComponentRegistry::new();
    let shared = Arc::clone(&probe);
    registry.register("capture", move || {
        CapturingComponent::new(Arc::clone(&shared))
    });
    let ctx = running_context(registry).await;

    let options = json!({"port": 9001, "replicas": 2, "nested": {"tags": ["a", "b"]}});
    let specs = vec![ComponentSpec::new("capture", options.clone())];
    let results: Vec<_> = DeploymentCoordinator::deploy_all(&ctx, specs).collect().await;

    assert!(results[0].is_success());
    assert_eq!(probe.seen(), Some(options));
}
