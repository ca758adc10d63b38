//! Configuration document model and loading.
//!
//! The orchestrator consumes a resolved JSON document with two
//! substructures: `runtimeOptions` (how to bring the runtime up) and
//! `componentSpecs` (what to deploy, keyed by component identifier). An
//! optional `logging` section configures the tracing subscriber.

mod logging;
mod resolver;

pub use logging::LoggingConfig;
pub use resolver::resolve;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::component::ComponentSpec;

/// Upper bound on the drain wait when the document does not override it.
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 30_000;

/// Options controlling how the runtime is brought up. Immutable once
/// deserialized.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeOptions {
    /// Join a cluster instead of running standalone.
    pub clustered: bool,
    /// Opaque reference to the cluster topology configuration. Required
    /// when `clustered` is set.
    pub cluster_config: Option<PathBuf>,
    /// Bound on the shutdown drain wait, in milliseconds.
    pub drain_timeout_ms: Option<u64>,
    /// Tuning parameters passed through to the runtime untouched.
    #[serde(flatten)]
    pub tuning: Map<String, Value>,
}

impl RuntimeOptions {
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms.unwrap_or(DEFAULT_DRAIN_TIMEOUT_MS))
    }
}

/// One entry of the `componentSpecs` map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    /// Deployment options passed to the component opaquely.
    #[serde(default)]
    pub deployment_options: Value,
}

/// Fully resolved configuration document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDocument {
    pub runtime_options: RuntimeOptions,
    pub component_specs: BTreeMap<String, ComponentEntry>,
    pub logging: LoggingConfig,
}

impl ConfigDocument {
    /// Flatten the component map into deployable specs.
    #[must_use]
    pub fn specs(&self) -> Vec<ComponentSpec> {
        self.component_specs
            .iter()
            .map(|(identifier, entry)| {
                ComponentSpec::new(identifier.clone(), entry.deployment_options.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_field_mapping() {
        let doc: ConfigDocument = serde_json::from_str(
            r#"{
                "runtimeOptions": {
                    "clustered": true,
                    "clusterConfig": "/etc/drydock/cluster.json",
                    "drainTimeoutMs": 5000,
                    "workerPoolSize": 8
                },
                "componentSpecs": {
                    "feed": {"deploymentOptions": {"port": 9001}},
                    "ticker": {}
                }
            }"#,
        )
        .unwrap();

        assert!(doc.runtime_options.clustered);
        assert_eq!(
            doc.runtime_options.cluster_config.as_deref(),
            Some(std::path::Path::new("/etc/drydock/cluster.json"))
        );
        assert_eq!(
            doc.runtime_options.drain_timeout(),
            Duration::from_millis(5000)
        );
        assert_eq!(
            doc.runtime_options.tuning.get("workerPoolSize"),
            Some(&Value::from(8))
        );

        let specs = doc.specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].identifier, "feed");
        assert_eq!(specs[0].options["port"], Value::from(9001));
        assert!(specs[1].options.is_null());
    }

    #[test]
    fn test_document_defaults() {
        let doc: ConfigDocument = serde_json::from_str("{}").unwrap();

        assert!(!doc.runtime_options.clustered);
        assert!(doc.runtime_options.cluster_config.is_none());
        assert_eq!(
            doc.runtime_options.drain_timeout(),
            Duration::from_millis(DEFAULT_DRAIN_TIMEOUT_MS)
        );
        assert!(doc.specs().is_empty());
    }
}
