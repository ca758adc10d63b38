//! The deployable-unit contract and the registry that resolves identifiers.
//!
//! A component is an independently deployable piece of logic. The runtime
//! never sees its internals; it only calls [`Component::start`] when the
//! component is deployed and [`Component::stop`] when it is undeployed.
//! Identifiers become deployable by registering a factory in a
//! [`ComponentRegistry`].

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier of one deployed component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One deployable unit: a component identifier plus its opaque deployment
/// options.
///
/// Identifiers are unique within a deployment batch; they are not
/// guaranteed unique across a cluster.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentSpec {
    pub identifier: String,
    #[serde(default)]
    pub options: Value,
}

impl ComponentSpec {
    pub fn new(identifier: impl Into<String>, options: Value) -> Self {
        Self {
            identifier: identifier.into(),
            options,
        }
    }
}

/// A deployable component managed by the runtime.
///
/// `start` is called once per deployment with the spec's deployment
/// options and must return only when the component is operational (or has
/// failed to become so). `stop` is called at most once, when the instance
/// is undeployed.
#[async_trait]
pub trait Component: Send {
    async fn start(&mut self, options: &Value) -> anyhow::Result<()>;

    async fn stop(&mut self) -> anyhow::Result<()>;
}

/// Factory producing fresh instances for one registered identifier.
pub type ComponentFactory = Box<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Maps component identifiers to factories.
///
/// Populated by the embedding application before the runtime is created;
/// immutable afterwards.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `identifier`, replacing any previous entry.
    pub fn register<F, C>(&mut self, identifier: impl Into<String>, factory: F)
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Component + 'static,
    {
        self.factories
            .insert(identifier.into(), Box::new(move || Box::new(factory())));
    }

    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub(crate) fn instantiate(&self, identifier: &str) -> Option<Box<dyn Component>> {
        self.factories.get(identifier).map(|factory| factory())
    }
}
