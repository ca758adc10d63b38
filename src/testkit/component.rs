//! Scripted component implementations for tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::component::Component;

/// Counters shared between a test and the components it deploys.
#[derive(Debug, Default)]
pub struct LifecycleCounters {
    started: AtomicU32,
    stopped: AtomicU32,
}

impl LifecycleCounters {
    pub fn started(&self) -> u32 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> u32 {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Starts and stops instantly, bumping the shared counters.
pub struct CountingComponent {
    counters: Arc<LifecycleCounters>,
}

impl CountingComponent {
    pub fn new(counters: Arc<LifecycleCounters>) -> Self {
        Self { counters }
    }
}

#[async_trait]
impl Component for CountingComponent {
    async fn start(&mut self, _options: &Value) -> anyhow::Result<()> {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Shared record of the deployment options a [`CapturingComponent`] was
/// started with.
#[derive(Default)]
pub struct OptionsProbe {
    seen: Mutex<Option<Value>>,
}

impl OptionsProbe {
    pub fn seen(&self) -> Option<Value> {
        self.seen.lock().clone()
    }
}

/// Records the deployment options it was started with.
pub struct CapturingComponent {
    probe: Arc<OptionsProbe>,
}

impl CapturingComponent {
    pub fn new(probe: Arc<OptionsProbe>) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl Component for CapturingComponent {
    async fn start(&mut self, options: &Value) -> anyhow::Result<()> {
        *self.probe.seen.lock() = Some(options.clone());
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Always fails to start.
pub struct FailingComponent;

#[async_trait]
impl Component for FailingComponent {
    async fn start(&mut self, _options: &Value) -> anyhow::Result<()> {
        Err(anyhow!("refused to start"))
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Requires a numeric `port` option; mirrors a component that validates
/// its deployment options on start.
pub struct OptionCheckedComponent;

#[async_trait]
impl Component for OptionCheckedComponent {
    async fn start(&mut self, options: &Value) -> anyhow::Result<()> {
        options
            .get("port")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow!("missing or invalid `port` option"))?;
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Starts instantly; `stop` never returns.
pub struct StallingComponent;

#[async_trait]
impl Component for StallingComponent {
    async fn start(&mut self, _options: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

/// Takes a fixed delay to stop.
pub struct SlowStopComponent {
    delay: Duration,
}

impl SlowStopComponent {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Component for SlowStopComponent {
    async fn start(&mut self, _options: &Value) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
