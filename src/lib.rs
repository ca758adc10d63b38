//! Drydock - component lifecycle orchestration.
//!
//! Drydock boots a runtime (standalone or clustered), deploys a declared
//! set of components in parallel, and on termination drains every
//! deployed component, bounded by a timeout. When clustered, the drain
//! decision and its completion are synchronized with the other members
//! through the cluster's named latch.
//!
//! # Architecture
//!
//! ```text
//! config::resolve ──> RuntimeFactory ──> RuntimeContext
//!                                             │
//!           DeploymentCoordinator::deploy_all ┤  (concurrent, fire-and-report)
//!                                             │
//!    signal / cluster ShuttingDown ──> ShutdownCoordinator
//!                                             │
//!                             DrainLatch (local or cluster-shared)
//! ```
//!
//! # Modules
//!
//! - [`config`] - configuration document model, templated resolution, logging setup
//! - [`component`] - the deployable-unit contract and registry
//! - [`runtime`] - runtime context and factory
//! - [`deploy`] - concurrent deployment coordinator
//! - [`shutdown`] - drain coordinator and latches
//! - [`cluster`] - interface to the external cluster membership service
//! - [`error`] - error types for the crate
//! - [`app`] - end-to-end launcher wiring
//!
//! # Example
//!
//! ```no_run
//! use drydock::app::Launcher;
//! use drydock::component::ComponentRegistry;
//!
//! # async fn run() -> drydock::error::Result<()> {
//! // Register component factories, then hand the registry to the launcher.
//! let registry = ComponentRegistry::new();
//! let report = Launcher::new(registry).launch("drydock.json").await?;
//! report.context().terminated().await;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod cluster;
pub mod component;
pub mod config;
pub mod deploy;
pub mod error;
pub mod runtime;
pub mod shutdown;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
