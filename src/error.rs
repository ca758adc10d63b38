use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::component::InstanceId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {path:?} could not be read: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unresolved placeholder `${{{name}}}` in {path:?}")]
    UnresolvedPlaceholder { name: String, path: PathBuf },

    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors that abort runtime startup.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("clustered runtime requested but no cluster config reference was provided")]
    ClusterConfigMissing,

    #[error("cluster config {path:?} could not be read")]
    ClusterConfigNotFound { path: PathBuf },

    #[error("cluster join rejected: {0}")]
    ClusterJoinRejected(String),

    #[error("clustered runtime requested but no membership provider was supplied")]
    NoMembershipProvider,
}

/// Per-component deployment failures.
///
/// Isolated to the component that produced them; they never abort the
/// batch or the running context.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("no component registered under `{0}`")]
    UnknownComponent(String),

    #[error("invalid deployment options for `{identifier}`: {reason}")]
    InvalidOptions { identifier: String, reason: String },

    #[error("component `{identifier}` failed to start: {source}")]
    Start {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("runtime is draining, deployment of `{0}` refused")]
    Draining(String),

    #[error("deployment task for `{0}` panicked")]
    Panicked(String),
}

/// Per-instance undeployment failures. Logged during draining, never fatal.
#[derive(Error, Debug)]
pub enum UndeployError {
    #[error("no active component instance {0}")]
    UnknownInstance(InstanceId),

    #[error("component instance {instance} (`{identifier}`) failed to stop: {source}")]
    Stop {
        instance: InstanceId,
        identifier: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Undeploy(#[from] UndeployError),
}

pub type Result<T> = std::result::Result<T, Error>;
