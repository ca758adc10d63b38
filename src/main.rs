use drydock::app::Launcher;
use drydock::component::ComponentRegistry;
use drydock::config;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let conf_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DRYDOCK_CONF").ok())
        .unwrap_or_else(|| "drydock.json".to_string());

    let document = match config::resolve(&conf_path) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Failed to resolve config {conf_path}: {e}");
            std::process::exit(1);
        }
    };

    document.logging.init();
    info!(config = %conf_path, "drydock starting");

    // Components are registered by the embedding application; the bare
    // launcher starts with an empty registry.
    let registry = ComponentRegistry::new();

    let report = match Launcher::new(registry).launch_document(document).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    report.context().terminated().await;
    info!("drydock stopped");
}
