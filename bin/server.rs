// District Drift Audit - Web Server
// REST API with Axum over a master set loaded at startup
//
// Usage: drift-server <master.csv> [config.json]
// Env:   DRIFT_MASTER_COLUMN (default "district"), DRIFT_ADDR (default 0.0.0.0:3000)

use anyhow::{Context, Result};
use drift_audit::{api, load_label_column, AuditConfig, AuditOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🌐 District Drift Audit - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut args = std::env::args().skip(1);
    let master_path = args
        .next()
        .map(PathBuf::from)
        .context("Usage: drift-server <master.csv> [config.json]")?;

    let config = match args.next() {
        Some(path) => AuditConfig::from_json_file(&PathBuf::from(path))?,
        None => AuditConfig::default(),
    };

    let column = std::env::var("DRIFT_MASTER_COLUMN").unwrap_or_else(|_| "district".to_string());
    let master = load_label_column(&master_path, &column)?;
    println!("✓ Master set loaded: {} names from {:?}", master.len(), master_path);

    let orchestrator = AuditOrchestrator::new(master, config)?;
    info!(
        threshold = orchestrator.config().acceptance_threshold,
        floor = orchestrator.config().enrolment_significance_floor,
        "engine ready"
    );

    let app = api::router(Arc::new(orchestrator)).layer(CorsLayer::permissive());

    let addr = std::env::var("DRIFT_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/health", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
