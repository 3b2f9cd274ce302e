//! Keel operator - make-right reconciliation for Domain resources

use std::sync::Arc;

use clap::Parser;
use kube::Client;
use tracing::{info, warn};

use keel_common::telemetry::init_telemetry;
use keel_common::OsEnvIdentity;
use keel_events::KubeEventSink;
use keel_operator::config::Args;
use keel_operator::DomainProcessor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_telemetry(args.telemetry_config())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let sink = KubeEventSink::new(client).with_retry(args.retry_config());
    let processor = DomainProcessor::builder(Arc::new(OsEnvIdentity), Arc::new(sink))
        .config(args.processor_config())
        .build();

    for namespace in &args.namespaces {
        if let Err(e) = processor.start_namespace_watching(namespace).await {
            warn!(namespace = %namespace, error = %e, "Failed to report namespace watch start");
        }
    }
    info!(namespaces = ?args.namespaces, "keel operator running");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    for namespace in &args.namespaces {
        if let Err(e) = processor.stop_namespace_watching(namespace).await {
            warn!(namespace = %namespace, error = %e, "Failed to report namespace watch stop");
        }
    }
    Ok(())
}
