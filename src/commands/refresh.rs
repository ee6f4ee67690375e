use anyhow::Result;
use std::path::PathBuf;

use docs_hub::refresh::RefreshCoordinator;

use super::load_config;

/// Run a single refresh against the configured backends
pub async fn refresh(config: Option<PathBuf>, service: Option<String>) -> Result<()> {
    let config = load_config(config)?;
    let coordinator = RefreshCoordinator::from_config(&config)?;

    if let Some(name) = service {
        coordinator.refresh_service(&name).await?;
        let doc = coordinator.cache().get(&name).await?;
        println!(
            "{}: healthy={} document={}",
            doc.name,
            doc.healthy,
            if doc.has_document() { "yes" } else { "no" }
        );
        return Ok(());
    }

    let report = coordinator.refresh_all().await;

    println!("Refresh Complete");
    println!("================");
    println!("  Duration: {:?}", report.duration);
    println!("  Succeeded: {}", report.succeeded.len());
    println!("  Failed: {}", report.failed.len());

    for summary in coordinator.cache().get_catalog().await {
        let state = if summary.healthy { "up" } else { "down" };
        println!("  {:<20} {state}", summary.name);
    }

    if !report.failed.is_empty() {
        println!();
        println!("Failures:");
        for failure in &report.failed {
            println!("  {}: {}", failure.name, failure.error);
        }
    }

    Ok(())
}
