use anyhow::Result;
use std::path::PathBuf;

use super::load_config;

/// Validate the config and print the resolved settings
pub fn check(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;

    println!("Configuration OK");
    println!("================");
    println!("  Environment: {}", display_or_dash(&config.environment));
    println!("  Tenant: {}", display_or_dash(&config.tenant));
    println!("  Region: {}", display_or_dash(&config.region));
    println!("  Listen: {}", config.bind_address());
    println!("  Refresh interval: {:?}", config.refresh_duration());
    println!("  Fetch timeout: {:?}", config.fetch_timeout());
    println!();
    println!("Services ({}):", config.services.len());
    for service in &config.services {
        println!("  {:<20} {}", service.name, service.doc_url());
    }

    Ok(())
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
