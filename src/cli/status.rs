use colored::Colorize;

use crate::advisor::Advisor;
use crate::error::Result;
use crate::models::ServiceStatus;
use crate::settings::{load_settings, settings_path, AdviceConfig};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let config = AdviceConfig::resolve(&settings);

    println!("Settings:   {}", settings_path().display());
    println!("Model:      {}", config.model);
    println!("Endpoint:   {}", config.base_url);
    println!("API key:    {}", if config.has_credential() { "configured" } else { "(not set)" });
    println!(
        "Rules:      {}",
        settings.rules_file.as_deref().unwrap_or("(built-in)")
    );
    println!("Cache:      {}", if settings.use_cache { "on" } else { "off" });

    let status = Advisor::from_config(&config).probe();
    let label = match status {
        ServiceStatus::Available => status.to_string().green(),
        ServiceStatus::Degraded => status.to_string().yellow(),
        ServiceStatus::Unavailable => status.to_string().red(),
    };
    println!();
    println!("Advice service: {label}");
    if status == ServiceStatus::Unavailable && !config.has_credential() {
        println!("Set an API key with `tally config --api-key <KEY>` to enable generated advice.");
    }
    Ok(())
}
