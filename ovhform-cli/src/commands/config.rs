use anyhow::Result;

use crate::config::Config;

pub fn show(config: &Config, show_secrets: bool) -> Result<()> {
    println!("ovhform Configuration");
    println!("{}", "=".repeat(80));
    println!();

    println!("API:");
    println!("  Endpoint:          {}", config.endpoint);
    println!("  Base URL:          {}", config.base_url);
    println!("  HTTP timeout:      {:?}", config.http_timeout);
    println!();

    println!("Credentials:");
    print_secret("OVH_APPLICATION_KEY", config.application_key.as_deref(), show_secrets);
    print_secret("OVH_APPLICATION_SECRET", config.application_secret.as_deref(), show_secrets);
    print_secret("OVH_CONSUMER_KEY", config.consumer_key.as_deref(), show_secrets);
    println!();

    println!("Waiting:");
    println!("  Poll interval:     {:?}", config.poll_interval);
    println!("  Wait timeout:      {:?}", config.wait_timeout);
    println!();

    println!("Logging:");
    match &config.log_file {
        Some(path) => println!("  Log file:          {}", path.display()),
        None => println!("  Log file:          not set (stderr)"),
    }
    println!(
        "  RUST_LOG:          {}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| "not set".to_string())
    );

    if !show_secrets {
        println!();
        println!("Use --show-secrets to reveal hidden values (not recommended)");
    }

    Ok(())
}

fn print_secret(name: &str, value: Option<&str>, show_secrets: bool) {
    match value {
        Some(value) if show_secrets => println!("  {:<24} ✓ Set ({})", name, value),
        Some(_) => println!("  {:<24} ✓ Set (***hidden***)", name),
        None => println!("  {:<24} ✗ Not set", name),
    }
}
