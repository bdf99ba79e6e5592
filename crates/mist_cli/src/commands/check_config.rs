//! Check-config command implementation.

use mist_server::ServerConfig;
use mist_store::{MemoryDriver, Store};
use std::path::PathBuf;

/// Runs the check-config command.
pub fn run(candidates: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let (path, config) = ServerConfig::load_first(candidates)?;
    println!("Checking configuration at {}", path.display());
    println!();

    match check(&config) {
        Ok(databases) => {
            println!("  Listener:  {}:{}", config.server.host, config.server.port);
            println!("  Databases: {}", databases.join(", "));
            println!(
                "  Default:   {}",
                config.database.effective_default().unwrap_or("(none)")
            );
            println!("  Tokens:    valid {} days", config.auth.token_expiry().as_secs() / 86_400);
            println!();
            println!("✓ Configuration is valid");
            Ok(())
        }
        Err(e) => {
            println!("✗ Configuration is invalid: {e}");
            Err(format!("Invalid configuration in {}", path.display()).into())
        }
    }
}

/// Validates every section, opening the database section against an
/// in-memory driver so that its checks run exactly as at startup.
///
/// Returns the database names.
pub fn check(config: &ServerConfig) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    config.validate()?;
    let store = Store::new(MemoryDriver::new());
    store.open_with(&config.database)?;
    let databases = store.databases();
    store.close(None)?;
    Ok(databases)
}
