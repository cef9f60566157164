pub mod run;
pub mod status;
pub mod sync;

use anyhow::Result;
use seadex_monitor::config::Config;

// Re-export command functions for convenience
pub use run::run;
pub use status::status;
pub use sync::sync;

/// Print the effective configuration as TOML
pub fn show_config(config: &Config) -> Result<()> {
    print!("{}", config.redacted().to_toml()?);
    Ok(())
}
