//! `targetd config` – show where the config lives and what is in effect.

use anyhow::Result;
use targetd_core::config::{self, TargetdConfig};

pub fn show_config(cfg: &TargetdConfig) -> Result<()> {
    // Validate so a bad file is reported here rather than at `run`.
    let refresh = cfg.refresh.to_refresh_config()?;
    println!("# {}", config::config_path()?.display());
    print!("{}", cfg.to_toml()?);
    tracing::debug!("effective refresh config: {:?}", refresh);
    Ok(())
}
