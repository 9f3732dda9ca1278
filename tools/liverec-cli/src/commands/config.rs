//! Show or persist the effective configuration.

use std::path::Path;

use liverec_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, path: Option<&Path>, save: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        let target = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
        config.save_to(&target)?;
        println!();
        println!("Saved to {}", target.display());
    }
    Ok(())
}
