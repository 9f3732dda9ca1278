//! Check external tools and notification setup.

use liverec_common::config::{config_file_path, AppConfig};
use liverec_integrations::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("liverec System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = &config.converter.ffmpeg_path;
    match (config.converter.enabled, command_exists(ffmpeg)) {
        (false, _) => println!("[--] Conversion disabled; raw segments are kept"),
        (true, true) => println!("[OK] ffmpeg: {ffmpeg}"),
        (true, false) => println!("[WARN] ffmpeg not found: {ffmpeg}"),
    }

    match &config.telegram {
        Some(telegram) => println!("[OK] Telegram chat: {}", telegram.chat_id),
        None => println!("[--] Telegram not configured"),
    }

    match config.recording.validate() {
        Ok(()) => println!("[OK] Recording settings valid"),
        Err(e) => println!("[WARN] {e}"),
    }

    println!();
    println!("Config file: {}", config_file_path().display());
    println!("Output root: {}", config.recording.output_dir.display());

    Ok(())
}
