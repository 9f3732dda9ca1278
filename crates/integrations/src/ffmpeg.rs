//! Container conversion with ffmpeg.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use liverec_common::config::ConverterConfig;
use liverec_common::error::{LiverecError, LiverecResult};
use liverec_platform_core::{converted_path, PostProcessor};
use tokio::process::Command;
use tokio_util::task::TaskTracker;

/// Remuxes raw captures into `.mp4` without re-encoding.
///
/// Clones share the set of in-flight conversions.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    ffmpeg: String,
    remove_raw: bool,
    pending: TaskTracker,
}

impl FfmpegConverter {
    pub fn new(ffmpeg: impl Into<String>, remove_raw: bool) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            remove_raw,
            pending: TaskTracker::new(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.ffmpeg_path.clone(), config.remove_raw)
    }

    /// Convert `raw` and wait for ffmpeg to finish.
    ///
    /// On success the raw file is removed if configured; on failure it is
    /// always kept.
    pub async fn convert_now(&self, raw: &Path) -> LiverecResult<PathBuf> {
        let output = converted_path(raw);
        tracing::debug!(raw = %raw.display(), output = %output.display(), "Running ffmpeg");

        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(raw)
            .args(["-c", "copy"])
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| LiverecError::post_process(format!("failed to start ffmpeg: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(LiverecError::post_process(format!(
                "ffmpeg failed (status {}): {}",
                result.status,
                stderr.trim()
            )));
        }

        if self.remove_raw {
            tokio::fs::remove_file(raw).await?;
        }
        Ok(output)
    }

    /// Conversions started but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Wait for every started conversion. Later handoffs still run but are
    /// not waited for.
    pub async fn drain(&self) {
        self.pending.close();
        self.pending.wait().await;
    }
}

impl PostProcessor for FfmpegConverter {
    fn convert(&self, raw_path: PathBuf) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(path = %raw_path.display(), "No runtime, leaving segment unconverted");
            return;
        };
        let converter = self.clone();
        let job = async move {
            match converter.convert_now(&raw_path).await {
                Ok(output) => tracing::info!(path = %output.display(), "Finished converting"),
                Err(e) => {
                    tracing::error!(path = %raw_path.display(), error = %e, "Conversion failed")
                }
            }
        };
        self.pending.spawn_on(job, &runtime);
    }
}

/// Whether `binary` resolves on `PATH` (or is an existing path).
pub fn command_exists(binary: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("command -v '{binary}' >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_keeps_raw() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("alice_2026-01-01_12-00-00_flv.mp4");
        std::fs::write(&raw, b"raw").unwrap();

        let converter = FfmpegConverter::new("/nonexistent/ffmpeg", true);
        let err = converter.convert_now(&raw).await.unwrap_err();
        assert!(matches!(err, LiverecError::PostProcess { .. }));
        assert!(raw.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_writes_output_and_removes_raw() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // Stand-in for ffmpeg: copies the `-i` input to the last argument.
        let fake = dir.path().join("fake-ffmpeg");
        std::fs::write(&fake, "#!/bin/sh\ncp \"$3\" \"$6\"\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let raw = dir.path().join("alice_2026-01-01_12-00-00_flv.mp4");
        std::fs::write(&raw, b"payload").unwrap();

        let converter = FfmpegConverter::new(fake.display().to_string(), true);
        let output = converter.convert_now(&raw).await.unwrap();
        assert_eq!(output, dir.path().join("alice_2026-01-01_12-00-00.mp4"));
        assert_eq!(std::fs::read(&output).unwrap(), b"payload");
        assert!(!raw.exists());
    }

    #[tokio::test]
    async fn test_background_conversion_is_drained() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("bob_2026-01-01_12-00-00_flv.mp4");
        std::fs::write(&raw, b"raw").unwrap();

        let converter = FfmpegConverter::new("/nonexistent/ffmpeg", true);
        converter.convert(raw.clone());
        converter.drain().await;
        assert_eq!(converter.in_flight(), 0);
        assert!(raw.exists());
    }

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("liverec-no-such-binary"));
    }
}
