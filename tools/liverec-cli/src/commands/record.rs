//! Record a broadcast.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, ValueEnum};
use liverec_capture_engine::{ModeController, Notifications, TargetRequest, TaskServices};
use liverec_common::config::{AppConfig, RecordingConfig, RecordingMode};
use liverec_integrations::{
    command_exists, FfmpegConverter, HttpLiveSource, TelegramNotifier, Watchlist,
    WatchlistDirectory,
};
use liverec_platform_core::{KeepRaw, PostProcessor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Record now if live, otherwise fail
    Single,
    /// Wait for the target to go live, again and again
    Polling,
    /// Record every live entry of the watch list
    Followers,
}

impl From<ModeArg> for RecordingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => Self::Single,
            ModeArg::Polling => Self::Polling,
            ModeArg::Followers => Self::FanOut,
        }
    }
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Handle of the target
    #[arg(short, long)]
    pub user: Option<String>,

    /// Room id (for HTTP sources, the stream URL)
    #[arg(long)]
    pub room_id: Option<String>,

    /// Stream or profile URL
    #[arg(long)]
    pub url: Option<String>,

    /// Recording strategy
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Minutes between live checks
    #[arg(long)]
    pub interval: Option<u64>,

    /// Stop each recording after this many seconds
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Segment length in seconds
    #[arg(long)]
    pub segment: Option<u64>,

    /// Output root directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON file mapping handles to stream URLs
    #[arg(long)]
    pub watchlist: Option<PathBuf>,

    /// Send Telegram notifications
    #[arg(long)]
    pub telegram: bool,
}

impl RecordArgs {
    /// Flags win over config file values.
    pub fn apply(&self, config: &mut RecordingConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(interval) = self.interval {
            config.poll_interval_mins = interval;
        }
        if let Some(duration) = self.duration {
            config.duration_secs = Some(duration);
        }
        if let Some(segment) = self.segment {
            config.segment_duration_secs = segment;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.telegram {
            config.notifications = true;
        }
    }

    fn request(&self) -> TargetRequest {
        TargetRequest {
            user: self.user.clone(),
            room_id: self.room_id.clone(),
            url: self.url.clone(),
        }
    }
}

pub async fn run(mut config: AppConfig, args: RecordArgs) -> anyhow::Result<()> {
    args.apply(&mut config.recording);
    config.recording.validate()?;

    let watchlist = args.watchlist.clone().map(Watchlist::new);
    let source = Arc::new(HttpLiveSource::new(watchlist.clone())?);

    let converter = config
        .converter
        .enabled
        .then(|| FfmpegConverter::from_config(&config.converter));
    if converter.is_some() && !command_exists(&config.converter.ffmpeg_path) {
        tracing::warn!(
            ffmpeg = %config.converter.ffmpeg_path,
            "ffmpeg not found; segments will fail to convert"
        );
    }
    let post_processor: Arc<dyn PostProcessor> = match &converter {
        Some(converter) => Arc::new(converter.clone()),
        None => Arc::new(KeepRaw),
    };

    let notifications = match (&config.telegram, config.recording.notifications) {
        (Some(telegram), true) => {
            Notifications::new(Arc::new(TelegramNotifier::new(telegram)?), true)
        }
        (None, true) => {
            tracing::warn!("Notifications requested but Telegram is not configured");
            Notifications::disabled()
        }
        _ => Notifications::disabled(),
    };

    let services = TaskServices {
        source,
        post_processor,
        notifications,
    };
    let mut controller = ModeController::new(config.recording.clone(), services)?;
    if controller.mode() == RecordingMode::FanOut {
        let list = watchlist.context("followers mode needs --watchlist")?;
        controller = controller.with_followers(Arc::new(WatchlistDirectory::new(list)));
    }

    let cancel = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stopping, finishing current segments");
            cancel.cancel();
        }
    });

    println!("Recording to {}", config.recording.output_dir.display());
    println!("Press Ctrl+C to stop...");
    println!();

    let outcome = controller.run(args.request()).await;

    if let Some(converter) = converter {
        if converter.in_flight() > 0 {
            println!("Waiting for {} conversion(s)...", converter.in_flight());
        }
        converter.drain().await;
    }

    outcome?;
    Ok(())
}
