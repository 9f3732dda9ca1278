//! Concrete collaborators for the liverec engine.
//!
//! - [`HttpLiveSource`]: plain HTTP(S) streams, with handles mapped to
//!   stream URLs through a watch list.
//! - [`WatchlistDirectory`]: treats the watch list as a follower list.
//! - [`FfmpegConverter`]: remuxes finished segments in the background.
//! - [`TelegramNotifier`]: sends lifecycle messages through a bot.

pub mod ffmpeg;
pub mod http_source;
pub mod telegram;
pub mod watchlist;

#[cfg(test)]
mod test_server;

pub use ffmpeg::{command_exists, FfmpegConverter};
pub use http_source::HttpLiveSource;
pub use telegram::TelegramNotifier;
pub use watchlist::{Watchlist, WatchlistDirectory};
