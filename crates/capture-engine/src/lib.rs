//! Liverec Capture Engine
//!
//! Turns live broadcasts into segmented files on disk. A mode controller
//! decides what to record; recording tasks pull chunks from a live source
//! and push them through a segment writer, which hands every finished
//! segment to post-processing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                  ModeController                  │
//! │   single │ polling │ fan-out ─► FanOutSupervisor │
//! └──────────────────────┬───────────────────────────┘
//!                        │ one per target
//!                        ▼
//!              ┌───────────────────┐    chunks   ┌────────────┐
//!              │   RecordingTask   │ ◄────────── │ LiveSource │
//!              └─────────┬─────────┘             └────────────┘
//!                        ▼
//!              ┌───────────────────┐  finished   ┌───────────────┐
//!              │   SegmentWriter   │ ──────────► │ PostProcessor │
//!              └───────────────────┘             └───────────────┘
//! ```

pub mod controller;
pub mod notify;
pub mod retry;
pub mod session;
pub mod supervisor;
pub mod writer;

#[cfg(test)]
mod testing;

pub use controller::{ModeController, TargetRequest};
pub use notify::Notifications;
pub use session::*;
pub use supervisor::FanOutSupervisor;
pub use writer::{SegmentHandoff, SegmentWriter};
