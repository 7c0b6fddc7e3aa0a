//! # Window Recorder Library
//!
//! Records a single window at a fixed frame rate. Two threads share a
//! double-buffered frame store:
//!
//! 1. **Capture loop**: follows window resizes, fetches window pixels into a
//!    free page, pads or clamps them to the store size, draws the cursor and
//!    hands the page over through a rendezvous channel.
//! 2. **Pacer**: ticks at the configured fps and hands exactly one frame per
//!    tick to a [`FrameSink`]. When no new page arrived since the last tick the
//!    previous frame is emitted again and counted as dropped.
//!
//! A page handed to the pacer is not written again until the pacer has taken
//! a newer one, so no locks guard the frame store.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mkv::{MatroskaWriter, VideoTrackBuilder};
//! use recorder::{FPS, RecorderConfig, RecorderError, RecordingSession, WindowCapture};
//!
//! fn record(source: impl WindowCapture + Send + 'static) -> Result<(), RecorderError> {
//!     let config = RecorderConfig::new().with_fps(FPS::Fps30);
//!     let mut session = RecordingSession::new(config);
//!
//!     session.start(source, |size| {
//!         let track = VideoTrackBuilder::default()
//!             .width(size.width)
//!             .height(size.height)
//!             .fps(30)
//!             .build()
//!             .map_err(mkv::MkvError::from)?;
//!         let file = std::fs::File::create("window.mkv")
//!             .map_err(|e| RecorderError::SinkFailed(e.to_string()))?;
//!         Ok(MatroskaWriter::new(file, track)?)
//!     })?;
//!
//!     let state = session.wait()?;
//!     println!("recording ended: {state:?}");
//!     Ok(())
//! }
//! ```

mod capture_loop;
mod compositor;
mod config;
mod error;
mod pacer;
mod recorder;
mod sink;
mod stats;

pub use capture_loop::{
    CaptureLoop, CaptureSession, CaptureStatus, CaptureStep, reconcile_partial_page,
};
pub use compositor::{blend_pixel, composite};
pub use config::{
    DEFAULT_RESIZE_CHANNEL_SIZE, FPS, MIN_PAGE_COUNT, RecorderConfig, SimpleFpsCounter,
    frame_timestamp,
};
pub use crossbeam::channel::{Receiver, Sender, bounded};
pub use error::RecorderError;
pub use pacer::{Pacer, TickOutcome};
pub use recorder::RecordingSession;
pub use sink::{FrameSink, TimedFrame};
pub use stats::{SessionStats, StatsSnapshot, StatsUser};
pub use window_capture::{
    CaptureError, CursorError, CursorImage, FetchError, FrameStore, LogicalSize, Page, Position,
    WindowCapture,
};

/// Final state of a recording session, returned by [`RecordingSession::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    /// The window went away and the capture side ended on its own
    Finished,
    /// The stop signal was raised
    Stopped,
}
