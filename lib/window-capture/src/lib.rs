mod cursor;
mod frame_store;
mod geometry;

pub use crossbeam::channel::Receiver;
pub use cursor::*;
pub use frame_store::*;
pub use geometry::*;

/// Bytes per pixel of every captured frame (B, G, R, A).
pub const BYTES_PER_PIXEL: usize = 4;

/// Errors that end a capture session before or while it is being set up.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("Failed to connect to the display server: {0}")]
    ConnectionFailed(String),

    #[error("Required extension not available: {0}")]
    ExtensionNotAvailable(String),

    #[error("Can't capture window: {0}")]
    TargetUnavailable(String),

    #[error("Frame store failed: {0}")]
    FrameStore(#[from] FrameStoreError),

    #[error("{0}")]
    Other(String),
}

/// A single image fetch did not complete. The page it targeted is unchanged.
#[derive(thiserror::Error, Debug, Clone)]
pub enum FetchError {
    #[error("drawing target is not valid: {0}")]
    InvalidTarget(String),

    #[error("fetch region {0:?} does not fit into the page")]
    RegionTooLarge(LogicalSize),

    #[error("{0}")]
    Other(String),
}

/// Cursor state could not be obtained. The frame is recorded without a cursor.
#[derive(thiserror::Error, Debug, Clone)]
pub enum CursorError {
    #[error("Failed to query cursor image: {0}")]
    QueryFailed(String),

    #[error("Failed to translate cursor coordinates: {0}")]
    TranslateFailed(String),
}

/// A source of window pixels, cursor state and window size changes.
///
/// The recorder is generic over this trait; the X11 backend lives in
/// `window-capture-x11` and tests use in-memory implementations.
pub trait WindowCapture {
    /// Current size of the captured window.
    fn window_size(&mut self) -> Result<LogicalSize, CaptureError>;

    /// Share the frame store with the display server before the first fetch.
    fn attach_store(&mut self, _store: &FrameStore) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Start delivering window size changes on a bounded channel.
    fn watch_resize(&mut self, capacity: usize) -> Result<Receiver<LogicalSize>, CaptureError>;

    /// Drop the current drawing target and obtain a new one for the window.
    fn rebind(&mut self) -> Result<(), CaptureError>;

    /// Write `region.width * region.height` packed BGRA pixels to the start of `page`.
    ///
    /// On error `page` must be left untouched.
    fn fetch(&mut self, region: LogicalSize, page: &mut Page) -> Result<(), FetchError>;

    fn query_cursor(&mut self) -> Result<CursorImage, CursorError>;

    /// Translate root window coordinates into coordinates local to the captured window.
    fn translate(&mut self, root: Position) -> Result<Position, CursorError>;
}
