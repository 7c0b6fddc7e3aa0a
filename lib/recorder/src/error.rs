use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Capture setup failed: {0}")]
    CaptureFailed(#[from] window_capture::CaptureError),

    #[error("Frame store failed: {0}")]
    FrameStoreFailed(#[from] window_capture::FrameStoreError),

    #[error("Matroska writer failed: {0}")]
    MkvFailed(#[from] mkv::MkvError),

    #[error("Sink failed: {0}")]
    SinkFailed(String),

    #[error("Invalid configuration parameters: {0}")]
    InvalidConfig(String),

    #[error("Recording session is not started")]
    NotStarted,

    #[error("Worker thread `{0}` panicked")]
    WorkerPanicked(&'static str),

    #[error("{0}")]
    Other(String),
}
