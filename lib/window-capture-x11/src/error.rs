use window_capture::CaptureError;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to connect to the X server")]
    Connect(#[from] ConnectError),

    #[error("X connection failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("X request failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    #[error("X server does not support the {0} extension")]
    MissingExtension(&'static str),

    #[error("{name} {found_major}.{found_minor} is too old, {major}.{minor} is required")]
    UnsupportedVersion {
        name: &'static str,
        major: u32,
        minor: u32,
        found_major: u32,
        found_minor: u32,
    },

    #[error("can't redirect window {0:#x}, another program seems to be capturing it already")]
    AlreadyRedirected(u32),

    #[error("window {0:#x} is not viewable: {1}")]
    InvalidWindow(u32, String),

    #[error("{0}")]
    Other(String),
}

impl From<Error> for CaptureError {
    fn from(e: Error) -> Self {
        match e {
            Error::Connect(_) | Error::Connection(_) => CaptureError::ConnectionFailed(e.to_string()),
            Error::MissingExtension(_) | Error::UnsupportedVersion { .. } => {
                CaptureError::ExtensionNotAvailable(e.to_string())
            }
            Error::AlreadyRedirected(_) | Error::InvalidWindow(..) => {
                CaptureError::TargetUnavailable(e.to_string())
            }
            _ => CaptureError::Other(e.to_string()),
        }
    }
}
