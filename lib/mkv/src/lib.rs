//! Matroska muxer for uncompressed BGRA video, built on `webm-iterable`.
//!
//! Frames are stored as `V_MS/VFW/FOURCC` with a top-down `BITMAPINFOHEADER`,
//! one cluster per frame, inside a live segment of unknown size so the output
//! can be streamed to a pipe.

pub mod bitmap;
pub mod matroska;

pub use bitmap::BitmapInfoHeader;
pub use matroska::{MatroskaWriter, MkvError, VideoTrack, VideoTrackBuilder};
