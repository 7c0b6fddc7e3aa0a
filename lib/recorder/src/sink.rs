use crate::RecorderError;
use mkv::MatroskaWriter;
use std::{io::Write, time::Duration};

/// One output frame as handed to a [`FrameSink`].
///
/// `data` borrows the frame store page the pacer currently holds, so it is only
/// valid for the duration of [`FrameSink::emit`].
#[derive(Debug, Clone, Copy)]
pub struct TimedFrame<'a> {
    /// Output sequence number, one per pacer tick, starting at 0
    pub index: u64,

    /// `index / fps`
    pub timestamp: Duration,

    /// The bytes repeat the previous frame because nothing new was captured in time
    pub duplicate: bool,

    /// Frame store page the bytes come from
    pub page_index: usize,

    /// Packed top-down BGRA rows
    pub data: &'a [u8],
}

impl TimedFrame<'_> {
    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp.as_nanos() as u64
    }
}

/// Receives frames in strictly increasing `index` order, one per pacer tick.
///
/// `emit` runs on the pacer thread. A slow sink delays the ticks that follow it;
/// the pacer then runs the missed ticks back to back, so timestamps stay exact.
pub trait FrameSink {
    fn emit(&mut self, frame: TimedFrame<'_>) -> Result<(), RecorderError>;

    /// Called once after the last frame.
    fn finish(&mut self) -> Result<(), RecorderError> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn emit(&mut self, frame: TimedFrame<'_>) -> Result<(), RecorderError> {
        (**self).emit(frame)
    }

    fn finish(&mut self) -> Result<(), RecorderError> {
        (**self).finish()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn emit(&mut self, frame: TimedFrame<'_>) -> Result<(), RecorderError> {
        (**self).emit(frame)
    }

    fn finish(&mut self) -> Result<(), RecorderError> {
        (**self).finish()
    }
}

impl<W: Write> FrameSink for MatroskaWriter<W> {
    fn emit(&mut self, frame: TimedFrame<'_>) -> Result<(), RecorderError> {
        self.write_frame(frame.timestamp_ns(), frame.data)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RecorderError> {
        self.flush()?;
        log::info!("matroska sink flushed: {} frames", self.frames_written());
        Ok(())
    }
}
