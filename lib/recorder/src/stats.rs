use std::{
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
    time::Duration,
};
use window_capture::LogicalSize;

/// Counters shared by the capture loop and the pacer.
#[derive(Debug, Default)]
pub struct SessionStats {
    emitted_frames: AtomicU64,
    dropped_frames: AtomicU64,
    warmup_ticks: AtomicU64,
    captured_frames: AtomicU64,
    fetch_failures: AtomicU64,
    cursor_misses: AtomicU64,
    resize_events: AtomicU64,

    window_width: AtomicU32,
    window_height: AtomicU32,
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub emitted_frames: u64,
    pub dropped_frames: u64,
    pub warmup_ticks: u64,
    pub captured_frames: u64,
    pub fetch_failures: u64,
    pub cursor_misses: u64,
    pub resize_events: u64,
    pub window_size: LogicalSize,
}

impl StatsSnapshot {
    pub fn dropped_percent(&self) -> f64 {
        self.dropped_frames as f64 * 100.0 / self.emitted_frames.max(1) as f64
    }
}

/// Status update sent to the user channel once per pacer tick.
#[derive(Debug, Clone)]
pub struct StatsUser {
    /// Time since the previous tick
    pub frame_time: Duration,
    pub fps: f32,
    pub average_fps: f32,
    pub total_frames: u64,
    pub loss_frames: u64,
    pub window_size: LogicalSize,
    pub store_size: LogicalSize,
}

impl std::fmt::Display for StatsUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Frame time: {:>14} ({:>6.2} FPS, {:>6.2} avg); {:>5} dropped; {:>4}x{:<4} -> {:>4}x{:<4}",
            format!("{:.2?}", self.frame_time),
            self.fps,
            self.average_fps,
            self.loss_frames,
            self.window_size.width,
            self.window_size.height,
            self.store_size.width,
            self.store_size.height,
        )
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_emitted(&self, duplicate: bool) {
        self.emitted_frames.fetch_add(1, Ordering::Relaxed);
        if duplicate {
            self.dropped_frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn add_warmup_tick(&self) {
        self.warmup_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_captured(&self) {
        self.captured_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_cursor_miss(&self) {
        self.cursor_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_resize_event(&self) {
        self.resize_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_window_size(&self, size: LogicalSize) {
        self.window_width.store(size.width, Ordering::Relaxed);
        self.window_height.store(size.height, Ordering::Relaxed);
    }

    /// Last window size seen by the capture loop. Width and height are stored
    /// separately and may briefly disagree during a resize.
    pub fn window_size(&self) -> LogicalSize {
        LogicalSize::new(
            self.window_width.load(Ordering::Relaxed),
            self.window_height.load(Ordering::Relaxed),
        )
    }

    pub fn emitted_frames(&self) -> u64 {
        self.emitted_frames.load(Ordering::Relaxed)
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            emitted_frames: self.emitted_frames.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            warmup_ticks: self.warmup_ticks.load(Ordering::Relaxed),
            captured_frames: self.captured_frames.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            cursor_misses: self.cursor_misses.load(Ordering::Relaxed),
            resize_events: self.resize_events.load(Ordering::Relaxed),
            window_size: self.window_size(),
        }
    }
}
