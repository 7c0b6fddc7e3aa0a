use crate::RecorderError;
use derive_setters::Setters;
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

pub const DEFAULT_RESIZE_CHANNEL_SIZE: usize = 10_000;
pub const MIN_PAGE_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FPS {
    Fps24,
    Fps25,
    Fps30,
    Fps60,
    Custom(u32),
}

impl FPS {
    pub fn to_u32(&self) -> u32 {
        match self {
            FPS::Fps24 => 24,
            FPS::Fps25 => 25,
            FPS::Fps30 => 30,
            FPS::Fps60 => 60,
            FPS::Custom(v) => *v,
        }
    }
}

impl From<u32> for FPS {
    fn from(value: u32) -> Self {
        match value {
            24 => FPS::Fps24,
            25 => FPS::Fps25,
            30 => FPS::Fps30,
            60 => FPS::Fps60,
            v => FPS::Custom(v),
        }
    }
}

/// Presentation timestamp of output frame `index`, computed in whole nanoseconds.
pub fn frame_timestamp(index: u64, fps: u32) -> Duration {
    let nanos = index as u128 * 1_000_000_000 / fps.max(1) as u128;
    Duration::from_nanos(nanos as u64)
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct RecorderConfig {
    pub fps: FPS,
    pub include_cursor: bool,

    /// Number of frame store pages; double buffering needs at least two
    pub page_count: usize,

    pub resize_channel_size: usize,

    /// Upper bound for any blocking wait of the capture loop before it
    /// re-checks the stop signal
    pub poll_interval: Duration,

    pub enable_status_channel: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderConfig {
    pub fn new() -> Self {
        Self {
            fps: FPS::Fps60,
            include_cursor: true,
            page_count: MIN_PAGE_COUNT,
            resize_channel_size: DEFAULT_RESIZE_CHANNEL_SIZE,
            poll_interval: Duration::from_millis(50),
            enable_status_channel: false,
        }
    }

    /// Time between two pacer ticks.
    ///
    /// ```
    /// use recorder::{FPS, RecorderConfig};
    ///
    /// let config = RecorderConfig::new().with_fps(FPS::Fps60);
    /// assert_eq!(config.frame_interval().as_nanos(), 16_666_666);
    /// ```
    pub fn frame_interval(&self) -> Duration {
        frame_timestamp(1, self.fps.to_u32())
    }

    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.fps.to_u32() == 0 {
            return Err(RecorderError::InvalidConfig("fps must be positive".to_string()));
        }

        if self.page_count < MIN_PAGE_COUNT {
            return Err(RecorderError::InvalidConfig(format!(
                "page count {} is below {MIN_PAGE_COUNT}: the pacer keeps one page while the capture loop fills another",
                self.page_count
            )));
        }

        if self.resize_channel_size == 0 {
            return Err(RecorderError::InvalidConfig(
                "resize channel size must be positive".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(RecorderError::InvalidConfig(
                "poll interval must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Frame rate over a sliding three second window.
#[derive(Debug, Default, Clone)]
pub struct SimpleFpsCounter {
    pub fps: f32,
    frames: VecDeque<Instant>,
}

impl SimpleFpsCounter {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            fps: 0.0,
        }
    }

    pub fn add_frame(&mut self, timestamp: Instant) -> f32 {
        if let Some(three_seconds_ago) = timestamp.checked_sub(Duration::from_secs(3)) {
            while let Some(&oldest) = self.frames.front() {
                if oldest < three_seconds_ago {
                    self.frames.pop_front();
                } else {
                    break;
                }
            }
        }

        self.frames.push_back(timestamp);

        if let Some(&oldest) = self.frames.front()
            && self.frames.len() >= 2
        {
            let time_span = timestamp.duration_since(oldest).as_secs_f64();
            if time_span > 0.0 {
                self.fps = ((self.frames.len() - 1) as f64 / time_span) as f32;
                return self.fps;
            }
        }

        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_timestamp() {
        assert_eq!(frame_timestamp(0, 60), Duration::ZERO);
        assert_eq!(frame_timestamp(60, 60), Duration::from_secs(1));
        assert_eq!(frame_timestamp(1, 60).as_nanos(), 16_666_666);
        assert_eq!(frame_timestamp(2, 60).as_nanos(), 33_333_333);
        assert_eq!(frame_timestamp(3, 30).as_nanos(), 100_000_000);
    }

    #[test]
    fn test_fps_from_u32() {
        assert_eq!(FPS::from(60), FPS::Fps60);
        assert_eq!(FPS::from(50), FPS::Custom(50));
        assert_eq!(FPS::Custom(50).to_u32(), 50);
    }

    #[test]
    fn test_validate() {
        assert!(RecorderConfig::new().validate().is_ok());

        for config in [
            RecorderConfig::new().with_page_count(1),
            RecorderConfig::new().with_fps(FPS::Custom(0)),
            RecorderConfig::new().with_resize_channel_size(0),
            RecorderConfig::new().with_poll_interval(Duration::ZERO),
        ] {
            assert!(matches!(
                config.validate(),
                Err(RecorderError::InvalidConfig(_))
            ));
        }

        assert!(RecorderConfig::new().with_page_count(3).validate().is_ok());
    }

    #[test]
    fn test_fps_counter() {
        let mut counter = SimpleFpsCounter::new();
        let start = Instant::now();

        assert_eq!(counter.add_frame(start), 0.0);
        for i in 1..=10 {
            counter.add_frame(start + Duration::from_millis(100 * i));
        }

        assert!((counter.fps - 10.0).abs() < 0.01);
    }
}
