use crate::{
    CaptureLoop, CaptureStatus, FrameSink, Pacer, ProgressState, RecorderConfig, RecorderError,
    SessionStats, StatsUser,
};
use crossbeam::channel::{Receiver, bounded};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};
use window_capture::{FrameStore, LogicalSize, WindowCapture};

const USER_CHANNEL_SIZE: usize = 64;

/// Runs the capture loop and the pacer on their own threads.
pub struct RecordingSession {
    config: RecorderConfig,
    stop_sig: Arc<AtomicBool>,
    stats: Arc<SessionStats>,

    store_size: Option<LogicalSize>,
    capture_worker: Option<JoinHandle<Result<CaptureStatus, RecorderError>>>,
    pacer_worker: Option<JoinHandle<Result<ProgressState, RecorderError>>>,
    status_receiver: Option<Receiver<StatsUser>>,

    start_time: Instant,
}

impl RecordingSession {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            stop_sig: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SessionStats::new()),
            store_size: None,
            capture_worker: None,
            pacer_worker: None,
            status_receiver: None,
            start_time: Instant::now(),
        }
    }

    /// Size the frame store after the window, then spawn both workers.
    ///
    /// `sink_factory` is called with the frame store size before any thread
    /// starts, so container headers can carry the final frame geometry.
    pub fn start<C, S, F>(&mut self, mut source: C, sink_factory: F) -> Result<(), RecorderError>
    where
        C: WindowCapture + Send + 'static,
        S: FrameSink + Send + 'static,
        F: FnOnce(LogicalSize) -> Result<S, RecorderError>,
    {
        self.config.validate()?;

        let window_size = source.window_size()?;
        if window_size.is_empty() {
            return Err(RecorderError::InvalidConfig(format!(
                "window size {window_size} has no pixels"
            )));
        }

        let store = FrameStore::create(
            window_size.width,
            window_size.height,
            self.config.page_count,
        )?;
        source.attach_store(&store)?;
        let resize_receiver = source.watch_resize(self.config.resize_channel_size)?;

        let store_size = store.size();
        let sink = sink_factory(store_size)?;

        let pages = store.into_pages();
        let (free_sender, free_receiver) = bounded(pages.len());
        for page in pages {
            if free_sender.try_send(page).is_err() {
                return Err(RecorderError::Other("free page queue is full".to_string()));
            }
        }

        // rendezvous: the capture loop blocks until the pacer takes the page
        let (handoff_sender, handoff_receiver) = bounded(0);

        let status_sender = if self.config.enable_status_channel {
            let (sender, receiver) = bounded(USER_CHANNEL_SIZE);
            self.status_receiver = Some(receiver);
            Some(sender)
        } else {
            None
        };

        self.start_time = Instant::now();
        self.store_size = Some(store_size);

        let capture_loop = CaptureLoop::new(
            source,
            self.config.clone(),
            window_size,
            store_size,
            resize_receiver,
            free_receiver,
            handoff_sender,
            self.stop_sig.clone(),
            self.stats.clone(),
        );

        self.capture_worker = Some(thread::spawn(move || capture_loop.run()));

        let pacer = Pacer::new(
            self.config.fps.to_u32(),
            handoff_receiver,
            free_sender,
            self.stats.clone(),
            store_size,
        )
        .with_status_sender(status_sender);

        let stop_sig = self.stop_sig.clone();
        self.pacer_worker = Some(thread::spawn(move || {
            let result = pacer.run(sink, stop_sig.clone());
            if let Err(ref e) = result {
                log::warn!("pacer failed: {e}");
                stop_sig.store(true, Ordering::Relaxed);
            }
            result
        }));

        log::info!(
            "recording started: window {window_size}, {} fps ({:.2?} per frame), {} pages",
            self.config.fps.to_u32(),
            self.config.frame_interval(),
            self.config.page_count
        );

        Ok(())
    }

    /// Join both workers and log a summary.
    pub fn wait(mut self) -> Result<ProgressState, RecorderError> {
        let (Some(capture_worker), Some(pacer_worker)) =
            (self.capture_worker.take(), self.pacer_worker.take())
        else {
            return Err(RecorderError::NotStarted);
        };

        let pacer_result = pacer_worker
            .join()
            .map_err(|_| RecorderError::WorkerPanicked("pacer"))?;

        // the pacer dropped its channel ends, so the capture loop is released
        self.stop_sig.store(true, Ordering::Relaxed);

        let capture_result = capture_worker
            .join()
            .map_err(|_| RecorderError::WorkerPanicked("capture"))?;

        let snapshot = self.stats.snapshot();
        log::info!(
            "recording finished in {:.2?}. frames: {}. dropped: {} ({:.2}%). captured: {}. fetch failures: {}",
            self.start_time.elapsed(),
            snapshot.emitted_frames,
            snapshot.dropped_frames,
            snapshot.dropped_percent(),
            snapshot.captured_frames,
            snapshot.fetch_failures,
        );

        let state = pacer_result?;
        capture_result?;
        Ok(state)
    }

    pub fn stop(&self) {
        self.stop_sig.store(true, Ordering::Relaxed);
    }

    pub fn get_stop_sig(&self) -> Arc<AtomicBool> {
        self.stop_sig.clone()
    }

    pub fn get_status_receiver(&self) -> Option<Receiver<StatsUser>> {
        self.status_receiver.clone()
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }

    /// Frame store size, known once the session is started.
    pub fn store_size(&self) -> Option<LogicalSize> {
        self.store_size
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.stop_sig.store(true, Ordering::Relaxed);
    }
}
