use crate::{
    FrameSink, ProgressState, RecorderError, SessionStats, SimpleFpsCounter, StatsUser,
    TimedFrame, frame_timestamp,
};
use crossbeam::channel::{Receiver, Sender, TryRecvError};
use spin_sleep::SpinSleeper;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};
use window_capture::{LogicalSize, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Emitted { index: u64, duplicate: bool },

    /// No frame has been captured yet
    Waiting,

    /// The capture loop is gone
    Disconnected,
}

/// Consumer side of the pipeline: one frame to the sink per tick.
pub struct Pacer {
    fps: u32,
    handoff: Receiver<Page>,
    free_pages: Sender<Page>,

    /// Page the previous emission read from; never written while held here
    last_frame: Option<Page>,
    next_index: u64,

    stats: Arc<SessionStats>,
    store_size: LogicalSize,
    status_sender: Option<Sender<StatsUser>>,
    fps_counter: SimpleFpsCounter,
    last_tick: Option<Instant>,
}

impl Pacer {
    pub fn new(
        fps: u32,
        handoff: Receiver<Page>,
        free_pages: Sender<Page>,
        stats: Arc<SessionStats>,
        store_size: LogicalSize,
    ) -> Self {
        Self {
            fps,
            handoff,
            free_pages,
            last_frame: None,
            next_index: 0,
            stats,
            store_size,
            status_sender: None,
            fps_counter: SimpleFpsCounter::new(),
            last_tick: None,
        }
    }

    pub fn with_status_sender(mut self, sender: Option<Sender<StatsUser>>) -> Self {
        self.status_sender = sender;
        self
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Take a handed-off page if one is waiting, otherwise repeat the last one.
    pub fn tick<S: FrameSink>(&mut self, sink: &mut S) -> Result<TickOutcome, RecorderError> {
        let duplicate = match self.handoff.try_recv() {
            Ok(page) => {
                if let Some(previous) = self.last_frame.replace(page) {
                    self.recycle(previous);
                }
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => return Ok(TickOutcome::Disconnected),
        };

        let Some(page) = self.last_frame.as_ref() else {
            self.stats.add_warmup_tick();
            return Ok(TickOutcome::Waiting);
        };

        let index = self.next_index;
        sink.emit(TimedFrame {
            index,
            timestamp: frame_timestamp(index, self.fps),
            duplicate,
            page_index: page.index(),
            data: page.as_slice(),
        })?;

        self.next_index += 1;
        self.stats.add_emitted(duplicate);

        if duplicate {
            log::debug!("no new frame for tick {index}, repeating page {}", page.index());
        }

        Ok(TickOutcome::Emitted { index, duplicate })
    }

    /// Tick at `fps` until stopped or the capture loop disconnects, then finish the sink.
    pub fn run<S: FrameSink>(
        mut self,
        mut sink: S,
        stop_sig: Arc<AtomicBool>,
    ) -> Result<ProgressState, RecorderError> {
        let sleeper = SpinSleeper::default();
        let start_time = Instant::now();
        let mut ticks = 0;

        let state = loop {
            sleeper.sleep_until(start_time + frame_timestamp(ticks, self.fps));
            ticks += 1;

            if stop_sig.load(Ordering::Relaxed) {
                break ProgressState::Stopped;
            }

            match self.tick(&mut sink)? {
                TickOutcome::Disconnected => {
                    log::info!("capture loop disconnected, pacer exit");
                    break ProgressState::Finished;
                }
                outcome => self.report_status(outcome, start_time),
            }
        };

        sink.finish()?;

        log::info!(
            "pacer exit. state: {state:?}. ticks: {ticks}. emitted: {}",
            self.next_index
        );

        Ok(state)
    }

    fn recycle(&self, page: Page) {
        if let Err(e) = self.free_pages.try_send(page) {
            log::debug!("page is not returned to the capture loop: {e}");
        }
    }

    fn report_status(&mut self, outcome: TickOutcome, start_time: Instant) {
        let now = Instant::now();
        let frame_time = self
            .last_tick
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);

        let Some(ref sender) = self.status_sender else {
            return;
        };

        if !matches!(outcome, TickOutcome::Emitted { .. }) {
            return;
        }

        let fps = self.fps_counter.add_frame(now);
        let elapsed = now.duration_since(start_time).as_secs_f32();
        let average_fps = if elapsed > 0.0 {
            self.next_index as f32 / elapsed
        } else {
            0.0
        };

        let status = StatsUser {
            frame_time,
            fps,
            average_fps,
            total_frames: self.next_index,
            loss_frames: self.stats.dropped_frames(),
            window_size: self.stats.window_size(),
            store_size: self.store_size,
        };

        if let Err(e) = sender.try_send(status) {
            log::debug!("try send status to user channel failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;
    use std::time::Duration;
    use window_capture::FrameStore;

    #[derive(Default)]
    struct CollectSink {
        frames: Vec<(u64, Duration, bool, Vec<u8>)>,
        finished: bool,
    }

    impl FrameSink for CollectSink {
        fn emit(&mut self, frame: TimedFrame<'_>) -> Result<(), RecorderError> {
            self.frames.push((
                frame.index,
                frame.timestamp,
                frame.duplicate,
                frame.data.to_vec(),
            ));
            Ok(())
        }

        fn finish(&mut self) -> Result<(), RecorderError> {
            self.finished = true;
            Ok(())
        }
    }

    struct Pipeline {
        pacer: Pacer,
        handoff: Sender<Page>,
        free_pages: Receiver<Page>,
        stats: Arc<SessionStats>,
    }

    fn pipeline(fps: u32) -> Pipeline {
        let size = LogicalSize::new(4, 2);
        let pages = FrameStore::create(size.width, size.height, 2)
            .unwrap()
            .into_pages();

        let (free_sender, free_receiver) = bounded(pages.len());
        for page in pages {
            free_sender.send(page).unwrap();
        }

        // buffered so the test can act as the capture loop on the same thread
        let (handoff_sender, handoff_receiver) = bounded(1);
        let stats = Arc::new(SessionStats::new());
        let pacer = Pacer::new(fps, handoff_receiver, free_sender, stats.clone(), size);

        Pipeline {
            pacer,
            handoff: handoff_sender,
            free_pages: free_receiver,
            stats,
        }
    }

    impl Pipeline {
        fn produce(&self, content: u8) {
            let mut page = self.free_pages.try_recv().unwrap();
            page.as_mut_slice().fill(content);
            self.handoff.try_send(page).unwrap();
        }
    }

    #[test]
    fn test_warmup_emits_nothing() {
        let mut p = pipeline(60);
        let mut sink = CollectSink::default();

        assert_eq!(p.pacer.tick(&mut sink).unwrap(), TickOutcome::Waiting);
        assert_eq!(p.pacer.tick(&mut sink).unwrap(), TickOutcome::Waiting);
        assert!(sink.frames.is_empty());

        p.produce(1);
        assert_eq!(
            p.pacer.tick(&mut sink).unwrap(),
            TickOutcome::Emitted {
                index: 0,
                duplicate: false
            }
        );

        let snapshot = p.stats.snapshot();
        assert_eq!(snapshot.warmup_ticks, 2);
        assert_eq!(snapshot.dropped_frames, 0);
        assert_eq!(snapshot.emitted_frames, 1);
    }

    #[test]
    fn test_stalled_capture_repeats_last_frame() {
        let mut p = pipeline(60);
        let mut sink = CollectSink::default();

        for tick in 0..100u64 {
            if !(11..=16).contains(&tick) {
                p.produce(tick as u8);
            }
            p.pacer.tick(&mut sink).unwrap();
        }

        assert_eq!(sink.frames.len(), 100);
        for (i, (index, timestamp, duplicate, data)) in sink.frames.iter().enumerate() {
            assert_eq!(*index, i as u64);
            assert_eq!(*timestamp, frame_timestamp(i as u64, 60));

            let expected = if (11..=16).contains(&i) { 10 } else { i as u8 };
            assert!(data.iter().all(|b| *b == expected), "frame {i}");
            assert_eq!(*duplicate, (11..=16).contains(&i), "frame {i}");
        }

        assert!(sink.frames.windows(2).all(|w| w[0].1 < w[1].1));
        assert_eq!(p.stats.dropped_frames(), 6);
        assert_eq!(p.stats.emitted_frames(), 100);
    }

    #[test]
    fn test_previous_page_is_recycled() {
        let mut p = pipeline(30);
        let mut sink = CollectSink::default();

        p.produce(1);
        p.pacer.tick(&mut sink).unwrap();
        // one page held by the pacer, one left in the free queue
        assert_eq!(p.free_pages.len(), 1);

        p.produce(2);
        assert_eq!(p.free_pages.len(), 0);
        p.pacer.tick(&mut sink).unwrap();
        assert_eq!(p.free_pages.len(), 1);

        let page = p.free_pages.try_recv().unwrap();
        assert_eq!(page.index(), 0);
        assert!(page.as_slice().iter().all(|b| *b == 1));
    }

    #[test]
    fn test_disconnected_capture() {
        let Pipeline {
            mut pacer, handoff, ..
        } = pipeline(60);
        let mut sink = CollectSink::default();

        drop(handoff);
        assert_eq!(pacer.tick(&mut sink).unwrap(), TickOutcome::Disconnected);
    }

    #[test]
    fn test_run_stops_on_signal() {
        let p = pipeline(120);
        let stop_sig = Arc::new(AtomicBool::new(true));
        let (status_sender, status_receiver) = bounded(4);
        let pacer = p.pacer.with_status_sender(Some(status_sender));

        let mut sink = CollectSink::default();
        let state = pacer.run(&mut sink, stop_sig).unwrap();

        assert_eq!(state, ProgressState::Stopped);
        assert!(sink.finished);
        assert!(status_receiver.try_recv().is_err());
    }

    #[test]
    fn test_run_reports_status() {
        let p = pipeline(120);
        p.produce(7);

        let (status_sender, status_receiver) = bounded(4);
        let pacer = p.pacer.with_status_sender(Some(status_sender));
        let handoff = p.handoff;

        let sink = CollectSink::default();
        let worker = std::thread::spawn(move || pacer.run(sink, Arc::new(AtomicBool::new(false))));

        let status = status_receiver
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(status.total_frames, 1);
        assert_eq!(status.store_size, LogicalSize::new(4, 2));

        drop(handoff);
        assert_eq!(worker.join().unwrap().unwrap(), ProgressState::Finished);
    }
}
