use crate::{RecorderConfig, RecorderError, SessionStats, compositor};
use crossbeam::channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};
use window_capture::{BYTES_PER_PIXEL, LogicalSize, Page, WindowCapture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// The window event stream ended
    Finished,
    /// Stop signal or the pacer went away
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStep {
    /// A page was filled and accepted by the pacer
    HandedOff { page_index: usize },
    /// Nothing was handed off; the current page is kept for the next attempt
    Skipped,
    Done(CaptureStatus),
}

/// State owned by the capture loop alone.
#[derive(Debug)]
pub struct CaptureSession {
    pub window_size: LogicalSize,

    /// Page being filled; `None` until one is taken from the free queue
    pub page: Option<Page>,

    /// The drawing target must be re-obtained before the next fetch
    pub needs_rebind: bool,

    /// Consecutive failed rebinds, reset on success
    pub rebind_failures: u32,

    pub handed_off: u64,
}

impl CaptureSession {
    pub fn new(window_size: LogicalSize) -> Self {
        Self {
            window_size,
            page: None,
            needs_rebind: false,
            rebind_failures: 0,
            handed_off: 0,
        }
    }

    pub fn page_index(&self) -> Option<usize> {
        self.page.as_ref().map(Page::index)
    }
}

/// Producer side of the pipeline: fetch, reconcile, draw the cursor, hand off.
pub struct CaptureLoop<C: WindowCapture> {
    source: C,
    session: CaptureSession,
    config: RecorderConfig,
    store_size: LogicalSize,
    scratch: Vec<u8>,

    resize_receiver: Receiver<LogicalSize>,
    free_pages: Receiver<Page>,
    handoff: Sender<Page>,

    stop_sig: Arc<AtomicBool>,
    stats: Arc<SessionStats>,
}

impl<C: WindowCapture> CaptureLoop<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: C,
        config: RecorderConfig,
        window_size: LogicalSize,
        store_size: LogicalSize,
        resize_receiver: Receiver<LogicalSize>,
        free_pages: Receiver<Page>,
        handoff: Sender<Page>,
        stop_sig: Arc<AtomicBool>,
        stats: Arc<SessionStats>,
    ) -> Self {
        stats.set_window_size(window_size);

        Self {
            source,
            session: CaptureSession::new(window_size),
            config,
            store_size,
            scratch: vec![0; store_size.bytes()],
            resize_receiver,
            free_pages,
            handoff,
            stop_sig,
            stats,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn run(mut self) -> Result<CaptureStatus, RecorderError> {
        log::info!(
            "capture loop started: window {} into {} pages",
            self.session.window_size,
            self.store_size
        );

        loop {
            if let CaptureStep::Done(status) = self.step()? {
                log::info!(
                    "capture loop exit. status: {status:?}. handed off {} frames",
                    self.session.handed_off
                );
                return Ok(status);
            }
        }
    }

    /// One iteration of the capture state machine.
    pub fn step(&mut self) -> Result<CaptureStep, RecorderError> {
        if self.stop_sig.load(Ordering::Relaxed) {
            return Ok(CaptureStep::Done(CaptureStatus::Stopped));
        }

        if !self.poll_resize() {
            return Ok(CaptureStep::Done(CaptureStatus::Finished));
        }

        if self.session.needs_rebind {
            if let Err(e) = self.source.rebind() {
                if self.session.rebind_failures == 0 {
                    log::warn!("Could not rebind drawing target: {e}");
                } else {
                    log::debug!("rebind failed again: {e}");
                }
                self.session.rebind_failures += 1;
                thread::sleep(self.config.poll_interval);
                return Ok(CaptureStep::Skipped);
            }
            self.session.needs_rebind = false;
            self.session.rebind_failures = 0;
        }

        let Some(mut page) = self.acquire_page() else {
            return Ok(CaptureStep::Done(CaptureStatus::Stopped));
        };

        let region = self.session.window_size.min(self.store_size);
        if region.is_empty() {
            log::debug!("window is {}, nothing to fetch", self.session.window_size);
            self.session.page = Some(page);
            thread::sleep(self.config.poll_interval);
            return Ok(CaptureStep::Skipped);
        }

        if let Err(e) = self.source.fetch(region, &mut page) {
            log::warn!("Could not fetch window contents: {e}");
            self.stats.add_fetch_failure();
            self.session.page = Some(page);
            return Ok(CaptureStep::Skipped);
        }

        reconcile_partial_page(
            page.as_mut_slice(),
            &mut self.scratch,
            self.store_size,
            region,
        );

        if self.config.include_cursor {
            self.draw_cursor(&mut page);
        }

        self.stats.add_captured();

        let page_index = page.index();
        if !self.hand_off(page) {
            return Ok(CaptureStep::Done(CaptureStatus::Stopped));
        }

        self.session.handed_off += 1;
        Ok(CaptureStep::HandedOff { page_index })
    }

    /// Apply every queued resize notification. Returns `false` once the
    /// notification stream is closed.
    fn poll_resize(&mut self) -> bool {
        loop {
            match self.resize_receiver.try_recv() {
                Ok(size) => {
                    self.stats.add_resize_event();
                    if size != self.session.window_size {
                        log::info!("window resized: {} -> {size}", self.session.window_size);
                        self.session.window_size = size;
                        self.session.needs_rebind = true;
                        self.stats.set_window_size(size);
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    log::info!("window event stream closed");
                    return false;
                }
            }
        }
    }

    fn acquire_page(&mut self) -> Option<Page> {
        if let Some(page) = self.session.page.take() {
            return Some(page);
        }

        loop {
            match self.free_pages.recv_timeout(self.config.poll_interval) {
                Ok(page) => return Some(page),
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop_sig.load(Ordering::Relaxed) {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Block until the pacer takes `page`. Returns `false` if it never will.
    fn hand_off(&mut self, mut page: Page) -> bool {
        loop {
            match self.handoff.send_timeout(page, self.config.poll_interval) {
                Ok(()) => return true,
                Err(SendTimeoutError::Timeout(p)) => {
                    if self.stop_sig.load(Ordering::Relaxed) {
                        return false;
                    }
                    page = p;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    log::info!("pacer is gone, stop handing off frames");
                    return false;
                }
            }
        }
    }

    fn draw_cursor(&mut self, page: &mut Page) {
        let cursor = match self.source.query_cursor() {
            Ok(cursor) => cursor,
            Err(e) => {
                log::debug!("skip cursor: {e}");
                self.stats.add_cursor_miss();
                return;
            }
        };

        let position = match self.source.translate(cursor.root_position()) {
            Ok(position) => position,
            Err(e) => {
                log::debug!("skip cursor: {e}");
                self.stats.add_cursor_miss();
                return;
            }
        };

        compositor::composite(page.as_mut_slice(), self.store_size, &cursor, position);
    }
}

/// Spread a packed `fetched` image at the start of `page` out to the page's
/// row stride and zero everything outside it.
///
/// `scratch` must hold at least `fetched.bytes()` bytes. Does nothing when the
/// fetch covered the whole page.
pub fn reconcile_partial_page(
    page: &mut [u8],
    scratch: &mut [u8],
    page_size: LogicalSize,
    fetched: LogicalSize,
) {
    if fetched == page_size {
        return;
    }

    debug_assert!(fetched.fits_in(page_size));

    let packed = fetched.bytes();
    scratch[..packed].copy_from_slice(&page[..packed]);
    page.fill(0);

    let src_stride = fetched.width as usize * BYTES_PER_PIXEL;
    let dst_stride = page_size.width as usize * BYTES_PER_PIXEL;

    for (row, src) in scratch[..packed].chunks_exact(src_stride).enumerate() {
        let start = row * dst_stride;
        page[start..start + src_stride].copy_from_slice(src);
    }
}
