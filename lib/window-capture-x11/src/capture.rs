use crate::{Error, backend, events};
use std::thread::JoinHandle;
use window_capture::{
    CaptureError, CursorError, CursorImage, FetchError, FrameStore, LogicalSize, Page, Position,
    Receiver, WindowCapture,
};
use x11rb::{
    connection::Connection,
    protocol::{
        composite::{self, ConnectionExt as _},
        shm::{self, ConnectionExt as _},
        xfixes::ConnectionExt as _,
        xproto::{ConnectionExt as _, ImageFormat, Pixmap, Window},
    },
    rust_connection::RustConnection,
};

/// Captures one X11 window through Composite, MIT-SHM and XFixes.
pub struct X11WindowCapture {
    conn: RustConnection,
    window: Window,
    root: Window,

    /// Off-screen pixmap holding the window contents, renamed on every rebind
    pixmap: Option<Pixmap>,

    /// SHM segment backed by the frame store's memfd
    segment: Option<shm::Seg>,
    store_len: usize,

    event_worker: Option<JoinHandle<()>>,
}

impl X11WindowCapture {
    pub fn connect(window: Window) -> Result<Self, Error> {
        let conn = backend::connect()?;
        backend::negotiate_extensions(&conn)?;

        let geometry = conn
            .get_geometry(window)?
            .reply()
            .map_err(|e| Error::InvalidWindow(window, e.to_string()))?;

        backend::redirect_window(&conn, window)?;

        let mut capture = Self {
            conn,
            window,
            root: geometry.root,
            pixmap: None,
            segment: None,
            store_len: 0,
            event_worker: None,
        };
        capture.name_pixmap()?;

        log::info!(
            "capturing window {window:#x} ({}x{})",
            geometry.width,
            geometry.height
        );

        Ok(capture)
    }

    fn name_pixmap(&mut self) -> Result<(), Error> {
        if let Some(pixmap) = self.pixmap.take() {
            self.conn.free_pixmap(pixmap)?;
        }

        let pixmap = self.conn.generate_id()?;
        self.conn
            .composite_name_window_pixmap(self.window, pixmap)?
            .check()
            .map_err(|e| Error::InvalidWindow(self.window, e.to_string()))?;
        self.pixmap = Some(pixmap);

        Ok(())
    }
}

impl WindowCapture for X11WindowCapture {
    fn window_size(&mut self) -> Result<LogicalSize, CaptureError> {
        let geometry = self
            .conn
            .get_geometry(self.window)
            .map_err(Error::from)?
            .reply()
            .map_err(|e| Error::InvalidWindow(self.window, e.to_string()))?;

        Ok(LogicalSize::new(geometry.width as u32, geometry.height as u32))
    }

    fn attach_store(&mut self, store: &FrameStore) -> Result<(), CaptureError> {
        if u32::try_from(store.len()).is_err() {
            return Err(CaptureError::Other(format!(
                "frame store of {} bytes can't be addressed by MIT-SHM",
                store.len()
            )));
        }

        let fd = store
            .as_fd()
            .try_clone_to_owned()
            .map_err(|e| CaptureError::Other(format!("dup frame store fd failed: {e}")))?;

        let segment = self.conn.generate_id().map_err(Error::from)?;
        self.conn
            .shm_attach_fd(segment, fd, false)
            .map_err(Error::from)?
            .check()
            .map_err(Error::from)?;

        if let Some(old) = self.segment.replace(segment) {
            _ = self.conn.shm_detach(old);
        }
        self.store_len = store.len();

        log::info!("attached frame store to X server: {store:?}");
        Ok(())
    }

    fn watch_resize(&mut self, capacity: usize) -> Result<Receiver<LogicalSize>, CaptureError> {
        let (receiver, handle) = events::watch_resize(self.window, capacity)?;
        self.event_worker = Some(handle);
        Ok(receiver)
    }

    fn rebind(&mut self) -> Result<(), CaptureError> {
        self.name_pixmap()?;
        log::debug!("renamed pixmap for window {:#x}", self.window);
        Ok(())
    }

    fn fetch(&mut self, region: LogicalSize, page: &mut Page) -> Result<(), FetchError> {
        let (Some(pixmap), Some(segment)) = (self.pixmap, self.segment) else {
            return Err(FetchError::Other("frame store is not attached".to_string()));
        };

        if region.bytes() > page.len() || page.offset() + page.len() > self.store_len {
            return Err(FetchError::RegionTooLarge(region));
        }

        let (Ok(width), Ok(height)) = (u16::try_from(region.width), u16::try_from(region.height))
        else {
            return Err(FetchError::RegionTooLarge(region));
        };

        let reply = self
            .conn
            .shm_get_image(
                pixmap,
                0,
                0,
                width,
                height,
                !0,
                ImageFormat::Z_PIXMAP.into(),
                segment,
                page.offset() as u32,
            )
            .map_err(|e| FetchError::Other(e.to_string()))?
            .reply()
            .map_err(|e| FetchError::InvalidTarget(e.to_string()))?;

        if reply.size as usize != region.bytes() {
            return Err(FetchError::Other(format!(
                "got {} bytes for {region} at depth {}",
                reply.size, reply.depth
            )));
        }

        Ok(())
    }

    fn query_cursor(&mut self) -> Result<CursorImage, CursorError> {
        let reply = self
            .conn
            .xfixes_get_cursor_image()
            .map_err(|e| CursorError::QueryFailed(e.to_string()))?
            .reply()
            .map_err(|e| CursorError::QueryFailed(e.to_string()))?;

        Ok(CursorImage {
            x: reply.x as i32,
            y: reply.y as i32,
            width: reply.width as u32,
            height: reply.height as u32,
            xhot: reply.xhot as u32,
            yhot: reply.yhot as u32,
            pixels: reply.cursor_image,
        })
    }

    fn translate(&mut self, root: Position) -> Result<Position, CursorError> {
        let (Ok(x), Ok(y)) = (i16::try_from(root.x), i16::try_from(root.y)) else {
            return Err(CursorError::TranslateFailed(format!("{root:?} out of range")));
        };

        let reply = self
            .conn
            .translate_coordinates(self.root, self.window, x, y)
            .map_err(|e| CursorError::TranslateFailed(e.to_string()))?
            .reply()
            .map_err(|e| CursorError::TranslateFailed(e.to_string()))?;

        Ok(Position::new(reply.dst_x as i32, reply.dst_y as i32))
    }
}

impl Drop for X11WindowCapture {
    fn drop(&mut self) {
        log::debug!("Cleaning up X11 capture resources");

        if let Some(segment) = self.segment.take() {
            _ = self.conn.shm_detach(segment);
        }

        if let Some(pixmap) = self.pixmap.take() {
            _ = self.conn.free_pixmap(pixmap);
        }

        _ = composite::unredirect_window(&self.conn, self.window, composite::Redirect::AUTOMATIC);
        _ = self.conn.flush();

        if let Some(handle) = self.event_worker.take()
            && handle.is_finished()
        {
            _ = handle.join();
        }
    }
}
