use crate::{Error, backend};
use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use std::thread::{self, JoinHandle};
use window_capture::LogicalSize;
use x11rb::{
    connection::Connection,
    protocol::{
        Event,
        xproto::{ChangeWindowAttributesAux, ConnectionExt, EventMask, Window},
    },
    rust_connection::RustConnection,
};

/// Forward size changes of `window` from a dedicated connection.
///
/// The channel closes when the window is destroyed or the connection fails.
/// The thread blocks on the X socket and only notices a dropped receiver with
/// the next event it receives.
pub(crate) fn watch_resize(
    window: Window,
    capacity: usize,
) -> Result<(Receiver<LogicalSize>, JoinHandle<()>), Error> {
    let conn = backend::connect()?;
    conn.change_window_attributes(
        window,
        &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
    )?
    .check()?;

    let (sender, receiver) = bounded(capacity);
    let handle = thread::spawn(move || forward_events(conn, window, sender));

    Ok((receiver, handle))
}

fn forward_events(conn: RustConnection, window: Window, sender: Sender<LogicalSize>) {
    loop {
        let event = match conn.wait_for_event() {
            Ok(event) => event,
            Err(e) => {
                log::warn!("X event connection failed: {e}");
                return;
            }
        };

        match event {
            Event::ConfigureNotify(e) if e.window == window => {
                let size = LogicalSize::new(e.width as u32, e.height as u32);
                log::debug!("window {window:#x} configured: {size}");

                match sender.try_send(size) {
                    Ok(()) => (),
                    Err(TrySendError::Full(_)) => {
                        log::warn!("resize queue is full, dropping {size}");
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        log::info!("resize receiver dropped, event thread exit");
                        return;
                    }
                }
            }
            Event::DestroyNotify(e) if e.window == window => {
                log::info!("window {window:#x} destroyed");
                return;
            }
            _ => (),
        }
    }
}
