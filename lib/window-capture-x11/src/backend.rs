use crate::Error;
use x11rb::{
    connection::RequestConnection,
    protocol::{composite, shm, xfixes, xproto::Window},
    rust_connection::RustConnection,
};

/// Composite 0.2 added NameWindowPixmap
pub(crate) const COMPOSITE_VERSION: (u32, u32) = (0, 2);

/// GetCursorImage is part of XFixes 1.0
pub(crate) const XFIXES_VERSION: (u32, u32) = (1, 0);

/// SHM 1.2 added AttachFd
pub(crate) const SHM_VERSION: (u32, u32) = (1, 2);

pub(crate) fn connect() -> Result<RustConnection, Error> {
    let (conn, screen_num) = x11rb::connect(None)?;
    log::debug!("connected to X server, default screen {screen_num}");
    Ok(conn)
}

/// Check that every extension the capture needs is present and recent enough.
pub(crate) fn negotiate_extensions(conn: &RustConnection) -> Result<(), Error> {
    require_extension(conn, composite::X11_EXTENSION_NAME)?;
    let reply = composite::query_version(conn, COMPOSITE_VERSION.0, COMPOSITE_VERSION.1)?.reply()?;
    require_version(
        composite::X11_EXTENSION_NAME,
        COMPOSITE_VERSION,
        (reply.major_version, reply.minor_version),
    )?;

    require_extension(conn, xfixes::X11_EXTENSION_NAME)?;
    let reply = xfixes::query_version(conn, XFIXES_VERSION.0, XFIXES_VERSION.1)?.reply()?;
    require_version(
        xfixes::X11_EXTENSION_NAME,
        XFIXES_VERSION,
        (reply.major_version, reply.minor_version),
    )?;

    require_extension(conn, shm::X11_EXTENSION_NAME)?;
    let reply = shm::query_version(conn)?.reply()?;
    require_version(
        shm::X11_EXTENSION_NAME,
        SHM_VERSION,
        (reply.major_version as u32, reply.minor_version as u32),
    )?;

    log::info!("X extensions available: Composite, XFixes, MIT-SHM");
    Ok(())
}

/// Redirect `window` off-screen so its contents stay available while covered.
pub(crate) fn redirect_window(conn: &RustConnection, window: Window) -> Result<(), Error> {
    match composite::redirect_window(conn, window, composite::Redirect::AUTOMATIC)?.check() {
        Ok(()) => Ok(()),
        Err(x11rb::errors::ReplyError::X11Error(e))
            if e.error_kind == x11rb::protocol::ErrorKind::Access =>
        {
            Err(Error::AlreadyRedirected(window))
        }
        Err(x11rb::errors::ReplyError::X11Error(e)) => {
            Err(Error::InvalidWindow(window, format!("{:?}", e.error_kind)))
        }
        Err(e) => Err(e.into()),
    }
}

fn require_extension(conn: &RustConnection, name: &'static str) -> Result<(), Error> {
    match conn.extension_information(name)? {
        Some(_) => Ok(()),
        None => Err(Error::MissingExtension(name)),
    }
}

fn require_version(
    name: &'static str,
    required: (u32, u32),
    found: (u32, u32),
) -> Result<(), Error> {
    if found < required {
        return Err(Error::UnsupportedVersion {
            name,
            major: required.0,
            minor: required.1,
            found_major: found.0,
            found_minor: found.1,
        });
    }

    log::debug!("{name} version {}.{}", found.0, found.1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_version() {
        assert!(require_version("Composite", (0, 2), (0, 4)).is_ok());
        assert!(require_version("XFIXES", XFIXES_VERSION, (1, 0)).is_ok());
        assert!(require_version("XFIXES", XFIXES_VERSION, (5, 0)).is_ok());
        assert!(require_version("MIT-SHM", (1, 2), (1, 2)).is_ok());

        let err = require_version("MIT-SHM", (1, 2), (1, 1)).unwrap_err();
        assert_eq!(err.to_string(), "MIT-SHM 1.1 is too old, 1.2 is required");
    }
}
