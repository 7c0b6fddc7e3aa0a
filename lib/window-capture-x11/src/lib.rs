//! X11 backend for `window-capture`.
//!
//! The window is redirected with Composite, read from its named pixmap with
//! MIT-SHM straight into the frame store pages and the pointer is read with
//! XFixes. Size changes arrive from a second connection on its own thread.

mod backend;
mod capture;
mod error;
mod events;

pub use capture::X11WindowCapture;
pub use error::Error;

/// Parse a window id given as decimal or `0x`-prefixed hex.
pub fn parse_window_id(text: &str) -> Result<u32, Error> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };

    match parsed {
        Ok(0) | Err(_) => Err(Error::Other(format!("invalid window id `{text}`"))),
        Ok(id) => Ok(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_id() {
        assert_eq!(parse_window_id("0x3a00007").unwrap(), 0x3a00007);
        assert_eq!(parse_window_id("0X1F").unwrap(), 31);
        assert_eq!(parse_window_id("60817415").unwrap(), 60817415);
        assert_eq!(parse_window_id(" 42 ").unwrap(), 42);

        assert!(parse_window_id("0").is_err());
        assert!(parse_window_id("0xzz").is_err());
        assert!(parse_window_id("window").is_err());
    }
}
