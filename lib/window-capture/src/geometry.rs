use crate::BYTES_PER_PIXEL;

#[derive(Debug, Clone, Default, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalSize {
    pub width: u32,
    pub height: u32,
}

impl LogicalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of a packed BGRA image with these dimensions.
    pub fn bytes(&self) -> usize {
        self.pixels() * BYTES_PER_PIXEL
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Per-axis minimum of both sizes.
    pub fn min(&self, other: LogicalSize) -> Self {
        Self {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }

    pub fn fits_in(&self, other: LogicalSize) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

impl std::fmt::Display for LogicalSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_is_per_axis() {
        let window = LogicalSize::new(1000, 300);
        let store = LogicalSize::new(800, 600);

        assert_eq!(window.min(store), LogicalSize::new(800, 300));
        assert_eq!(store.min(window), LogicalSize::new(800, 300));
    }

    #[test]
    fn test_fits_in() {
        let store = LogicalSize::new(800, 600);

        assert!(LogicalSize::new(400, 300).fits_in(store));
        assert!(store.fits_in(store));
        assert!(!LogicalSize::new(801, 10).fits_in(store));
    }

    #[test]
    fn test_bytes_and_display() {
        let size = LogicalSize::new(3, 2);
        assert_eq!(size.bytes(), 24);
        assert_eq!(size.to_string(), "3x2");
        assert!(LogicalSize::new(0, 2).is_empty());
    }
}
