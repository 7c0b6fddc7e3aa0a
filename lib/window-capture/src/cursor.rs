use crate::Position;

/// Cursor bitmap as reported by the display server, fetched fresh for every frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorImage {
    /// Pointer position in root window coordinates
    pub x: i32,
    pub y: i32,

    pub width: u32,
    pub height: u32,

    /// Hotspot offset inside the bitmap
    pub xhot: u32,
    pub yhot: u32,

    /// Row-major ARGB samples, alpha in the high byte
    pub pixels: Vec<u32>,
}

impl CursorImage {
    pub fn root_position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.len() < self.pixel_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_bitmap_is_empty() {
        let cursor = CursorImage {
            width: 2,
            height: 2,
            pixels: vec![0; 3],
            ..Default::default()
        };
        assert!(cursor.is_empty());

        let cursor = CursorImage {
            pixels: vec![0; 4],
            ..cursor
        };
        assert!(!cursor.is_empty());
        assert_eq!(cursor.pixel_count(), 4);
    }
}
