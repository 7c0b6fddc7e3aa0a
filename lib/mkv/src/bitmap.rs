use byteorder::{LittleEndian, WriteBytesExt};
use std::io;

/// `BITMAPINFOHEADER` used as codec private data for uncompressed video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapInfoHeader {
    pub width: i32,
    /// Negative for top-down row order
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: [u8; 4],
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
}

impl BitmapInfoHeader {
    pub const SIZE: u32 = 40;

    /// Header for packed 32-bit BGRA rows stored top row first.
    pub fn top_down_bgra(width: u32, height: u32) -> Self {
        Self {
            width: width as i32,
            height: -(height as i32),
            planes: 1,
            bit_count: 32,
            compression: [0; 4],
            size_image: width * height * 4,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            clr_used: 0,
            clr_important: 0,
        }
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE as usize);
        buf.write_u32::<LittleEndian>(Self::SIZE)?;
        buf.write_i32::<LittleEndian>(self.width)?;
        buf.write_i32::<LittleEndian>(self.height)?;
        buf.write_u16::<LittleEndian>(self.planes)?;
        buf.write_u16::<LittleEndian>(self.bit_count)?;
        buf.extend_from_slice(&self.compression);
        buf.write_u32::<LittleEndian>(self.size_image)?;
        buf.write_i32::<LittleEndian>(self.x_pels_per_meter)?;
        buf.write_i32::<LittleEndian>(self.y_pels_per_meter)?;
        buf.write_u32::<LittleEndian>(self.clr_used)?;
        buf.write_u32::<LittleEndian>(self.clr_important)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_down_bgra_layout() {
        let bytes = BitmapInfoHeader::top_down_bgra(640, 480).to_bytes().unwrap();

        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[0..4], &40u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &640i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &(-480i32).to_le_bytes());
        assert_eq!(&bytes[12..14], &1u16.to_le_bytes());
        assert_eq!(&bytes[14..16], &32u16.to_le_bytes());
        assert_eq!(&bytes[16..20], &[0, 0, 0, 0]);
        assert_eq!(&bytes[20..24], &(640u32 * 480 * 4).to_le_bytes());
    }
}
