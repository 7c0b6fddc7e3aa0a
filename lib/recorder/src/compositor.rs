use window_capture::{BYTES_PER_PIXEL, CursorImage, LogicalSize, Position};

/// Blend `cursor` into a BGRA `page` with the pointer at window-local `position`.
///
/// Each channel is mixed as `((a + 1) * src + (256 - a) * dst) >> 8`, which is
/// exact at both ends: `a = 255` yields the cursor channel and `a = 0` keeps the
/// page channel. Blended pixels are made fully opaque.
///
/// The bitmap is walked in row-major order and the walk ends at the first pixel
/// that lands outside the page, so a cursor hanging over any edge is only drawn
/// up to that pixel.
pub fn composite(page: &mut [u8], page_size: LogicalSize, cursor: &CursorImage, position: Position) {
    let (width, height) = (page_size.width as i64, page_size.height as i64);
    let (x, y) = (position.x as i64, position.y as i64);

    if x < 0 || y < 0 || x > width || y > height {
        return;
    }

    if cursor.is_empty() {
        return;
    }

    let cursor_width = cursor.width as usize;
    let stride = page_size.width as usize * BYTES_PER_PIXEL;

    for (i, &pixel) in cursor.pixels[..cursor.pixel_count()].iter().enumerate() {
        let row = (i / cursor_width) as i64 + y - cursor.yhot as i64;
        let col = (i % cursor_width) as i64 + x - cursor.xhot as i64;

        if row < 0 || col < 0 || row >= height || col >= width {
            break;
        }

        let offset = row as usize * stride + col as usize * BYTES_PER_PIXEL;
        let Some(dst) = page.get_mut(offset..offset + BYTES_PER_PIXEL) else {
            break;
        };

        blend_pixel(dst, pixel);
    }
}

/// Blend one ARGB sample into one BGRA destination pixel.
#[inline]
pub fn blend_pixel(dst: &mut [u8], argb: u32) {
    let src_alpha = argb >> 24;
    let alpha = src_alpha + 1;
    let inv_alpha = 256 - src_alpha;

    let blend = |src: u32, dst: u8| ((alpha * (src & 0xff) + inv_alpha * dst as u32) >> 8) as u8;

    dst[0] = blend(argb, dst[0]);
    dst[1] = blend(argb >> 8, dst[1]);
    dst[2] = blend(argb >> 16, dst[2]);
    dst[3] = 255;
}
