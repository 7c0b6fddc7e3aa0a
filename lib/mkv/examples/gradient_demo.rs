use mkv::{MatroskaWriter, VideoTrackBuilder};
use std::{fs::File, io::BufWriter};

// Two seconds of a scrolling BGRA gradient, playable with `ffplay target/gradient.mkv`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let (width, height, fps) = (320u32, 240u32, 30u32);
    let track = VideoTrackBuilder::default()
        .width(width)
        .height(height)
        .fps(fps)
        .build()?;

    let file = BufWriter::new(File::create("target/gradient.mkv")?);
    let mut writer = MatroskaWriter::new(file, track)?;
    let mut frame = vec![0u8; writer.track().frame_bytes()];

    for index in 0..fps as u64 * 2 {
        for (i, px) in frame.chunks_exact_mut(4).enumerate() {
            let (row, col) = (i / width as usize, i % width as usize);
            px.copy_from_slice(&[
                (col as u64 + index * 4) as u8,
                (row * 255 / height as usize) as u8,
                0x40,
                0xff,
            ]);
        }

        writer.write_frame(index * 1_000_000_000 / fps as u64, &frame)?;
    }

    log::debug!("wrote {} frames", writer.frames_written());
    writer.finish()?;

    Ok(())
}
