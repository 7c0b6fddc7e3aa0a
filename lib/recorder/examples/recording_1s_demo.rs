use mkv::{MatroskaWriter, MkvError, VideoTrackBuilder};
use recorder::{FPS, RecorderConfig, RecorderError, RecordingSession};
use std::{fs::File, io::BufWriter, sync::atomic::Ordering, thread, time::Duration};
use window_capture_x11::{X11WindowCapture, parse_window_id};

// cargo run --example recording_1s_demo -- 0x3a00007
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let window = std::env::args().nth(1).ok_or("usage: recording_1s_demo <window id>")?;
    let window = parse_window_id(&window)?;

    let source = X11WindowCapture::connect(window)?;
    let config = RecorderConfig::new()
        .with_fps(FPS::Fps30)
        .with_enable_status_channel(true);

    log::debug!("Recording configuration: {:#?}", config);

    let mut session = RecordingSession::new(config);
    let stop_sig = session.get_stop_sig();

    session.start(source, |size| {
        let track = VideoTrackBuilder::default()
            .width(size.width)
            .height(size.height)
            .fps(30)
            .build()
            .map_err(MkvError::from)?;
        let file = File::create("target/window.mkv")
            .map_err(|e| RecorderError::SinkFailed(e.to_string()))?;
        Ok(MatroskaWriter::new(BufWriter::new(file), track)?)
    })?;

    if let Some(receiver) = session.get_status_receiver() {
        thread::spawn(move || {
            for status in receiver {
                log::debug!("{status}");
            }
        });
    }

    thread::spawn(move || {
        thread::sleep(Duration::from_secs(1));
        log::debug!("1 second elapsed, stopping recording...");
        stop_sig.store(true, Ordering::Relaxed);
    });

    let state = session.wait()?;
    log::debug!("Recording completed: {state:?}");

    Ok(())
}
