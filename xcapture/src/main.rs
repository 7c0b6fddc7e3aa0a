//! Record one X11 window into a raw BGRA Matroska stream.

use anyhow::{Context, Result, bail};
use clap::Parser;
use mkv::{MatroskaWriter, MkvError, VideoTrackBuilder};
use recorder::{FPS, RecorderConfig, RecordingSession};
use std::{
    fs::File,
    io::{self, BufWriter, IsTerminal, Write},
    path::{Path, PathBuf},
    sync::atomic::Ordering,
    thread,
};
use window_capture_x11::X11WindowCapture;

#[derive(Parser, Debug)]
#[command(name = "xcapture")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Frame rate of the output video
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// Window to capture, decimal or 0x-prefixed hex (see `xwininfo`)
    #[arg(long, value_parser = parse_window)]
    win: u32,

    /// Output file, `-` writes to stdout
    #[arg(long, default_value = "-")]
    output: PathBuf,

    /// Do not draw the pointer into the frames
    #[arg(long)]
    no_cursor: bool,

    /// Number of frame buffers shared by the capture and output threads
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(2..))]
    pages: u32,

    /// Do not print the status line
    #[arg(short, long)]
    quiet: bool,
}

fn parse_window(text: &str) -> Result<u32, String> {
    window_capture_x11::parse_window_id(text).map_err(|e| e.to_string())
}

fn open_output(path: &Path) -> Result<Box<dyn Write + Send>> {
    if path == Path::new("-") {
        let stdout = io::stdout();
        if stdout.is_terminal() {
            bail!("refusing to write video to a terminal, redirect stdout or use --output");
        }
        return Ok(Box::new(BufWriter::new(stdout)));
    }

    let file = File::create(path).with_context(|| format!("can't create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let output = open_output(&cli.output)?;
    let source = X11WindowCapture::connect(cli.win)
        .with_context(|| format!("can't capture window {:#x}", cli.win))?;

    let config = RecorderConfig::new()
        .with_fps(FPS::from(cli.fps))
        .with_include_cursor(!cli.no_cursor)
        .with_page_count(cli.pages as usize)
        .with_enable_status_channel(!cli.quiet);

    let mut session = RecordingSession::new(config);

    let stop_sig = session.get_stop_sig();
    ctrlc::set_handler(move || {
        log::info!("Ctrl-C received, stopping...");
        stop_sig.store(true, Ordering::Relaxed);
    })?;

    let fps = cli.fps;
    session
        .start(source, move |size| {
            let track = VideoTrackBuilder::default()
                .width(size.width)
                .height(size.height)
                .fps(fps)
                .writing_app(format!("xcapture {}", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(MkvError::from)?;
            Ok(MatroskaWriter::new(output, track)?)
        })
        .context("failed to start recording")?;

    let status_worker = session.get_status_receiver().map(|receiver| {
        thread::spawn(move || {
            for status in receiver {
                eprint!("\r{status}");
            }
            eprintln!();
        })
    });

    let state = session.wait().context("recording failed")?;

    if let Some(handle) = status_worker {
        _ = handle.join();
    }

    log::info!("recording ended: {state:?}");
    Ok(())
}
