use crate::bitmap::BitmapInfoHeader;
use derive_builder::Builder;
use std::io::Write;
use thiserror::Error;
use webm_iterable::{
    WebmWriter, WriteOptions,
    matroska_spec::{Master, MatroskaSpec},
};

const TRACK_NUMBER: u64 = 1;
const TRACK_UID: u64 = 0xDEAD_BEEF;
const TRACK_TYPE_VIDEO: u64 = 1;
const CODEC_ID: &str = "V_MS/VFW/FOURCC";
const MUXING_APP: &str = "mkv";

// track number 0x81, relative timestamp 0, keyframe
const SIMPLE_BLOCK_HEADER: [u8; 4] = [0x81, 0x00, 0x00, 0x80];

#[derive(Error, Debug)]
pub enum MkvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Matroska muxing error: {0}")]
    Matroska(String),

    #[error("Invalid video track: {0}")]
    InvalidTrack(String),

    #[error("Video track config builder failed: {0}")]
    TrackConfig(#[from] VideoTrackBuilderError),

    #[error("frame has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
}

#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct VideoTrack {
    pub width: u32,

    pub height: u32,

    #[builder(default = "60")]
    pub fps: u32,

    #[builder(default = "\"xcapture\".to_string()", setter(into))]
    pub writing_app: String,
}

impl VideoTrack {
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    pub fn frame_duration_ns(&self) -> u64 {
        1_000_000_000 / self.fps as u64
    }
}

/// Streams raw BGRA frames into a Matroska file.
pub struct MatroskaWriter<W: Write> {
    writer: WebmWriter<W>,
    track: VideoTrack,
    frames_written: u64,
}

impl<W: Write> MatroskaWriter<W> {
    /// Write the file header and track description.
    pub fn new(out: W, track: VideoTrack) -> Result<Self, MkvError> {
        if track.width == 0 || track.height == 0 || track.fps == 0 {
            return Err(MkvError::InvalidTrack(format!(
                "{}x{} at {} fps",
                track.width, track.height, track.fps
            )));
        }

        let mut writer = WebmWriter::new(out);
        let codec_private = BitmapInfoHeader::top_down_bgra(track.width, track.height).to_bytes()?;

        let ebml_header = MatroskaSpec::Ebml(Master::Full(vec![
            MatroskaSpec::DocType("matroska".to_string()),
            MatroskaSpec::DocTypeVersion(4),
            MatroskaSpec::DocTypeReadVersion(1),
        ]));

        let info = MatroskaSpec::Info(Master::Full(vec![
            MatroskaSpec::TimestampScale(1),
            MatroskaSpec::MuxingApp(MUXING_APP.to_string()),
            MatroskaSpec::WritingApp(track.writing_app.clone()),
        ]));

        let tracks = MatroskaSpec::Tracks(Master::Full(vec![MatroskaSpec::TrackEntry(
            Master::Full(vec![
                MatroskaSpec::TrackNumber(TRACK_NUMBER),
                MatroskaSpec::TrackUID(TRACK_UID),
                MatroskaSpec::TrackType(TRACK_TYPE_VIDEO),
                MatroskaSpec::FlagLacing(0),
                MatroskaSpec::DefaultDuration(track.frame_duration_ns()),
                MatroskaSpec::CodecID(CODEC_ID.to_string()),
                MatroskaSpec::CodecPrivate(codec_private),
                MatroskaSpec::Video(Master::Full(vec![
                    MatroskaSpec::PixelWidth(track.width as u64),
                    MatroskaSpec::PixelHeight(track.height as u64),
                    MatroskaSpec::UncompressedFourCC(b"BGRA".to_vec()),
                    MatroskaSpec::Colour(Master::Full(vec![MatroskaSpec::BitsPerChannel(8)])),
                ])),
            ]),
        )]));

        writer
            .write(&ebml_header)
            .map_err(|e| MkvError::Matroska(e.to_string()))?;

        // The segment stays open for the whole stream so the output can go to a pipe.
        writer
            .write_advanced(
                &MatroskaSpec::Segment(Master::Start),
                WriteOptions::is_unknown_sized_element(),
            )
            .map_err(|e| MkvError::Matroska(e.to_string()))?;

        for tag in [info, tracks] {
            writer
                .write(&tag)
                .map_err(|e| MkvError::Matroska(e.to_string()))?;
        }

        log::info!(
            "matroska header written: {}x{} at {} fps",
            track.width,
            track.height,
            track.fps
        );

        Ok(Self {
            writer,
            track,
            frames_written: 0,
        })
    }

    /// Append one frame as its own cluster. `timestamp_ns` is absolute.
    pub fn write_frame(&mut self, timestamp_ns: u64, data: &[u8]) -> Result<(), MkvError> {
        if data.len() != self.track.frame_bytes() {
            return Err(MkvError::FrameSize {
                expected: self.track.frame_bytes(),
                actual: data.len(),
            });
        }

        let mut block = Vec::with_capacity(SIMPLE_BLOCK_HEADER.len() + data.len());
        block.extend_from_slice(&SIMPLE_BLOCK_HEADER);
        block.extend_from_slice(data);

        let cluster = MatroskaSpec::Cluster(Master::Full(vec![
            MatroskaSpec::Timestamp(timestamp_ns),
            MatroskaSpec::Position(0),
            MatroskaSpec::SimpleBlock(block),
        ]));

        self.writer
            .write(&cluster)
            .map_err(|e| MkvError::Matroska(e.to_string()))?;

        self.frames_written += 1;
        Ok(())
    }

    pub fn track(&self) -> &VideoTrack {
        &self.track
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn flush(&mut self) -> Result<(), MkvError> {
        self.writer
            .flush()
            .map_err(|e| MkvError::Matroska(e.to_string()))
    }

    pub fn finish(mut self) -> Result<(), MkvError> {
        self.flush()?;
        log::info!("matroska finished: {} frames", self.frames_written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webm_iterable::WebmIterator;

    fn track(width: u32, height: u32) -> VideoTrack {
        VideoTrackBuilder::default()
            .width(width)
            .height(height)
            .fps(60)
            .build()
            .unwrap()
    }

    fn read_tags(out: &[u8]) -> Vec<MatroskaSpec> {
        WebmIterator::new(out, &[])
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_header_layout() {
        let mut out = Vec::new();
        MatroskaWriter::new(&mut out, track(2, 2))
            .unwrap()
            .finish()
            .unwrap();

        assert_eq!(&out[..4], &[0x1a, 0x45, 0xdf, 0xa3]);

        let tags = read_tags(&out);
        assert!(
            tags.iter()
                .any(|t| matches!(t, MatroskaSpec::DocType(s) if s == "matroska"))
        );
        assert!(
            tags.iter()
                .any(|t| matches!(t, MatroskaSpec::CodecID(s) if s == CODEC_ID))
        );
        assert!(
            tags.iter()
                .any(|t| matches!(t, MatroskaSpec::UncompressedFourCC(s) if s == b"BGRA"))
        );
        assert!(
            tags.iter()
                .any(|t| matches!(t, MatroskaSpec::CodecPrivate(s) if s.len() == 40))
        );

        // 1s / 60 in nanoseconds
        assert!(
            tags.iter()
                .any(|t| matches!(t, MatroskaSpec::DefaultDuration(16_666_666)))
        );

        // unknown-size segment id followed by the all-ones 8-byte size
        let segment = out
            .windows(4)
            .position(|w| w == [0x18, 0x53, 0x80, 0x67])
            .unwrap();
        assert_eq!(out[segment + 4], 0x01);
        assert!(out[segment + 5..segment + 12].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn test_write_frame_cluster() {
        let mut out = Vec::new();
        let mut writer = MatroskaWriter::new(&mut out, track(2, 1)).unwrap();

        let frame = [1u8, 2, 3, 4, 5, 6, 7, 8];
        writer.write_frame(33_333_332, &frame).unwrap();
        assert_eq!(writer.frames_written(), 1);
        writer.finish().unwrap();

        let tags = read_tags(&out);
        assert!(
            tags.iter()
                .any(|t| matches!(t, MatroskaSpec::Timestamp(33_333_332)))
        );

        let block = tags
            .iter()
            .find_map(|t| match t {
                MatroskaSpec::SimpleBlock(data) => Some(data.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(&block[..4], &SIMPLE_BLOCK_HEADER);
        assert_eq!(&block[4..], &frame);
    }

    #[test]
    fn test_frame_size_mismatch() {
        let mut writer = MatroskaWriter::new(Vec::new(), track(2, 2)).unwrap();
        let err = writer.write_frame(0, &[0u8; 4]).unwrap_err();

        assert!(matches!(
            err,
            MkvError::FrameSize {
                expected: 16,
                actual: 4
            }
        ));
        assert_eq!(writer.frames_written(), 0);
    }

    #[test]
    fn test_invalid_track() {
        let track = VideoTrack {
            fps: 0,
            ..track(2, 2)
        };
        assert!(matches!(
            MatroskaWriter::new(Vec::new(), track),
            Err(MkvError::InvalidTrack(_))
        ));
    }

    #[test]
    fn test_builder_requires_dimensions() {
        assert!(VideoTrackBuilder::default().width(10).build().is_err());
    }
}
