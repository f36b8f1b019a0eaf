//! Frame sources for the capture session.
//!
//! Every source yields RGB frames one at a time through [`FrameSource`]. The
//! session releases a source by dropping it.

#[cfg(feature = "camera-v4l")]
pub mod camera;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod recorder;
pub mod sequence;

use std::path::{Path, PathBuf};

use anyhow::Context;
use image::RgbImage;

pub use recorder::{GifRecorder, RecordingSink};
pub use sequence::FrameSequence;

/// Frame rate assumed when a source does not report one.
pub const DEFAULT_FPS: f64 = 20.0;

/// File name of a recording inside the patient folder.
#[cfg(feature = "ffmpeg")]
pub const RECORDING_FILE_NAME: &str = ffmpeg::RECORDING_FILE_NAME;
#[cfg(not(feature = "ffmpeg"))]
pub const RECORDING_FILE_NAME: &str = recorder::RECORDING_FILE_NAME;

/// Video file extensions this build can open.
#[cfg(feature = "ffmpeg")]
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "gif"];
#[cfg(not(feature = "ffmpeg"))]
pub const VIDEO_EXTENSIONS: &[&str] = &["gif"];

pub trait FrameSource {
    /// Next frame, or `None` once the stream has ended.
    fn read_frame(&mut self) -> anyhow::Result<Option<RgbImage>>;

    /// Index of the next frame to be read.
    fn position(&self) -> u64;

    fn fps(&self) -> f64;

    /// Move so the next read returns frame `frame`. Live sources ignore this.
    fn seek(&mut self, frame: u64) -> anyhow::Result<()>;

    fn describe(&self) -> String;
}

/// Decode a still image from disk.
pub fn open_image<P: AsRef<Path>>(path: P) -> anyhow::Result<RgbImage> {
    let path = path.as_ref();
    let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
    Ok(img.to_rgb8())
}

/// Open a video file. Animated GIFs decode natively; other containers need
/// the `ffmpeg` feature.
pub fn open_video<P: AsRef<Path>>(path: P) -> anyhow::Result<Box<dyn FrameSource>> {
    let path = path.as_ref();
    let is_gif = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"));

    if is_gif {
        return Ok(Box::new(FrameSequence::open_gif(path)?));
    }

    #[cfg(feature = "ffmpeg")]
    {
        Ok(Box::new(ffmpeg::FfmpegVideoSource::open(path)?))
    }

    #[cfg(not(feature = "ffmpeg"))]
    {
        anyhow::bail!(
            "Cannot decode {:?}: this build only reads GIF videos (enable the `ffmpeg` feature)",
            path
        )
    }
}

/// Start a recording named [`RECORDING_FILE_NAME`] inside `dir`. Encodes
/// MP4 when built with `ffmpeg`, animated GIF otherwise.
pub fn create_recorder(dir: &Path, fps: f64) -> anyhow::Result<(Box<dyn RecordingSink>, PathBuf)> {
    #[cfg(feature = "ffmpeg")]
    {
        let recorder = ffmpeg::Mp4Recorder::create(dir, fps)?;
        let path = recorder.path().to_path_buf();
        Ok((Box::new(recorder), path))
    }

    #[cfg(not(feature = "ffmpeg"))]
    {
        let recorder = GifRecorder::create(dir, fps)?;
        let path = recorder.path().to_path_buf();
        Ok((Box::new(recorder), path))
    }
}

/// Open a live camera device (e.g. `/dev/video1`).
pub fn open_camera(device: &str) -> anyhow::Result<Box<dyn FrameSource>> {
    #[cfg(feature = "camera-v4l")]
    {
        let config = camera::CameraConfig {
            device: device.to_string(),
            ..Default::default()
        };
        Ok(Box::new(camera::V4lCameraSource::open(config)?))
    }

    #[cfg(not(feature = "camera-v4l"))]
    {
        anyhow::bail!(
            "Cannot open camera {}: this build has no camera backend (enable the `camera-v4l` feature)",
            device
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gif_is_always_offered() {
        assert!(VIDEO_EXTENSIONS.contains(&"gif"));
    }

    #[test]
    #[cfg(not(feature = "ffmpeg"))]
    fn test_containers_need_ffmpeg() {
        assert_eq!(VIDEO_EXTENSIONS, ["gif"]);
        match open_video("clip.mp4") {
            Ok(source) => panic!("opened {}", source.describe()),
            Err(err) => assert!(format!("{:#}", err).contains("ffmpeg")),
        }
    }
}
