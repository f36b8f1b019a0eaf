use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, RgbImage};

use super::{DEFAULT_FPS, FrameSource};

/// A finite, seekable list of frames held in memory.
///
/// Backs GIF video files, and stands in for a video or camera in tests.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<RgbImage>,
    fps: f64,
    cursor: usize,
    name: String,
}

impl FrameSequence {
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
        Self {
            frames,
            fps: if fps > 0.0 { fps } else { DEFAULT_FPS },
            cursor: 0,
            name: "in-memory frames".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Decode every frame of an animated GIF up front.
    pub fn open_gif<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open video {:?}", path))?;
        let decoder = GifDecoder::new(BufReader::new(file))
            .with_context(|| format!("Invalid GIF video {:?}", path))?;
        let frames = decoder
            .into_frames()
            .collect_frames()
            .with_context(|| format!("Failed to decode frames of {:?}", path))?;

        if frames.is_empty() {
            anyhow::bail!("Video {:?} contains no frames", path);
        }

        let (numer, denom) = frames[0].delay().numer_denom_ms();
        let delay_ms = if denom == 0 { 0.0 } else { numer as f64 / denom as f64 };
        let fps = if delay_ms > 0.0 { 1000.0 / delay_ms } else { DEFAULT_FPS };

        let frames: Vec<RgbImage> = frames
            .into_iter()
            .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8())
            .collect();
        log::info!(
            "Opened video {} ({} frames at {:.1} fps)",
            path.display(),
            frames.len(),
            fps
        );

        Ok(Self::new(frames, fps).with_name(path.display().to_string()))
    }
}

impl FrameSource for FrameSequence {
    fn read_frame(&mut self) -> anyhow::Result<Option<RgbImage>> {
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn position(&self) -> u64 {
        self.cursor as u64
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn seek(&mut self, frame: u64) -> anyhow::Result<()> {
        self.cursor = (frame as usize).min(self.frames.len());
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
