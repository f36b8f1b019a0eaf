use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame, RgbImage};

/// File name of a GIF recording inside the patient folder.
pub const RECORDING_FILE_NAME: &str = "camera_record.gif";

/// Destination for annotated frames while recording is on.
pub trait RecordingSink {
    fn write_frame(&mut self, frame: &RgbImage) -> anyhow::Result<()>;

    /// Finalize the output and return where it was written.
    fn finish(self: Box<Self>) -> anyhow::Result<PathBuf>;
}

/// Quantizer speed for `GifEncoder` (1 to 30). The fastest setting keeps a
/// 640x480 frame well inside one tick.
const GIF_SPEED: i32 = 30;

/// Writes an animated GIF, one frame per processed tick.
pub struct GifRecorder {
    encoder: GifEncoder<BufWriter<File>>,
    path: PathBuf,
    delay: Delay,
    frames_written: u64,
}

impl GifRecorder {
    /// Create `dir/camera_record.gif`, creating `dir` if needed.
    pub fn create(dir: &Path, fps: f64) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output folder {:?}", dir))?;
        let path = dir.join(RECORDING_FILE_NAME);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create recording {:?}", path))?;

        let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), GIF_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .context("Failed to configure recording")?;

        let frame_ms = if fps > 0.0 { (1000.0 / fps).round() as u32 } else { 50 };
        log::info!("Recording to {}", path.display());
        Ok(Self {
            encoder,
            path,
            delay: Delay::from_numer_denom_ms(frame_ms.max(1), 1),
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordingSink for GifRecorder {
    fn write_frame(&mut self, frame: &RgbImage) -> anyhow::Result<()> {
        let rgba = DynamicImage::ImageRgb8(frame.clone()).to_rgba8();
        self.encoder
            .encode_frame(Frame::from_parts(rgba, 0, 0, self.delay))
            .with_context(|| format!("Failed to write frame to {:?}", self.path))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> anyhow::Result<PathBuf> {
        let GifRecorder {
            encoder,
            path,
            frames_written,
            ..
        } = *self;
        // The GIF trailer is written when the encoder is dropped.
        drop(encoder);
        log::info!("Recording saved to {} ({} frames)", path.display(), frames_written);
        Ok(path)
    }
}
