//! Live camera source over V4L2.

use anyhow::{Context, Result};
use image::{ImageFormat, RgbImage};
use ouroboros::self_referencing;

use super::FrameSource;

#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video1")
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video1".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

#[self_referencing]
struct CameraStream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

/// Pixel layouts the camera may deliver, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    Rgb3,
    Yuyv,
    Mjpg,
}

impl PixelFormat {
    const PREFERENCE: [PixelFormat; 3] =
        [PixelFormat::Rgb3, PixelFormat::Yuyv, PixelFormat::Mjpg];

    fn fourcc(self) -> v4l::FourCC {
        match self {
            PixelFormat::Rgb3 => v4l::FourCC::new(b"RGB3"),
            PixelFormat::Yuyv => v4l::FourCC::new(b"YUYV"),
            PixelFormat::Mjpg => v4l::FourCC::new(b"MJPG"),
        }
    }

    fn from_fourcc(fourcc: v4l::FourCC) -> Option<Self> {
        Self::PREFERENCE
            .into_iter()
            .find(|format| format.fourcc() == fourcc)
    }

    fn to_rgb(self, data: &[u8], width: u32, height: u32) -> Result<RgbImage> {
        match self {
            PixelFormat::Rgb3 => {
                let expected = width as usize * height as usize * 3;
                if data.len() < expected {
                    anyhow::bail!("camera frame too short: {} < {}", data.len(), expected);
                }
                RgbImage::from_raw(width, height, data[..expected].to_vec())
                    .context("camera frame has an unexpected size")
            }
            PixelFormat::Yuyv => yuyv_to_rgb(data, width, height),
            PixelFormat::Mjpg => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)
                .context("decode MJPG camera frame")?
                .to_rgb8()),
        }
    }
}

/// Convert packed YUYV 4:2:2 (BT.601) to RGB.
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    let expected = width as usize * height as usize * 2;
    if data.len() < expected {
        anyhow::bail!("camera frame too short: {} < {}", data.len(), expected);
    }

    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for chunk in data[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            let rgb = [y + 1.402 * v, y - 0.344_136 * u - 0.714_136 * v, y + 1.772 * u];
            pixels.extend(rgb.map(|c| c.round().clamp(0.0, 255.0) as u8));
        }
    }
    RgbImage::from_raw(width, height, pixels).context("camera frame has an unexpected size")
}

pub struct V4lCameraSource {
    config: CameraConfig,
    state: CameraStream,
    pixel_format: PixelFormat,
    frames_captured: u64,
    active_width: u32,
    active_height: u32,
}

impl V4lCameraSource {
    pub fn open(config: CameraConfig) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&config.device)
            .with_context(|| format!("open camera {}", config.device))?;

        let mut negotiated = None;
        for wanted in PixelFormat::PREFERENCE {
            let mut format = device.format().context("read camera format")?;
            format.width = config.width;
            format.height = config.height;
            format.fourcc = wanted.fourcc();
            match device.set_format(&format) {
                Ok(format) => {
                    if let Some(pixel_format) = PixelFormat::from_fourcc(format.fourcc) {
                        negotiated = Some((format, pixel_format));
                        break;
                    }
                }
                Err(err) => {
                    log::debug!("Camera {}: {} rejected: {}", config.device, wanted.fourcc(), err)
                }
            }
        }
        let (format, pixel_format) = match negotiated {
            Some(negotiated) => negotiated,
            None => {
                let format = device.format().context("read camera format after set failure")?;
                let pixel_format = PixelFormat::from_fourcc(format.fourcc).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Camera {} delivers {}, expected RGB3, YUYV or MJPG",
                        config.device,
                        format.fourcc
                    )
                })?;
                (format, pixel_format)
            }
        };

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("Camera {}: failed to set fps: {}", config.device, err);
            }
        }

        let state = CameraStreamTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create camera buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "Opened camera {} ({}x{}, {})",
            config.device,
            format.width,
            format.height,
            format.fourcc
        );
        Ok(Self {
            active_width: format.width,
            active_height: format.height,
            config,
            state,
            pixel_format,
            frames_captured: 0,
        })
    }
}

impl FrameSource for V4lCameraSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        use v4l::io::traits::CaptureStream;

        let (width, height) = (self.active_width, self.active_height);
        let pixel_format = self.pixel_format;
        let frame = self
            .state
            .with_mut(|fields| {
                fields
                    .stream
                    .next()
                    .context("capture camera frame")
                    .and_then(|(buf, _meta)| pixel_format.to_rgb(buf, width, height))
            })?;
        self.frames_captured += 1;
        Ok(Some(frame))
    }

    fn position(&self) -> u64 {
        self.frames_captured
    }

    fn fps(&self) -> f64 {
        self.config.target_fps as f64
    }

    fn seek(&mut self, _frame: u64) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        self.config.device.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_chroma_is_grey() {
        // Two pixels: Y0=128, U=128, Y1=255, V=128
        let frame = yuyv_to_rgb(&[128, 128, 255, 128], 2, 1).unwrap();
        assert_eq!(frame.get_pixel(0, 0).0, [128, 128, 128]);
        assert_eq!(frame.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_yuyv_red_chroma() {
        let frame = yuyv_to_rgb(&[76, 85, 76, 255], 2, 1).unwrap();
        let [r, g, b] = frame.get_pixel(0, 0).0;
        assert!(r > 240 && g < 10 && b < 10, "got {:?}", (r, g, b));
    }

    #[test]
    fn test_short_yuyv_frame_is_rejected() {
        assert!(yuyv_to_rgb(&[0; 6], 2, 2).is_err());
    }

    #[test]
    fn test_fourcc_lookup() {
        assert_eq!(
            PixelFormat::from_fourcc(v4l::FourCC::new(b"YUYV")),
            Some(PixelFormat::Yuyv)
        );
        assert_eq!(PixelFormat::from_fourcc(v4l::FourCC::new(b"GREY")), None);
    }
}
