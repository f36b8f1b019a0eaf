//! Video files decoded with FFmpeg, and MP4 recordings encoded with it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ffmpeg::Rational;
use ffmpeg::util::format::pixel::Pixel;
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use image::imageops::{self, FilterType};

use super::{DEFAULT_FPS, FrameSource, RecordingSink};

/// File name of an MP4 recording inside the patient folder.
pub const RECORDING_FILE_NAME: &str = "camera_record.mp4";

pub struct FfmpegVideoSource {
    path: PathBuf,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    time_base: Rational,
    start_pts: i64,
    fps: f64,
    position: u64,
    /// Frame decoded while seeking, handed out by the next read.
    pending: Option<ffmpeg::frame::Video>,
    eof_sent: bool,
}

impl FfmpegVideoSource {
    pub fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open video {:?} with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let time_base = input_stream.time_base();
        let start_pts = match input_stream.start_time() {
            ffmpeg::ffi::AV_NOPTS_VALUE => 0,
            start => start,
        };
        let rate = input_stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 && rate.numerator() > 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            DEFAULT_FPS
        };
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!("Opened video {} ({:.1} fps, ffmpeg)", path.display(), fps);
        Ok(Self {
            path: path.to_path_buf(),
            input,
            stream_index,
            decoder,
            scaler,
            time_base,
            start_pts,
            fps,
            position: 0,
            pending: None,
            eof_sent: false,
        })
    }

    fn decode_next(&mut self) -> Result<Option<ffmpeg::frame::Video>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.eof_sent {
                return Ok(None);
            }

            let next = self.input.packets().next();
            match next {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .context("send packet to ffmpeg decoder")?;
                }
                None => {
                    self.decoder.send_eof().context("flush ffmpeg decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    /// Frame number of a decoded frame, from its presentation timestamp.
    fn frame_index(&self, decoded: &ffmpeg::frame::Video) -> Option<u64> {
        let pts = decoded.timestamp().or_else(|| decoded.pts())?;
        let seconds = (pts - self.start_pts) as f64 * f64::from(self.time_base);
        Some((seconds * self.fps).round().max(0.0) as u64)
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<RgbImage> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow::anyhow!("decoded frame has an unexpected size"))
    }
}

impl FrameSource for FfmpegVideoSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let decoded = match self.pending.take() {
            Some(decoded) => decoded,
            None => match self.decode_next()? {
                Some(decoded) => decoded,
                None => return Ok(None),
            },
        };
        self.position = self
            .frame_index(&decoded)
            .map_or(self.position + 1, |index| index + 1);
        self.convert(&decoded).map(Some)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        let seconds = frame as f64 / self.fps;
        let timestamp = (seconds * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
        self.input
            .seek(timestamp, ..timestamp)
            .with_context(|| format!("failed to seek {:?}", self.path))?;
        self.decoder.flush();
        self.eof_sent = false;
        self.pending = None;

        // The demuxer lands on the keyframe at or before the target.
        while let Some(decoded) = self.decode_next()? {
            let index = self.frame_index(&decoded);
            if index.is_none_or(|index| index >= frame) {
                self.position = index.unwrap_or(frame);
                self.pending = Some(decoded);
                return Ok(());
            }
        }
        self.position = frame;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data[..row_bytes * height as usize].to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

/// MPEG-4 recording. The encoder opens on the first frame, once the frame
/// size is known.
pub struct Mp4Recorder {
    path: PathBuf,
    fps: i32,
    writer: Option<Mp4Writer>,
    frames_written: i64,
}

impl Mp4Recorder {
    /// Prepare `dir/camera_record.mp4`, creating `dir` if needed.
    pub fn create(dir: &Path, fps: f64) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output folder {:?}", dir))?;
        let path = dir.join(RECORDING_FILE_NAME);
        log::info!("Recording to {}", path.display());
        Ok(Self {
            path,
            fps: if fps > 0.0 { fps.round().max(1.0) as i32 } else { DEFAULT_FPS as i32 },
            writer: None,
            frames_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordingSink for Mp4Recorder {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => Mp4Writer::open(&self.path, self.fps, frame.width(), frame.height())?,
        };
        let writer = self.writer.insert(writer);
        writer
            .write(frame, self.frames_written)
            .with_context(|| format!("Failed to write frame to {:?}", self.path))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        let Mp4Recorder {
            path,
            writer,
            frames_written,
            ..
        } = *self;
        let Some(writer) = writer else {
            anyhow::bail!("Recording {:?} has no frames", path);
        };
        writer
            .finish()
            .with_context(|| format!("Failed to finalize recording {:?}", path))?;
        log::info!("Recording saved to {} ({} frames)", path.display(), frames_written);
        Ok(path)
    }
}

struct Mp4Writer {
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
}

impl Mp4Writer {
    fn open(path: &Path, fps: i32, width: u32, height: u32) -> Result<Self> {
        // YUV 4:2:0 needs even dimensions.
        let (width, height) = (width & !1, height & !1);
        if width == 0 || height == 0 {
            anyhow::bail!("frame is too small to record");
        }

        let mut output = ffmpeg::format::output(&path)
            .with_context(|| format!("failed to create {:?}", path))?;
        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| anyhow::anyhow!("ffmpeg has no MPEG-4 encoder"))?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);

        let encoder_time_base = Rational::new(1, fps);
        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .context("create MPEG-4 encoder")?;
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(Rational::new(fps, 1)));
        encoder.set_bit_rate(4_000_000);
        if global_header {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }
        let encoder = encoder.open_as(codec).context("open MPEG-4 encoder")?;

        {
            let mut stream = output.add_stream(codec).context("add video stream")?;
            stream.set_parameters(&encoder);
            stream.set_time_base(encoder_time_base);
        }
        output.write_header().context("write MP4 header")?;
        let stream_time_base = output
            .stream(0)
            .map(|stream| stream.time_base())
            .unwrap_or(encoder_time_base);

        let scaler = ffmpeg::software::scaling::context::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            output,
            encoder,
            scaler,
            encoder_time_base,
            stream_time_base,
            width,
            height,
        })
    }

    fn write(&mut self, frame: &RgbImage, pts: i64) -> Result<()> {
        let resized;
        let frame = if frame.width() >= self.width && frame.height() >= self.height {
            frame
        } else {
            resized = imageops::resize(frame, self.width, self.height, FilterType::Triangle);
            &resized
        };

        let mut rgb = ffmpeg::frame::Video::new(Pixel::RGB24, self.width, self.height);
        let row_bytes = self.width as usize * 3;
        let src_stride = frame.width() as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data_mut(0);
        for (row, pixels) in frame
            .as_raw()
            .chunks_exact(src_stride)
            .take(self.height as usize)
            .enumerate()
        {
            let start = row * stride;
            data[start..start + row_bytes].copy_from_slice(&pixels[..row_bytes]);
        }

        let mut yuv = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .context("convert frame to YUV")?;
        yuv.set_pts(Some(pts));
        self.encoder.send_frame(&yuv).context("encode frame")?;
        self.drain()
    }

    fn drain(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .context("write MP4 packet")?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.encoder.send_eof().context("flush encoder")?;
        self.drain()?;
        self.output.write_trailer().context("write MP4 trailer")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shade_of(frame: &RgbImage) -> i32 {
        frame.get_pixel(frame.width() / 2, frame.height() / 2).0[0] as i32
    }

    fn record_ramp(dir: &Path, count: u32) -> PathBuf {
        let mut recorder = Box::new(Mp4Recorder::create(dir, 10.0).unwrap());
        for i in 0..count {
            let shade = (i * 4) as u8;
            recorder
                .write_frame(&RgbImage::from_pixel(64, 48, image::Rgb([shade; 3])))
                .unwrap();
        }
        recorder.finish().unwrap()
    }

    #[test]
    fn test_recording_round_trips_through_decoder() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = record_ramp(dir.path(), 30);
        assert_eq!(path.file_name().unwrap(), RECORDING_FILE_NAME);

        let mut source = FfmpegVideoSource::open(&path).unwrap();
        let mut frames = 0;
        while source.read_frame().unwrap().is_some() {
            frames += 1;
        }
        assert_eq!(frames, 30);
    }

    #[test]
    fn test_seek_lands_on_requested_frame() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = record_ramp(dir.path(), 60);
        let mut source = FfmpegVideoSource::open(&path).unwrap();
        for _ in 0..45 {
            source.read_frame().unwrap();
        }
        assert_eq!(source.position(), 45);

        source.seek(25).unwrap();
        assert_eq!(source.position(), 25);
        let frame = source.read_frame().unwrap().unwrap();
        assert!((shade_of(&frame) - 100).abs() <= 8, "shade {}", shade_of(&frame));
        assert_eq!(source.position(), 26);
    }

    #[test]
    fn test_empty_recording_reports_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let recorder = Box::new(Mp4Recorder::create(dir.path(), 10.0).unwrap());
        assert!(recorder.finish().is_err());
    }
}
