//! Capture/inference state machine.
//!
//! `CaptureSession` owns the active frame source, the optional recording sink
//! and the accumulated per-frame results. It has no UI dependency: a GUI timer,
//! a background task or a test drives it through explicit transitions, and
//! `tick` is the single "process next available frame" step.

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::capture::{self, FrameSource, RecordingSink};
use crate::detection::CariesDetector;
use crate::models::{FrameResult, PatientRecord, SourceMode};
use crate::report::Summary;

/// How far `rewind` moves back.
pub const REWIND_SECONDS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No video or camera is running.
    Idle,
    Paused,
    /// One frame was read and run through the model.
    Processed,
    /// The source ran out of frames and was released. Carries the path of
    /// a recording that was finalized with it.
    Finished { recording: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Aggregation requested before any frame produced a result.
    NoResults,
    /// Video still playing or camera still running.
    NotFinished,
    /// The selected video file or camera device could not be opened.
    SourceOpen { mode: SourceMode, reason: String },
    /// Recording needs an active video or camera.
    NoActiveSource,
    /// Recording needs a patient name for the output folder.
    MissingPatientName,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoResults => write!(
                f,
                "Please upload, complete video, or stop camera before analyzing."
            ),
            SessionError::NotFinished => write!(
                f,
                "Analysis is available once the video finishes or the camera is stopped."
            ),
            SessionError::SourceOpen { mode, reason } => {
                write!(f, "Failed to open {}: {}", mode, reason)
            }
            SessionError::NoActiveSource => write!(f, "Start a video or camera before recording."),
            SessionError::MissingPatientName => {
                write!(f, "A patient name is required to save a recording.")
            }
        }
    }
}

impl std::error::Error for SessionError {}

pub struct CaptureSession {
    detector: Box<dyn CariesDetector>,
    mode: SourceMode,
    source: Option<Box<dyn FrameSource>>,
    recorder: Option<Box<dyn RecordingSink>>,
    results: Vec<FrameResult>,
    preview: Option<RgbImage>,
    paused: bool,
    finished: bool,
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("mode", &self.mode)
            .field("has_source", &self.source.is_some())
            .field("recording", &self.recorder.is_some())
            .field("results", &self.results.len())
            .field("paused", &self.paused)
            .field("finished", &self.finished)
            .finish()
    }
}

impl CaptureSession {
    pub fn new(detector: Box<dyn CariesDetector>) -> Self {
        Self {
            detector,
            mode: SourceMode::Idle,
            source: None,
            recorder: None,
            results: Vec::new(),
            preview: None,
            paused: false,
            finished: false,
        }
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn results(&self) -> &[FrameResult] {
        &self.results
    }

    /// Latest annotated frame.
    pub fn preview(&self) -> Option<&RgbImage> {
        self.preview.as_ref()
    }

    pub fn class_names(&self) -> &[String] {
        self.detector.class_names()
    }

    /// Whether the mode has reached a state where analysis may be requested.
    pub fn can_aggregate(&self) -> bool {
        self.mode != SourceMode::Idle && self.finished
    }

    /// Release any source and recording, drop accumulated results and return
    /// to idle. This is the only path that clears results.
    pub fn clear(&mut self) {
        if let Some(source) = self.source.take() {
            log::debug!("Released {}", source.describe());
        }
        self.finalize_recording_quietly();
        self.results.clear();
        self.preview = None;
        self.mode = SourceMode::Idle;
        self.paused = false;
        self.finished = false;
    }

    /// Run the model once on a still image.
    pub fn load_image(&mut self, frame: RgbImage) -> anyhow::Result<&FrameResult> {
        self.clear();
        let result = self.detector.detect(&frame)?;
        log::info!("Image processed: {} detections", result.detections.len());
        self.preview = Some(result.annotated.clone());
        self.results.push(result);
        self.mode = SourceMode::Image;
        self.finished = true;
        Ok(&self.results[0])
    }

    pub fn open_image<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<&FrameResult> {
        let frame = capture::open_image(path)?;
        self.load_image(frame)
    }

    pub fn start_video(&mut self, source: Box<dyn FrameSource>) {
        self.start_stream(SourceMode::Video, source);
    }

    pub fn start_camera(&mut self, source: Box<dyn FrameSource>) {
        self.start_stream(SourceMode::Camera, source);
    }

    /// Open a video file and start playback. On failure the session is idle.
    pub fn open_video<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SessionError> {
        self.clear();
        match capture::open_video(path.as_ref()) {
            Ok(source) => {
                self.start_video(source);
                Ok(())
            }
            Err(err) => {
                log::warn!("Failed to open video {:?}: {:#}", path.as_ref(), err);
                Err(SessionError::SourceOpen {
                    mode: SourceMode::Video,
                    reason: format!("{:#}", err),
                })
            }
        }
    }

    /// Open a camera device and start streaming. On failure the session is idle.
    pub fn open_camera(&mut self, device: &str) -> Result<(), SessionError> {
        self.clear();
        match capture::open_camera(device) {
            Ok(source) => {
                self.start_camera(source);
                Ok(())
            }
            Err(err) => {
                log::warn!("Failed to open camera {}: {:#}", device, err);
                Err(SessionError::SourceOpen {
                    mode: SourceMode::Camera,
                    reason: format!("{:#}", err),
                })
            }
        }
    }

    fn start_stream(&mut self, mode: SourceMode, source: Box<dyn FrameSource>) {
        self.clear();
        log::info!("Started {} from {}", mode, source.describe());
        self.source = Some(source);
        self.mode = mode;
    }

    /// Process the next available frame.
    ///
    /// While paused this does nothing. At end of stream the source is released,
    /// any recording is finalized and aggregation becomes available.
    pub fn tick(&mut self) -> anyhow::Result<TickOutcome> {
        if !matches!(self.mode, SourceMode::Video | SourceMode::Camera) {
            return Ok(TickOutcome::Idle);
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(TickOutcome::Idle);
        };
        if self.paused {
            return Ok(TickOutcome::Paused);
        }

        match source.read_frame()? {
            Some(frame) => {
                let result = self.detector.detect(&frame)?;
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.write_frame(&result.annotated)?;
                }
                self.preview = Some(result.annotated.clone());
                self.results.push(result);
                Ok(TickOutcome::Processed)
            }
            None => {
                if let Some(source) = self.source.take() {
                    log::info!(
                        "{} finished after {} frames",
                        source.describe(),
                        self.results.len()
                    );
                }
                self.paused = false;
                self.finished = true;
                let recording = self.stop_recording()?;
                Ok(TickOutcome::Finished { recording })
            }
        }
    }

    pub fn pause(&mut self) {
        if self.source.is_some() {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Seek back `REWIND_SECONDS`, clamped to the first frame.
    pub fn rewind(&mut self) -> anyhow::Result<()> {
        let Some(source) = self.source.as_mut() else {
            return Ok(());
        };
        let back = (source.fps() * REWIND_SECONDS) as u64;
        let target = source.position().saturating_sub(back);
        source.seek(target)?;
        log::debug!("Rewound to frame {}", target);
        Ok(())
    }

    /// Stop video playback. Results are discarded.
    pub fn stop_video(&mut self) {
        self.clear();
    }

    /// Start writing annotated frames to `<output_root>/<name>_result/`.
    pub fn start_recording(
        &mut self,
        output_root: &Path,
        patient: &PatientRecord,
    ) -> anyhow::Result<PathBuf> {
        let Some(fps) = self.source.as_ref().map(|source| source.fps()) else {
            return Err(SessionError::NoActiveSource.into());
        };
        if patient.name.trim().is_empty() {
            return Err(SessionError::MissingPatientName.into());
        }
        self.finalize_recording_quietly();

        let (recorder, path) = capture::create_recorder(&patient.result_dir(output_root), fps)?;
        self.recorder = Some(recorder);
        Ok(path)
    }

    /// Finalize the recording, if one is active.
    pub fn stop_recording(&mut self) -> anyhow::Result<Option<PathBuf>> {
        match self.recorder.take() {
            Some(recorder) => Ok(Some(recorder.finish()?)),
            None => Ok(None),
        }
    }

    /// Stop the camera: release the device, finalize any recording and make
    /// the accumulated results available for analysis.
    pub fn stop_camera(&mut self) -> anyhow::Result<Option<PathBuf>> {
        if let Some(source) = self.source.take() {
            log::info!(
                "Stopped {} after {} frames",
                source.describe(),
                self.results.len()
            );
        }
        self.paused = false;
        self.finished = true;
        self.stop_recording()
    }

    /// Tally the accumulated results.
    pub fn aggregate(&self) -> Result<Summary, SessionError> {
        if self.results.is_empty() {
            return Err(SessionError::NoResults);
        }
        if !self.finished {
            return Err(SessionError::NotFinished);
        }
        Ok(Summary::new(
            &self.results,
            self.detector.class_names(),
            self.mode,
        ))
    }

    fn finalize_recording_quietly(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            if let Err(err) = recorder.finish() {
                log::warn!("Failed to finalize recording: {:#}", err);
            }
        }
    }
}
