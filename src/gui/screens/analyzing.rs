use std::path::PathBuf;

use iced::{
    Alignment::Center,
    Element, Length, Task,
    widget::{button, column, container, image, row, text},
};
use rfd::AsyncFileDialog;

use crate::{
    gui::{
        AppState,
        screens::{Screen, ScreenMessage},
        widgets::{heading, rgb_handle},
    },
    capture::VIDEO_EXTENSIONS,
    models::SourceMode,
    report::Summary,
    session::{CaptureSession, TickOutcome},
};

/// Snapshot of the session flags the controls depend on.
#[derive(Debug, Clone, Default)]
struct Controls {
    mode: SourceMode,
    streaming: bool,
    paused: bool,
    recording: bool,
    can_aggregate: bool,
    frames: usize,
}

impl Controls {
    fn from_session(session: &CaptureSession) -> Self {
        Self {
            mode: session.mode(),
            streaming: session.has_source(),
            paused: session.is_paused(),
            recording: session.is_recording(),
            can_aggregate: session.can_aggregate(),
            frames: session.results().len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzingScreen {
    controls: Controls,
    preview: Option<image::Handle>,
}

#[derive(Debug, Clone)]
pub enum AnalyzingMessage {
    UploadImage,
    UploadVideo,
    ImagePicked(PathBuf),
    VideoPicked(PathBuf),
    RemoveImage,
    StartCamera,
    StopCamera,
    StopVideo,
    TogglePause,
    Rewind,
    ToggleRecording,
    Analyze,
    Tick,
    Back,
    None,
}

#[derive(Debug, Clone)]
pub enum ParentMessage {
    Back,
    Analyzed(Summary),
}

fn msg(message: AnalyzingMessage) -> ScreenMessage<AnalyzingScreen> {
    ScreenMessage::ScreenMessage(message)
}

fn pick_file(
    title: &str,
    filter: &str,
    extensions: &'static [&'static str],
    picked: fn(PathBuf) -> AnalyzingMessage,
) -> Task<ScreenMessage<AnalyzingScreen>> {
    Task::perform(
        AsyncFileDialog::new()
            .set_title(title)
            .add_filter(filter, extensions)
            .pick_file(),
        move |handle| match handle {
            Some(data) => msg(picked(data.path().to_path_buf())),
            None => msg(AnalyzingMessage::None),
        },
    )
}

impl AnalyzingScreen {
    pub fn new(session: &CaptureSession) -> Self {
        Self {
            controls: Controls::from_session(session),
            preview: session.preview().map(rgb_handle),
        }
    }

    fn sync(&mut self, session: &CaptureSession) {
        *self = Self::new(session);
    }

    fn stream_controls(&self) -> Element<'_, ScreenMessage<Self>> {
        let controls = &self.controls;
        if controls.mode == SourceMode::Image {
            return button("Remove Image")
                .on_press(msg(AnalyzingMessage::RemoveImage))
                .into();
        }
        if !controls.streaming {
            return row![].into();
        }

        let pause_label = if controls.paused { "Resume" } else { "Pause" };
        let record_label = if controls.recording {
            "Stop Recording"
        } else {
            "Start Recording"
        };

        let mut buttons = row![
            button(pause_label).on_press(msg(AnalyzingMessage::TogglePause)),
            button(record_label).on_press(msg(AnalyzingMessage::ToggleRecording)),
        ]
        .spacing(10);

        buttons = match controls.mode {
            SourceMode::Video => buttons
                .push(button("Rewind 5s").on_press(msg(AnalyzingMessage::Rewind)))
                .push(button("Stop Video").on_press(msg(AnalyzingMessage::StopVideo))),
            SourceMode::Camera => {
                buttons.push(button("Stop Camera").on_press(msg(AnalyzingMessage::StopCamera)))
            }
            SourceMode::Idle | SourceMode::Image => buttons,
        };
        buttons.into()
    }
}

impl Screen for AnalyzingScreen {
    type Message = AnalyzingMessage;
    type ParentMessage = ParentMessage;

    fn view(&self) -> Element<'_, ScreenMessage<Self>> {
        let controls = &self.controls;

        let sources = row![
            button("Upload Image").on_press(msg(AnalyzingMessage::UploadImage)),
            button("Upload Video").on_press(msg(AnalyzingMessage::UploadVideo)),
            button("Start Camera").on_press(msg(AnalyzingMessage::StartCamera)),
        ]
        .spacing(10);

        let preview: Element<'_, ScreenMessage<Self>> = match &self.preview {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text("Upload an image, a video or start the camera."))
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        let status = text(format!(
            "Source: {}{}{} | Frames analysed: {}",
            controls.mode,
            if controls.paused { " (paused)" } else { "" },
            if controls.recording { " (recording)" } else { "" },
            controls.frames
        ));

        let analyze = button("Analyze");
        let analyze = if controls.can_aggregate {
            analyze.on_press(msg(AnalyzingMessage::Analyze))
        } else {
            analyze
        };

        let content = column![
            heading("Screening"),
            sources,
            container(preview)
                .width(Length::Fill)
                .height(Length::Fill)
                .style(container::bordered_box),
            status,
            self.stream_controls(),
            row![
                button("Back").on_press(msg(AnalyzingMessage::Back)),
                analyze
            ]
            .spacing(10),
        ]
        .spacing(12)
        .padding(20)
        .align_x(Center);

        container(content)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn update(
        &mut self,
        message: Self::Message,
        state: &mut AppState,
    ) -> Task<ScreenMessage<Self>> {
        let task = match message {
            AnalyzingMessage::UploadImage => pick_file(
                "Select Image",
                "Images",
                &["png", "jpg", "jpeg", "bmp"],
                AnalyzingMessage::ImagePicked,
            ),
            AnalyzingMessage::UploadVideo => pick_file(
                "Select Video",
                "Videos",
                VIDEO_EXTENSIONS,
                AnalyzingMessage::VideoPicked,
            ),
            AnalyzingMessage::ImagePicked(path) => {
                let loaded = state.session.open_image(&path).map(|_| ());
                if let Err(err) = loaded {
                    state.session.clear();
                    state.report_error(format!("{:#}", err));
                }
                Task::none()
            }
            AnalyzingMessage::RemoveImage => {
                state.session.clear();
                Task::none()
            }
            AnalyzingMessage::VideoPicked(path) => {
                if let Err(err) = state.session.open_video(&path) {
                    state.report_error(err);
                }
                Task::none()
            }
            AnalyzingMessage::StartCamera => {
                let device = state.config.camera_device.clone();
                if let Err(err) = state.session.open_camera(&device) {
                    state.report_error(err);
                }
                Task::none()
            }
            AnalyzingMessage::StopCamera => {
                match state.session.stop_camera() {
                    Ok(Some(path)) => state.notify(format!("Recording saved to {}", path.display())),
                    Ok(None) => {}
                    Err(err) => state.report_error(format!("{:#}", err)),
                }
                Task::none()
            }
            AnalyzingMessage::StopVideo => {
                state.session.stop_video();
                Task::none()
            }
            AnalyzingMessage::TogglePause => {
                if state.session.is_paused() {
                    state.session.resume();
                } else {
                    state.session.pause();
                }
                Task::none()
            }
            AnalyzingMessage::Rewind => {
                if let Err(err) = state.session.rewind() {
                    state.report_error(format!("{:#}", err));
                }
                Task::none()
            }
            AnalyzingMessage::ToggleRecording => {
                if state.session.is_recording() {
                    match state.session.stop_recording() {
                        Ok(Some(path)) => {
                            state.notify(format!("Recording saved to {}", path.display()))
                        }
                        Ok(None) => {}
                        Err(err) => state.report_error(format!("{:#}", err)),
                    }
                } else {
                    match state.patient.clone() {
                        Some(patient) => {
                            let output_root = state.config.output_root.clone();
                            if let Err(err) = state.session.start_recording(&output_root, &patient)
                            {
                                state.report_error(format!("{:#}", err));
                            }
                        }
                        None => state.report_error("No patient is selected."),
                    }
                }
                Task::none()
            }
            AnalyzingMessage::Analyze => match state.session.aggregate() {
                Ok(summary) => Task::done(ScreenMessage::ParentMessage(ParentMessage::Analyzed(
                    summary,
                ))),
                Err(err) => {
                    state.report_error(err);
                    Task::none()
                }
            },
            AnalyzingMessage::Tick => {
                let mode = state.session.mode();
                match state.session.tick() {
                    Ok(TickOutcome::Finished { recording }) => {
                        let finished = match mode {
                            SourceMode::Camera => "Camera stream ended.",
                            _ => "Video finished.",
                        };
                        match recording {
                            Some(path) => state.notify(format!(
                                "{} Recording saved to {}. Analysis is now available.",
                                finished,
                                path.display()
                            )),
                            None => state.notify(format!("{} Analysis is now available.", finished)),
                        }
                    }
                    Ok(_) => {}
                    Err(err) if mode == SourceMode::Camera => {
                        // Frames captured so far stay available for analysis.
                        if let Err(stop_err) = state.session.stop_camera() {
                            log::warn!("Failed to stop camera cleanly: {:#}", stop_err);
                        }
                        state.report_error(format!("Camera frame failed: {:#}", err));
                    }
                    Err(err) => {
                        state.session.stop_video();
                        state.report_error(format!("Frame processing failed: {:#}", err));
                    }
                }
                Task::none()
            }
            AnalyzingMessage::Back => Task::done(ScreenMessage::ParentMessage(ParentMessage::Back)),
            AnalyzingMessage::None => Task::none(),
        };
        self.sync(&state.session);
        task
    }
}
