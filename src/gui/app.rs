use std::cell::RefCell;
use std::rc::Rc;

use iced::{Element, Subscription, Task, widget::stack};

use super::{
    AppState, Message,
    screens::{Screen, ScreenData, ScreenMessage, intake::IntakeScreen},
    widgets::notice,
};
use crate::{
    config::AppConfig, core::db::PatientDb, detection::CariesDetector, models::FrameResult,
    session::CaptureSession,
};

pub struct CariesApp {
    state: AppState,
    screen: ScreenData,
}

impl CariesApp {
    pub fn new(config: AppConfig, detector: Box<dyn CariesDetector>) -> (Self, Task<Message>) {
        let store_path = config.store_path.clone();
        let open_store = Task::perform(
            async move { PatientDb::new(store_path).await.map_err(|e| format!("{:#}", e)) },
            Message::StoreOpened,
        );
        (
            Self {
                state: AppState::new(config, CaptureSession::new(detector)),
                screen: ScreenData::Intake(IntakeScreen::new()),
            },
            open_store,
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::StoreOpened(Ok(store)) => {
                log::info!("Patient store ready at {}", store.path().display());
                self.state.store = Some(store);
                Task::none()
            }
            Message::StoreOpened(Err(err)) => {
                self.state
                    .report_error(format!("Failed to open the patient store: {}", err));
                Task::none()
            }
            Message::DismissNotice => {
                self.state.notice = None;
                Task::none()
            }
            message => self
                .screen
                .update(message, &mut self.state)
                .map(|msg| match msg {
                    ScreenMessage::ScreenMessage(msg) => msg,
                    ScreenMessage::ParentMessage(never) => match never {},
                }),
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let screen = self.screen.view().map(|msg| match msg {
            ScreenMessage::ScreenMessage(msg) => msg,
            ScreenMessage::ParentMessage(never) => match never {},
        });
        match &self.state.notice {
            Some(text) => stack![screen, notice(text, Message::DismissNotice)].into(),
            None => screen,
        }
    }

    /// Frame ticks run only while the screening screen has a live source.
    pub fn subscription(&self) -> Subscription<Message> {
        if self.screen.is_analyzing() && self.state.session.has_source() {
            iced::time::every(self.state.config.tick_interval).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }
}

/// Hands the one loaded model to whichever session the application boots.
#[derive(Clone)]
struct SharedDetector {
    inner: Rc<RefCell<Box<dyn CariesDetector>>>,
    class_names: Vec<String>,
}

impl SharedDetector {
    fn new(detector: Box<dyn CariesDetector>) -> Self {
        Self {
            class_names: detector.class_names().to_vec(),
            inner: Rc::new(RefCell::new(detector)),
        }
    }
}

impl CariesDetector for SharedDetector {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn detect(&mut self, frame: &::image::RgbImage) -> anyhow::Result<FrameResult> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| anyhow::anyhow!("Detector is already running"))?
            .detect(frame)
    }
}

/// Open the main window and block until it is closed.
pub fn run(config: AppConfig, detector: Box<dyn CariesDetector>) -> anyhow::Result<()> {
    let detector = SharedDetector::new(detector);
    let boot = move || CariesApp::new(config.clone(), Box::new(detector.clone()));

    iced::application(boot, CariesApp::update, CariesApp::view)
        .title("Caries Detector")
        .subscription(CariesApp::subscription)
        .run()
        .map_err(|e| anyhow::anyhow!("GUI error: {:?}", e))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct CountingDetector {
        class_names: Vec<String>,
        calls: Rc<Cell<usize>>,
    }

    impl CariesDetector for CountingDetector {
        fn class_names(&self) -> &[String] {
            &self.class_names
        }

        fn detect(&mut self, frame: &::image::RgbImage) -> anyhow::Result<FrameResult> {
            self.calls.set(self.calls.get() + 1);
            Ok(FrameResult {
                detections: Vec::new(),
                annotated: frame.clone(),
            })
        }
    }

    #[test]
    fn test_shared_detector_handles_use_one_model() {
        let calls = Rc::new(Cell::new(0));
        let shared = SharedDetector::new(Box::new(CountingDetector {
            class_names: vec!["Healthy".to_string()],
            calls: Rc::clone(&calls),
        }));
        let mut first = shared.clone();
        let mut second = shared.clone();
        let frame = ::image::RgbImage::new(4, 4);

        first.detect(&frame).unwrap();
        second.detect(&frame).unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(second.class_names(), ["Healthy".to_string()]);
    }
}
