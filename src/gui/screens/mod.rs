pub mod analyzing;
pub mod intake;
pub mod results;

use iced::{Element, Task};

use crate::gui::{AppState, Message};

#[derive(Debug, Clone)]
pub enum ScreenMessage<S: Screen> {
    ScreenMessage(S::Message),
    ParentMessage(S::ParentMessage),
}

pub trait Screen: Sized {
    type Message: std::fmt::Debug + Clone;
    type ParentMessage: std::fmt::Debug + Clone;
    fn view(&self) -> Element<'_, ScreenMessage<Self>>;
    fn update(&mut self, message: Self::Message, state: &mut AppState)
    -> Task<ScreenMessage<Self>>;
}

#[derive(Debug, Clone)]
pub enum ScreenData {
    Intake(intake::IntakeScreen),
    Analyzing(analyzing::AnalyzingScreen),
    Results(results::ResultsScreen),
}

impl ScreenData {
    pub fn is_analyzing(&self) -> bool {
        matches!(self, ScreenData::Analyzing(_))
    }
}

fn change_screen(screen: ScreenData) -> Task<ScreenMessage<ScreenData>> {
    Task::done(ScreenMessage::ScreenMessage(Message::ChangeScreen(screen)))
}

impl Screen for ScreenData {
    type Message = Message;
    type ParentMessage = std::convert::Infallible;
    fn view(&self) -> Element<'_, ScreenMessage<Self>> {
        match self {
            ScreenData::Intake(screen) => screen.view().map(Message::Intake),
            ScreenData::Analyzing(screen) => screen.view().map(Message::Analyzing),
            ScreenData::Results(screen) => screen.view().map(Message::Results),
        }
        .map(ScreenMessage::ScreenMessage)
    }

    fn update(
        &mut self,
        message: Self::Message,
        state: &mut AppState,
    ) -> Task<ScreenMessage<Self>> {
        match (self, message) {
            (x, Message::ChangeScreen(screen)) => {
                *x = screen;
                Task::none()
            }
            (ScreenData::Intake(page), Message::Intake(msg)) => match msg {
                ScreenMessage::ScreenMessage(msg) => page
                    .update(msg, state)
                    .map(Message::Intake)
                    .map(ScreenMessage::ScreenMessage),
                ScreenMessage::ParentMessage(intake::ParentMessage::Submitted(record)) => {
                    state.notify("Patient data saved! Proceeding to Screening.");
                    state.patient = Some(record);
                    change_screen(ScreenData::Analyzing(analyzing::AnalyzingScreen::new(
                        &state.session,
                    )))
                }
            },
            (ScreenData::Analyzing(page), Message::Tick) => page
                .update(analyzing::AnalyzingMessage::Tick, state)
                .map(Message::Analyzing)
                .map(ScreenMessage::ScreenMessage),
            (ScreenData::Analyzing(page), Message::Analyzing(msg)) => match msg {
                ScreenMessage::ScreenMessage(msg) => page
                    .update(msg, state)
                    .map(Message::Analyzing)
                    .map(ScreenMessage::ScreenMessage),
                ScreenMessage::ParentMessage(parent_msg) => match parent_msg {
                    analyzing::ParentMessage::Back => {
                        state.session.clear();
                        change_screen(ScreenData::Intake(intake::IntakeScreen::new()))
                    }
                    analyzing::ParentMessage::Analyzed(summary) => {
                        let Some(patient) = state.patient.clone() else {
                            state.report_error("No patient is selected.");
                            return Task::none();
                        };
                        change_screen(ScreenData::Results(results::ResultsScreen::new(
                            summary, patient,
                        )))
                    }
                },
            },
            (ScreenData::Results(page), Message::Results(msg)) => match msg {
                ScreenMessage::ScreenMessage(msg) => page
                    .update(msg, state)
                    .map(Message::Results)
                    .map(ScreenMessage::ScreenMessage),
                ScreenMessage::ParentMessage(results::ParentMessage::Back) => change_screen(
                    ScreenData::Analyzing(analyzing::AnalyzingScreen::new(&state.session)),
                ),
            },
            _ => Task::none(),
        }
    }
}
