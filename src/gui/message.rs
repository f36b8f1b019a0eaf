use crate::{
    core::db::PatientDb,
    gui::screens::{
        ScreenData, ScreenMessage, analyzing::AnalyzingScreen, intake::IntakeScreen,
        results::ResultsScreen,
    },
};

#[derive(Debug, Clone)]
pub enum Message {
    Intake(ScreenMessage<IntakeScreen>),
    Analyzing(ScreenMessage<AnalyzingScreen>),
    Results(ScreenMessage<ResultsScreen>),
    ChangeScreen(ScreenData),
    StoreOpened(Result<PatientDb, String>),
    /// Timer step while a video or camera is running.
    Tick,
    DismissNotice,
}
