use crate::{
    config::AppConfig, core::db::PatientDb, models::PatientRecord, session::CaptureSession,
};

/// State shared by every screen.
#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    /// `None` until the store has been opened at startup.
    pub store: Option<PatientDb>,
    /// The patient the current screening belongs to.
    pub patient: Option<PatientRecord>,
    pub session: CaptureSession,
    /// Message shown over the current screen until dismissed.
    pub notice: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig, session: CaptureSession) -> Self {
        Self {
            config,
            store: None,
            patient: None,
            session,
            notice: None,
        }
    }

    pub fn notify(&mut self, notice: impl Into<String>) {
        let notice = notice.into();
        log::info!("{}", notice);
        self.notice = Some(notice);
    }

    /// Surface an error to the operator and the log.
    pub fn report_error(&mut self, err: impl std::fmt::Display) {
        let notice = err.to_string();
        log::warn!("{}", notice);
        self.notice = Some(notice);
    }
}
