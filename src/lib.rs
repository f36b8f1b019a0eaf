pub mod capture;
pub mod config;
pub mod core;
pub mod detection;
pub mod intake;
pub mod models;
pub mod report;
pub mod session;
pub mod training;

pub use config::AppConfig;
pub use detection::{CariesDetector, RtenYoloDetector};
pub use intake::{IntakeError, IntakeForm};
pub use models::{FrameResult, PatientRecord, SourceMode};
pub use report::Summary;
pub use session::{CaptureSession, SessionError, TickOutcome};

#[cfg(feature = "gui")]
pub mod gui;
