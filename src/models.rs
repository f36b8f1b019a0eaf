use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;

/// Placeholder shown in every dropdown before the operator picks a value.
pub const SENTINEL_LABEL: &str = "Select";

/// A fixed set of dropdown values with their on-screen labels.
pub trait Choice: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|choice| choice.label() == label)
    }
}

macro_rules! display_via_label {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }
        )*
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Choice for Gender {
    const ALL: &'static [Self] = &[Gender::Male, Gender::Female];

    fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrushingHabit {
    OnceADay,
    TwiceADay,
    Occasionally,
}

impl Choice for BrushingHabit {
    const ALL: &'static [Self] = &[
        BrushingHabit::OnceADay,
        BrushingHabit::TwiceADay,
        BrushingHabit::Occasionally,
    ];

    fn label(self) -> &'static str {
        match self {
            BrushingHabit::OnceADay => "Once a day",
            BrushingHabit::TwiceADay => "Twice a day",
            BrushingHabit::Occasionally => "Occasionally",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmokingStatus {
    Smoker,
    NonSmoker,
}

impl Choice for SmokingStatus {
    const ALL: &'static [Self] = &[SmokingStatus::Smoker, SmokingStatus::NonSmoker];

    fn label(self) -> &'static str {
        match self {
            SmokingStatus::Smoker => "Smoker",
            SmokingStatus::NonSmoker => "Non-Smoker",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LastDentalVisit {
    Never,
    LessThanAYear,
    MoreThanAYear,
}

impl Choice for LastDentalVisit {
    const ALL: &'static [Self] = &[
        LastDentalVisit::Never,
        LastDentalVisit::LessThanAYear,
        LastDentalVisit::MoreThanAYear,
    ];

    fn label(self) -> &'static str {
        match self {
            LastDentalVisit::Never => "Never",
            LastDentalVisit::LessThanAYear => "Less than a year",
            LastDentalVisit::MoreThanAYear => "More than a year",
        }
    }
}

/// Severity classes the detector is trained on, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CariesClass {
    Healthy,
    Initial,
    Moderate,
    Extensive,
}

impl Choice for CariesClass {
    const ALL: &'static [Self] = &[
        CariesClass::Healthy,
        CariesClass::Initial,
        CariesClass::Moderate,
        CariesClass::Extensive,
    ];

    fn label(self) -> &'static str {
        match self {
            CariesClass::Healthy => "Healthy",
            CariesClass::Initial => "Initial",
            CariesClass::Moderate => "Moderate",
            CariesClass::Extensive => "Extensive",
        }
    }
}

impl CariesClass {
    pub fn index(self) -> usize {
        match self {
            CariesClass::Healthy => 0,
            CariesClass::Initial => 1,
            CariesClass::Moderate => 2,
            CariesClass::Extensive => 3,
        }
    }
}

display_via_label!(Gender, BrushingHabit, SmokingStatus, LastDentalVisit, CariesClass);

/// Column headers of the patient store, in order.
pub const PATIENT_COLUMNS: [&str; 8] = [
    "Date",
    "Name",
    "Gender",
    "Age",
    "Brushing Habit",
    "Smoking Status",
    "Last Dental Appointment",
    "Notes",
];

/// One completed intake form. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    pub date: String,
    pub name: String,
    pub gender: Gender,
    pub age: u8,
    pub brushing_habit: BrushingHabit,
    pub smoking_status: SmokingStatus,
    pub last_dental_visit: LastDentalVisit,
    pub notes: String,
}

impl PatientRecord {
    /// The record as `(column, value)` pairs in store column order.
    pub fn fields(&self) -> [(&'static str, String); 8] {
        [
            (PATIENT_COLUMNS[0], self.date.clone()),
            (PATIENT_COLUMNS[1], self.name.clone()),
            (PATIENT_COLUMNS[2], self.gender.to_string()),
            (PATIENT_COLUMNS[3], self.age.to_string()),
            (PATIENT_COLUMNS[4], self.brushing_habit.to_string()),
            (PATIENT_COLUMNS[5], self.smoking_status.to_string()),
            (PATIENT_COLUMNS[6], self.last_dental_visit.to_string()),
            (PATIENT_COLUMNS[7], self.notes.clone()),
        ]
    }

    /// Per-patient output folder. Patients sharing a name share the folder.
    pub fn result_dir(&self, output_root: &Path) -> PathBuf {
        result_dir(output_root, &self.name)
    }
}

pub fn result_dir(output_root: &Path, patient_name: &str) -> PathBuf {
    output_root.join(format!("{}_result", patient_name))
}

/// Which frame source the capture session is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    Idle,
    Image,
    Video,
    Camera,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceMode::Idle => "none",
            SourceMode::Image => "image",
            SourceMode::Video => "video",
            SourceMode::Camera => "camera",
        };
        f.write_str(name)
    }
}

/// Box corners in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }
}

/// One predicted decay region.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Index into the detector's class-name table.
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Everything the detector produced for a single frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub detections: Vec<Detection>,
    /// The input frame with the detections drawn on it.
    pub annotated: RgbImage,
}

impl FrameResult {
    pub fn class_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.detections.iter().map(|d| d.class_id)
    }
}
