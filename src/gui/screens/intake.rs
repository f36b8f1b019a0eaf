use iced::{
    Alignment::Center,
    Element, Length, Task,
    widget::{button, column, container, pick_list, row, slider, text, text_input},
};

use crate::{
    gui::{
        AppState,
        screens::{Screen, ScreenMessage},
        widgets::{field, heading},
    },
    intake::{IntakeForm, MAX_AGE},
    models::{
        BrushingHabit, Choice, Gender, LastDentalVisit, PatientRecord, SENTINEL_LABEL,
        SmokingStatus,
    },
};

#[derive(Debug, Clone)]
pub struct IntakeScreen {
    form: IntakeForm,
    submitting: bool,
}

#[derive(Debug, Clone)]
pub enum IntakeMessage {
    Name(String),
    Gender(Gender),
    Age(u8),
    BrushingHabit(BrushingHabit),
    SmokingStatus(SmokingStatus),
    LastDentalVisit(LastDentalVisit),
    Notes(String),
    Submit,
    SubmitFailed(String),
}

#[derive(Debug, Clone)]
pub enum ParentMessage {
    Submitted(PatientRecord),
}

fn msg(message: IntakeMessage) -> ScreenMessage<IntakeScreen> {
    ScreenMessage::ScreenMessage(message)
}

impl IntakeScreen {
    pub fn new() -> Self {
        Self {
            form: IntakeForm::new(),
            submitting: false,
        }
    }
}

impl Screen for IntakeScreen {
    type Message = IntakeMessage;
    type ParentMessage = ParentMessage;

    fn view(&self) -> Element<'_, ScreenMessage<Self>> {
        let form = &self.form;

        let submit = button("Submit").padding([8, 24]);
        let submit = if self.submitting {
            submit
        } else {
            submit.on_press(msg(IntakeMessage::Submit))
        };

        let content = column![
            heading("Patient Intake"),
            text(format!("Date: {}", form.date)),
            field(
                "Patient Name",
                text_input("Patient Name", &form.name)
                    .on_input(|name| msg(IntakeMessage::Name(name)))
            ),
            field(
                "Gender",
                pick_list(Gender::ALL, form.gender, |g| msg(IntakeMessage::Gender(g)))
                    .placeholder(SENTINEL_LABEL)
            ),
            field(
                "Age",
                row![
                    slider(0..=MAX_AGE, form.age, |age| msg(IntakeMessage::Age(age))),
                    text(form.age.to_string()).width(40),
                ]
                .spacing(10)
                .align_y(Center)
            ),
            field(
                "Brushing Habit",
                pick_list(BrushingHabit::ALL, form.brushing_habit, |b| {
                    msg(IntakeMessage::BrushingHabit(b))
                })
                .placeholder(SENTINEL_LABEL)
            ),
            field(
                "Smoking Status",
                pick_list(SmokingStatus::ALL, form.smoking_status, |s| {
                    msg(IntakeMessage::SmokingStatus(s))
                })
                .placeholder(SENTINEL_LABEL)
            ),
            field(
                "Last Dental Appointment",
                pick_list(LastDentalVisit::ALL, form.last_dental_visit, |v| {
                    msg(IntakeMessage::LastDentalVisit(v))
                })
                .placeholder(SENTINEL_LABEL)
            ),
            field(
                "Notes",
                text_input("Notes", &form.notes).on_input(|notes| msg(IntakeMessage::Notes(notes)))
            ),
            submit,
        ]
        .spacing(16)
        .padding(20)
        .max_width(520)
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
        match message {
            IntakeMessage::Name(name) => self.form.name = name,
            IntakeMessage::Gender(gender) => self.form.gender = Some(gender),
            IntakeMessage::Age(age) => self.form.set_age(age),
            IntakeMessage::BrushingHabit(habit) => self.form.brushing_habit = Some(habit),
            IntakeMessage::SmokingStatus(status) => self.form.smoking_status = Some(status),
            IntakeMessage::LastDentalVisit(visit) => self.form.last_dental_visit = Some(visit),
            IntakeMessage::Notes(notes) => self.form.notes = notes,
            IntakeMessage::Submit => {
                if let Err(err) = self.form.validate() {
                    state.report_error(err);
                    return Task::none();
                }
                let Some(store) = state.store.clone() else {
                    state.report_error("The patient store is not open yet.");
                    return Task::none();
                };
                self.submitting = true;
                let form = self.form.clone();
                return Task::perform(
                    async move { form.submit(&store).await.map_err(|e| format!("{:#}", e)) },
                    |result| match result {
                        Ok(record) => ScreenMessage::ParentMessage(ParentMessage::Submitted(record)),
                        Err(err) => ScreenMessage::ScreenMessage(IntakeMessage::SubmitFailed(err)),
                    },
                );
            }
            IntakeMessage::SubmitFailed(err) => {
                self.submitting = false;
                state.report_error(err);
            }
        }
        Task::none()
    }
}
