use iced::{
    Alignment::Center,
    Element, Length, Task,
    widget::{button, canvas, column, container, row, text},
    window,
};

use crate::{
    gui::{
        AppState,
        screens::{Screen, ScreenMessage},
        widgets::{PieChart, heading, table_row},
    },
    models::PatientRecord,
    report::{self, Summary},
};

#[derive(Debug, Clone)]
pub struct ResultsScreen {
    summary: Summary,
    patient: PatientRecord,
}

#[derive(Debug, Clone)]
pub enum ResultsMessage {
    Save,
    Captured(window::Screenshot),
    Back,
}

#[derive(Debug, Clone)]
pub enum ParentMessage {
    Back,
}

fn msg(message: ResultsMessage) -> ScreenMessage<ResultsScreen> {
    ScreenMessage::ScreenMessage(message)
}

impl ResultsScreen {
    pub fn new(summary: Summary, patient: PatientRecord) -> Self {
        Self { summary, patient }
    }

    fn table(&self) -> Element<'_, ScreenMessage<Self>> {
        let header = self
            .summary
            .table_headers()
            .into_iter()
            .fold(row![].spacing(20), |r, title| {
                r.push(text(title).width(140))
            });
        let rows = self.summary.table_rows().into_iter().map(table_row);
        column![header]
            .extend(rows)
            .spacing(8)
            .into()
    }
}

impl Screen for ResultsScreen {
    type Message = ResultsMessage;
    type ParentMessage = ParentMessage;

    fn view(&self) -> Element<'_, ScreenMessage<Self>> {
        let chart = canvas(PieChart::from_summary(&self.summary))
            .width(Length::Fixed(320.0))
            .height(Length::Fixed(320.0));

        let legend = self
            .summary
            .pie_labels()
            .into_iter()
            .enumerate()
            .fold(column![].spacing(6), |c, (i, label)| {
                c.push(text(label).color(PieChart::color(i)))
            });

        let details = report::patient_details(&self.patient)
            .into_iter()
            .fold(column![heading("Patient Details")].spacing(6), |c, line| {
                c.push(text(line))
            });

        let content = column![
            heading("Analysis Result"),
            row![
                column![text("Caries Class Distribution").size(18), chart]
                    .spacing(8)
                    .align_x(Center),
                legend
            ]
            .spacing(20)
            .align_y(Center),
            self.table(),
            details,
            row![
                button("Back").on_press(msg(ResultsMessage::Back)),
                button("Save").on_press(msg(ResultsMessage::Save)),
            ]
            .spacing(10),
        ]
        .spacing(20)
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
        match message {
            ResultsMessage::Save => window::latest()
                .and_then(window::screenshot)
                .map(|shot| msg(ResultsMessage::Captured(shot))),
            ResultsMessage::Captured(shot) => {
                let saved = report::save_snapshot(
                    &state.config.output_root,
                    &self.patient.name,
                    shot.size.width,
                    shot.size.height,
                    AsRef::<[u8]>::as_ref(&shot.rgba).to_vec(),
                );
                match saved {
                    Ok(path) => state.notify(format!("Result saved to {}", path.display())),
                    Err(err) => state.report_error(format!("{:#}", err)),
                }
                Task::none()
            }
            ResultsMessage::Back => Task::done(ScreenMessage::ParentMessage(ParentMessage::Back)),
        }
    }
}
