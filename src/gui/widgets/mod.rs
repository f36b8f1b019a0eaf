use iced::{
    Color, Element, Length, Radians, Rectangle, Renderer, Theme, border, mouse,
    widget::{
        button, canvas, column, container,
        container::{Style, bordered_box},
        image, row, text,
    },
};

use crate::{
    detection::annotate::class_color,
    models::{CariesClass, Choice},
    report::Summary,
};

pub fn heading<'a, Message: 'a>(title: &'a str) -> Element<'a, Message> {
    text(title).size(28).into()
}

/// A labelled form row.
pub fn field<'a, Message: 'a>(
    label: &'a str,
    input: impl Into<Element<'a, Message>>,
) -> Element<'a, Message> {
    column![text(label).size(14), input.into()]
        .spacing(4)
        .width(Length::Fill)
        .into()
}

fn notice_style(theme: &Theme) -> Style {
    bordered_box(theme)
        .border(border::width(2).rounded(6))
        .background(theme.palette().background)
}

/// Dismissable message box shown over the current screen.
pub fn notice<'a, Message: Clone + 'a>(message: &'a str, dismiss: Message) -> Element<'a, Message> {
    let card = container(
        column![
            text(message),
            button("OK").on_press(dismiss).padding([4, 20]),
        ]
        .spacing(12)
        .align_x(iced::Alignment::Center),
    )
    .padding(20)
    .max_width(480)
    .style(notice_style);

    container(card)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

/// Convert an annotated frame for the `image` widget.
pub fn rgb_handle(frame: &::image::RgbImage) -> image::Handle {
    let rgba = ::image::DynamicImage::ImageRgb8(frame.clone()).to_rgba8();
    image::Handle::from_rgba(rgba.width(), rgba.height(), rgba.into_raw())
}

/// Class distribution drawn as a pie.
#[derive(Debug, Clone)]
pub struct PieChart {
    /// Percentages in `CariesClass::ALL` order.
    shares: [f32; 4],
}

impl PieChart {
    pub fn from_summary(summary: &Summary) -> Self {
        let mut shares = [0.0; 4];
        for class in CariesClass::ALL {
            shares[class.index()] = summary.tally.percentage(*class) as f32;
        }
        Self { shares }
    }

    /// Slice color for a class index, matching the box colors on the frames.
    pub fn color(index: usize) -> Color {
        let label = CariesClass::ALL.get(index).map(|class| class.label());
        let [r, g, b] = class_color(label).0;
        Color::from_rgb8(r, g, b)
    }
}

impl<Message> canvas::Program<Message> for PieChart {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let center = frame.center();
        let radius = frame.width().min(frame.height()) / 2.0 - 4.0;

        let total: f32 = self.shares.iter().sum();
        if total <= 0.0 {
            // Nothing detected: an empty outline.
            let outline = canvas::Path::circle(center, radius);
            frame.stroke(
                &outline,
                canvas::Stroke::default()
                    .with_width(2.0)
                    .with_color(theme.palette().text),
            );
            return vec![frame.into_geometry()];
        }

        let mut start = -std::f32::consts::FRAC_PI_2;
        for (index, share) in self.shares.iter().enumerate() {
            if *share <= 0.0 {
                continue;
            }
            let sweep = share / total * std::f32::consts::TAU;
            let slice = canvas::Path::new(|b| {
                b.move_to(center);
                b.arc(canvas::path::Arc {
                    center,
                    radius,
                    start_angle: Radians(start),
                    end_angle: Radians(start + sweep),
                });
                b.line_to(center);
                b.close();
            });
            frame.fill(&slice, Self::color(index));
            start += sweep;
        }

        vec![frame.into_geometry()]
    }
}

/// One row of the results table.
pub fn table_row<'a, Message: 'a>(cells: Vec<String>) -> Element<'a, Message> {
    cells
        .into_iter()
        .fold(row![].spacing(20), |r, cell| r.push(text(cell).width(140)))
        .into()
}
