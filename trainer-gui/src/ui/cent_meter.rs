//! # Cent Meter Widget
//!
//! Needle meter for the last heard pitch. The shaded band in the middle is
//! the window within which a note counts as correct.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{Color, Element, Point, Rectangle, Renderer, Size, Theme, mouse};
use trainer_core::tuning::CENT_TOLERANCE;

/// The meter spans -50 to +50 cents.
const METER_RANGE: f32 = 50.0;

pub struct CentMeter {
    cents: Option<f32>,
    correct: bool,
}

impl CentMeter {
    pub fn new(cents: Option<f32>, correct: bool) -> Self {
        Self { cents, correct }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(60.0)),
        )
        .into()
    }
}

fn x_for(cents: f32, width: f32) -> f32 {
    (cents.clamp(-METER_RANGE, METER_RANGE) + METER_RANGE) / (2.0 * METER_RANGE) * width
}

impl<Message> canvas::Program<Message> for CentMeter {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let background = Path::rectangle(Point::ORIGIN, bounds.size());
        frame.fill(&background, Color::from_rgb8(0x40, 0x40, 0x40));

        // Acceptance band
        let band_left = x_for(-CENT_TOLERANCE, bounds.width);
        let band_right = x_for(CENT_TOLERANCE, bounds.width);
        let band = Path::rectangle(
            Point::new(band_left, 0.0),
            Size::new(band_right - band_left, bounds.height),
        );
        frame.fill(&band, Color::from_rgb8(0x2A, 0x4D, 0x3E));

        let center_x = bounds.width / 2.0;
        let center_line = Path::line(Point::new(center_x, 0.0), Point::new(center_x, bounds.height));
        frame.stroke(&center_line, Stroke::default().with_width(2.0).with_color(Color::WHITE));

        if let Some(c) = self.cents {
            let color = if self.correct {
                Color::from_rgb8(0x34, 0xDB, 0x98) // Green
            } else if c.abs() <= CENT_TOLERANCE {
                Color::from_rgb8(0xFF, 0xC3, 0x00) // Yellow: in tune but the wrong note
            } else {
                Color::from_rgb8(0xFF, 0x33, 0x33) // Red
            };

            let needle_pos = x_for(c, bounds.width);
            let needle = Path::rectangle(Point::new(needle_pos - 2.0, 0.0), Size::new(4.0, bounds.height));
            frame.fill(&needle, color);
        }

        vec![frame.into_geometry()]
    }
}
