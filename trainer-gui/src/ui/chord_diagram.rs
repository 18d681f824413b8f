//! # Chord Diagram Widget
//!
//! Draws a completed chord voicing as a fret diagram: strings run top to
//! bottom with the low E on the left, frets run left to right.

use iced::alignment;
use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{Color, Element, Pixels, Point, Rectangle, Renderer, Theme, mouse};
use trainer_core::ChordVoicing;
use trainer_core::fretboard::STRING_COUNT;

/// Frets shown in the diagram window.
const FRET_WINDOW: u8 = 5;

const MARGIN_X: f32 = 40.0;
const MARGIN_TOP: f32 = 30.0;
const MARGIN_BOTTOM: f32 = 16.0;

const DOT_COLOR: Color = Color::from_rgb(0.2, 0.86, 0.6);

#[derive(Debug, Clone)]
pub struct ChordDiagram {
    voicing: ChordVoicing,
}

impl ChordDiagram {
    pub fn new(voicing: ChordVoicing) -> Self {
        Self { voicing }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fixed(260.0))
                .height(iced::Length::Fixed(240.0)),
        )
        .into()
    }

    /// First fret of the window, and how many frets it covers.
    fn window(&self) -> (u8, u8) {
        let lowest = self.voicing.lowest_fret();
        let top = if lowest <= 1 { 1 } else { lowest };
        let highest = self.voicing.diagram_points().iter().map(|&(_, fret)| fret).max().unwrap_or(top);
        // Widen the window when a voicing spans more than five frets.
        let span = highest.saturating_sub(top) + 1;
        (top, span.max(FRET_WINDOW))
    }
}

impl<Message> canvas::Program<Message> for ChordDiagram {
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
        let (top_fret, fret_count) = self.window();

        let grid_width = bounds.width - 2.0 * MARGIN_X;
        let grid_height = bounds.height - MARGIN_TOP - MARGIN_BOTTOM;
        let string_spacing = grid_width / (STRING_COUNT - 1) as f32;
        let fret_spacing = grid_height / fret_count as f32;
        let line = Stroke::default().with_width(1.5).with_color(Color::WHITE);

        // Strings
        for string_index in 0..STRING_COUNT {
            let x = MARGIN_X + string_index as f32 * string_spacing;
            let path = Path::line(Point::new(x, MARGIN_TOP), Point::new(x, MARGIN_TOP + grid_height));
            frame.stroke(&path, line);
        }

        // Frets
        for fret in 0..=fret_count {
            let y = MARGIN_TOP + fret as f32 * fret_spacing;
            let path = Path::line(Point::new(MARGIN_X, y), Point::new(MARGIN_X + grid_width, y));
            frame.stroke(&path, line);
        }

        if top_fret == 1 {
            let nut = Path::line(Point::new(MARGIN_X, MARGIN_TOP), Point::new(MARGIN_X + grid_width, MARGIN_TOP));
            frame.stroke(&nut, Stroke::default().with_width(6.0).with_color(Color::WHITE));
        } else {
            frame.fill_text(canvas::Text {
                content: format!("{top_fret}fr"),
                position: Point::new(MARGIN_X - 8.0, MARGIN_TOP + fret_spacing / 2.0),
                color: Color::WHITE,
                size: Pixels(14.0),
                horizontal_alignment: alignment::Horizontal::Right,
                vertical_alignment: alignment::Vertical::Center,
                ..canvas::Text::default()
            });
        }

        let radius = (string_spacing.min(fret_spacing) * 0.3).max(4.0);
        for (string_index, fret) in self.voicing.diagram_points() {
            let x = MARGIN_X + string_index as f32 * string_spacing;
            if fret == 0 {
                // Open string, marked above the nut.
                let ring = Path::circle(Point::new(x, MARGIN_TOP - radius - 4.0), radius * 0.8);
                frame.stroke(&ring, Stroke::default().with_width(2.0).with_color(DOT_COLOR));
            } else {
                let row = (fret - top_fret) as f32 + 0.5;
                let dot = Path::circle(Point::new(x, MARGIN_TOP + row * fret_spacing), radius);
                frame.fill(&dot, DOT_COLOR);
            }
        }

        vec![frame.into_geometry()]
    }
}
