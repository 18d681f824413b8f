//! # Main Display Module
//!
//! Layout of the trainer window: the practice panel on the left and the
//! settings sidebar on the right.

use iced::widget::{Space, button, checkbox, column, container, pick_list, row, text, text_input};
use iced::{Alignment, Color, Element, Length};
use trainer_core::fretboard::STANDARD_TUNING;
use trainer_core::{PitchClass, PracticeConfig, ScaleType};

use super::{cent_meter, chord_diagram};
use crate::{AppDisplayData, Message};

const CORRECT_COLOR: Color = Color::from_rgb(0.2, 0.86, 0.6);
const ERROR_COLOR: Color = Color::from_rgb(1.0, 0.4, 0.4);
const MUTED_COLOR: Color = Color::from_rgb(0.6, 0.6, 0.6);

pub fn create_main_view<'a>(
    data: &'a AppDisplayData,
    config: &'a PracticeConfig,
    listening: bool,
) -> Element<'a, Message> {
    let title = text("Fretboard Trainer").size(28);

    let main_content = row![
        column![title, Space::with_height(20), create_practice_panel(data, listening)]
            .width(Length::Fill)
            .spacing(10),
        Space::with_width(10),
        create_sidebar(data, config),
    ]
    .align_y(Alignment::Start)
    .padding(20);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn create_practice_panel(data: &AppDisplayData, listening: bool) -> Element<'_, Message> {
    let prompt = text(data.prompt.as_deref().unwrap_or("Press \"New note\" to start")).size(30);

    let chord_label = text(data.chord_label.clone().unwrap_or_default()).size(20);

    let status_color = if data.status_is_error {
        ERROR_COLOR
    } else if data.correct {
        CORRECT_COLOR
    } else {
        Color::WHITE
    };
    let status = text(data.status.clone().unwrap_or_default()).size(20).color(status_color);

    let listening_label = text(if listening { "Listening..." } else { "" }).size(14).color(MUTED_COLOR);

    let mut panel = column![
        chord_label,
        prompt,
        listening_label,
        Space::with_height(10),
        status,
        cent_meter::CentMeter::new(data.last_cents, data.correct).view(),
    ]
    .spacing(8);

    if let Some(voicing) = data.diagram {
        panel = panel.push(Space::with_height(10));
        panel = panel.push(chord_diagram::ChordDiagram::new(voicing).view());
    }

    if let Some(notice) = &data.notice {
        panel = panel.push(Space::with_height(10));
        panel = panel.push(text(notice.as_str()).size(14).color(MUTED_COLOR));
    }

    container(panel.padding(15)).width(Length::Fill).into()
}

fn create_sidebar<'a>(data: &'a AppDisplayData, config: &'a PracticeConfig) -> Element<'a, Message> {
    let scale_picker = pick_list(ScaleType::ALL, Some(config.scale_type), Message::ScaleTypeSelected);

    // The root means nothing for the chromatic scale, so the control is shown disabled.
    let root_picker: Element<'_, Message> = if config.scale_type == ScaleType::Chromatic {
        button(text(config.scale_root.name()).size(14)).padding([6, 10]).into()
    } else {
        pick_list(PitchClass::ALL, Some(config.scale_root), Message::ScaleRootSelected).into()
    };

    let strings = STANDARD_TUNING.iter().enumerate().rev().fold(
        column![].spacing(4),
        |col, (string_index, string)| {
            col.push(
                checkbox(
                    format!("{} ({})", string.label, string.open_note().name()),
                    config.active_strings.contains(string_index),
                )
                .on_toggle(move |enabled| Message::StringToggled(string_index, enabled)),
            )
        },
    );

    let settings = column![
        section_title("Practice"),
        row![text("Scale").size(14).width(Length::Fixed(60.0)), scale_picker].align_y(Alignment::Center),
        row![text("Root").size(14).width(Length::Fixed(60.0)), root_picker].align_y(Alignment::Center),
        checkbox("Chord mode", config.chord_mode).on_toggle(Message::ChordModeToggled),
        section_title("Strings"),
        strings,
        section_title("Timing (seconds)"),
        text("Next note delay").size(14),
        text_input("2", &data.practice_delay_text).on_input(Message::PracticeDelayChanged),
        text("Diagram hold").size(14),
        text_input("5", &data.diagram_hold_text).on_input(Message::DiagramHoldChanged),
        section_title("Program"),
        sidebar_button("New note", Message::NewTask),
        sidebar_button("Stop", Message::Stop),
        sidebar_button("Save Settings", Message::SaveSettings),
        sidebar_button("Load Settings", Message::LoadSettings),
        sidebar_button("Exit", Message::Exit),
    ]
    .spacing(8);

    container(settings.padding(15))
        .width(Length::Fixed(250.0))
        .height(Length::Fill)
        .into()
}

fn section_title(title: &str) -> Element<'_, Message> {
    column![Space::with_height(6), text(title).size(18)].into()
}

fn sidebar_button(label: &str, message: Message) -> Element<'_, Message> {
    button(text(label).size(14).width(Length::Fill))
        .padding([6, 10])
        .on_press(message)
        .into()
}
