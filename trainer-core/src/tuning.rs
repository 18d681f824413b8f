//! # Musical Tuning Module
//!
//! This module provides the note table and the note-matching rules used by the
//! practice loop. It handles pitch classes, equal temperament frequency
//! calculations, nearest-note lookup and cent deviation measurements.
//!
//! ## Features
//! - Guitar note range from E2 (low-E open string) to E6
//! - Equal temperament frequencies from A4 = 440 Hz
//! - Nearest-note lookup for detected frequencies
//! - Cent deviation calculations
//! - Pitch-class plus tolerance match policy

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest MIDI pitch in the table (E2, the open low-E string).
pub const LOWEST_PITCH: u8 = 40;
/// Highest MIDI pitch in the table (E6).
pub const HIGHEST_PITCH: u8 = 88;

/// Reference pitch A4.
const REFERENCE_PITCH: u8 = 69;
const REFERENCE_FREQUENCY: f32 = 440.0;

/// Largest deviation, in cents, still accepted as a correct note.
pub const CENT_TOLERANCE: f32 = 20.0;

/// One of the twelve note names, independent of octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    /// All pitch classes in ascending order starting from C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Pitch class for an index, wrapping modulo 12.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Pitch class of a MIDI pitch number.
    pub fn of_pitch(pitch_number: u8) -> Self {
        Self::from_index(pitch_number as usize)
    }

    /// Semitones above C.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The pitch class `semitones` above this one.
    pub fn transpose(self, semitones: u8) -> Self {
        Self::from_index(self.index() + semitones as usize)
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|pc| pc.name() == s.trim())
            .ok_or_else(|| format!("unknown pitch class `{s}`"))
    }
}

/// Represents a single musical note in the playable range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// MIDI pitch number
    pub pitch_number: u8,
    pub pitch_class: PitchClass,
    /// Scientific pitch octave (C4 is middle C)
    pub octave: i8,
    /// Frequency in Hz
    pub frequency: f32,
}

impl Note {
    /// Builds the equal temperament note for a MIDI pitch number.
    pub fn from_pitch(pitch_number: u8) -> Self {
        Self {
            pitch_number,
            pitch_class: PitchClass::of_pitch(pitch_number),
            octave: (pitch_number / 12) as i8 - 1,
            frequency: frequency_of(pitch_number),
        }
    }

    /// Note name with octave (e.g., "E2", "C#4").
    pub fn name(&self) -> String {
        format!("{}{}", self.pitch_class, self.octave)
    }
}

/// Equal temperament frequency of a MIDI pitch number.
///
/// The formula is f = 440 * 2^((n - 69) / 12), with A4 (MIDI 69) as the
/// reference pitch.
pub fn frequency_of(pitch_number: u8) -> f32 {
    let semitones = pitch_number as f32 - REFERENCE_PITCH as f32;
    REFERENCE_FREQUENCY * 2.0_f32.powf(semitones / 12.0)
}

/// Statically computed notes from E2 to E6, ascending.
///
/// The table is computed once on first use and never mutated.
pub static NOTES: Lazy<Vec<Note>> = Lazy::new(|| {
    (LOWEST_PITCH..=HIGHEST_PITCH).map(Note::from_pitch).collect()
});

/// Looks up a note by its MIDI pitch number.
///
/// # Returns
/// * `Some(note)` - The table entry
/// * `None` - The pitch lies outside E2..=E6
pub fn note_by_pitch(pitch_number: u8) -> Option<&'static Note> {
    pitch_number
        .checked_sub(LOWEST_PITCH)
        .and_then(|offset| NOTES.get(offset as usize))
}

/// Finds the closest musical note to a given frequency.
///
/// This performs a linear scan of the note table and returns the entry with
/// the smallest absolute difference in Hz. Ties go to the lower note because
/// the table is ascending and only a strictly smaller difference replaces the
/// current best.
///
/// # Arguments
/// * `freq` - Input frequency in Hz
pub fn find_nearest_note(freq: f32) -> &'static Note {
    let mut best = &NOTES[0];
    let mut best_diff = (freq - best.frequency).abs();
    for note in NOTES.iter().skip(1) {
        let diff = (freq - note.frequency).abs();
        if diff < best_diff {
            best = note;
            best_diff = diff;
        }
    }
    best
}

/// Calculates the deviation from a target frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
///
/// # Arguments
/// * `freq` - Measured frequency in Hz
/// * `target_freq` - Target frequency in Hz
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// Outcome of comparing a detected frequency with a target pitch class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchMatch {
    /// Nearest table note to the detected frequency.
    pub note: &'static Note,
    /// Deviation from `note` in cents, signed.
    pub cents: f32,
    pub is_match: bool,
}

/// Judges a detected frequency against a target pitch class.
///
/// The cents value is measured against the nearest note, not the target, so
/// the pitch-class check is what rules out a nearby but wrong note.
pub fn match_pitch(freq: f32, target: PitchClass, tolerance_cents: f32) -> PitchMatch {
    let note = find_nearest_note(freq);
    let cents = calculate_cents_deviation(freq, note.frequency);
    PitchMatch {
        note,
        cents,
        is_match: note.pitch_class == target && cents.abs() <= tolerance_cents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_spans_guitar_range() {
        assert_eq!(NOTES.len(), 49);
        assert_eq!(NOTES[0].name(), "E2");
        assert_eq!(NOTES.last().map(Note::name).as_deref(), Some("E6"));
        assert!(NOTES.windows(2).all(|w| w[0].frequency < w[1].frequency));
    }

    #[test]
    fn a4_is_reference() {
        let a4 = note_by_pitch(69).unwrap();
        assert_eq!(a4.name(), "A4");
        assert_eq!(a4.pitch_class, PitchClass::A);
        assert!((a4.frequency - 440.0).abs() < 1e-3);
    }

    #[test]
    fn midpoint_between_neighbours_resolves_low() {
        // The f32 midpoint can land a rounding step either side of the true
        // one; wherever the lower note is not farther away, it must win.
        let mut ties = 0;
        for pair in NOTES.windows(2) {
            let (low, high) = (&pair[0], &pair[1]);
            let midpoint = (low.frequency + high.frequency) / 2.0;
            let (to_low, to_high) = (midpoint - low.frequency, high.frequency - midpoint);
            if to_low == to_high {
                ties += 1;
            }
            let expected = if to_low <= to_high { low } else { high };
            assert_eq!(find_nearest_note(midpoint).pitch_number, expected.pitch_number);
        }
        assert!(ties > 0, "no exact ties in the table");

        let a3_bb3 = (frequency_of(57) + frequency_of(58)) / 2.0;
        let nearest = find_nearest_note(a3_bb3).pitch_number;
        assert!(nearest == 57 || a3_bb3 - frequency_of(57) > frequency_of(58) - a3_bb3);
    }

    #[test]
    fn pitch_lookup_outside_range() {
        assert!(note_by_pitch(39).is_none());
        assert!(note_by_pitch(89).is_none());
        assert!(note_by_pitch(0).is_none());
    }

    #[test]
    fn nearest_note_round_trip_for_every_pitch() {
        for note in NOTES.iter() {
            let nearest = find_nearest_note(frequency_of(note.pitch_number));
            assert_eq!(nearest.pitch_number, note.pitch_number);
            assert_eq!(calculate_cents_deviation(note.frequency, nearest.frequency), 0.0);
        }
    }

    #[test]
    fn nearest_note_clamps_to_table_edges() {
        assert_eq!(find_nearest_note(20.0).name(), "E2");
        assert_eq!(find_nearest_note(5000.0).name(), "E6");
    }

    #[test]
    fn cents_is_zero_at_equality_and_increasing() {
        assert_eq!(calculate_cents_deviation(220.0, 220.0), 0.0);
        let mut last = f32::NEG_INFINITY;
        for i in 0..200 {
            let cents = calculate_cents_deviation(200.0 + i as f32 * 0.25, 220.0);
            assert!(cents > last);
            last = cents;
        }
        assert!((calculate_cents_deviation(440.0, 220.0) - 1200.0).abs() < 1e-3);
    }

    #[test]
    fn match_requires_pitch_class_and_tolerance() {
        let exact = match_pitch(220.0, PitchClass::A, CENT_TOLERANCE);
        assert!(exact.is_match);
        assert_eq!(exact.note.name(), "A3");
        assert!(exact.cents.abs() < 1e-3);

        let sharp = match_pitch(225.0, PitchClass::A, CENT_TOLERANCE);
        assert!(!sharp.is_match);
        assert!((sharp.cents - 38.9).abs() < 0.1);

        let wrong_class = match_pitch(246.94, PitchClass::A, CENT_TOLERANCE);
        assert!(!wrong_class.is_match);
        assert_eq!(wrong_class.note.pitch_class, PitchClass::B);
    }

    #[test]
    fn pitch_class_parses_display_names() {
        for pc in PitchClass::ALL {
            assert_eq!(pc.name().parse::<PitchClass>(), Ok(pc));
        }
        assert!("H".parse::<PitchClass>().is_err());
        assert_eq!(PitchClass::A.transpose(3), PitchClass::C);
    }
}
