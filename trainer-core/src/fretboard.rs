//! # Fretboard Module
//!
//! Guitar strings in standard tuning, fret positions, and the set of strings
//! the performer has enabled for practice.

use serde::{Deserialize, Serialize};

use crate::tuning::{self, Note, PitchClass};

/// Highest fret used for prompts and voicings.
pub const MAX_FRET: u8 = 12;

/// One open string of the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringDef {
    pub label: &'static str,
    /// MIDI pitch of the open string
    pub open_pitch: u8,
}

impl StringDef {
    pub fn open_note(&self) -> &'static Note {
        tuning::note_by_pitch(self.open_pitch)
            .expect("open strings lie inside the note table")
    }
}

/// Standard tuning, lowest string first.
pub const STANDARD_TUNING: [StringDef; 6] = [
    StringDef { label: "low-E", open_pitch: 40 },
    StringDef { label: "A", open_pitch: 45 },
    StringDef { label: "D", open_pitch: 50 },
    StringDef { label: "G", open_pitch: 55 },
    StringDef { label: "B", open_pitch: 59 },
    StringDef { label: "high-E", open_pitch: 64 },
];

pub const STRING_COUNT: usize = STANDARD_TUNING.len();

/// A string and fret pair. The note is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FretPosition {
    /// Index into `STANDARD_TUNING`
    pub string_index: usize,
    pub fret: u8,
}

impl FretPosition {
    pub fn new(string_index: usize, fret: u8) -> Self {
        debug_assert!(string_index < STRING_COUNT && fret <= MAX_FRET);
        Self { string_index, fret }
    }

    pub fn string(&self) -> &'static StringDef {
        &STANDARD_TUNING[self.string_index]
    }

    pub fn pitch_number(&self) -> u8 {
        self.string().open_pitch + self.fret
    }

    pub fn note(&self) -> &'static Note {
        // Open pitch + 12 tops out at 76, well inside the table.
        tuning::note_by_pitch(self.pitch_number())
            .expect("fretted notes lie inside the note table")
    }

    /// Fret needed on `string_index` to sound `pitch_number`, if it is playable.
    pub fn for_pitch(string_index: usize, pitch_number: u8) -> Option<Self> {
        let open = STANDARD_TUNING.get(string_index)?.open_pitch;
        let fret = pitch_number.checked_sub(open)?;
        (fret <= MAX_FRET).then(|| Self::new(string_index, fret))
    }
}

/// Every fret position on every string whose pitch class is `pitch_class`.
pub fn fret_positions(pitch_class: PitchClass) -> Vec<FretPosition> {
    positions_where(ActiveStrings::all(), |pc| pc == pitch_class)
}

/// Fret positions on the given strings whose pitch class satisfies `keep`,
/// ordered by string then fret.
pub fn positions_where(
    strings: ActiveStrings,
    keep: impl Fn(PitchClass) -> bool,
) -> Vec<FretPosition> {
    strings
        .iter()
        .flat_map(|string_index| (0..=MAX_FRET).map(move |fret| FretPosition::new(string_index, fret)))
        .filter(|pos| keep(pos.note().pitch_class))
        .collect()
}

/// The strings enabled for practice, as a bit mask over string indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<usize>", into = "Vec<usize>")]
pub struct ActiveStrings(u8);

impl ActiveStrings {
    pub fn all() -> Self {
        Self((1 << STRING_COUNT) - 1)
    }

    pub fn none() -> Self {
        Self(0)
    }

    pub fn contains(&self, string_index: usize) -> bool {
        string_index < STRING_COUNT && self.0 & (1 << string_index) != 0
    }

    pub fn insert(&mut self, string_index: usize) {
        if string_index < STRING_COUNT {
            self.0 |= 1 << string_index;
        }
    }

    pub fn remove(&mut self, string_index: usize) {
        if string_index < STRING_COUNT {
            self.0 &= !(1 << string_index);
        }
    }

    pub fn set(&mut self, string_index: usize, enabled: bool) {
        if enabled {
            self.insert(string_index);
        } else {
            self.remove(string_index);
        }
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Enabled string indices, lowest string first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..STRING_COUNT).filter(move |&i| self.contains(i))
    }
}

impl Default for ActiveStrings {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<usize> for ActiveStrings {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut strings = Self::none();
        for string_index in iter {
            strings.insert(string_index);
        }
        strings
    }
}

impl From<Vec<usize>> for ActiveStrings {
    fn from(indices: Vec<usize>) -> Self {
        indices.into_iter().collect()
    }
}

impl From<ActiveStrings> for Vec<usize> {
    fn from(strings: ActiveStrings) -> Self {
        strings.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_strings_match_standard_tuning() {
        let names: Vec<String> = STANDARD_TUNING.iter().map(|s| s.open_note().name()).collect();
        assert_eq!(names, ["E2", "A2", "D3", "G3", "B3", "E4"]);
    }

    #[test]
    fn fret_position_derives_note() {
        let pos = FretPosition::new(1, 12);
        assert_eq!(pos.note().name(), "A3");
        assert_eq!(pos.pitch_number(), 57);
    }

    #[test]
    fn for_pitch_checks_fret_range() {
        assert_eq!(FretPosition::for_pitch(0, 40), Some(FretPosition::new(0, 0)));
        assert_eq!(FretPosition::for_pitch(0, 52), Some(FretPosition::new(0, 12)));
        assert_eq!(FretPosition::for_pitch(0, 53), None);
        assert_eq!(FretPosition::for_pitch(1, 44), None);
        assert_eq!(FretPosition::for_pitch(6, 60), None);
    }

    #[test]
    fn every_string_has_the_pitch_class_once_or_twice() {
        let positions = fret_positions(PitchClass::E);
        // Open and twelfth fret on both E strings, plus one hit on each other string.
        assert_eq!(positions.len(), 8);
        assert!(positions.iter().all(|p| p.note().pitch_class == PitchClass::E));
    }

    #[test]
    fn positions_respect_active_strings() {
        let strings: ActiveStrings = [2, 3].into_iter().collect();
        let positions = positions_where(strings, |_| true);
        assert_eq!(positions.len(), 26);
        assert!(positions.iter().all(|p| strings.contains(p.string_index)));
    }

    #[test]
    fn active_strings_set_operations() {
        let mut strings = ActiveStrings::none();
        assert!(strings.is_empty());
        strings.insert(0);
        strings.insert(5);
        strings.insert(9);
        assert_eq!(strings.len(), 2);
        assert_eq!(strings.iter().collect::<Vec<_>>(), [0, 5]);
        strings.set(0, false);
        assert!(!strings.contains(0));
        assert_eq!(ActiveStrings::all().len(), STRING_COUNT);
    }
}
