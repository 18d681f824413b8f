//! # Scale Module
//!
//! Scales restrict which pitch classes may be prompted, and in chord mode they
//! supply the diatonic triads: a random scale degree with the quality the key
//! gives it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TaskError;
use crate::tuning::PitchClass;

const MAJOR_STEPS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_STEPS: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

const MAJOR_QUALITIES: [ChordQuality; 7] = [
    ChordQuality::Major,
    ChordQuality::Minor,
    ChordQuality::Minor,
    ChordQuality::Major,
    ChordQuality::Major,
    ChordQuality::Minor,
    ChordQuality::Diminished,
];
const MINOR_QUALITIES: [ChordQuality; 7] = [
    ChordQuality::Minor,
    ChordQuality::Diminished,
    ChordQuality::Major,
    ChordQuality::Minor,
    ChordQuality::Minor,
    ChordQuality::Major,
    ChordQuality::Major,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleType {
    Chromatic,
    #[default]
    Major,
    /// Natural minor
    Minor,
}

impl ScaleType {
    pub const ALL: [ScaleType; 3] = [ScaleType::Chromatic, ScaleType::Major, ScaleType::Minor];

    fn steps(self) -> Option<&'static [u8; 7]> {
        match self {
            ScaleType::Chromatic => None,
            ScaleType::Major => Some(&MAJOR_STEPS),
            ScaleType::Minor => Some(&MINOR_STEPS),
        }
    }

    fn qualities(self) -> Option<&'static [ChordQuality; 7]> {
        match self {
            ScaleType::Chromatic => None,
            ScaleType::Major => Some(&MAJOR_QUALITIES),
            ScaleType::Minor => Some(&MINOR_QUALITIES),
        }
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleType::Chromatic => "Chromatic",
            ScaleType::Major => "Major",
            ScaleType::Minor => "Minor",
        })
    }
}

/// A scale type anchored on a root. The root is ignored for chromatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale {
    pub kind: ScaleType,
    pub root: PitchClass,
}

impl Default for Scale {
    fn default() -> Self {
        Self { kind: ScaleType::Major, root: PitchClass::C }
    }
}

impl Scale {
    pub fn new(kind: ScaleType, root: PitchClass) -> Self {
        Self { kind, root }
    }

    /// Member pitch classes in degree order (ascending from C for chromatic).
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        match self.kind.steps() {
            Some(steps) => steps.iter().map(|&s| self.root.transpose(s)).collect(),
            None => PitchClass::ALL.to_vec(),
        }
    }

    pub fn contains(&self, pitch_class: PitchClass) -> bool {
        match self.kind.steps() {
            Some(steps) => {
                let offset = (pitch_class.index() + 12 - self.root.index()) % 12;
                steps.contains(&(offset as u8))
            }
            None => true,
        }
    }

    /// The diatonic triad built on `degree` (0 = tonic).
    ///
    /// # Returns
    /// * `None` - The scale is chromatic or the degree is out of range
    pub fn chord_on_degree(&self, degree: usize) -> Option<ChordDescriptor> {
        let steps = self.kind.steps()?;
        let quality = *self.kind.qualities()?.get(degree)?;
        Some(ChordDescriptor::new(self.root.transpose(steps[degree]), quality))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
}

impl ChordQuality {
    pub fn third_interval(self) -> u8 {
        match self {
            ChordQuality::Major => 4,
            ChordQuality::Minor | ChordQuality::Diminished => 3,
        }
    }

    pub fn fifth_interval(self) -> u8 {
        match self {
            ChordQuality::Diminished => 6,
            ChordQuality::Major | ChordQuality::Minor => 7,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ChordQuality::Major => "major",
            ChordQuality::Minor => "minor",
            ChordQuality::Diminished => "dim",
        }
    }
}

/// A triad to be voiced: root pitch class plus intervals in semitones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordDescriptor {
    pub root: PitchClass,
    pub third_interval: u8,
    pub fifth_interval: u8,
    pub quality: ChordQuality,
}

impl ChordDescriptor {
    pub fn new(root: PitchClass, quality: ChordQuality) -> Self {
        Self {
            root,
            third_interval: quality.third_interval(),
            fifth_interval: quality.fifth_interval(),
            quality,
        }
    }

    /// Human readable name (e.g., "A minor", "B dim").
    pub fn display_name(&self) -> String {
        format!("{} {}", self.root, self.quality.label())
    }

    pub fn third(&self) -> PitchClass {
        self.root.transpose(self.third_interval)
    }

    pub fn fifth(&self) -> PitchClass {
        self.root.transpose(self.fifth_interval)
    }
}

/// Picks a diatonic triad on a uniformly random scale degree.
///
/// # Errors
/// * `TaskError::ChordNeedsKey` - The scale is chromatic
pub fn pick_chord<R: Rng + ?Sized>(scale: &Scale, rng: &mut R) -> Result<ChordDescriptor, TaskError> {
    if scale.kind == ScaleType::Chromatic {
        return Err(TaskError::ChordNeedsKey);
    }
    let degree = rng.gen_range(0..7);
    scale.chord_on_degree(degree).ok_or(TaskError::ChordNeedsKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn major_and_minor_members() {
        let g_major = Scale::new(ScaleType::Major, PitchClass::G);
        let names: Vec<&str> = g_major.pitch_classes().iter().map(|pc| pc.name()).collect();
        assert_eq!(names, ["G", "A", "B", "C", "D", "E", "F#"]);
        assert!(g_major.contains(PitchClass::Fs));
        assert!(!g_major.contains(PitchClass::F));

        let a_minor = Scale::new(ScaleType::Minor, PitchClass::A);
        let names: Vec<&str> = a_minor.pitch_classes().iter().map(|pc| pc.name()).collect();
        assert_eq!(names, ["A", "B", "C", "D", "E", "F", "G"]);
    }

    #[test]
    fn chromatic_ignores_root() {
        let scale = Scale::new(ScaleType::Chromatic, PitchClass::Ds);
        assert_eq!(scale.pitch_classes().len(), 12);
        assert!(PitchClass::ALL.iter().all(|&pc| scale.contains(pc)));
        assert!(scale.chord_on_degree(0).is_none());
    }

    #[test]
    fn diatonic_triads_in_c_major() {
        let scale = Scale::new(ScaleType::Major, PitchClass::C);
        let names: Vec<String> =
            (0..7).filter_map(|d| scale.chord_on_degree(d)).map(|c| c.display_name()).collect();
        assert_eq!(
            names,
            ["C major", "D minor", "E minor", "F major", "G major", "A minor", "B dim"]
        );
        let b_dim = scale.chord_on_degree(6).unwrap();
        assert_eq!((b_dim.third(), b_dim.fifth()), (PitchClass::D, PitchClass::F));
        assert!(scale.chord_on_degree(7).is_none());
    }

    #[test]
    fn diatonic_triads_in_a_minor() {
        let scale = Scale::new(ScaleType::Minor, PitchClass::A);
        let qualities: Vec<ChordQuality> =
            (0..7).filter_map(|d| scale.chord_on_degree(d)).map(|c| c.quality).collect();
        assert_eq!(qualities, MINOR_QUALITIES);
        assert_eq!(scale.chord_on_degree(1).unwrap().display_name(), "B dim");
    }

    #[test]
    fn pick_chord_stays_in_key() {
        let scale = Scale::new(ScaleType::Major, PitchClass::E);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let chord = pick_chord(&scale, &mut rng).unwrap();
            assert!(scale.contains(chord.root));
            assert!(scale.contains(chord.third()));
            assert!(scale.contains(chord.fifth()));
        }
    }

    #[test]
    fn pick_chord_rejects_chromatic() {
        let scale = Scale::new(ScaleType::Chromatic, PitchClass::C);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_chord(&scale, &mut rng), Err(TaskError::ChordNeedsKey));
    }
}
