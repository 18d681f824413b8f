use thiserror::Error;

/// Reasons a practice task could not be started.
///
/// None of these end the session. They are shown on the status line and the
/// session waits in `Idle` until the settings change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Select at least one string.")]
    NoActiveStrings,
    #[error("No notes fit that scale on those strings.")]
    NoScaleNotes,
    #[error("Chord mode needs a major or minor key.")]
    ChordNeedsKey,
    #[error("No valid string pattern for that chord.")]
    NoVoicing,
}
