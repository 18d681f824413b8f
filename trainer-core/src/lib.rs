// trainer-core/src/lib.rs

//! The core logic for the fretboard ear trainer.
//! This crate is responsible for audio I/O, pitch detection, note matching,
//! chord voicing search and the practice session state machine. It is
//! completely headless and contains no GUI code.

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod fretboard;
pub mod pitch;
pub mod scale;
pub mod session;
pub mod tuning;
pub mod voicing;

pub use config::PracticeConfig;
pub use error::TaskError;
pub use fretboard::{ActiveStrings, FretPosition, STANDARD_TUNING, StringDef};
pub use scale::{ChordDescriptor, ChordQuality, Scale, ScaleType};
pub use session::{Command, Phase, Prompt, SessionController, SessionState, Status};
pub use tuning::{Note, PitchClass};
pub use voicing::ChordVoicing;
