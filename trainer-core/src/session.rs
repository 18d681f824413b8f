//! # Practice Session Module
//!
//! The state machine that ties task selection, pitch detection and note
//! matching into a practice loop:
//!
//! ```text
//! Idle -> AwaitingInput (reference tone) -> Listening -> Advancing -> AwaitingInput ...
//!   ^                                                         |
//!   +------------------- task error ---------------------------+
//! ```
//!
//! The controller never touches audio or the screen. Every operation returns
//! the `Command`s the front end should carry out, and timed steps are queued
//! as deferred actions that fire from `tick`. Each deferred action remembers
//! the generation it was scheduled under; starting a new task bumps the
//! generation, so anything left over from an earlier task is dropped.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{MAX_WAIT, PracticeConfig};
use crate::error::TaskError;
use crate::fretboard::{self, FretPosition};
use crate::pitch;
use crate::scale::{self, ChordDescriptor};
use crate::tuning::{self, PitchClass};
use crate::voicing::{self, ChordVoicing};

/// Length of the reference tone.
pub const REFERENCE_TONE: Duration = Duration::from_millis(1000);
/// Gap between the end of the reference tone and listening, so the tone is
/// not heard as the answer.
pub const LISTEN_GUARD: Duration = Duration::from_millis(150);
/// Pause between the notes of a chord.
pub const CHORD_NOTE_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No task, or the last task could not start.
    Idle,
    /// The reference tone is playing.
    AwaitingInput,
    Listening,
    /// A correct note was heard; waiting to move on.
    Advancing,
}

/// The note currently being asked for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub position: FretPosition,
    pub pitch_class: PitchClass,
    pub frequency: f32,
    pub string_label: &'static str,
}

impl Target {
    fn new(position: FretPosition) -> Self {
        let note = position.note();
        Self {
            position,
            pitch_class: note.pitch_class,
            frequency: note.frequency,
            string_label: position.string().label,
        }
    }
}

/// Progress through a chord task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChordState {
    pub descriptor: ChordDescriptor,
    pub voicing: ChordVoicing,
    /// Index of the voicing note being asked for.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub target: Option<Target>,
    pub chord: Option<ChordState>,
    pub listening: bool,
    /// Bumped on every task transition.
    pub generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            target: None,
            chord: None,
            listening: false,
            generation: 0,
        }
    }
}

/// Instruction shown to the performer.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Pitch class in single-note mode, full note name in chord mode.
    pub note: String,
    pub string_label: &'static str,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Play {} on the {} string", self.note, self.string_label)
    }
}

/// Status line contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Correct { note_name: String, cents: f32 },
    /// A pitch was heard but it was not the target.
    Heard { pitch_class: PitchClass, cents: f32 },
    Error(TaskError),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Correct { note_name, cents } => write!(f, "Correct! ({note_name}, {cents:.1} ¢)"),
            Status::Heard { pitch_class, cents } => write!(f, "Heard {pitch_class} – {cents:.1} ¢ off"),
            Status::Error(err) => write!(f, "{err}"),
        }
    }
}

/// Side effects requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PlayTone { frequency: f32, duration: Duration },
    ShowPrompt(Prompt),
    /// Chord name for the chord label.
    ShowChord(String),
    ClearChord,
    SetStatus(Status),
    ClearStatus,
    /// Highlight the prompt as answered.
    MarkCorrect,
    RenderDiagram(ChordVoicing),
    ClearDiagram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeferredAction {
    StartListening,
    /// Prompt the chord note at the current chord position.
    PromptNext,
    /// Leave the finished task and pick a new one.
    NextTask,
}

#[derive(Debug, Clone, Copy)]
struct Deferred {
    due: Instant,
    generation: u64,
    action: DeferredAction,
}

/// Owns the session state and drives the practice loop.
pub struct SessionController<R = StdRng> {
    config: PracticeConfig,
    state: SessionState,
    pending: Vec<Deferred>,
    rng: R,
}

impl SessionController<StdRng> {
    pub fn new(config: PracticeConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> SessionController<R> {
    /// Creates a controller with an explicit random source, so a seeded
    /// generator gives a repeatable sequence of tasks.
    pub fn with_rng(config: PracticeConfig, rng: R) -> Self {
        Self {
            config,
            state: SessionState::default(),
            pending: Vec::new(),
            rng,
        }
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    /// Settings changes take effect at the next task selection.
    pub fn config_mut(&mut self) -> &mut PracticeConfig {
        &mut self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state.listening
    }

    /// Earliest instant at which a deferred action is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .iter()
            .filter(|d| d.generation == self.state.generation)
            .map(|d| d.due)
            .min()
    }

    /// Abandons the current task, if any, and starts a new one.
    ///
    /// In chord mode a diatonic triad is drawn and voiced on the enabled
    /// strings; otherwise a random fret position whose pitch class belongs to
    /// the scale is prompted. Failures leave the session `Idle` with an error
    /// status.
    pub fn select_task(&mut self, now: Instant) -> Vec<Command> {
        let mut commands = self.reset();

        let started = if self.config.chord_mode {
            self.start_chord(now, &mut commands)
        } else {
            self.start_single_note(now, &mut commands)
        };

        if let Err(err) = started {
            warn!(target: "session", "task not started: {err}");
            commands.push(Command::SetStatus(Status::Error(err)));
        }
        commands
    }

    /// Starts a single-note task on a specific fret position.
    pub fn start_note(&mut self, position: FretPosition, now: Instant) -> Vec<Command> {
        let mut commands = self.reset();
        self.prompt(position, now, &mut commands);
        commands
    }

    /// Cancels the current task and returns to `Idle`.
    pub fn stop(&mut self) -> Vec<Command> {
        info!(target: "session", "session stopped");
        self.reset()
    }

    /// Runs every deferred action that is due at `now`.
    pub fn tick(&mut self, now: Instant) -> Vec<Command> {
        let mut commands = Vec::new();

        let (mut due, waiting): (Vec<Deferred>, Vec<Deferred>) =
            self.pending.drain(..).partition(|d| d.due <= now);
        self.pending = waiting;
        due.sort_by_key(|d| d.due);

        for deferred in due {
            // Checked per action: an earlier action in this batch may have
            // started a new task.
            if deferred.generation != self.state.generation {
                debug!(
                    target: "session",
                    "dropping stale {:?} from generation {}",
                    deferred.action, deferred.generation
                );
                continue;
            }
            self.run_deferred(deferred.action, now, &mut commands);
        }
        commands
    }

    /// Handles one captured audio frame.
    ///
    /// Frames are ignored unless the session is listening. A frame without
    /// a detectable pitch keeps the session listening.
    pub fn on_frame(&mut self, samples: &[f32], sample_rate: u32, now: Instant) -> Vec<Command> {
        if !self.state.listening {
            return Vec::new();
        }
        match pitch::detect_pitch_autocorrelation(samples, sample_rate, pitch::SILENCE_RMS_THRESHOLD) {
            Some(frequency) => self.on_frequency(frequency, now),
            None => Vec::new(),
        }
    }

    /// Judges a detected frequency against the current target.
    pub fn on_frequency(&mut self, frequency: f32, now: Instant) -> Vec<Command> {
        if !self.state.listening {
            return Vec::new();
        }
        let Some(target) = self.state.target else {
            return Vec::new();
        };

        let result = tuning::match_pitch(frequency, target.pitch_class, tuning::CENT_TOLERANCE);
        if !result.is_match {
            return vec![Command::SetStatus(Status::Heard {
                pitch_class: result.note.pitch_class,
                cents: result.cents,
            })];
        }

        info!(
            target: "session",
            "correct: heard {} at {:.1} Hz ({:+.1} cents)",
            result.note.name(), frequency, result.cents
        );
        self.state.listening = false;
        self.state.phase = Phase::Advancing;
        let mut commands = vec![
            Command::SetStatus(Status::Correct { note_name: result.note.name(), cents: result.cents }),
            Command::MarkCorrect,
        ];

        let chord_progress = self.state.chord.as_mut().map(|chord| {
            chord.position += 1;
            (chord.position < chord.voicing.positions.len(), chord.voicing)
        });
        match chord_progress {
            Some((true, _)) => self.schedule(now + CHORD_NOTE_PAUSE, DeferredAction::PromptNext),
            Some((false, voicing)) => {
                info!(target: "session", "chord complete");
                commands.push(Command::RenderDiagram(voicing));
                self.schedule_after(now, self.config.diagram_hold, DeferredAction::NextTask);
            }
            None => self.schedule_after(now, self.config.practice_delay, DeferredAction::NextTask),
        }
        commands
    }

    /// Starts a new generation: stops listening and clears the task.
    fn reset(&mut self) -> Vec<Command> {
        self.state.generation += 1;
        self.state.listening = false;
        self.state.phase = Phase::Idle;
        self.state.target = None;
        self.state.chord = None;
        vec![Command::ClearDiagram, Command::ClearChord]
    }

    fn start_chord(&mut self, now: Instant, commands: &mut Vec<Command>) -> Result<(), TaskError> {
        if self.config.active_strings.is_empty() {
            return Err(TaskError::NoActiveStrings);
        }
        let descriptor = scale::pick_chord(&self.config.scale(), &mut self.rng)?;
        let voicing = voicing::find_voicing(&descriptor, self.config.active_strings, &mut self.rng)
            .ok_or(TaskError::NoVoicing)?;

        info!(target: "session", "new chord task: {}", descriptor.display_name());
        commands.push(Command::ShowChord(descriptor.display_name()));
        self.state.chord = Some(ChordState { descriptor, voicing, position: 0 });
        self.prompt(voicing.root(), now, commands);
        Ok(())
    }

    fn start_single_note(&mut self, now: Instant, commands: &mut Vec<Command>) -> Result<(), TaskError> {
        let strings = self.config.active_strings;
        if strings.is_empty() {
            return Err(TaskError::NoActiveStrings);
        }
        let scale = self.config.scale();
        let candidates = fretboard::positions_where(strings, |pc| scale.contains(pc));
        if candidates.is_empty() {
            return Err(TaskError::NoScaleNotes);
        }
        let position = candidates[self.rng.gen_range(0..candidates.len())];
        self.prompt(position, now, commands);
        Ok(())
    }

    /// Sets the target, plays its reference tone, and schedules listening.
    fn prompt(&mut self, position: FretPosition, now: Instant, commands: &mut Vec<Command>) {
        let target = Target::new(position);
        let note = if self.state.chord.is_some() {
            position.note().name()
        } else {
            target.pitch_class.to_string()
        };
        debug!(
            target: "session",
            "prompting {} on {} (fret {}, {:.2} Hz)",
            note, target.string_label, position.fret, target.frequency
        );

        self.state.target = Some(target);
        self.state.listening = false;
        self.state.phase = Phase::AwaitingInput;
        commands.push(Command::ShowPrompt(Prompt { note, string_label: target.string_label }));
        commands.push(Command::ClearStatus);
        commands.push(Command::PlayTone { frequency: target.frequency, duration: REFERENCE_TONE });
        self.schedule(now + REFERENCE_TONE + LISTEN_GUARD, DeferredAction::StartListening);
    }

    /// Schedules `action` after a configured wait, capped at `MAX_WAIT`.
    fn schedule_after(&mut self, now: Instant, wait: Duration, action: DeferredAction) {
        let due = now.checked_add(wait.min(MAX_WAIT)).unwrap_or(now);
        self.schedule(due, action);
    }

    fn schedule(&mut self, due: Instant, action: DeferredAction) {
        self.pending.push(Deferred { due, generation: self.state.generation, action });
    }

    fn run_deferred(&mut self, action: DeferredAction, now: Instant, commands: &mut Vec<Command>) {
        match action {
            DeferredAction::StartListening => {
                debug!(target: "session", "listening");
                self.state.listening = true;
                self.state.phase = Phase::Listening;
            }
            DeferredAction::PromptNext => {
                let next = self
                    .state
                    .chord
                    .and_then(|chord| chord.voicing.positions.get(chord.position).copied());
                if let Some(position) = next {
                    self.prompt(position, now, commands);
                }
            }
            DeferredAction::NextTask => commands.extend(self.select_task(now)),
        }
    }
}
