//! # Fretboard Trainer GUI
//!
//! Desktop front end for the fretboard ear trainer. It owns the practice
//! session, shows prompts, status and the chord diagram, and exposes the
//! practice settings.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application holding the `SessionController`
//! - **Audio Thread**: Owns the cpal input and output streams
//! - **Communication**: Crossbeam channels for frames, tone requests and shutdown
//! - **Updates**: 16 ms tick drives frame evaluation and deferred session actions

mod ui;

use crossbeam_channel::{Receiver, Sender};
use cpal::traits::StreamTrait;
use iced::{Element, Subscription, Theme};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use trainer_core::audio::{self, ToneRequest};
use trainer_core::config::SETTINGS_FILE;
use trainer_core::{ChordVoicing, Command, PitchClass, PracticeConfig, ScaleType, SessionController, Status};
use ui::main_display::create_main_view;

/// Frames waiting for the GUI thread. Older frames are dropped when full.
const FRAME_QUEUE: usize = 4;

/// How long to wait for the audio thread to open its devices.
const AUDIO_STARTUP_TIMEOUT: Duration = Duration::from_secs(3);

pub fn main() -> iced::Result {
    tracing_subscriber::fmt().with_target(true).init();
    info!(target: "gui", "starting Fretboard Trainer");

    iced::application("Fretboard Trainer", TrainerApp::update, TrainerApp::view)
        .subscription(TrainerApp::subscription)
        .theme(TrainerApp::theme)
        .run()
}

#[derive(Debug, Clone)]
pub enum Message {
    // Practice control
    NewTask,
    Stop,

    // Settings
    ScaleTypeSelected(ScaleType),
    ScaleRootSelected(PitchClass),
    ChordModeToggled(bool),
    StringToggled(usize, bool),
    PracticeDelayChanged(String),
    DiagramHoldChanged(String),
    SaveSettings,
    LoadSettings,

    Exit,
    Tick,
}

/// Everything the views need to draw one frame.
#[derive(Debug, Clone, Default)]
pub struct AppDisplayData {
    pub prompt: Option<String>,
    pub chord_label: Option<String>,
    pub status: Option<String>,
    pub status_is_error: bool,
    pub correct: bool,
    pub last_cents: Option<f32>,
    pub diagram: Option<ChordVoicing>,
    /// Device or settings problems, kept apart from the practice status.
    pub notice: Option<String>,

    // Raw text of the duration fields, as typed.
    pub practice_delay_text: String,
    pub diagram_hold_text: String,
}

struct TrainerApp {
    session: SessionController,
    audio: Option<AudioWorker>,
    display: AppDisplayData,
}

/// Handle to the thread that owns the cpal streams.
struct AudioWorker {
    frames: Receiver<Vec<f32>>,
    tones: Option<Sender<ToneRequest>>,
    sample_rate: u32,
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AudioWorker {
    /// Spawns the audio thread and waits until capture is running.
    fn start() -> anyhow::Result<Self> {
        let (frame_tx, frames) = crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE);
        let (tone_tx, tone_rx) = crossbeam_channel::unbounded::<ToneRequest>();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(u32, bool), String>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let thread_handle = thread::Builder::new()
            .name("audio".into())
            .spawn(move || run_audio_thread(frame_tx, tone_rx, ready_tx, shutdown_rx))?;

        let (sample_rate, has_output) = ready_rx
            .recv_timeout(AUDIO_STARTUP_TIMEOUT)
            .map_err(|_| anyhow::anyhow!("audio thread did not start in time"))?
            .map_err(anyhow::Error::msg)?;

        Ok(Self {
            frames,
            tones: has_output.then_some(tone_tx),
            sample_rate,
            shutdown_tx,
            thread_handle: Some(thread_handle),
        })
    }

    fn play_tone(&self, frequency: f32, duration: Duration) {
        if let Some(tones) = &self.tones {
            let _ = tones.try_send(ToneRequest { frequency, duration });
        }
    }
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!(target: "audio", "audio thread panicked");
            }
        }
    }
}

/// Body of the audio thread. cpal streams are not `Send`, so they are
/// created, kept alive and paused here.
fn run_audio_thread(
    frame_tx: Sender<Vec<f32>>,
    tone_rx: Receiver<ToneRequest>,
    ready_tx: Sender<Result<(u32, bool), String>>,
    shutdown_rx: Receiver<()>,
) {
    let (raw_tx, raw_rx) = crossbeam_channel::bounded::<Vec<f32>>(FRAME_QUEUE);

    let (input, sample_rate) = match audio::start_audio_capture(raw_tx) {
        Ok(started) => started,
        Err(e) => {
            error!(target: "audio", "failed to start audio capture: {e:#}");
            let _ = ready_tx.send(Err(format!("Audio input unavailable: {e}")));
            return;
        }
    };

    let output = match audio::start_tone_output(tone_rx) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(target: "audio", "reference tones disabled: {e:#}");
            None
        }
    };

    let _ = ready_tx.send(Ok((sample_rate, output.is_some())));
    info!(target: "audio", "audio thread running at {sample_rate} Hz");

    loop {
        crossbeam_channel::select! {
            recv(raw_rx) -> msg => match msg {
                Ok(frame) => {
                    // The GUI only evaluates the newest frame, so a full queue just drops this one.
                    let _ = frame_tx.try_send(frame);
                }
                Err(_) => {
                    warn!(target: "audio", "capture channel closed");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                debug!(target: "audio", "shutdown requested");
                break;
            },
        }
    }

    if let Err(e) = input.pause() {
        warn!(target: "audio", "error pausing input stream: {e}");
    }
    if let Some(output) = output {
        if let Err(e) = output.pause() {
            warn!(target: "audio", "error pausing output stream: {e}");
        }
    }
    info!(target: "audio", "audio thread finished");
}

impl Default for TrainerApp {
    fn default() -> Self {
        let config = match PracticeConfig::load(SETTINGS_FILE) {
            Ok(config) => {
                info!(target: "gui", "loaded settings from {SETTINGS_FILE}");
                config
            }
            Err(e) => {
                debug!(target: "gui", "using default settings: {e:#}");
                PracticeConfig::default()
            }
        };

        let mut app = Self {
            session: SessionController::new(config),
            audio: None,
            display: AppDisplayData::default(),
        };
        app.sync_settings_text();
        app
    }
}

impl TrainerApp {
    fn update(&mut self, message: Message) {
        match message {
            Message::NewTask => {
                let commands = self.session.select_task(Instant::now());
                if needs_audio(&commands) {
                    self.ensure_audio();
                }
                self.apply(commands);
            }
            Message::Stop => {
                let commands = self.session.stop();
                self.apply(commands);
                self.display.prompt = None;
                self.display.last_cents = None;
            }
            Message::ScaleTypeSelected(scale_type) => {
                self.session.config_mut().scale_type = scale_type;
            }
            Message::ScaleRootSelected(root) => {
                self.session.config_mut().scale_root = root;
            }
            Message::ChordModeToggled(enabled) => {
                self.session.config_mut().chord_mode = enabled;
            }
            Message::StringToggled(string_index, enabled) => {
                self.session.config_mut().active_strings.set(string_index, enabled);
            }
            Message::PracticeDelayChanged(text) => {
                self.session.config_mut().set_practice_delay(&text);
                self.display.practice_delay_text = text;
            }
            Message::DiagramHoldChanged(text) => {
                self.session.config_mut().set_diagram_hold(&text);
                self.display.diagram_hold_text = text;
            }
            Message::SaveSettings => match self.session.config().save(SETTINGS_FILE) {
                Ok(()) => {
                    info!(target: "gui", "settings saved to {SETTINGS_FILE}");
                    self.display.notice = Some(format!("Settings saved to {SETTINGS_FILE}"));
                }
                Err(e) => {
                    warn!(target: "gui", "error saving settings: {e:#}");
                    self.display.notice = Some(format!("Could not save settings: {e}"));
                }
            },
            Message::LoadSettings => match PracticeConfig::load(SETTINGS_FILE) {
                Ok(config) => {
                    *self.session.config_mut() = config;
                    self.sync_settings_text();
                    info!(target: "gui", "settings loaded from {SETTINGS_FILE}");
                    self.display.notice = Some(format!("Settings loaded from {SETTINGS_FILE}"));
                }
                Err(e) => {
                    warn!(target: "gui", "error loading settings: {e:#}");
                    self.display.notice = Some(format!("Could not load settings: {e}"));
                }
            },
            Message::Exit => {
                info!(target: "gui", "exit requested");
                self.session.stop();
                // Joins the audio thread so both streams are paused before the process ends.
                self.audio = None;
                std::process::exit(0);
            }
            Message::Tick => {
                let now = Instant::now();
                let mut commands = Vec::new();
                if let Some(audio) = &self.audio {
                    if let Some(frame) = audio.frames.try_iter().last() {
                        commands.extend(self.session.on_frame(&frame, audio.sample_rate, now));
                    }
                }
                if self.session.next_deadline().is_some_and(|due| due <= now) {
                    commands.extend(self.session.tick(now));
                }
                self.apply(commands);
            }
        }
    }

    /// Starts the audio thread if it is not running. On failure a notice is
    /// shown and the next started task tries again.
    fn ensure_audio(&mut self) {
        if self.audio.is_some() {
            return;
        }
        match AudioWorker::start() {
            Ok(worker) => {
                if worker.tones.is_none() {
                    self.display.notice = Some("No output device: reference tones are off".into());
                }
                self.audio = Some(worker);
            }
            Err(e) => {
                error!(target: "gui", "audio unavailable: {e:#}");
                self.display.notice = Some(e.to_string());
            }
        }
    }

    fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::PlayTone { frequency, duration } => {
                    if let Some(audio) = &self.audio {
                        audio.play_tone(frequency, duration);
                    }
                }
                Command::ShowPrompt(prompt) => {
                    self.display.prompt = Some(prompt.to_string());
                    self.display.correct = false;
                    self.display.last_cents = None;
                }
                Command::ShowChord(name) => self.display.chord_label = Some(format!("Chord: {name}")),
                Command::ClearChord => self.display.chord_label = None,
                Command::SetStatus(status) => {
                    self.display.last_cents = match &status {
                        Status::Correct { cents, .. } | Status::Heard { cents, .. } => Some(*cents),
                        Status::Error(_) => None,
                    };
                    self.display.status_is_error = matches!(status, Status::Error(_));
                    if self.display.status_is_error {
                        self.display.prompt = None;
                    }
                    self.display.status = Some(status.to_string());
                }
                Command::ClearStatus => {
                    self.display.status = None;
                    self.display.status_is_error = false;
                }
                Command::MarkCorrect => self.display.correct = true,
                Command::RenderDiagram(voicing) => self.display.diagram = Some(voicing),
                Command::ClearDiagram => self.display.diagram = None,
            }
        }
    }

    fn sync_settings_text(&mut self) {
        let config = self.session.config();
        self.display.practice_delay_text = config.practice_delay.as_secs_f32().to_string();
        self.display.diagram_hold_text = config.diagram_hold.as_secs_f32().to_string();
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display, self.session.config(), self.session.is_listening())
    }

    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(Duration::from_millis(16)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Devices are opened only for a task that actually started, which always
/// begins with a reference tone.
fn needs_audio(commands: &[Command]) -> bool {
    commands.iter().any(|c| matches!(c, Command::PlayTone { .. }))
}
