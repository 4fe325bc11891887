use crate::config::Config;
use crate::speech::{Capability, RecognizerEvent, SpeechInput, VoiceStatus};
use crate::storage::{KvStore, Persistence};
use crate::store::Store;
use crate::task::TaskId;

pub(super) const SAVE_FAILED: &str = "Failed to save data. Your changes may be lost.";
pub(super) const LOAD_FAILED: &str = "Failed to load saved data. Starting fresh.";

/// Everything the surface or the recognizer can ask the application to do.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Submit(String),
    ToggleTask(TaskId),
    DeleteTask(TaskId),
    /// Asks for confirmation first.
    ClearCompleted,
    ClearCompletedConfirmed,
    ToggleTheme,
    ToggleListening,
    StopListening,
    /// Window hidden or suspended.
    PageHidden,
    Recognizer(RecognizerEvent),
    Export,
    /// Asks for confirmation first.
    Reset,
    ResetConfirmed,
    Teardown,
}

/// Transient user-visible message.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(String),
    Warning(String),
    /// Shown modally.
    Error(String),
}

/// Work for the surface after handling an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Notice(Notice),
    /// Ask the user; dispatch `accept` if they agree.
    Confirm { prompt: String, accept: AppEvent },
    Listening(bool),
    /// Enable or disable the voice control.
    Voice(VoiceStatus),
}

impl Effect {
    pub(super) fn success(message: impl Into<String>) -> Self {
        Effect::Notice(Notice::Success(message.into()))
    }

    pub(super) fn warning(message: impl Into<String>) -> Self {
        Effect::Notice(Notice::Warning(message.into()))
    }

    pub(super) fn error(message: impl Into<String>) -> Self {
        Effect::Notice(Notice::Error(message.into()))
    }
}

/// Composition root: owns the store and the speech input. Lives on the main
/// thread; every event goes through [`App::handle`].
pub struct App {
    pub(super) config: Config,
    pub(super) store: Store,
    pub(super) speech: SpeechInput,
}

impl App {
    /// Hydrate saved state and report anything the user should know about
    /// startup. A failed load is an error the user has to acknowledge.
    pub fn start(config: Config, kv: Box<dyn KvStore>, capability: Capability) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();

        let (store, warning) = Store::open(Persistence::new(kv));
        if warning.is_some() {
            effects.push(Effect::error(LOAD_FAILED));
        }

        let speech = SpeechInput::new(capability);
        voice_effects(&speech, &mut effects);

        log::info!("Voice To-Do initialized with {} tasks", store.tasks().len());
        (
            Self {
                config,
                store,
                speech,
            },
            effects,
        )
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Register observers here; they run after every persisted mutation.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Swap in the recognizer once it has finished loading in the background.
    pub fn install_recognizer(&mut self, capability: Capability) -> Vec<Effect> {
        let mut effects = Vec::new();
        let was_listening = self.speech.is_listening();
        self.speech.install(capability);
        if was_listening {
            effects.push(Effect::Listening(false));
        }
        voice_effects(&self.speech, &mut effects);
        effects
    }

    pub fn speech(&self) -> &SpeechInput {
        &self.speech
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn voice_effects(speech: &SpeechInput, effects: &mut Vec<Effect>) {
    let status = speech.status();
    effects.push(Effect::Voice(status));
    if status == VoiceStatus::Unavailable {
        log::warn!("Speech recognition unavailable");
        effects.push(Effect::warning(
            "Speech recognition is not available. You can still type tasks.",
        ));
    }
}
