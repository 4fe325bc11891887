//! Voice input as a single-slot session state machine.
//!
//! A [`Recognizer`] is injected through [`Capability`]; it reports back with
//! [`RecognizerEvent`]s tagged by the [`SessionId`] that `start` handed it.
//! Events from any other session are stale and dropped.

mod error;
#[cfg(feature = "whisper")]
mod recorder;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use error::{RecognitionError, SpeechError};

/// Identifies one start/stop cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEventKind {
    Started,
    Result(String),
    /// Raw error code as reported by the recognizer, e.g. `not-allowed`.
    Error(String),
    Ended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerEvent {
    pub session: SessionId,
    pub kind: RecognizerEventKind,
}

impl RecognizerEvent {
    pub fn new(session: SessionId, kind: RecognizerEventKind) -> Self {
        Self { session, kind }
    }
}

/// A speech-to-text backend. Single utterance, final results only.
pub trait Recognizer {
    /// Begin capturing for `session`.
    fn start(&mut self, session: SessionId) -> Result<(), RecognitionError>;
    /// Abandon any capture in progress. Must be safe to call repeatedly.
    fn stop(&mut self);
}

pub enum Capability {
    Available(Box<dyn Recognizer>),
    /// Still being prepared in the background; see [`SpeechInput::install`].
    Loading,
    Unavailable,
}

/// What the voice control should look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStatus {
    Loading,
    Ready,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    Idle,
    Listening(SessionId),
}

/// What the rest of the application needs to know after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechSignal {
    /// Recognizer confirmed it is capturing.
    Listening,
    /// Session finished with this (trimmed, non-empty) text.
    Transcript(String),
    Failed(RecognitionError),
    /// Session finished without text.
    Idle,
}

pub struct SpeechInput {
    capability: Capability,
    state: ListenState,
    next_session: u64,
}

impl SpeechInput {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            state: ListenState::Idle,
            next_session: 0,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self.capability, Capability::Available(_))
    }

    pub fn status(&self) -> VoiceStatus {
        match self.capability {
            Capability::Available(_) => VoiceStatus::Ready,
            Capability::Loading => VoiceStatus::Loading,
            Capability::Unavailable => VoiceStatus::Unavailable,
        }
    }

    /// Replace the recognizer once background preparation has finished.
    /// Any open session is abandoned.
    pub fn install(&mut self, capability: Capability) {
        if self.is_listening() {
            self.go_idle();
        }
        self.capability = capability;
        self.state = ListenState::Idle;
    }

    pub fn state(&self) -> ListenState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.state, ListenState::Listening(_))
    }

    /// Open a session. `Ok(false)` means one is already running.
    pub fn start(&mut self) -> Result<bool, SpeechError> {
        let Capability::Available(recognizer) = &mut self.capability else {
            return Err(SpeechError::Unsupported);
        };
        if let ListenState::Listening(_) = self.state {
            return Ok(false);
        }
        self.next_session += 1;
        let session = SessionId(self.next_session);
        recognizer.start(session).map_err(|e| {
            log::error!("Error starting speech recognition: {e}");
            SpeechError::Recognition(e)
        })?;
        log::info!("Speech recognition started (session {})", session.0);
        self.state = ListenState::Listening(session);
        Ok(true)
    }

    /// Close the current session, if any. Returns whether one was open.
    pub fn stop(&mut self) -> bool {
        if !self.is_listening() {
            return false;
        }
        log::info!("Speech recognition stopped");
        self.go_idle();
        true
    }

    /// Start when idle, stop when listening. Returns the listening flag.
    pub fn toggle(&mut self) -> Result<bool, SpeechError> {
        if self.is_listening() {
            self.stop();
            Ok(false)
        } else {
            self.start().map(|_| true)
        }
    }

    pub fn handle(&mut self, event: RecognizerEvent) -> Option<SpeechSignal> {
        if self.state != ListenState::Listening(event.session) {
            log::debug!("Dropping stale recognizer event {event:?}");
            return None;
        }
        match event.kind {
            RecognizerEventKind::Started => Some(SpeechSignal::Listening),
            RecognizerEventKind::Result(text) => {
                self.go_idle();
                let text = text.trim();
                log::info!("Speech recognized: {text:?}");
                if text.is_empty() {
                    Some(SpeechSignal::Idle)
                } else {
                    Some(SpeechSignal::Transcript(text.to_string()))
                }
            }
            RecognizerEventKind::Error(code) => {
                self.go_idle();
                let error = RecognitionError::from_code(&code);
                log::error!("Speech recognition error: {code}");
                Some(SpeechSignal::Failed(error))
            }
            RecognizerEventKind::Ended => {
                self.go_idle();
                log::info!("Speech recognition ended");
                Some(SpeechSignal::Idle)
            }
        }
    }

    fn go_idle(&mut self) {
        self.state = ListenState::Idle;
        if let Capability::Available(recognizer) = &mut self.capability {
            recognizer.stop();
        }
    }
}
