//! On-device recognizer: cpal capture, energy-based endpointing, whisper
//! transcription on a private tokio runtime.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::recorder::{self, CaptureBuffer, TARGET_RATE};
use super::{RecognitionError, Recognizer, RecognizerEvent, RecognizerEventKind, SessionId};
use crate::config::{Config, SpeechConfig};

const TICK: Duration = Duration::from_millis(80);

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("whisper model not found at {}", .0.display())]
    ModelMissing(PathBuf),
    #[error("failed to load whisper model: {0}")]
    Load(String),
    #[error("failed to start speech runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

struct Session {
    stream: cpal::Stream,
    buffer: CaptureBuffer,
    cancelled: Arc<AtomicBool>,
}

pub struct WhisperRecognizer {
    ctx: Arc<WhisperContext>,
    rt: tokio::runtime::Runtime,
    events: async_channel::Sender<RecognizerEvent>,
    language: String,
    settings: SpeechConfig,
    session: Option<Session>,
}

/// A model load running on the recognizer's runtime. Await [`ready`] from
/// the main loop.
///
/// [`ready`]: PendingRecognizer::ready
pub struct PendingRecognizer {
    rt: tokio::runtime::Runtime,
    ctx_rx: async_channel::Receiver<Result<WhisperContext, BackendError>>,
    events: async_channel::Sender<RecognizerEvent>,
    language: String,
    settings: SpeechConfig,
}

impl WhisperRecognizer {
    /// Start loading the model named by `config` on a blocking worker. Only
    /// the cheap checks run on the caller's thread.
    pub fn load_in_background(
        config: &Config,
        events: async_channel::Sender<RecognizerEvent>,
    ) -> Result<PendingRecognizer, BackendError> {
        let path = config.model_path();
        if !path.exists() {
            return Err(BackendError::ModelMissing(path));
        }
        let rt = tokio::runtime::Runtime::new()?;

        let (ctx_tx, ctx_rx) = async_channel::bounded(1);
        rt.spawn(async move {
            let result = match tokio::task::spawn_blocking(move || load_context(&path)).await {
                Ok(result) => result,
                Err(e) => Err(BackendError::Load(format!("model load panicked: {e}"))),
            };
            let _ = ctx_tx.send(result).await;
        });

        Ok(PendingRecognizer {
            rt,
            ctx_rx,
            events,
            language: config.language.clone(),
            settings: config.speech.clone(),
        })
    }
}

impl PendingRecognizer {
    pub async fn ready(self) -> Result<WhisperRecognizer, BackendError> {
        let ctx = self
            .ctx_rx
            .recv()
            .await
            .map_err(|_| BackendError::Load("model loader went away".into()))??;
        log::info!("Whisper model ready");
        Ok(WhisperRecognizer {
            ctx: Arc::new(ctx),
            rt: self.rt,
            events: self.events,
            language: self.language,
            settings: self.settings,
            session: None,
        })
    }
}

fn load_context(path: &Path) -> Result<WhisperContext, BackendError> {
    log::info!("Loading whisper model from {}", path.display());
    let path_str = path
        .to_str()
        .ok_or_else(|| BackendError::Load("invalid model path".into()))?;
    WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
        .map_err(|e| BackendError::Load(e.to_string()))
}

impl Recognizer for WhisperRecognizer {
    fn start(&mut self, session: SessionId) -> Result<(), RecognitionError> {
        self.stop();

        let buffer = CaptureBuffer::new();
        let (stream, sample_rate) = recorder::start_capture(buffer.clone()).map_err(|e| {
            log::error!("Failed to start recording: {e}");
            RecognitionError::AudioCapture
        })?;
        if sample_rate != TARGET_RATE {
            log::warn!("Capturing at {sample_rate}Hz, whisper expects {TARGET_RATE}Hz");
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let _ = self
            .events
            .try_send(RecognizerEvent::new(session, RecognizerEventKind::Started));

        self.rt.spawn(run_session(
            session,
            self.ctx.clone(),
            buffer.clone(),
            cancelled.clone(),
            self.events.clone(),
            self.settings.clone(),
            self.language.clone(),
        ));

        self.session = Some(Session {
            stream,
            buffer,
            cancelled,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancelled.store(true, Ordering::Relaxed);
            session.buffer.close();
            drop(session.stream);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Utterance,
    NoSpeech,
}

/// Decide whether capture is over, given when it began and when a frame
/// last exceeded the speech threshold.
fn endpoint(
    settings: &SpeechConfig,
    started: Instant,
    last_voice: Option<Instant>,
    now: Instant,
) -> Option<Endpoint> {
    let elapsed = now.duration_since(started);
    match last_voice {
        None if elapsed >= Duration::from_secs(settings.no_speech_secs) => Some(Endpoint::NoSpeech),
        Some(at) if now.duration_since(at) >= Duration::from_millis(settings.silence_ms) => {
            Some(Endpoint::Utterance)
        }
        Some(_) if elapsed >= Duration::from_secs(settings.max_utterance_secs) => {
            Some(Endpoint::Utterance)
        }
        _ => None,
    }
}

async fn run_session(
    session: SessionId,
    ctx: Arc<WhisperContext>,
    buffer: CaptureBuffer,
    cancelled: Arc<AtomicBool>,
    events: async_channel::Sender<RecognizerEvent>,
    settings: SpeechConfig,
    language: String,
) {
    let started = Instant::now();
    let mut last_voice = None;
    let mut ticker = tokio::time::interval(TICK);
    let reached = loop {
        ticker.tick().await;
        if cancelled.load(Ordering::Relaxed) {
            return;
        }
        let now = Instant::now();
        if buffer.recent_level() >= settings.level_threshold {
            last_voice = Some(now);
        }
        if let Some(reached) = endpoint(&settings, started, last_voice, now) {
            break reached;
        }
    };
    buffer.close();

    let kind = match reached {
        Endpoint::NoSpeech => RecognizerEventKind::Error(RecognitionError::NoSpeech.code().into()),
        Endpoint::Utterance => {
            let samples = buffer.snapshot();
            log::info!(
                "Captured {} samples ({:.1}s)",
                samples.len(),
                samples.len() as f32 / TARGET_RATE as f32
            );
            let result =
                tokio::task::spawn_blocking(move || transcribe(&ctx, &samples, &language)).await;
            match result {
                Ok(Ok(text)) if text.is_empty() => {
                    RecognizerEventKind::Error(RecognitionError::NoSpeech.code().into())
                }
                Ok(Ok(text)) => RecognizerEventKind::Result(text),
                Ok(Err(e)) => {
                    log::error!("Transcription failed: {e}");
                    RecognizerEventKind::Error("transcription-failed".into())
                }
                Err(e) => {
                    log::error!("Transcription task panicked: {e}");
                    RecognizerEventKind::Error(RecognitionError::Aborted.code().into())
                }
            }
        }
    };

    if cancelled.load(Ordering::Relaxed) {
        return;
    }
    let _ = events.send(RecognizerEvent::new(session, kind)).await;
    let _ = events
        .send(RecognizerEvent::new(session, RecognizerEventKind::Ended))
        .await;
}

/// Transcribe 16kHz mono samples. CPU-heavy; call from `spawn_blocking`.
fn transcribe(ctx: &WhisperContext, samples: &[f32], language: &str) -> Result<String, String> {
    let mut state = ctx.create_state().map_err(|e| format!("State error: {e}"))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some(language));
    params.set_single_segment(true);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4);
    params.set_n_threads(cpus);

    state
        .full(params, samples)
        .map_err(|e| format!("Transcription failed: {e}"))?;

    let mut text = String::new();
    for segment in state.as_iter() {
        text.push_str(&format!("{segment}"));
        text.push(' ');
    }
    Ok(text.trim().to_string())
}
