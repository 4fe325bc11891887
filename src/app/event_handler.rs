use chrono::Utc;

use super::state::{App, AppEvent, Effect, SAVE_FAILED};
use crate::export::ExportDocument;
use crate::speech::{SpeechError, SpeechSignal};
use crate::store::Outcome;

impl App {
    /// Handle one event. This is the core state machine.
    pub fn handle(&mut self, event: AppEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            AppEvent::Submit(text) => {
                let outcome = self.store.add(&text);
                saved(outcome, &mut effects);
            }
            AppEvent::ToggleTask(id) => {
                let outcome = self.store.toggle(&id);
                saved(outcome, &mut effects);
            }
            AppEvent::DeleteTask(id) => {
                let outcome = self.store.delete(&id);
                saved(outcome, &mut effects);
            }
            AppEvent::ClearCompleted => {
                let count = self.store.completed_count();
                if count > 0 {
                    let plural = if count > 1 { "s" } else { "" };
                    effects.push(Effect::Confirm {
                        prompt: format!(
                            "Are you sure you want to delete {count} completed task{plural}?"
                        ),
                        accept: AppEvent::ClearCompletedConfirmed,
                    });
                }
            }
            AppEvent::ClearCompletedConfirmed => {
                let outcome = self.store.clear_completed();
                saved(outcome, &mut effects);
            }
            AppEvent::ToggleTheme => {
                let outcome = self.store.toggle_theme();
                saved(outcome, &mut effects);
            }
            AppEvent::ToggleListening => self.toggle_listening(&mut effects),
            AppEvent::StopListening | AppEvent::PageHidden => {
                if self.speech.stop() {
                    effects.push(Effect::Listening(false));
                }
            }
            AppEvent::Recognizer(event) => self.on_recognizer(event, &mut effects),
            AppEvent::Export => {
                let doc = ExportDocument::new(self.store.tasks(), Utc::now());
                match doc.write_to(&self.config.export_dir()) {
                    Ok(path) => {
                        effects.push(Effect::success(format!("Exported to {}", path.display())))
                    }
                    Err(e) => {
                        log::warn!("Export failed: {e}");
                        effects.push(Effect::warning(format!("Export failed: {e}")));
                    }
                }
            }
            AppEvent::Reset => effects.push(Effect::Confirm {
                prompt: "Are you sure you want to clear all tasks and reset the app? \
                         This cannot be undone."
                    .into(),
                accept: AppEvent::ResetConfirmed,
            }),
            AppEvent::ResetConfirmed => match self.store.reset() {
                Outcome::Unsaved(_) => effects.push(Effect::warning(SAVE_FAILED)),
                _ => effects.push(Effect::success("All data has been cleared")),
            },
            AppEvent::Teardown => {
                self.speech.stop();
                self.store.flush();
            }
        }
        effects
    }

    fn toggle_listening(&mut self, effects: &mut Vec<Effect>) {
        match self.speech.toggle() {
            Ok(listening) => effects.push(Effect::Listening(listening)),
            // reported once at startup
            Err(SpeechError::Unsupported) => {
                log::debug!("Ignoring listen toggle without a recognizer");
            }
            Err(SpeechError::Recognition(e)) => {
                effects.push(Effect::error(format!(
                    "Failed to start voice recognition. {e}"
                )));
            }
        }
    }

    fn on_recognizer(&mut self, event: crate::speech::RecognizerEvent, effects: &mut Vec<Effect>) {
        let Some(signal) = self.speech.handle(event) else {
            return;
        };
        match signal {
            SpeechSignal::Listening => effects.push(Effect::Listening(true)),
            SpeechSignal::Transcript(text) => {
                effects.push(Effect::Listening(false));
                let outcome = self.store.add(&text);
                if outcome.changed() {
                    effects.push(Effect::success(format!("Added: \"{text}\"")));
                }
                saved(outcome, effects);
            }
            SpeechSignal::Failed(e) => {
                effects.push(Effect::Listening(false));
                effects.push(Effect::error(e.to_string()));
            }
            SpeechSignal::Idle => effects.push(Effect::Listening(false)),
        }
    }
}

fn saved(outcome: Outcome, effects: &mut Vec<Effect>) {
    if outcome.into_warning().is_some() {
        effects.push(Effect::warning(SAVE_FAILED));
    }
}
