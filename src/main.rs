mod ui;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::glib;
use gtk4::prelude::*;

use voice_todo::speech::{Capability, RecognizerEvent};
use voice_todo::storage::{FileStore, KvStore, MemoryStore};
use voice_todo::{App, AppEvent, Config, Effect, Notice};

fn main() {
    env_logger::init();
    log::info!("Voice To-Do starting");

    let application = libadwaita::Application::builder()
        .application_id("com.github.voice-todo")
        .build();

    application.connect_activate(on_activate);
    application.run();
}

fn on_activate(application: &libadwaita::Application) {
    // UI and recognizer events both end up on the main loop
    let (event_tx, event_rx) = async_channel::unbounded::<AppEvent>();
    let (speech_tx, speech_rx) = async_channel::unbounded::<RecognizerEvent>();

    let config = Config::load();
    let mut startup = Vec::new();
    let kv = open_storage(&config, &mut startup);
    let capability = initial_capability();

    let (app, effects) = App::start(config.clone(), kv, capability);
    startup.extend(effects);
    let state = Rc::new(RefCell::new(app));

    let widgets = Rc::new(ui::build_window(application, event_tx.clone()));
    ui::render(&widgets, state.borrow().store().state(), &event_tx);

    // Re-render after every store mutation
    {
        let widgets = widgets.clone();
        let sender = event_tx.clone();
        state
            .borrow_mut()
            .store_mut()
            .subscribe(move |change, app_state| {
                log::debug!("Rendering after {change:?}");
                ui::render(&widgets, app_state, &sender);
            });
    }

    // Stop listening when the window is hidden or minimized
    {
        let sender = event_tx.clone();
        widgets.window.connect_suspended_notify(move |window| {
            if window.is_suspended() {
                let _ = sender.try_send(AppEvent::PageHidden);
            }
        });
    }

    // Final save on close; never blocks closing
    {
        let state = state.clone();
        widgets.window.connect_close_request(move |_| {
            match state.try_borrow_mut() {
                Ok(mut app) => {
                    app.handle(AppEvent::Teardown);
                }
                Err(_) => log::warn!("Skipping final save: application busy"),
            }
            glib::Propagation::Proceed
        });
    }

    // Forward recognizer events to the application event channel
    {
        let sender = event_tx.clone();
        glib::spawn_future_local(async move {
            while let Ok(event) = speech_rx.recv().await {
                let _ = sender.send(AppEvent::Recognizer(event)).await;
            }
        });
    }

    // Attach application event handler
    {
        let state = state.clone();
        let widgets = widgets.clone();
        let sender = event_tx.clone();
        glib::spawn_future_local(async move {
            while let Ok(event) = event_rx.recv().await {
                let effects = state.borrow_mut().handle(event);
                ui::apply_effects(&widgets, effects, &sender);
            }
        });
    }

    widgets.window.present();
    ui::apply_effects(&widgets, startup, &event_tx);
    load_recognizer(&config, speech_tx, &state, &widgets, &event_tx);
}

fn open_storage(config: &Config, startup: &mut Vec<Effect>) -> Box<dyn KvStore> {
    match FileStore::open(config.storage_dir()) {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::error!("Local storage unavailable: {e}");
            startup.push(Effect::Notice(Notice::Error(format!(
                "Local storage is unavailable ({e}). Changes will not be kept after closing."
            ))));
            Box::new(MemoryStore::new())
        }
    }
}

#[cfg(feature = "whisper")]
fn initial_capability() -> Capability {
    Capability::Loading
}

#[cfg(not(feature = "whisper"))]
fn initial_capability() -> Capability {
    log::info!("Built without the whisper recognizer");
    Capability::Unavailable
}

/// Load the whisper model off the main thread, then hand it to the app.
#[cfg(feature = "whisper")]
fn load_recognizer(
    config: &Config,
    events: async_channel::Sender<RecognizerEvent>,
    state: &Rc<RefCell<App>>,
    widgets: &Rc<ui::MainWidgets>,
    sender: &async_channel::Sender<AppEvent>,
) {
    use voice_todo::speech::whisper::{BackendError, WhisperRecognizer};

    let install = {
        let state = state.clone();
        let widgets = widgets.clone();
        let sender = sender.clone();
        move |result: Result<WhisperRecognizer, BackendError>| {
            let mut effects = Vec::new();
            let capability = match result {
                Ok(recognizer) => Capability::Available(Box::new(recognizer)),
                Err(BackendError::ModelMissing(path)) => {
                    log::warn!("No whisper model at {}", path.display());
                    Capability::Unavailable
                }
                Err(e) => {
                    log::error!("Error initializing speech recognition: {e}");
                    effects.push(Effect::Notice(Notice::Error(format!(
                        "Failed to initialize speech recognition: {e}"
                    ))));
                    Capability::Unavailable
                }
            };
            effects.extend(state.borrow_mut().install_recognizer(capability));
            ui::apply_effects(&widgets, effects, &sender);
        }
    };

    match WhisperRecognizer::load_in_background(config, events) {
        Ok(pending) => {
            glib::spawn_future_local(async move {
                install(pending.ready().await);
            });
        }
        Err(e) => install(Err(e)),
    }
}

#[cfg(not(feature = "whisper"))]
fn load_recognizer(
    _config: &Config,
    _events: async_channel::Sender<RecognizerEvent>,
    _state: &Rc<RefCell<App>>,
    _widgets: &Rc<ui::MainWidgets>,
    _sender: &async_channel::Sender<AppEvent>,
) {
}
