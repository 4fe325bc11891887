mod event_handler;
mod state;

pub use state::{App, AppEvent, Effect, Notice};
