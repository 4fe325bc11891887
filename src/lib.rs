//! Voice-controlled to-do list.
//!
//! The [`app::App`] composition root owns a [`store::Store`] (tasks and
//! theme, persisted through [`storage`]) and a [`speech::SpeechInput`]
//! session machine. A surface feeds it [`app::AppEvent`]s, renders
//! [`render::project`] from store observers and carries out the returned
//! [`app::Effect`]s.

pub mod app;
pub mod config;
pub mod export;
pub mod render;
pub mod speech;
pub mod stats;
pub mod storage;
pub mod store;
pub mod task;
pub mod theme;

pub use app::{App, AppEvent, Effect, Notice};
pub use config::Config;
pub use store::{AppState, Change, Outcome, Store};
pub use task::{Task, TaskId};
pub use theme::Theme;
