mod task_row;
mod window;

use gtk4::prelude::*;
use libadwaita::prelude::*;

use voice_todo::render::project;
use voice_todo::speech::VoiceStatus;
use voice_todo::{AppEvent, AppState, Effect, Notice, Theme};

pub use window::{build_window, MainWidgets};

/// Redraw the task list, counters and theme from `state`.
pub fn render(widgets: &MainWidgets, state: &AppState, sender: &async_channel::Sender<AppEvent>) {
    let projection = project(state);

    widgets.task_list.remove_all();
    for view in &projection.tasks {
        widgets
            .task_list
            .append(&task_row::build_task_row(view, sender));
    }
    widgets
        .task_stack
        .set_visible_child_name(if projection.is_empty() { "empty" } else { "tasks" });

    widgets.total_label.set_text(&projection.stats.total.to_string());
    widgets
        .completed_label
        .set_text(&projection.stats.completed.to_string());
    widgets
        .remaining_label
        .set_text(&projection.stats.remaining.to_string());
    widgets.clear_button.set_sensitive(projection.has_completed());

    apply_theme(widgets, state.theme);
}

pub fn apply_theme(widgets: &MainWidgets, theme: Theme) {
    let (scheme, icon) = match theme {
        Theme::Light => (libadwaita::ColorScheme::ForceLight, "weather-clear-night-symbolic"),
        Theme::Dark => (libadwaita::ColorScheme::ForceDark, "weather-clear-symbolic"),
    };
    libadwaita::StyleManager::default().set_color_scheme(scheme);
    widgets.theme_button.set_icon_name(icon);
}

pub fn set_voice_status(widgets: &MainWidgets, status: VoiceStatus) {
    let button = &widgets.voice_button;
    match status {
        VoiceStatus::Ready => {
            button.set_sensitive(true);
            button.set_label("Start Listening");
            button.set_tooltip_text(Some("Toggle voice input (Space)"));
        }
        VoiceStatus::Loading => {
            button.set_sensitive(false);
            button.set_label("Loading model...");
            button.set_tooltip_text(Some("Preparing speech recognition"));
        }
        VoiceStatus::Unavailable => {
            button.set_sensitive(false);
            button.set_label("Start Listening");
            button.set_tooltip_text(Some("Speech recognition is not available"));
            widgets.entry.grab_focus();
        }
    }
}

pub fn set_listening(widgets: &MainWidgets, listening: bool) {
    widgets.listening.set(listening);
    let button = &widgets.voice_button;
    if listening {
        button.set_label("Listening...");
        button.remove_css_class("suggested-action");
        button.add_css_class("destructive-action");
    } else {
        button.set_label("Start Listening");
        button.remove_css_class("destructive-action");
        button.add_css_class("suggested-action");
    }
    widgets.listening_revealer.set_reveal_child(listening);
    widgets.listening_spinner.set_spinning(listening);
}

/// Carry out what the application asked for after an event.
pub fn apply_effects(
    widgets: &MainWidgets,
    effects: Vec<Effect>,
    sender: &async_channel::Sender<AppEvent>,
) {
    for effect in effects {
        match effect {
            Effect::Notice(Notice::Success(message)) => show_toast(widgets, &message, 3),
            Effect::Notice(Notice::Warning(message)) => show_toast(widgets, &message, 5),
            Effect::Notice(Notice::Error(message)) => show_error(widgets, &message),
            Effect::Confirm { prompt, accept } => confirm(widgets, &prompt, accept, sender.clone()),
            Effect::Listening(listening) => set_listening(widgets, listening),
            Effect::Voice(status) => set_voice_status(widgets, status),
        }
    }
}

fn show_toast(widgets: &MainWidgets, message: &str, timeout: u32) {
    let toast = libadwaita::Toast::new(message);
    toast.set_timeout(timeout);
    widgets.toast_overlay.add_toast(toast);
}

fn show_error(widgets: &MainWidgets, message: &str) {
    let dialog = libadwaita::AlertDialog::new(Some("Error"), Some(message));
    dialog.add_response("close", "OK");
    dialog.set_default_response(Some("close"));
    dialog.present(Some(&widgets.window));
}

/// Ask before a destructive action; dispatch `accept` only on "confirm".
fn confirm(
    widgets: &MainWidgets,
    prompt: &str,
    accept: AppEvent,
    sender: async_channel::Sender<AppEvent>,
) {
    let dialog = libadwaita::AlertDialog::new(Some("Are you sure?"), Some(prompt));
    dialog.add_responses(&[("cancel", "Cancel"), ("confirm", "Delete")]);
    dialog.set_response_appearance("confirm", libadwaita::ResponseAppearance::Destructive);
    dialog.set_default_response(Some("cancel"));
    dialog.set_close_response("cancel");
    dialog.connect_response(None, move |_, response| {
        if response == "confirm" {
            let _ = sender.try_send(accept.clone());
        }
    });
    dialog.present(Some(&widgets.window));
}
