use std::cell::Cell;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{gdk, gio, glib};
use libadwaita::prelude::*;

use voice_todo::AppEvent;

/// Handles returned from building the main window.
pub struct MainWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub toast_overlay: libadwaita::ToastOverlay,
    pub theme_button: gtk4::Button,
    pub voice_button: gtk4::Button,
    pub listening_revealer: gtk4::Revealer,
    pub listening_spinner: gtk4::Spinner,
    pub entry: gtk4::Entry,
    pub task_stack: gtk4::Stack,
    pub task_list: gtk4::ListBox,
    pub clear_button: gtk4::Button,
    pub total_label: gtk4::Label,
    pub completed_label: gtk4::Label,
    pub remaining_label: gtk4::Label,
    /// Mirrors the last `Effect::Listening`; read by the key handler.
    pub listening: Rc<Cell<bool>>,
}

/// Build the main window. Every control reports through `sender`.
pub fn build_window(
    app: &libadwaita::Application,
    sender: async_channel::Sender<AppEvent>,
) -> MainWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Voice To-Do")
        .default_width(480)
        .default_height(640)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();

    let menu_button = gtk4::MenuButton::new();
    menu_button.set_icon_name("open-menu-symbolic");

    let menu = gio::Menu::new();
    menu.append(Some("Export Tasks"), Some("app.export"));
    menu.append(Some("Reset App"), Some("app.reset"));
    menu.append(Some("About Voice To-Do"), Some("app.about"));
    menu.append(Some("Quit"), Some("app.quit"));
    menu_button.set_menu_model(Some(&menu));
    header.pack_end(&menu_button);

    let theme_button = gtk4::Button::from_icon_name("weather-clear-night-symbolic");
    theme_button.set_tooltip_text(Some("Toggle dark mode (Ctrl+D)"));
    header.pack_end(&theme_button);

    toolbar_view.add_top_bar(&header);
    install_actions(app, &window, &sender);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Voice input ---
    let voice_button = gtk4::Button::builder()
        .label("Start Listening")
        .halign(gtk4::Align::Center)
        .tooltip_text("Toggle voice input (Space)")
        .build();
    voice_button.add_css_class("pill");
    voice_button.add_css_class("suggested-action");
    content.append(&voice_button);

    let listening_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    listening_box.set_halign(gtk4::Align::Center);
    let listening_spinner = gtk4::Spinner::new();
    listening_box.append(&listening_spinner);
    let listening_label = gtk4::Label::new(Some("Listening\u{2026} speak your task"));
    listening_label.add_css_class("dim-label");
    listening_box.append(&listening_label);
    let listening_revealer = gtk4::Revealer::builder()
        .transition_type(gtk4::RevealerTransitionType::SlideDown)
        .child(&listening_box)
        .build();
    content.append(&listening_revealer);

    // --- Typed input ---
    let input_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 6);
    let entry = gtk4::Entry::builder()
        .placeholder_text("Or type a task\u{2026}")
        .hexpand(true)
        .build();
    let add_button = gtk4::Button::from_icon_name("list-add-symbolic");
    add_button.set_tooltip_text(Some("Add task"));
    input_box.append(&entry);
    input_box.append(&add_button);
    content.append(&input_box);

    // --- Task list ---
    let task_list = gtk4::ListBox::new();
    task_list.set_selection_mode(gtk4::SelectionMode::None);
    task_list.add_css_class("boxed-list");

    let empty_page = libadwaita::StatusPage::builder()
        .icon_name("checkbox-checked-symbolic")
        .title("No tasks yet")
        .description("Press the microphone button or type to add your first task")
        .build();

    let task_stack = gtk4::Stack::new();
    task_stack.set_vexpand(true);
    task_stack.add_named(&task_list, Some("tasks"));
    task_stack.add_named(&empty_page, Some("empty"));
    content.append(&task_stack);

    // --- Statistics ---
    let stats_group = libadwaita::PreferencesGroup::new();
    stats_group.set_title("Statistics");
    let total_label = stat_row(&stats_group, "Total Tasks");
    let completed_label = stat_row(&stats_group, "Completed");
    let remaining_label = stat_row(&stats_group, "Remaining");
    content.append(&stats_group);

    let clear_button = gtk4::Button::builder()
        .label("Clear Completed")
        .halign(gtk4::Align::End)
        .sensitive(false)
        .build();
    clear_button.add_css_class("destructive-action");
    content.append(&clear_button);

    // Assemble
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&content)
        .build();
    toolbar_view.set_content(Some(&scrolled));
    let toast_overlay = libadwaita::ToastOverlay::new();
    toast_overlay.set_child(Some(&toolbar_view));
    window.set_content(Some(&toast_overlay));

    // Wire up controls
    send_on_click(&voice_button, &sender, AppEvent::ToggleListening);
    send_on_click(&theme_button, &sender, AppEvent::ToggleTheme);
    send_on_click(&clear_button, &sender, AppEvent::ClearCompleted);
    {
        let sender = sender.clone();
        entry.connect_activate(move |entry| submit(entry, &sender));
    }
    {
        let sender = sender.clone();
        let entry = entry.clone();
        add_button.connect_clicked(move |_| submit(&entry, &sender));
    }
    let listening = Rc::new(Cell::new(false));
    window.add_controller(shortcuts(sender, listening.clone()));

    MainWidgets {
        window,
        toast_overlay,
        theme_button,
        voice_button,
        listening_revealer,
        listening_spinner,
        entry,
        task_stack,
        task_list,
        clear_button,
        total_label,
        completed_label,
        remaining_label,
        listening,
    }
}

fn stat_row(group: &libadwaita::PreferencesGroup, title: &str) -> gtk4::Label {
    let row = libadwaita::ActionRow::builder().title(title).build();
    let label = gtk4::Label::new(Some("0"));
    label.add_css_class("dim-label");
    row.add_suffix(&label);
    group.add(&row);
    label
}

fn send_on_click(button: &gtk4::Button, sender: &async_channel::Sender<AppEvent>, event: AppEvent) {
    let sender = sender.clone();
    button.connect_clicked(move |_| {
        let _ = sender.try_send(event.clone());
    });
}

fn submit(entry: &gtk4::Entry, sender: &async_channel::Sender<AppEvent>) {
    let text = entry.text().to_string();
    if !text.trim().is_empty() {
        let _ = sender.try_send(AppEvent::Submit(text));
        entry.set_text("");
    }
    entry.grab_focus();
}

/// Space toggles listening (unless a focused widget consumed it), Escape
/// stops while listening, Ctrl+D toggles the theme.
fn shortcuts(
    sender: async_channel::Sender<AppEvent>,
    listening: Rc<Cell<bool>>,
) -> gtk4::EventControllerKey {
    let keys = gtk4::EventControllerKey::new();
    keys.connect_key_pressed(move |_, key, _, modifiers| {
        match shortcut(key, modifiers, listening.get()) {
            Some(event) => {
                let _ = sender.try_send(event);
                glib::Propagation::Stop
            }
            None => glib::Propagation::Proceed,
        }
    });
    keys
}

fn shortcut(key: gdk::Key, modifiers: gdk::ModifierType, listening: bool) -> Option<AppEvent> {
    let ctrl = modifiers.contains(gdk::ModifierType::CONTROL_MASK);
    match key {
        gdk::Key::space if modifiers.is_empty() => Some(AppEvent::ToggleListening),
        gdk::Key::Escape if listening => Some(AppEvent::StopListening),
        gdk::Key::d | gdk::Key::D if ctrl => Some(AppEvent::ToggleTheme),
        _ => None,
    }
}

fn install_actions(
    app: &libadwaita::Application,
    window: &libadwaita::ApplicationWindow,
    sender: &async_channel::Sender<AppEvent>,
) {
    for (name, event) in [("export", AppEvent::Export), ("reset", AppEvent::Reset)] {
        let action = gio::SimpleAction::new(name, None);
        let sender = sender.clone();
        action.connect_activate(move |_, _| {
            let _ = sender.try_send(event.clone());
        });
        app.add_action(&action);
    }

    let about = gio::SimpleAction::new("about", None);
    {
        let window = window.clone();
        about.connect_activate(move |_, _| show_about(&window));
    }
    app.add_action(&about);

    let quit = gio::SimpleAction::new("quit", None);
    let window = window.clone();
    quit.connect_activate(move |_, _| window.close());
    app.add_action(&quit);
}

fn show_about(window: &libadwaita::ApplicationWindow) {
    let about = libadwaita::AboutDialog::builder()
        .application_name("Voice To-Do")
        .application_icon("checkbox-checked-symbolic")
        .version(env!("CARGO_PKG_VERSION"))
        .comments(env!("CARGO_PKG_DESCRIPTION"))
        .license_type(gtk4::License::MitX11)
        .build();
    about.present(Some(window));
}
