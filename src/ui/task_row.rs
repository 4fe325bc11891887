use gtk4::prelude::*;

use voice_todo::render::TaskView;
use voice_todo::AppEvent;

/// Build a list row for a single task: check button, text, delete button.
pub fn build_task_row(
    view: &TaskView,
    sender: &async_channel::Sender<AppEvent>,
) -> gtk4::ListBoxRow {
    let row_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 12);
    row_box.set_margin_start(12);
    row_box.set_margin_end(6);
    row_box.set_margin_top(6);
    row_box.set_margin_bottom(6);

    let check = gtk4::CheckButton::new();
    check.set_active(view.completed);
    check.set_tooltip_text(Some(if view.completed {
        "Mark task as incomplete"
    } else {
        "Mark task as complete"
    }));
    row_box.append(&check);

    // display_text is already escaped
    let label = gtk4::Label::new(None);
    label.set_markup(&markup(view));
    label.set_wrap(true);
    label.set_xalign(0.0);
    label.set_hexpand(true);
    if view.completed {
        label.add_css_class("dim-label");
    }
    row_box.append(&label);

    let delete_btn = gtk4::Button::from_icon_name("user-trash-symbolic");
    delete_btn.set_valign(gtk4::Align::Center);
    delete_btn.set_tooltip_text(Some("Delete task"));
    delete_btn.add_css_class("flat");
    row_box.append(&delete_btn);

    {
        let sender = sender.clone();
        let id = view.id.clone();
        check.connect_toggled(move |_| {
            let _ = sender.try_send(AppEvent::ToggleTask(id.clone()));
        });
    }
    {
        let sender = sender.clone();
        let id = view.id.clone();
        delete_btn.connect_clicked(move |_| {
            let _ = sender.try_send(AppEvent::DeleteTask(id.clone()));
        });
    }

    let row = gtk4::ListBoxRow::new();
    row.set_activatable(false);
    row.set_child(Some(&row_box));
    row
}

fn markup(view: &TaskView) -> String {
    if view.completed {
        format!("<s>{}</s>", view.display_text)
    } else {
        view.display_text.clone()
    }
}
