//! Pure projection of [`AppState`] into what the task list shows.
//!
//! Task text is user input and the surface renders it as markup, so every
//! `display_text` is escaped here and nowhere else.

use crate::stats::Stats;
use crate::store::AppState;
use crate::task::TaskId;

/// Render-ready row for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskView {
    pub id: TaskId,
    /// Markup-escaped task text.
    pub display_text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub tasks: Vec<TaskView>,
    pub stats: Stats,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn has_completed(&self) -> bool {
        self.stats.completed > 0
    }
}

pub fn project(state: &AppState) -> Projection {
    let tasks = state
        .tasks
        .iter()
        .map(|task| TaskView {
            id: task.id.clone(),
            display_text: escape_markup(&task.text),
            completed: task.completed,
        })
        .collect();
    Projection {
        tasks,
        stats: Stats::of(state),
    }
}

/// Escape the five characters significant to HTML and Pango markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
