//! Terminal stand-ins for the host's menu and settings dialog.
//!
//! # Responsibility
//! - Give plugins a menu they can append labelled actions to.
//! - Give plugins settings panels whose fields the CLI can edit before saving.

use plugin_host_core::{ConfigMap, HostUi};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// UI surface of the terminal host.
pub struct TerminalUi;

impl HostUi for TerminalUi {
    type Menu = TerminalMenu;
    type Parent = SettingsPage;
    type Widget = SettingsPanel;
}

type MenuAction = Box<dyn Fn()>;

/// Context menu built fresh for every invocation.
#[derive(Default)]
pub struct TerminalMenu {
    entries: Vec<(String, MenuAction)>,
}

impl TerminalMenu {
    pub fn add_action(&mut self, label: impl Into<String>, action: impl Fn() + 'static) {
        self.entries.push((label.into(), Box::new(action)));
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(label, _)| label.as_str()).collect()
    }

    /// Runs the first entry labelled `label`; `false` when none matches.
    pub fn trigger(&self, label: &str) -> bool {
        match self.entries.iter().find(|(entry, _)| entry == label) {
            Some((_, action)) => {
                action();
                true
            }
            None => false,
        }
    }
}

impl Debug for TerminalMenu {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}

/// Parent handle for settings panels: the dialog they are shown in.
#[derive(Debug, Clone)]
pub struct SettingsPage {
    pub title: String,
}

/// Editable key/value panel shared between the dialog and its plugin.
#[derive(Debug, Clone)]
pub struct SettingsPanel {
    pub title: String,
    fields: Rc<RefCell<ConfigMap>>,
}

impl SettingsPanel {
    pub fn new(title: impl Into<String>, fields: &ConfigMap) -> Self {
        Self {
            title: title.into(),
            fields: Rc::new(RefCell::new(fields.clone())),
        }
    }

    pub fn set(&self, key: &str, value: Value) {
        self.fields.borrow_mut().insert(key.to_string(), value);
    }

    pub fn values(&self) -> ConfigMap {
        self.fields.borrow().clone()
    }

    /// One `key = value` line per field.
    pub fn render(&self) -> Vec<String> {
        self.fields
            .borrow()
            .iter()
            .map(|(key, value)| format!("{key} = {value}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{SettingsPanel, TerminalMenu};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn trigger_runs_matching_action_only() {
        let hits = Rc::new(Cell::new(0));
        let mut menu = TerminalMenu::default();
        let counter = hits.clone();
        menu.add_action("Say something", move || counter.set(counter.get() + 1));

        assert!(menu.trigger("Say something"));
        assert!(!menu.trigger("Quit"));
        assert_eq!(hits.get(), 1);
        assert_eq!(menu.labels(), vec!["Say something"]);
    }

    #[test]
    fn panel_clones_share_fields() {
        let panel = SettingsPanel::new("Bubble", &serde_json::Map::new());
        let dialog_side = panel.clone();
        dialog_side.set("close_after", json!(9));

        assert_eq!(panel.values().get("close_after"), Some(&json!(9)));
        assert_eq!(panel.render(), vec!["close_after = 9"]);
    }
}
