//! Idle chatter: the pet mutters one of its lines now and then.
//!
//! The `say` capability is looked up on every tick, never cached at
//! activation, so load order relative to the speech bubble does not matter.

use super::{Say, Tick, SAY_KEY};
use crate::terminal::{SettingsPage, SettingsPanel, TerminalMenu, TerminalUi};
use plugin_host_core::{ConfigMap, Context, Plugin, PluginError, PluginResult};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub const PLUGIN_ID: &str = "idle_chatter";
pub const TICK_KEY: &str = "tick";
pub const MENU_LABEL: &str = "Chatter";

const DEFAULT_LINES: [&str; 3] = ["*yawn*", "Is it snack time yet?", "I could nap right here."];

#[derive(Debug, Clone, PartialEq, Eq)]
struct Script {
    lines: Vec<String>,
    close_after: u32,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            lines: DEFAULT_LINES.iter().map(|line| line.to_string()).collect(),
            close_after: 3,
        }
    }
}

pub struct IdleChatter {
    script: Rc<RefCell<Script>>,
    cursor: Rc<Cell<usize>>,
    cfg: ConfigMap,
    ctx: Option<Context>,
    panel: Option<SettingsPanel>,
}

impl IdleChatter {
    pub fn new() -> Self {
        Self {
            script: Rc::new(RefCell::new(Script::default())),
            cursor: Rc::new(Cell::new(0)),
            cfg: ConfigMap::new(),
            ctx: None,
            panel: None,
        }
    }

    fn step(script: &RefCell<Script>, cursor: &Cell<usize>, ctx: &Context) -> bool {
        let Some(say) = ctx.service::<Say>(SAY_KEY) else {
            return false;
        };
        let script = script.borrow();
        if script.lines.is_empty() {
            return false;
        }
        let index = cursor.get() % script.lines.len();
        cursor.set(index + 1);
        say.say(&script.lines[index], Some(script.close_after));
        true
    }
}

impl Default for IdleChatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin<TerminalUi> for IdleChatter {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Idle Chatter"
    }

    fn version(&self) -> &str {
        "0.3.0"
    }

    fn activate(&mut self, ctx: &Context) -> PluginResult<()> {
        let script = Rc::clone(&self.script);
        let cursor = Rc::clone(&self.cursor);
        let tick = Tick::new(move |ctx| Self::step(&script, &cursor, ctx));
        ctx.provide_namespaced(PLUGIN_ID, TICK_KEY, tick, false);
        self.ctx = Some(ctx.clone());
        Ok(())
    }

    fn deactivate(&mut self) -> PluginResult<()> {
        self.ctx = None;
        Ok(())
    }

    fn extend_context_menu(&self, menu: &mut TerminalMenu) -> PluginResult<()> {
        let Some(ctx) = self.ctx.clone() else {
            return Ok(());
        };
        let script = Rc::clone(&self.script);
        let cursor = Rc::clone(&self.cursor);
        menu.add_action(MENU_LABEL, move || {
            Self::step(&script, &cursor, &ctx);
        });
        Ok(())
    }

    fn default_config(&self) -> Value {
        let script = Script::default();
        json!({
            "enabled": true,
            "lines": script.lines,
            "close_after": script.close_after,
        })
    }

    fn load_config(&mut self, cfg: &ConfigMap) -> PluginResult<()> {
        self.cfg = cfg.clone();
        let mut script = Script::default();
        if let Some(value) = cfg.get("lines") {
            let lines = value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .ok_or_else(|| PluginError::InvalidConfig("lines must be a list".to_string()))?;
            script.lines = lines;
        }
        if let Some(value) = cfg.get("close_after") {
            script.close_after = value
                .as_u64()
                .and_then(|secs| u32::try_from(secs).ok())
                .ok_or_else(|| {
                    PluginError::InvalidConfig(format!("close_after must be seconds, got {value}"))
                })?;
        }
        *self.script.borrow_mut() = script;
        Ok(())
    }

    fn create_settings_widget(
        &mut self,
        parent: &mut SettingsPage,
    ) -> PluginResult<Option<SettingsPanel>> {
        let panel = SettingsPanel::new(format!("{} / {}", parent.title, self.name()), &self.cfg);
        self.panel = Some(panel.clone());
        Ok(Some(panel))
    }

    fn collect_config_from_widget(&mut self) -> PluginResult<Option<Value>> {
        Ok(self
            .panel
            .as_ref()
            .map(|panel| Value::Object(panel.values())))
    }
}
