//! Speech bubble next to the pet.
//!
//! Publishes `speech_bubble.say` plus the bare `say` alias, and adds a
//! "Say something" menu entry that uses it.

use super::{Say, SAY_KEY};
use crate::terminal::{SettingsPage, SettingsPanel, TerminalMenu, TerminalUi};
use plugin_host_core::{ConfigMap, Context, Plugin, PluginError, PluginResult};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

pub const PLUGIN_ID: &str = "speech_bubble";
pub const MENU_LABEL: &str = "Say something";

const MENU_LINE: &str = "Coo coo, quack quack!";
const MIN_WIDTH: usize = 8;

type Output = Rc<dyn Fn(&str)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BubbleStyle {
    close_after: u32,
    width: usize,
}

impl Default for BubbleStyle {
    fn default() -> Self {
        Self {
            close_after: 5,
            width: 32,
        }
    }
}

impl BubbleStyle {
    fn from_config(cfg: &ConfigMap) -> PluginResult<Self> {
        let defaults = Self::default();
        let close_after = match cfg.get("close_after") {
            None => defaults.close_after,
            Some(value) => value
                .as_u64()
                .and_then(|secs| u32::try_from(secs).ok())
                .ok_or_else(|| {
                    PluginError::InvalidConfig(format!("close_after must be seconds, got {value}"))
                })?,
        };
        let width = match cfg.get("width") {
            None => defaults.width,
            Some(value) => value
                .as_u64()
                .and_then(|width| usize::try_from(width).ok())
                .filter(|width| *width >= MIN_WIDTH)
                .ok_or_else(|| {
                    PluginError::InvalidConfig(format!(
                        "width must be at least {MIN_WIDTH}, got {value}"
                    ))
                })?,
        };
        Ok(Self { close_after, width })
    }
}

pub struct SpeechBubble {
    style: Rc<RefCell<BubbleStyle>>,
    output: Output,
    cfg: ConfigMap,
    ctx: Option<Context>,
    panel: Option<SettingsPanel>,
}

impl SpeechBubble {
    /// Bubble printing to stdout.
    pub fn new() -> Self {
        Self::with_output(|line| println!("{line}"))
    }

    pub fn with_output(output: impl Fn(&str) + 'static) -> Self {
        Self {
            style: Rc::new(RefCell::new(BubbleStyle::default())),
            output: Rc::new(output),
            cfg: ConfigMap::new(),
            ctx: None,
            panel: None,
        }
    }
}

impl Default for SpeechBubble {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin<TerminalUi> for SpeechBubble {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Speech Bubble"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn activate(&mut self, ctx: &Context) -> PluginResult<()> {
        let style = Rc::clone(&self.style);
        let output = Rc::clone(&self.output);
        let say = Say::new(move |text, close_after| {
            let style = *style.borrow();
            for line in render_bubble(text, style.width) {
                output(&line);
            }
            output(&format!(
                "  (closes after {}s)",
                close_after.unwrap_or(style.close_after)
            ));
        });
        ctx.provide_namespaced(PLUGIN_ID, SAY_KEY, say, true);
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
        menu.add_action(MENU_LABEL, move || {
            if let Some(say) = ctx.service::<Say>(SAY_KEY) {
                say.say(MENU_LINE, Some(5));
            }
        });
        Ok(())
    }

    fn default_config(&self) -> Value {
        let style = BubbleStyle::default();
        json!({
            "enabled": true,
            "close_after": style.close_after,
            "width": style.width,
        })
    }

    fn load_config(&mut self, cfg: &ConfigMap) -> PluginResult<()> {
        self.cfg = cfg.clone();
        *self.style.borrow_mut() = BubbleStyle::from_config(cfg)?;
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

/// Wraps `text` at word boundaries and draws a box around it.
///
/// Words longer than `width` overflow their line instead of being split.
pub fn render_bubble(text: &str, width: usize) -> Vec<String> {
    let mut rows: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let grown = current.chars().count() + 1 + word.chars().count();
        if !current.is_empty() && grown > width {
            rows.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || rows.is_empty() {
        rows.push(current);
    }

    let inner = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
    let border = format!("+{}+", "-".repeat(inner + 2));
    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(border.clone());
    lines.extend(rows.iter().map(|row| format!("| {row:<inner$} |")));
    lines.push(border);
    lines.push("  \\".to_string());
    lines
}
