//! Plugins linked into the terminal host, and the services they share.

pub mod idle_chatter;
pub mod speech_bubble;

use crate::terminal::TerminalUi;
use plugin_host_core::{Context, EntrypointError, EntrypointTable};

pub use idle_chatter::IdleChatter;
pub use speech_bubble::SpeechBubble;

/// Alias key of the speech service.
pub const SAY_KEY: &str = "say";

/// Shows `text` in a bubble, closing after the given seconds
/// (the bubble's configured default when `None`).
pub struct Say(Box<dyn Fn(&str, Option<u32>)>);

impl Say {
    pub fn new(speak: impl Fn(&str, Option<u32>) + 'static) -> Self {
        Self(Box::new(speak))
    }

    pub fn say(&self, text: &str, close_after: Option<u32>) {
        (self.0)(text, close_after)
    }
}

/// Advances a periodic behaviour by one step; `false` when nothing happened.
pub struct Tick(Box<dyn Fn(&Context) -> bool>);

impl Tick {
    pub fn new(step: impl Fn(&Context) -> bool + 'static) -> Self {
        Self(Box::new(step))
    }

    pub fn tick(&self, ctx: &Context) -> bool {
        (self.0)(ctx)
    }
}

/// Entrypoint table of every built-in plugin.
pub fn entrypoints() -> Result<EntrypointTable<TerminalUi>, EntrypointError> {
    let mut table = EntrypointTable::new();
    table.register_plugin(speech_bubble::PLUGIN_ID, SpeechBubble::new)?;
    table.register_plugin(idle_chatter::PLUGIN_ID, IdleChatter::new)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::entrypoints;

    #[test]
    fn builtin_table_lists_both_plugins() {
        let table = entrypoints().expect("builtin entrypoints register");
        assert_eq!(table.names(), vec!["idle_chatter", "speech_bubble"]);
    }
}
