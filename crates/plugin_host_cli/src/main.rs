//! Terminal host for the plugin runtime.
//!
//! # Responsibility
//! - Load host settings and start logging.
//! - Discover, load, exercise, save and unload plugins in one run.

mod builtin;
mod terminal;

use builtin::{Say, Tick, SAY_KEY};
use clap::{Parser, Subcommand};
use plugin_host_core::context::service_key;
use plugin_host_core::plugin::{HookFailure, LoadOutcome, LoadReport, SkipReason};
use plugin_host_core::{init_logging, Context, PluginManager, RuntimeOptions};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use terminal::{SettingsPage, TerminalMenu, TerminalUi};

#[derive(Parser, Debug)]
#[command(name = "plugin-host", version, about = "Load and exercise desktop-pet plugins")]
struct Cli {
    /// Host settings file, created with defaults when missing
    #[arg(long, value_name = "FILE", default_value = "plugin_host.json")]
    settings: PathBuf,

    /// Override the plugins root directory
    #[arg(long, value_name = "DIR")]
    plugins: Option<PathBuf>,

    /// Override the log level (trace|debug|info|warn|error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Override the log directory (absolute path)
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List plugin packages under the plugins root
    Discover,
    /// Load all plugins, exercise their hooks, save configs and unload
    Run {
        /// Speak this text through the `say` service
        #[arg(long, value_name = "TEXT")]
        say: Option<String>,

        /// Invoke the context-menu entry with this label
        #[arg(long, value_name = "LABEL")]
        trigger: Option<String>,

        /// Run one idle-chatter tick
        #[arg(long)]
        chatter: bool,

        /// Edit a settings panel field before saving (`plugin_id.key=value`)
        #[arg(long = "set", value_name = "ID.KEY=VALUE", value_parser = parse_edit)]
        edits: Vec<SettingEdit>,
    },
}

#[derive(Debug, Clone)]
struct SettingEdit {
    plugin_id: String,
    key: String,
    value: Value,
}

fn parse_edit(raw: &str) -> Result<SettingEdit, String> {
    let (target, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID.KEY=VALUE, got `{raw}`"))?;
    let (plugin_id, key) = target
        .rsplit_once('.')
        .ok_or_else(|| format!("expected ID.KEY before `=`, got `{target}`"))?;
    if plugin_id.is_empty() || key.is_empty() {
        return Err(format!("empty plugin id or key in `{raw}`"));
    }
    // Bare words are taken as strings.
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok(SettingEdit {
        plugin_id: plugin_id.to_string(),
        key: key.to_string(),
        value,
    })
}

/// Host handle exposed to plugins through the context.
#[derive(Debug)]
pub struct HostInfo {
    pub name: &'static str,
    pub version: &'static str,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = resolve_options(&cli);
    start_logging(&options);

    let ctx = Context::builder()
        .host(HostInfo {
            name: "plugin-host",
            version: env!("CARGO_PKG_VERSION"),
        })
        .logger(|line| {
            eprintln!("[plugins] {line}");
            log::info!(target: "plugin_host::plugins", "{line}");
        })
        .build();

    let entrypoints = match builtin::entrypoints() {
        Ok(table) => table,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut manager: PluginManager<TerminalUi> =
        PluginManager::with_options(ctx, &options, entrypoints);

    match cli.command {
        Command::Discover => {
            discover(&manager);
            ExitCode::SUCCESS
        }
        Command::Run {
            say,
            trigger,
            chatter,
            edits,
        } => run(&mut manager, say.as_deref(), trigger.as_deref(), chatter, &edits),
    }
}

fn resolve_options(cli: &Cli) -> RuntimeOptions {
    let mut options = RuntimeOptions::load(&cli.settings);
    if let Some(root) = &cli.plugins {
        options.plugins_root = root.clone();
    }
    if let Some(level) = &cli.log_level {
        options.log_level = level.clone();
    }
    if let Some(dir) = &cli.log_dir {
        options.log_dir = Some(dir.clone());
    }
    options
}

fn start_logging(options: &RuntimeOptions) {
    let Some(dir) = &options.log_dir else {
        return;
    };
    if let Err(err) = init_logging(&options.log_level, &dir.to_string_lossy()) {
        eprintln!("warning: file logging disabled: {err}");
    }
}

fn discover(manager: &PluginManager<TerminalUi>) {
    let packages = manager.discover_packages();
    if packages.is_empty() {
        println!("no plugin packages under {}", manager.plugins_root().display());
        return;
    }
    for package in packages {
        let description = package.marker.description.as_deref().unwrap_or("");
        println!("{:<20} entrypoint={:<16} {description}", package.name, package.entrypoint());
    }
}

fn run(
    manager: &mut PluginManager<TerminalUi>,
    say: Option<&str>,
    trigger: Option<&str>,
    chatter: bool,
    edits: &[SettingEdit],
) -> ExitCode {
    if let Some(host) = manager.context().host::<HostInfo>() {
        println!("{} {}", host.name, host.version);
    }
    let report = manager.load_all();
    print_load_report(&report);
    println!("services: {}", manager.context().service_keys().join(", "));

    let mut ok = true;
    let mut menu = TerminalMenu::default();
    let hooks = manager.extend_context_menu(&mut menu);
    print_failures(&hooks.failures);
    println!("menu: {}", menu.labels().join(" | "));
    if let Some(label) = trigger {
        if !menu.trigger(label) {
            eprintln!("error: no menu entry labelled `{label}`");
            ok = false;
        }
    }

    if let Some(text) = say {
        match manager.context().service::<Say>(SAY_KEY) {
            Some(say) => say.say(text, None),
            None => {
                eprintln!("error: no `{SAY_KEY}` service registered");
                ok = false;
            }
        }
    }

    if chatter {
        let ctx = manager.context().clone();
        let key = service_key(builtin::idle_chatter::PLUGIN_ID, builtin::idle_chatter::TICK_KEY);
        match ctx.service::<Tick>(&key) {
            Some(tick) if tick.tick(&ctx) => {}
            Some(_) => println!("chatter: nothing to say"),
            None => println!("chatter: {key} is not registered"),
        }
    }

    let mut page = SettingsPage {
        title: "Settings".to_string(),
    };
    let panels = manager.build_settings_panels(&mut page);
    print_failures(&panels.failures);
    for edit in edits {
        match panels.panels.iter().find(|(id, _)| *id == edit.plugin_id) {
            Some((_, panel)) => panel.set(&edit.key, edit.value.clone()),
            None => {
                eprintln!("error: no settings panel for `{}`", edit.plugin_id);
                ok = false;
            }
        }
    }
    for (_, panel) in &panels.panels {
        println!("[{}]", panel.title);
        for line in panel.render() {
            println!("  {line}");
        }
    }

    let saved = manager.save_all_plugin_configs();
    for (plugin_id, path) in &saved.saved {
        println!("saved {plugin_id} -> {}", path.display());
    }
    print_failures(&saved.failures);

    let unload = manager.unload_all();
    println!(
        "unloaded: deactivated=[{}] released=[{}]",
        unload.deactivated.join(", "),
        unload.released.join(", ")
    );
    print_failures(&unload.failures);

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_load_report(report: &LoadReport) {
    for entry in &report.packages {
        let outcome = match &entry.outcome {
            LoadOutcome::Activated { plugin_id } => format!("activated {plugin_id}"),
            LoadOutcome::Disabled { plugin_id } => format!("disabled {plugin_id}"),
            LoadOutcome::Rejected { plugin_id } => format!("rejected duplicate id {plugin_id}"),
            LoadOutcome::Skipped(SkipReason::NotAPackage) => "skipped: not a package".to_string(),
            LoadOutcome::Skipped(SkipReason::MalformedMarker(message)) => {
                format!("skipped: {message}")
            }
            LoadOutcome::Skipped(SkipReason::MissingEntrypoint(name)) => {
                format!("skipped: no entrypoint `{name}`")
            }
            LoadOutcome::Failed { stage, message } => format!("failed at {stage}: {message}"),
        };
        println!("{:<20} {outcome}", entry.package);
        for warning in &entry.warnings {
            println!("{:<20}   warning at {}: {}", "", warning.stage, warning.message);
        }
    }
}

fn print_failures(failures: &[HookFailure]) {
    for failure in failures {
        eprintln!(
            "error: {} failed at {}: {}",
            failure.plugin_id, failure.stage, failure.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_edit, Cli};
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn edits_parse_json_or_fall_back_to_text() {
        let edit = parse_edit("speech_bubble.close_after=9").expect("valid edit");
        assert_eq!(edit.plugin_id, "speech_bubble");
        assert_eq!(edit.key, "close_after");
        assert_eq!(edit.value, json!(9));

        let text = parse_edit("idle_chatter.greeting=hello there").expect("valid edit");
        assert_eq!(text.value, json!("hello there"));

        assert!(parse_edit("no_equals").is_err());
        assert!(parse_edit("nodot=1").is_err());
    }
}
