//! Plugin discovery and lifecycle orchestration.
//!
//! # Responsibility
//! - Discover packages under the plugins root in sorted order.
//! - Drive each plugin through config load, enable decision and activation.
//! - Dispatch cross-cutting hooks (menu, settings panels, bulk save).
//!
//! # Invariants
//! - Config load strictly precedes activation for one plugin.
//! - Only activated plugins receive the context, menu hooks and `deactivate`.
//! - No failure inside one plugin stops a batch or escapes to the caller;
//!   every failure becomes a report entry plus one context log line.
//! - The first plugin registered under an id keeps it; later duplicates are
//!   rejected before their config is touched.

use crate::config::{load_config, save_config, ConfigMap, RuntimeOptions};
use crate::context::{Context, ServiceRegistry};
use crate::error::PackageError;
use crate::plugin::contract::{defaults_as_object, is_enabled, Headless, HostUi, Plugin};
use crate::plugin::entrypoint::{BoxedPlugin, EntrypointTable};
use crate::plugin::guard::guarded;
use crate::plugin::package::{read_package, scan_package_names, PluginPackage};
use crate::plugin::registry::{PluginInfo, PluginRegistry, PluginSlot, PluginState};
use crate::plugin::report::{
    HookFailure, HookReport, LoadOutcome, LoadReport, LoadWarning, PackageLoad, SaveReport,
    SettingsPanels, SkipReason, Stage, UnloadReport,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Owns the plugin registry and drives plugin lifecycles.
pub struct PluginManager<U: HostUi = Headless> {
    ctx: Context,
    entrypoints: EntrypointTable<U>,
    plugins_root: PathBuf,
    config_file_name: String,
    manifest_file_name: String,
    registry: PluginRegistry<U>,
}

impl<U: HostUi> PluginManager<U> {
    /// Creates a manager over `plugins_root` with default file names.
    pub fn new(
        ctx: Context,
        plugins_root: impl Into<PathBuf>,
        entrypoints: EntrypointTable<U>,
    ) -> Self {
        let options = RuntimeOptions {
            plugins_root: plugins_root.into(),
            ..RuntimeOptions::default()
        };
        Self::with_options(ctx, &options, entrypoints)
    }

    /// Creates a manager using root and file names from `options`.
    pub fn with_options(
        ctx: Context,
        options: &RuntimeOptions,
        entrypoints: EntrypointTable<U>,
    ) -> Self {
        Self {
            ctx,
            entrypoints,
            plugins_root: options.plugins_root.clone(),
            config_file_name: options.config_file_name.clone(),
            manifest_file_name: options.manifest_file_name.clone(),
            registry: PluginRegistry::new(),
        }
    }

    // ---------- discovery / load ----------

    /// Returns sorted names of the package directories under the plugins root.
    ///
    /// A missing or unreadable root yields an empty list.
    pub fn discover(&self) -> Vec<String> {
        match scan_package_names(&self.plugins_root, &self.manifest_file_name) {
            Ok(names) => names,
            Err(err) => {
                self.ctx.log(&format!(
                    "event=plugin_discover module=plugins status=error root={} error={}",
                    self.plugins_root.display(),
                    err
                ));
                Vec::new()
            }
        }
    }

    /// Like [`Self::discover`], with parsed package records.
    ///
    /// Packages whose marker cannot be parsed are left out.
    pub fn discover_packages(&self) -> Vec<PluginPackage> {
        self.discover()
            .into_iter()
            .filter_map(|name| {
                read_package(&self.plugins_root, &name, &self.manifest_file_name).ok()
            })
            .collect()
    }

    /// Loads every discovered package in sorted order.
    pub fn load_all(&mut self) -> LoadReport {
        let mut report = LoadReport::default();
        for name in self.discover() {
            report.packages.push(self.load_package(&name));
        }
        self.ctx.log(&format!(
            "event=plugin_load_all module=plugins status=ok packages={} activated={} disabled={}",
            report.packages.len(),
            report.activated().len(),
            report.disabled().len()
        ));
        report
    }

    /// Loads one package by directory name.
    pub fn load_one(&mut self, name: &str) -> LoadOutcome {
        self.load_package(name).outcome
    }

    fn load_package(&mut self, name: &str) -> PackageLoad {
        let mut warnings = Vec::new();
        let outcome = self.load_package_inner(name, &mut warnings);
        PackageLoad {
            package: name.to_string(),
            outcome,
            warnings,
        }
    }

    fn load_package_inner(
        &mut self,
        name: &str,
        warnings: &mut Vec<LoadWarning>,
    ) -> LoadOutcome {
        let package = match read_package(&self.plugins_root, name, &self.manifest_file_name) {
            Ok(package) => package,
            Err(err) => {
                self.ctx.log(&format!(
                    "event=plugin_load module=plugins status=skipped package={name} error={err}"
                ));
                return LoadOutcome::Skipped(match err {
                    PackageError::NotAPackage(_) => SkipReason::NotAPackage,
                    other => SkipReason::MalformedMarker(other.to_string()),
                });
            }
        };

        let entrypoint = package.entrypoint().to_string();
        let Some(factory) = self.entrypoints.get(&entrypoint) else {
            self.ctx.log(&format!(
                "event=plugin_load module=plugins status=skipped package={name} error_code=no_entrypoint entrypoint={entrypoint}"
            ));
            return LoadOutcome::Skipped(SkipReason::MissingEntrypoint(entrypoint));
        };

        let mut plugin = match guarded(|| factory()) {
            Ok(plugin) => plugin,
            Err(err) => return self.fail(name, Stage::Construction, &err.to_string()),
        };

        let plugin_id = plugin.id().to_string();
        if self.registry.contains(&plugin_id) {
            self.ctx.log(&format!(
                "event=plugin_load module=plugins status=rejected package={name} plugin_id={plugin_id} error_code=duplicate_id"
            ));
            return LoadOutcome::Rejected { plugin_id };
        }

        let (config_path, cfg) = self.configure(&mut plugin, &package, warnings);
        let enabled = cfg.as_ref().map_or(true, is_enabled);

        let state = if enabled {
            let before = self.ctx.with_services(ServiceRegistry::snapshot);
            if let Err(err) = guarded(|| plugin.activate(&self.ctx)) {
                let reverted = self.ctx.with_services_mut(|services| services.restore(before));
                if !reverted.is_empty() {
                    self.ctx.log(&format!(
                        "event=plugin_services module=plugins status=reverted package={name} keys={}",
                        reverted.join(",")
                    ));
                }
                return self.fail(name, Stage::Activation, &err.to_string());
            }
            self.ctx.log(&format!(
                "event=plugin_load module=plugins status=ok package={name} plugin_id={plugin_id} name={} version={}",
                plugin.name(),
                plugin.version()
            ));
            PluginState::Active
        } else {
            self.ctx.log(&format!(
                "event=plugin_load module=plugins status=disabled package={name} plugin_id={plugin_id} name={}",
                plugin.name()
            ));
            PluginState::Disabled
        };

        let slot = PluginSlot {
            plugin,
            package: name.to_string(),
            config_path,
            cfg,
            state,
        };
        // The id was checked above and nothing registered since.
        if self.registry.register(slot).is_err() {
            return LoadOutcome::Rejected { plugin_id };
        }

        match state {
            PluginState::Active => LoadOutcome::Activated { plugin_id },
            PluginState::Disabled => LoadOutcome::Disabled { plugin_id },
        }
    }

    /// Resolves defaults + config path, merges from disk and hands the result
    /// to the plugin.
    ///
    /// A failing `default_config` or `config_path` leaves the plugin without
    /// config: nothing is read or written and the plugin counts as enabled.
    /// A failing `load_config` keeps the merged config.
    fn configure(
        &self,
        plugin: &mut BoxedPlugin<U>,
        package: &PluginPackage,
        warnings: &mut Vec<LoadWarning>,
    ) -> (Option<PathBuf>, Option<ConfigMap>) {
        let defaults = match guarded(|| Ok(plugin.default_config())) {
            Ok(value) => defaults_as_object(value),
            Err(err) => {
                self.warn(package, Stage::Config, &err.to_string(), warnings);
                return (None, None);
            }
        };

        let config_path = match guarded(|| Ok(plugin.config_path())) {
            Ok(Some(path)) => path,
            Ok(None) => package.dir.join(&self.config_file_name),
            Err(err) => {
                self.warn(package, Stage::Config, &err.to_string(), warnings);
                return (None, None);
            }
        };

        let loaded = load_config(&config_path, &defaults);
        if let Some(write_error) = &loaded.write_error {
            self.warn(package, Stage::Config, write_error, warnings);
        }

        if let Err(err) = guarded(|| plugin.load_config(&loaded.values)) {
            self.warn(package, Stage::Config, &err.to_string(), warnings);
        }
        (Some(config_path), Some(loaded.values))
    }

    /// Deactivates every activated plugin and clears the registry.
    pub fn unload_all(&mut self) -> UnloadReport {
        let mut report = UnloadReport::default();
        for mut slot in self.registry.drain() {
            let plugin_id = slot.id().to_string();
            if slot.state != PluginState::Active {
                report.released.push(plugin_id);
                continue;
            }
            match guarded(|| slot.plugin.deactivate()) {
                Ok(()) => report.deactivated.push(plugin_id),
                Err(err) => {
                    let message = err.to_string();
                    let failure = self.hook_failure(&plugin_id, Stage::Deactivation, &message);
                    report.failures.push(failure);
                }
            }
        }
        self.ctx.log(&format!(
            "event=plugin_unload_all module=plugins status=ok deactivated={} released={} failed={}",
            report.deactivated.len(),
            report.released.len(),
            report.failures.len()
        ));
        report
    }

    // ---------- hooks ----------

    /// Lets every active plugin add entries to `menu`.
    ///
    /// A failing plugin's contribution is whatever it added before failing;
    /// the remaining plugins still run.
    pub fn extend_context_menu(&self, menu: &mut U::Menu) -> HookReport {
        let mut report = HookReport::default();
        for slot in self.registry.iter().filter(|slot| slot.is_active()) {
            match guarded(|| slot.plugin.extend_context_menu(menu)) {
                Ok(()) => report.invoked.push(slot.id().to_string()),
                Err(err) => {
                    let message = err.to_string();
                    let failure = self.hook_failure(slot.id(), Stage::MenuHook, &message);
                    report.failures.push(failure);
                }
            }
        }
        report
    }

    /// Collects settings panels from every registered plugin, active or not.
    pub fn build_settings_panels(
        &mut self,
        parent: &mut U::Parent,
    ) -> SettingsPanels<U::Widget> {
        let mut panels = SettingsPanels::default();
        let mut failures = Vec::new();
        for slot in self.registry.iter_mut() {
            match guarded(|| slot.plugin.create_settings_widget(parent)) {
                Ok(Some(widget)) => panels.panels.push((slot.plugin.id().to_string(), widget)),
                Ok(None) => {}
                Err(err) => failures.push((slot.plugin.id().to_string(), err.to_string())),
            }
        }
        for (plugin_id, message) in failures {
            let failure = self.hook_failure(&plugin_id, Stage::SettingsWidget, &message);
            panels.failures.push(failure);
        }
        panels
    }

    /// Persists every registered plugin's config and pushes it back.
    ///
    /// Plugins with neither panel state nor a cached config are skipped, so a
    /// config that never loaded is not overwritten. Enablement changes take
    /// effect on the next full load only.
    pub fn save_all_plugin_configs(&mut self) -> SaveReport {
        let mut report = SaveReport::default();
        let mut failures = Vec::new();
        for slot in self.registry.iter_mut() {
            let plugin_id = slot.plugin.id().to_string();
            let collected = match guarded(|| slot.plugin.collect_config_from_widget()) {
                Ok(Some(value)) => value,
                Ok(None) => match &slot.cfg {
                    Some(cfg) => Value::Object(cfg.clone()),
                    None => {
                        report.skipped.push(plugin_id);
                        continue;
                    }
                },
                Err(err) => {
                    failures.push((plugin_id, err.to_string()));
                    continue;
                }
            };
            let Value::Object(cfg) = collected else {
                report.skipped.push(plugin_id);
                continue;
            };

            let path = match guarded(|| Ok(slot.plugin.config_path())) {
                Ok(Some(path)) => path,
                Ok(None) => self
                    .plugins_root
                    .join(&slot.package)
                    .join(&self.config_file_name),
                Err(err) => {
                    failures.push((plugin_id, err.to_string()));
                    continue;
                }
            };
            if let Err(err) = save_config(&path, &cfg) {
                failures.push((plugin_id, err.to_string()));
                continue;
            }

            if let Err(err) = guarded(|| slot.plugin.load_config(&cfg)) {
                failures.push((plugin_id.clone(), err.to_string()));
            }
            slot.config_path = Some(path.clone());
            slot.cfg = Some(cfg);
            report.saved.push((plugin_id, path));
        }
        for (plugin_id, message) in failures {
            let failure = self.hook_failure(&plugin_id, Stage::SaveConfig, &message);
            report.failures.push(failure);
        }
        self.ctx.log(&format!(
            "event=plugin_save_all module=plugins status=ok saved={} skipped={} failed={}",
            report.saved.len(),
            report.skipped.len(),
            report.failures.len()
        ));
        report
    }

    // ---------- misc ----------

    pub fn get_plugin(&self, plugin_id: &str) -> Option<&dyn Plugin<U>> {
        self.registry.get(plugin_id).map(PluginSlot::plugin)
    }

    pub fn get_plugin_mut(&mut self, plugin_id: &str) -> Option<&mut (dyn Plugin<U> + 'static)> {
        self.registry
            .get_mut(plugin_id)
            .map(|slot| slot.plugin.as_mut())
    }

    /// Snapshots of all registered plugins in load order.
    pub fn all_plugins(&self) -> Vec<PluginInfo> {
        self.registry.iter().map(PluginSlot::info).collect()
    }

    /// Cached config of a registered plugin.
    pub fn plugin_config(&self, plugin_id: &str) -> Option<&ConfigMap> {
        self.registry.get(plugin_id).and_then(PluginSlot::config)
    }

    /// Whether `plugin_id` is registered and activated.
    pub fn is_enabled(&self, plugin_id: &str) -> bool {
        self.registry.get(plugin_id).is_some_and(PluginSlot::is_active)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn plugins_root(&self) -> &Path {
        &self.plugins_root
    }

    pub fn entrypoints(&self) -> &EntrypointTable<U> {
        &self.entrypoints
    }

    fn fail(&self, package: &str, stage: Stage, message: &str) -> LoadOutcome {
        self.ctx.log(&format!(
            "event=plugin_load module=plugins status=error package={package} stage={stage} error={message}"
        ));
        LoadOutcome::Failed {
            stage,
            message: message.to_string(),
        }
    }

    fn warn(
        &self,
        package: &PluginPackage,
        stage: Stage,
        message: &str,
        warnings: &mut Vec<LoadWarning>,
    ) {
        self.ctx.log(&format!(
            "event=plugin_config module=plugins status=error package={} stage={stage} error={message}",
            package.name
        ));
        warnings.push(LoadWarning {
            stage,
            message: message.to_string(),
        });
    }

    fn hook_failure(&self, plugin_id: &str, stage: Stage, message: &str) -> HookFailure {
        self.ctx.log(&format!(
            "event=plugin_hook module=plugins status=error plugin_id={plugin_id} stage={stage} error={message}"
        ));
        HookFailure {
            plugin_id: plugin_id.to_string(),
            stage,
            message: message.to_string(),
        }
    }
}
