//! Atomic JSON-object config persistence with corruption recovery.
//!
//! # Responsibility
//! - Load a config object, overlaying on-disk values onto plugin defaults.
//! - Persist config objects with write-to-temp-then-rename.
//! - Recover from unreadable or non-object files by backup-and-reset.
//!
//! # Invariants
//! - A valid file on disk is always a JSON object.
//! - The merged result always contains every key present in `defaults`.
//! - `path` is never observed half-written: a temp sibling is staged, synced,
//!   then renamed over it.
//! - `load_config` never returns an error and never panics.

use crate::error::{ConfigError, ConfigResult};
use log::{info, warn};
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// In-memory config object.
pub type ConfigMap = Map<String, Value>;

const BACKUP_SUFFIX: &str = ".bad.json";

/// How a config object was obtained by [`load_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// File was missing; defaults were written.
    Created,
    /// File was a valid object and got merged over defaults.
    Merged,
    /// File was corrupt; it was moved to `backup` (when the move succeeded)
    /// and replaced by defaults.
    Recovered { backup: Option<PathBuf> },
}

/// Result of [`load_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLoad {
    pub values: ConfigMap,
    pub status: LoadStatus,
    /// Set when writing defaults to disk failed; `values` is still usable.
    pub write_error: Option<String>,
}

/// Loads the config object at `path`, merged over `defaults`.
///
/// # Contract
/// - Missing file: writes `defaults`, returns a copy of `defaults`.
/// - Valid object: returns `defaults` overlaid with the file's keys.
/// - Unreadable/invalid/non-object: moves the file to
///   [`backup_path_for`], rewrites `path` with `defaults`, returns defaults.
///
/// # Side effects
/// - Creates the parent directory.
/// - Emits `config_load` logging events.
pub fn load_config(path: &Path, defaults: &ConfigMap) -> ConfigLoad {
    if let Err(err) = ensure_parent_dir(path) {
        warn!(
            "event=config_load module=config status=degraded path={} error={}",
            path.display(),
            err
        );
    }

    if !path.exists() {
        let write_error = save_config(path, defaults).err().map(|err| err.to_string());
        info!(
            "event=config_load module=config status=created path={} persisted={}",
            path.display(),
            write_error.is_none()
        );
        return ConfigLoad {
            values: defaults.clone(),
            status: LoadStatus::Created,
            write_error,
        };
    }

    match read_object(path) {
        Ok(on_disk) => ConfigLoad {
            values: merge_over_defaults(defaults, on_disk),
            status: LoadStatus::Merged,
            write_error: None,
        },
        Err(err) => recover(path, defaults, &err),
    }
}

/// Persists `data` atomically at `path`.
///
/// # Errors
/// - Returns [`ConfigError::Io`] when the directory, temp file or rename fails.
/// - Returns [`ConfigError::Json`] when serialization fails.
///
/// On error the previous file at `path` is left untouched.
pub fn save_config(path: &Path, data: &ConfigMap) -> ConfigResult<()> {
    let staged = stage(path, data)?;
    commit(staged, path)
}

/// Returns the sibling path a corrupt config is moved to.
///
/// `plugins/foo/config.json` → `plugins/foo/config.bad.json`.
pub fn backup_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    path.with_file_name(format!("{stem}{BACKUP_SUFFIX}"))
}

/// Overlays `on_disk` onto a copy of `defaults`; file values win.
pub fn merge_over_defaults(defaults: &ConfigMap, on_disk: ConfigMap) -> ConfigMap {
    let mut merged = defaults.clone();
    for (key, value) in on_disk {
        merged.insert(key, value);
    }
    merged
}

fn read_object(path: &Path) -> ConfigResult<ConfigMap> {
    let raw = fs::read_to_string(path).map_err(|err| ConfigError::io(path, err))?;
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAnObject(path.to_path_buf())),
    }
}

fn recover(path: &Path, defaults: &ConfigMap, cause: &ConfigError) -> ConfigLoad {
    let backup_path = backup_path_for(path);
    let backup = match fs::rename(path, &backup_path) {
        Ok(()) => Some(backup_path),
        Err(err) => {
            warn!(
                "event=config_backup module=config status=error path={} error={}",
                path.display(),
                err
            );
            None
        }
    };

    let write_error = save_config(path, defaults).err().map(|err| err.to_string());
    warn!(
        "event=config_load module=config status=recovered path={} cause={} backup={} persisted={}",
        path.display(),
        cause,
        backup
            .as_deref()
            .map(|value| value.display().to_string())
            .unwrap_or_else(|| "none".to_string()),
        write_error.is_none()
    );

    ConfigLoad {
        values: defaults.clone(),
        status: LoadStatus::Recovered { backup },
        write_error,
    }
}

fn ensure_parent_dir(path: &Path) -> ConfigResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| ConfigError::io(parent, err))
        }
        _ => Ok(()),
    }
}

fn staging_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Writes `data` into a synced temp file next to `path`.
///
/// Dropping the returned handle without [`commit`] deletes the temp file and
/// leaves `path` untouched.
fn stage(path: &Path, data: &ConfigMap) -> ConfigResult<NamedTempFile> {
    ensure_parent_dir(path)?;
    let dir = staging_dir(path);
    let bytes = serde_json::to_vec_pretty(data)?;

    let mut staged = NamedTempFile::new_in(dir).map_err(|err| ConfigError::io(dir, err))?;
    if let Err(err) = write_synced(staged.as_file_mut(), &bytes) {
        return Err(ConfigError::io(staged.path(), err));
    }
    Ok(staged)
}

fn write_synced(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()
}

fn commit(staged: NamedTempFile, path: &Path) -> ConfigResult<()> {
    staged
        .persist(path)
        .map_err(|err| ConfigError::io(path, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{backup_path_for, commit, merge_over_defaults, stage, ConfigMap};
    use serde_json::json;
    use std::fs;
    use std::path::Path;

    fn object(value: serde_json::Value) -> ConfigMap {
        value.as_object().cloned().expect("test value is an object")
    }

    #[test]
    fn backup_path_replaces_extension_with_bad_json() {
        assert_eq!(
            backup_path_for(Path::new("/tmp/plugins/foo/config.json")),
            Path::new("/tmp/plugins/foo/config.bad.json")
        );
        assert_eq!(
            backup_path_for(Path::new("settings")),
            Path::new("settings.bad.json")
        );
    }

    #[test]
    fn merge_keeps_defaults_and_extra_file_keys() {
        let merged = merge_over_defaults(
            &object(json!({"a": 1, "b": 2})),
            object(json!({"b": 9, "c": 3})),
        );
        assert_eq!(merged, object(json!({"a": 1, "b": 9, "c": 3})));
    }

    #[test]
    fn crash_between_stage_and_commit_leaves_previous_file_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{\n  \"enabled\": true\n}").unwrap();

        let staged = stage(&path, &object(json!({"enabled": false, "x": 1}))).unwrap();
        let staged_path = staged.path().to_path_buf();
        assert!(staged_path.exists());
        assert_eq!(staged_path.parent(), path.parent());
        drop(staged);

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\n  \"enabled\": true\n}"
        );
        assert!(!staged_path.exists());
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn commit_replaces_file_in_one_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let staged = stage(&path, &object(json!({"volume": 3}))).unwrap();
        commit(staged, &path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"volume": 3}));
    }
}
