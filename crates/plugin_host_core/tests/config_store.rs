use plugin_host_core::config::{backup_path_for, RuntimeOptions};
use plugin_host_core::{load_config, save_config, ConfigMap, LoadStatus};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn object(value: Value) -> ConfigMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn read_json(path: &Path) -> Value {
    let raw = fs::read_to_string(path).expect("read config file");
    serde_json::from_str(&raw).expect("config file should be valid json")
}

#[test]
fn missing_file_is_created_from_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("config.json");
    let defaults = object(json!({"enabled": true, "interval": 30}));

    let loaded = load_config(&path, &defaults);

    assert_eq!(loaded.status, LoadStatus::Created);
    assert_eq!(loaded.values, defaults);
    assert!(loaded.write_error.is_none());
    assert_eq!(read_json(&path), json!({"enabled": true, "interval": 30}));
}

#[test]
fn file_values_win_and_defaults_fill_gaps() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"interval": 5, "extra": "kept"}"#).expect("seed config");
    let defaults = object(json!({"enabled": true, "interval": 30}));

    let loaded = load_config(&path, &defaults);

    assert_eq!(loaded.status, LoadStatus::Merged);
    assert_eq!(
        Value::Object(loaded.values),
        json!({"enabled": true, "interval": 5, "extra": "kept"})
    );
    // Merging does not rewrite the file.
    assert_eq!(read_json(&path), json!({"interval": 5, "extra": "kept"}));
}

#[test]
fn corrupt_file_is_backed_up_and_reset() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.json");
    let garbage = b"{\"enabled\": tru";
    fs::write(&path, garbage).expect("seed corrupt config");
    let defaults = object(json!({"enabled": true}));

    let loaded = load_config(&path, &defaults);

    let backup = backup_path_for(&path);
    assert_eq!(
        loaded.status,
        LoadStatus::Recovered {
            backup: Some(backup.clone())
        }
    );
    assert_eq!(loaded.values, defaults);
    assert_eq!(fs::read(&backup).expect("backup exists"), garbage);
    assert_eq!(read_json(&path), json!({"enabled": true}));
}

#[test]
fn non_object_file_counts_as_corrupt() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.json");
    fs::write(&path, "[1, 2, 3]").expect("seed array config");

    let loaded = load_config(&path, &object(json!({"enabled": false})));

    assert!(matches!(loaded.status, LoadStatus::Recovered { .. }));
    assert_eq!(Value::Object(loaded.values), json!({"enabled": false}));
    assert!(dir.path().join("config.bad.json").is_file());
}

#[test]
fn save_replaces_file_without_leaving_temp_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.json");
    save_config(&path, &object(json!({"enabled": true}))).expect("first save");
    save_config(&path, &object(json!({"enabled": false, "name": "bubble"})))
        .expect("second save");

    assert_eq!(read_json(&path), json!({"enabled": false, "name": "bubble"}));
    let entries: Vec<_> = fs::read_dir(dir.path())
        .expect("list dir")
        .map(|entry| entry.expect("dir entry").file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("config.json")]);
}

#[test]
fn save_into_missing_directory_creates_it() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("a").join("b").join("config.json");

    save_config(&path, &object(json!({"k": 1}))).expect("save into new dir");

    assert_eq!(read_json(&path), json!({"k": 1}));
}

#[test]
fn runtime_options_round_trip_through_the_store() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("plugin_host.json");
    fs::write(&path, r#"{"plugins_root": "/opt/pet/plugins"}"#).expect("seed options");

    let options = RuntimeOptions::load(&path);

    assert_eq!(options.plugins_root, Path::new("/opt/pet/plugins"));
    assert_eq!(options.config_file_name, "config.json");
    assert_eq!(options.manifest_file_name, "plugin.json");
}
