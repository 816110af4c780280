//! Plugin package directories and their marker file.
//!
//! # Responsibility
//! - Enumerate package directories directly under the plugins root.
//! - Parse the package marker (`plugin.json`) of one package.
//!
//! # Invariants
//! - Enumeration is sorted and therefore deterministic.
//! - Only immediate subdirectories carrying the marker file qualify; files,
//!   unmarked directories and support directories (`_*`, `.*`) are ignored.

use crate::error::PackageError;
use serde::Deserialize;
use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};

/// Parsed contents of a package marker file.
///
/// An empty file and `{}` are both valid markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageMarker {
    /// Entrypoint name; defaults to the package directory name.
    pub entrypoint: Option<String>,
    pub description: Option<String>,
}

/// One discovered plugin package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPackage {
    /// Directory name under the plugins root.
    pub name: String,
    pub dir: PathBuf,
    pub marker: PackageMarker,
}

impl PluginPackage {
    /// Entrypoint to resolve for this package.
    pub fn entrypoint(&self) -> &str {
        match self.marker.entrypoint.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => self.name.as_str(),
        }
    }
}

/// Returns sorted package directory names under `root`.
///
/// Entries that cannot be read are skipped, not fatal.
///
/// # Errors
/// - Returns the underlying I/O error when `root` cannot be listed.
pub fn scan_package_names(root: &Path, marker_file_name: &str) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(root)?
        .filter_map(|entry| marked_package_name(entry, marker_file_name))
        .collect();
    names.sort();
    Ok(names)
}

fn marked_package_name(entry: io::Result<DirEntry>, marker_file_name: &str) -> Option<String> {
    let entry = entry.ok()?;
    let name = entry.file_name().to_str()?.to_string();
    if is_support_name(&name) {
        return None;
    }
    let path = entry.path();
    (path.is_dir() && path.join(marker_file_name).is_file()).then_some(name)
}

/// Reads package `name` under `root`.
///
/// # Errors
/// - [`PackageError::NotAPackage`] when the directory or marker is missing.
/// - [`PackageError::Unreadable`] / [`PackageError::Malformed`] for a bad marker.
pub fn read_package(
    root: &Path,
    name: &str,
    marker_file_name: &str,
) -> Result<PluginPackage, PackageError> {
    let dir = root.join(name);
    let marker_path = dir.join(marker_file_name);
    if is_support_name(name) || !dir.is_dir() || !marker_path.is_file() {
        return Err(PackageError::NotAPackage(dir));
    }

    let raw = fs::read_to_string(&marker_path).map_err(|source| PackageError::Unreadable {
        path: marker_path.clone(),
        source,
    })?;
    let marker = if raw.trim().is_empty() {
        PackageMarker::default()
    } else {
        serde_json::from_str::<PackageMarker>(&raw).map_err(|err| PackageError::Malformed {
            path: marker_path.clone(),
            message: err.to_string(),
        })?
    };

    Ok(PluginPackage {
        name: name.to_string(),
        dir,
        marker,
    })
}

fn is_support_name(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::{marked_package_name, read_package, scan_package_names};
    use crate::error::PackageError;
    use std::fs;
    use std::io;
    use std::path::Path;

    fn make_package(root: &Path, name: &str, marker: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("plugin.json"), marker).unwrap();
    }

    #[test]
    fn scan_returns_sorted_marked_directories_only() {
        let root = tempfile::tempdir().unwrap();
        make_package(root.path(), "zeta", "{}");
        make_package(root.path(), "alpha", "");
        make_package(root.path(), "__pycache__", "{}");
        make_package(root.path(), ".hidden", "{}");
        fs::create_dir_all(root.path().join("assets")).unwrap();
        fs::write(root.path().join("manager.json"), "{}").unwrap();

        let names = scan_package_names(root.path(), "plugin.json").unwrap();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn unreadable_entry_is_skipped() {
        let entry = Err(io::Error::new(io::ErrorKind::PermissionDenied, "gone"));
        assert_eq!(marked_package_name(entry, "plugin.json"), None);

        let root = tempfile::tempdir().unwrap();
        make_package(root.path(), "alpha", "{}");
        let first = fs::read_dir(root.path()).unwrap().next().unwrap();
        assert_eq!(
            marked_package_name(first, "plugin.json").as_deref(),
            Some("alpha")
        );
    }

    #[test]
    fn marker_entrypoint_defaults_to_directory_name() {
        let root = tempfile::tempdir().unwrap();
        make_package(root.path(), "speech_bubble", "");
        make_package(
            root.path(),
            "bubble_v2",
            r#"{"entrypoint": "speech_bubble", "description": "renamed"}"#,
        );

        let plain = read_package(root.path(), "speech_bubble", "plugin.json").unwrap();
        assert_eq!(plain.entrypoint(), "speech_bubble");

        let renamed = read_package(root.path(), "bubble_v2", "plugin.json").unwrap();
        assert_eq!(renamed.entrypoint(), "speech_bubble");
        assert_eq!(renamed.marker.description.as_deref(), Some("renamed"));
    }

    #[test]
    fn malformed_marker_is_reported() {
        let root = tempfile::tempdir().unwrap();
        make_package(root.path(), "broken", "{not json");

        let err = read_package(root.path(), "broken", "plugin.json").unwrap_err();
        assert!(matches!(err, PackageError::Malformed { .. }));
    }

    #[test]
    fn unmarked_directory_is_not_a_package() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("loose")).unwrap();

        let err = read_package(root.path(), "loose", "plugin.json").unwrap_err();
        assert!(matches!(err, PackageError::NotAPackage(_)));
    }
}
