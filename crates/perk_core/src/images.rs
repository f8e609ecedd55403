use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core_api::{CoreError, CoreErrorCode};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Canonical file stem for a perk name: spaces become `_`, anything outside
/// `[A-Za-z0-9_]` is dropped, and the result is lowercased.
pub fn normalize_name(name: &str) -> String {
    name.replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Perk icons found in a directory, keyed by normalized file stem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageIndex {
    entries: BTreeMap<String, PathBuf>,
}

impl ImageIndex {
    /// Indexes image files in `dir`. A missing directory gives an empty index.
    pub fn scan(dir: &Path) -> Result<Self, CoreError> {
        let mut index = Self::default();
        if !dir.is_dir() {
            return Ok(index);
        }

        for path in sorted_files(dir)? {
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
            {
                continue;
            }
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let key = normalize_name(&stem.to_string_lossy());
            index.entries.entry(key).or_insert(path);
        }
        Ok(index)
    }

    pub fn lookup(&self, perk_name: &str) -> Option<&Path> {
        self.entries
            .get(&normalize_name(perk_name))
            .map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> + '_ {
        self.entries
            .iter()
            .map(|(key, path)| (key.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renames every file in `dir` to its normalized stem plus lowercased
/// extension. Files whose target name already exists are skipped.
pub fn normalize_image_names(dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>, CoreError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut renamed = Vec::new();
    for src in sorted_files(dir)? {
        let Some(stem) = src.file_stem() else {
            continue;
        };
        let mut new_name = normalize_name(&stem.to_string_lossy());
        if let Some(ext) = src.extension() {
            new_name.push('.');
            new_name.push_str(&ext.to_string_lossy().to_ascii_lowercase());
        }
        let dst = dir.join(new_name);
        if dst == src || dst.exists() {
            continue;
        }
        fs::rename(&src, &dst).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!(
                    "failed to rename {} to {}: {e}",
                    src.display(),
                    dst.display()
                ),
            )
        })?;
        renamed.push((src, dst));
    }
    Ok(renamed)
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to read {}: {e}", dir.display()),
        )
    })?;

    let mut files = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read entry in {}: {e}", dir.display()),
            )
        })?;
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
