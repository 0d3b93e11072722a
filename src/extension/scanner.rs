//! Read-only view of the locally installed extension state. No network.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io;

use super::config::Config;
use super::resolver;
use super::{ID_LEN, MANIFEST_EXT, PAYLOAD_EXT};

/// Identifiers that already have a pointer manifest on disk. A missing
/// manifest directory means nothing is installed yet, not an error.
pub fn manifest_ids(config: &Config) -> Result<HashSet<String>> {
    let dir = config.manifest_root();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("reading manifest directory {}", dir.display()));
        }
    };

    let suffix = format!(".{MANIFEST_EXT}");
    let mut ids = HashSet::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("reading manifest directory {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(id) = name.strip_suffix(&suffix) {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}

/// Identifiers that already have a non-empty package directory: entries of
/// the extension directory that are directories, carry an identifier-length
/// name and contain at least one file.
pub fn extension_ids(config: &Config) -> Result<HashSet<String>> {
    let dir = config.extension_root();
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("reading extension directory {}", dir.display()));
        }
    };

    let mut ids = HashSet::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("reading extension directory {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.chars().count() != ID_LEN || !entry.path().is_dir() {
            continue;
        }
        let populated = fs::read_dir(entry.path())
            .map(|mut it| it.next().is_some())
            .unwrap_or(false);
        if populated {
            ids.insert(name);
        }
    }
    Ok(ids)
}

/// An extension counts as installed when both its manifest and a non-empty
/// package directory exist.
pub fn is_installed(config: &Config, id: &str) -> Result<bool> {
    if !config.manifest_path(id).is_file() {
        return Ok(false);
    }
    let dir = config.extension_path(id);
    let populated = match fs::read_dir(&dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", dir.display()));
        }
    };
    Ok(populated)
}

/// Version string of the payload currently on disk for `id`, if any. `None`
/// covers both a missing directory and a directory without a recognizable
/// payload; the caller treats either as update-needed.
pub fn local_version(config: &Config, id: &str) -> Result<Option<String>> {
    let dir = config.extension_path(id);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("reading {}", dir.display()));
        }
    };

    let suffix = format!(".{PAYLOAD_EXT}");
    for entry in entries {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(&suffix) {
            return Ok(resolver::parse_version(&name));
        }
    }
    Ok(None)
}
