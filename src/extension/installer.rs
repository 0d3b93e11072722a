//! Filesystem effects of an install or update: payload write, pointer
//! manifest write, backup demotion.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io;

use super::BACKUP_SUFFIX;
use super::config::Config;
use super::fsutil;
use super::resolver::RemoteExtension;

/// Pointer record the browser consults to load an externally managed
/// extension. `external_crx` carries the absolute payload path.
#[derive(Serialize, Debug)]
struct Manifest<'a> {
    external_crx: &'a str,
    external_version: &'a str,
}

/// Write the payload and (re)write the pointer manifest for one resolved
/// extension. Every write overwrites unconditionally, so a re-run after a
/// partial failure converges on the same state.
pub fn install(config: &Config, remote: &RemoteExtension) -> Result<()> {
    let ext_path = config.extension_path(&remote.id);
    match fs::create_dir(&ext_path) {
        Ok(()) => fsutil::adapt_owner(&ext_path)?,
        // a sibling worker may have raced us to the parent tree; the
        // directory itself is keyed by our identifier
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => {
            return Err(e).with_context(|| format!("creating {}", ext_path.display()));
        }
    }

    let payload_path = ext_path.join(&remote.filename);
    fs::write(&payload_path, &remote.payload)
        .with_context(|| format!("writing payload {}", payload_path.display()))?;
    fsutil::adapt_owner(&payload_path)?;

    let manifest_path = config.manifest_path(&remote.id);
    let payload_str = payload_path.to_string_lossy();
    let manifest = Manifest {
        external_crx: payload_str.as_ref(),
        external_version: remote.version.as_deref().unwrap_or_default(),
    };
    let json = serde_json::to_string_pretty(&manifest).context("serializing manifest")?;
    fs::write(&manifest_path, json)
        .with_context(|| format!("writing manifest {}", manifest_path.display()))?;
    fsutil::adapt_owner(&manifest_path)?;

    Ok(())
}

/// Demote every file in the identifier's directory that is neither the
/// freshly written payload nor already a backup, by appending the backup
/// suffix. Prior versions stay on disk until clean mode removes them.
pub fn demote_old_payloads(config: &Config, id: &str, keep: &str) -> Result<()> {
    let dir = config.extension_path(id);
    for entry in
        fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == keep || name.ends_with(BACKUP_SUFFIX) {
            continue;
        }
        let from = entry.path();
        let to = dir.join(format!("{name}{BACKUP_SUFFIX}"));
        fs::rename(&from, &to)
            .with_context(|| format!("renaming {} to backup", from.display()))?;
    }
    Ok(())
}
