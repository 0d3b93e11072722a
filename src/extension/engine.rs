//! Per-extension reconciliation decisions and the mode entry points.
//!
//! Install and update fan out one worker task per desired extension and wait
//! on all of them before returning. Each worker resolves, decides and reports
//! on its own; a failed worker never disturbs its siblings.

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{Table, presets::UTF8_FULL};
use nix::unistd::AccessFlags;
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::ui::{self, prelude::*};

use super::BACKUP_SUFFIX;
use super::config::{Config, ExtensionRef};
use super::fsutil;
use super::installer;
use super::resolver::{self, RemoteExtension};
use super::scanner;

/// Terminal outcome of one extension's reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Installed,
    AlreadyInstalled,
    NotFound,
    Updated,
    Current,
    Skipped,
}

/// Apply the install decision for an already resolved extension.
pub(crate) fn apply_install(
    config: &Config,
    ext: &ExtensionRef,
    remote: &RemoteExtension,
) -> Result<Outcome> {
    if !remote.exists {
        emit(
            Level::Warn,
            "install.not_found",
            &format!(
                "{} Extension \"{}\" not found.",
                char::from(NerdFont::CrossCircle),
                ext.display_name()
            ),
            None,
        );
        return Ok(Outcome::NotFound);
    }

    installer::install(config, remote)?;
    emit(
        Level::Success,
        "install.done",
        &format!(
            "{} Extension \"{}\" installed.",
            char::from(NerdFont::Download),
            ext.display_name()
        ),
        None,
    );
    Ok(Outcome::Installed)
}

/// Full install path for one extension: local check, remote resolution,
/// filesystem effect.
async fn process_install(
    config: &Config,
    client: &reqwest::Client,
    ext: &ExtensionRef,
) -> Result<Outcome> {
    if scanner::is_installed(config, &ext.id)? {
        emit(
            Level::Info,
            "install.present",
            &format!(
                "{} Extension \"{}\" is already installed.",
                char::from(NerdFont::Check),
                ext.display_name()
            ),
            None,
        );
        return Ok(Outcome::AlreadyInstalled);
    }

    let remote = resolver::resolve(client, &ext.id).await?;
    ui::debug(
        "install.resolved",
        &format!("{} {} resolved to {}", char::from(NerdFont::Globe), ext.id, remote.url),
    );
    apply_install(config, ext, &remote)
}

/// Apply the update decision for an already resolved extension. The version
/// comparison is a plain string inequality on the normalized version, not a
/// semantic ordering.
pub(crate) fn apply_update(
    config: &Config,
    ext: &ExtensionRef,
    remote: &RemoteExtension,
) -> Result<Outcome> {
    if !remote.exists {
        emit(
            Level::Warn,
            "update.not_found",
            &format!(
                "{} Extension \"{}\" not found.",
                char::from(NerdFont::CrossCircle),
                ext.display_name()
            ),
            None,
        );
        return Ok(Outcome::NotFound);
    }

    let local = scanner::local_version(config, &ext.id)?;
    if local.is_some() && local == remote.version {
        emit(
            Level::Info,
            "update.current",
            &format!(
                "{} Extension \"{}\" up-to-date.",
                char::from(NerdFont::Check),
                ext.display_name()
            ),
            None,
        );
        return Ok(Outcome::Current);
    }

    installer::install(config, remote)?;
    installer::demote_old_payloads(config, &ext.id, &remote.filename)?;
    emit(
        Level::Success,
        "update.done",
        &format!(
            "{} Extension \"{}\" updated.",
            char::from(NerdFont::Refresh),
            ext.display_name()
        ),
        None,
    );
    Ok(Outcome::Updated)
}

/// Full update path for one extension. Extensions without a local package
/// directory are skipped, never installed as a side effect.
async fn process_update(
    config: &Config,
    client: &reqwest::Client,
    ext: &ExtensionRef,
    installed_dirs: &HashSet<String>,
) -> Result<Outcome> {
    if !installed_dirs.contains(&ext.id) {
        emit(
            Level::Info,
            "update.skip",
            &format!(
                "{} Extension \"{}\" in config but not installed. Skipping...",
                char::from(NerdFont::Warning),
                ext.display_name()
            ),
            None,
        );
        return Ok(Outcome::Skipped);
    }

    let remote = resolver::resolve(client, &ext.id).await?;
    ui::debug(
        "update.resolved",
        &format!("{} {} resolved to {}", char::from(NerdFont::Globe), ext.id, remote.url),
    );
    apply_update(config, ext, &remote)
}

/// Await every worker. Errors are reported per extension and do not disturb
/// the others; completing the loop is the mode's join barrier.
async fn join_workers(handles: Vec<JoinHandle<Result<Outcome>>>) {
    for handle in handles {
        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => emit(
                Level::Error,
                "worker.failed",
                &format!("{} {e:#}", char::from(NerdFont::CrossCircle)),
                None,
            ),
            Err(e) => emit(
                Level::Error,
                "worker.panicked",
                &format!("{} worker task failed: {e}", char::from(NerdFont::CrossCircle)),
                None,
            ),
        }
    }
}

/// Install every desired extension that is not installed yet, one worker per
/// extension.
pub async fn install(config: Arc<Config>) -> Result<()> {
    fsutil::check_dirs(&config, AccessFlags::W_OK)?;
    let client = resolver::client()?;

    let mut handles = Vec::new();
    for ext in config.extensions.clone() {
        let config = Arc::clone(&config);
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            process_install(&config, &client, &ext).await
        }));
    }
    join_workers(handles).await;
    Ok(())
}

/// Update every desired extension that is already present locally, one worker
/// per extension.
pub async fn update(config: Arc<Config>) -> Result<()> {
    fsutil::check_dirs(&config, AccessFlags::W_OK)?;
    let client = resolver::client()?;
    let installed_dirs = Arc::new(scanner::extension_ids(&config)?);

    let mut handles = Vec::new();
    for ext in config.extensions.clone() {
        let config = Arc::clone(&config);
        let client = client.clone();
        let installed_dirs = Arc::clone(&installed_dirs);
        handles.push(tokio::spawn(async move {
            process_update(&config, &client, &ext, &installed_dirs).await
        }));
    }
    join_workers(handles).await;
    Ok(())
}

/// Read-only report of installed-vs-not for each desired extension.
pub fn list(config: &Config) -> Result<()> {
    fsutil::check_dirs(config, AccessFlags::R_OK)?;
    let manifests = scanner::manifest_ids(config)?;
    let dirs = scanner::extension_ids(config)?;

    if get_output_format() == OutputFormat::Json {
        for ext in &config.extensions {
            let installed = manifests.contains(&ext.id) && dirs.contains(&ext.id);
            emit(
                Level::Info,
                "list.extension",
                &format!("{}: {}", ext.display_name(), if installed { "Installed." } else { "Not installed." }),
                Some(json!({ "id": ext.id, "installed": installed })),
            );
        }
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Extension", "Identifier", "Status"]);
    for ext in &config.extensions {
        let installed = manifests.contains(&ext.id) && dirs.contains(&ext.id);
        let status = if installed {
            "installed".green().to_string()
        } else {
            "not installed".yellow().to_string()
        };
        table.add_row(vec![ext.display_name(), ext.id.clone(), status]);
    }
    println!("{table}");
    Ok(())
}

/// Delete package directories and manifests of extensions that are installed
/// but no longer listed. Unconditional; there is no confirmation step.
pub fn remove(config: &Config) -> Result<()> {
    fsutil::check_dirs(config, AccessFlags::W_OK)?;
    let desired = config.desired_ids();

    for id in scanner::extension_ids(config)? {
        if desired.contains(id.as_str()) {
            continue;
        }
        let dir = config.extension_path(&id);
        fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
        emit(
            Level::Success,
            "remove.dir",
            &format!(
                "{} Extension folder {} removed.",
                char::from(NerdFont::Folder),
                id
            ),
            None,
        );
    }

    for id in scanner::manifest_ids(config)? {
        if desired.contains(id.as_str()) {
            continue;
        }
        let path = config.manifest_path(&id);
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        emit(
            Level::Success,
            "remove.manifest",
            &format!(
                "{} Manifest file {}.json removed.",
                char::from(NerdFont::File),
                id
            ),
            None,
        );
    }
    Ok(())
}

/// Add every manifest identifier that is missing from the desired set to the
/// config file, without a display name.
pub fn scan(config: &mut Config) -> Result<()> {
    fsutil::check_dirs(config, AccessFlags::R_OK)?;
    let known: HashSet<String> = config.extensions.iter().map(|e| e.id.clone()).collect();

    let mut added = false;
    for id in scanner::manifest_ids(config)? {
        if known.contains(&id) {
            continue;
        }
        let label: String = id.chars().take(11).collect();
        emit(
            Level::Success,
            "scan.added",
            &format!("{} Extension {label}… added.", char::from(NerdFont::Package)),
            None,
        );
        config.add_unnamed(id);
        added = true;
    }

    if added {
        config.save()?;
    } else {
        emit(
            Level::Info,
            "scan.none",
            &format!(
                "{} No unlisted extensions found.",
                char::from(NerdFont::Info)
            ),
            None,
        );
    }
    Ok(())
}

/// Delete the backup files an update left behind, for every desired
/// extension. Missing package directories are tolerated silently.
pub fn clean(config: &Config) -> Result<()> {
    fsutil::check_dirs(config, AccessFlags::W_OK)?;

    for ext in &config.extensions {
        let dir = config.extension_path(&ext.id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", dir.display()));
            }
        };
        for entry in entries {
            let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(BACKUP_SUFFIX) {
                continue;
            }
            fs::remove_file(entry.path())
                .with_context(|| format!("removing {}", entry.path().display()))?;
            emit(
                Level::Success,
                "clean.removed",
                &format!(
                    "{} File \"{}\" of extension \"{}\" removed.",
                    char::from(NerdFont::Trash),
                    name,
                    ext.display_name()
                ),
                None,
            );
        }
    }
    Ok(())
}
