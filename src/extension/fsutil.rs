use anyhow::{Context, Result};
use nix::unistd::{AccessFlags, access};
use std::env;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use super::config::Config;
use super::error::SyncError;

/// Expand `~` against the invoking user's home and absolutize. Under sudo the
/// real user's home is used, so `~` and `/root` prefixes resolve the way the
/// operator expects.
pub fn real_path(raw: &str) -> PathBuf {
    let expanded = if let Ok(user) = env::var("SUDO_USER") {
        let home = format!("/home/{user}");
        if let Some(rest) = raw.strip_prefix('~') {
            PathBuf::from(format!("{home}{rest}"))
        } else if let Some(rest) = raw.strip_prefix("/root") {
            PathBuf::from(format!("{home}{rest}"))
        } else {
            PathBuf::from(raw)
        }
    } else {
        PathBuf::from(shellexpand::tilde(raw).to_string())
    };
    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// Change the owner of `target` to match the owner of its parent directory.
/// In an unprivileged run the kernel refuses the chown and the current owner
/// is kept, which is the right outcome there.
pub fn adapt_owner(target: &Path) -> Result<()> {
    let Some(parent) = target.parent() else {
        return Ok(());
    };
    let meta = std::fs::metadata(parent)
        .with_context(|| format!("reading metadata of {}", parent.display()))?;
    match std::os::unix::fs::chown(target, Some(meta.uid()), Some(meta.gid())) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("adapting ownership of {}", target.display()))
        }
    }
}

/// Check that both configured directories exist and grant `flags` to the
/// current user. Run once per mode, before any side effect.
pub fn check_dirs(config: &Config, flags: AccessFlags) -> Result<(), SyncError> {
    let perm = if flags.contains(AccessFlags::W_OK) {
        "write"
    } else {
        "read"
    };
    for dir in [config.extension_root(), config.manifest_root()] {
        if !dir.exists() {
            return Err(SyncError::DirectoryMissing(dir));
        }
        if access(&dir, flags).is_err() {
            return Err(SyncError::AccessDenied(dir, perm));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::config::Config;
    use std::path::PathBuf;

    #[test]
    fn real_path_expands_tilde_to_absolute() {
        let path = real_path("~/foo/bar");
        assert!(path.is_absolute());
        assert!(path.ends_with("foo/bar"));
    }

    #[test]
    fn real_path_absolutizes_relative_paths() {
        assert!(real_path("relative/dir").is_absolute());
    }

    #[test]
    fn adapt_owner_keeps_owner_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("payload.crx");
        std::fs::write(&file, b"x").unwrap();
        adapt_owner(&file).unwrap();
        assert!(file.exists());
    }

    #[test]
    fn check_dirs_rejects_missing_directory() {
        let present = tempfile::tempdir().unwrap();
        let config = Config {
            extension_dir: "/nonexistent/crxsync-test".to_string(),
            manifest_dir: present.path().to_string_lossy().into_owned(),
            extensions: Vec::new(),
            path: PathBuf::new(),
        };
        let err = check_dirs(&config, AccessFlags::R_OK).unwrap_err();
        assert!(matches!(err, SyncError::DirectoryMissing(_)));
    }

    #[test]
    fn check_dirs_accepts_writable_directories() {
        let ext = tempfile::tempdir().unwrap();
        let man = tempfile::tempdir().unwrap();
        let config = Config {
            extension_dir: ext.path().to_string_lossy().into_owned(),
            manifest_dir: man.path().to_string_lossy().into_owned(),
            extensions: Vec::new(),
            path: PathBuf::new(),
        };
        check_dirs(&config, AccessFlags::W_OK).unwrap();
    }
}
