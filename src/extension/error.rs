use std::path::PathBuf;
use thiserror::Error;

/// Whole-run failures checked before any worker is dispatched.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("configured directory {0} does not exist")]
    DirectoryMissing(PathBuf),

    #[error("missing {1} permission for {0}")]
    AccessDenied(PathBuf, &'static str),

    #[error(
        "no config file found at {0}; crxsync depends on a config file declaring the extension set and directories"
    )]
    ConfigMissing(PathBuf),
}
