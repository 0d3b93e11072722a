use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use super::MANIFEST_EXT;
use super::error::SyncError;
use super::fsutil;

/// One desired extension as declared in the config file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExtensionRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ExtensionRef {
    /// Display label for status lines. Extensions declared without a name
    /// fall back to a shortened identifier prefix.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.id.chars().take(11).collect(),
        }
    }
}

/// Desired extension set plus the two directories the browser consults.
/// Loaded once per run and passed into every mode and worker; nothing reads
/// configuration from ambient state.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Directory the browser loads extension packages from (raw, unexpanded).
    pub extension_dir: String,
    /// Directory of the pointer manifests (raw, unexpanded).
    pub manifest_dir: String,
    #[serde(default)]
    pub extensions: Vec<ExtensionRef>,

    /// Where this config was loaded from, so scan mode can persist back.
    #[serde(skip)]
    pub path: PathBuf,
}

fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("unable to determine user config directory")?;
    Ok(dir.join("crxsync").join("config.toml"))
}

impl Config {
    /// Load the config from `path`, or from the default location when none is
    /// given. A missing config file is fatal: every mode depends on the
    /// desired set and directory paths it declares.
    pub fn load(path: Option<PathBuf>) -> Result<Config> {
        let cfg_path = match path {
            Some(p) => p,
            None => default_config_path()?,
        };
        if !cfg_path.exists() {
            return Err(SyncError::ConfigMissing(cfg_path).into());
        }
        let raw = fs::read_to_string(&cfg_path)
            .with_context(|| format!("reading config {}", cfg_path.display()))?;
        let mut config: Config = toml::from_str(&raw).context("parsing config toml")?;
        config.path = cfg_path;
        Ok(config)
    }

    /// Save the current config to disk (overwrites file).
    pub fn save(&self) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("serializing config to toml")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing config file {}", self.path.display()))?;
        Ok(())
    }

    /// Append an identifier discovered by scan mode, with no display name.
    pub fn add_unnamed(&mut self, id: String) {
        self.extensions.push(ExtensionRef { id, name: None });
    }

    /// Expanded absolute path of the extension package directory.
    pub fn extension_root(&self) -> PathBuf {
        fsutil::real_path(&self.extension_dir)
    }

    /// Expanded absolute path of the manifest directory.
    pub fn manifest_root(&self) -> PathBuf {
        fsutil::real_path(&self.manifest_dir)
    }

    /// Directory holding the payload(s) of one extension.
    pub fn extension_path(&self, id: &str) -> PathBuf {
        self.extension_root().join(id)
    }

    /// Pointer manifest path of one extension.
    pub fn manifest_path(&self, id: &str) -> PathBuf {
        self.manifest_root().join(format!("{id}.{MANIFEST_EXT}"))
    }

    /// The identifiers the desired set reconciles toward.
    pub fn desired_ids(&self) -> HashSet<&str> {
        self.extensions.iter().map(|e| e.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_declared_name() {
        let ext = ExtensionRef {
            id: "cjpalhdlnbpafiamejdnhcphjbkeiagm".to_string(),
            name: Some("uBlock Origin".to_string()),
        };
        assert_eq!(ext.display_name(), "uBlock Origin");
    }

    #[test]
    fn display_name_falls_back_to_id_prefix() {
        let ext = ExtensionRef {
            id: "cjpalhdlnbpafiamejdnhcphjbkeiagm".to_string(),
            name: None,
        };
        assert_eq!(ext.display_name(), "cjpalhdlnbp");
    }

    #[test]
    fn load_reports_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("config.toml"))).unwrap_err();
        assert!(err.to_string().contains("no config file found"));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            r#"
extension_dir = "/usr/share/inox/extensions"
manifest_dir = "/usr/share/inox/manifests"

[[extensions]]
id = "cjpalhdlnbpafiamejdnhcphjbkeiagm"
name = "uBlock Origin"

[[extensions]]
id = "pkehgijcmpdhfbdbbnkijodmdjhbjlgp"
"#,
        )
        .unwrap();

        let mut config = Config::load(Some(cfg_path.clone())).unwrap();
        assert_eq!(config.extensions.len(), 2);
        assert_eq!(config.extensions[1].name, None);

        config.add_unnamed("egnjhciaieeiiohknchakcodbpgjnchh".to_string());
        config.save().unwrap();

        let reloaded = Config::load(Some(cfg_path)).unwrap();
        assert_eq!(reloaded.extensions.len(), 3);
        assert_eq!(reloaded.extensions[2].id, "egnjhciaieeiiohknchakcodbpgjnchh");
        assert_eq!(reloaded.extensions[2].name, None);
        // declaration order survives the round trip
        assert_eq!(reloaded.extensions[0].name.as_deref(), Some("uBlock Origin"));
    }
}
