//! Navigator configuration stored in `navigator.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "navigator.toml";

/// Navigator configuration (TOML).
///
/// Missing fields fall back to [`NavigatorConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NavigatorConfig {
    /// SQLite file holding routes, steps and landmarks.
    pub store_path: PathBuf,

    /// Delay between checks of the instruction source, in seconds.
    pub compile_poll_secs: u64,

    /// Delay between replay cycles, in seconds.
    pub replay_poll_secs: u64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("navigator.db"),
            compile_poll_secs: 10,
            replay_poll_secs: 10,
        }
    }
}

impl NavigatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(anyhow!("store_path must not be empty"));
        }
        if self.compile_poll_secs == 0 {
            return Err(anyhow!("compile_poll_secs must be > 0"));
        }
        if self.replay_poll_secs == 0 {
            return Err(anyhow!("replay_poll_secs must be > 0"));
        }
        Ok(())
    }

    pub fn compile_delay(&self) -> Duration {
        Duration::from_secs(self.compile_poll_secs)
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_secs(self.replay_poll_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `NavigatorConfig::default()`.
pub fn load_config(path: &Path) -> Result<NavigatorConfig> {
    if !path.exists() {
        let cfg = NavigatorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: NavigatorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &NavigatorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
