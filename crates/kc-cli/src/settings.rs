//! Runtime configuration, read from an optional TOML file and `KC_*`
//! environment variables.
//!
//! ```toml
//! store_path = "~/.local/share/kc/store.db"
//! host       = "127.0.0.1"
//! port       = 5240
//!
//! [allocator]
//! capacity            = 128
//! low_water           = 32
//! max_refill_attempts = 3
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `KC_ALLOCATOR__CAPACITY=256`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use kc_repository::AllocatorConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub store_path: PathBuf,
  pub host:       String,
  pub port:       u16,
  pub allocator:  AllocatorConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.local/share/kc/store.db"),
      host:       "127.0.0.1".into(),
      port:       5240,
      allocator:  AllocatorConfig::default(),
    }
  }
}

impl Settings {
  /// Load settings from `path` (which may be absent) overlaid with the
  /// environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("KC")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read configuration")?;

    let mut settings: Settings = raw
      .try_deserialize()
      .context("failed to deserialise Settings")?;
    settings
      .allocator
      .validate()
      .context("invalid allocator configuration")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_config(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("kc-settings-{}.toml", kc_core::Id::random()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn missing_file_gives_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/kc.toml")).unwrap();
    assert_eq!(settings.allocator, AllocatorConfig::default());
    assert_eq!(settings.port, 5240);
  }

  #[test]
  fn file_values_override_defaults() {
    let path = write_config(
      r#"
store_path = "/tmp/kc-test/store.db"
port = 9000

[allocator]
capacity = 16
low_water = 4
"#,
    );
    let settings = Settings::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(settings.store_path, PathBuf::from("/tmp/kc-test/store.db"));
    assert_eq!(settings.port, 9000);
    assert_eq!(settings.host, "127.0.0.1");
    assert_eq!(settings.allocator.capacity, 16);
    assert_eq!(settings.allocator.max_refill_attempts, 3);
  }

  #[test]
  fn invalid_allocator_is_rejected() {
    let path = write_config("[allocator]\ncapacity = 8\nlow_water = 8\n");
    let result = Settings::load(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(result.is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/kc/store.db")),
      PathBuf::from(home).join("kc/store.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }
}
