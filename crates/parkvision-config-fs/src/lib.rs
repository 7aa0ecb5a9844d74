// SPDX-License-Identifier: Apache-2.0
//! Filesystem-backed `ConfigStore` for the parkvision server (uses the
//! platform config directory).
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions
)]

use directories::ProjectDirs;
use parkvision_coordinator::config::{ConfigError, ConfigStore};
use std::fs;
use std::path::PathBuf;

/// Store configs as JSON files under the platform config directory, one file
/// per key (e.g. `config.json`, `versions.json`).
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g.,
    /// `~/.config/parkvision`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "parkvision", "parkvision")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        let base = proj.config_dir().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let filename = format!("{key}.json");
        self.base.join(filename)
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let path = self.path_for(key);
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn path_for_appends_json_extension() {
        let store = FsConfigStore { base: PathBuf::from("/tmp/parkvision-test-config") };
        assert_eq!(store.path_for("config"), PathBuf::from("/tmp/parkvision-test-config/config.json"));
    }

    #[test]
    fn missing_key_reports_not_found() {
        let dir = std::env::temp_dir().join(format!("parkvision-config-fs-test-{}", std::process::id()));
        let store = FsConfigStore { base: dir.clone() };
        match store.load_raw("nonexistent") {
            Err(ConfigError::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn save_then_load_round_trips_bytes() {
        let dir = std::env::temp_dir().join(format!("parkvision-config-fs-test-rt-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let store = FsConfigStore { base: dir.clone() };
        store.save_raw("versions", b"{\"detect\":3}").unwrap();
        let loaded = store.load_raw("versions").unwrap();
        assert_eq!(loaded, b"{\"detect\":3}");
        let _ = fs::remove_dir_all(dir);
    }
}
