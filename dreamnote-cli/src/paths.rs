//! Where Dream Note keeps its files.
//!
//! Locations follow the XDG base directory variables and fall back to the
//! usual defaults under the home directory when a variable is unset or empty.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{AppError, Result};

const APP_DIR: &str = "dreamdtb";

/// Resolved locations of every file the application touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub settings_file: PathBuf,
    pub database: PathBuf,
    pub log_file: PathBuf,
    /// Holds the bridge socket and the editor runtime files.
    pub runtime_dir: PathBuf,
}

impl AppPaths {
    /// Resolves paths from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(|name| std::env::var_os(name), dirs::home_dir(), std::env::temp_dir())
    }

    /// Resolves paths from an arbitrary variable lookup.
    pub fn resolve<F>(lookup: F, home: Option<PathBuf>, temp: PathBuf) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);
        let under_home = |var_name: &str, fallback: &[&str]| -> Result<PathBuf> {
            if let Some(dir) = var(var_name) {
                return Ok(dir);
            }
            let home = home.clone().ok_or_else(|| AppError::Config {
                message: format!("neither ${var_name} nor a home directory is available"),
            })?;
            Ok(fallback.iter().fold(home, |path, part| path.join(part)))
        };

        let config = under_home("XDG_CONFIG_HOME", &[".config"])?.join(APP_DIR);
        let data = under_home("XDG_DATA_HOME", &[".local", "share"])?.join(APP_DIR);
        let cache = under_home("XDG_CACHE_HOME", &[".cache"])?.join(APP_DIR);
        let runtime = var("XDG_RUNTIME_DIR").unwrap_or(temp).join(APP_DIR);

        Ok(Self {
            settings_file: config.join("settings.json"),
            database: data.join("dream.db"),
            log_file: cache.join("dream.log"),
            runtime_dir: runtime,
        })
    }

    /// Replaces the settings file location.
    pub fn with_settings_file(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.settings_file = path;
        }
        self
    }

    /// Replaces the database location.
    pub fn with_database(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.database = path;
        }
        self
    }

    /// Creates the parent directories of every location.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            parent(&self.settings_file),
            parent(&self.database),
            parent(&self.log_file),
            Some(self.runtime_dir.as_path()),
        ]
        .into_iter()
        .flatten()
        {
            fs::create_dir_all(dir)?;
            debug!("directory ready: {}", dir.display());
        }
        Ok(())
    }
}

fn parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn resolve(vars: &[(&str, &str)]) -> AppPaths {
        let vars: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        AppPaths::resolve(
            |name| vars.get(name).cloned(),
            Some(PathBuf::from("/home/reveur")),
            PathBuf::from("/tmp"),
        )
        .unwrap()
    }

    #[test]
    fn test_fallbacks_without_xdg() {
        let paths = resolve(&[]);
        assert_eq!(
            paths.settings_file,
            PathBuf::from("/home/reveur/.config/dreamdtb/settings.json")
        );
        assert_eq!(
            paths.database,
            PathBuf::from("/home/reveur/.local/share/dreamdtb/dream.db")
        );
        assert_eq!(
            paths.log_file,
            PathBuf::from("/home/reveur/.cache/dreamdtb/dream.log")
        );
        assert_eq!(paths.runtime_dir, PathBuf::from("/tmp/dreamdtb"));
    }

    #[test]
    fn test_xdg_variables_win() {
        let paths = resolve(&[
            ("XDG_CONFIG_HOME", "/x/config"),
            ("XDG_DATA_HOME", "/x/data"),
            ("XDG_CACHE_HOME", ""),
            ("XDG_RUNTIME_DIR", "/run/user/1000"),
        ]);
        assert_eq!(paths.settings_file, PathBuf::from("/x/config/dreamdtb/settings.json"));
        assert_eq!(paths.database, PathBuf::from("/x/data/dreamdtb/dream.db"));
        assert_eq!(
            paths.log_file,
            PathBuf::from("/home/reveur/.cache/dreamdtb/dream.log")
        );
        assert_eq!(paths.runtime_dir, PathBuf::from("/run/user/1000/dreamdtb"));
    }

    #[test]
    fn test_missing_home_is_an_error() {
        let result = AppPaths::resolve(|_| None, None, PathBuf::from("/tmp"));
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[test]
    fn test_overrides_and_ensure_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap().to_string();
        let paths = resolve(&[
            ("XDG_CONFIG_HOME", root.as_str()),
            ("XDG_DATA_HOME", root.as_str()),
            ("XDG_CACHE_HOME", root.as_str()),
            ("XDG_RUNTIME_DIR", root.as_str()),
        ])
        .with_database(Some(dir.path().join("elsewhere").join("my.db")))
        .with_settings_file(None);

        paths.ensure_dirs().unwrap();
        assert!(dir.path().join("elsewhere").is_dir());
        assert!(dir.path().join("dreamdtb").is_dir());
        assert_eq!(paths.database, dir.path().join("elsewhere/my.db"));
    }
}
