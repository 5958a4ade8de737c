//! Configuration for qmlsync.
//!
//! Values are layered with figment: built-in defaults, then a configuration
//! file, then `QMLSYNC_` environment variables. Nested keys are separated by
//! a double underscore, so `QMLSYNC_DATABASE__DRY_RUN=true` sets
//! `database.dry_run`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "QMLSYNC_";
/// Project part used when none is configured.
pub const DEFAULT_PROJECT_PART: &str = "default";

const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "qmlsync";
const APPLICATION: &str = "qmlsync";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "project-storage.db";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub project: ProjectConfig,
    pub watcher: WatcherConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the project storage.
    pub path: PathBuf,
    /// Log what would be written instead of writing it.
    pub dry_run: bool,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_database_path(), dry_run: false }
    }
}

/// The scope to keep in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub directories: Vec<PathBuf>,
    pub qmltypes: Vec<PathBuf>,
    pub project_part: String,
}
impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            qmltypes: Vec::new(),
            project_part: DEFAULT_PROJECT_PART.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// How long to wait for more file events before running a pass.
    pub coalesce_ms: u64,
}
impl Default for WatcherConfig {
    fn default() -> Self {
        Self { coalesce_ms: 200 }
    }
}
impl WatcherConfig {
    pub fn coalesce(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// An explicit `file` must exist. Without one, `config.toml` in the
    /// platform configuration directory is used if present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(file) = file
            && !file.is_file()
        {
            exn::bail!(ErrorKind::NotFound(file.to_path_buf()));
        }
        let file = file.map(Path::to_path_buf).or_else(default_config_file);
        let config: Self = Self::figment(file.as_deref())?
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Extract)?;
        config.validate()?;
        tracing::debug!(file = ?file, database = %config.database.path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Defaults with `file` merged on top. Environment variables are not
    /// included.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let Some(file) = file else {
            return Ok(figment);
        };
        let extension = file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file_exact(file)),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
            Some("json") => figment.merge(Json::file_exact(file)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
        })
    }

    pub fn validate(&self) -> Result<()> {
        require_absolute("database.path", &self.database.path)?;
        for directory in &self.project.directories {
            require_absolute("project.directories", directory)?;
        }
        for qmltypes in &self.project.qmltypes {
            require_absolute("project.qmltypes", qmltypes)?;
        }
        if self.project.project_part.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidValue("project.project_part"));
        }
        Ok(())
    }
}

fn require_absolute(field: &'static str, path: &Path) -> Result<()> {
    if !path.is_absolute() {
        exn::bail!(ErrorKind::RelativePath { field, path: path.to_path_buf() });
    }
    Ok(())
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
}

fn default_config_file() -> Option<PathBuf> {
    let file = project_dirs()?.config_dir().join(CONFIG_FILE);
    file.is_file().then_some(file)
}

fn default_database_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_local_dir().join(DATABASE_FILE),
        None => std::env::temp_dir().join(APPLICATION).join(DATABASE_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[rstest]
    #[case(".toml", "[project]\ndirectories = [\"/qml/M\"]\nproject_part = \"app\"\n[watcher]\ncoalesce_ms = 50\n")]
    #[case(".yaml", "project:\n  directories: [/qml/M]\n  project_part: app\nwatcher:\n  coalesce_ms: 50\n")]
    #[case(".json", r#"{"project": {"directories": ["/qml/M"], "project_part": "app"}, "watcher": {"coalesce_ms": 50}}"#)]
    fn test_file_formats(#[case] suffix: &str, #[case] contents: &str) {
        let file = file_with(suffix, contents);
        let config: Config = Config::figment(Some(file.path())).unwrap().extract().unwrap();
        assert_eq!(config.project.directories, vec![PathBuf::from("/qml/M")]);
        assert_eq!(config.project.project_part, "app");
        assert_eq!(config.watcher.coalesce(), Duration::from_millis(50));
        assert!(!config.database.dry_run);
    }

    #[test]
    fn test_defaults() {
        let config: Config = Config::figment(None).unwrap().extract().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.project.project_part, DEFAULT_PROJECT_PART);
        assert!(config.database.path.ends_with(DATABASE_FILE));
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/qmlsync.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let file = file_with(".ini", "[project]\n");
        let err = Config::figment(Some(file.path())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_relative_paths_are_rejected() {
        let mut config = Config::default();
        config.project.directories.push(PathBuf::from("qml/M"));
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::RelativePath { field: "project.directories", .. }));
    }

    #[test]
    fn test_empty_project_part() {
        let mut config = Config::default();
        config.project.project_part = " ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidValue("project.project_part")));
    }

    #[test]
    fn test_wrong_shape() {
        let file = file_with(".toml", "[watcher]\ncoalesce_ms = \"soon\"\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Extract));
    }
}
