//! Configuration loading and discovery.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `~/.config/licitacoes/config.<ext>` (user config)
//! 3. `.licitacoes.<ext>` then `licitacoes.<ext>` in the closest directory
//!    (walking up from the search root, stopping at a `.git` boundary)
//! 4. Explicit files (`--config`)
//! 5. `LICITACOES_*` environment variables, with `__` separating nested keys
//!    (`LICITACOES_NARRATIVE__MODEL=gemini-2.5-pro`)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`.
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use licitacoes_core::config::ConfigLoader;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let (config, _sources) = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! println!("dataset: {:?}", config.dataset);
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::record::FieldMapping;

/// Default Gemini model for narrative reports.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The configuration for licitacoes.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Path to the JSON record set. Relative paths resolve against the
    /// directory of the config file that was loaded.
    pub dataset: Option<Utf8PathBuf>,
    /// Column names the record fields are read from.
    pub columns: FieldMapping,
    /// Narrative generator settings.
    pub narrative: NarrativeConfig,
}

impl Config {
    /// Dataset path, resolved against `base` when relative.
    pub fn resolve_dataset(&self, base: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
        let path = self.dataset.as_ref()?;
        match base {
            Some(dir) if path.is_relative() => Some(dir.join(path)),
            _ => Some(path.clone()),
        }
    }
}

/// Narrative generator settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct NarrativeConfig {
    /// Whether `analyze` asks for a narrative at all.
    pub enabled: bool,
    /// Model name.
    pub model: String,
    /// REST endpoint, without the `/models/...` suffix.
    pub endpoint: String,
    /// API key. When unset, `GEMINI_API_KEY` is used.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl NarrativeConfig {
    /// Environment variable consulted when no API key is configured.
    pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

    /// The configured key, or `GEMINI_API_KEY`. Blank keys count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(Self::API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Which configuration files were loaded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigSources {
    /// Project config files from the closest directory, low→high precedence.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_files: Vec<Utf8PathBuf>,
    /// User config file from the XDG config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_file: Option<Utf8PathBuf>,
    /// Explicit config files (`--config`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigSources {
    /// Returns the highest-precedence config file that was loaded.
    pub fn primary_file(&self) -> Option<&Utf8Path> {
        self.explicit_files
            .last()
            .map(Utf8PathBuf::as_path)
            .or_else(|| self.project_files.last().map(Utf8PathBuf::as_path))
            .or(self.user_file.as_deref())
    }

    /// Directory of [`primary_file`](Self::primary_file).
    pub fn primary_dir(&self) -> Option<&Utf8Path> {
        self.primary_file().and_then(Utf8Path::parent)
    }
}

const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "licitacoes";

const ENV_PREFIX: &str = "LICITACOES_";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    project_search_root: Option<Utf8PathBuf>,
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/licitacoes/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set a boundary marker to stop directory traversal. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load. Later files take precedence.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<(Config, ConfigSources)> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let mut sources = ConfigSources::default();

        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
            sources.user_file = Some(user_config);
        }

        if let Some(ref root) = self.project_search_root {
            let project_configs = self.find_project_configs(root);
            for pc in &project_configs {
                figment = Self::merge_file(figment, pc);
            }
            sources.project_files = project_configs;
        }

        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }
        sources.explicit_files = self.explicit_files;

        // LICITACOES_DATASET=..., LICITACOES_COLUMNS__STATUS=..., etc.
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            dataset = ?config.dataset,
            "configuration loaded"
        );
        Ok((config, sources))
    }

    /// Config files from the closest directory that has any, dotfiles first.
    fn find_project_configs(&self, start: &Utf8Path) -> Vec<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            let mut found = Vec::new();
            for prefix in [".", ""] {
                for ext in CONFIG_EXTENSIONS {
                    let candidate = dir.join(format!("{prefix}{APP_NAME}.{ext}"));
                    if candidate.is_file() {
                        found.push(candidate);
                    }
                }
            }

            if !found.is_empty() {
                return found;
            }

            // Checked after the config files so a config next to the marker is found.
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
                && dir != start
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        Vec::new()
    }

    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let config_dir = user_config_dir()?;
        CONFIG_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("config.{ext}")))
            .find(|path| path.is_file())
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Get the user config directory path.
///
/// Returns `~/.config/licitacoes/` on Linux and the platform equivalent
/// elsewhere.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the local data directory path, used for default log files.
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serializes tests that mutate environment variables.
    static TEST_ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn utf8(path: std::path::PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::try_from(path).unwrap()
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.log_dir.is_none());
        assert!(config.dataset.is_none());
        assert_eq!(config.columns, FieldMapping::default());
        assert!(config.narrative.enabled);
        assert_eq!(config.narrative.model, DEFAULT_MODEL);
        assert_eq!(config.narrative.timeout_secs, 60);
    }

    #[test]
    fn loader_builds_with_defaults() {
        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .load()
            .unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(sources.primary_file().is_none());
    }

    #[test]
    fn single_file_overrides_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"log_level = "debug"
dataset = "/data/licitacoes_master.json"

[columns]
status = "Situação"

[narrative]
model = "gemini-2.5-pro"
timeout_secs = 5
"#,
        )
        .unwrap();

        let (config, _sources) = ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(config_path))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(
            config.dataset.as_deref().map(Utf8Path::as_str),
            Some("/data/licitacoes_master.json")
        );
        assert_eq!(config.columns.status, "Situação");
        // untouched columns keep their defaults
        assert_eq!(config.columns.object, "Objeto");
        assert_eq!(config.narrative.model, "gemini-2.5-pro");
        assert_eq!(config.narrative.timeout_secs, 5);
        assert!(config.narrative.enabled);
    }

    #[test]
    fn later_file_overrides_earlier() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base.toml");
        fs::write(&base, r#"log_level = "warn""#).unwrap();
        let over = tmp.path().join("override.toml");
        fs::write(&over, r#"log_level = "error""#).unwrap();

        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(base))
            .with_file(utf8(over.clone()))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(sources.primary_file(), Some(utf8(over).as_path()));
    }

    #[test]
    fn project_config_discovery() {
        let tmp = TempDir::new().unwrap();
        let project_dir = tmp.path().join("project");
        let sub_dir = project_dir.join("dados").join("2024");
        fs::create_dir_all(&sub_dir).unwrap();
        fs::write(project_dir.join(".licitacoes.toml"), r#"log_level = "debug""#).unwrap();

        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(utf8(sub_dir))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(sources.project_files.len(), 1);
    }

    #[test]
    fn boundary_marker_stops_search() {
        let tmp = TempDir::new().unwrap();
        let parent = tmp.path().join("parent");
        let child = parent.join("child");
        let work = child.join("work");
        fs::create_dir_all(&work).unwrap();
        fs::write(parent.join("licitacoes.toml"), r#"log_level = "warn""#).unwrap();
        fs::create_dir(child.join(".git")).unwrap();

        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .with_boundary_marker(".git")
            .with_project_search(utf8(work))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
        assert!(sources.project_files.is_empty());
    }

    #[test]
    fn dotfile_before_regular_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".licitacoes.toml"), r#"log_level = "debug""#).unwrap();
        fs::write(tmp.path().join("licitacoes.yaml"), "log_level: error\n").unwrap();

        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(utf8(tmp.path().to_path_buf()))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(sources.project_files.len(), 2);
    }

    #[test]
    fn explicit_file_overrides_project_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("licitacoes.toml"), r#"log_level = "warn""#).unwrap();
        let over = tmp.path().join("override.json");
        fs::write(&over, r#"{"log_level": "error"}"#).unwrap();

        let (config, sources) = ConfigLoader::new()
            .with_user_config(false)
            .without_boundary_marker()
            .with_project_search(utf8(tmp.path().to_path_buf()))
            .with_file(utf8(over))
            .load()
            .unwrap();

        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(sources.project_files.len(), 1);
        assert_eq!(sources.explicit_files.len(), 1);
    }

    #[test]
    fn invalid_value_is_a_deserialize_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "[narrative]\ntimeout_secs = \"soon\"\n").unwrap();

        let result = ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(path))
            .load();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn relative_dataset_resolves_against_config_dir() {
        let config = Config {
            dataset: Some(Utf8PathBuf::from("dados/licitacoes.json")),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_dataset(Some(Utf8Path::new("/srv/projeto"))),
            Some(Utf8PathBuf::from("/srv/projeto/dados/licitacoes.json"))
        );
        assert_eq!(
            config.resolve_dataset(None),
            Some(Utf8PathBuf::from("dados/licitacoes.json"))
        );

        let absolute = Config {
            dataset: Some(Utf8PathBuf::from("/data/x.json")),
            ..Config::default()
        };
        assert_eq!(
            absolute.resolve_dataset(Some(Utf8Path::new("/srv"))),
            Some(Utf8PathBuf::from("/data/x.json"))
        );
        assert!(Config::default().resolve_dataset(None).is_none());
    }

    #[test]
    fn columns_deserialize_from_yaml() {
        let yaml = r#"
columns:
  organization: "Órgão"
  location: "Cidade"
narrative:
  enabled: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.columns.organization, "Órgão");
        assert_eq!(config.columns.location, "Cidade");
        assert_eq!(config.columns.value, "Valor Licitação");
        assert!(!config.narrative.enabled);
    }

    #[test]
    fn api_key_is_never_serialized() {
        let config = Config {
            narrative: NarrativeConfig {
                api_key: Some("secret".to_string()),
                ..NarrativeConfig::default()
            },
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    #[allow(unsafe_code)]
    fn env_var_overrides_nested_fields() {
        let _lock = TEST_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[narrative]\nmodel = \"from-file\"\n").unwrap();

        // SAFETY: Test environment: mutex serializes env access across tests.
        unsafe {
            std::env::set_var("LICITACOES_NARRATIVE__MODEL", "from-env");
            std::env::set_var("LICITACOES_DATASET", "/env/licitacoes.json");
        }

        let result = ConfigLoader::new()
            .with_user_config(false)
            .with_file(utf8(path))
            .load();

        // SAFETY: Cleanup after test.
        unsafe {
            std::env::remove_var("LICITACOES_NARRATIVE__MODEL");
            std::env::remove_var("LICITACOES_DATASET");
        }

        let (config, _sources) = result.unwrap();
        assert_eq!(config.narrative.model, "from-env");
        assert_eq!(
            config.dataset.as_deref().map(Utf8Path::as_str),
            Some("/env/licitacoes.json")
        );
    }

    #[test]
    #[allow(unsafe_code)]
    fn api_key_falls_back_to_environment() {
        let _lock = TEST_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        // SAFETY: Test environment: mutex serializes env access across tests.
        unsafe {
            std::env::set_var(NarrativeConfig::API_KEY_ENV, "env-key");
        }

        let from_env = NarrativeConfig::default().resolved_api_key();
        let configured = NarrativeConfig {
            api_key: Some("file-key".to_string()),
            ..NarrativeConfig::default()
        }
        .resolved_api_key();
        let blank = NarrativeConfig {
            api_key: Some("   ".to_string()),
            ..NarrativeConfig::default()
        }
        .resolved_api_key();

        // SAFETY: Cleanup after test.
        unsafe {
            std::env::remove_var(NarrativeConfig::API_KEY_ENV);
        }

        assert_eq!(from_env.as_deref(), Some("env-key"));
        assert_eq!(configured.as_deref(), Some("file-key"));
        assert!(blank.is_none());
    }

    #[test]
    fn user_config_dir_names_the_app() {
        if let Some(path) = user_config_dir() {
            assert!(path.as_str().contains("licitacoes"));
        }
    }
}
