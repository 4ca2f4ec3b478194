//! Configuration management for the reverse image search CLI.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.ris/config.yaml` in the workspace, or `RIS_CONFIG`)
//! - Environment variables (`RIS_*`)
//! - Command-line flags
//!
//! The index itself lives in `<workspace>/<index_dir>`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Extractor names accepted in configuration.
pub const KNOWN_EXTRACTORS: [&str; 2] = ["cedd", "color-histogram"];

/// Distance metric names accepted in configuration.
pub const KNOWN_METRICS: [&str; 3] = ["tanimoto", "euclidean", "chi-square"];

/// What the index does when a document with an existing identifier is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the stored document and report `DuplicateIdentifier`.
    #[default]
    Reject,
    /// Replace the stored descriptor.
    Overwrite,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "overwrite" => Ok(DuplicatePolicy::Overwrite),
            other => Err(AppError::Config(format!(
                "Unknown duplicate policy: {}. Supported: reject, overwrite",
                other
            ))),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory the index location is resolved against
    pub workspace: PathBuf,

    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// Name of the index directory inside the workspace
    pub index_dir: String,

    /// Descriptor extractor ("cedd", "color-histogram")
    pub extractor: String,

    /// Distance metric ("tanimoto", "euclidean", "chi-square")
    pub metric: String,

    /// Number of nearest images reported per probe
    pub max_hits: usize,

    /// Number of concurrent indexing / probe workers
    pub workers: usize,

    /// Recognized image file extensions (without the dot)
    pub extensions: Vec<String>,

    /// Behavior on identifier collisions
    pub duplicate_policy: DuplicatePolicy,

    /// Log level override
    pub log_level: Option<String>,

    /// Log line format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    index: Option<IndexSection>,
    search: Option<SearchSection>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexSection {
    dir: Option<String>,
    extractor: Option<String>,
    workers: Option<usize>,
    extensions: Option<Vec<String>>,
    duplicate_policy: Option<DuplicatePolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSection {
    metric: Option<String>,
    max_hits: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    format: Option<LogFormat>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            index_dir: "index".to_string(),
            extractor: "cedd".to_string(),
            metric: "tanimoto".to_string(),
            max_hits: 3,
            workers: 6,
            extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            duplicate_policy: DuplicatePolicy::Reject,
            log_level: None,
            log_format: LogFormat::Text,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `RIS_WORKSPACE`: Override workspace path
    /// - `RIS_CONFIG`: Path to config file
    /// - `RIS_INDEX_DIR`: Index directory name
    /// - `RIS_EXTRACTOR`: Descriptor extractor
    /// - `RIS_METRIC`: Distance metric
    /// - `RIS_MAX_HITS`: Hits per probe
    /// - `RIS_WORKERS`: Worker count
    /// - `RUST_LOG`: Log level
    /// - `RIS_LOG_FORMAT`: `text` or `json`
    /// - `NO_COLOR`: Disable colored output
    ///
    /// `workspace` and `config_file` come from the command line and take
    /// precedence over `RIS_WORKSPACE`/`RIS_CONFIG`; both have to be known
    /// before the config file can be located, so this is the only place the
    /// workspace is set.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| std::env::var_os("RIS_WORKSPACE").map(PathBuf::from)) {
            config.workspace = workspace;
        }

        if let Some(config_file) = config_file.or_else(|| std::env::var_os("RIS_CONFIG").map(PathBuf::from)) {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.workspace.join(".ris").join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
            config.config_file = Some(config_path);
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.merge_env()?;

        Ok(config)
    }

    /// Environment variables override the YAML config.
    fn merge_env(&mut self) -> AppResult<()> {
        if let Ok(dir) = std::env::var("RIS_INDEX_DIR") {
            self.index_dir = dir;
        }

        if let Ok(extractor) = std::env::var("RIS_EXTRACTOR") {
            self.extractor = extractor;
        }

        if let Ok(metric) = std::env::var("RIS_METRIC") {
            self.metric = metric;
        }

        if let Ok(max_hits) = std::env::var("RIS_MAX_HITS") {
            self.max_hits = parse_count("RIS_MAX_HITS", &max_hits)?;
        }

        if let Ok(workers) = std::env::var("RIS_WORKERS") {
            self.workers = parse_count("RIS_WORKERS", &workers)?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if let Ok(format) = std::env::var("RIS_LOG_FORMAT") {
            self.log_format = format.parse()?;
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(index) = config_file.index {
            if let Some(dir) = index.dir {
                result.index_dir = dir;
            }
            if let Some(extractor) = index.extractor {
                result.extractor = extractor;
            }
            if let Some(workers) = index.workers {
                result.workers = workers;
            }
            if let Some(extensions) = index.extensions {
                result.extensions = extensions;
            }
            if let Some(policy) = index.duplicate_policy {
                result.duplicate_policy = policy;
            }
        }

        if let Some(search) = config_file.search {
            if let Some(metric) = search.metric {
                result.metric = metric;
            }
            if let Some(max_hits) = search.max_hits {
                result.max_hits = max_hits;
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        index_dir: Option<String>,
        workers: Option<usize>,
        log_level: Option<String>,
        log_format: Option<LogFormat>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(index_dir) = index_dir {
            self.index_dir = index_dir;
        }

        if let Some(workers) = workers {
            self.workers = workers;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if let Some(log_format) = log_format {
            self.log_format = log_format;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the index directory.
    pub fn index_path(&self) -> PathBuf {
        self.workspace.join(&self.index_dir)
    }

    /// Validate value ranges and names.
    pub fn validate(&self) -> AppResult<()> {
        if self.workers == 0 {
            return Err(AppError::Config("workers must be at least 1".to_string()));
        }

        if self.max_hits == 0 {
            return Err(AppError::Config("max_hits must be at least 1".to_string()));
        }

        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(AppError::Config(
                "At least one image extension must be configured".to_string(),
            ));
        }

        if self.index_dir.trim().is_empty() {
            return Err(AppError::Config("index_dir must not be empty".to_string()));
        }

        if !KNOWN_EXTRACTORS.contains(&self.extractor.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown extractor: {}. Supported: {}",
                self.extractor,
                KNOWN_EXTRACTORS.join(", ")
            )));
        }

        if !KNOWN_METRICS.contains(&self.metric.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown metric: {}. Supported: {}",
                self.metric,
                KNOWN_METRICS.join(", ")
            )));
        }

        Ok(())
    }
}

fn parse_count(name: &str, value: &str) -> AppResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| AppError::Config(format!("Invalid value for {}: {:?} ({})", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.index_dir, "index");
        assert_eq!(config.extractor, "cedd");
        assert_eq!(config.metric, "tanimoto");
        assert_eq!(config.max_hits, 3);
        assert_eq!(config.workers, 6);
        assert_eq!(config.extensions, vec!["jpg", "jpeg", "png"]);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_index_path() {
        let config = AppConfig::default();
        assert!(config.index_path().ends_with("index"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("images-idx".to_string()),
            Some(2),
            None,
            Some(LogFormat::Json),
            true,
            false,
        );

        assert_eq!(config.index_dir, "images-idx");
        assert_eq!(config.workers, 2);
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_extractor() {
        let mut config = AppConfig::default();
        config.extractor = "sift".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown extractor"));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
index:
  dir: photos-index
  workers: 3
  extensions: [jpg, webp]
  duplicatePolicy: overwrite
search:
  metric: euclidean
  maxHits: 10
logging:
  level: warn
  format: json
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.index_dir, "photos-index");
        assert_eq!(merged.workers, 3);
        assert_eq!(merged.extensions, vec!["jpg", "webp"]);
        assert_eq!(merged.duplicate_policy, DuplicatePolicy::Overwrite);
        assert_eq!(merged.metric, "euclidean");
        assert_eq!(merged.max_hits, 10);
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.no_color);
        assert_eq!(merged.log_format, LogFormat::Json);
        // Untouched fields keep their defaults
        assert_eq!(merged.extractor, "cedd");
    }

    #[test]
    fn test_merge_yaml_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "index: [unclosed").unwrap();

        let err = AppConfig::default().merge_yaml(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_load_from_workspace_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".ris")).unwrap();
        std::fs::write(
            temp.path().join(".ris").join("config.yaml"),
            "search:\n  maxHits: 7\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.max_hits, 7);
        assert_eq!(
            config.config_file,
            Some(temp.path().join(".ris").join("config.yaml"))
        );
    }

    #[test]
    fn test_load_from_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let err = AppConfig::load_from(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("absent.yaml")),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let err = AppConfig::load_from(Some(PathBuf::from("/definitely/not/a/workspace")), None)
            .unwrap_err();
        assert!(err.to_string().contains("Workspace directory does not exist"));
    }

    #[test]
    fn test_duplicate_policy_from_str() {
        assert_eq!("Reject".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Reject);
        assert_eq!(
            "overwrite".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::Overwrite
        );
        assert!("merge".parse::<DuplicatePolicy>().is_err());
    }
}
