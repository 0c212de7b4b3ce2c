use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use harvester_engine::{AtomicFileWriter, CrawlSettings, FetchSettings, PersistError, DEFAULT_API_BASE};
use harvester_logging::{harvest_info, harvest_warn};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "harvester.ron";

/// Everything the `harvester.ron` file can set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawl: CrawlSettings,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub api_base: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_bytes: u64,
    /// Overrides the built-in user agent when set.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            max_bytes: defaults.max_bytes,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn fetch_settings(&self) -> FetchSettings {
        let defaults = FetchSettings::default();
        FetchSettings {
            api_base: self.api_base.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_bytes,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            ..defaults
        }
    }
}

/// Read the config file at `path`. A missing file yields the defaults; an
/// unreadable or invalid one is reported and also yields the defaults.
pub fn load_config(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return AppConfig::default();
        }
        Err(err) => {
            harvest_warn!("Failed to read config from {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            harvest_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            harvest_warn!("Failed to parse config from {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}

/// Write `config` to `path` as pretty RON, replacing any existing file.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_CONFIG_FILE);

    let content = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::new())
        .map_err(|err| PersistError::Io(std::io::Error::other(err.to_string())))?;
    AtomicFileWriter::new(dir).write_with(filename, |out| -> Result<(), PersistError> {
        out.write_all(content.as_bytes())?;
        Ok(())
    })?;
    Ok(())
}
