use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_LOCATION: &str = "Düsseldorf";
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DATABASE_FILE: &str = "weather_data.db";

/// Pipeline configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// location = "Düsseldorf"
/// database_path = "/var/lib/weather/weather_data.db"
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// OpenWeather API key. Never logged.
    pub api_key: Option<String>,

    /// Location identifier sent to the API, e.g. "Düsseldorf" or "Düsseldorf,DE".
    pub location: String,

    /// SQLite file; falls back to the platform data directory.
    pub database_path: Option<PathBuf>,

    pub base_url: String,

    /// Bound for the HTTP call and for waiting on a locked database.
    pub timeout_secs: u64,

    /// Reject responses whose city name does not match `location`.
    ///
    /// Matching ignores only letter case and a `,country` suffix. Set this to
    /// `false` when the API spells the city differently from the query
    /// (e.g. "München" comes back as "Munich").
    pub verify_location: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            location: DEFAULT_LOCATION.to_string(),
            database_path: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_location: true,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("location", &self.location)
            .field("database_path", &self.database_path)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("verify_location", &self.verify_location)
            .finish()
    }
}

impl Config {
    /// Returns the API key or an error telling the operator how to set it.
    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weather configure` or set WEATHER_API_KEY."
            )
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Database file to use, resolving the platform default when unset.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }

    /// Load config from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Load config from `path`, or return defaults if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Apply `WEATHER_*` environment variables on top of the file values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, keyed by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("WEATHER_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(location) = lookup("WEATHER_LOCATION") {
            self.location = location;
        }
        if let Some(path) = lookup("WEATHER_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("WEATHER_BASE_URL") {
            self.base_url = url;
        }
        if let Some(secs) = lookup("WEATHER_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid WEATHER_TIMEOUT_SECS value: {secs}"))?;
        }
        Ok(())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weather-task", "weather-cli")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.api_key().unwrap_err();

        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let cfg = Config { api_key: Some("   ".into()), ..Config::default() };
        assert!(cfg.api_key().is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("WEATHER_API_KEY", "ENV_KEY"),
            ("WEATHER_LOCATION", "Berlin"),
            ("WEATHER_DB_PATH", "/tmp/w.db"),
            ("WEATHER_TIMEOUT_SECS", "3"),
        ]);

        let mut cfg = Config { api_key: Some("FILE_KEY".into()), ..Config::default() };
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.api_key().unwrap(), "ENV_KEY");
        assert_eq!(cfg.location, "Berlin");
        assert_eq!(cfg.database_path().unwrap(), PathBuf::from("/tmp/w.db"));
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn invalid_timeout_override_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_overrides(|k| (k == "WEATHER_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();

        assert!(err.to_string().contains("WEATHER_TIMEOUT_SECS"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let cfg = Config { api_key: Some("SECRET".into()), ..Config::default() };
        let dbg = format!("{cfg:?}");

        assert!(!dbg.contains("SECRET"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = Config {
            api_key: Some("KEY".into()),
            location: "Köln".into(),
            database_path: Some(dir.path().join("w.db")),
            ..Config::default()
        };
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"KEY\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key().unwrap(), "KEY");
        assert_eq!(loaded.location, DEFAULT_LOCATION);
        assert_eq!(loaded.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(loaded.verify_location);
    }
}
