//! Configuration management for the Amesp calculator.
//!
//! Settings are read from INI files with the following precedence:
//!
//! 1. Local configuration (`./amesp_config.cfg`)
//! 2. User configuration (`~/.config/amesp/amesp_config.cfg`)
//! 3. Built-in defaults
//!
//! The `AMESP_COMMAND` environment variable overrides the configured engine
//! executable. Everything is resolved once by [`SettingsManager::load`] and
//! then passed explicitly to the calculator.
//!
//! # Configuration File Format
//!
//! ```ini
//! [engine]
//! command = amesp PREFIX.aip PREFIX.aop
//! label = amesp
//! directory = .
//!
//! [logging]
//! level = info
//! ```
//!
//! `PREFIX` in the command is replaced by the job label when the engine runs.

use configparser::ini::Ini;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the engine executable.
pub const COMMAND_ENV: &str = "AMESP_COMMAND";

/// Engine command used when nothing else is configured.
pub const DEFAULT_COMMAND: &str = "amesp PREFIX.aip PREFIX.aop";

/// Name of the configuration file searched for.
pub const CONFIG_FILE: &str = "amesp_config.cfg";

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Engine invocation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Command line; `PREFIX` is replaced by the job label
    pub command: String,
    /// Base name of the `.aip` / `.aop` files
    pub label: String,
    /// Working directory for the calculation
    pub directory: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            label: "amesp".to_string(),
            directory: PathBuf::from("."),
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log level filter (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Converts the configured level into a `log` filter.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

/// All program settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// Engine invocation
    pub engine: EngineSettings,
    /// Logging
    pub logging: LoggingSettings,
}

impl Settings {
    /// Applies the `AMESP_COMMAND` override, if `value` is set.
    ///
    /// The variable names the executable; the file arguments are appended.
    pub fn apply_command_override(&mut self, value: Option<&str>) {
        if let Some(exe) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.engine.command = format!("{} PREFIX.aip PREFIX.aop", exe);
            debug!("Engine command overridden by {}: {}", COMMAND_ENV, self.engine.command);
        }
    }
}

/// Loads and holds resolved settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads settings from configuration files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        let mut candidates = Vec::new();
        if let Some(user_path) = Self::get_user_config_path() {
            candidates.push(("user", user_path));
        }
        candidates.push(("local", PathBuf::from(CONFIG_FILE)));

        // later candidates override earlier ones
        for (kind, path) in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_config(&path, settings.clone()) {
                Ok(loaded) => {
                    settings = loaded;
                    config_source = format!("{} config ({})", kind, path.display());
                    debug!("Loaded {} configuration from: {}", kind, path.display());
                }
                Err(e) => warn!("Failed to load {} config from {}: {}", kind, path.display(), e),
            }
        }

        settings.apply_command_override(env::var(COMMAND_ENV).ok().as_deref());
        info!("Configuration loaded from: {}", config_source);
        Ok(Self {
            settings,
            config_source,
        })
    }

    /// Builds a manager from a single file on top of the built-in defaults.
    ///
    /// The environment is not consulted.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = Self::load_config(path, Settings::default())?;
        Ok(Self {
            settings,
            config_source: path.display().to_string(),
        })
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the engine settings.
    pub fn engine(&self) -> &EngineSettings {
        &self.settings.engine
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    fn get_user_config_path() -> Option<PathBuf> {
        env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("amesp")
                .join(CONFIG_FILE)
        })
    }

    /// Loads one INI file on top of `base`.
    fn load_config(path: &Path, base: Settings) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut ini = Ini::new();
        ini.read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let mut settings = base;
        let map = ini.get_map_ref();
        if let Some(engine) = map.get("engine") {
            Self::parse_engine(engine, &mut settings.engine)?;
        }
        if let Some(logging) = map.get("logging") {
            Self::parse_logging(logging, &mut settings.logging)?;
        }
        Ok(settings)
    }

    fn parse_engine(
        section: &HashMap<String, Option<String>>,
        engine: &mut EngineSettings,
    ) -> Result<(), ConfigError> {
        if let Some(Some(command)) = section.get("command") {
            if command.trim().is_empty() {
                return Err(ConfigError::InvalidValue("engine command is empty".into()));
            }
            engine.command = command.trim().to_string();
        }
        if let Some(Some(label)) = section.get("label") {
            if label.trim().is_empty() {
                return Err(ConfigError::InvalidValue("engine label is empty".into()));
            }
            engine.label = label.trim().to_string();
        }
        if let Some(Some(directory)) = section.get("directory") {
            engine.directory = PathBuf::from(directory.trim());
        }
        Ok(())
    }

    fn parse_logging(
        section: &HashMap<String, Option<String>>,
        logging: &mut LoggingSettings,
    ) -> Result<(), ConfigError> {
        if let Some(Some(level)) = section.get("level") {
            let level = level.trim().to_lowercase();
            if level.parse::<log::LevelFilter>().is_err() {
                return Err(ConfigError::InvalidValue(format!("Invalid log level: {}", level)));
            }
            logging.level = level;
        }
        Ok(())
    }
}
