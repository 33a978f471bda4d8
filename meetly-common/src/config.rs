//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. A missing file or
//! missing keys never stop a binary from starting: compiled defaults are used
//! and a warning is logged.
//!
//! Root folder priority order:
//! 1. Command-line argument
//! 2. `MEETLY_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML file
//! 4. OS-dependent compiled default

use crate::db::init::DATABASE_FILE_NAME;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MEETLY_ROOT_FOLDER";

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "meetly.toml";

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
        }
    }
}

fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("meetly"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\meetly"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("meetly"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/meetly"))
    } else {
        // ~/.local/share/meetly
        dirs::data_local_dir()
            .map(|d| d.join("meetly"))
            .unwrap_or_else(|| PathBuf::from("./meetly_data"))
    }
}

/// Default location of `meetly.toml` (`~/.config/meetly/meetly.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("meetly").join(CONFIG_FILE_NAME))
}

/// Contents of `meetly.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub server: ServerSection,
    pub livekit: LiveKitSection,
    pub tracker: TrackerSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

impl ServerSection {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL clients use to reach this server
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Media-room (LiveKit) credentials used to sign room tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveKitSection {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    pub token_ttl_secs: u64,
}

impl Default for LiveKitSection {
    fn default() -> Self {
        Self {
            url: "ws://localhost:7880".to_string(),
            api_key: "devkey".to_string(),
            api_secret: "secret".to_string(),
            token_ttl_secs: 6 * 60 * 60,
        }
    }
}

/// Duration tracking periods for the server checkpoint and the client session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSection {
    pub checkpoint_interval_secs: u64,
    /// Seconds without a client refresh before a session counts as disconnected
    pub presence_timeout_secs: u64,
    pub tick_interval_ms: u64,
    pub refresh_interval_secs: u64,
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            checkpoint_interval_secs: 30,
            presence_timeout_secs: crate::db::participants::DEFAULT_PRESENCE_TIMEOUT_SECS,
            tick_interval_ms: 1000,
            refresh_interval_secs: 10,
        }
    }
}

impl TomlConfig {
    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using defaults");
                return Ok(Self::default());
            }
        };

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }
}

/// Resolves the root folder holding the database and client state
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
            config_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_config(mut self, config: &TomlConfig) -> Self {
        self.config_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("[{}] Root folder: {} (command line)", self.module_name, path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                info!("[{}] Root folder: {} ({})", self.module_name, path, ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.config_root {
            info!("[{}] Root folder: {} (config file)", self.module_name, path.display());
            return path.clone();
        }

        let path = CompiledDefaults::for_current_platform().root_folder;
        info!("[{}] Root folder: {} (default)", self.module_name, path.display());
        path
    }
}

/// Prepares a resolved root folder for use
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the folder (and parents). Safe to call repeatedly.
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            debug!("Creating root folder {}", self.root.display());
        }
        std::fs::create_dir_all(&self.root).map_err(|e| {
            Error::Config(format!("Failed to create root folder {}: {}", self.root.display(), e))
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
