use crate::manifest::{ContentKind, ContentType};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;

/// Host-facing settings, read once at startup.
///
/// The manager consults the platform and content filters while constructing
/// mods; the demo binary additionally uses the log level, refresh interval,
/// and seed search directories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostSettings {
    /// Platform identifier matched against manifest allowlists.
    pub platform: String,

    /// Content kinds this host is willing to manage.
    pub supported_content: Vec<ContentKind>,

    /// Log level handed to the tracing filter.
    pub log_level: String,

    /// Automatic refresh interval in seconds; 0 disables the timer.
    pub refresh_interval_secs: u64,

    /// Search directories registered at startup.
    pub search_directories: Vec<Utf8PathBuf>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            supported_content: vec![ContentKind::Code, ContentKind::Assets, ContentKind::Scenes],
            log_level: "info".to_string(),
            refresh_interval_secs: 0,
            search_directories: Vec::new(),
        }
    }
}

impl HostSettings {
    pub fn supported_content_type(&self) -> ContentType {
        ContentType::from_kinds(&self.supported_content)
    }
}

/// Loads and saves the YAML settings file (`modhost.yaml`).
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager rooted at the given directory, creating
    /// it if necessary.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {config_dir}"))?;
        }

        Ok(Self {
            settings_path: config_dir.join("modhost.yaml"),
            config_dir,
        })
    }

    /// Load settings, falling back to defaults when the file is absent.
    pub fn load_settings(&self) -> Result<HostSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(HostSettings::default());
        }

        let raw = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: HostSettings = serde_yaml_ng::from_str(&raw)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &HostSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
