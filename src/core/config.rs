/*
 * Persisted settings of the archiver bridge: the format registry, the archiver
 * executable paths and a few runner options. They are stored as one pretty
 * printed JSON file in the per-user local configuration directory.
 *
 * A missing file is not an error; the built-in defaults are returned instead.
 */
use super::archiver_config::{ArchiverConfig, ArchiverSettings};
use super::format_registry::{FormatRecord, FormatRegistry, default_formats};
use super::tool_runner::DEFAULT_WAIT_TIMEOUT;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILENAME: &str = "pack_settings.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    NoProjectDirectory,
    Serde(serde_json::Error),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::NoProjectDirectory => {
                write!(f, "Could not determine the configuration directory")
            }
            ConfigError::Serde(e) => write!(f, "Configuration file format error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            ConfigError::NoProjectDirectory => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_wait_timeout_ms() -> u64 {
    DEFAULT_WAIT_TIMEOUT.as_millis() as u64
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackSettings {
    #[serde(rename = "Formats")]
    pub formats: Vec<FormatRecord>,
    #[serde(rename = "Archivers")]
    pub archivers: Vec<ArchiverSettings>,
    #[serde(rename = "Spawn Helper", default)]
    pub spawn_helper: Option<PathBuf>,
    #[serde(rename = "Legacy Code Pages", default)]
    pub legacy_code_pages: bool,
    #[serde(rename = "Wait Timeout Ms", default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

impl Default for PackSettings {
    fn default() -> Self {
        PackSettings {
            formats: default_formats(),
            archivers: ArchiverConfig::new().archivers().to_vec(),
            spawn_helper: None,
            legacy_code_pages: false,
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

impl PackSettings {
    /*
     * Registry built from the saved formats. A saved list the registry rejects
     * (e.g. duplicate extensions) is replaced by the defaults.
     */
    pub fn registry(&self) -> FormatRegistry {
        match FormatRegistry::new(self.formats.clone()) {
            Ok(registry) => registry,
            Err(err) => {
                log::warn!("PackSettings: Saved formats rejected ({err}), using defaults.");
                FormatRegistry::with_defaults()
            }
        }
    }

    pub fn archiver_config(&self) -> ArchiverConfig {
        ArchiverConfig::from_saved(&self.archivers)
    }

    pub fn set_archiver_config(&mut self, config: &ArchiverConfig) {
        self.archivers = config.archivers().to_vec();
    }
}

/*
 * Local (non-roaming) configuration directory of `app_name`, created on first
 * use.
 */
pub fn app_config_dir(app_name: &str) -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", app_name)?;
    let dir = dirs.config_local_dir();
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(dir) {
            log::error!("ConfigManager: Failed to create config directory {dir:?}: {e}");
            return None;
        }
        log::debug!("ConfigManager: Created config directory {dir:?}");
    }
    Some(dir.to_path_buf())
}

pub fn load_settings_from(path: &Path) -> Result<PackSettings> {
    if !path.exists() {
        log::debug!("ConfigManager: {path:?} does not exist, using defaults.");
        return Ok(PackSettings::default());
    }
    let reader = BufReader::new(File::open(path)?);
    let settings: PackSettings = serde_json::from_reader(reader)?;
    log::debug!(
        "ConfigManager: Loaded {} format(s) and {} archiver(s) from {path:?}.",
        settings.formats.len(),
        settings.archivers.len()
    );
    Ok(settings)
}

pub fn save_settings_to(path: &Path, settings: &PackSettings) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, settings)?;
    log::debug!("ConfigManager: Saved settings to {path:?}.");
    Ok(())
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_settings(&self, app_name: &str) -> Result<PackSettings>;
    fn save_settings(&self, app_name: &str, settings: &PackSettings) -> Result<()>;
}

pub struct CoreConfigManager {}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {}
    }

    fn settings_path(app_name: &str) -> Result<PathBuf> {
        app_config_dir(app_name)
            .map(|dir| dir.join(SETTINGS_FILENAME))
            .ok_or(ConfigError::NoProjectDirectory)
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    fn load_settings(&self, app_name: &str) -> Result<PackSettings> {
        log::trace!("CoreConfigManager: Loading settings for app '{app_name}'");
        load_settings_from(&Self::settings_path(app_name)?)
    }

    fn save_settings(&self, app_name: &str, settings: &PackSettings) -> Result<()> {
        log::trace!("CoreConfigManager: Saving settings for app '{app_name}'");
        save_settings_to(&Self::settings_path(app_name)?, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join(SETTINGS_FILENAME)).unwrap();
        assert_eq!(settings, PackSettings::default());
        assert_eq!(settings.wait_timeout_ms, 15000);
    }

    #[test]
    fn test_saved_file_uses_registry_key_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        save_settings_to(&path, &PackSettings::default()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        for key in [
            "\"Extension List\"",
            "\"Packer Supported\"",
            "\"Packer Index\"",
            "\"Unpacker Index\"",
            "\"Packer UID\"",
            "\"Packer Executable\"",
            "\"Use Packer Executable To Unpack\"",
        ] {
            assert!(text.contains(key), "missing {key}");
        }
    }

    #[test]
    fn test_round_trip_keeps_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        let mut settings = PackSettings::default();
        settings.formats.push(FormatRecord::new("7z", false, 0, 1));
        let mut archivers = settings.archiver_config();
        archivers.set_packer_exe(1, Some("/opt/rar/rar"));
        settings.set_archiver_config(&archivers);
        settings.legacy_code_pages = true;
        save_settings_to(&path, &settings).unwrap();

        let loaded = load_settings_from(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.archiver_config().packer_exe(1), Some("/opt/rar/rar"));
        assert_eq!(loaded.registry().pack_is_archive("x.7z"), settings.formats.len());
    }

    #[test]
    fn test_optional_fields_default_when_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, r#"{ "Formats": [], "Archivers": [] }"#).unwrap();
        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.spawn_helper, None);
        assert_eq!(settings.wait_timeout_ms, 15000);
        assert_eq!(settings.archiver_config(), ArchiverConfig::new());
    }

    #[test]
    fn test_rejected_formats_fall_back_to_defaults() {
        let settings = PackSettings {
            formats: vec![FormatRecord::new("rar", true, 1, 1), FormatRecord::new("rar", true, 1, 1)],
            ..PackSettings::default()
        };
        assert_eq!(settings.registry().formats(), FormatRegistry::with_defaults().formats());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_settings_from(&path), Err(ConfigError::Serde(_))));
    }

    #[test]
    fn test_core_config_manager_save_and_load() {
        let unique_app_name = format!("TestApp_PackBridge_{}", rand::random::<u128>());
        let manager = CoreConfigManager::new();
        let mut settings = PackSettings::default();
        settings.spawn_helper = Some(PathBuf::from("/usr/local/bin/pack-spawn"));
        manager.save_settings(&unique_app_name, &settings).unwrap();
        assert_eq!(manager.load_settings(&unique_app_name).unwrap(), settings);

        if let Some(dir) = app_config_dir(&unique_app_name) {
            assert!(dir.join(SETTINGS_FILENAME).exists());
            if let Err(e) = fs::remove_dir_all(&dir) {
                eprintln!("Test cleanup failed for {dir:?}: {e}");
            }
        }
    }
}
