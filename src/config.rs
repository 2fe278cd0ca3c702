use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::albums::{AlbumAggregator, ThumbnailPolicy};
use crate::models::AlbumNames;
use crate::paging::PagingConfig;
use crate::platform::PlatformCapabilities;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "SHUTTER_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub platform: PlatformCapabilities,

    #[serde(default)]
    pub paging: PagingConfig,

    #[serde(default)]
    pub albums: AlbumsConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumsConfig {
    #[serde(default = "default_favorites_name")]
    pub favorites_name: String,

    #[serde(default = "default_trash_name")]
    pub trash_name: String,

    #[serde(default = "default_all_media_name")]
    pub all_media_name: String,

    /// Album name for folders the index has no display name for.
    #[serde(default = "default_device_model")]
    pub device_model: String,

    #[serde(default)]
    pub thumbnail_policy: ThumbnailPolicy,
}

fn default_favorites_name() -> String {
    "Favorites".to_string()
}

fn default_trash_name() -> String {
    "Trash".to_string()
}

fn default_all_media_name() -> String {
    "All media".to_string()
}

fn default_device_model() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().trim().to_string())
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Device".to_string())
}

impl Default for AlbumsConfig {
    fn default() -> Self {
        Self {
            favorites_name: default_favorites_name(),
            trash_name: default_trash_name(),
            all_media_name: default_all_media_name(),
            device_model: default_device_model(),
            thumbnail_policy: ThumbnailPolicy::default(),
        }
    }
}

impl AlbumsConfig {
    pub fn names(&self) -> AlbumNames {
        AlbumNames {
            favorites: self.favorites_name.clone(),
            trash: self.trash_name.clone(),
            all_media: self.all_media_name.clone(),
            device_model: self.device_model.clone(),
        }
    }

    pub fn aggregator(&self) -> AlbumAggregator {
        AlbumAggregator::new(self.names(), self.thumbnail_policy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shutter")
        .join("shutter.db")
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "gif".to_string(),
        "webp".to_string(),
        "heic".to_string(),
        "heif".to_string(),
        "bmp".to_string(),
        "dng".to_string(),
    ]
}

fn default_video_extensions() -> Vec<String> {
    vec![
        "mp4".to_string(),
        "mov".to_string(),
        "mkv".to_string(),
        "webm".to_string(),
        "3gp".to_string(),
        "avi".to_string(),
    ]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            video_extensions: default_video_extensions(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            platform: PlatformCapabilities::default(),
            paging: PagingConfig::default(),
            albums: AlbumsConfig::default(),
            scanner: ScannerConfig::default(),
        }
    }
}

impl Config {
    /// Load from `SHUTTER_CONFIG` or the default location, writing defaults
    /// there on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid config {}", config_path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            tracing::info!(path = %config_path.display(), "Wrote default config");
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shutter")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.paging, PagingConfig::default());
        assert!(config.platform.supports_atomic_trash_toggle);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.db_path, config.db_path);
        assert_eq!(reloaded.albums.device_model, config.albums.device_model);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
db_path = "/tmp/gallery.db"

[platform]
supports_atomic_trash_toggle = false

[paging]
page_size = 50

[albums]
trash_name = "Bin"
thumbnail_policy = "last_visited"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/gallery.db"));
        assert_eq!(config.platform, PlatformCapabilities::LEGACY);
        assert_eq!(config.paging.page_size, 50);
        assert_eq!(config.paging.initial_load_size, 100);
        assert_eq!(config.albums.names().trash, "Bin");
        assert_eq!(config.albums.names().favorites, "Favorites");
        assert_eq!(config.albums.thumbnail_policy, ThumbnailPolicy::LastVisited);
        assert!(config.scanner.video_extensions.contains(&"mp4".to_string()));
    }

    #[test]
    fn test_default_device_model_names_this_host() {
        let model = AlbumsConfig::default().device_model;
        assert!(!model.is_empty());
        assert_eq!(model, model.trim());
        if let Ok(host) = hostname::get() {
            let host = host.to_string_lossy().trim().to_string();
            if !host.is_empty() {
                assert_eq!(model, host);
            }
        }
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paging]\npage_size = \"many\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
