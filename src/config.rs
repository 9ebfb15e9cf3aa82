use std::net::SocketAddr;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::warn;

use crate::error::{FormError, Result};

/// Global timezone setting for the application
static APP_TIMEZONE: OnceLock<Tz> = OnceLock::new();

pub const DEFAULT_CONFIG_PATH: &str = "event-form.toml";
pub const DEFAULT_DATABASE_URL: &str = "sqlite:event-form.db?mode=rwc";
pub const CONFIG_PATH_VAR: &str = "EVENT_FORM_CONFIG";

/// Initialize the timezone from the given string
pub fn init_timezone(tz_str: &str) {
    let timezone: Tz = tz_str.parse().unwrap_or_else(|_| {
        warn!(timezone = tz_str, "invalid timezone, falling back to UTC");
        chrono_tz::UTC
    });

    if APP_TIMEZONE.set(timezone).is_err() {
        warn!("timezone already initialized");
    }
}

/// Get the configured timezone
pub fn get_timezone() -> Tz {
    *APP_TIMEZONE.get().unwrap_or(&chrono_tz::UTC)
}

/// Calendar date in the configured timezone. Read once per controller; widgets
/// never consult the clock themselves.
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&get_timezone()).date_naive()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timezone: String,
    pub database_url: String,
    pub bind_addr: String,
    pub debounce_ms: u64,
    pub storage_keys: StorageKeys,
    pub images: ImageLimits,
    pub description: DescriptionLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            debounce_ms: 200,
            storage_keys: StorageKeys::default(),
            images: ImageLimits::default(),
            description: DescriptionLimits::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    pub event_schedule: String,
    pub main_image: String,
    pub sub_images: String,
    pub activity_type: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            event_schedule: "event-schedule".to_string(),
            main_image: "main-image".to_string(),
            sub_images: "sub-images".to_string(),
            activity_type: "activity-type".to_string(),
        }
    }
}

impl StorageKeys {
    pub fn all(&self) -> [&str; 4] {
        [
            &self.event_schedule,
            &self.main_image,
            &self.sub_images,
            &self.activity_type,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImageLimits {
    pub main_max_bytes: u64,
    pub sub_max_bytes: u64,
    pub sub_max_count: usize,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            // Main image is stored inline as a data URL.
            main_max_bytes: 500 * 1024,
            sub_max_bytes: 15 * 1024 * 1024,
            sub_max_count: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DescriptionLimits {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for DescriptionLimits {
    fn default() -> Self {
        Self {
            min_chars: 8,
            max_chars: 800,
        }
    }
}

impl AppConfig {
    /// Reads the TOML file if it exists; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Loads the file named by `EVENT_FORM_CONFIG` (or the default path), then
    /// lets `DATABASE_URL` override the database.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = lookup(CONFIG_PATH_VAR).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|_| FormError::BindAddr(self.bind_addr.clone()))
    }
}
