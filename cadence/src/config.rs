//! Engine configuration.
//!
//! Configuration lives in an INI file. Every key is optional; missing keys
//! take the defaults below, malformed values are rejected with the section
//! and key that caused the problem.
//!
//! ```ini
//! [cache]
//! ttl_ms = 300000
//! sweep_interval_ms = 60000
//!
//! [sampler]
//! sample_window_ms = 1000
//!
//! [quality]
//! fps_good_threshold = 58
//! fps_drop_threshold = 55
//! fps_medium_threshold = 45
//! max_frame_drops = 5
//!
//! [tracker]
//! visibility_margin = 0px 0px -50% 0px
//! thresholds = 0,0.25,0.5,0.75,1
//! offset_px = 100
//! throttle_ms = 100
//! strategy = auto
//!
//! [scroll]
//! duration_ms = 800
//! easing = easeInOutCubic
//!
//! [monitor]
//! capacity = 1000
//! ```

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::cache::{DEFAULT_CACHE_TTL_MS, DEFAULT_SWEEP_INTERVAL_MS};
use crate::quality::{QualityPolicy, SamplerConfig};
use crate::scroll::{Easing, ScrollConfig};
use crate::section_tracker::{TrackerConfig, TrackingStrategy};
use crate::telemetry::DEFAULT_MONITOR_CAPACITY;

/// Known keys per section, used to warn about typos.
const KNOWN_KEYS: &[(&str, &[&str])] = &[
    ("cache", &["ttl_ms", "sweep_interval_ms"]),
    ("sampler", &["sample_window_ms"]),
    (
        "quality",
        &[
            "fps_good_threshold",
            "fps_drop_threshold",
            "fps_medium_threshold",
            "max_frame_drops",
        ],
    ),
    (
        "tracker",
        &["visibility_margin", "thresholds", "offset_px", "throttle_ms", "strategy"],
    ),
    ("scroll", &["duration_ms", "easing"]),
    ("monitor", &["capacity"]),
];

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    /// A key holds a value that cannot be used.
    #[error("Invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(section: &str, key: &str, value: &str, reason: impl Display) -> Self {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Cache lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entry lifetime.
    pub ttl: Duration,
    /// Period of the shared cleanup sweep.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
        }
    }
}

/// Telemetry buffer size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MONITOR_CAPACITY,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub sampler: SamplerConfig,
    pub quality: QualityPolicy,
    pub tracker: TrackerConfig,
    pub scroll: ScrollConfig,
    pub monitor: MonitorConfig,
}

impl EngineConfig {
    /// Load configuration from an INI file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini_str(&contents)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        warn_unknown_keys(&ini);

        let mut config = Self::default();
        let reader = IniReader { ini: &ini };

        if let Some(ms) = reader.positive_u64("cache", "ttl_ms")? {
            config.cache.ttl = Duration::from_millis(ms);
        }
        if let Some(ms) = reader.positive_u64("cache", "sweep_interval_ms")? {
            config.cache.sweep_interval = Duration::from_millis(ms);
        }

        if let Some(ms) = reader.positive_u64("sampler", "sample_window_ms")? {
            config.sampler.sample_window = Duration::from_millis(ms);
        }

        if let Some(fps) = reader.fps("quality", "fps_good_threshold")? {
            config.quality.fps_good_threshold = fps;
        }
        if let Some(fps) = reader.fps("quality", "fps_drop_threshold")? {
            config.sampler.fps_drop_threshold = fps;
        }
        if let Some(fps) = reader.fps("quality", "fps_medium_threshold")? {
            config.quality.fps_medium_threshold = fps;
        }
        if let Some(drops) = reader.parse::<u32>("quality", "max_frame_drops")? {
            config.sampler.max_frame_drops = drops;
        }

        if let Some(margin) = reader.raw("tracker", "visibility_margin") {
            config.tracker.visibility.root_margin = margin.trim().to_string();
        }
        if let Some(value) = reader.raw("tracker", "thresholds") {
            config.tracker.visibility.thresholds = parse_thresholds(value)
                .map_err(|reason| ConfigError::invalid("tracker", "thresholds", value, reason))?;
        }
        if let Some(offset) = reader.parse::<f64>("tracker", "offset_px")? {
            if !offset.is_finite() {
                return Err(ConfigError::invalid(
                    "tracker",
                    "offset_px",
                    &offset.to_string(),
                    "must be finite",
                ));
            }
            config.tracker.offset_px = offset;
        }
        if let Some(ms) = reader.parse::<u64>("tracker", "throttle_ms")? {
            config.tracker.throttle = Duration::from_millis(ms);
        }
        if let Some(strategy) = reader.parse::<TrackingStrategy>("tracker", "strategy")? {
            config.tracker.strategy = strategy;
        }

        if let Some(ms) = reader.parse::<u64>("scroll", "duration_ms")? {
            config.scroll.duration = Duration::from_millis(ms);
        }
        if let Some(easing) = reader.parse::<Easing>("scroll", "easing")? {
            config.scroll.easing = easing;
        }

        if let Some(capacity) = reader.positive_u64("monitor", "capacity")? {
            config.monitor.capacity = capacity as usize;
        }

        Ok(config)
    }

    /// Render the configuration as INI text.
    pub fn to_ini_string(&self) -> String {
        let thresholds = self
            .tracker
            .visibility
            .thresholds
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut ini = Ini::new();
        ini.with_section(Some("cache"))
            .set("ttl_ms", millis(self.cache.ttl))
            .set("sweep_interval_ms", millis(self.cache.sweep_interval));
        ini.with_section(Some("sampler"))
            .set("sample_window_ms", millis(self.sampler.sample_window));
        ini.with_section(Some("quality"))
            .set("fps_good_threshold", self.quality.fps_good_threshold.to_string())
            .set("fps_drop_threshold", self.sampler.fps_drop_threshold.to_string())
            .set("fps_medium_threshold", self.quality.fps_medium_threshold.to_string())
            .set("max_frame_drops", self.sampler.max_frame_drops.to_string());
        ini.with_section(Some("tracker"))
            .set("visibility_margin", self.tracker.visibility.root_margin.clone())
            .set("thresholds", thresholds)
            .set("offset_px", self.tracker.offset_px.to_string())
            .set("throttle_ms", millis(self.tracker.throttle))
            .set("strategy", self.tracker.strategy.as_str());
        ini.with_section(Some("scroll"))
            .set("duration_ms", millis(self.scroll.duration))
            .set("easing", self.scroll.easing.as_str());
        ini.with_section(Some("monitor"))
            .set("capacity", self.monitor.capacity.to_string());

        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = ini.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Default location of the configuration file
/// (`~/.config/cadence/config.ini` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cadence").join("config.ini"))
}

fn millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}

fn parse_thresholds(value: &str) -> Result<Vec<f64>, String> {
    let mut thresholds = Vec::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let threshold: f64 = part
            .parse()
            .map_err(|_| format!("'{part}' is not a number"))?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(format!("{threshold} is outside [0, 1]"));
        }
        thresholds.push(threshold);
    }
    if thresholds.is_empty() {
        return Err("at least one threshold is required".to_string());
    }
    Ok(thresholds)
}

fn warn_unknown_keys(ini: &Ini) {
    for (section, properties) in ini.iter() {
        let Some(section) = section else {
            continue;
        };
        let known = KNOWN_KEYS
            .iter()
            .find(|(name, _)| *name == section)
            .map(|(_, keys)| *keys);
        match known {
            None => tracing::warn!(section, "Unknown config section ignored"),
            Some(keys) => {
                for (key, _) in properties.iter() {
                    if !keys.contains(&key) {
                        tracing::warn!(section, key, "Unknown config key ignored");
                    }
                }
            }
        }
    }
}

struct IniReader<'a> {
    ini: &'a Ini,
}

impl<'a> IniReader<'a> {
    fn raw(&self, section: &str, key: &str) -> Option<&'a str> {
        self.ini.section(Some(section)).and_then(|props| props.get(key))
    }

    fn parse<T>(&self, section: &str, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.raw(section, key) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::invalid(section, key, value, e)),
        }
    }

    fn positive_u64(&self, section: &str, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.parse::<u64>(section, key)? {
            Some(0) => Err(ConfigError::invalid(section, key, "0", "must be greater than 0")),
            other => Ok(other),
        }
    }

    fn fps(&self, section: &str, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.parse::<f64>(section, key)? {
            Some(fps) if !fps.is_finite() || fps < 0.0 => Err(ConfigError::invalid(
                section,
                key,
                &fps.to_string(),
                "must be a non-negative number",
            )),
            other => Ok(other),
        }
    }
}
