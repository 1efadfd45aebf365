//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every section and field is optional:
//!
//! ```toml
//! [stores]
//! transforms = 4096
//! cameras = 16
//! lights = 256
//! static_meshes = 4096
//!
//! [queue]
//! capacity = 256
//!
//! [loop]
//! max_delta_seconds = 0.1
//! tick_rate = 60        # omit to tick as fast as the render side allows
//! max_ticks = 1000      # omit to run until the window closes
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use duplex_shared::{
    DEFAULT_CAMERA_CAPACITY, DEFAULT_LIGHT_CAPACITY, DEFAULT_MAX_DELTA_SECONDS,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_STATIC_MESH_CAPACITY, DEFAULT_TRANSFORM_CAPACITY,
};

/// Largest slot count a store can address.
const MAX_STORE_CAPACITY: usize = u32::MAX as usize;

/// Errors from loading or validating an [`EngineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file `{}`: {source}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown or mistyped fields.
    #[error("invalid engine config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A store capacity is zero or too large to index.
    #[error("`{field}` must be between 1 and u32::MAX, got {value}")]
    InvalidCapacity {
        /// Offending field, e.g. `stores.lights`.
        field: &'static str,
        /// Configured value.
        value: usize,
    },

    /// The message rings need room for at least one message.
    #[error("`queue.capacity` must be at least 2, got {capacity}")]
    QueueTooSmall {
        /// Configured value.
        capacity: usize,
    },

    /// The delta clamp must be a positive, finite number of seconds.
    #[error("`loop.max_delta_seconds` must be positive and finite, got {value}")]
    InvalidDeltaClamp {
        /// Configured value.
        value: f32,
    },

    /// A tick rate of zero would never tick.
    #[error("`loop.tick_rate` must be greater than zero")]
    ZeroTickRate,
}

/// Pre-allocated slots per manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreCapacities {
    /// Transform slots.
    pub transforms: usize,
    /// Camera slots.
    pub cameras: usize,
    /// Light slots.
    pub lights: usize,
    /// Static mesh slots.
    pub static_meshes: usize,
}

impl Default for StoreCapacities {
    fn default() -> Self {
        Self {
            transforms: DEFAULT_TRANSFORM_CAPACITY,
            cameras: DEFAULT_CAMERA_CAPACITY,
            lights: DEFAULT_LIGHT_CAPACITY,
            static_meshes: DEFAULT_STATIC_MESH_CAPACITY,
        }
    }
}

/// Message ring sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Slots per direction (one less is usable).
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Main loop pacing and termination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// Upper bound for a tick's delta time, in seconds.
    pub max_delta_seconds: f32,
    /// Ticks per second to pace the simulation to. `None` ticks as soon as
    /// the previous tick has been published.
    pub tick_rate: Option<u32>,
    /// Stop after this many ticks. `None` runs until the window closes.
    pub max_ticks: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_delta_seconds: DEFAULT_MAX_DELTA_SECONDS,
            tick_rate: None,
            max_ticks: None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// `[stores]` section.
    pub stores: StoreCapacities,
    /// `[queue]` section.
    pub queue: QueueConfig,
    /// `[loop]` section.
    #[serde(rename = "loop")]
    pub main_loop: LoopConfig,
}

impl EngineConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, otherwise any error from
    /// [`validate`](Self::validate).
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Checks value ranges that TOML types alone cannot express.
    ///
    /// # Errors
    ///
    /// The first out-of-range field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let stores = [
            ("stores.transforms", self.stores.transforms),
            ("stores.cameras", self.stores.cameras),
            ("stores.lights", self.stores.lights),
            ("stores.static_meshes", self.stores.static_meshes),
        ];
        for (field, value) in stores {
            if value == 0 || value > MAX_STORE_CAPACITY {
                return Err(ConfigError::InvalidCapacity { field, value });
            }
        }

        if self.queue.capacity < 2 {
            return Err(ConfigError::QueueTooSmall {
                capacity: self.queue.capacity,
            });
        }

        let clamp = self.main_loop.max_delta_seconds;
        if !clamp.is_finite() || clamp <= 0.0 {
            return Err(ConfigError::InvalidDeltaClamp { value: clamp });
        }

        if self.main_loop.tick_rate == Some(0) {
            return Err(ConfigError::ZeroTickRate);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stores.transforms, DEFAULT_TRANSFORM_CAPACITY);
        assert_eq!(config.queue.capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.main_loop.max_ticks, None);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [stores]
            cameras = 2

            [loop]
            max_delta_seconds = 0.05
            max_ticks = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.stores.cameras, 2);
        assert_eq!(config.stores.lights, DEFAULT_LIGHT_CAPACITY);
        assert!((config.main_loop.max_delta_seconds - 0.05).abs() < f32::EPSILON);
        assert_eq!(config.main_loop.max_ticks, Some(500));
        assert_eq!(config.main_loop.tick_rate, None);
        assert_eq!(config.queue, QueueConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_toml_str("[stores]\nparticles = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = EngineConfig::from_toml_str("[stores]\nlights = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidCapacity { field: "stores.lights", value: 0 }
        ));
        assert!(err.to_string().contains("stores.lights"));
    }

    #[test]
    fn test_queue_too_small_rejected() {
        let err = EngineConfig::from_toml_str("[queue]\ncapacity = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::QueueTooSmall { capacity: 1 }));
    }

    #[test]
    fn test_delta_clamp_and_tick_rate_checked() {
        let err = EngineConfig::from_toml_str("[loop]\nmax_delta_seconds = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDeltaClamp { .. }));

        let err = EngineConfig::from_toml_str("[loop]\ntick_rate = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTickRate));
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("duplex-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.toml");
        std::fs::write(&path, "[queue]\ncapacity = 8\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.queue.capacity, 8);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/duplex/engine.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/duplex/engine.toml"));
    }
}
