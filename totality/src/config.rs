use std::{env::Args, path::PathBuf};

use serde::Deserialize;
use shatter::{DestructibleConfig, EngineSettings};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

#[derive(Debug, Copy, Clone)]
pub struct ConfigPaths<'a> {
    pub base_path: &'a str,
}

pub const DEFAULT_CONFIGURATION_PATHS: ConfigPaths = ConfigPaths { base_path: "./.totality.toml" };

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {0:?}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("could not parse {0:?}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

/// Knobs for the scene the demo drives. Everything fracture related lives in the other sections.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub cube_size: f32,
    /// Cubes are laid out in a row along x.
    pub instance_count: usize,
    pub spacing: f32,
    pub frames: u64,
    pub frames_per_second: u32,
    pub physics_steps_per_second: u32,
    /// Frames between two chip hits.
    pub damage_interval: u64,
    pub damage: f32,
    pub explosion_frame: u64,
    pub explosion_radius: f32,
    pub explosion_force: f32,
    pub crash_frame: u64,
    pub crash_speed: f32,
    pub log_level: String,
}
impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            cube_size: 4.,
            instance_count: 3,
            spacing: 12.,
            frames: 600,
            frames_per_second: 120,
            physics_steps_per_second: 240,
            damage_interval: 20,
            damage: 60.,
            explosion_frame: 240,
            explosion_radius: 6.,
            explosion_force: 800.,
            crash_frame: 360,
            crash_speed: 25.,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSettings,
    pub destructible: DestructibleConfig,
    pub scene: SceneConfig,
}
impl Config {
    /// The first argument, if any, replaces the configuration file path.
    pub fn new(paths: ConfigPaths, mut args: Args) -> Result<Config, ConfigError> {
        let path = args
            .nth(1)
            .map_or_else(|| PathBuf::from(paths.base_path), PathBuf::from);
        if !path.exists() {
            info!("No configuration at {:?}, using defaults.", path);
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        Self::parse(&text).map_err(|e| ConfigError::Parse(path, e))
    }
    pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }
}
