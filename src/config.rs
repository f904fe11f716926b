use std::{fs, path::Path};

use indoc::indoc;
use log::info;
use serde_derive::Deserialize;

use crate::error::ConfigError;

/// Written next to the binary on first start.
pub const DEFAULT_CONFIG: &str = indoc! {r#"
    [server]
    address = "0.0.0.0"
    port = 53785
    render_distance = 4
    load_margin = 1
    outbound_capacity = 128
    spawn = [0.5, 100.0, 0.5]
    pregen_radius = 6
    gen_threads = 4
    keep_alive_secs = 10

    [world]
    seed = 1337
    scale = 0.01
    octaves = 4
    lacunarity = 2.0
    falloff = 0.5
    amplitude = 24.0
    base_height = 64

    [client]
    lerp_delay_ms = 100
    mesh_threads = 2
    event_capacity = 1024
"#};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Radius in chunk columns of the square each client sees.
    pub render_distance: i32,
    /// Extra columns loaded around the render distance.
    pub load_margin: i32,
    pub outbound_capacity: usize,
    pub spawn: [f32; 3],
    pub pregen_radius: i32,
    pub gen_threads: usize,
    pub keep_alive_secs: u64,
}

impl ServerConfig {
    pub fn load_radius(&self) -> i32 {
        self.render_distance + self.load_margin
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: "0.0.0.0".to_string(),
            port: 53785,
            render_distance: 4,
            load_margin: 1,
            outbound_capacity: 128,
            spawn: [0.5, 100.0, 0.5],
            pregen_radius: 6,
            gen_threads: 4,
            keep_alive_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u32,
    pub scale: f64,
    pub octaves: i32,
    pub lacunarity: f64,
    pub falloff: f64,
    pub amplitude: f64,
    pub base_height: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            seed: 1337,
            scale: 0.01,
            octaves: 4,
            lacunarity: 2.0,
            falloff: 0.5,
            amplitude: 24.0,
            base_height: 64,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote entities are drawn this far in the past.
    pub lerp_delay_ms: u64,
    pub mesh_threads: usize,
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            lerp_delay_ms: 100,
            mesh_threads: 2,
            event_capacity: 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub world: WorldConfig,
    pub client: ClientConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Config, ConfigError> {
        if !Path::new(path).exists() {
            info!("No config found, writing defaults to {}", path);
            fs::write(path, DEFAULT_CONFIG)?;
        }

        let data = fs::read_to_string(path)?;
        Config::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str::<Config>(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_matches_defaults() {
        assert_eq!(Config::parse(DEFAULT_CONFIG).unwrap(), Config::default());
    }

    #[test]
    fn missing_keys_fall_back() {
        let config = Config::parse(indoc! {"
            [server]
            render_distance = 2
            load_margin = 0

            [world]
            seed = 42
        "})
        .unwrap();

        assert_eq!(config.server.load_radius(), 2);
        assert_eq!(config.server.port, 53785);
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.world.octaves, 4);
        assert_eq!(config.client, ClientConfig::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(
            Config::parse("[server]\nport = \"loud\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_writes_default_file() {
        let path = std::env::temp_dir().join(format!("voxelcraft-{}.toml", std::process::id()));
        let path = path.to_str().unwrap();
        let _ = fs::remove_file(path);

        assert_eq!(Config::load(path).unwrap(), Config::default());
        assert!(Path::new(path).exists());
        fs::remove_file(path).unwrap();
    }
}
