//! Configuration system for the simulation.
//!
//! Supports YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    pub physics: PhysicsConfig,
    pub energy: EnergyConfig,
    pub logging: LoggingConfig,
}

/// World/environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Radius of the inhabited disc
    pub world_radius: f64,
    /// Broad-phase grid cell size
    pub cell_size: f64,
    /// Animals seeded at startup
    pub seed_animals: usize,
    /// Plants seeded per sqrt unit of world radius
    pub plant_density: f64,
    /// Population ceiling above which plants stop dividing
    pub max_food: usize,
}

/// Motion and integration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Pull toward the world center per unit distance
    pub gravity: f64,
    /// Velocity damping factor per squared speed
    pub linear_damping: f64,
    /// Spin damping per step
    pub angular_damping: f64,
    /// Brownian jitter magnitude (applied at 1/100 scale)
    pub brownian_noise: f64,
    /// Speed ceiling per axis
    pub max_velocity: f64,
    /// Spin ceiling
    pub max_angular_velocity: f64,
}

/// Energy economy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConfig {
    /// Photosynthesis income for a perfectly still plant
    pub sunlight: f64,
    /// Death threshold as a fraction of max energy
    pub min_energy_fraction: f64,
    /// Global metabolic cost multiplier
    pub living_cost: f64,
    /// Flat per-creature cost term
    pub base_creature_cost: f64,
    /// Cost per unit of body radius
    pub radius_cost: f64,
    /// Multiplier on summed part upkeep
    pub parts_cost: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Steps between stats logging
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            physics: PhysicsConfig::default(),
            energy: EnergyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_radius: 2400.0,
            cell_size: 75.0,
            seed_animals: 120,
            plant_density: 50.0,
            max_food: 5000,
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.000001,
            linear_damping: 0.02,
            angular_damping: 0.04,
            brownian_noise: 15.0,
            max_velocity: 6.0,
            max_angular_velocity: 0.3,
        }
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            sunlight: 0.09,
            min_energy_fraction: 0.2,
            living_cost: 0.30,
            base_creature_cost: 0.08,
            radius_cost: 0.005,
            parts_cost: 0.15,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.world.world_radius <= 0.0 {
            return Err("world_radius must be > 0".to_string());
        }
        if self.world.cell_size <= 0.0 {
            return Err("cell_size must be > 0".to_string());
        }
        if self.physics.max_velocity <= 0.0 || self.physics.max_angular_velocity <= 0.0 {
            return Err("velocity limits must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.energy.min_energy_fraction) {
            return Err("min_energy_fraction must be in [0, 1)".to_string());
        }
        if !(0.0..1.0).contains(&self.physics.linear_damping)
            || !(0.0..1.0).contains(&self.physics.angular_damping)
        {
            return Err("damping factors must be in [0, 1)".to_string());
        }
        Ok(())
    }
}
