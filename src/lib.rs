//! # Vivarium
//!
//! Energy-driven 2D ecosystem simulator with evolvable creature bodies.
//!
//! ## Features
//!
//! - **Open-ended**: body plans, part layouts and brains all evolve
//! - **Procedural bodies**: outlines grown from genome segment chains
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vivarium::{World, Config};
//!
//! // Create world with default config
//! let config = Config::default();
//! let mut world = World::new_with_seed(config, 42);
//!
//! // Run simulation
//! world.run(1000);
//!
//! // Check results
//! println!("Population: {}", world.population());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use vivarium::Config;
//!
//! let mut config = Config::default();
//! config.world.seed_animals = 200;
//! config.energy.sunlight = 0.12;
//! ```
//!
//! ## Genome exchange
//!
//! ```rust,no_run
//! use vivarium::Genome;
//!
//! let text = std::fs::read_to_string("genome.json").unwrap();
//! let genome = Genome::from_json_str(&text).unwrap();
//! ```

pub mod config;
pub mod creature;
pub mod genome;
pub mod neural;
pub mod parts;
pub mod skeleton;
pub mod spatial;
pub mod stats;
pub mod util;
pub mod world;

// Re-export main types
pub use config::Config;
pub use creature::Creature;
pub use genome::{Genome, GenomeError};
pub use world::World;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(steps: u64, seed: u64) -> BenchmarkResult {
    use std::time::Instant;

    let config = Config::default();
    let mut world = World::new_with_seed(config, seed);
    let initial_population = world.population();

    let start = Instant::now();
    world.run(steps);
    let elapsed = start.elapsed();

    BenchmarkResult {
        steps,
        initial_population,
        final_population: world.population(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64(),
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(
            f,
            "Population: {} -> {}",
            self.initial_population, self.final_population
        )?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_simulation() {
        let mut config = Config::default();
        config.world.world_radius = 200.0;
        config.world.seed_animals = 5;
        let mut world = World::new_with_seed(config, 17);

        world.run(20);

        assert_eq!(world.time, 20);
    }
}
