//! Statistics tracking for the simulation.

use crate::creature::Creature;
use serde::{Deserialize, Serialize};

/// Statistics snapshot for a simulation step
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Current simulation time
    pub time: u64,
    /// Total population count
    pub population: usize,
    /// Living plants
    pub plants: usize,
    /// Living animals
    pub animals: usize,
    /// Mean energy across animals
    pub animal_energy_mean: f64,
    /// Total energy held by plants
    pub plant_energy_total: f64,
    /// Mean brain size (parameters) across animals
    pub brain_mean: f64,
    /// Largest brain (parameters)
    pub brain_max: usize,
    /// Mean mutation rate across animals
    pub mutation_rate_mean: f64,
    /// Births this step
    pub births: usize,
    /// Deaths this step
    pub deaths: usize,
    /// Steps per second (performance)
    pub steps_per_second: f64,
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats from current simulation state
    pub fn update(&mut self, creatures: &[Creature]) {
        self.population = creatures.len();
        self.plants = creatures.iter().filter(|c| c.is_plant()).count();
        self.animals = self.population - self.plants;

        self.plant_energy_total = creatures
            .iter()
            .filter(|c| c.is_plant())
            .map(|c| c.energy)
            .sum();

        if self.animals == 0 {
            self.animal_energy_mean = 0.0;
            self.brain_mean = 0.0;
            self.brain_max = 0;
            self.mutation_rate_mean = 0.0;
        } else {
            let n = self.animals as f64;

            self.animal_energy_mean = creatures
                .iter()
                .filter(|c| !c.is_plant())
                .map(|c| c.energy)
                .sum::<f64>()
                / n;

            let brains: Vec<usize> = creatures
                .iter()
                .filter_map(|c| c.as_animal())
                .filter_map(|a| a.genome.net.as_ref())
                .map(|net| net.parameter_count())
                .collect();
            self.brain_mean = brains.iter().sum::<usize>() as f64 / n;
            self.brain_max = brains.into_iter().max().unwrap_or(0);

            self.mutation_rate_mean = creatures
                .iter()
                .filter_map(|c| c.as_animal())
                .map(|a| a.genome.mutation_rate)
                .sum::<f64>()
                / n;
        }
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:6} | Plants:{:5} | Animals:{:4} | Energy:{:.0} | Brain:{:.1} | Mut:{:.3}",
            self.time,
            self.plants,
            self.animals,
            self.animal_energy_mean,
            self.brain_mean,
            self.mutation_rate_mean,
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval
    pub interval: u64,
}

impl StatsHistory {
    /// Create new history with recording interval
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval,
        }
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Get population over time
    pub fn population_series(&self) -> Vec<(u64, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.time, s.population))
            .collect()
    }

    /// Get animal count over time
    pub fn animal_series(&self) -> Vec<(u64, usize)> {
        self.snapshots.iter().map(|s| (s.time, s.animals)).collect()
    }

    /// Save history to file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_stats_update() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let creatures = vec![
            Creature::plant(1, 0.0, 0.0, &mut rng),
            Creature::plant(2, 10.0, 0.0, &mut rng),
            Creature::animal(3, 20.0, 0.0, Genome::create_default(&mut rng), &mut rng),
        ];

        let mut stats = Stats::new();
        stats.update(&creatures);

        assert_eq!(stats.population, 3);
        assert_eq!(stats.plants, 2);
        assert_eq!(stats.animals, 1);
        assert_eq!(stats.animal_energy_mean, 1250.0);
        assert_eq!(stats.plant_energy_total, 200.0);
        assert!(stats.brain_max > 0);
    }

    #[test]
    fn test_stats_empty_world() {
        let mut stats = Stats::new();
        stats.update(&[]);
        assert_eq!(stats.population, 0);
        assert_eq!(stats.brain_mean, 0.0);
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new(10);

        for i in 0..5 {
            let mut stats = Stats::new();
            stats.time = i * 10;
            stats.population = (i + 1) as usize * 100;
            history.record(stats);
        }

        let series = history.population_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], (0, 100));
        assert_eq!(series[4], (40, 500));
    }
}
