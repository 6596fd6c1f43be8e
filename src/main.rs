//! Vivarium - CLI Entry Point
//!
//! Energy-driven ecosystem simulator with evolvable creature bodies.

use clap::{Parser, Subcommand};
use vivarium::{benchmark, Config, Genome, World};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "vivarium")]
#[command(version)]
#[command(about = "Energy-driven ecosystem simulator with evolvable creature bodies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of steps to simulate
        #[arg(short, long, default_value = "10000")]
        steps: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Genome file (JSON) to inject into the starting population
        #[arg(short, long)]
        genome: Option<PathBuf>,

        /// Stats history output file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of steps
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Generate a random valid genome and write it as JSON
    Export {
        /// Output path
        #[arg(short, long, default_value = "genome.json")]
        output: PathBuf,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Validate a genome file and describe its body plan
    Inspect {
        /// Genome file (JSON)
        genome: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            seed,
            genome,
            output,
            quiet,
        } => run_simulation(config, steps, seed, genome, output, quiet),

        Commands::Benchmark { steps, seed } => run_benchmark(steps, seed),

        Commands::Init { output } => generate_config(output),

        Commands::Export { output, seed } => export_genome(output, seed),

        Commands::Inspect { genome } => inspect_genome(genome),
    }
}

fn run_simulation(
    config_path: PathBuf,
    steps: u64,
    seed: Option<u64>,
    genome_path: Option<PathBuf>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let config = if config_path.exists() {
        println!("Loading config from: {:?}", config_path);
        Config::from_file(&config_path)?
    } else {
        println!("Using default configuration");
        Config::default()
    };

    // Create world
    let mut world = if let Some(s) = seed {
        println!("Using seed: {}", s);
        World::new_with_seed(config.clone(), s)
    } else {
        World::new(config.clone())
    };

    // Inject an imported genome into the starting population
    if let Some(path) = genome_path {
        let text = std::fs::read_to_string(&path)?;
        let genome = Genome::from_json_str(&text)?;
        let id = world.spawn_animal(0.0, 0.0, genome);
        world.rebuild_hash();
        println!("Injected genome from {:?} as creature {}", path, id);
    }

    println!("Starting simulation");
    println!("  Initial population: {}", world.population());
    println!("  World radius: {}", config.world.world_radius);
    println!("  Steps: {}", steps);
    println!();

    let start = Instant::now();
    let stats_interval = config.logging.stats_interval.max(1);

    for _ in 0..steps {
        world.step();

        if world.time % stats_interval == 0 {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                world.stats.steps_per_second = world.time as f64 / elapsed;
            }
            world.record_stats();
            if !quiet {
                println!("{}", world.stats.summary());
            }
        }

        if world.population() == 0 {
            println!("\nPopulation extinct at step {}", world.time);
            break;
        }
    }

    let elapsed = start.elapsed();
    let steps_per_sec = world.time as f64 / elapsed.as_secs_f64();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Steps: {}", world.time);
    println!("Speed: {:.1} steps/s", steps_per_sec);
    println!("Final population: {}", world.population());

    // Save stats history
    if let Some(stats_path) = output {
        world.record_stats();
        world
            .stats_history
            .save(&stats_path.to_string_lossy())?;
        println!("Stats history: {:?}", stats_path);
    }

    Ok(())
}

fn run_benchmark(steps: u64, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Vivarium Benchmark ===");
    println!("Steps: {}", steps);
    println!("Seed: {}", seed);
    println!();

    let result = benchmark(steps, seed);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn export_genome(output: PathBuf, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    use rand::SeedableRng;
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);

    // Random plans can fail validation; retry until one passes
    let genome = loop {
        let candidate = Genome::create_random(&mut rng);
        if candidate.validate() {
            break candidate;
        }
    };

    std::fs::write(&output, genome.to_json_string()?)?;
    println!("Genome saved to: {:?}", output);
    Ok(())
}

fn inspect_genome(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&path)?;
    let genome = Genome::from_json_str(&text)?;

    println!("=== Genome ===");
    println!("File: {:?}", path);
    println!("Radial repeats: {}", genome.radial_repeats);
    println!("Mirrored: {}", genome.mirror);
    println!("Body segments: {}", genome.body_segments.len());
    for seg in &genome.body_segments {
        println!("  d={:.2} r={:.2}", seg.distance, seg.radius);
    }
    println!("Parts: {}", genome.parts.len());
    for part in &genome.parts {
        println!(
            "  {:?} slot={} repeat={} tilt={:.2} size={:.2}",
            part.kind, part.slot, part.repeat, part.tilt, part.size
        );
    }
    let (inputs, outputs) = genome.calculate_net_size();
    println!("Network: {} inputs, {} outputs", inputs, outputs);
    println!("Hue: {:.1}", genome.hue);
    println!("Max energy: {:.0}", genome.max_energy);
    println!("Mutation rate: {:.3}", genome.mutation_rate);

    Ok(())
}
