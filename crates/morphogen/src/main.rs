use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use morphogen::commands;
use morphogen::{MorphogenConfig, CONFIG_FILE};
use morphogen_core::{StopSignal, WriteMode};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (default: morphogen.ron in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for every random draw, overrides the configuration
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create, render and view single robots
    Robot {
        #[command(subcommand)]
        action: RobotAction,
    },
    /// Run the evolution loop
    Evo {
        #[command(subcommand)]
        action: EvoAction,
    },
    /// Maintain DNA files
    Dna {
        #[command(subcommand)]
        action: DnaAction,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum RobotAction {
    /// Spark a random robot and write its DNA and URDF
    Create {
        #[arg(long)]
        species: String,

        /// Genes in the new strand
        #[arg(long, default_value = "4")]
        gene_count: usize,

        /// Replace the species file instead of appending to it
        #[arg(long)]
        override_dna: bool,

        /// Output folder (default: paths.robots)
        #[arg(long)]
        out_folder: Option<PathBuf>,
    },
    /// Write the URDF of a stored individual
    Render {
        #[arg(long)]
        species: String,

        /// Line of the species file, counting from zero
        #[arg(long, default_value = "0")]
        individual: usize,

        /// Folder holding the DNA file (default: paths.robots)
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Run a stored individual in the kinematic simulator
    View {
        #[arg(long)]
        species: String,

        #[arg(long, default_value = "0")]
        individual: usize,

        #[arg(long)]
        folder: Option<PathBuf>,

        /// Steps to simulate, runs until Ctrl-C when omitted
        #[arg(long)]
        steps: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum EvoAction {
    /// Evolve generation 0 from random DNA
    Genesis,
    /// Continue from the latest saved generation
    Iterate {
        #[arg(long, default_value = "1")]
        generations: usize,
    },
}

#[derive(Subcommand, Debug)]
enum DnaAction {
    /// Remove duplicate strands, keeping first occurrences
    Dedup {
        #[arg(long)]
        species: String,

        #[arg(long)]
        folder: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Target file (default: morphogen.ron)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Writing the defaults must not depend on a loadable configuration
    if let Command::Config {
        action: ConfigAction::Init { path, force },
    } = &args.command
    {
        let path = path.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        return commands::init_config(&path, *force);
    }

    let mut config = MorphogenConfig::load_from(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(seed) = args.seed {
        config.evolution.seed = Some(seed);
    }

    match args.command {
        Command::Robot { action } => run_robot(&config, action),
        Command::Evo { action } => run_evo(&config, action),
        Command::Dna {
            action: DnaAction::Dedup { species, folder },
        } => {
            let folder = folder.unwrap_or_else(|| config.paths.robots.clone());
            let removed = commands::dedup_dna(&species, &folder)?;
            println!("Removed {} duplicate strands from {}", removed, species);
            Ok(())
        }
        Command::Config { .. } => Ok(()),
    }
}

fn run_robot(config: &MorphogenConfig, action: RobotAction) -> anyhow::Result<()> {
    match action {
        RobotAction::Create {
            species,
            gene_count,
            override_dna,
            out_folder,
        } => {
            let folder = out_folder.unwrap_or_else(|| config.paths.robots.clone());
            let mode = if override_dna {
                WriteMode::Overwrite
            } else {
                WriteMode::Append
            };
            let mut rng = match config.evolution.seed {
                Some(seed) => Xoshiro256StarStar::seed_from_u64(seed),
                None => Xoshiro256StarStar::seed_from_u64(rand::random()),
            };
            let (dna_path, urdf_path) =
                commands::create_robot(config, &mut rng, &species, gene_count, mode, &folder)?;
            println!("DNA:  {}", dna_path.display());
            println!("URDF: {}", urdf_path.display());
        }
        RobotAction::Render {
            species,
            individual,
            folder,
        } => {
            let folder = folder.unwrap_or_else(|| config.paths.robots.clone());
            let path = commands::render_robot(config, &species, individual, &folder)?;
            println!("URDF: {}", path.display());
        }
        RobotAction::View {
            species,
            individual,
            folder,
            steps,
        } => {
            let folder = folder.unwrap_or_else(|| config.paths.robots.clone());
            let stop = StopSignal::new();
            let handler_stop = stop.clone();
            ctrlc::set_handler(move || {
                log::info!("Shutdown signal received...");
                handler_stop.stop();
            })
            .context("Failed to install Ctrl-C handler")?;

            let report =
                commands::view_robot(config, &species, individual, &folder, steps, stop)?;
            println!(
                "{} travelled {:.4} in {} steps{}{}",
                species,
                report.distance,
                report.outcome.steps_completed,
                if report.lethal { " (lethal)" } else { "" },
                if report.outcome.interrupted {
                    " (interrupted)"
                } else {
                    ""
                }
            );
        }
    }
    Ok(())
}

fn run_evo(config: &MorphogenConfig, action: EvoAction) -> anyhow::Result<()> {
    let generation = match action {
        EvoAction::Genesis => commands::evolve_genesis(config)?,
        EvoAction::Iterate { generations } => commands::evolve_iterate(config, generations, true)?,
    };

    let metrics = &generation.metrics;
    println!(
        "Generation {}: best={:.4} mean={:.4} p95={:.4} deaths={}/{} unique={} entropy={:.3}",
        generation.generation_id,
        generation.elite_offspring.fitness,
        metrics.fitness.mean,
        metrics.fitness.p95,
        metrics.deaths,
        generation.offspring.len(),
        metrics.unique_dna,
        metrics.dna_entropy
    );
    Ok(())
}
