//! Implementations behind the command-line subcommands

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use morphogen_core::{
    DnaRepository, EvolutionGeneration, Evolver, GenerationRepository, KinematicSimulator,
    SimulationOutcome, Simulator, StopSignal, WriteMode,
};
use morphogen_creature::{BodyRenderer, Creature, Dna, GeneticRng, PrimordialSoup, UrdfRenderer};

use crate::config::MorphogenConfig;

/// Chance that each non-root gene of a freshly created robot is expressed
pub const CREATE_EXPRESSION_BIAS: f64 = 0.5;

/// Spark a new robot, store its DNA and write its body document.
///
/// Returns the DNA and URDF paths.
pub fn create_robot<R: GeneticRng>(
    config: &MorphogenConfig,
    rng: &mut R,
    species: &str,
    gene_count: usize,
    mode: WriteMode,
    folder: &Path,
) -> Result<(PathBuf, PathBuf)> {
    if gene_count == 0 {
        bail!("A robot needs at least one gene");
    }
    let threshold = config.evolution.expression_threshold;
    let max_attempts = config.evolution.genesis_max_attempts.max(1);

    let mut attempts = 0;
    let creature = loop {
        let code = PrimordialSoup::spark_life_biased(rng, gene_count, CREATE_EXPRESSION_BIAS);
        let dna = Dna::parse(code)?;
        if let Some(creature) = Creature::develop_named(species, dna, threshold) {
            break creature;
        }
        attempts += 1;
        if attempts >= max_attempts {
            bail!(
                "No viable {} robot after {} sparks at threshold {}",
                species,
                attempts,
                threshold
            );
        }
    };

    log::info!(
        "Created {} with {} of {} genes expressed",
        species,
        creature.expressed_gene_count(),
        creature.dna().gene_count()
    );

    let dna_path = DnaRepository::new(folder).write(species, creature.dna(), mode)?;
    let urdf_path = write_body(&creature, folder)?;
    Ok((dna_path, urdf_path))
}

/// Write the body document of a stored individual
pub fn render_robot(
    config: &MorphogenConfig,
    species: &str,
    individual: usize,
    folder: &Path,
) -> Result<PathBuf> {
    let creature = develop_stored(config, species, individual, folder)?;
    write_body(&creature, folder)
}

/// What a viewing run observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewReport {
    pub outcome: SimulationOutcome,
    pub distance: f64,
    pub lethal: bool,
}

/// Run a stored individual in the kinematic simulator.
///
/// With `steps` unset the run lasts until `stop` is raised.
pub fn view_robot(
    config: &MorphogenConfig,
    species: &str,
    individual: usize,
    folder: &Path,
    steps: Option<usize>,
    stop: StopSignal,
) -> Result<ViewReport> {
    let mut creature = develop_stored(config, species, individual, folder)?
        .with_lethality(config.evolution.lethality);
    let simulator = KinematicSimulator::new(config.simulation).with_stop_signal(stop);

    log::info!(
        "Viewing {} #{} ({} parts, {} motors)",
        species,
        individual,
        creature.body().len(),
        creature.motors().len()
    );
    let outcome = simulator.simulate(&mut creature, steps)?;

    let report = ViewReport {
        outcome,
        distance: creature.fitness(),
        lethal: creature.is_lethal(),
    };
    log::info!(
        "{} travelled {:.4} in {} steps (lethal: {}, final position: {:?})",
        species,
        report.distance,
        outcome.steps_completed,
        report.lethal,
        creature.movement.last()
    );
    Ok(report)
}

/// Evolve generation 0 from random DNA and save it
pub fn evolve_genesis(config: &MorphogenConfig) -> Result<EvolutionGeneration> {
    let snapshots = GenerationRepository::new(&config.paths.generations);
    if !snapshots.generation_ids()?.is_empty() {
        log::warn!(
            "{} already holds snapshots, generation 0 will be replaced",
            snapshots.folder().display()
        );
    }

    let simulator = KinematicSimulator::new(config.simulation);
    let mut evolver = Evolver::new(config.evolution.clone(), simulator)?;
    let generation = evolver.evolve(0, None)?;
    record_generation(config, &snapshots, &generation)?;
    Ok(generation)
}

/// Continue from the latest snapshot for `generations` more generations.
///
/// Returns the last generation evolved.
pub fn evolve_iterate(
    config: &MorphogenConfig,
    generations: usize,
    show_progress: bool,
) -> Result<EvolutionGeneration> {
    if generations == 0 {
        bail!("Nothing to do for zero generations");
    }

    let snapshots = GenerationRepository::new(&config.paths.generations);
    let mut latest = snapshots.latest()?.ok_or_else(|| {
        anyhow!(
            "No snapshots in {}, run `evo genesis` first",
            snapshots.folder().display()
        )
    })?;

    // Offset the seed so a resumed run does not replay earlier draws
    let mut params = config.evolution.clone();
    params.seed = params.seed.map(|seed| seed.wrapping_add(latest.generation_id + 1));
    let simulator = KinematicSimulator::new(config.simulation);
    let mut evolver = Evolver::new(params, simulator)?;

    let pb = if show_progress {
        let pb = ProgressBar::new(generations as u64);
        pb.set_style(progress_style()?);
        pb
    } else {
        ProgressBar::hidden()
    };

    for _ in 0..generations {
        let threshold = config.evolution.expression_threshold;
        let population = latest
            .to_population(threshold)
            .with_context(|| format!("Failed to restore generation {}", latest.generation_id))?;
        let next_id = latest.generation_id + 1;

        let generation = evolver.evolve(next_id, Some(population))?;
        record_generation(config, &snapshots, &generation)?;

        pb.set_message(format!(
            "gen {} best={:.3} mean={:.3}",
            next_id, generation.elite_offspring.fitness, generation.metrics.fitness.mean
        ));
        pb.inc(1);

        let interrupted = generation.interrupted;
        latest = generation;
        if interrupted {
            log::warn!("Stopping after interrupted generation {}", next_id);
            break;
        }
    }

    pb.finish_with_message(format!("Evolved up to generation {}", latest.generation_id));
    Ok(latest)
}

/// Remove duplicate strands from a species file
pub fn dedup_dna(species: &str, folder: &Path) -> Result<usize> {
    DnaRepository::new(folder).dedup(species)
}

/// Write the default configuration to `path`
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    MorphogenConfig::default().write_to(path, force)
}

fn develop_stored(
    config: &MorphogenConfig,
    species: &str,
    individual: usize,
    folder: &Path,
) -> Result<Creature> {
    let dna = DnaRepository::new(folder)
        .read(species, individual)?
        .ok_or_else(|| anyhow!("{} has no individual #{}", species, individual))?;
    let threshold = config.evolution.expression_threshold;
    Creature::develop_named(species, dna, threshold).ok_or_else(|| {
        anyhow!(
            "{} #{} expresses no genes at threshold {}",
            species,
            individual,
            threshold
        )
    })
}

fn write_body(creature: &Creature, folder: &Path) -> Result<PathBuf> {
    let renderer = UrdfRenderer::default();
    let path = folder.join(format!("{}.{}", creature.name(), renderer.extension()));
    fs::create_dir_all(folder).with_context(|| format!("Failed to create {}", folder.display()))?;
    fs::write(&path, renderer.render(creature))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote body of {} to {}", creature.name(), path.display());
    Ok(path)
}

/// Save the snapshot and keep the elite's DNA
fn record_generation(
    config: &MorphogenConfig,
    snapshots: &GenerationRepository,
    generation: &EvolutionGeneration,
) -> Result<()> {
    snapshots.save(generation)?;
    let elite = generation
        .elite_offspring
        .dna()
        .context("Elite DNA does not parse")?;
    DnaRepository::new(&config.paths.robots).write(
        &config.paths.elite_species,
        &elite,
        WriteMode::Append,
    )?;
    Ok(())
}

fn progress_style() -> Result<ProgressStyle> {
    let template =
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";
    Ok(ProgressStyle::default_bar()
        .template(template)?
        .progress_chars("█▓░"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use morphogen_core::Hyperparams;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> MorphogenConfig {
        let mut config = MorphogenConfig::default();
        config.evolution = Hyperparams {
            population_size: 5,
            simulation_steps: 50,
            parallel_simulation: false,
            seed: Some(3),
            ..Hyperparams::default()
        };
        config.paths.robots = dir.join("robots");
        config.paths.generations = dir.join("generations");
        config
    }

    #[test]
    fn test_create_then_render() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let folder = &config.paths.robots;
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);

        let (dna_path, urdf_path) =
            create_robot(&config, &mut rng, "crab", 4, WriteMode::Append, folder).unwrap();
        assert!(dna_path.ends_with("crab.dna"));
        assert!(urdf_path.ends_with("crab.urdf"));
        let first = fs::read_to_string(&urdf_path).unwrap();
        assert!(first.contains(r#"<robot name="crab">"#));

        fs::remove_file(&urdf_path).unwrap();
        let rendered = render_robot(&config, "crab", 0, folder).unwrap();
        assert_eq!(fs::read_to_string(rendered).unwrap(), first);
    }

    #[test]
    fn test_create_overwrite_keeps_one_line() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let folder = &config.paths.robots;
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);

        create_robot(&config, &mut rng, "crab", 2, WriteMode::Append, folder).unwrap();
        create_robot(&config, &mut rng, "crab", 2, WriteMode::Overwrite, folder).unwrap();
        let repo = DnaRepository::new(folder);
        assert_eq!(repo.read_all("crab").unwrap().len(), 1);
    }

    #[test]
    fn test_render_missing_individual_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let folder = &config.paths.robots;
        let mut rng = Xoshiro256StarStar::seed_from_u64(4);

        create_robot(&config, &mut rng, "crab", 2, WriteMode::Append, folder).unwrap();
        assert!(render_robot(&config, "crab", 5, folder).is_err());
    }

    #[test]
    fn test_view_bounded_and_stopped() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let folder = &config.paths.robots;
        let mut rng = Xoshiro256StarStar::seed_from_u64(5);
        create_robot(&config, &mut rng, "crab", 3, WriteMode::Append, folder).unwrap();

        let report = view_robot(&config, "crab", 0, folder, Some(30), StopSignal::new()).unwrap();
        assert_eq!(report.outcome.steps_completed, 30);
        assert!(!report.outcome.interrupted);

        let stop = StopSignal::new();
        stop.stop();
        let report = view_robot(&config, "crab", 0, folder, None, stop).unwrap();
        assert!(report.outcome.interrupted);
    }

    #[test]
    fn test_genesis_then_iterate() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());

        let genesis = evolve_genesis(&config).unwrap();
        assert_eq!(genesis.generation_id, 0);
        assert_eq!(genesis.offspring.len(), 5);

        let last = evolve_iterate(&config, 2, false).unwrap();
        assert_eq!(last.generation_id, 2);

        let snapshots = GenerationRepository::new(&config.paths.generations);
        assert_eq!(snapshots.generation_ids().unwrap(), vec![0, 1, 2]);
        let elites = DnaRepository::new(&config.paths.robots)
            .read_all(&config.paths.elite_species)
            .unwrap();
        assert_eq!(elites.len(), 3);
    }

    #[test]
    fn test_iterate_without_genesis_fails() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        assert!(evolve_iterate(&config, 1, false).is_err());
    }

    #[test]
    fn test_dedup_and_init() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path();
        let dna: Dna = vec!["0.7"; morphogen_creature::GENE_LENGTH]
            .join(",")
            .parse()
            .unwrap();
        let repo = DnaRepository::new(folder);
        repo.write("crab", &dna, WriteMode::Append).unwrap();
        repo.write("crab", &dna, WriteMode::Append).unwrap();
        assert_eq!(dedup_dna("crab", folder).unwrap(), 1);

        let path = folder.join("morphogen.ron");
        init_config(&path, false).unwrap();
        assert!(init_config(&path, false).is_err());
        assert_eq!(
            MorphogenConfig::load_from(Some(&path)).unwrap().evolution,
            Hyperparams::default()
        );
    }
}
