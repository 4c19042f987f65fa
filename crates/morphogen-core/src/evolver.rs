//! Generational evolution loop
//!
//! One call to [`Evolver::evolve`] turns the previous generation (or an
//! empty world) into a scored snapshot:
//!
//! 1. **Genesis** - seed random individuals when there is no predecessor
//! 2. **Reproduce** - drop lethal parents, carry the elite, then fill the
//!    pool by roulette selection, crossover and mutation
//! 3. **Simulate** - hand every offspring to the simulator, in parallel
//! 4. **Score** - read distance and lethality off each movement tracker
//! 5. **Record** - summarise everything into an [`EvolutionGeneration`]
//!
//! All random draws happen on the calling thread, so a seeded evolver
//! produces the same snapshot regardless of how rayon schedules simulations.

use std::fmt;

use chrono::Utc;
use morphogen_creature::{Creature, Dna, Reproduction};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;

use crate::error::{EvolutionError, Result};
use crate::generation::{elite_of, EvolutionGeneration, EvolutionRecord};
use crate::hyperparams::Hyperparams;
use crate::metrics::EvolutionMetrics;
use crate::population::Population;
use crate::simulation::{SimulationOutcome, Simulator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionPhase {
    Genesis,
    Reproduce,
    Simulate,
    Score,
    Record,
}

impl EvolutionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            EvolutionPhase::Genesis => "genesis",
            EvolutionPhase::Reproduce => "reproduce",
            EvolutionPhase::Simulate => "simulate",
            EvolutionPhase::Score => "score",
            EvolutionPhase::Record => "record",
        }
    }
}

impl fmt::Display for EvolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub struct Evolver<S: Simulator> {
    hyperparams: Hyperparams,
    simulator: S,
    reproduction: Reproduction,
    rng: Xoshiro256StarStar,
}

impl<S: Simulator> Evolver<S> {
    /// Seeded from `hyperparams.seed`, or from entropy when unset
    pub fn new(hyperparams: Hyperparams, simulator: S) -> Result<Self> {
        let seed = hyperparams.seed.unwrap_or_else(rand::random);
        log::info!("Evolver seed: {}", seed);
        Self::with_rng(hyperparams, simulator, Xoshiro256StarStar::seed_from_u64(seed))
    }

    pub fn with_rng(
        hyperparams: Hyperparams,
        simulator: S,
        rng: Xoshiro256StarStar,
    ) -> Result<Self> {
        hyperparams
            .validate()
            .map_err(|reason| EvolutionError::InvalidHyperparams { reason })?;
        let reproduction = Reproduction::new(hyperparams.reproduction_settings());
        Ok(Self {
            hyperparams,
            simulator,
            reproduction,
            rng,
        })
    }

    pub fn hyperparams(&self) -> &Hyperparams {
        &self.hyperparams
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    /// Evolve one generation from `previous`, or from genesis when `None`
    pub fn evolve(
        &mut self,
        generation_id: u64,
        previous: Option<Population>,
    ) -> Result<EvolutionGeneration> {
        let params = &self.hyperparams;

        let parents = match previous {
            Some(population) if population.is_empty() => {
                return Err(EvolutionError::EmptyPopulation)
            }
            Some(population) => population,
            None => {
                self.enter(generation_id, EvolutionPhase::Genesis);
                Population::populate_for(
                    &mut self.rng,
                    params.genesis_population_size,
                    params.gene_count,
                    params.expression_threshold,
                    params.genesis_max_attempts,
                    params.lethality,
                )?
            }
        };

        self.enter(generation_id, EvolutionPhase::Reproduce);
        let stock = parents.into_breeding_stock();
        // Lethal creatures may still breed when nobody survived, but never
        // pass on unmutated
        let elite = stock.fittest_survivor();
        let elite_previous = elite.map(EvolutionRecord::from_creature);

        let mut offspring = Vec::with_capacity(params.population_size);
        if params.elitist_behaviour {
            if let Some(elite) = elite {
                let name = offspring_name(generation_id, 0);
                if let Some(carried) =
                    Creature::develop_named(name, elite.dna().clone(), params.expression_threshold)
                {
                    log::debug!(
                        "Carrying {} forward (fitness {:.4})",
                        elite.name(),
                        elite.fitness()
                    );
                    offspring.push(carried.with_lethality(params.lethality));
                }
            }
        }
        self.fill_offspring(generation_id, &stock, &mut offspring)?;

        self.enter(generation_id, EvolutionPhase::Simulate);
        let outcomes = self.simulate_all(&mut offspring)?;
        let interrupted = outcomes.iter().any(|outcome| outcome.interrupted);
        if interrupted {
            let finished = outcomes.iter().filter(|o| !o.interrupted).count();
            log::warn!(
                "Generation {} was interrupted, {} of {} offspring finished",
                generation_id,
                finished,
                outcomes.len()
            );
        }

        self.enter(generation_id, EvolutionPhase::Score);
        let records: Vec<EvolutionRecord> = offspring
            .iter()
            .zip(&outcomes)
            .map(|(creature, outcome)| EvolutionRecord::from_outcome(creature, outcome))
            .collect();

        self.enter(generation_id, EvolutionPhase::Record);
        let elite_offspring = elite_of(&records)
            .cloned()
            .ok_or(EvolutionError::EmptyPopulation)?;
        let metrics = EvolutionMetrics::from_records(&records);

        log::info!(
            "Generation {}: best={:.4} mean={:.4} deaths={} unique={}",
            generation_id,
            elite_offspring.fitness,
            metrics.fitness.mean,
            metrics.deaths,
            metrics.unique_dna
        );

        Ok(EvolutionGeneration {
            generation_id,
            created_at: Utc::now(),
            hyperparams: self.hyperparams.clone(),
            elite_previous,
            elite_offspring,
            metrics,
            offspring: records,
            interrupted,
        })
    }

    fn enter(&self, generation_id: u64, phase: EvolutionPhase) {
        log::debug!("Generation {}: {}", generation_id, phase);
    }

    /// Breed from `stock` until the pool is full
    fn fill_offspring(
        &mut self,
        generation_id: u64,
        stock: &Population,
        offspring: &mut Vec<Creature>,
    ) -> Result<()> {
        let params = &self.hyperparams;
        let mut failures = 0;

        while offspring.len() < params.population_size {
            let (a, b) = stock.next_roulette_pair(&mut self.rng)?;
            let code = self
                .reproduction
                .reproduce(a.dna().code(), b.dna().code(), &mut self.rng)?;
            let name = offspring_name(generation_id, offspring.len());

            match Creature::develop_named(name, Dna::parse(code)?, params.expression_threshold) {
                Some(child) => offspring.push(child.with_lethality(params.lethality)),
                None => {
                    failures += 1;
                    log::trace!("Discarded non-viable offspring ({} so far)", failures);
                    if failures >= params.reproduction_max_attempts {
                        return Err(EvolutionError::ReproductionExhausted {
                            attempts: failures,
                            produced: offspring.len(),
                            target: params.population_size,
                        });
                    }
                }
            }
        }

        log::debug!(
            "Bred {} offspring ({} non-viable discarded)",
            offspring.len(),
            failures
        );
        Ok(())
    }

    fn simulate_all(&self, offspring: &mut [Creature]) -> Result<Vec<SimulationOutcome>> {
        let steps = Some(self.hyperparams.simulation_steps);
        let simulator = &self.simulator;

        if self.hyperparams.parallel_simulation {
            offspring
                .par_iter_mut()
                .map(|creature| simulator.simulate(creature, steps))
                .collect()
        } else {
            offspring
                .iter_mut()
                .map(|creature| simulator.simulate(creature, steps))
                .collect()
        }
    }
}

fn offspring_name(generation_id: u64, index: usize) -> String {
    format!("gen{}-{}", generation_id, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::StopSignal;
    use glam::DVec3;

    /// Walks in a straight line, faster for longer strands
    struct LineSimulator;

    impl Simulator for LineSimulator {
        fn simulate(
            &self,
            creature: &mut Creature,
            steps: Option<usize>,
        ) -> Result<SimulationOutcome> {
            let steps = steps.unwrap_or(0);
            let speed = creature.expressed_gene_count() as f64 * 0.01;
            for step in 1..=steps {
                creature.movement.track(DVec3::new(step as f64 * speed, 0.0, 0.0));
            }
            Ok(SimulationOutcome {
                steps_completed: steps,
                interrupted: false,
            })
        }
    }

    struct FailingSimulator;

    impl Simulator for FailingSimulator {
        fn simulate(&self, _: &mut Creature, _: Option<usize>) -> Result<SimulationOutcome> {
            Err(EvolutionError::Simulation {
                reason: "engine unavailable".to_string(),
            })
        }
    }

    /// Lethal on every step
    struct SkyrocketSimulator;

    impl Simulator for SkyrocketSimulator {
        fn simulate(
            &self,
            creature: &mut Creature,
            steps: Option<usize>,
        ) -> Result<SimulationOutcome> {
            let steps = steps.unwrap_or(0);
            for step in 1..=steps {
                let height = creature.movement.limits().max_height + 1.0;
                creature.movement.track(DVec3::new(step as f64 * 0.01, 0.0, height));
            }
            Ok(SimulationOutcome {
                steps_completed: steps,
                interrupted: false,
            })
        }
    }

    /// Finishes one creature, then raises the stop signal
    struct OneShotSimulator {
        stop: StopSignal,
    }

    impl Simulator for OneShotSimulator {
        fn simulate(
            &self,
            creature: &mut Creature,
            steps: Option<usize>,
        ) -> Result<SimulationOutcome> {
            if self.stop.is_stopped() {
                return Ok(SimulationOutcome {
                    steps_completed: 0,
                    interrupted: true,
                });
            }
            let outcome = LineSimulator.simulate(creature, steps)?;
            self.stop.stop();
            Ok(outcome)
        }
    }

    fn params() -> Hyperparams {
        Hyperparams {
            population_size: 6,
            simulation_steps: 20,
            seed: Some(42),
            ..Hyperparams::default()
        }
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(EvolutionPhase::Genesis.to_string(), "genesis");
        assert_eq!(EvolutionPhase::Record.name(), "record");
    }

    #[test]
    fn test_invalid_hyperparams_rejected() {
        let params = Hyperparams {
            population_size: 0,
            ..params()
        };
        let result = Evolver::new(params, LineSimulator);
        assert!(matches!(result, Err(EvolutionError::InvalidHyperparams { .. })));
    }

    #[test]
    fn test_genesis_generation() {
        let mut evolver = Evolver::new(params(), LineSimulator).unwrap();
        let generation = evolver.evolve(0, None).unwrap();

        assert_eq!(generation.generation_id, 0);
        assert_eq!(generation.offspring.len(), 6);
        assert!(generation.elite_previous.is_none());
        assert!(!generation.interrupted);
        assert!(generation.offspring.iter().all(|r| r.steps_tracked == 20));
        assert_eq!(generation.metrics.survivors + generation.metrics.deaths, 6);
    }

    #[test]
    fn test_elite_is_carried_unmutated() {
        let mut evolver = Evolver::new(params(), LineSimulator).unwrap();
        let first = evolver.evolve(0, None).unwrap();
        let population = first.to_population(0.5).unwrap();
        let best = population.fittest_survivor().unwrap().dna().to_string();

        let second = evolver.evolve(1, Some(population)).unwrap();
        assert_eq!(second.offspring[0].dna_code, best);
        assert_eq!(second.elite_previous.unwrap().dna_code, best);
    }

    #[test]
    fn test_lethal_parents_are_never_carried() {
        let run = |elitist_behaviour| {
            let params = Hyperparams {
                elitist_behaviour,
                ..params()
            };
            let mut evolver = Evolver::new(params, SkyrocketSimulator).unwrap();
            let first = evolver.evolve(0, None).unwrap();
            assert_eq!(first.metrics.deaths, first.offspring.len());
            evolver
                .evolve(1, Some(first.to_population(0.5).unwrap()))
                .unwrap()
        };

        let elitist = run(true);
        assert!(elitist.elite_previous.is_none());
        assert_eq!(elitist.offspring.len(), 6);
        // Nothing was carried, so elitism leaves the draws untouched
        assert_eq!(elitist.offspring, run(false).offspring);
    }

    #[test]
    fn test_interrupted_offspring_left_out_of_metrics() {
        let params = Hyperparams {
            parallel_simulation: false,
            ..params()
        };
        let simulator = OneShotSimulator {
            stop: StopSignal::new(),
        };
        let mut evolver = Evolver::new(params, simulator).unwrap();
        let generation = evolver.evolve(0, None).unwrap();

        assert!(generation.interrupted);
        assert_eq!(generation.offspring.len(), 6);
        let finished = &generation.offspring[0];
        assert!(!finished.interrupted);
        assert_eq!(finished.steps_tracked, 20);
        assert!(generation.offspring[1..]
            .iter()
            .all(|r| r.interrupted && r.steps_tracked == 0));

        let metrics = &generation.metrics;
        assert_eq!(metrics.evaluated, 1);
        assert_eq!(metrics.survivors + metrics.deaths, 1);
        assert_eq!(metrics.fitness.min, finished.fitness);
        assert_eq!(metrics.fitness.mean, finished.fitness);
        assert!(finished.fitness > 0.0);
        assert_eq!(generation.elite_offspring, *finished);
        let strands: ahash::HashSet<&str> = generation
            .offspring
            .iter()
            .map(|r| r.dna_code.as_str())
            .collect();
        assert_eq!(metrics.unique_dna, strands.len());
    }

    #[test]
    fn test_no_elite_without_elitism() {
        let params = Hyperparams {
            elitist_behaviour: false,
            ..params()
        };
        let mut evolver = Evolver::new(params, LineSimulator).unwrap();
        let first = evolver.evolve(0, None).unwrap();
        let second = evolver
            .evolve(1, Some(first.to_population(0.5).unwrap()))
            .unwrap();
        // Still recorded for analysis, just not carried
        assert!(second.elite_previous.is_some());
        assert_eq!(second.offspring.len(), 6);
    }

    #[test]
    fn test_empty_previous_population() {
        let mut evolver = Evolver::new(params(), LineSimulator).unwrap();
        let result = evolver.evolve(1, Some(Population::default()));
        assert!(matches!(result, Err(EvolutionError::EmptyPopulation)));
    }

    #[test]
    fn test_simulation_errors_propagate() {
        let mut evolver = Evolver::new(params(), FailingSimulator).unwrap();
        let result = evolver.evolve(0, None);
        assert!(matches!(result, Err(EvolutionError::Simulation { .. })));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let sequential = Hyperparams {
            parallel_simulation: false,
            ..params()
        };
        let a = Evolver::new(params(), LineSimulator)
            .unwrap()
            .evolve(0, None)
            .unwrap();
        let b = Evolver::new(sequential, LineSimulator)
            .unwrap()
            .evolve(0, None)
            .unwrap();
        assert_eq!(a.offspring, b.offspring);
    }
}
