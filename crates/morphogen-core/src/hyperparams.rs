//! Hyperparameters of an evolution run
//!
//! Stored verbatim in every generation snapshot so a run can be resumed or
//! analysed with the exact settings that produced it.

use morphogen_creature::{LethalityLimits, ReproductionSettings, DEFAULT_EXPRESSION_THRESHOLD};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparams {
    /// Offspring per generation
    pub population_size: usize,
    /// Random individuals seeded when there is no previous generation
    pub genesis_population_size: usize,
    /// Genes per genesis individual
    pub gene_count: usize,
    /// Longest offspring strand in genes, `None` for unbounded
    pub gene_count_max: Option<usize>,
    /// Control value at or above which a gene is expressed
    pub expression_threshold: f64,
    /// Steps each offspring is simulated for
    pub simulation_steps: usize,
    /// Carry the previous fittest survivor forward unmutated
    pub elitist_behaviour: bool,
    /// Non-viable offspring tolerated per generation before giving up
    pub reproduction_max_attempts: usize,
    /// Non-viable sparks tolerated while seeding genesis
    pub genesis_max_attempts: usize,

    pub crossover_min_len: f64,
    pub crossover_max_len: f64,
    pub point_mutation_enabled: bool,
    pub point_mutation_rate: f64,
    pub point_mutation_amount: f64,
    pub shrink_mutation_enabled: bool,
    pub shrink_mutation_rate: f64,
    pub grow_mutation_enabled: bool,
    pub grow_mutation_rate: f64,

    pub lethality: LethalityLimits,
    /// Simulate offspring on the rayon pool
    pub parallel_simulation: bool,
    /// Seed for the evolver RNG, drawn from entropy when unset
    pub seed: Option<u64>,
}

impl Default for Hyperparams {
    fn default() -> Self {
        let reproduction = ReproductionSettings::default();
        Self {
            population_size: 10,
            genesis_population_size: 2,
            gene_count: 3,
            gene_count_max: reproduction.gene_count_max,
            expression_threshold: DEFAULT_EXPRESSION_THRESHOLD,
            simulation_steps: 2400,
            elitist_behaviour: true,
            reproduction_max_attempts: 1000,
            genesis_max_attempts: 1000,
            crossover_min_len: reproduction.crossover_min_len,
            crossover_max_len: reproduction.crossover_max_len,
            point_mutation_enabled: reproduction.point_mutation_enabled,
            point_mutation_rate: reproduction.point_mutation_rate,
            point_mutation_amount: reproduction.point_mutation_amount,
            shrink_mutation_enabled: reproduction.shrink_mutation_enabled,
            shrink_mutation_rate: reproduction.shrink_mutation_rate,
            grow_mutation_enabled: reproduction.grow_mutation_enabled,
            grow_mutation_rate: reproduction.grow_mutation_rate,
            lethality: LethalityLimits::default(),
            parallel_simulation: true,
            seed: None,
        }
    }
}

impl Hyperparams {
    pub fn reproduction_settings(&self) -> ReproductionSettings {
        ReproductionSettings {
            crossover_min_len: self.crossover_min_len,
            crossover_max_len: self.crossover_max_len,
            point_mutation_enabled: self.point_mutation_enabled,
            point_mutation_rate: self.point_mutation_rate,
            point_mutation_amount: self.point_mutation_amount,
            shrink_mutation_enabled: self.shrink_mutation_enabled,
            shrink_mutation_rate: self.shrink_mutation_rate,
            grow_mutation_enabled: self.grow_mutation_enabled,
            grow_mutation_rate: self.grow_mutation_rate,
            gene_count_max: self.gene_count_max,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.population_size == 0 {
            return Err("population_size must be at least 1".to_string());
        }
        if self.genesis_population_size == 0 {
            return Err("genesis_population_size must be at least 1".to_string());
        }
        if self.gene_count == 0 {
            return Err("gene_count must be at least 1".to_string());
        }
        if let Some(max) = self.gene_count_max {
            if max < self.gene_count {
                return Err(format!(
                    "gene_count_max ({}) is below the genesis gene_count ({})",
                    max, self.gene_count
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.expression_threshold) {
            return Err(format!(
                "expression_threshold must be within [0, 1], got {}",
                self.expression_threshold
            ));
        }
        if self.simulation_steps == 0 {
            return Err("simulation_steps must be at least 1".to_string());
        }
        if self.reproduction_max_attempts == 0 {
            return Err("reproduction_max_attempts must be at least 1".to_string());
        }
        self.lethality.validate()?;
        self.reproduction_settings().validate()
    }
}
