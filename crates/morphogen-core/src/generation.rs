//! Generation snapshots

use chrono::{DateTime, Utc};
use morphogen_creature::{Creature, CreatureMovement, Dna};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hyperparams::Hyperparams;
use crate::metrics::EvolutionMetrics;
use crate::population::Population;
use crate::simulation::SimulationOutcome;

/// Outcome of one simulated individual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRecord {
    pub name: String,
    /// Comma-separated strand
    pub dna_code: String,
    pub fitness: f64,
    pub lethal: bool,
    pub gene_count: usize,
    pub expressed_gene_count: usize,
    pub steps_tracked: usize,
    /// Simulation was stopped before this individual finished
    #[serde(default)]
    pub interrupted: bool,
}

impl EvolutionRecord {
    pub fn from_creature(creature: &Creature) -> Self {
        Self {
            name: creature.name().to_string(),
            dna_code: creature.dna().to_string(),
            fitness: creature.fitness(),
            lethal: creature.is_lethal(),
            gene_count: creature.dna().gene_count(),
            expressed_gene_count: creature.expressed_gene_count(),
            steps_tracked: creature.movement.steps(),
            interrupted: false,
        }
    }

    /// Record of a simulated creature, flagged when its run was cut short
    pub fn from_outcome(creature: &Creature, outcome: &SimulationOutcome) -> Self {
        Self {
            interrupted: outcome.interrupted,
            ..Self::from_creature(creature)
        }
    }

    pub fn dna(&self) -> Result<Dna> {
        Ok(self.dna_code.parse()?)
    }
}

/// Everything recorded about one evolved generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionGeneration {
    pub generation_id: u64,
    pub created_at: DateTime<Utc>,
    pub hyperparams: Hyperparams,
    /// Fittest survivor of the previous generation, when there was one
    pub elite_previous: Option<EvolutionRecord>,
    /// Fittest non-lethal offspring among those that finished, falling back
    /// to lethal and then to interrupted ones
    pub elite_offspring: EvolutionRecord,
    pub metrics: EvolutionMetrics,
    pub offspring: Vec<EvolutionRecord>,
    /// A simulation was stopped before its step budget ran out
    pub interrupted: bool,
}

impl EvolutionGeneration {
    /// Rebuild the offspring as a scored population without re-simulating.
    ///
    /// Records whose DNA no longer develops at `expression_threshold` are
    /// skipped.
    pub fn to_population(&self, expression_threshold: f64) -> Result<Population> {
        let limits = self.hyperparams.lethality;
        let mut creatures = Vec::with_capacity(self.offspring.len());

        for record in &self.offspring {
            let Some(mut creature) =
                Creature::develop_named(record.name.clone(), record.dna()?, expression_threshold)
            else {
                log::warn!(
                    "{} does not develop at threshold {}, skipping",
                    record.name,
                    expression_threshold
                );
                continue;
            };
            creature.movement = CreatureMovement::restored(
                record.fitness,
                record.lethal,
                record.steps_tracked,
                limits,
            );
            creatures.push(creature);
        }

        Ok(Population::new(creatures))
    }
}

/// Fittest record, preferring finished survivors over finished lethal
/// records over interrupted ones. First occurrence wins ties.
pub fn elite_of(records: &[EvolutionRecord]) -> Option<&EvolutionRecord> {
    fn fittest<'a>(
        records: impl Iterator<Item = &'a EvolutionRecord>,
    ) -> Option<&'a EvolutionRecord> {
        records.fold(None, |best: Option<&EvolutionRecord>, record| match best {
            Some(best) if best.fitness >= record.fitness => Some(best),
            _ => Some(record),
        })
    }

    let finished = || records.iter().filter(|r| !r.interrupted);
    fittest(finished().filter(|r| !r.lethal))
        .or_else(|| fittest(finished()))
        .or_else(|| fittest(records.iter()))
}
