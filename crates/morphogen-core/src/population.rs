//! Scored cohorts of creatures and parent selection

use ahash::HashSet;
use morphogen_creature::{Creature, Dna, GeneticRng, LethalityLimits, PrimordialSoup};

use crate::error::{EvolutionError, Result};

/// An ordered cohort of creatures
#[derive(Debug, Default)]
pub struct Population {
    creatures: Vec<Creature>,
}

impl Population {
    /// Keep every creature in the given order
    pub fn new(creatures: Vec<Creature>) -> Self {
        Self { creatures }
    }

    /// Drop creatures whose DNA matches an earlier one
    pub fn deduplicated(creatures: Vec<Creature>) -> Self {
        let mut seen: HashSet<Dna> = HashSet::default();
        let creatures = creatures
            .into_iter()
            .filter(|creature| seen.insert(creature.dna().clone()))
            .collect();
        Self { creatures }
    }

    /// Spark random DNA until `size` creatures develop
    pub fn populate_for<R: GeneticRng>(
        rng: &mut R,
        size: usize,
        gene_count: usize,
        expression_threshold: f64,
        max_attempts: usize,
        limits: LethalityLimits,
    ) -> Result<Self> {
        let mut creatures = Vec::with_capacity(size);
        let mut failures = 0;

        while creatures.len() < size {
            let dna = Dna::parse(PrimordialSoup::spark_life(rng, gene_count))?;
            let name = format!("genesis-{}", creatures.len());
            match Creature::develop_named(name, dna, expression_threshold) {
                Some(creature) => creatures.push(creature.with_lethality(limits)),
                None => {
                    failures += 1;
                    if failures >= max_attempts {
                        return Err(EvolutionError::GenesisExhausted {
                            attempts: failures,
                            produced: creatures.len(),
                            target: size,
                        });
                    }
                }
            }
        }

        log::debug!(
            "Seeded {} genesis creatures ({} non-viable sparks)",
            creatures.len(),
            failures
        );
        Ok(Self { creatures })
    }

    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    pub fn into_creatures(self) -> Vec<Creature> {
        self.creatures
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Creature> {
        self.creatures.iter()
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    /// Whether any creature has been simulated
    pub fn is_tracked(&self) -> bool {
        self.creatures.iter().any(|c| c.movement.is_tracked())
    }

    /// Creature with the greatest distance; the first one wins ties
    pub fn fittest(&self) -> Option<&Creature> {
        fittest_of(self.creatures.iter())
    }

    /// Fittest simulated creature that never made a lethal move, the only
    /// kind that may be carried forward as elite
    pub fn fittest_survivor(&self) -> Option<&Creature> {
        fittest_of(self.survivors().filter(|c| c.movement.is_tracked()))
    }

    /// Running sum of distances in population order
    pub fn fitness_map(&self) -> Vec<f64> {
        self.creatures
            .iter()
            .scan(0.0, |total, creature| {
                *total += creature.fitness();
                Some(*total)
            })
            .collect()
    }

    /// Draw two parents, fitness-proportionally.
    ///
    /// Falls back to a uniform draw when nobody has been tracked or the
    /// total fitness is zero. The two draws are independent, so the same
    /// creature can be returned twice.
    pub fn next_roulette_pair<R: GeneticRng>(
        &self,
        rng: &mut R,
    ) -> Result<(&Creature, &Creature)> {
        if self.creatures.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }

        let fitness_map = self.fitness_map();
        let total = fitness_map.last().copied().unwrap_or(0.0);
        let uniform = !self.is_tracked() || !(total.is_finite() && total > 0.0);

        let first = self.spin(&fitness_map, total, uniform, rng);
        let second = self.spin(&fitness_map, total, uniform, rng);
        Ok((&self.creatures[first], &self.creatures[second]))
    }

    fn spin<R: GeneticRng>(
        &self,
        fitness_map: &[f64],
        total: f64,
        uniform: bool,
        rng: &mut R,
    ) -> usize {
        if uniform {
            return rng.index_below(self.creatures.len());
        }
        let draw = rng.next_base() * total;
        fitness_map
            .iter()
            .position(|&cumulative| cumulative >= draw)
            .unwrap_or(self.creatures.len() - 1)
    }

    /// Creatures that never made a lethal move
    pub fn survivors(&self) -> impl Iterator<Item = &Creature> + '_ {
        self.creatures.iter().filter(|c| !c.is_lethal())
    }

    /// Population that may breed: survivors only, or everyone when nobody
    /// survived
    pub fn into_breeding_stock(self) -> Population {
        let survivors = self.survivors().count();
        if survivors == 0 || survivors == self.creatures.len() {
            if survivors == 0 && !self.creatures.is_empty() {
                log::warn!(
                    "All {} creatures made lethal moves, breeding from the whole population",
                    self.creatures.len()
                );
            }
            return self;
        }

        let creatures = self
            .creatures
            .into_iter()
            .filter(|c| !c.is_lethal())
            .collect();
        Population { creatures }
    }
}

fn fittest_of<'a>(creatures: impl Iterator<Item = &'a Creature>) -> Option<&'a Creature> {
    let mut best: Option<&Creature> = None;
    for creature in creatures {
        match best {
            Some(current) if creature.fitness() <= current.fitness() => {}
            _ => best = Some(creature),
        }
    }
    best
}

impl FromIterator<Creature> for Population {
    fn from_iter<I: IntoIterator<Item = Creature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Creature;
    type IntoIter = std::slice::Iter<'a, Creature>;

    fn into_iter(self) -> Self::IntoIter {
        self.creatures.iter()
    }
}
