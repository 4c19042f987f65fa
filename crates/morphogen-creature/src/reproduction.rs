//! Sexual reproduction on raw DNA strands
//!
//! A child strand is produced in a fixed order: crossover, point mutation,
//! shrink mutation, grow mutation, then the length clip. Each stage works on
//! the output length of the previous one.

use serde::{Deserialize, Serialize};

use crate::dna::Dna;
use crate::error::{GeneticError, Result};
use crate::gene::GENE_LENGTH;
use crate::rng::GeneticRng;

/// Lowest value a point-mutated base can take
pub const POINT_MUTATION_FLOOR: f64 = 0.00001;
/// Highest value a point-mutated base can take
pub const POINT_MUTATION_CEILING: f64 = 0.99999;

/// Reproduction parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionSettings {
    /// Earliest crossover cut as a fraction of the parent length
    pub crossover_min_len: f64,
    /// Latest crossover cut as a fraction of the parent length
    pub crossover_max_len: f64,
    pub point_mutation_enabled: bool,
    /// Probability per base
    pub point_mutation_rate: f64,
    /// Amount added to a mutated base
    pub point_mutation_amount: f64,
    pub shrink_mutation_enabled: bool,
    /// Probability per base of being removed
    pub shrink_mutation_rate: f64,
    pub grow_mutation_enabled: bool,
    /// Fraction of the current length appended as fresh bases
    pub grow_mutation_rate: f64,
    /// Longest child strand in genes, `None` for unbounded
    pub gene_count_max: Option<usize>,
}

impl Default for ReproductionSettings {
    fn default() -> Self {
        Self {
            crossover_min_len: 0.25,
            crossover_max_len: 0.75,
            point_mutation_enabled: true,
            point_mutation_rate: 0.1,
            point_mutation_amount: 0.1,
            shrink_mutation_enabled: true,
            shrink_mutation_rate: 0.05,
            grow_mutation_enabled: true,
            grow_mutation_rate: 0.1,
            gene_count_max: Some(20),
        }
    }
}

impl ReproductionSettings {
    /// Settings that only perform crossover
    pub fn crossover_only() -> Self {
        Self {
            point_mutation_enabled: false,
            shrink_mutation_enabled: false,
            grow_mutation_enabled: false,
            gene_count_max: None,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let fractions = [
            ("crossover_min_len", self.crossover_min_len),
            ("crossover_max_len", self.crossover_max_len),
            ("point_mutation_rate", self.point_mutation_rate),
            ("shrink_mutation_rate", self.shrink_mutation_rate),
            ("grow_mutation_rate", self.grow_mutation_rate),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        if self.crossover_min_len > self.crossover_max_len {
            return Err(format!(
                "crossover_min_len ({}) exceeds crossover_max_len ({})",
                self.crossover_min_len, self.crossover_max_len
            ));
        }
        if !self.point_mutation_amount.is_finite() {
            return Err("point_mutation_amount must be finite".to_string());
        }
        if self.gene_count_max == Some(0) {
            return Err("gene_count_max must allow at least one gene".to_string());
        }
        Ok(())
    }
}

/// Result of a crossover with the cut points that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Crossover {
    pub code: Vec<f64>,
    pub cut_a: usize,
    pub cut_b: usize,
}

/// Inclusive range of cut positions for a parent of `len` bases
///
/// The lower end is at least 1 so every child keeps part of parent A.
pub fn cut_range(len: usize, min_len: f64, max_len: f64) -> (usize, usize) {
    let low = ((len as f64 * min_len).floor() as usize).max(1);
    let high = ((len as f64 * max_len).floor() as usize).min(len);
    (low, high.max(low))
}

/// Child is `a[..cut_a]` followed by `b[cut_b..]`
pub fn crossover<R: GeneticRng>(
    a: &[f64],
    b: &[f64],
    min_len: f64,
    max_len: f64,
    rng: &mut R,
) -> Crossover {
    let (low_a, high_a) = cut_range(a.len(), min_len, max_len);
    let (low_b, high_b) = cut_range(b.len(), min_len, max_len);
    let cut_a = rng.index_between(low_a, high_a).min(a.len());
    let cut_b = rng.index_between(low_b, high_b).min(b.len());

    let mut code = Vec::with_capacity(cut_a + b.len() - cut_b);
    code.extend_from_slice(&a[..cut_a]);
    code.extend_from_slice(&b[cut_b..]);

    Crossover { code, cut_a, cut_b }
}

/// Nudge each base with probability `rate`, clamping into the open unit interval
pub fn point_mutate<R: GeneticRng>(code: &mut [f64], rate: f64, amount: f64, rng: &mut R) -> usize {
    let mut mutated = 0;
    for base in code.iter_mut() {
        if rng.check_probability(rate) {
            *base = (*base + amount).clamp(POINT_MUTATION_FLOOR, POINT_MUTATION_CEILING);
            mutated += 1;
        }
    }
    mutated
}

/// Drop bases with probability `rate` each, never going below one gene
pub fn shrink_mutate<R: GeneticRng>(code: Vec<f64>, rate: f64, rng: &mut R) -> Vec<f64> {
    let removable = code.len().saturating_sub(GENE_LENGTH);
    if removable == 0 {
        return code;
    }

    let mut removed = 0;
    code.into_iter()
        .filter(|_| {
            if removed < removable && rng.check_probability(rate) {
                removed += 1;
                false
            } else {
                true
            }
        })
        .collect()
}

/// Append `floor(len * rate)` fresh bases
pub fn grow_mutate<R: GeneticRng>(code: &mut Vec<f64>, rate: f64, rng: &mut R) -> usize {
    let added = (code.len() as f64 * rate).floor() as usize;
    code.extend((0..added).map(|_| rng.next_base()));
    added
}

/// Truncate to at most `gene_count_max` whole genes
pub fn clip(code: &mut Vec<f64>, gene_count_max: Option<usize>) {
    if let Some(max) = gene_count_max {
        code.truncate(max * GENE_LENGTH);
    }
}

/// Reproduction operator bound to one set of settings
#[derive(Debug, Clone, Default)]
pub struct Reproduction {
    settings: ReproductionSettings,
}

impl Reproduction {
    pub fn new(settings: ReproductionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReproductionSettings {
        &self.settings
    }

    /// Produce one child strand from two parent strands
    pub fn reproduce<R: GeneticRng>(&self, a: &[f64], b: &[f64], rng: &mut R) -> Result<Vec<f64>> {
        if a.is_empty() || b.is_empty() {
            return Err(GeneticError::malformed("cannot reproduce from an empty parent"));
        }
        let s = &self.settings;

        let Crossover {
            mut code,
            cut_a,
            cut_b,
        } = crossover(a, b, s.crossover_min_len, s.crossover_max_len, rng);

        let point = if s.point_mutation_enabled {
            point_mutate(&mut code, s.point_mutation_rate, s.point_mutation_amount, rng)
        } else {
            0
        };

        if s.shrink_mutation_enabled {
            code = shrink_mutate(code, s.shrink_mutation_rate, rng);
        }

        let grown = if s.grow_mutation_enabled {
            grow_mutate(&mut code, s.grow_mutation_rate, rng)
        } else {
            0
        };

        clip(&mut code, s.gene_count_max);

        log::trace!(
            "Reproduced {} + {} bases (cuts {}/{}): {} point mutations, {} grown, child {} bases",
            a.len(),
            b.len(),
            cut_a,
            cut_b,
            point,
            grown,
            code.len()
        );
        Ok(code)
    }

    /// [`reproduce`](Self::reproduce) on parsed strands
    pub fn reproduce_dna<R: GeneticRng>(&self, a: &Dna, b: &Dna, rng: &mut R) -> Result<Dna> {
        let code = self.reproduce(a.code(), b.code(), rng)?;
        Dna::parse(code)
    }
}
