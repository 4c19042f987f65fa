//! Per-generation statistics

use std::hash::Hash;

use ahash::HashMap;
use serde::{Deserialize, Serialize};

use crate::generation::EvolutionRecord;

/// Summary of a set of fitness values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessSummary {
    pub mean: f64,
    pub p95: f64,
    /// Population standard deviation
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
}

impl FitnessSummary {
    /// All-zero summary for an empty slice
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Self {
            mean,
            p95: percentile(&sorted, 95.0),
            stdev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Summary of strand lengths in whole genes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneCountSummary {
    pub mean: f64,
    pub min: usize,
    pub max: usize,
}

impl GeneCountSummary {
    pub fn from_counts(counts: &[usize]) -> Self {
        let (Some(&min), Some(&max)) = (counts.iter().min(), counts.iter().max()) else {
            return Self::default();
        };
        Self {
            mean: counts.iter().sum::<usize>() as f64 / counts.len() as f64,
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionMetrics {
    pub fitness: FitnessSummary,
    /// Shannon entropy in bits of the distribution of distinct strands
    pub dna_entropy: f64,
    pub gene_count: GeneCountSummary,
    pub expressed_genes: usize,
    pub suppressed_genes: usize,
    /// Individuals whose simulation ran to completion; fitness, survivors
    /// and deaths cover only these
    #[serde(default)]
    pub evaluated: usize,
    pub survivors: usize,
    pub deaths: usize,
    pub unique_dna: usize,
}

impl EvolutionMetrics {
    /// DNA statistics cover every record. Interrupted records are left out
    /// of the fitness summary and the survivor count.
    pub fn from_records(records: &[EvolutionRecord]) -> Self {
        let evaluated: Vec<&EvolutionRecord> =
            records.iter().filter(|r| !r.interrupted).collect();
        let fitness: Vec<f64> = evaluated.iter().map(|r| r.fitness).collect();
        let deaths = evaluated.iter().filter(|r| r.lethal).count();

        let gene_counts: Vec<usize> = records.iter().map(|r| r.gene_count).collect();
        let expressed_genes: usize = records.iter().map(|r| r.expressed_gene_count).sum();
        let strands = records.iter().map(|r| r.dna_code.as_str());

        Self {
            fitness: FitnessSummary::from_values(&fitness),
            dna_entropy: shannon_entropy(strands.clone()),
            gene_count: GeneCountSummary::from_counts(&gene_counts),
            expressed_genes,
            suppressed_genes: gene_counts.iter().sum::<usize>() - expressed_genes,
            evaluated: evaluated.len(),
            survivors: evaluated.len() - deaths,
            deaths,
            unique_dna: strands.collect::<ahash::HashSet<_>>().len(),
        }
    }
}

/// Nearest-rank percentile of an ascending slice
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Shannon entropy in bits of the empirical distribution of `items`
pub fn shannon_entropy<T, I>(items: I) -> f64
where
    T: Hash + Eq,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::default();
    let mut total = 0usize;
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>()
        .max(0.0)
}
