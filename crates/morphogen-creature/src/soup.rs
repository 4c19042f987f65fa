//! Random DNA for bootstrapping a population

use crate::dna::DEFAULT_EXPRESSION_THRESHOLD;
use crate::gene::GENE_LENGTH;
use crate::rng::GeneticRng;

/// Index of the control-expression base inside a gene
const EXPRESSION_BASE: usize = GENE_LENGTH - 1;

pub struct PrimordialSoup;

impl PrimordialSoup {
    /// One gene of uniform `[0, 1)` bases
    pub fn spark_gene<R: GeneticRng>(rng: &mut R) -> [f64; GENE_LENGTH] {
        std::array::from_fn(|_| rng.next_base())
    }

    /// A strand of `gene_count` uniform random genes
    pub fn spark_life<R: GeneticRng>(rng: &mut R, gene_count: usize) -> Vec<f64> {
        (0..gene_count * GENE_LENGTH)
            .map(|_| rng.next_base())
            .collect()
    }

    /// Like [`spark_life`](Self::spark_life), but each gene is switched on
    /// with probability `bias_to_expression` and the first gene always is,
    /// so the result develops at the default threshold.
    pub fn spark_life_biased<R: GeneticRng>(
        rng: &mut R,
        gene_count: usize,
        bias_to_expression: f64,
    ) -> Vec<f64> {
        let mut code = Self::spark_life(rng, gene_count);
        for (index, gene) in code.chunks_exact_mut(GENE_LENGTH).enumerate() {
            if index == 0 || rng.check_probability(bias_to_expression) {
                gene[EXPRESSION_BASE] = expressed_base(rng);
            }
        }
        code
    }
}

/// Uniform value in `[DEFAULT_EXPRESSION_THRESHOLD, 1)`
fn expressed_base<R: GeneticRng>(rng: &mut R) -> f64 {
    DEFAULT_EXPRESSION_THRESHOLD + rng.next_base() * (1.0 - DEFAULT_EXPRESSION_THRESHOLD)
}
