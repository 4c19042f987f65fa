//! DNA strands
//!
//! A strand is a flat sequence of bases read as consecutive genes. Trailing
//! bases that do not fill a whole gene stay in the strand (they are passed on
//! to offspring) but are not decoded.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GeneticError, Result};
use crate::gene::{Gene, GENE_LENGTH};
use crate::phenotype::Phenotype;

/// Default control value at or above which a gene is expressed
pub const DEFAULT_EXPRESSION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Dna {
    code: Vec<f64>,
    genes: Vec<Gene>,
}

impl Dna {
    /// Build a strand from raw bases
    pub fn parse(code: Vec<f64>) -> Result<Self> {
        if code.is_empty() {
            return Err(GeneticError::malformed("DNA code is empty"));
        }
        if let Some(position) = code.iter().position(|base| !base.is_finite()) {
            return Err(GeneticError::malformed(format!(
                "base {} is not a finite number ({})",
                position, code[position]
            )));
        }

        let genes = code
            .chunks_exact(GENE_LENGTH)
            .map(Gene::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { code, genes })
    }

    pub fn code(&self) -> &[f64] {
        &self.code
    }

    pub fn into_code(self) -> Vec<f64> {
        self.code
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// Number of complete genes in the strand
    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }

    /// Number of bases, including any trailing partial gene
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn expressed_count(&self, threshold: f64) -> usize {
        self.genes
            .iter()
            .filter(|gene| gene.is_expressed(threshold))
            .count()
    }

    /// Decode every expressed gene in strand order.
    ///
    /// Joint parents resolve against the expressed set, so silencing one gene
    /// shifts the parent of every later part.
    pub fn express(&self, threshold: f64) -> Vec<Phenotype> {
        self.genes
            .iter()
            .filter(|gene| gene.is_expressed(threshold))
            .enumerate()
            .map(|(expressed_index, gene)| Phenotype::parse(gene, expressed_index + 1))
            .collect()
    }
}

impl PartialEq for Dna {
    fn eq(&self, other: &Self) -> bool {
        self.code.len() == other.code.len()
            && self
                .code
                .iter()
                .zip(&other.code)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Dna {}

impl Hash for Dna {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.len().hash(state);
        for base in &self.code {
            base.to_bits().hash(state);
        }
    }
}

impl TryFrom<Vec<f64>> for Dna {
    type Error = GeneticError;

    fn try_from(code: Vec<f64>) -> Result<Self> {
        Self::parse(code)
    }
}

impl From<Dna> for Vec<f64> {
    fn from(dna: Dna) -> Self {
        dna.code
    }
}

impl FromStr for Dna {
    type Err = GeneticError;

    /// Parse comma-separated decimals; blank tokens such as a trailing comma
    /// are skipped.
    fn from_str(s: &str) -> Result<Self> {
        let code = s
            .split(',')
            .map(str::trim)
            .enumerate()
            .filter(|(_, token)| !token.is_empty())
            .map(|(position, token)| {
                token.parse::<f64>().map_err(|_| {
                    GeneticError::malformed(format!(
                        "token {} is not a number: {:?}",
                        position, token
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::parse(code)
    }
}

impl fmt::Display for Dna {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, base) in self.code.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", base)?;
        }
        Ok(())
    }
}
