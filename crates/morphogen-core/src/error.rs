//! Evolution error types

use morphogen_creature::GeneticError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error(transparent)]
    Genetic(#[from] GeneticError),

    #[error("Population empty")]
    EmptyPopulation,

    #[error("Invalid hyperparameters: {reason}")]
    InvalidHyperparams { reason: String },

    #[error("Genesis exhausted after {attempts} non-viable sparks ({produced}/{target} viable)")]
    GenesisExhausted {
        attempts: usize,
        produced: usize,
        target: usize,
    },

    #[error(
        "Reproduction exhausted after {attempts} non-viable offspring ({produced}/{target} produced)"
    )]
    ReproductionExhausted {
        attempts: usize,
        produced: usize,
        target: usize,
    },

    #[error("Simulation failed: {reason}")]
    Simulation { reason: String },
}

pub type Result<T> = std::result::Result<T, EvolutionError>;
