//! Evolution engine for morphogen creatures
//!
//! This crate implements:
//! - Populations with roulette parent selection and elitism
//! - The generational evolve loop with parallel simulation
//! - A kinematic simulator behind the `Simulator` seam
//! - Per-generation metrics, JSON snapshots and DNA files

pub mod error;
pub mod evolver;
pub mod generation;
pub mod hyperparams;
pub mod metrics;
pub mod persistence;
pub mod population;
pub mod simulation;

// Re-export main types for convenience
pub use error::{EvolutionError, Result};
pub use evolver::{EvolutionPhase, Evolver};
pub use generation::{EvolutionGeneration, EvolutionRecord};
pub use hyperparams::Hyperparams;
pub use metrics::{EvolutionMetrics, FitnessSummary, GeneCountSummary};
pub use persistence::{DnaRepository, GenerationRepository, WriteMode};
pub use population::Population;
pub use simulation::{
    KinematicSettings, KinematicSimulator, SimulationOutcome, Simulator, StopSignal,
};
