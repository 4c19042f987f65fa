//! Genetic encoding and body development for morphogen creatures
//!
//! This crate implements:
//! - Fixed-width genes and DNA strands with expression gating
//! - Gene decoding into link, joint and motor parameters
//! - Body-tree development and movement/lethality tracking
//! - Crossover and point/shrink/grow mutation on raw strands
//! - URDF rendering of developed bodies

pub mod creature;
pub mod dna;
pub mod error;
pub mod gene;
pub mod motor;
pub mod movement;
pub mod phenotype;
pub mod render;
pub mod reproduction;
pub mod rng;
pub mod soup;
pub mod types;

// Re-export main types for convenience
pub use creature::{Creature, CreatureBody, CreaturePart, PartId, PartPath};
pub use dna::{Dna, DEFAULT_EXPRESSION_THRESHOLD};
pub use error::GeneticError;
pub use gene::{Gene, GENE_LENGTH};
pub use motor::Motor;
pub use movement::{CreatureMovement, LethalityLimits, SPAWN_POINT};
pub use phenotype::{JointAxis, JointType, LinkShape, Phenotype, Waveform};
pub use render::{BodyRenderer, UrdfRenderer};
pub use reproduction::{Reproduction, ReproductionSettings};
pub use rng::GeneticRng;
pub use soup::PrimordialSoup;
pub use types::CreatureId;
