//! Gene decoding
//!
//! A phenotype is the physical, joint and control description of one body
//! part. Decoding is a pure function of the gene and of how many genes have
//! been expressed so far, so persisted DNA decodes identically across runs.
//!
//! Boundaries are inclusive on the lower variant: a raw value of exactly
//! `0.5` selects a cylinder link and a pulse waveform, `0.33` selects a fixed
//! joint and `0.66` a revolute one.

use std::f64::consts::TAU;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::gene::Gene;

/// Upper bound of the first band for three-way selectors
pub const LOWER_TERTILE: f64 = 0.33;
/// Upper bound of the second band for three-way selectors
pub const UPPER_TERTILE: f64 = 0.66;
/// Boundary for two-way selectors
pub const BINARY_SPLIT: f64 = 0.5;

pub const LINK_LENGTH_SCALE: f64 = 2.0;
pub const LINK_RECURRENCE_SCALE: f64 = 3.0;
pub const CONTROL_AMPLITUDE_SCALE: f64 = 0.25;
/// Largest joint-parent selector value, keeps the parent index below the child
pub const JOINT_PARENT_CEILING: f64 = 0.99;

/// Geometry primitive of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkShape {
    Cylinder,
    Sphere,
}

impl LinkShape {
    pub fn from_raw(raw: f64) -> Self {
        if raw <= BINARY_SPLIT {
            LinkShape::Cylinder
        } else {
            LinkShape::Sphere
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LinkShape::Cylinder => "cylinder",
            LinkShape::Sphere => "sphere",
        }
    }
}

impl std::fmt::Display for LinkShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Joint connecting a part to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointType {
    Fixed,
    Revolute,
    Prismatic,
}

impl JointType {
    pub fn from_raw(raw: f64) -> Self {
        if raw <= LOWER_TERTILE {
            JointType::Fixed
        } else if raw <= UPPER_TERTILE {
            JointType::Revolute
        } else {
            JointType::Prismatic
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JointType::Fixed => "fixed",
            JointType::Revolute => "revolute",
            JointType::Prismatic => "prismatic",
        }
    }

    /// Whether a motor can drive this joint
    pub fn is_actuated(&self) -> bool {
        !matches!(self, JointType::Fixed)
    }
}

impl std::fmt::Display for JointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Principal axis a joint rotates around or slides along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointAxis {
    X,
    Y,
    Z,
}

impl JointAxis {
    pub fn from_raw(raw: f64) -> Self {
        if raw <= LOWER_TERTILE {
            JointAxis::X
        } else if raw <= UPPER_TERTILE {
            JointAxis::Y
        } else {
            JointAxis::Z
        }
    }

    pub fn unit(&self) -> DVec3 {
        match self {
            JointAxis::X => DVec3::X,
            JointAxis::Y => DVec3::Y,
            JointAxis::Z => DVec3::Z,
        }
    }
}

/// Periodic actuation pattern of a joint motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Waveform {
    Pulse,
    Sine,
}

impl Waveform {
    pub fn from_raw(raw: f64) -> Self {
        if raw <= BINARY_SPLIT {
            Waveform::Pulse
        } else {
            Waveform::Sine
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Pulse => "pulse",
            Waveform::Sine => "sine",
        }
    }
}

impl std::fmt::Display for Waveform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decoded parameters of one expressed gene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    pub link_shape: LinkShape,
    pub link_length: f64,
    pub link_radius: f64,
    pub link_recurrence: u32,
    pub link_mass: f64,
    /// Expressed index of the parent part, `None` for the root
    pub joint_parent: Option<usize>,
    pub joint_type: JointType,
    pub joint_axis: JointAxis,
    /// Roll, pitch and yaw offsets in radians
    pub joint_origin_rpy: DVec3,
    pub joint_origin_xyz: DVec3,
    pub control_waveform: Waveform,
    pub control_amplitude: f64,
    pub control_frequency: f64,
}

impl Phenotype {
    /// Decode `gene`, where `gene_count` is the number of expressed genes up
    /// to and including this one.
    pub fn parse(gene: &Gene, gene_count: usize) -> Self {
        Self {
            link_shape: LinkShape::from_raw(gene.link_shape),
            link_length: gene.link_length * LINK_LENGTH_SCALE,
            link_radius: gene.link_radius,
            link_recurrence: (gene.link_recurrence * LINK_RECURRENCE_SCALE).floor().max(0.0) as u32,
            link_mass: gene.link_mass,
            joint_parent: resolve_joint_parent(gene.joint_parent, gene_count),
            joint_type: JointType::from_raw(gene.joint_type),
            joint_axis: JointAxis::from_raw(gene.joint_axis),
            joint_origin_rpy: DVec3::new(
                gene.joint_origin_roll,
                gene.joint_origin_pitch,
                gene.joint_origin_yaw,
            ) * TAU,
            joint_origin_xyz: DVec3::new(
                gene.joint_origin_x,
                gene.joint_origin_y,
                gene.joint_origin_z,
            ),
            control_waveform: Waveform::from_raw(gene.control_waveform),
            control_amplitude: gene.control_amplitude * CONTROL_AMPLITUDE_SCALE,
            control_frequency: gene.control_frequency,
        }
    }

    pub fn is_root(&self) -> bool {
        self.joint_parent.is_none()
    }
}

/// Map a raw selector onto one of the `gene_count - 1` earlier parts
fn resolve_joint_parent(raw: f64, gene_count: usize) -> Option<usize> {
    if gene_count <= 1 {
        return None;
    }
    let selector = raw.clamp(0.0, JOINT_PARENT_CEILING);
    Some((selector * (gene_count - 1) as f64).floor() as usize)
}
