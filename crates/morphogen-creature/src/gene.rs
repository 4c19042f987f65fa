//! Fixed-width gene records
//!
//! A gene is 18 consecutive bases of a DNA strand. Each base is a float that
//! is nominally in `[0, 1)` and is interpreted by [`crate::phenotype`].

use serde::{Deserialize, Serialize};

use crate::error::{GeneticError, Result};

/// Number of bases in one gene
pub const GENE_LENGTH: usize = 18;

/// One gene: the raw parameters of a single body part
///
/// Field order is the on-disk base order. Reading and writing the
/// positional form only happens in [`Gene::from_bases`] and [`Gene::to_bases`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub link_shape: f64,
    pub link_length: f64,
    pub link_radius: f64,
    pub link_recurrence: f64,
    pub link_mass: f64,
    pub joint_parent: f64,
    pub joint_type: f64,
    pub joint_axis: f64,
    pub joint_origin_roll: f64,
    pub joint_origin_pitch: f64,
    pub joint_origin_yaw: f64,
    pub joint_origin_x: f64,
    pub joint_origin_y: f64,
    pub joint_origin_z: f64,
    pub control_waveform: f64,
    pub control_amplitude: f64,
    pub control_frequency: f64,
    pub control_expression: f64,
}

// Adding or removing a field without touching GENE_LENGTH fails to compile.
const _: () = assert!(std::mem::size_of::<Gene>() == GENE_LENGTH * std::mem::size_of::<f64>());

impl Gene {
    pub fn from_bases(bases: [f64; GENE_LENGTH]) -> Self {
        let [
            link_shape,
            link_length,
            link_radius,
            link_recurrence,
            link_mass,
            joint_parent,
            joint_type,
            joint_axis,
            joint_origin_roll,
            joint_origin_pitch,
            joint_origin_yaw,
            joint_origin_x,
            joint_origin_y,
            joint_origin_z,
            control_waveform,
            control_amplitude,
            control_frequency,
            control_expression,
        ] = bases;
        Self {
            link_shape,
            link_length,
            link_radius,
            link_recurrence,
            link_mass,
            joint_parent,
            joint_type,
            joint_axis,
            joint_origin_roll,
            joint_origin_pitch,
            joint_origin_yaw,
            joint_origin_x,
            joint_origin_y,
            joint_origin_z,
            control_waveform,
            control_amplitude,
            control_frequency,
            control_expression,
        }
    }

    pub fn to_bases(&self) -> [f64; GENE_LENGTH] {
        [
            self.link_shape,
            self.link_length,
            self.link_radius,
            self.link_recurrence,
            self.link_mass,
            self.joint_parent,
            self.joint_type,
            self.joint_axis,
            self.joint_origin_roll,
            self.joint_origin_pitch,
            self.joint_origin_yaw,
            self.joint_origin_x,
            self.joint_origin_y,
            self.joint_origin_z,
            self.control_waveform,
            self.control_amplitude,
            self.control_frequency,
            self.control_expression,
        ]
    }

    /// Whether this gene produces a body part at the given threshold
    pub fn is_expressed(&self, threshold: f64) -> bool {
        self.control_expression >= threshold
    }
}

impl From<[f64; GENE_LENGTH]> for Gene {
    fn from(bases: [f64; GENE_LENGTH]) -> Self {
        Self::from_bases(bases)
    }
}

impl TryFrom<&[f64]> for Gene {
    type Error = GeneticError;

    fn try_from(bases: &[f64]) -> Result<Self> {
        let window: [f64; GENE_LENGTH] =
            bases
                .try_into()
                .map_err(|_| GeneticError::InvalidGeneLength {
                    expected: GENE_LENGTH,
                    actual: bases.len(),
                })?;
        Ok(Self::from_bases(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending() -> [f64; GENE_LENGTH] {
        let mut bases = [0.0; GENE_LENGTH];
        for (i, base) in bases.iter_mut().enumerate() {
            *base = i as f64 / 100.0;
        }
        bases
    }

    #[test]
    fn test_field_order_matches_base_order() {
        let gene = Gene::from_bases(ascending());
        assert_eq!(gene.link_shape, 0.0);
        assert_eq!(gene.link_mass, 0.04);
        assert_eq!(gene.joint_parent, 0.05);
        assert_eq!(gene.joint_axis, 0.07);
        assert_eq!(gene.joint_origin_roll, 0.08);
        assert_eq!(gene.joint_origin_z, 0.13);
        assert_eq!(gene.control_waveform, 0.14);
        assert_eq!(gene.control_expression, 0.17);
    }

    #[test]
    fn test_bases_round_trip() {
        let bases = ascending();
        assert_eq!(Gene::from(bases).to_bases(), bases);
    }

    #[test]
    fn test_try_from_rejects_wrong_length() {
        let short = [0.5; GENE_LENGTH - 1];
        let err = Gene::try_from(&short[..]).unwrap_err();
        assert_eq!(
            err,
            GeneticError::InvalidGeneLength {
                expected: GENE_LENGTH,
                actual: GENE_LENGTH - 1
            }
        );

        let exact = [0.5; GENE_LENGTH];
        assert!(Gene::try_from(&exact[..]).is_ok());
    }

    #[test]
    fn test_expression_threshold_is_inclusive() {
        let mut bases = [0.0; GENE_LENGTH];
        bases[GENE_LENGTH - 1] = 0.5;
        let gene = Gene::from_bases(bases);
        assert!(gene.is_expressed(0.5));
        assert!(!gene.is_expressed(0.51));
    }
}
