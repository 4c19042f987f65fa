//! Periodic joint actuation
//!
//! Each actuated joint is driven by an open-loop oscillator decoded from the
//! part's control bases. The phase advances by `frequency` radians per update
//! and wraps at 2π.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::phenotype::{Phenotype, Waveform};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    waveform: Waveform,
    amplitude: f64,
    frequency: f64,
    phase: f64,
}

impl Motor {
    pub fn new(waveform: Waveform, amplitude: f64, frequency: f64) -> Self {
        Self {
            waveform,
            amplitude,
            frequency,
            phase: 0.0,
        }
    }

    pub fn from_phenotype(phenotype: &Phenotype) -> Self {
        Self::new(
            phenotype.control_waveform,
            phenotype.control_amplitude,
            phenotype.control_frequency,
        )
    }

    /// Advance one update and return the new output
    pub fn output(&mut self) -> f64 {
        self.phase = (self.phase + self.frequency).rem_euclid(TAU);
        match self.waveform {
            // Square wave: half a period is π / frequency updates
            Waveform::Pulse => {
                if self.phase < PI {
                    self.amplitude
                } else {
                    -self.amplitude
                }
            }
            Waveform::Sine => self.amplitude * self.phase.sin(),
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

impl Iterator for Motor {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.output())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_alternates_with_half_period() {
        // One radian per update: phases 1..3 are high, 4..6 low, 7 wraps to 0.72
        let motor = Motor::new(Waveform::Pulse, 0.2, 1.0);
        let outputs: Vec<f64> = motor.take(8).collect();
        assert_eq!(outputs, vec![0.2, 0.2, 0.2, -0.2, -0.2, -0.2, 0.2, 0.2]);
    }

    #[test]
    fn test_pulse_stays_within_amplitude() {
        let mut motor = Motor::new(Waveform::Pulse, 0.25, 0.37);
        for _ in 0..1000 {
            let out = motor.output();
            assert!(out == 0.25 || out == -0.25);
        }
    }

    #[test]
    fn test_sine_follows_phase() {
        let mut motor = Motor::new(Waveform::Sine, 0.25, 0.1);
        for step in 1..=50 {
            let expected = 0.25 * (0.1 * step as f64).rem_euclid(TAU).sin();
            assert!((motor.output() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_phase_wraps() {
        let mut motor = Motor::new(Waveform::Sine, 1.0, 1.0);
        for _ in 0..100 {
            motor.output();
            assert!((0.0..TAU).contains(&motor.phase()));
        }
        motor.reset();
        assert_eq!(motor.phase(), 0.0);
    }

    #[test]
    fn test_zero_frequency_is_constant() {
        let mut sine = Motor::new(Waveform::Sine, 0.2, 0.0);
        assert_eq!(sine.output(), 0.0);
        let mut pulse = Motor::new(Waveform::Pulse, 0.2, 0.0);
        assert_eq!(pulse.output(), 0.2);
        assert_eq!(pulse.output(), 0.2);
    }
}
