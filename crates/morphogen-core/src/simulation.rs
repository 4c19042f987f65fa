//! Simulator seam and a kinematic stand-in
//!
//! A [`Simulator`] moves a creature for a number of steps and reports every
//! root position to the creature's movement tracker. The evolver only sees
//! the tracker, so any engine that honours the trait can score a generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::{DQuat, DVec3};
use morphogen_creature::{Creature, JointAxis, JointType, Phenotype};
use serde::{Deserialize, Serialize};

use crate::error::{EvolutionError, Result};

/// How a simulation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub steps_completed: usize,
    /// Stopped by a [`StopSignal`] before the step budget ran out
    pub interrupted: bool,
}

pub trait Simulator: Send + Sync {
    /// Run `creature` for `steps` steps, or until stopped when `None`.
    ///
    /// Implementations must call `creature.movement.track` once per step.
    fn simulate(&self, creature: &mut Creature, steps: Option<usize>)
        -> Result<SimulationOutcome>;
}

/// Shared flag asking running simulations to stop after the current step
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicSettings {
    /// Resting height of the root body
    pub spawn_height: f64,
    /// Downward acceleration per step
    pub gravity: f64,
    /// Horizontal displacement per unit of motor output and link length
    pub thrust_gain: f64,
    /// Vertical acceleration per unit of motor output and link length
    pub lift_gain: f64,
    /// Fraction of the recovery stroke that still moves the body
    pub slip: f64,
    /// Vertical velocity retained between steps
    pub damping: f64,
}

impl Default for KinematicSettings {
    fn default() -> Self {
        Self {
            spawn_height: 0.0,
            gravity: 0.02,
            thrust_gain: 0.05,
            lift_gain: 0.05,
            slip: 0.25,
            damping: 0.5,
        }
    }
}

/// Engine-free simulator integrating joint motors into a root trajectory.
///
/// Each actuated joint pushes the root while its motor output is positive
/// (stance) and by `slip` of its output while negative (recovery), so an
/// oscillating joint produces net travel. Revolute joints push along their
/// yaw heading, prismatic joints along their yaw-rotated axis, and vertical
/// prismatic joints lift the body against gravity.
#[derive(Debug, Clone, Default)]
pub struct KinematicSimulator {
    settings: KinematicSettings,
    stop: Option<StopSignal>,
}

/// Per-joint constants derived once before a run
#[derive(Debug, Clone, Copy)]
struct JointDrive {
    direction: DVec3,
    lift: bool,
    reach: f64,
}

impl JointDrive {
    fn from_phenotype(phenotype: &Phenotype) -> Option<Self> {
        if !phenotype.joint_type.is_actuated() {
            return None;
        }

        let yaw = DQuat::from_rotation_z(phenotype.joint_origin_rpy.z);
        let sliding = phenotype.joint_type == JointType::Prismatic;
        let lift = sliding && phenotype.joint_axis == JointAxis::Z;
        let direction = if lift {
            DVec3::Z
        } else if sliding {
            yaw * phenotype.joint_axis.unit()
        } else {
            yaw * DVec3::X
        };

        Some(Self {
            direction,
            lift,
            reach: phenotype.link_length,
        })
    }
}

impl KinematicSimulator {
    pub fn new(settings: KinematicSettings) -> Self {
        Self {
            settings,
            stop: None,
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn settings(&self) -> &KinematicSettings {
        &self.settings
    }

    pub fn stop_signal(&self) -> Option<&StopSignal> {
        self.stop.as_ref()
    }

    fn stopped(&self) -> bool {
        self.stop.as_ref().is_some_and(StopSignal::is_stopped)
    }

    fn rectify(&self, output: f64) -> f64 {
        if output > 0.0 {
            output
        } else {
            output * self.settings.slip
        }
    }
}

impl Simulator for KinematicSimulator {
    fn simulate(&self, creature: &mut Creature, steps: Option<usize>) -> Result<SimulationOutcome> {
        if steps.is_none() && self.stop.is_none() {
            return Err(EvolutionError::Simulation {
                reason: "unbounded simulation needs a stop signal".to_string(),
            });
        }

        let drives: Vec<Option<JointDrive>> = creature
            .body()
            .depth_first()
            .filter(|visited| !visited.part.is_root())
            .map(|visited| JointDrive::from_phenotype(visited.part.phenotype()))
            .collect();
        let mut motors = creature.motors();

        let settings = self.settings;
        let mut position = DVec3::new(0.0, 0.0, settings.spawn_height);
        let mut vertical_velocity = 0.0;
        let mut completed = 0usize;

        log::debug!(
            "Simulating {} with {} joints for {}",
            creature.name(),
            motors.len(),
            steps.map_or_else(|| "an open-ended run".to_string(), |n| format!("{} steps", n))
        );

        loop {
            if steps.is_some_and(|limit| completed >= limit) {
                break;
            }
            if self.stopped() {
                log::info!("{} stopped after {} steps", creature.name(), completed);
                return Ok(SimulationOutcome {
                    steps_completed: completed,
                    interrupted: true,
                });
            }

            let mut thrust = DVec3::ZERO;
            let mut lift = 0.0;
            for (motor, drive) in motors.iter_mut().zip(&drives) {
                // Passive joints still advance their oscillator
                let output = motor.output();
                let Some(drive) = drive else {
                    continue;
                };
                if drive.lift {
                    lift += output * drive.reach * settings.lift_gain;
                } else {
                    let push = self.rectify(output) * drive.reach * settings.thrust_gain;
                    thrust += drive.direction * push;
                }
            }

            vertical_velocity = (vertical_velocity + lift - settings.gravity) * settings.damping;
            position.x += thrust.x;
            position.y += thrust.y;
            position.z += vertical_velocity;
            if position.z < settings.spawn_height {
                position.z = settings.spawn_height;
                vertical_velocity = 0.0;
            }

            creature.movement.track(position);
            completed += 1;
            log::trace!("{} step {}: {:?}", creature.name(), completed, position);
        }

        Ok(SimulationOutcome {
            steps_completed: completed,
            interrupted: false,
        })
    }
}
