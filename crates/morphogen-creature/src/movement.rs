//! Movement tracking and lethality classification
//!
//! The simulator reports the creature's root position once per step. Fitness
//! is the straight-line distance from the spawn point to the last report.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Where every creature is considered to start
pub const SPAWN_POINT: DVec3 = DVec3::ZERO;

/// Bounds beyond which a step disqualifies the creature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LethalityLimits {
    /// Highest allowed vertical position
    pub max_height: f64,
    /// Largest allowed displacement between two tracked steps
    pub max_step_distance: f64,
}

impl Default for LethalityLimits {
    fn default() -> Self {
        Self {
            max_height: 5.5,
            max_step_distance: 0.75,
        }
    }
}

impl LethalityLimits {
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_height.is_finite() {
            return Err(format!("max_height must be finite, got {}", self.max_height));
        }
        if self.max_step_distance.is_nan() || self.max_step_distance <= 0.0 {
            return Err(format!(
                "max_step_distance must be positive, got {}",
                self.max_step_distance
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureMovement {
    initial: DVec3,
    last: Option<DVec3>,
    lethal_move: bool,
    steps: usize,
    limits: LethalityLimits,
}

impl Default for CreatureMovement {
    fn default() -> Self {
        Self::new(LethalityLimits::default())
    }
}

impl CreatureMovement {
    pub fn new(limits: LethalityLimits) -> Self {
        Self {
            initial: SPAWN_POINT,
            last: None,
            lethal_move: false,
            steps: 0,
            limits,
        }
    }

    /// Movement state equivalent to a finished run with the given outcome
    pub fn restored(distance: f64, lethal_move: bool, steps: usize, limits: LethalityLimits) -> Self {
        let distance = if distance.is_finite() { distance.max(0.0) } else { 0.0 };
        Self {
            initial: SPAWN_POINT,
            last: (steps > 0).then(|| SPAWN_POINT + DVec3::X * distance),
            lethal_move,
            steps,
            limits,
        }
    }

    /// Record one simulation step. Returns whether the step was lethal.
    ///
    /// Non-finite positions are ignored.
    pub fn track(&mut self, position: DVec3) -> bool {
        if !position.is_finite() {
            log::trace!("Ignoring non-finite position {:?}", position);
            return false;
        }

        let too_high = position.z > self.limits.max_height;
        let too_fast = self
            .last
            .is_some_and(|last| last.distance(position) > self.limits.max_step_distance);
        let lethal = too_high || too_fast;

        if lethal && !self.lethal_move {
            log::debug!(
                "Lethal move at step {}: position {:?} (too high: {}, too fast: {})",
                self.steps,
                position,
                too_high,
                too_fast
            );
        }

        self.lethal_move |= lethal;
        self.last = Some(position);
        self.steps += 1;
        lethal
    }

    /// Euclidean distance from spawn to the last tracked position
    pub fn distance(&self) -> f64 {
        match self.last {
            Some(last) => {
                let distance = self.initial.distance(last);
                if distance.is_nan() {
                    0.0
                } else {
                    distance
                }
            }
            None => 0.0,
        }
    }

    pub fn initial(&self) -> DVec3 {
        self.initial
    }

    pub fn last(&self) -> Option<DVec3> {
        self.last
    }

    pub fn is_tracked(&self) -> bool {
        self.last.is_some()
    }

    pub fn lethal_move(&self) -> bool {
        self.lethal_move
    }

    /// Number of steps tracked so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn limits(&self) -> &LethalityLimits {
        &self.limits
    }
}
