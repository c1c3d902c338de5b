//! # Physics Configuration
//!
//! Settings for the simulation core and the fixed-step driver.
//!
//! ## Example (TOML)
//!
//! ```toml
//! [simulation]
//! gravity = [0.0, 0.0, -10.0]
//! solver_iterations = 5
//! body_capacity = 128
//! max_ballistic_contacts = 1024
//!
//! [stepper]
//! fixed_timestep = 0.016666668
//! max_frame_time = 0.25
//! max_steps_per_frame = 8
//! ```

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::math::Vec3;
use crate::foundation::time::FixedTimestep;

/// Core simulation settings consumed by [`crate::physics::Scene`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Acceleration applied to every dynamic body each step
    pub gravity: Vec3,
    /// Whole-system Gauss-Seidel sweeps per step
    pub solver_iterations: usize,
    /// Initial reservation for the body arena
    pub body_capacity: usize,
    /// Upper bound on time-of-impact contacts kept per step
    pub max_ballistic_contacts: usize,
}

impl SimulationConfig {
    /// Create the default simulation settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set gravity
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the number of solver iterations
    #[must_use]
    pub fn with_solver_iterations(mut self, iterations: usize) -> Self {
        self.solver_iterations = iterations;
        self
    }

    /// Set the ballistic contact buffer capacity
    #[must_use]
    pub fn with_max_ballistic_contacts(mut self, capacity: usize) -> Self {
        self.max_ballistic_contacts = capacity;
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -10.0),
            solver_iterations: 5,
            body_capacity: 128,
            max_ballistic_contacts: 1024,
        }
    }
}

/// Fixed-step driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    /// Simulation step in seconds
    pub fixed_timestep: f32,
    /// Longest frame time fed into the accumulator
    pub max_frame_time: f32,
    /// Hard cap on steps simulated per frame
    pub max_steps_per_frame: u32,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_frame_time: 0.25,
            max_steps_per_frame: 8,
        }
    }
}

impl StepperConfig {
    /// Accumulator driven by these settings
    pub fn timestep(&self) -> FixedTimestep {
        FixedTimestep::new(self.fixed_timestep, self.max_frame_time, self.max_steps_per_frame)
    }
}

/// Complete physics configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Simulation core settings
    pub simulation: SimulationConfig,
    /// Fixed-step driver settings
    pub stepper: StepperConfig,
}

impl PhysicsConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the simulation settings
    #[must_use]
    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    /// Replace the stepper settings
    #[must_use]
    pub fn with_stepper(mut self, stepper: StepperConfig) -> Self {
        self.stepper = stepper;
        self
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.simulation.gravity.iter().all(|g| g.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "simulation.gravity",
                reason: "components must be finite".to_string(),
            });
        }
        if self.simulation.solver_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "simulation.solver_iterations",
                reason: "at least one iteration is required".to_string(),
            });
        }
        let step = self.stepper.fixed_timestep;
        if !(step.is_finite() && step > 0.0) {
            return Err(ConfigError::Invalid {
                field: "stepper.fixed_timestep",
                reason: format!("{step} is not a positive duration"),
            });
        }
        if self.stepper.max_frame_time < step {
            return Err(ConfigError::Invalid {
                field: "stepper.max_frame_time",
                reason: "must be at least one fixed timestep".to_string(),
            });
        }
        Ok(())
    }
}

impl Config for PhysicsConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_settings_are_valid() {
        let config = PhysicsConfig::default();
        assert_eq!(config.simulation.gravity, Vec3::new(0.0, 0.0, -10.0));
        assert_eq!(config.simulation.solver_iterations, 5);
        assert_eq!(config.simulation.body_capacity, 128);
        assert_relative_eq!(config.stepper.fixed_timestep, 1.0 / 60.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_override() {
        let text = "[simulation]\nsolver_iterations = 12\ngravity = [0.0, 0.0, -9.81]\n";
        let config = PhysicsConfig::from_str_as(text, ConfigFormat::Toml).unwrap();

        assert_eq!(config.simulation.solver_iterations, 12);
        assert_relative_eq!(config.simulation.gravity.z, -9.81);
        // Untouched sections keep their defaults
        assert_eq!(config.simulation.max_ballistic_contacts, 1024);
        assert_eq!(config.stepper.max_steps_per_frame, 8);
    }

    #[test]
    fn test_ron_roundtrip_preserves_settings() {
        let config = PhysicsConfig::new()
            .with_simulation(
                SimulationConfig::new()
                    .with_solver_iterations(9)
                    .with_max_ballistic_contacts(16),
            )
            .with_stepper(StepperConfig {
                max_steps_per_frame: 3,
                ..StepperConfig::default()
            });
        let text = config.to_string_as(ConfigFormat::Ron).unwrap();
        let parsed = PhysicsConfig::from_str_as(&text, ConfigFormat::Ron).unwrap();

        assert_eq!(parsed.simulation.solver_iterations, 9);
        assert_eq!(parsed.simulation.max_ballistic_contacts, 16);
        assert_eq!(parsed.stepper.max_steps_per_frame, 3);
    }

    #[test]
    fn test_validate_rejects_zero_timestep() {
        let mut config = PhysicsConfig::default();
        config.stepper.fixed_timestep = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "stepper.fixed_timestep", .. })
        ));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = PhysicsConfig::load_from_file("physics.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
