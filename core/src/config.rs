//! Tunable parameters for the field and its generation pass.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PhaseId;

/// Aggregated tuning knobs controlling regrowth, rebuild pacing, and carving.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Number of terrain instances constructed before the first fill.
    pub prewarm_instances: usize,
    /// Delay before a vetoed regrowth attempt is retried, in milliseconds.
    pub retry_interval_ms: u64,
    /// Base regrowth delay for phases missing from the phase table, in milliseconds.
    pub default_regrowth_delay_ms: u64,
    /// Regrowth timing per phase, indexed by [`PhaseId`].
    pub phases: Vec<PhaseProfile>,
    /// Minimum simulated time between two collision rebuilds, in milliseconds.
    pub rebuild_min_interval_ms: u64,
    /// Radius of the permanent disk carved at every corridor step.
    pub corridor_radius: u32,
    /// Radius of the region a corridor must touch to count as connected.
    pub destination_radius: u32,
    /// Parameters for the initial maze generation pass.
    pub generation: GenerationConfig,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            prewarm_instances: 0,
            retry_interval_ms: 500,
            default_regrowth_delay_ms: 4_000,
            phases: Vec::new(),
            rebuild_min_interval_ms: 100,
            corridor_radius: 1,
            destination_radius: 1,
            generation: GenerationConfig::default(),
        }
    }
}

impl FieldConfig {
    /// Checks that every parameter lies in its supported range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_interval_ms == 0 {
            return Err(ConfigError::ZeroRetryInterval);
        }
        for (index, profile) in self.phases.iter().enumerate() {
            if !profile.rate_multiplier.is_finite() || profile.rate_multiplier < 0.0 {
                return Err(ConfigError::InvalidRateMultiplier {
                    phase: index,
                    value: profile.rate_multiplier,
                });
            }
        }
        Ok(())
    }

    /// Delay between vetoed regrowth attempts.
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Minimum simulated time between two collision rebuilds.
    #[must_use]
    pub fn rebuild_min_interval(&self) -> Duration {
        Duration::from_millis(self.rebuild_min_interval_ms)
    }

    /// Regrowth delay for the phase: its base delay scaled by its rate multiplier.
    ///
    /// Phases without a profile fall back to the default delay with a
    /// multiplier of one.
    #[must_use]
    pub fn regrowth_delay(&self, phase: PhaseId) -> Duration {
        match self.phases.get(usize::from(phase.get())) {
            Some(profile) => {
                let base = Duration::from_millis(profile.base_delay_ms);
                Duration::try_from_secs_f64(base.as_secs_f64() * f64::from(profile.rate_multiplier))
                    .unwrap_or(base)
            }
            None => Duration::from_millis(self.default_regrowth_delay_ms),
        }
    }
}

/// Regrowth timing for a single phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseProfile {
    /// Base delay before filler regrows, in milliseconds.
    pub base_delay_ms: u64,
    /// Factor applied to the base delay; values below one speed regrowth up.
    #[serde(default = "unit_multiplier")]
    pub rate_multiplier: f32,
}

fn unit_multiplier() -> f32 {
    1.0
}

/// Parameters controlling the initial maze layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of rooms carved and connected to the seed pocket.
    pub rooms: u32,
    /// Radius of each room measured in cells.
    pub room_radius: u32,
    /// Radius of the seed pocket at the grid center.
    pub seed_radius: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            rooms: 4,
            room_radius: 1,
            seed_radius: 2,
        }
    }
}

/// Reasons a field configuration is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Vetoed regrowth would retry in the same tick forever.
    #[error("retry interval must be greater than zero")]
    ZeroRetryInterval,
    /// A phase multiplier is negative or not a finite number.
    #[error("phase {phase} has invalid rate multiplier {value}")]
    InvalidRateMultiplier {
        /// Index of the offending phase.
        phase: usize,
        /// Rejected multiplier.
        value: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_phase_uses_default_delay() {
        let config = FieldConfig::default();
        assert_eq!(
            config.regrowth_delay(PhaseId::new(3)),
            Duration::from_millis(4_000)
        );
    }

    #[test]
    fn phase_delay_is_scaled_by_multiplier() {
        let config = FieldConfig {
            phases: vec![
                PhaseProfile {
                    base_delay_ms: 2_000,
                    rate_multiplier: 1.0,
                },
                PhaseProfile {
                    base_delay_ms: 2_000,
                    rate_multiplier: 0.5,
                },
            ],
            ..FieldConfig::default()
        };
        assert_eq!(
            config.regrowth_delay(PhaseId::new(0)),
            Duration::from_millis(2_000)
        );
        assert_eq!(
            config.regrowth_delay(PhaseId::new(1)),
            Duration::from_millis(1_000)
        );
    }

    #[test]
    fn validation_rejects_zero_retry_interval() {
        let config = FieldConfig {
            retry_interval_ms: 0,
            ..FieldConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRetryInterval));
    }

    #[test]
    fn validation_rejects_negative_multiplier() {
        let config = FieldConfig {
            phases: vec![PhaseProfile {
                base_delay_ms: 1_000,
                rate_multiplier: -1.0,
            }],
            ..FieldConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRateMultiplier { phase: 0, .. })
        ));
    }
}
