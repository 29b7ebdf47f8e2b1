//! Per-device configuration and mutable counters.
//!
//! A [`DeviceState`] is plain data: the engine owns one per generator in a
//! `SlotMap` and every phase mutates it through the engine. The activity flag
//! is private to the crate so that it can only change together with the
//! engine's active index (see [`crate::marker`]).

use crate::fixed::Fixed64;
use crate::id::ResourceKind;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Static tuning of a generator, fixed when the device is created.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratorConfig {
    /// Seconds of insertion delay per unit of item mass.
    pub base_insertion_delay: Fixed64,
    /// Resource units produced per unit of mass consumed.
    pub yield_per_unit_mass: Fixed64,
    /// Extra factor applied to `yield_per_unit_mass` for produce items.
    pub produce_yield_multiplier: Fixed64,
    /// Seconds of processing time added per unit of mass consumed.
    pub processing_time_per_unit_mass: Fixed64,
    /// The material emitted into the resource store.
    pub required_material: ResourceKind,
}

/// The material id conventionally assigned to biomass.
pub const BIOMASS: ResourceKind = ResourceKind(0);

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_insertion_delay: Fixed64::from_num(0.1),
            yield_per_unit_mass: Fixed64::from_num(0.6),
            produce_yield_multiplier: Fixed64::from_num(1),
            processing_time_per_unit_mass: Fixed64::from_num(0.5),
            required_material: BIOMASS,
        }
    }
}

/// A configuration value outside its allowed range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    /// The value is not finite or does not fit the fixed-point range.
    #[error("{field} is not representable, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl GeneratorConfig {
    /// Check every rate and delay once, at load time. The tick loop never
    /// re-checks them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("base_insertion_delay", self.base_insertion_delay),
            ("yield_per_unit_mass", self.yield_per_unit_mass),
            (
                "processing_time_per_unit_mass",
                self.processing_time_per_unit_mass,
            ),
        ];
        for (field, value) in positive {
            if value <= Fixed64::ZERO {
                return Err(ConfigError::NonPositive {
                    field,
                    value: value.to_num(),
                });
            }
        }
        if self.produce_yield_multiplier < Fixed64::ZERO {
            return Err(ConfigError::Negative {
                field: "produce_yield_multiplier",
                value: self.produce_yield_multiplier.to_num(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Presentation-facing status. Written by callers, never derived by the
/// engine.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum GeneratorStatus {
    #[default]
    Idle,
    Generating,
}

// ---------------------------------------------------------------------------
// Device state
// ---------------------------------------------------------------------------

/// Configuration plus the mutable counters of one generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub config: GeneratorConfig,
    /// Seconds until the accumulated work completes. Left slightly negative
    /// by the tick that completes it.
    pub processing_timer: Fixed64,
    /// Resource units owed. Only the whole part is ever emitted; the
    /// remainder carries into the next completion.
    pub expected_yield: Fixed64,
    pub status: GeneratorStatus,
    pub(crate) active: bool,
}

impl DeviceState {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            processing_timer: Fixed64::ZERO,
            expected_yield: Fixed64::ZERO,
            status: GeneratorStatus::Idle,
            active: false,
        }
    }

    /// Whether the device carries the active marker.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Remaining processing time as shown to players; never negative.
    pub fn time_left(&self) -> Fixed64 {
        self.processing_timer.max(Fixed64::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(GeneratorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_insertion_delay_is_rejected() {
        let config = GeneratorConfig {
            base_insertion_delay: Fixed64::ZERO,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "base_insertion_delay",
                ..
            })
        ));
    }

    #[test]
    fn negative_processing_rate_is_rejected() {
        let config = GeneratorConfig {
            processing_time_per_unit_mass: Fixed64::from_num(-1),
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "processing_time_per_unit_mass",
                ..
            })
        ));
    }

    #[test]
    fn zero_produce_multiplier_is_allowed() {
        let config = GeneratorConfig {
            produce_yield_multiplier: Fixed64::ZERO,
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_produce_multiplier_is_rejected() {
        let config = GeneratorConfig {
            produce_yield_multiplier: Fixed64::from_num(-0.5),
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative { .. })
        ));
    }

    #[test]
    fn new_device_is_idle_and_inactive() {
        let device = DeviceState::new(GeneratorConfig::default());
        assert_eq!(device.status, GeneratorStatus::Idle);
        assert!(!device.is_active());
        assert_eq!(device.processing_timer, Fixed64::ZERO);
        assert_eq!(device.expected_yield, Fixed64::ZERO);
    }

    #[test]
    fn time_left_clamps_negative_timer() {
        let mut device = DeviceState::new(GeneratorConfig::default());
        device.processing_timer = Fixed64::from_num(-0.02);
        assert_eq!(device.time_left(), Fixed64::ZERO);
        device.processing_timer = Fixed64::from_num(1.5);
        assert_eq!(device.time_left(), Fixed64::from_num(1.5));
    }
}
