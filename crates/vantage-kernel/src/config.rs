//! Kernel and host configuration, validation, and error types.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use vantage_core::ComponentSchema;

/// Configuration for constructing a [`crate::Kernel`].
///
/// The schema is fixed for the kernel's lifetime: the live store, every
/// replica, and every pooled scratch instance are built from it, so all
/// snapshot syncs copy between identically-shaped stores.
#[derive(Clone, Debug)]
pub struct KernelConfig {
    /// Component schema shared by the live store and all snapshots.
    pub schema: Arc<ComponentSchema>,
    /// Capacity of each store's change-event log. Overflow evicts the
    /// oldest events and is counted, not an error. Default: 1024.
    pub event_capacity: usize,
    /// Scratch instances to pre-populate the snapshot pool with,
    /// avoiding first-use allocation latency. Default: 0.
    pub pool_warmup: usize,
}

impl KernelConfig {
    /// Create a configuration with default capacities for `schema`.
    pub fn new(schema: Arc<ComponentSchema>) -> Self {
        Self {
            schema,
            event_capacity: 1024,
            pool_warmup: 0,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.component_count() == 0 {
            return Err(ConfigError::EmptySchema);
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::EventCapacityZero);
        }
        Ok(())
    }
}

/// Configuration for [`crate::KernelHost`].
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Ticks per second the host drives the kernel at. Default: 60.
    pub tick_rate_hz: f64,
    /// Capacity of the bounded control channel. Default: 16.
    pub control_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            control_capacity: 16,
        }
    }
}

impl HostConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(ConfigError::InvalidTickRate {
                value: self.tick_rate_hz,
            });
        }
        if self.control_capacity == 0 {
            return Err(ConfigError::ControlCapacityZero);
        }
        Ok(())
    }
}

/// Errors detected during configuration validation or host startup.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The schema registers no component types.
    EmptySchema,
    /// The event-log capacity is zero.
    EventCapacityZero,
    /// `tick_rate_hz` is NaN, infinite, zero, or negative.
    InvalidTickRate {
        /// The invalid value.
        value: f64,
    },
    /// The host control channel capacity is zero.
    ControlCapacityZero,
    /// The host's kernel thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySchema => write!(f, "schema registers no component types"),
            Self::EventCapacityZero => write!(f, "event capacity must be at least 1"),
            Self::InvalidTickRate { value } => {
                write!(f, "tick rate must be finite and positive, got {value}")
            }
            Self::ControlCapacityZero => write!(f, "control channel capacity must be at least 1"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "failed to spawn kernel thread: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_core::ComponentDef;

    fn schema() -> Arc<ComponentSchema> {
        Arc::new(ComponentSchema::new(vec![ComponentDef::named("position")]))
    }

    #[test]
    fn defaults_validate() {
        let config = KernelConfig::new(schema());
        assert_eq!(config.event_capacity, 1024);
        assert_eq!(config.pool_warmup, 0);
        config.validate().unwrap();

        HostConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_schema_rejected() {
        let config = KernelConfig::new(Arc::new(ComponentSchema::new(vec![])));
        assert_eq!(config.validate(), Err(ConfigError::EmptySchema));
    }

    #[test]
    fn zero_event_capacity_rejected() {
        let mut config = KernelConfig::new(schema());
        config.event_capacity = 0;
        assert_eq!(config.validate(), Err(ConfigError::EventCapacityZero));
    }

    #[test]
    fn bad_tick_rates_rejected() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = HostConfig {
                tick_rate_hz: value,
                ..HostConfig::default()
            };
            assert!(config.validate().is_err(), "rate {value} must be rejected");
        }
    }
}
