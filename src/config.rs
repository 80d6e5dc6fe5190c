#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result, MAX_BLOCK_SIZE};

/// Engine settings shared by every unit created on a context.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Samples per second
    pub sample_rate: f32,
    /// Frames computed per engine block
    pub block_size: usize,
    /// Number of output channels
    pub nchnls: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 256,
            nchnls: 2,
        }
    }
}

impl EngineConfig {
    pub fn sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn nchnls(mut self, nchnls: usize) -> Self {
        self.nchnls = nchnls;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate > 0.0 && self.sample_rate.is_finite()) {
            return Err(Error::Config(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(Error::Config(format!(
                "block size must be within 1..={MAX_BLOCK_SIZE}, got {}",
                self.block_size
            )));
        }
        if self.nchnls == 0 {
            return Err(Error::Config("at least one output channel is required".into()));
        }
        Ok(())
    }

    /// Seconds to whole samples, never negative.
    pub(crate) fn to_samples(&self, seconds: f32) -> u64 {
        (seconds.max(0.0) * self.sample_rate).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_oversized_block() {
        let config = EngineConfig::default().block_size(MAX_BLOCK_SIZE + 1);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn rejects_zero_channels() {
        let config = EngineConfig::default().nchnls(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn converts_seconds_to_samples() {
        let config = EngineConfig::default().sample_rate(1_000.0);
        assert_eq!(config.to_samples(0.25), 250);
        assert_eq!(config.to_samples(-1.0), 0);
    }
}
