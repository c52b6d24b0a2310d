//! Index configuration.
//!
//! Serializable, validated settings describing the shape of an index and how
//! queries are planned against it.

use crate::codec::KeyEncoding;
use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Index configuration
///
/// # Example
///
/// ```rust
/// use lexspace::IndexConfig;
///
/// let config = IndexConfig::new(2);
/// assert_eq!(config.precision, 64);
/// assert_eq!(config.fanout_ceiling, 20);
///
/// // Load from JSON
/// let json = r#"{
///     "dimensions": 3,
///     "precision": 32,
///     "encoding": "binary"
/// }"#;
/// let config = IndexConfig::from_json(json).unwrap();
/// assert_eq!(config.dimensions, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Number of coordinates per point. Fixed for the lifetime of the index.
    pub dimensions: usize,

    /// Bits of precision per coordinate (1-64, default: 64).
    /// Every coordinate must be strictly below `2^precision`.
    #[serde(default = "IndexConfig::default_precision")]
    pub precision: u32,

    /// Queries keep coarsening their grid until they need fewer scans than this.
    /// Lower values issue fewer scans but filter more false positives.
    #[serde(default = "IndexConfig::default_fanout_ceiling")]
    pub fanout_ceiling: u64,

    /// Textual form of the interleaved key.
    #[serde(default)]
    pub encoding: KeyEncoding,
}

impl IndexConfig {
    pub const DEFAULT_PRECISION: u32 = 64;
    pub const DEFAULT_FANOUT_CEILING: u64 = 20;

    const fn default_precision() -> u32 {
        Self::DEFAULT_PRECISION
    }

    const fn default_fanout_ceiling() -> u64 {
        Self::DEFAULT_FANOUT_CEILING
    }

    /// Default configuration for a `dimensions`-dimensional index.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            precision: Self::DEFAULT_PRECISION,
            fanout_ceiling: Self::DEFAULT_FANOUT_CEILING,
            encoding: KeyEncoding::default(),
        }
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_fanout_ceiling(mut self, ceiling: u64) -> Self {
        self.fanout_ceiling = ceiling;
        self
    }

    pub fn with_encoding(mut self, encoding: KeyEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Largest coordinate representable at the configured precision.
    pub fn max_coordinate(&self) -> u64 {
        if self.precision >= 64 {
            u64::MAX
        } else {
            (1u64 << self.precision) - 1
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.dimensions == 0 {
            return Err("Index must have at least one dimension".to_string());
        }

        if !(1..=64).contains(&self.precision) {
            return Err(format!(
                "Precision must be between 1 and 64 bits, got {}",
                self.precision
            ));
        }

        if self.fanout_ceiling == 0 {
            return Err("Fan-out ceiling must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: IndexConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: IndexConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IndexConfig::new(2);
        assert_eq!(config.dimensions, 2);
        assert_eq!(config.precision, 64);
        assert_eq!(config.fanout_ceiling, 20);
        assert_eq!(config.encoding, KeyEncoding::Hex);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_coordinate() {
        assert_eq!(IndexConfig::new(1).max_coordinate(), u64::MAX);
        assert_eq!(IndexConfig::new(1).with_precision(8).max_coordinate(), 255);
        assert_eq!(IndexConfig::new(1).with_precision(1).max_coordinate(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(IndexConfig::new(0).validate().is_err());
        assert!(IndexConfig::new(2).with_precision(0).validate().is_err());
        assert!(IndexConfig::new(2).with_precision(65).validate().is_err());
        let no_fanout = IndexConfig::new(2).with_fanout_ceiling(0);
        assert!(no_fanout.validate().is_err());
    }

    #[test]
    fn test_json_defaults_applied() {
        let config = IndexConfig::from_json(r#"{ "dimensions": 2 }"#).unwrap();
        assert_eq!(config, IndexConfig::new(2));
    }

    #[test]
    fn test_json_round_trip() {
        let config = IndexConfig::new(3)
            .with_precision(16)
            .with_fanout_ceiling(8)
            .with_encoding(KeyEncoding::Binary);
        let json = config.to_json().unwrap();
        assert_eq!(IndexConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_invalid_rejected() {
        let too_precise = r#"{ "dimensions": 2, "precision": 80 }"#;
        assert!(IndexConfig::from_json(too_precise).is_err());
        assert!(IndexConfig::from_json(r#"{ "precision": 8 }"#).is_err());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_config() {
        let config = IndexConfig::from_toml(
            r#"
            dimensions = 2
            precision = 32
            fanout_ceiling = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.precision, 32);
        assert_eq!(config.fanout_ceiling, 50);
        assert_eq!(config.encoding, KeyEncoding::Hex);
    }
}
