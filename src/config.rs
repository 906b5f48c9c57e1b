//! Recorder Configuration

use crate::error::RecorderError;

/// Environment variable holding the debug verbosity.
pub const DEBUG_ENV: &str = "TEEHISTORIAN_DEBUG";

/// Highest meaningful debug level.
pub const MAX_DEBUG_LEVEL: u8 = 2;

/// Recorder configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecorderConfig {
    /// Diagnostic trace verbosity.
    ///
    /// - 0: silent
    /// - 1: one trace line per emitted record
    /// - 2: additionally one line per tick
    pub debug: u8,
}

impl RecorderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, RecorderError> {
        match std::env::var(DEBUG_ENV) {
            Ok(raw) => Self::from_debug_str(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parse a debug level, accepting `0..=MAX_DEBUG_LEVEL`.
    pub fn from_debug_str(raw: &str) -> Result<Self, RecorderError> {
        let debug = raw
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|level| *level <= MAX_DEBUG_LEVEL)
            .ok_or_else(|| RecorderError::Config {
                key: DEBUG_ENV,
                value: raw.to_string(),
            })?;
        Ok(Self { debug })
    }

    /// Whether every emitted record is traced.
    #[inline]
    pub fn traces_records(&self) -> bool {
        self.debug > 0
    }

    /// Whether tick boundaries are traced.
    #[inline]
    pub fn traces_ticks(&self) -> bool {
        self.debug > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!(RecorderConfig::from_debug_str("0").unwrap().debug, 0);
        assert_eq!(RecorderConfig::from_debug_str(" 2 ").unwrap().debug, 2);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = RecorderConfig::from_debug_str("3").unwrap_err();
        assert!(matches!(err, RecorderError::Config { key: DEBUG_ENV, .. }));
        assert!(RecorderConfig::from_debug_str("verbose").is_err());
    }

    #[test]
    fn test_trace_gates() {
        let quiet = RecorderConfig::default();
        assert!(!quiet.traces_records());
        assert!(!quiet.traces_ticks());

        let loud = RecorderConfig { debug: 2 };
        assert!(loud.traces_records());
        assert!(loud.traces_ticks());
    }
}
