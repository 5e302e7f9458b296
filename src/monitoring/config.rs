/*!
 * Registry Configuration
 *
 * Runtime configuration for provenance capture
 */

use std::str::FromStr;

/// Environment variable consulted by [`RegistryConfig::from_env`]
pub const CAPTURE_ENV_VAR: &str = "RC_HANDLE_CAPTURE";

/// How much provenance to record when a handle is initialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Counters only
    Disabled,
    /// Caller `file:line:col` of `HandleGuard::init`
    Location,
    /// Caller location plus a full backtrace (slowest)
    #[default]
    Backtrace,
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "0" | "false" | "disabled" => Ok(CaptureMode::Disabled),
            "location" | "caller" => Ok(CaptureMode::Location),
            "backtrace" | "full" | "1" | "true" => Ok(CaptureMode::Backtrace),
            other => Err(format!("unknown capture mode: {}", other)),
        }
    }
}

/// Lifetime registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Provenance captured per initialized handle
    pub capture: CaptureMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capture: CaptureMode::Backtrace,
        }
    }
}

impl RegistryConfig {
    /// Configuration for hot paths: caller location only, no stack walk
    pub const fn lightweight() -> Self {
        Self {
            capture: CaptureMode::Location,
        }
    }

    /// Configuration that only counts events
    pub const fn counters_only() -> Self {
        Self {
            capture: CaptureMode::Disabled,
        }
    }

    /// Load configuration from the environment
    ///
    /// Reads `RC_HANDLE_CAPTURE` (`off`, `location` or `backtrace`). Unset or
    /// unrecognized values fall back to the default.
    pub fn from_env() -> Self {
        let capture = match std::env::var(CAPTURE_ENV_VAR) {
            Ok(value) => value.parse().unwrap_or_else(|e: String| {
                tracing::warn!(error = %e, "Ignoring {}", CAPTURE_ENV_VAR);
                CaptureMode::default()
            }),
            Err(_) => CaptureMode::default(),
        };
        Self { capture }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_capture_mode() {
        assert_eq!("off".parse::<CaptureMode>(), Ok(CaptureMode::Disabled));
        assert_eq!("Location".parse::<CaptureMode>(), Ok(CaptureMode::Location));
        assert_eq!(" full ".parse::<CaptureMode>(), Ok(CaptureMode::Backtrace));
        assert!("sometimes".parse::<CaptureMode>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(CAPTURE_ENV_VAR, "location");
        assert_eq!(RegistryConfig::from_env().capture, CaptureMode::Location);

        std::env::set_var(CAPTURE_ENV_VAR, "bogus");
        assert_eq!(RegistryConfig::from_env().capture, CaptureMode::Backtrace);

        std::env::remove_var(CAPTURE_ENV_VAR);
        assert_eq!(RegistryConfig::from_env().capture, CaptureMode::Backtrace);
    }
}
