use std::time::Duration;

/// Configuration for a capture engine.
///
/// The delivered format is fixed (`AudioFormat::TARGET`); only the
/// mechanics of the capture loop are tunable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long the capture thread waits when no packet is ready (default: 10 ms).
    pub poll_interval: Duration,

    /// Name given to the capture thread (default: "loopback-capture").
    pub capture_thread_name: String,

    /// Session limit used by `CaptureEngine::applications()` (default: 32).
    pub max_applications: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval.is_zero() {
            return Err("poll interval must be positive".into());
        }
        if self.capture_thread_name.trim().is_empty() {
            return Err("capture thread name must not be empty".into());
        }
        if self.max_applications == 0 {
            return Err("application limit must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            capture_thread_name: "loopback-capture".into(),
            max_applications: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let config = EngineConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_blank_thread_name() {
        let config = EngineConfig {
            capture_thread_name: "  ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_application_limit() {
        let config = EngineConfig {
            max_applications: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
