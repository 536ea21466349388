#![forbid(unsafe_code)]

//! Surface helper configuration.

use web_time::Duration;

use crate::error::ConfigError;

/// Environment variable overriding [`SurfaceConfig::teardown_grace_period`],
/// in milliseconds.
pub const ENV_TEARDOWN_GRACE_MS: &str = "SCOPECAST_TEARDOWN_GRACE_MS";

/// Default delay between a teardown request and the finish callback.
pub const DEFAULT_TEARDOWN_GRACE_PERIOD: Duration = Duration::from_millis(300);

/// Longest accepted grace period.
pub const MAX_TEARDOWN_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// Configuration for [`SurfaceHelper`](crate::SurfaceHelper).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SurfaceConfig {
    /// How long to wait after the contents are torn down before telling the
    /// host to finish. New start params arriving in this window cancel the
    /// finish.
    /// Default: 300ms.
    #[cfg_attr(feature = "serde", serde(rename = "teardown_grace_ms", with = "millis"))]
    pub teardown_grace_period: Duration,

    /// Log broadcasts addressed to a different uri.
    /// Default: true.
    pub log_broadcast_mismatches: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            teardown_grace_period: DEFAULT_TEARDOWN_GRACE_PERIOD,
            log_broadcast_mismatches: true,
        }
    }
}

impl SurfaceConfig {
    #[must_use]
    pub fn with_teardown_grace_period(mut self, period: Duration) -> Self {
        self.teardown_grace_period = period;
        self
    }

    #[must_use]
    pub fn with_log_broadcast_mismatches(mut self, enabled: bool) -> Self {
        self.log_broadcast_mismatches = enabled;
        self
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_TEARDOWN_GRACE_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: ENV_TEARDOWN_GRACE_MS,
                value: raw.clone(),
            })?;
            config.teardown_grace_period = Duration::from_millis(millis);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.teardown_grace_period > MAX_TEARDOWN_GRACE_PERIOD {
            return Err(ConfigError::GracePeriodTooLong {
                millis: duration_millis(self.teardown_grace_period),
                max_millis: duration_millis(MAX_TEARDOWN_GRACE_PERIOD),
            });
        }
        Ok(())
    }
}

fn duration_millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(feature = "serde")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use web_time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(super::duration_millis(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn default_grace_period_is_300ms() {
        let config = SurfaceConfig::default();
        assert_eq!(config.teardown_grace_period, Duration::from_millis(300));
        assert!(config.log_broadcast_mismatches);
    }

    #[test]
    fn lookup_overrides_grace_period() {
        let config = SurfaceConfig::from_lookup(lookup(&[(ENV_TEARDOWN_GRACE_MS, " 120 ")]))
            .expect("valid config");
        assert_eq!(config.teardown_grace_period, Duration::from_millis(120));
    }

    #[test]
    fn missing_variable_keeps_defaults() {
        let config = SurfaceConfig::from_lookup(lookup(&[])).expect("valid config");
        assert_eq!(config, SurfaceConfig::default());
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = SurfaceConfig::from_lookup(lookup(&[(ENV_TEARDOWN_GRACE_MS, "soon")]))
            .expect_err("must reject");
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn overlong_grace_period_is_rejected() {
        let err = SurfaceConfig::from_lookup(lookup(&[(ENV_TEARDOWN_GRACE_MS, "600000")]))
            .expect_err("must reject");
        assert!(matches!(
            err,
            ConfigError::GracePeriodTooLong {
                millis: 600_000,
                max_millis: 60_000
            }
        ));
    }

    #[test]
    fn builder_setters() {
        let config = SurfaceConfig::default()
            .with_teardown_grace_period(Duration::from_millis(50))
            .with_log_broadcast_mismatches(false);
        assert_eq!(config.teardown_grace_period, Duration::from_millis(50));
        assert!(!config.log_broadcast_mismatches);
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_milliseconds() {
        let json = serde_json::to_string(&SurfaceConfig::default()).expect("serialize");
        assert!(json.contains("\"teardown_grace_ms\":300"));
        let parsed: SurfaceConfig =
            serde_json::from_str(r#"{"teardown_grace_ms":75}"#).expect("deserialize");
        assert_eq!(parsed.teardown_grace_period, Duration::from_millis(75));
        assert!(parsed.log_broadcast_mismatches);
    }
}
