//! Controller settings read from the environment.

use crate::error::ControllerError;
use std::env;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Runtime settings of the CassandraCluster Controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch, all namespaces when `None` (`WATCH_NAMESPACE`)
    pub namespace: Option<String>,
    /// Bound on every store get (`REQUEST_TIMEOUT_SECS`)
    pub request_timeout: Duration,
    /// Requeue interval after a successful reconcile (`RESYNC_INTERVAL_SECS`)
    pub resync_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            resync_interval: Duration::from_secs(DEFAULT_RESYNC_INTERVAL_SECS),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let namespace = lookup("WATCH_NAMESPACE")
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());

        Ok(Self {
            namespace,
            request_timeout: seconds(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            resync_interval: seconds(
                &lookup,
                "RESYNC_INTERVAL_SECS",
                DEFAULT_RESYNC_INTERVAL_SECS,
            )?,
        })
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ControllerError> {
    let Some(raw) = lookup(key) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ControllerError::InvalidConfig(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(ControllerError::InvalidConfig(format!(
            "{key} must be a whole number of seconds, got {raw:?}"
        ))),
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
    fn test_defaults_when_unset() {
        let config = ControllerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_reads_all_variables() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("WATCH_NAMESPACE", "cassandra"),
            ("REQUEST_TIMEOUT_SECS", "10"),
            ("RESYNC_INTERVAL_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.namespace.as_deref(), Some("cassandra"));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.resync_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_blank_namespace_means_all() {
        let config = ControllerConfig::from_lookup(lookup(&[("WATCH_NAMESPACE", "  ")])).unwrap();
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_rejects_bad_durations() {
        let err =
            ControllerConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));

        let err =
            ControllerConfig::from_lookup(lookup(&[("RESYNC_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }
}
