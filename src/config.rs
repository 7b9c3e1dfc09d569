use std::env;
use std::time::Duration;

use crate::errors::RelayError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_RATE_WINDOW_SECS: u64 = 60;
const DEFAULT_LOG_FILTER: &str = "relay_metrics=info,tower_http=warn";

/// Process configuration, loaded from the environment with sane
/// defaults so the binary runs with no setup at all.
#[derive(Debug, Clone)]
pub struct Config {
    /// `RELAY_BIND_ADDR` — listen address for the HTTP surface
    pub bind_addr: String,
    /// `RELAY_RATE_WINDOW_SECS` — trailing window for per-second rates
    pub rate_window: Duration,
    /// `RELAY_LOG` — tracing env-filter directive
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self, RelayError> {
        Ok(Self {
            bind_addr: env::var("RELAY_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned()),
            rate_window: parse_window_secs(env::var("RELAY_RATE_WINDOW_SECS").ok())?,
            log_filter: env::var("RELAY_LOG")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned()),
        })
    }
}

fn parse_window_secs(raw: Option<String>) -> Result<Duration, RelayError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(DEFAULT_RATE_WINDOW_SECS));
    };
    let secs: u64 = raw.parse().map_err(|_| {
        RelayError::Config(format!("RELAY_RATE_WINDOW_SECS must be an integer, got {raw:?}"))
    })?;
    if secs == 0 {
        return Err(RelayError::Config(
            "RELAY_RATE_WINDOW_SECS must be greater than zero".into(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_defaults_to_sixty_seconds() {
        assert_eq!(parse_window_secs(None).unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn window_accepts_positive_integers() {
        assert_eq!(
            parse_window_secs(Some("30".into())).unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn window_rejects_zero_and_garbage() {
        assert!(matches!(
            parse_window_secs(Some("0".into())),
            Err(RelayError::Config(_))
        ));
        assert!(matches!(
            parse_window_secs(Some("soon".into())),
            Err(RelayError::Config(_))
        ));
    }
}
