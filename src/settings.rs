//! Pulse application settings
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::config_error;
use crate::error::Result;
use crate::membership::types::quantize;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const STANDARD_PORT_HTTP: u16 = 1234;
pub const DEFAULT_PORT_HTTP: &str = "1234";

pub const DEFAULT_STALENESS_THRESHOLD_SECS: &str = "15";
pub const DEFAULT_SWEEP_INTERVAL_SECS: &str = "15";
pub const DEFAULT_FAILURE_POINT: &str = "0.2";
pub const DEFAULT_CONFIDENCE_STEP: &str = "0.1";
pub const DEFAULT_INITIAL_CONFIDENCE: &str = "0.5";

/// Longest accepted sweep period, one day
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_JITTER_MIN_SECS: &str = "10";
pub const DEFAULT_JITTER_MAX_SECS: &str = "30";

/// Knobs of the liveness detector. All time values are in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSettings {
    /// A record is stale once `now - last_heartbeat_at` reaches this
    pub staleness_threshold_secs: u64,
    /// Period of the decay sweep, independent of staleness
    pub sweep_interval_secs: u64,
    /// Records whose confidence drops to or below this are evicted
    pub failure_point: f64,
    /// Amount added on a heartbeat and removed on a stale sweep
    pub confidence_step: f64,
    /// Confidence of a newly seen process
    pub initial_confidence: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: 15,
            sweep_interval_secs: 15,
            failure_point: 0.2,
            confidence_step: 0.1,
            initial_confidence: 0.5,
        }
    }
}

impl DetectorSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            return Err(config_error!("sweep interval must be at least one second"));
        }
        if self.sweep_interval_secs > MAX_SWEEP_INTERVAL_SECS {
            return Err(config_error!(
                "sweep interval {}s exceeds the maximum of {}s",
                self.sweep_interval_secs,
                MAX_SWEEP_INTERVAL_SECS
            ));
        }
        for (name, value) in [
            ("failure point", self.failure_point),
            ("confidence step", self.confidence_step),
            ("initial confidence", self.initial_confidence),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(config_error!("{} must lie in [0.0, 1.0], got {}", name, value));
            }
        }
        // Records store confidence on the quantized grid, so compare what they will hold.
        if quantize(self.confidence_step) <= 0.0 {
            return Err(config_error!(
                "confidence step {} is too small to change a record",
                self.confidence_step
            ));
        }
        if quantize(self.initial_confidence) <= self.failure_point {
            return Err(config_error!(
                "initial confidence {} must exceed the failure point {}",
                self.initial_confidence,
                self.failure_point
            ));
        }
        Ok(())
    }
}

/// Coordinator settings
#[derive(Clone, Debug)]
pub struct Settings {
    // Server listen address
    pub listen_address: String,

    // Heartbeat RPC listen port
    pub listen_port: u16,

    // Render the membership table to stdout after each mutation batch
    pub render_table: bool,

    pub detector: DetectorSettings,
}

impl Settings {
    pub fn socket_address(&self) -> Result<SocketAddr> {
        let ip = self
            .listen_address
            .parse::<IpAddr>()
            .map_err(|e| config_error!("Invalid listen address '{}': {}", self.listen_address, e))?;
        Ok(SocketAddr::from((ip, self.listen_port)))
    }
}

/// Follower sleep policy: a uniformly random whole number of seconds in `[min, max]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JitterPolicy {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for JitterPolicy {
    fn default() -> Self {
        Self {
            min_secs: 10,
            max_secs: 30,
        }
    }
}

impl JitterPolicy {
    pub fn new(min_secs: u64, max_secs: u64) -> Result<Self> {
        if min_secs > max_secs {
            return Err(config_error!(
                "jitter minimum {}s exceeds maximum {}s",
                min_secs,
                max_secs
            ));
        }
        Ok(Self { min_secs, max_secs })
    }

    pub fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min_secs..=self.max_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PulseError;

    #[test]
    fn test_default_detector_settings_are_valid() {
        let settings = DetectorSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.sweep_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_detector_settings_rejects_bad_values() {
        let zero_interval = DetectorSettings {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(zero_interval.validate().is_err());

        let inverted = DetectorSettings {
            initial_confidence: 0.2,
            failure_point: 0.3,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let no_step = DetectorSettings {
            confidence_step: 0.0,
            ..Default::default()
        };
        assert!(no_step.validate().is_err());

        let nan_point = DetectorSettings {
            failure_point: f64::NAN,
            ..Default::default()
        };
        assert!(nan_point.validate().is_err());

        let endless_interval = DetectorSettings {
            sweep_interval_secs: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            endless_interval.validate(),
            Err(PulseError::Config(_))
        ));

        let daily = DetectorSettings {
            sweep_interval_secs: MAX_SWEEP_INTERVAL_SECS,
            ..Default::default()
        };
        assert!(daily.validate().is_ok());
    }

    #[test]
    fn test_detector_settings_compare_stored_confidence() {
        // 0.2000000001 is stored as 0.2, which is already at the failure point
        let rounds_onto_failure_point = DetectorSettings {
            initial_confidence: 0.2000000001,
            failure_point: 0.2,
            ..Default::default()
        };
        assert!(matches!(
            rounds_onto_failure_point.validate(),
            Err(PulseError::Config(_))
        ));

        let just_above = DetectorSettings {
            initial_confidence: 0.200000001,
            failure_point: 0.2,
            ..Default::default()
        };
        assert!(just_above.validate().is_ok());

        let vanishing_step = DetectorSettings {
            confidence_step: 1e-12,
            ..Default::default()
        };
        assert!(matches!(
            vanishing_step.validate(),
            Err(PulseError::Config(_))
        ));
    }

    #[test]
    fn test_socket_address() {
        let settings = Settings {
            listen_address: "127.0.0.1".to_string(),
            listen_port: STANDARD_PORT_HTTP,
            render_table: false,
            detector: DetectorSettings::default(),
        };
        assert_eq!(
            settings.socket_address().unwrap(),
            "127.0.0.1:1234".parse().unwrap()
        );

        let bad = Settings {
            listen_address: "not-an-ip".to_string(),
            ..settings
        };
        assert!(bad.socket_address().is_err());
    }

    #[test]
    fn test_jitter_policy_bounds() {
        assert!(JitterPolicy::new(30, 10).is_err());

        let policy = JitterPolicy::new(2, 4).unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let sleep = policy.sample(&mut rng);
            assert!(sleep >= Duration::from_secs(2));
            assert!(sleep <= Duration::from_secs(4));
        }

        let fixed = JitterPolicy::new(5, 5).unwrap();
        assert_eq!(fixed.sample(&mut rng), Duration::from_secs(5));
    }
}
