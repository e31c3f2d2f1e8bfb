//! CLI for this application
//!
use url::Url;

use crate::error::Result;
use crate::settings;

#[derive(Clone, Debug, clap::Parser)]
#[command(name = "pulse", about = "Heartbeat membership coordinator")]
pub struct Cli {
    // Server listen address
    #[clap(
        long,
        default_value = "0.0.0.0",
        env("PULSE_LISTEN_ADDRESS"),
        help = "IP Address to listen on"
    )]
    pub listen_address: String,

    // Heartbeat RPC listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_HTTP,
        env("PULSE_LISTEN_PORT"),
        help = "Port to bind the heartbeat RPC server to"
    )]
    pub listen_port: u16,

    #[clap(
        long,
        default_value = settings::DEFAULT_STALENESS_THRESHOLD_SECS,
        env("PULSE_STALENESS_THRESHOLD_SECONDS"),
        help = "Seconds without a heartbeat before a process starts losing confidence"
    )]
    pub staleness_threshold_seconds: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_SWEEP_INTERVAL_SECS,
        env("PULSE_SWEEP_INTERVAL_SECONDS"),
        help = "Seconds between decay sweeps"
    )]
    pub sweep_interval_seconds: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_FAILURE_POINT,
        env("PULSE_FAILURE_POINT"),
        help = "Confidence at or below which a process is evicted"
    )]
    pub failure_point: f64,

    #[clap(
        long,
        default_value = settings::DEFAULT_CONFIDENCE_STEP,
        env("PULSE_CONFIDENCE_STEP"),
        help = "Confidence gained per heartbeat and lost per stale sweep"
    )]
    pub confidence_step: f64,

    #[clap(
        long,
        default_value = settings::DEFAULT_INITIAL_CONFIDENCE,
        env("PULSE_INITIAL_CONFIDENCE"),
        help = "Confidence assigned to a newly seen process"
    )]
    pub initial_confidence: f64,

    #[clap(
        long,
        env("PULSE_RENDER_TABLE"),
        help = "Render the membership table to stdout after every change"
    )]
    pub render_table: bool,
}

impl Cli {
    pub fn into_settings(self) -> Result<settings::Settings> {
        let detector = settings::DetectorSettings {
            staleness_threshold_secs: self.staleness_threshold_seconds,
            sweep_interval_secs: self.sweep_interval_seconds,
            failure_point: self.failure_point,
            confidence_step: self.confidence_step,
            initial_confidence: self.initial_confidence,
        };
        detector.validate()?;
        Ok(settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            render_table: self.render_table,
            detector,
        })
    }
}

#[derive(Clone, Debug, clap::Parser)]
#[command(name = "pulse-follower", about = "Sends heartbeats to a pulse coordinator")]
pub struct FollowerCli {
    #[clap(
        long,
        default_value = "http://127.0.0.1:1234",
        env("PULSE_LEADER_URL"),
        help = "Base URL of the coordinator"
    )]
    pub leader: Url,

    #[clap(
        long,
        default_value = settings::DEFAULT_JITTER_MIN_SECS,
        env("PULSE_JITTER_MIN_SECONDS"),
        help = "Minimum seconds to sleep between heartbeats"
    )]
    pub jitter_min_seconds: u64,

    #[clap(
        long,
        default_value = settings::DEFAULT_JITTER_MAX_SECS,
        env("PULSE_JITTER_MAX_SECONDS"),
        help = "Maximum seconds to sleep between heartbeats"
    )]
    pub jitter_max_seconds: u64,

    #[clap(
        long,
        env("PULSE_ADVERTISE_ADDRESS"),
        help = "Address to report instead of the discovered IPv4 address"
    )]
    pub advertise_address: Option<String>,
}

impl FollowerCli {
    pub fn jitter(&self) -> Result<settings::JitterPolicy> {
        settings::JitterPolicy::new(self.jitter_min_seconds, self.jitter_max_seconds)
    }
}
