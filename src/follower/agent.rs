//! Follower loop: announce, then keep sending heartbeats on a jittered schedule
use tracing::{error, info};

use super::discovery::ProcessIdentity;
use super::transport::HeartbeatTransport;
use crate::clock::{system_clock, Clock};
use crate::error::Result;
use crate::heartbeat::HeartbeatMessage;
use crate::settings::JitterPolicy;

pub struct FollowerAgent<T> {
    transport: T,
    identity: ProcessIdentity,
    jitter: JitterPolicy,
    clock: Clock,
}

impl<T: HeartbeatTransport> FollowerAgent<T> {
    pub fn new(transport: T, identity: ProcessIdentity, jitter: JitterPolicy) -> Self {
        Self {
            transport,
            identity,
            jitter,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Stamp a heartbeat with the current time and deliver it
    pub async fn beat(&self) -> Result<HeartbeatMessage> {
        let heartbeat = HeartbeatMessage::new(
            self.identity.address.clone(),
            self.identity.process_id,
            (self.clock)(),
        );
        self.transport.send_heartbeat(&heartbeat).await
    }

    /// Send heartbeats until one fails; `limit` caps the number sent.
    ///
    /// Delivery failures end the run: a follower that cannot reach its
    /// coordinator has nothing else to do.
    pub async fn run(&self, limit: Option<usize>) -> Result<usize> {
        let mut sent = 0;
        loop {
            if limit.map_or(false, |limit| sent >= limit) {
                return Ok(sent);
            }
            if sent > 0 {
                let sleep = self.jitter.sample(&mut rand::thread_rng());
                info!(
                    "Process with ip {} and pid {} is sleeping for {} seconds",
                    self.identity.address,
                    self.identity.process_id,
                    sleep.as_secs()
                );
                tokio::time::sleep(sleep).await;
            }
            match self.beat().await {
                Ok(ack) => {
                    if sent == 0 {
                        info!("Coordinator acknowledged {:?}", ack);
                    }
                    sent += 1;
                }
                Err(err) => {
                    error!("Failed to deliver heartbeat: {}", err);
                    return Err(err);
                }
            }
        }
    }
}
