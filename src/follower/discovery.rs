//! Identity of the local process as reported in heartbeats
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::{lookup_host, UdpSocket};
use tracing::debug;
use url::Url;

use crate::config_error;
use crate::error::Result;

/// Well-known public address used only to ask the OS for its default route.
/// Connecting a UDP socket sends no packets.
const ROUTE_PROBE: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 53);

/// Address and OS process id a follower reports itself as
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub address: String,
    pub process_id: i64,
}

impl ProcessIdentity {
    pub fn new(address: impl Into<String>, process_id: i64) -> Self {
        Self {
            address: address.into(),
            process_id,
        }
    }

    /// Discover the non-loopback IPv4 address used to reach `leader`, and the current pid
    pub async fn discover(leader: &Url) -> Result<Self> {
        let address = discover_ipv4(leader).await?;
        Ok(Self::new(address.to_string(), i64::from(std::process::id())))
    }
}

/// First candidate that is a usable non-loopback IPv4 address
pub fn pick_non_loopback<I>(candidates: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    candidates.into_iter().find_map(|ip| match ip {
        IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_unspecified() => Some(v4),
        _ => None,
    })
}

async fn local_ip_towards(target: SocketAddr) -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    socket.connect(target).await.ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// The leader's route wins; a loopback leader falls back to the default route
pub async fn discover_ipv4(leader: &Url) -> Result<Ipv4Addr> {
    let host = leader
        .host_str()
        .ok_or_else(|| config_error!("leader URL {} has no host", leader))?;
    let port = leader.port_or_known_default().unwrap_or(80);

    let mut candidates = Vec::new();
    if let Ok(addrs) = lookup_host((host, port)).await {
        for addr in addrs.filter(|addr| addr.is_ipv4()) {
            if let Some(ip) = local_ip_towards(addr).await {
                candidates.push(ip);
            }
        }
    }
    if let Some(ip) = local_ip_towards(ROUTE_PROBE).await {
        candidates.push(ip);
    }
    debug!("Local address candidates: {:?}", candidates);

    pick_non_loopback(candidates).ok_or_else(|| {
        config_error!("no non-loopback IPv4 address found; pass --advertise-address")
    })
}
