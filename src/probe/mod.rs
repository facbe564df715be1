mod candidate;
mod session;
mod stun;

use async_trait::async_trait;
use std::net::{Ipv4Addr, UdpSocket};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

pub use candidate::extract_reflexive_ip;
pub use session::{server_address, GatherEvent, ProbeOutcome, Session};

/// Rendezvous servers queried for reflexive candidates.
pub const DEFAULT_STUN_SERVERS: &[&str] = &[
    "stun.l.google.com:19302",
    "stun.12connect.com:3478",
    "stun.services.mozilla.com:3478",
];

/// Source of a candidate real egress address, independent of the claimed IP.
#[async_trait]
pub trait LeakProbe: Send + Sync {
    /// Whether the host can run a probe at all.
    fn is_available(&self) -> bool;

    /// Runs one session. `None` on failure, exhaustion or timeout.
    async fn probe(&self) -> Option<String>;
}

/// Leak probe that gathers server-reflexive candidates over STUN.
pub struct StunLeakProbe {
    servers: Vec<String>,
    timeout: Duration,
    reply_wait: Duration,
}

impl StunLeakProbe {
    pub fn new(servers: Vec<String>, timeout: Duration, reply_wait: Duration) -> Self {
        Self {
            servers,
            timeout,
            reply_wait,
        }
    }

    /// Full session result, for callers that care why no address came back.
    pub async fn run(&self) -> ProbeOutcome {
        let deadline = Instant::now() + self.timeout;

        let session = match timeout_at(deadline, Session::open(&self.servers, self.reply_wait)).await
        {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "probe negotiation failed");
                return ProbeOutcome::NegotiationFailed;
            }
            Err(_) => return ProbeOutcome::TimedOut,
        };

        session.wait(deadline).await
    }
}

#[async_trait]
impl LeakProbe for StunLeakProbe {
    fn is_available(&self) -> bool {
        !self.servers.is_empty() && UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).is_ok()
    }

    async fn probe(&self) -> Option<String> {
        let outcome = self.run().await;
        tracing::debug!(?outcome, "probe finished");
        outcome.into_leaked()
    }
}

/// Probe for hosts where leak probing is switched off.
pub struct DisabledProbe;

#[async_trait]
impl LeakProbe for DisabledProbe {
    fn is_available(&self) -> bool {
        false
    }

    async fn probe(&self) -> Option<String> {
        None
    }
}
