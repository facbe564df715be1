use super::candidate::{extract_reflexive_ip, host_candidate, srflx_candidate};
use super::stun::{binding_request, new_transaction_id, parse_binding_response};
use crate::error::ProbeError;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

const DEFAULT_STUN_PORT: u16 = 3478;

/// Something the gathering task observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatherEvent {
    Candidate(String),
    Complete,
}

/// How a probe session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Leaked(String),
    /// Gathering finished without a reflexive address.
    Exhausted,
    /// The session could not be set up.
    NegotiationFailed,
    TimedOut,
}

impl ProbeOutcome {
    pub fn into_leaked(self) -> Option<String> {
        match self {
            ProbeOutcome::Leaked(ip) => Some(ip),
            _ => None,
        }
    }
}

/// One candidate-gathering run against a set of STUN servers.
///
/// Single use: [`Session::wait`] consumes it, and dropping it stops the
/// gathering task and releases the socket.
pub struct Session {
    events: mpsc::Receiver<GatherEvent>,
    task: JoinHandle<()>,
}

impl Session {
    pub async fn open(servers: &[String], reply_wait: Duration) -> Result<Self, ProbeError> {
        if servers.is_empty() {
            return Err(ProbeError::NoServers);
        }

        let mut resolved = Vec::with_capacity(servers.len());
        for server in servers {
            let target = server_address(server);
            match lookup_host(target.as_str()).await {
                Ok(mut addrs) => match addrs.find(SocketAddr::is_ipv4) {
                    Some(addr) => resolved.push(addr),
                    None => tracing::debug!(server = %target, "no ipv4 address for rendezvous server"),
                },
                Err(e) => tracing::debug!(server = %target, error = %e, "rendezvous server did not resolve"),
            }
        }
        if resolved.is_empty() {
            return Err(ProbeError::Unresolved);
        }

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        let port = socket.local_addr()?.port();
        let host = local_address_towards(resolved[0])
            .await
            .map(|ip| SocketAddrV4::new(ip, port));

        let (tx, events) = mpsc::channel(8);
        let task = tokio::spawn(gather(socket, resolved, host, reply_wait, tx));

        Ok(Self { events, task })
    }

    #[cfg(test)]
    pub(crate) fn from_events(events: mpsc::Receiver<GatherEvent>) -> Self {
        Self {
            events,
            task: tokio::spawn(async {}),
        }
    }

    /// Wait for the first reflexive address, the end of gathering or the
    /// deadline, whichever comes first, then close the session.
    pub async fn wait(mut self, deadline: Instant) -> ProbeOutcome {
        let outcome = match timeout_at(deadline, next_outcome(&mut self.events)).await {
            Ok(outcome) => outcome,
            Err(_) => ProbeOutcome::TimedOut,
        };
        self.close();
        outcome
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.events.close();
        self.task.abort();
    }
}

async fn next_outcome(events: &mut mpsc::Receiver<GatherEvent>) -> ProbeOutcome {
    while let Some(event) = events.recv().await {
        match event {
            GatherEvent::Candidate(line) => {
                tracing::trace!(candidate = %line, "candidate gathered");
                if let Some(ip) = extract_reflexive_ip(&line) {
                    return ProbeOutcome::Leaked(ip);
                }
            }
            GatherEvent::Complete => return ProbeOutcome::Exhausted,
        }
    }
    ProbeOutcome::Exhausted
}

async fn gather(
    socket: UdpSocket,
    servers: Vec<SocketAddr>,
    host: Option<SocketAddrV4>,
    reply_wait: Duration,
    tx: mpsc::Sender<GatherEvent>,
) {
    let base = host.unwrap_or_else(|| SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
    let mut foundation = 0;

    if let Some(host) = host {
        if tx.send(GatherEvent::Candidate(host_candidate(foundation, host))).await.is_err() {
            return;
        }
        foundation += 1;
    }

    for server in servers {
        match binding(&socket, server, reply_wait).await {
            Ok(Some(mapped)) => {
                let line = srflx_candidate(foundation, mapped, base);
                foundation += 1;
                if tx.send(GatherEvent::Candidate(line)).await.is_err() {
                    return;
                }
            }
            Ok(None) => tracing::debug!(%server, "no binding response"),
            Err(e) => tracing::debug!(%server, error = %e, "binding request failed"),
        }
    }

    let _ = tx.send(GatherEvent::Complete).await;
}

async fn binding(
    socket: &UdpSocket,
    server: SocketAddr,
    reply_wait: Duration,
) -> io::Result<Option<SocketAddrV4>> {
    let txn = new_transaction_id();
    socket.send_to(&binding_request(&txn), server).await?;

    let deadline = Instant::now() + reply_wait;
    let mut buf = [0u8; 576];

    loop {
        let (len, from) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Ok(received) => received?,
            Err(_) => return Ok(None),
        };
        if from != server {
            continue;
        }
        if let Some(mapped) = parse_binding_response(&buf[..len], &txn) {
            return Ok(Some(mapped));
        }
    }
}

/// Interface address the OS would route `target` through. Connecting a UDP
/// socket sends nothing.
async fn local_address_towards(target: SocketAddr) -> Option<Ipv4Addr> {
    let probe = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    probe.connect(target).await.ok()?;
    match probe.local_addr().ok()? {
        SocketAddr::V4(addr) => Some(*addr.ip()),
        SocketAddr::V6(_) => None,
    }
}

/// Accepts `stun:host:port`, `host:port` or a bare host.
pub fn server_address(server: &str) -> String {
    let server = server.trim();
    let server = server.strip_prefix("stun:").unwrap_or(server);

    if server.contains(':') {
        server.to_string()
    } else {
        format!("{}:{}", server, DEFAULT_STUN_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::stun::binding_success;

    /// Answers every binding request with `mapped`.
    async fn reflector(mapped: SocketAddrV4) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 576];
            while let Ok((len, from)) = socket.recv_from(&mut buf).await {
                if len < 20 {
                    continue;
                }
                let mut txn = [0u8; 12];
                txn.copy_from_slice(&buf[8..20]);
                let _ = socket.send_to(&binding_success(&txn, mapped), from).await;
            }
        });
        addr
    }

    /// Bound but never answers.
    async fn black_hole() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    #[test]
    fn normalizes_server_addresses() {
        assert_eq!(server_address("stun:stun.l.google.com:19302"), "stun.l.google.com:19302");
        assert_eq!(server_address("stun.12connect.com"), "stun.12connect.com:3478");
        assert_eq!(server_address("127.0.0.1:9999"), "127.0.0.1:9999");
    }

    #[tokio::test]
    async fn first_reflexive_candidate_ends_the_session() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(GatherEvent::Candidate("candidate:0 1 udp 1 10.0.0.2 5000 typ host".into()))
            .await
            .unwrap();
        tx.send(GatherEvent::Candidate(
            "candidate:1 1 udp 1 198.51.100.99 6000 typ srflx raddr 10.0.0.2 rport 5000".into(),
        ))
        .await
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(1);
        let outcome = Session::from_events(rx).wait(deadline).await;
        assert_eq!(outcome, ProbeOutcome::Leaked("198.51.100.99".into()));
    }

    #[tokio::test]
    async fn completion_without_reflexive_candidate_is_exhausted() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(GatherEvent::Candidate("candidate:0 1 udp 1 10.0.0.2 5000 typ host".into()))
            .await
            .unwrap();
        tx.send(GatherEvent::Complete).await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(1);
        assert_eq!(Session::from_events(rx).wait(deadline).await, ProbeOutcome::Exhausted);
    }

    #[tokio::test]
    async fn silent_gathering_times_out() {
        let (_tx, rx) = mpsc::channel(8);
        let deadline = Instant::now() + Duration::from_millis(50);
        assert_eq!(Session::from_events(rx).wait(deadline).await, ProbeOutcome::TimedOut);
    }

    #[tokio::test]
    async fn session_is_released_on_every_exit() {
        let srflx = "candidate:1 1 udp 1 198.51.100.99 6000 typ srflx raddr 10.0.0.2 rport 5000";
        let cases: [(Option<GatherEvent>, ProbeOutcome); 3] = [
            (
                Some(GatherEvent::Candidate(srflx.into())),
                ProbeOutcome::Leaked("198.51.100.99".into()),
            ),
            (Some(GatherEvent::Complete), ProbeOutcome::Exhausted),
            (None, ProbeOutcome::TimedOut),
        ];

        for (event, expected) in cases {
            let (tx, rx) = mpsc::channel(8);
            if let Some(event) = event {
                tx.send(event).await.unwrap();
            }
            assert!(!tx.is_closed());

            let deadline = Instant::now() + Duration::from_millis(50);
            assert_eq!(Session::from_events(rx).wait(deadline).await, expected);
            assert!(tx.is_closed(), "session left open after {expected:?}");
        }
    }

    #[tokio::test]
    async fn closing_aborts_the_gathering_task() {
        let (_events_tx, events) = mpsc::channel::<GatherEvent>(1);
        let (alive_tx, mut alive_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(async move {
            let _alive = alive_tx;
            std::future::pending::<()>().await;
        });

        Session { events, task }.close();

        let ended = tokio::time::timeout(Duration::from_secs(1), alive_rx.recv()).await;
        assert_eq!(ended, Ok(None));
    }

    #[tokio::test]
    async fn gathers_reflexive_address_from_server() {
        let mapped = SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 9), 4242);
        let server = reflector(mapped).await;

        let session = Session::open(&[server.to_string()], Duration::from_millis(500))
            .await
            .unwrap();
        let outcome = session.wait(Instant::now() + Duration::from_secs(2)).await;
        assert_eq!(outcome, ProbeOutcome::Leaked("203.0.113.9".into()));
    }

    #[tokio::test]
    async fn unanswered_servers_exhaust_gathering() {
        let (_keep, server) = black_hole().await;

        let session = Session::open(&[server.to_string()], Duration::from_millis(50))
            .await
            .unwrap();
        let outcome = session.wait(Instant::now() + Duration::from_secs(2)).await;
        assert_eq!(outcome, ProbeOutcome::Exhausted);
    }

    #[tokio::test]
    async fn empty_server_list_fails_negotiation() {
        assert!(matches!(
            Session::open(&[], Duration::from_millis(50)).await,
            Err(ProbeError::NoServers)
        ));
    }
}
