use regex::Regex;
use std::net::SocketAddrV4;
use std::sync::LazyLock;

static IPV4_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,3}(?:\.[0-9]{1,3}){3})").unwrap());

const HOST_PRIORITY: u32 = 2_122_260_223;
const SRFLX_PRIORITY: u32 = 1_686_052_607;

pub fn host_candidate(foundation: usize, local: SocketAddrV4) -> String {
    format!(
        "candidate:{} 1 udp {} {} {} typ host",
        foundation,
        HOST_PRIORITY,
        local.ip(),
        local.port()
    )
}

pub fn srflx_candidate(foundation: usize, mapped: SocketAddrV4, base: SocketAddrV4) -> String {
    format!(
        "candidate:{} 1 udp {} {} {} typ srflx raddr {} rport {}",
        foundation,
        SRFLX_PRIORITY,
        mapped.ip(),
        mapped.port(),
        base.ip(),
        base.port()
    )
}

/// First IPv4-shaped substring of a server-reflexive candidate line.
pub fn extract_reflexive_ip(candidate: &str) -> Option<String> {
    if !candidate.contains("typ srflx") {
        return None;
    }

    IPV4_SHAPE
        .captures(candidate)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
