use crate::lookup::ProviderRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Verdict of a detection run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionResult {
    InvalidInput,
    VpnDetected,
    NotVpn,
    Unknown,
    /// The probe stage had nothing to say; resolved through the lookup
    /// chain, so `detect` never returns it.
    ProbeUnsupported,
}

impl DetectionResult {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DetectionResult::ProbeUnsupported)
    }

    pub fn message(self) -> &'static str {
        match self {
            DetectionResult::InvalidInput => "Client IP missing or invalid",
            DetectionResult::VpnDetected => "VPN Detected",
            DetectionResult::NotVpn => "Not connected to VPN server",
            DetectionResult::Unknown => "VPN status unknown",
            DetectionResult::ProbeUnsupported => "Leak probe inconclusive, falling back to lookup",
        }
    }
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What the leak probe stage did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    NotRun,
    Unavailable,
    NoAddress,
    /// Leaked address was private, loopback or malformed.
    Rejected,
    Matched,
    Mismatched,
}

/// Full account of one detection run.
#[derive(Clone, Debug, Serialize)]
pub struct Detection {
    pub verdict: DetectionResult,
    pub message: String,
    pub client_ip: String,
    pub leaked_ip: Option<String>,
    pub probe: ProbeStatus,
    pub provider: Option<String>,
    pub record: Option<ProviderRecord>,
    pub note: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl Detection {
    pub(crate) fn new(client_ip: &str) -> Self {
        Self {
            verdict: DetectionResult::Unknown,
            message: DetectionResult::Unknown.message().to_string(),
            client_ip: client_ip.to_string(),
            leaked_ip: None,
            probe: ProbeStatus::NotRun,
            provider: None,
            record: None,
            note: None,
            checked_at: Utc::now(),
        }
    }

    pub(crate) fn finish(mut self, verdict: DetectionResult) -> Self {
        self.verdict = verdict;
        self.message = verdict.message().to_string();
        self.checked_at = Utc::now();
        self
    }
}
