//! Best-effort VPN detection for a claimed client IPv4 address.
//!
//! A STUN leak probe looks for a public egress address that differs from the
//! claimed one; failing that, IP metadata services are asked in turn and the
//! reported organization/ISP is matched against known hosting operators.

pub mod browser;
pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod lookup;
pub mod matcher;
pub mod output;
pub mod probe;
pub mod validator;

pub use config::Config;
pub use detect::{Detection, DetectionResult, Detector, ProbeStatus};
pub use error::{Error, Result};
