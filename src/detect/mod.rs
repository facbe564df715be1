mod result;

use crate::browser::{get_preset, lookup_headers};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lookup::{HttpProvider, IspProvider, LookupChain};
use crate::matcher::IspMatcher;
use crate::probe::{DisabledProbe, LeakProbe, StunLeakProbe};
use crate::validator;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

pub use result::{Detection, DetectionResult, ProbeStatus};

/// Combines the leak probe and the lookup chain into one verdict.
///
/// Holds only immutable state; one instance can serve concurrent calls.
pub struct Detector {
    probe: Box<dyn LeakProbe>,
    chain: LookupChain,
}

impl Detector {
    pub fn new(probe: Box<dyn LeakProbe>, chain: LookupChain) -> Self {
        Self { probe, chain }
    }

    /// Build the STUN probe and the HTTP lookup chain described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let preset = get_preset(&config.browser)
            .ok_or_else(|| Error::Config(format!("unknown browser preset {}", config.browser)))?;

        let mut builder = wreq::Client::builder()
            .emulation(preset.emulation)
            .timeout(config.lookup_timeout());

        if let Some(ref proxy) = config.proxy {
            builder = builder.proxy(wreq::Proxy::all(proxy.as_str())?);
        }

        let client = builder.build()?;
        let headers = lookup_headers(&preset);

        let providers = config
            .providers
            .iter()
            .map(|p| {
                HttpProvider::new(&p.name, &p.url, p.schema, client.clone(), headers.clone())
                    .map(|provider| Box::new(provider) as Box<dyn IspProvider>)
            })
            .collect::<Result<Vec<_>>>()?;

        let probe: Box<dyn LeakProbe> = if config.probe.enabled {
            Box::new(StunLeakProbe::new(
                config.probe.servers.clone(),
                config.probe.timeout(),
                config.probe.reply_wait(),
            ))
        } else {
            Box::new(DisabledProbe)
        };

        let matcher = IspMatcher::new(&config.known_providers);
        Ok(Self::new(probe, LookupChain::new(providers, matcher)))
    }

    pub async fn detect(&self, client_ip: &str) -> DetectionResult {
        self.inspect(client_ip).await.verdict
    }

    /// Like [`Detector::detect`], keeping the evidence behind the verdict.
    ///
    /// The client ip is canonicalized before it is compared or looked up.
    pub async fn inspect(&self, client_ip: &str) -> Detection {
        let Some(canonical) = validator::canonical(client_ip) else {
            tracing::debug!(client_ip, "client ip missing or invalid");
            return Detection::new(client_ip).finish(DetectionResult::InvalidInput);
        };
        let canonical_ip = canonical.to_string();
        let client_ip = canonical_ip.as_str();

        match AssertUnwindSafe(self.run(client_ip)).catch_unwind().await {
            Ok(report) => report,
            Err(panic) => {
                let reason = panic_reason(panic.as_ref());
                tracing::error!(client_ip, %reason, "detection failed");

                let mut report = Detection::new(client_ip).finish(DetectionResult::Unknown);
                report.message = "VPN status unknown (detection failed)".to_string();
                report.note = Some(format!("detection failed: {}", reason));
                report
            }
        }
    }

    /// Run a detection that gives up with `Unknown` once `cancel` completes.
    /// The in-flight probe session or lookup is dropped.
    pub async fn detect_until<F>(&self, client_ip: &str, cancel: F) -> Detection
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            report = self.inspect(client_ip) => report,
            _ = cancel => {
                tracing::warn!(client_ip, "detection cancelled");
                let mut report = Detection::new(client_ip).finish(DetectionResult::Unknown);
                report.note = Some("detection cancelled".to_string());
                report
            }
        }
    }

    pub async fn detect_with_deadline(&self, client_ip: &str, limit: Duration) -> Detection {
        self.detect_until(client_ip, tokio::time::sleep(limit)).await
    }

    async fn run(&self, client_ip: &str) -> Detection {
        let mut report = Detection::new(client_ip);

        let stage = self.probe_stage(client_ip, &mut report).await;
        if stage.is_terminal() {
            return report.finish(stage);
        }

        let verdict = self.chain.run(client_ip).await;
        report.provider = verdict.provider;
        report.record = verdict.record;
        report.finish(verdict.result)
    }

    /// `VpnDetected` on a mismatching leak, otherwise `ProbeUnsupported`.
    async fn probe_stage(&self, client_ip: &str, report: &mut Detection) -> DetectionResult {
        if !self.probe.is_available() {
            tracing::warn!("leak probing unavailable, using lookup providers only");
            report.probe = ProbeStatus::Unavailable;
            return DetectionResult::ProbeUnsupported;
        }

        let Some(raw) = self.probe.probe().await else {
            report.probe = ProbeStatus::NoAddress;
            return DetectionResult::ProbeUnsupported;
        };
        report.leaked_ip = Some(raw.clone());

        let Some(leaked) = validator::canonical(&raw).map(|ip| ip.to_string()) else {
            tracing::debug!(leaked = %raw, "ignoring non-public leaked address");
            report.probe = ProbeStatus::Rejected;
            return DetectionResult::ProbeUnsupported;
        };

        if leaked != client_ip {
            tracing::info!(client_ip, %leaked, "leaked address differs from client ip");
            report.probe = ProbeStatus::Mismatched;
            return DetectionResult::VpnDetected;
        }

        report.probe = ProbeStatus::Matched;
        DetectionResult::ProbeUnsupported
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
