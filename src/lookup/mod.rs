mod http;
mod schema;

use crate::detect::DetectionResult;
use crate::error::LookupError;
use crate::matcher::IspMatcher;
use async_trait::async_trait;
use serde::Serialize;

pub use http::HttpProvider;
pub use schema::ProviderSchema;

/// Organization and ISP names reported for an address, lower-cased.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProviderRecord {
    pub organization: Option<String>,
    pub isp: Option<String>,
}

impl ProviderRecord {
    pub fn new(organization: Option<String>, isp: Option<String>) -> Self {
        Self {
            organization: organization.map(|s| s.to_lowercase()),
            isp: isp.map(|s| s.to_lowercase()),
        }
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        [self.organization.as_deref(), self.isp.as_deref()]
            .into_iter()
            .flatten()
    }
}

/// An external IP metadata service.
#[async_trait]
pub trait IspProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Any error makes this provider inconclusive for the current lookup.
    async fn lookup(&self, ip: &str) -> Result<ProviderRecord, LookupError>;
}

/// Outcome of asking one provider about one address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Conclusive {
        vpn_likely: bool,
        record: ProviderRecord,
    },
    Inconclusive,
}

pub async fn resolve(provider: &dyn IspProvider, matcher: &IspMatcher, ip: &str) -> Resolution {
    match provider.lookup(ip).await {
        Ok(record) => {
            let vpn_likely = record.names().any(|name| matcher.is_known_provider(name));
            Resolution::Conclusive { vpn_likely, record }
        }
        Err(e) => {
            tracing::debug!(provider = provider.name(), error = %e, "lookup inconclusive");
            Resolution::Inconclusive
        }
    }
}

/// Verdict of the chain together with the provider that decided it.
#[derive(Clone, Debug)]
pub struct ChainVerdict {
    pub result: DetectionResult,
    pub provider: Option<String>,
    pub record: Option<ProviderRecord>,
}

/// Providers in priority order, asked one at a time until one answers.
pub struct LookupChain {
    providers: Vec<Box<dyn IspProvider>>,
    matcher: IspMatcher,
}

impl LookupChain {
    pub fn new(providers: Vec<Box<dyn IspProvider>>, matcher: IspMatcher) -> Self {
        Self { providers, matcher }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Returns `VpnDetected`, `NotVpn` or `Unknown`.
    pub async fn check_isp(&self, ip: &str) -> DetectionResult {
        self.run(ip).await.result
    }

    pub async fn run(&self, ip: &str) -> ChainVerdict {
        for provider in &self.providers {
            if let Resolution::Conclusive { vpn_likely, record } =
                resolve(provider.as_ref(), &self.matcher, ip).await
            {
                let result = if vpn_likely {
                    DetectionResult::VpnDetected
                } else {
                    DetectionResult::NotVpn
                };
                tracing::debug!(provider = provider.name(), %result, "lookup conclusive");

                return ChainVerdict {
                    result,
                    provider: Some(provider.name().to_string()),
                    record: Some(record),
                };
            }
        }

        tracing::warn!(ip, providers = self.providers.len(), "all lookup providers inconclusive");
        ChainVerdict {
            result: DetectionResult::Unknown,
            provider: None,
            record: None,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Provider returning a canned answer and counting its calls.
    pub struct FakeProvider {
        pub name: String,
        pub answer: Option<ProviderRecord>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        pub fn answering(name: &str, org: &str, isp: &str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Self {
                name: name.to_string(),
                answer: Some(ProviderRecord::new(Some(org.into()), Some(isp.into()))),
                calls: calls.clone(),
            };
            (provider, calls)
        }

        pub fn failing(name: &str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Self {
                name: name.to_string(),
                answer: None,
                calls: calls.clone(),
            };
            (provider, calls)
        }
    }

    #[async_trait]
    impl IspProvider for FakeProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn lookup(&self, _ip: &str) -> Result<ProviderRecord, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().ok_or(LookupError::Status(503))
        }
    }

    pub fn count(calls: &Arc<AtomicUsize>) -> usize {
        calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{count, FakeProvider};
    use super::*;

    #[tokio::test]
    async fn first_conclusive_provider_wins() {
        let (a, a_calls) = FakeProvider::answering("a", "Amazon AWS EC2", "");
        let (b, b_calls) = FakeProvider::answering("b", "Comcast Cable", "");
        let chain = LookupChain::new(vec![Box::new(a), Box::new(b)], IspMatcher::default());

        let verdict = chain.run("8.8.8.8").await;
        assert_eq!(verdict.result, DetectionResult::VpnDetected);
        assert_eq!(verdict.provider.as_deref(), Some("a"));
        assert_eq!(count(&a_calls), 1);
        assert_eq!(count(&b_calls), 0);
    }

    #[tokio::test]
    async fn failures_advance_to_the_next_provider() {
        let (a, a_calls) = FakeProvider::failing("a");
        let (b, b_calls) = FakeProvider::answering("b", "Comcast Cable", "");
        let (c, c_calls) = FakeProvider::answering("c", "OVH SAS", "OVH");
        let chain = LookupChain::new(
            vec![Box::new(a), Box::new(b), Box::new(c)],
            IspMatcher::default(),
        );

        assert_eq!(chain.check_isp("203.0.113.5").await, DetectionResult::NotVpn);
        assert_eq!(count(&a_calls), 1);
        assert_eq!(count(&b_calls), 1);
        assert_eq!(count(&c_calls), 0);
    }

    #[tokio::test]
    async fn isp_field_alone_can_flag_vpn() {
        let (a, _) = FakeProvider::answering("a", "", "Hetzner Online GmbH");
        let chain = LookupChain::new(vec![Box::new(a)], IspMatcher::default());
        assert_eq!(chain.check_isp("203.0.113.5").await, DetectionResult::VpnDetected);
    }

    #[tokio::test]
    async fn empty_fields_are_conclusive_not_vpn() {
        let (a, _) = FakeProvider::answering("a", "", "");
        let (b, b_calls) = FakeProvider::answering("b", "AWS", "AWS");
        let chain = LookupChain::new(vec![Box::new(a), Box::new(b)], IspMatcher::default());

        assert_eq!(chain.check_isp("203.0.113.5").await, DetectionResult::NotVpn);
        assert_eq!(count(&b_calls), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_is_unknown() {
        let (a, a_calls) = FakeProvider::failing("a");
        let (b, b_calls) = FakeProvider::failing("b");
        let (c, c_calls) = FakeProvider::failing("c");
        let chain = LookupChain::new(
            vec![Box::new(a), Box::new(b), Box::new(c)],
            IspMatcher::default(),
        );

        let verdict = chain.run("198.51.100.7").await;
        assert_eq!(verdict.result, DetectionResult::Unknown);
        assert!(verdict.provider.is_none());
        assert_eq!(
            (count(&a_calls), count(&b_calls), count(&c_calls)),
            (1, 1, 1)
        );
    }
}
