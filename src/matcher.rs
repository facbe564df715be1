/// Fragments of hosting/cloud operator names commonly seen on VPN exits.
pub const DEFAULT_KNOWN_PROVIDERS: &[&str] = &[
    "aws",
    "amazon",
    "alibaba",
    "ovh",
    "ionos",
    "digitalocean",
    "linode",
    "hetzner",
    "vultr",
    "choopa",
    "m247",
    "leaseweb",
    "datacamp",
    "contabo",
];

/// Case-insensitive substring matcher over a fixed set of provider names.
#[derive(Clone, Debug)]
pub struct IspMatcher {
    fragments: Vec<String>,
}

impl Default for IspMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_KNOWN_PROVIDERS.iter().copied())
    }
}

impl IspMatcher {
    /// Blank fragments are dropped; they would match every name.
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fragments: Vec<String> = fragments
            .into_iter()
            .map(|f| f.as_ref().trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        fragments.sort();
        fragments.dedup();

        Self { fragments }
    }

    pub fn is_known_provider(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        let name = name.to_lowercase();
        self.fragments.iter().any(|f| name.contains(f.as_str()))
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_substrings_case_insensitively() {
        let matcher = IspMatcher::default();
        assert!(matcher.is_known_provider("Amazon AWS EC2"));
        assert!(matcher.is_known_provider("AS16276 OVH SAS"));
        assert!(matcher.is_known_provider("1&1 IONOS SE"));
        assert!(matcher.is_known_provider("hangzhou alibaba advertising"));
    }

    #[test]
    fn residential_isps_do_not_match() {
        let matcher = IspMatcher::default();
        assert!(!matcher.is_known_provider("Comcast Cable"));
        assert!(!matcher.is_known_provider("Deutsche Telekom AG"));
    }

    #[test]
    fn empty_name_never_matches() {
        assert!(!IspMatcher::default().is_known_provider(""));
    }

    #[test]
    fn blank_fragments_are_ignored() {
        let matcher = IspMatcher::new(["", "  ", " Hetzner "]);
        assert_eq!(matcher.fragments(), ["hetzner"]);
        assert!(!matcher.is_known_provider("Comcast Cable"));
        assert!(matcher.is_known_provider("HETZNER Online GmbH"));
    }
}
