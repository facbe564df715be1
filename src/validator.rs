use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})$").unwrap()
});

/// Check that `ip` is a dotted-quad IPv4 address outside the private,
/// loopback and unspecified ranges.
///
/// Groups are read numerically, so `010.1.1.1` is treated as `10.1.1.1`.
pub fn validate(ip: &str) -> bool {
    canonical(ip).is_some()
}

/// The address `ip` denotes when it passes [`validate`], so `008.8.8.8` and
/// `8.8.8.8` compare equal once canonicalized.
pub fn canonical(ip: &str) -> Option<Ipv4Addr> {
    parse_octets(ip)
        .filter(is_public)
        .map(Ipv4Addr::from)
}

fn parse_octets(ip: &str) -> Option<[u8; 4]> {
    let caps = DOTTED_QUAD.captures(ip)?;
    let mut octets = [0u8; 4];

    for (idx, octet) in octets.iter_mut().enumerate() {
        // At most three digits, so this only fails above 255.
        *octet = caps.get(idx + 1)?.as_str().parse::<u8>().ok()?;
    }

    Some(octets)
}

fn is_public(octets: &[u8; 4]) -> bool {
    match octets {
        [10, ..] => false,
        [172, b, ..] if (16..=31).contains(b) => false,
        [192, 168, ..] => false,
        [127, ..] => false,
        [0, 0, 0, 0] => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_public_addresses() {
        for ip in ["8.8.8.8", "203.0.113.5", "198.51.100.7", "172.32.0.1", "1.1.1.1"] {
            assert!(validate(ip), "{ip} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_strings() {
        for ip in [
            "",
            "8.8.8",
            "8.8.8.8.8",
            "a.b.c.d",
            "1234.1.1.1",
            " 8.8.8.8",
            "8.8.8.8\n",
            "8..8.8",
            "::1",
        ] {
            assert!(!validate(ip), "{ip:?} should be rejected");
        }
    }

    #[test]
    fn rejects_out_of_range_groups() {
        assert!(!validate("256.1.1.1"));
        assert!(!validate("1.1.1.999"));
        assert!(validate("255.255.255.254"));
    }

    #[test]
    fn rejects_private_and_loopback_ranges() {
        for ip in [
            "10.0.0.1",
            "10.255.255.255",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.1.5",
            "127.0.0.1",
            "127.1.2.3",
            "0.0.0.0",
        ] {
            assert!(!validate(ip), "{ip} should be rejected");
        }
    }

    #[test]
    fn leading_zeros_are_read_numerically() {
        assert!(!validate("010.1.1.1"));
        assert!(validate("008.008.008.008"));
    }

    #[test]
    fn canonical_form_drops_leading_zeros() {
        assert_eq!(
            canonical("008.008.008.008").map(|ip| ip.to_string()).as_deref(),
            Some("8.8.8.8")
        );
        assert_eq!(canonical("192.168.001.001"), None);
        assert_eq!(canonical("8.8.8"), None);
    }
}
