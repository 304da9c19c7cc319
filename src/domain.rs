//! Validation of DuckDNS domain names
//!
//! DuckDNS only manages a single TXT value per registered name, so any deeper subdomain is
//! reduced to its root (`<name>.duckdns.org`) before it is sent to the API.

use crate::error::{Error, Result};
use fancy_regex::Regex;
use once_cell::sync::Lazy;

static DUCKDNS_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z\d-]+\.)*[a-z\d-]+(\.duckdns\.org)?$").expect("duckdns domain pattern")
});

static FULL_DUCKDNS_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z\d-]+\.)*[a-z\d-]+\.duckdns\.org$").expect("full duckdns domain pattern")
});

/// Check if the domain is a valid DuckDNS subdomain, either the bare label (`example`) or the
/// full domain (`example.duckdns.org`).
pub fn is_duckdns_domain(domain: &str) -> bool {
    DUCKDNS_DOMAIN.is_match(domain).unwrap_or(false)
}

/// Check if the domain is a valid DuckDNS domain including the `.duckdns.org` suffix.
pub fn is_full_duckdns_domain(domain: &str) -> bool {
    FULL_DUCKDNS_DOMAIN.is_match(domain).unwrap_or(false)
}

/// Get the root domain of a DuckDNS domain by keeping its last three labels, i.e.
/// `a.b.example.duckdns.org` becomes `example.duckdns.org`.
///
/// Domains with fewer than three labels are returned unchanged.
pub fn extract_root_domain(domain: &str) -> Result<String> {
    let labels = domain.split('.').collect::<Vec<_>>();
    let root = labels[labels.len().saturating_sub(3)..].join(".");

    if !is_duckdns_domain(&root) {
        return Err(Error::InvalidDomain(root));
    }

    Ok(root)
}

/// Validate a domain and reduce it to the root domain understood by the DuckDNS API.
pub(crate) fn validated_root_domain(domain: &str) -> Result<String> {
    if !is_duckdns_domain(domain) {
        return Err(Error::InvalidDomain(domain.to_owned()));
    }

    extract_root_domain(domain)
}

#[cfg(test)]
mod tests {
    use super::{
        extract_root_domain, is_duckdns_domain, is_full_duckdns_domain, validated_root_domain,
    };
    use crate::Error;

    const LABELS: &[&str] = &["example", "my-domain", "a1", "a.b", "x.y-z.0", "sub.example"];

    #[test]
    fn duckdns_domain_with_and_without_suffix() {
        for labels in LABELS {
            let full = format!("{labels}.duckdns.org");

            assert!(is_duckdns_domain(labels), "{labels}");
            assert!(is_duckdns_domain(&full), "{full}");
            assert!(!is_full_duckdns_domain(labels), "{labels}");
            assert!(is_full_duckdns_domain(&full), "{full}");
        }
    }

    #[test]
    fn invalid_duckdns_domains() {
        for domain in [
            "",
            "example.",
            ".example",
            "example..duckdns.org",
            "Example.duckdns.org",
            "exa_mple",
            "exa mple.duckdns.org",
            "example.duckdns.org.",
            "*.example.duckdns.org",
        ] {
            assert!(!is_duckdns_domain(domain), "{domain:?}");
            assert!(!is_full_duckdns_domain(domain), "{domain:?}");
        }
    }

    #[test]
    fn full_duckdns_domain_requires_suffix() {
        assert!(is_full_duckdns_domain("example.duckdns.org"));
        assert!(!is_full_duckdns_domain("duckdns.org"));
        assert!(!is_full_duckdns_domain("example.org"));
        assert!(!is_full_duckdns_domain("example.duckdns.com"));
    }

    #[test]
    fn root_domain_of_nested_subdomains() {
        for domain in [
            "name.duckdns.org",
            "a.name.duckdns.org",
            "a.b.name.duckdns.org",
            "a.b.c.name.duckdns.org",
            "_acme-challenge.name.duckdns.org",
        ] {
            assert_eq!(extract_root_domain(domain).unwrap(), "name.duckdns.org");
        }
    }

    #[test]
    fn root_domain_of_short_domains() {
        assert_eq!(extract_root_domain("example").unwrap(), "example");
        assert_eq!(extract_root_domain("a.b").unwrap(), "a.b");
    }

    #[test]
    fn root_domain_is_idempotent() {
        for domain in ["example", "x.name.duckdns.org", "a.b.c.d.e"] {
            let once = extract_root_domain(domain).unwrap();
            let twice = extract_root_domain(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn root_domain_must_be_valid() {
        let error = extract_root_domain("a.b.Name.duckdns.org").unwrap_err();
        assert!(matches!(error, Error::InvalidDomain(root) if root == "Name.duckdns.org"));

        let error = extract_root_domain("").unwrap_err();
        assert!(matches!(error, Error::InvalidDomain(root) if root.is_empty()));
    }

    #[test]
    fn validated_root_domain_rejects_before_extracting() {
        let error = validated_root_domain("bad_label.name.duckdns.org").unwrap_err();
        assert!(matches!(error, Error::InvalidDomain(domain) if domain == "bad_label.name.duckdns.org"));

        assert_eq!(
            validated_root_domain("www.name.duckdns.org").unwrap(),
            "name.duckdns.org"
        );
    }
}
