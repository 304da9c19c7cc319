//! DNS lookups backing the DuckDNS DNS-01 solver
//!
//! Certificates may be requested for any domain as long as its `_acme-challenge` subdomain is
//! delegated to a DuckDNS domain through a CNAME, see
//! [delegated challenges](https://letsencrypt.org/docs/challenge-types/#dns-01-challenge).
//! The target is discovered by following the CNAME chain of an A (or AAAA) lookup.

use crate::{
    domain::is_full_duckdns_domain,
    error::{Error, Result},
};
use trust_dns_resolver::{
    error::{ResolveError, ResolveErrorKind},
    proto::{
        op::ResponseCode,
        rr::{Name, RData, Record, RecordType},
    },
    TokioAsyncResolver,
};
use tracing::debug;

/// The subdomain queried by the CA for the DNS-01 challenge
pub const ACME_CHALLENGE_PREFIX: &str = "_acme-challenge";

/// The DNS queries needed by the solver.
///
/// Empty answers (NXDOMAIN or no records of the type) are not errors: they yield `None` or an
/// empty list. Any other response code is an error.
#[async_trait::async_trait]
pub trait DnsLookup: Send + Sync {
    /// Query `name` for records of the type, returning the name at the end of its CNAME chain.
    async fn canonical_name(
        &self,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<String>, ResolveError>;

    /// Query the TXT values of `name`. Each value has its character-strings concatenated.
    async fn txt(&self, name: &str) -> Result<Vec<String>, ResolveError>;
}

#[async_trait::async_trait]
impl DnsLookup for TokioAsyncResolver {
    async fn canonical_name(
        &self,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<String>, ResolveError> {
        match self.lookup(fqdn(name)?, record_type).await {
            Ok(lookup) => Ok(canonical_name(lookup.records(), record_type)),
            Err(e) if is_empty_answer(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn txt(&self, name: &str) -> Result<Vec<String>, ResolveError> {
        let lookup = match self.txt_lookup(fqdn(name)?).await {
            Ok(lookup) => lookup,
            Err(e) if is_empty_answer(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|data| String::from_utf8_lossy(data))
                    .collect::<String>()
            })
            .collect())
    }
}

/// The name at the end of the CNAME chain in an answer.
///
/// That is the owner of the first record of the queried type, or the target of the last CNAME
/// if the chain ends without one.
fn canonical_name(records: &[Record], record_type: RecordType) -> Option<String> {
    records
        .iter()
        .find(|record| record.record_type() == record_type)
        .map(|record| record.name().clone())
        .or_else(|| {
            records.iter().rev().find_map(|record| match record.data() {
                Some(RData::CNAME(cname)) => Some(cname.0.clone()),
                _ => None,
            })
        })
        .map(|name| name.to_utf8().trim_end_matches('.').to_owned())
}

/// Only NXDOMAIN and NOERROR without answers mean there is nothing to find. REFUSED, SERVFAIL
/// and the other codes are also reported as `NoRecordsFound` by the resolver.
fn is_empty_answer(error: &ResolveError) -> bool {
    matches!(
        error.kind(),
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NXDomain | ResponseCode::NoError,
            ..
        }
    )
}

/// Parse the name as fully qualified so no search domains are appended
fn fqdn(name: &str) -> Result<Name, ResolveError> {
    let mut name = Name::from_utf8(name)?;
    name.set_fqdn(true);
    Ok(name)
}

/// Find the DuckDNS domain that receives the challenge for `domain`.
///
/// DuckDNS domains are used as is. Otherwise `_acme-challenge.<domain>` must be a CNAME to a
/// DuckDNS domain; A records are tried before AAAA records. A delegation to anything else is
/// reported instead of falling through to the next record type.
pub async fn resolve_duckdns_domain(lookup: &dyn DnsLookup, domain: &str) -> Result<String> {
    if is_full_duckdns_domain(domain) {
        return Ok(domain.to_owned());
    }

    let challenge = format!("{ACME_CHALLENGE_PREFIX}.{domain}");
    for record_type in [RecordType::A, RecordType::AAAA] {
        let Some(canonical) = lookup.canonical_name(&challenge, record_type).await? else {
            debug!(name = %challenge, %record_type, "no delegation found");
            continue;
        };

        if !is_full_duckdns_domain(&canonical) {
            return Err(Error::NotValidDuckdnsDomain(canonical));
        }

        debug!(%domain, delegated = %canonical, %record_type, "found delegated challenge");
        return Ok(canonical);
    }

    Err(Error::DelegationNotFound {
        domain: domain.to_owned(),
        lookup: challenge,
    })
}

/// Read the current TXT value of a DuckDNS domain so it can be restored later.
///
/// DuckDNS holds at most one value per domain, so seeing more than one is an error.
pub async fn txt_snapshot(lookup: &dyn DnsLookup, domain: &str) -> Result<Option<String>> {
    let mut values = lookup.txt(domain).await?;

    match values.len() {
        0 => Ok(None),
        1 => Ok(values.pop()),
        count => Err(Error::AmbiguousTxtRecord {
            domain: domain.to_owned(),
            count,
        }),
    }
}
