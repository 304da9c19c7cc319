//! DNS-01 challenge solving through DuckDNS
//!
//! The DNS-01 challenge works by creating a TXT record for your domain containing a value derived
//! from a random token and the fingerprint of your account key. The [`DuckDnsDns01Solver`]
//! publishes that value through the DuckDNS API, either directly for `*.duckdns.org` domains or
//! for any domain whose `_acme-challenge` subdomain is a CNAME to a DuckDNS domain.
//!
//! DuckDNS only holds a single TXT value per domain. Unless disabled, the value present before
//! the challenge is restored on cleanup.

use std::time::Duration;

pub mod dns;
mod duckdns;

pub use duckdns::{DuckDnsDns01Builder, DuckDnsDns01Solver, TOKEN_ENV};

/// How long to wait for a TXT change to propagate, if not configured otherwise
pub const DEFAULT_PROPAGATION_DELAY: Duration = Duration::from_secs(30);

/// The interface a certificate-issuance client drives to solve a DNS-01 challenge.
///
/// Between [`Solver::perform`] and [`Solver::cleanup`], the driver should wait
/// [`Solver::propagation_delay`] before asking the CA to validate.
#[async_trait::async_trait]
pub trait Solver {
    /// Publish the validation value for the domain.
    async fn perform(
        &self,
        domain: String,
        validation_name: String,
        validation: String,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

    /// Remove the validation value once the CA is done with it.
    async fn cleanup(
        &self,
        domain: &str,
        validation_name: &str,
        validation: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

    /// How long a published value takes to be visible to the CA. Defaults to 30 seconds.
    fn propagation_delay(&self) -> Duration {
        DEFAULT_PROPAGATION_DELAY
    }

    /// Sleep for the [`Solver::propagation_delay`]
    async fn wait_for_propagation(&self) {
        tokio::time::sleep(self.propagation_delay()).await;
    }
}

/// Used by [`Solver`]s to convert an arbitrary error to a boxed trait object.
pub fn boxed_err<E>(e: E) -> Box<dyn std::error::Error + Send + Sync + 'static>
where
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(e)
}
