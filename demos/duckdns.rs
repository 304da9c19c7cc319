// Publishes a DNS-01 validation value for a DuckDNS domain (or a domain delegating its
// `_acme-challenge` subdomain to one), waits for it to propagate and cleans it up again.
//
// You'll need to have the DUCKDNS_TOKEN environment variable set for this to work:
//   cargo run --example duckdns -- example.duckdns.org some-validation-value
use duckdns_dns01::{DuckDnsDns01Solver, Solver};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Requests to DuckDNS carry the token in the URL, keep the HTTP stack quiet
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,duckdns_dns01=debug,reqwest=warn,hyper=warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let domain = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: duckdns <domain> <validation>"))?;
    let validation = args.next().unwrap_or_else(|| "duckdns-dns01-test".into());

    let solver = DuckDnsDns01Solver::from_env()?.build()?;

    solver
        .perform(domain.clone(), format!("_acme-challenge.{domain}"), validation.clone())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(delay = ?solver.propagation_delay(), "waiting for the txt record to propagate");
    solver.wait_for_propagation().await;

    solver
        .cleanup(&domain, &format!("_acme-challenge.{domain}"), &validation)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
