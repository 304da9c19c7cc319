mod api;
pub mod credentials;
pub mod domain;
mod error;
pub mod solver;

pub use api::{
    responses, DuckDnsClient, DuckDnsClientBuilder, TxtUpdateError, DEFAULT_TIMEOUT,
    DNS_RESOLVE_URL, DUCKDNS_UPDATE_URL, TXT_MAX_LEN,
};
pub use domain::{extract_root_domain, is_duckdns_domain, is_full_duckdns_domain};
pub use error::Error;
pub use solver::{DuckDnsDns01Builder, DuckDnsDns01Solver, Solver};
