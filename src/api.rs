use crate::{
    domain::validated_root_domain,
    error::{Error, Result},
};
use reqwest::{Client, RequestBuilder, Response, Url};
use std::{
    borrow::Cow,
    fmt::{Debug, Formatter},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, trace};

mod error;
pub mod responses;

pub use error::TxtUpdateError;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The DuckDNS update endpoint
pub const DUCKDNS_UPDATE_URL: &str = "https://www.duckdns.org/update";

/// The public DNS-over-HTTPS resolver used to read back TXT values
pub const DNS_RESOLVE_URL: &str = "https://dns.google/resolve";

/// The maximum length of a TXT value
pub const TXT_MAX_LEN: usize = 255;

/// How long a single request may take before it is aborted
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const REDACTED: &str = "REDACTED";

/// A builder used to create a [`DuckDnsClient`]
pub struct DuckDnsClientBuilder {
    token: String,
    client: Option<Client>,
    timeout: Duration,
    update_url: String,
    resolve_url: String,
}

impl DuckDnsClientBuilder {
    /// Creates a new builder for the given DuckDNS token.
    pub fn new(token: String) -> Self {
        DuckDnsClientBuilder {
            token,
            client: None,
            timeout: DEFAULT_TIMEOUT,
            update_url: DUCKDNS_UPDATE_URL.to_owned(),
            resolve_url: DNS_RESOLVE_URL.to_owned(),
        }
    }

    /// Use a custom [`reqwest::Client`] for all outbound HTTP requests.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the timeout of each request, defaults to 10 minutes
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the DuckDNS update endpoint
    pub fn update_url<S: Into<String>>(mut self, url: S) -> Self {
        self.update_url = url.into();
        self
    }

    /// Override the DNS-over-HTTPS endpoint used by [`DuckDnsClient::get_txt_record`]
    pub fn resolve_url<S: Into<String>>(mut self, url: S) -> Self {
        self.resolve_url = url.into();
        self
    }

    /// Build a [`DuckDnsClient`], failing if the token is empty.
    ///
    /// If no http client is specified, a default client will be created with
    /// the user-agent `duckdns-dns01/<version>`.
    pub fn build(self) -> Result<DuckDnsClient> {
        if self.token.is_empty() {
            return Err(Error::InvalidToken);
        }

        let client = match self.client {
            Some(client) => client,
            None => Client::builder().user_agent(USER_AGENT).build()?,
        };

        let inner = ClientInner {
            token: self.token,
            client,
            timeout: self.timeout,
            update_url: self.update_url,
            resolve_url: self.resolve_url,
        };
        Ok(DuckDnsClient(Arc::new(inner)))
    }
}

/// Client for setting, clearing and reading the TXT record of DuckDNS domains.
///
/// The token is sent as a query parameter, so requests are only ever logged with the token
/// redacted.
pub struct DuckDnsClient(Arc<ClientInner>);

struct ClientInner {
    token: String,
    client: Client,
    timeout: Duration,
    update_url: String,
    resolve_url: String,
}

impl DuckDnsClient {
    /// Create a client with the default configuration
    pub fn new<S: Into<String>>(token: S) -> Result<DuckDnsClient> {
        Self::builder(token).build()
    }

    /// Configure a new client for the token
    pub fn builder<S: Into<String>>(token: S) -> DuckDnsClientBuilder {
        DuckDnsClientBuilder::new(token.into())
    }

    /// Set the TXT value of a DuckDNS domain.
    ///
    /// The domain may be the bare subdomain (`example`) or any domain below it
    /// (`www.example.duckdns.org`), the value is always set on the root domain.
    pub async fn set_txt_record(&self, domain: &str, txt: &str) -> Result<()> {
        let root_domain = validated_root_domain(domain)?;
        check_txt_len(txt)?;

        debug!(domain = %root_domain, "setting txt record");
        let request = self.0.client.get(&self.0.update_url).query(&[
            ("token", self.0.token.as_str()),
            ("domains", root_domain.as_str()),
            ("txt", txt),
        ]);

        let response = self.send(request).await?;
        check_update(response, domain, Some(txt)).await
    }

    /// Clear the TXT value of a DuckDNS domain.
    ///
    /// Setting an empty value does not remove the record, the API needs an explicit `clear`.
    pub async fn clear_txt_record(&self, domain: &str) -> Result<()> {
        let root_domain = validated_root_domain(domain)?;

        debug!(domain = %root_domain, "clearing txt record");
        let request = self.0.client.get(&self.0.update_url).query(&[
            ("token", self.0.token.as_str()),
            ("domains", root_domain.as_str()),
            ("txt", ""),
            ("clear", "true"),
        ]);

        let response = self.send(request).await?;
        check_update(response, domain, None).await
    }

    /// Read the current TXT value of a domain through the DNS-over-HTTPS resolver.
    ///
    /// Returns `None` if the domain has no TXT record.
    pub async fn get_txt_record(&self, domain: &str) -> Result<Option<String>> {
        let request = self
            .0
            .client
            .get(&self.0.resolve_url)
            .query(&[("type", "TXT"), ("name", domain)]);

        let response = self.send(request).await?.error_for_status()?;
        let body = response.text().await?;

        let resolve = serde_json::from_str::<responses::Resolve>(&body)?;
        Ok(resolve.first_value())
    }

    /// Send a request, logging it without the token
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.timeout(self.0.timeout).build()?;
        debug!(method = %request.method(), url = %redact(request.url()), "sending request");

        let response = self.0.client.execute(request).await?;
        trace!(status = %response.status(), "received response");

        Ok(response)
    }
}

impl Clone for DuckDnsClient {
    fn clone(&self) -> Self {
        DuckDnsClient(Arc::clone(&self.0))
    }
}

impl Debug for DuckDnsClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDnsClient")
            .field("token", &REDACTED)
            .field("timeout", &self.0.timeout)
            .field("update_url", &self.0.update_url)
            .field("resolve_url", &self.0.resolve_url)
            .finish()
    }
}

/// DuckDNS accepts at most [`TXT_MAX_LEN`] characters
pub(crate) fn check_txt_len(txt: &str) -> Result<()> {
    let len = txt.chars().count();
    if len > TXT_MAX_LEN {
        return Err(Error::TxtTooLong(len));
    }

    Ok(())
}

/// Anything but a literal `OK` means the update was rejected
async fn check_update(response: Response, domain: &str, txt: Option<&str>) -> Result<()> {
    let status_code = response.status().as_u16();
    let body = response.text().await?;

    if body == "OK" {
        return Ok(());
    }

    Err(Error::TxtUpdate(TxtUpdateError {
        domain: domain.to_owned(),
        txt: txt.map(str::to_owned),
        status_code,
        response: body,
    }))
}

/// Replace the value of the `token` query parameter
fn redact(url: &Url) -> Url {
    let mut redacted = url.clone();
    if url.query().is_none() {
        return redacted;
    }

    let pairs = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "token" {
                Cow::Borrowed(REDACTED)
            } else {
                value
            };
            (key, value)
        })
        .collect::<Vec<_>>();

    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted
}
