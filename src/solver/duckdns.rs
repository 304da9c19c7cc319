use super::{
    boxed_err,
    dns::{self, DnsLookup},
    Solver, DEFAULT_PROPAGATION_DELAY,
};
use crate::{
    api::check_txt_len,
    credentials,
    error::{Error, Result},
    DuckDnsClient,
};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tracing::debug;
use trust_dns_resolver::TokioAsyncResolver;

/// The environment variable read by [`DuckDnsDns01Solver::from_env`]
pub const TOKEN_ENV: &str = "DUCKDNS_TOKEN";

type Challenges = Arc<RwLock<HashMap<String, ChallengeRecord>>>;

/// What a cleanup needs to undo a performed challenge
#[derive(Debug)]
struct ChallengeRecord {
    duckdns_domain: String,
    previous: Option<String>,
}

/// A builder used to create a [`DuckDnsDns01Solver`]
pub struct DuckDnsDns01Builder {
    token: Option<String>,
    credentials: Option<PathBuf>,
    client: Option<DuckDnsClient>,
    resolver: Option<Arc<dyn DnsLookup>>,
    propagation_delay: Duration,
    restore_txt: bool,
}

impl Default for DuckDnsDns01Builder {
    fn default() -> Self {
        DuckDnsDns01Builder {
            token: None,
            credentials: None,
            client: None,
            resolver: None,
            propagation_delay: DEFAULT_PROPAGATION_DELAY,
            restore_txt: true,
        }
    }
}

impl DuckDnsDns01Builder {
    /// Creates a new builder without a token
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the DuckDNS token, takes precedence over [`DuckDnsDns01Builder::credentials`]
    pub fn token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read the token from a credentials file if none was set directly
    pub fn credentials<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.credentials = Some(path.into());
        self
    }

    /// Use a preconfigured [`DuckDnsClient`], the token and credentials are ignored
    pub fn client(mut self, client: DuckDnsClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Use a custom resolver instead of the system's
    pub fn resolver<L: DnsLookup + 'static>(mut self, resolver: L) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// How long to wait for the TXT record to propagate, defaults to 30 seconds
    pub fn propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }

    /// Do not restore the previous TXT value on cleanup, always clear it instead
    pub fn no_txt_restore(mut self, skip: bool) -> Self {
        self.restore_txt = !skip;
        self
    }

    /// Build a [`DuckDnsDns01Solver`] using the given parameters.
    ///
    /// Fails with [`Error::InvalidToken`] if neither a token nor a credentials file was given.
    pub fn build(self) -> Result<DuckDnsDns01Solver> {
        let client = match self.client {
            Some(client) => client,
            None => DuckDnsClient::new(load_token(self.token, self.credentials)?)?,
        };

        let resolver: Arc<dyn DnsLookup> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(TokioAsyncResolver::tokio_from_system_conf()?),
        };

        Ok(DuckDnsDns01Solver {
            client,
            resolver,
            propagation_delay: self.propagation_delay,
            restore_txt: self.restore_txt,
            challenges: Challenges::default(),
        })
    }
}

fn load_token(token: Option<String>, credentials_file: Option<PathBuf>) -> Result<String> {
    if let Some(token) = token.filter(|token| !token.is_empty()) {
        return Ok(token);
    }

    match credentials_file {
        Some(path) => Ok(credentials::load_token(&path)?),
        None => Err(Error::InvalidToken),
    }
}

/// A DNS-01 solver publishing the challenge as the TXT record of a DuckDNS domain.
///
/// Only one TXT value exists per DuckDNS domain, so challenges for domains delegating to the
/// same DuckDNS domain must be solved one after another.
#[derive(Clone)]
pub struct DuckDnsDns01Solver {
    client: DuckDnsClient,
    resolver: Arc<dyn DnsLookup>,
    propagation_delay: Duration,
    restore_txt: bool,
    challenges: Challenges,
}

impl DuckDnsDns01Solver {
    /// Configure a new solver
    pub fn builder() -> DuckDnsDns01Builder {
        DuckDnsDns01Builder::new()
    }

    /// Configure a new solver with the token from the `DUCKDNS_TOKEN` environment variable
    pub fn from_env() -> Result<DuckDnsDns01Builder> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .ok_or(Error::InvalidToken)?;

        Ok(Self::builder().token(token))
    }

    /// Set the validation value on the DuckDNS domain responsible for `domain`
    pub async fn present(&self, domain: &str, validation: &str) -> Result<()> {
        let duckdns_domain = dns::resolve_duckdns_domain(self.resolver.as_ref(), domain).await?;

        let previous = if self.restore_txt {
            dns::txt_snapshot(self.resolver.as_ref(), &duckdns_domain).await?
        } else {
            None
        };
        if let Some(previous) = &previous {
            // It could not be written back on cleanup
            check_txt_len(previous)?;
        }
        debug!(%domain, %duckdns_domain, has_previous = previous.is_some(), "presenting challenge");

        self.challenges.write().insert(
            domain.to_owned(),
            ChallengeRecord {
                duckdns_domain: duckdns_domain.clone(),
                previous,
            },
        );

        self.client.set_txt_record(&duckdns_domain, validation).await
    }

    /// Restore the TXT value from before [`DuckDnsDns01Solver::present`], or clear it if there
    /// was none
    pub async fn restore(&self, domain: &str) -> Result<()> {
        let record = self.challenges.write().remove(domain);

        let (duckdns_domain, previous) = match record {
            Some(record) => (record.duckdns_domain, record.previous),
            None => (
                dns::resolve_duckdns_domain(self.resolver.as_ref(), domain).await?,
                None,
            ),
        };

        match previous.filter(|previous| !previous.is_empty()) {
            Some(previous) => {
                debug!(%domain, %duckdns_domain, "restoring previous txt value");
                self.client.set_txt_record(&duckdns_domain, &previous).await
            }
            None => self.client.clear_txt_record(&duckdns_domain).await,
        }
    }
}

#[async_trait::async_trait]
impl Solver for DuckDnsDns01Solver {
    async fn perform(
        &self,
        domain: String,
        _validation_name: String,
        validation: String,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.present(&domain, &validation).await.map_err(boxed_err)
    }

    async fn cleanup(
        &self,
        domain: &str,
        _validation_name: &str,
        _validation: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        self.restore(domain).await.map_err(boxed_err)
    }

    fn propagation_delay(&self) -> Duration {
        self.propagation_delay
    }
}

impl Debug for DuckDnsDns01Solver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pending = self.challenges.read().keys().cloned().collect::<Vec<_>>();

        // The resolver doesn't implement debug, so we'll display the pending challenges instead
        f.debug_struct("DuckDnsDns01Solver")
            .field("client", &self.client)
            .field("propagation_delay", &self.propagation_delay)
            .field("restore_txt", &self.restore_txt)
            .field("pending", &pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{DuckDnsDns01Solver, Solver};
    use crate::{
        test::{duckdns_client, mock_update, FakeLookup, DOMAIN},
        Error,
    };
    use std::{io::Write, time::Duration};
    use trust_dns_resolver::proto::rr::RecordType;
    use wiremock::MockServer;

    const VALIDATION: &str = "challenge-value";

    fn solver(server: &MockServer, lookup: FakeLookup) -> DuckDnsDns01Solver {
        DuckDnsDns01Solver::builder()
            .client(duckdns_client(server))
            .resolver(lookup)
            .build()
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn restores_previous_value() {
        let server = MockServer::start().await;
        mock_update(&server, &[("domains", DOMAIN), ("txt", VALIDATION)], "OK", 1).await;
        mock_update(&server, &[("domains", DOMAIN), ("txt", "previous")], "OK", 1).await;

        let solver = solver(&server, FakeLookup::default().with_txt(DOMAIN, &["previous"]));

        solver.present(DOMAIN, VALIDATION).await.unwrap();
        assert_eq!(solver.challenges.read().len(), 1);

        solver.restore(DOMAIN).await.unwrap();
        assert_eq!(solver.challenges.read().len(), 0);
    }

    #[tokio::test]
    async fn clears_without_previous_value() {
        let server = MockServer::start().await;
        mock_update(&server, &[("txt", VALIDATION)], "OK", 1).await;
        mock_update(&server, &[("txt", ""), ("clear", "true")], "OK", 1).await;

        let solver = solver(&server, FakeLookup::default());

        solver.present(DOMAIN, VALIDATION).await.unwrap();
        solver.restore(DOMAIN).await.unwrap();
    }

    #[tokio::test]
    async fn clears_empty_previous_value() {
        let server = MockServer::start().await;
        mock_update(&server, &[("txt", VALIDATION)], "OK", 1).await;
        mock_update(&server, &[("clear", "true")], "OK", 1).await;

        let solver = solver(&server, FakeLookup::default().with_txt(DOMAIN, &[""]));

        solver.present(DOMAIN, VALIDATION).await.unwrap();
        solver.restore(DOMAIN).await.unwrap();
    }

    #[tokio::test]
    async fn no_txt_restore() {
        let server = MockServer::start().await;
        mock_update(&server, &[("txt", VALIDATION)], "OK", 1).await;
        mock_update(&server, &[("clear", "true")], "OK", 1).await;

        let solver = DuckDnsDns01Solver::builder()
            .client(duckdns_client(&server))
            .resolver(FakeLookup::default().with_txt(DOMAIN, &["previous"]))
            .no_txt_restore(true)
            .build()
            .unwrap();

        solver.present(DOMAIN, VALIDATION).await.unwrap();
        solver.restore(DOMAIN).await.unwrap();
    }

    #[tokio::test]
    async fn ambiguous_previous_value() {
        let server = MockServer::start().await;
        mock_update(&server, &[], "OK", 0).await;

        let solver = solver(&server, FakeLookup::default().with_txt(DOMAIN, &["a", "b"]));

        let error = solver.present(DOMAIN, VALIDATION).await.unwrap_err();
        assert!(matches!(error, Error::AmbiguousTxtRecord { count: 2, .. }));
    }

    #[tokio::test]
    async fn previous_value_too_long() {
        let server = MockServer::start().await;
        mock_update(&server, &[], "OK", 0).await;

        let previous = "a".repeat(300);
        let solver = solver(&server, FakeLookup::default().with_txt(DOMAIN, &[&previous]));

        let error = solver.present(DOMAIN, VALIDATION).await.unwrap_err();
        assert!(matches!(error, Error::TxtTooLong(300)));
        assert_eq!(solver.challenges.read().len(), 0);
    }

    #[tokio::test]
    async fn delegated_domain() {
        let server = MockServer::start().await;
        mock_update(
            &server,
            &[("domains", "foo.duckdns.org"), ("txt", VALIDATION)],
            "OK",
            1,
        )
        .await;
        mock_update(&server, &[("domains", "foo.duckdns.org"), ("clear", "true")], "OK", 1).await;

        let lookup = FakeLookup::default().with_canonical_name(
            "_acme-challenge.example.org",
            RecordType::A,
            "foo.duckdns.org",
        );
        let solver = solver(&server, lookup);

        solver
            .perform("example.org".into(), "".into(), VALIDATION.into())
            .await
            .unwrap();
        solver.cleanup("example.org", "", VALIDATION).await.unwrap();
    }

    #[tokio::test]
    async fn cleanup_without_perform() {
        let server = MockServer::start().await;
        mock_update(&server, &[("domains", DOMAIN), ("clear", "true")], "OK", 1).await;

        let solver = solver(&server, FakeLookup::default());
        solver.cleanup(DOMAIN, "", VALIDATION).await.unwrap();
    }

    #[tokio::test]
    async fn perform_reports_single_error() {
        let server = MockServer::start().await;
        mock_update(&server, &[], "KO", 1).await;

        let solver = solver(&server, FakeLookup::default());

        let error = solver
            .perform(DOMAIN.into(), "".into(), VALIDATION.into())
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::TxtUpdate(_))
        ));

        let error = solver
            .perform("example.org".into(), "".into(), VALIDATION.into())
            .await
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::DelegationNotFound { .. })
        ));
    }

    #[test]
    fn missing_token() {
        let error = DuckDnsDns01Solver::builder()
            .resolver(FakeLookup::default())
            .build()
            .unwrap_err();
        assert!(matches!(error, Error::InvalidToken));

        let error = DuckDnsDns01Solver::builder()
            .token("")
            .resolver(FakeLookup::default())
            .build()
            .unwrap_err();
        assert!(matches!(error, Error::InvalidToken));
    }

    #[test]
    fn token_from_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dns_duckdns_token = \"abc\"").unwrap();

        DuckDnsDns01Solver::builder()
            .credentials(file.path())
            .resolver(FakeLookup::default())
            .build()
            .unwrap();

        // A direct token means the credentials are never read
        DuckDnsDns01Solver::builder()
            .token("abc")
            .credentials("/does/not/exist.toml")
            .resolver(FakeLookup::default())
            .build()
            .unwrap();

        let error = DuckDnsDns01Solver::builder()
            .credentials("/does/not/exist.toml")
            .resolver(FakeLookup::default())
            .build()
            .unwrap_err();
        assert!(matches!(error, Error::Credentials(_)));
    }

    #[test]
    fn propagation_delay() {
        let solver = DuckDnsDns01Solver::builder()
            .token("abc")
            .resolver(FakeLookup::default())
            .build()
            .unwrap();
        assert_eq!(solver.propagation_delay(), Duration::from_secs(30));

        let solver = DuckDnsDns01Solver::builder()
            .token("abc")
            .resolver(FakeLookup::default())
            .propagation_delay(Duration::from_secs(60))
            .build()
            .unwrap();
        assert_eq!(solver.propagation_delay(), Duration::from_secs(60));
    }
}
