use crate::{api::TxtUpdateError, credentials::CredentialsError};
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter},
};
use trust_dns_resolver::error::ResolveError;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// The DuckDNS token was missing or empty
    InvalidToken,
    /// The domain is not a valid DuckDNS domain
    InvalidDomain(String),
    /// The TXT value exceeds the maximum length of a TXT record
    TxtTooLong(usize),
    /// A delegation target was found, but it is not a `.duckdns.org` domain
    NotValidDuckdnsDomain(String),
    /// The domain is neither a DuckDNS domain nor delegates its challenge to one
    DelegationNotFound { domain: String, lookup: String },
    /// The DuckDNS API rejected the update
    TxtUpdate(TxtUpdateError),
    /// More than one TXT value exists for a domain that can only hold one
    AmbiguousTxtRecord { domain: String, count: usize },
    /// Error occurred while processing the request
    Reqwest(reqwest::Error),
    /// Error occurred while resolving a DNS record
    Resolve(ResolveError),
    /// Failed deserializing the response
    Deserialization(serde_json::Error),
    /// Failed loading the token from a credentials file
    Credentials(CredentialsError),
}

impl Error {
    /// Whether the error originates from the underlying HTTP or DNS transport rather than from
    /// validation or the DuckDNS API itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Reqwest(_) | Self::Resolve(_) | Self::Deserialization(_)
        )
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "the token is not a valid duckdns token"),
            Self::InvalidDomain(domain) => {
                write!(f, "the domain \"{domain}\" is not a valid duckdns subdomain")
            }
            Self::TxtTooLong(len) => write!(
                f,
                "the txt value is {len} characters long, but at most {} are allowed",
                crate::api::TXT_MAX_LEN
            ),
            Self::NotValidDuckdnsDomain(domain) => {
                write!(f, "the delegated domain \"{domain}\" is not a valid duckdns domain")
            }
            Self::DelegationNotFound { domain, lookup } => write!(
                f,
                "the domain \"{domain}\" is neither a duckdns subdomain nor delegates {lookup} to a duckdns subdomain"
            ),
            Self::TxtUpdate(e) => Display::fmt(e, f),
            Self::AmbiguousTxtRecord { domain, count } => write!(
                f,
                "expected a single txt record for \"{domain}\", found {count}"
            ),
            Self::Reqwest(_) => write!(f, "an error occurred while processing the request"),
            Self::Resolve(_) => write!(f, "an error occurred while resolving the domain"),
            Self::Deserialization(_) => {
                write!(f, "an error occurred while deserializing the response")
            }
            Self::Credentials(_) => write!(f, "failed to load the duckdns credentials"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::InvalidToken => None,
            Self::InvalidDomain(_) => None,
            Self::TxtTooLong(_) => None,
            Self::NotValidDuckdnsDomain(_) => None,
            Self::DelegationNotFound { .. } => None,
            Self::TxtUpdate(_) => None,
            Self::AmbiguousTxtRecord { .. } => None,
            Self::Reqwest(e) => Some(e),
            Self::Resolve(e) => Some(e),
            Self::Deserialization(e) => Some(e),
            Self::Credentials(e) => Some(e),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the token as a query parameter
        Self::Reqwest(err.without_url())
    }
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        Self::Resolve(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization(err)
    }
}

impl From<TxtUpdateError> for Error {
    fn from(err: TxtUpdateError) -> Self {
        Self::TxtUpdate(err)
    }
}

impl From<CredentialsError> for Error {
    fn from(err: CredentialsError) -> Self {
        Self::Credentials(err)
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::api::TxtUpdateError;

    #[test]
    fn delegation_not_found_names_lookup() {
        let error = Error::DelegationNotFound {
            domain: "example.org".into(),
            lookup: "_acme-challenge.example.org".into(),
        };

        let message = error.to_string();
        assert!(message.contains("\"example.org\""));
        assert!(message.contains("_acme-challenge.example.org"));
    }

    #[test]
    fn transport_errors() {
        assert!(!Error::InvalidToken.is_transport());
        assert!(!Error::InvalidDomain("-".into()).is_transport());

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(Error::from(json).is_transport());

        let update = TxtUpdateError {
            domain: "example.duckdns.org".into(),
            txt: None,
            status_code: 200,
            response: "KO".into(),
        };
        assert!(!Error::from(update).is_transport());
    }
}
