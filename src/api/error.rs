use std::{
    error::Error as StdError,
    fmt::{Display, Formatter},
};

/// The DuckDNS API answered an update with something other than `OK`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxtUpdateError {
    /// The domain the update was requested for
    pub domain: String,
    /// The TXT value that should have been set, `None` when clearing
    pub txt: Option<String>,
    /// The HTTP status code of the response
    pub status_code: u16,
    /// The raw response body
    pub response: String,
}

impl Display for TxtUpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.txt {
            Some(txt) => write!(
                f,
                "the txt update \"{txt}\" for domain \"{}\" could not be set (status {}): {}",
                self.domain, self.status_code, self.response
            ),
            None => write!(
                f,
                "the txt value for domain \"{}\" could not be deleted (status {}): {}",
                self.domain, self.status_code, self.response
            ),
        }
    }
}

impl StdError for TxtUpdateError {}
