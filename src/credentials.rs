//! Loading the DuckDNS token from a credentials file
//!
//! The file is TOML with a single entry:
//!
//! ```toml
//! dns_duckdns_token = "0123abcd-..."
//! ```

use serde::Deserialize;
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
};
use tracing::debug;

/// The key holding the token
pub const TOKEN_KEY: &str = "dns_duckdns_token";

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    dns_duckdns_token: Option<String>,
}

#[derive(Debug)]
pub enum CredentialsError {
    /// The file could not be read
    Io(PathBuf, io::Error),
    /// The file is not valid TOML
    Parse(PathBuf, toml::de::Error),
    /// The file has no token entry, or it is empty
    MissingToken(PathBuf),
}

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, _) => write!(f, "failed to read {}", path.display()),
            Self::Parse(path, _) => write!(f, "failed to parse {}", path.display()),
            Self::MissingToken(path) => {
                write!(f, "the `{TOKEN_KEY}` entry is missing in {}", path.display())
            }
        }
    }
}

impl StdError for CredentialsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            Self::Parse(_, e) => Some(e),
            Self::MissingToken(_) => None,
        }
    }
}

/// Read the DuckDNS token from a credentials file.
///
/// Files accessible by other users are accepted, but a warning is logged.
pub fn load_token(path: &Path) -> Result<String, CredentialsError> {
    let contents = fs::read_to_string(path).map_err(|e| CredentialsError::Io(path.into(), e))?;
    check_permissions(path);

    let credentials = toml::from_str::<CredentialsFile>(&contents)
        .map_err(|e| CredentialsError::Parse(path.into(), e))?;
    debug!(path = %path.display(), "loaded credentials");

    credentials
        .dns_duckdns_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CredentialsError::MissingToken(path.into()))
}

#[cfg(unix)]
fn check_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    use tracing::warn;

    if let Ok(metadata) = fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                mode = %format!("{:o}", mode & 0o777),
                "credentials file is accessible by other users"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) {}
