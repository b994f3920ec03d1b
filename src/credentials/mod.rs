//! Credentials passed to the `oc` CLI as `--username`/`--password` flags.
//!
//! A `Credentials` value is one of three sources: nothing, an explicit pair
//! supplied by the caller, or a shell-script credentials file (`~/.ocrc`) that
//! is only read the first time the credentials are needed.

pub mod extractor;
pub mod file;

use std::fmt;
use std::path::{Path, PathBuf};

pub use extractor::{ShellExtractor, get_credentials_exported_by};
pub use file::FileCredentials;

/// Password that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Password(String);

impl Password {
    pub fn new(password: impl Into<String>) -> Self {
        Password(password.into())
    }

    /// Get the password as a string slice
    ///
    /// Use this only where the raw value is handed to the CLI.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password(*** {} bytes ***)", self.0.len())
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Password::new(value)
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Password(value)
    }
}

/// A resolved username/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernamePassword {
    pub username: String,
    pub password: Password,
}

impl UsernamePassword {
    pub fn new(username: impl Into<String>, password: impl Into<Password>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `--username <u> --password <p>` as separate argv tokens.
    pub fn to_flags(&self) -> Vec<String> {
        vec![
            "--username".to_string(),
            self.username.clone(),
            "--password".to_string(),
            self.password.expose().to_string(),
        ]
    }
}

/// Where the CLI credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No credentials; the CLI is invoked without flags.
    None,
    /// Explicit values supplied by the caller.
    FromArgs(UsernamePassword),
    /// A credentials script, read and evaluated lazily on first use.
    FromFile(FileCredentials),
}

impl Credentials {
    /// Choose a credentials source.
    ///
    /// Evaluation order:
    /// 1. username and password both present and non-empty → `FromArgs`
    /// 2. non-empty file path                               → `FromFile` (file not read yet)
    /// 3. otherwise                                         → `None`
    pub fn select(username: Option<&str>, password: Option<&str>, file: Option<&Path>) -> Self {
        if let (Some(username), Some(password)) = (non_empty(username), non_empty(password)) {
            return Credentials::from_args(username, password);
        }

        match file {
            Some(path) if !path.as_os_str().is_empty() => Credentials::from_file(path),
            _ => Credentials::None,
        }
    }

    pub fn from_args(username: impl Into<String>, password: impl Into<Password>) -> Self {
        Credentials::FromArgs(UsernamePassword::new(username, password))
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Credentials::FromFile(FileCredentials::new(path))
    }

    /// Replace the extractor used by a `FromFile` source; other variants are unchanged.
    pub fn with_extractor(self, extractor: ShellExtractor) -> Self {
        match self {
            Credentials::FromFile(file) => Credentials::FromFile(file.with_extractor(extractor)),
            other => other,
        }
    }

    /// Resolve to a username/password pair, evaluating a credentials file if needed.
    ///
    /// `Ok(None)` means "no credentials", including a missing or unreadable file.
    pub async fn resolve(&self) -> crate::Result<Option<&UsernamePassword>> {
        match self {
            Credentials::None => Ok(None),
            Credentials::FromArgs(pair) => Ok(Some(pair)),
            Credentials::FromFile(file) => file.resolve().await,
        }
    }

    /// Flag tokens to append to the base command (empty when there are no credentials).
    pub async fn flags(&self) -> crate::Result<Vec<String>> {
        Ok(self
            .resolve()
            .await?
            .map(UsernamePassword::to_flags)
            .unwrap_or_default())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
