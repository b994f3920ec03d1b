//! Client facade: credentials → `oc` invocation → decoded JSON.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::config::{ClientConfig, default_credentials_path};
use crate::credentials::{Credentials, Password, ShellExtractor};
use crate::decode::parse_json;
use crate::invoker::{CommandRunner, command_with_credentials};

/// List cabbages using the conventional `~/.ocrc` credentials file, if present.
pub async fn cabbages() -> crate::Result<Value> {
    let mut client = Client::new();
    if let Some(path) = default_credentials_path() {
        client = client.with_credentials_file(path);
    }
    client.cabbages().await
}

/// Runs the `oc` CLI on behalf of a caller.
///
/// The client stores the credential *inputs*; a fresh `Credentials` value is
/// built for every call, so a credentials file is re-read on each call and
/// nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Client {
    command: Vec<String>,
    username: Option<String>,
    password: Option<Password>,
    credentials_file: Option<PathBuf>,
    extractor: ShellExtractor,
    runner: CommandRunner,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Client for `oc cabbages` with no credentials.
    pub fn new() -> Self {
        let defaults = ClientConfig::default();
        Self {
            command: defaults.command,
            username: None,
            password: None,
            credentials_file: None,
            extractor: ShellExtractor::default(),
            runner: CommandRunner::new(),
        }
    }

    /// Build a client from a config, validating it and resolving `${VAR}` references.
    pub fn from_config(config: &ClientConfig) -> crate::Result<Self> {
        config.validate()?;

        let mut runner = CommandRunner::new();
        if let Some(secs) = config.timeout_secs {
            runner = runner.with_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            command: config.command.clone(),
            username: config.resolved_username(),
            password: config.resolved_password().map(Password::new),
            credentials_file: config.resolved_credentials_file(),
            extractor: config.shell.extractor()?,
            runner,
        })
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(Password::new(password));
        self
    }

    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extractor(mut self, extractor: ShellExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Select the credentials source for one call. Explicit values win over the file.
    ///
    /// A credentials script gets the same timeout as the CLI itself.
    pub fn creds(&self) -> Credentials {
        let mut extractor = self.extractor.clone();
        if let Some(timeout) = self.runner.timeout() {
            extractor = extractor.with_timeout(timeout);
        }
        Credentials::select(
            self.username.as_deref(),
            self.password.as_ref().map(Password::expose),
            self.credentials_file.as_deref(),
        )
        .with_extractor(extractor)
    }

    /// Run the configured command and decode its JSON output.
    ///
    /// The `oc cabbages` output is documented as
    /// `{"cabbages": [{"id": "1", "weight": 20}, ...]}`, but whatever JSON the
    /// CLI prints is returned as-is.
    pub async fn cabbages(&self) -> crate::Result<Value> {
        let credentials = self.creds();
        let command = command_with_credentials(&self.command, &credentials).await?;
        let stdout = self.runner.stdout_of(&command).await?;
        parse_json(&stdout)
    }
}
