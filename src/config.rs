//! Client configuration: deserialization and validation.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::credentials::extractor::{DEFAULT_PASSWORD_VAR, DEFAULT_SHELL, DEFAULT_USERNAME_VAR};
use crate::credentials::ShellExtractor;
use crate::error::OcError;

/// File name of the conventional credentials script in the home directory.
pub const CREDENTIALS_FILE_NAME: &str = ".ocrc";

/// `$HOME/.ocrc`, if a home directory is known.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CREDENTIALS_FILE_NAME))
}

/// Expand a leading `~/` to the home directory. Other paths are returned as-is.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only. Returns `None` if the value is not a
/// valid env-var reference.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Resolve a config value that is either a literal or a `${VAR}` reference.
///
/// Unknown variables resolve to the empty string (same as shell `${UNSET-}`).
pub fn resolve_value(value: &str) -> String {
    match parse_env_ref(value) {
        Some(var_name) => std::env::var(var_name).unwrap_or_default(),
        None => value.to_string(),
    }
}

/// Top-level client configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base command tokens; credential flags are appended after these.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    /// Shell-script credentials file. A leading `~/` expands to the home directory.
    pub credentials_file: Option<PathBuf>,
    /// Literal username or `${VAR}` reference.
    pub username: Option<String>,
    /// Literal password or `${VAR}` reference.
    pub password: Option<String>,
    /// Kill the CLI after this many seconds. Absent means wait indefinitely.
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub shell: ShellConfig,
}

/// How credentials scripts are evaluated.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ShellConfig {
    #[serde(default = "default_shell")]
    pub program: String,
    #[serde(default = "default_username_var")]
    pub username_var: String,
    #[serde(default = "default_password_var")]
    pub password_var: String,
}

fn default_command() -> Vec<String> {
    vec!["oc".to_string(), "cabbages".to_string()]
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_username_var() -> String {
    DEFAULT_USERNAME_VAR.to_string()
}

fn default_password_var() -> String {
    DEFAULT_PASSWORD_VAR.to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: default_shell(),
            username_var: default_username_var(),
            password_var: default_password_var(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            credentials_file: None,
            username: None,
            password: None,
            timeout_secs: None,
            shell: ShellConfig::default(),
        }
    }
}

impl ShellConfig {
    pub fn extractor(&self) -> crate::Result<ShellExtractor> {
        ShellExtractor::new(&self.program, &self.username_var, &self.password_var)
    }
}

impl ClientConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| OcError::InvalidConfig(e.to_string()))
    }

    /// Read and parse a TOML config file, then validate it.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| OcError::ConfigRead(path.display().to_string(), e.to_string()))?;
        let config: ClientConfig = toml::from_str(&content)
            .map_err(|e| OcError::ConfigRead(path.display().to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config, failing fast before any process is spawned.
    pub fn validate(&self) -> crate::Result<()> {
        // 1. Command must name a program
        match self.command.first() {
            None => {
                return Err(OcError::InvalidConfig(
                    "'command' must contain at least the program name".to_string(),
                ));
            }
            Some(program) if program.trim().is_empty() => {
                return Err(OcError::InvalidConfig(
                    "'command' program name must not be empty".to_string(),
                ));
            }
            Some(_) => {}
        }

        // 2. Username and password come as a pair
        if self.username.is_some() != self.password.is_some() {
            return Err(OcError::InvalidConfig(
                "'username' and 'password' must be set together".to_string(),
            ));
        }

        // 3. Timeout of zero would kill every invocation
        if self.timeout_secs == Some(0) {
            return Err(OcError::InvalidConfig(
                "'timeout_secs' must be greater than 0".to_string(),
            ));
        }

        // 4. Shell program and variable names
        self.shell.extractor()?;

        Ok(())
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
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

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Username with `${VAR}` references resolved.
    pub fn resolved_username(&self) -> Option<String> {
        self.username.as_deref().map(resolve_value)
    }

    /// Password with `${VAR}` references resolved.
    pub fn resolved_password(&self) -> Option<String> {
        self.password.as_deref().map(resolve_value)
    }

    /// Credentials file with `~/` expanded.
    pub fn resolved_credentials_file(&self) -> Option<PathBuf> {
        self.credentials_file.as_deref().map(expand_home)
    }
}
