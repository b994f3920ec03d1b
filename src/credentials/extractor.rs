//! Shell-script credential extraction.
//!
//! Runs an arbitrary shell fragment (the contents of `~/.ocrc`), then prints the
//! two credential variables it is expected to export, each preceded by a fresh
//! random delimiter:
//!
//! ```text
//! <script>
//! printf '%s%s%s%s%s' 'D' "${OC2RTA_USERNAME-}" 'D' "${OC2RTA_PASSWORD-}" 'D'
//! ```
//!
//! Whatever the script prints itself lands before the first delimiter and is
//! discarded. The values are passed through `printf '%s'`, so quotes, newlines
//! and leading dashes come back byte-for-byte.
//!
//! The script is handed to the shell as raw bytes; only the two extracted
//! values have to be UTF-8.

use std::ffi::OsString;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use getrandom::fill as fill_random;
use regex::Regex;
use tokio::process::Command;

use crate::credentials::UsernamePassword;
use crate::error::OcError;

pub const DEFAULT_SHELL: &str = "sh";
pub const DEFAULT_USERNAME_VAR: &str = "OC2RTA_USERNAME";
pub const DEFAULT_PASSWORD_VAR: &str = "OC2RTA_PASSWORD";

/// Random bytes per delimiter (hex-encoded to twice as many characters).
const DELIMITER_BYTES: usize = 16;

/// Evaluate `script` with the default shell and variable names.
pub async fn get_credentials_exported_by(
    script: impl AsRef<[u8]>,
) -> crate::Result<UsernamePassword> {
    ShellExtractor::default().extract(script).await
}

/// Runs credential scripts with a given shell and reads two exported variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellExtractor {
    program: String,
    username_var: String,
    password_var: String,
    timeout: Option<Duration>,
}

impl Default for ShellExtractor {
    fn default() -> Self {
        Self {
            program: DEFAULT_SHELL.to_string(),
            username_var: DEFAULT_USERNAME_VAR.to_string(),
            password_var: DEFAULT_PASSWORD_VAR.to_string(),
            timeout: None,
        }
    }
}

impl ShellExtractor {
    /// Build an extractor. Variable names are interpolated into the generated
    /// script, so they must be plain shell identifiers.
    pub fn new(
        program: impl Into<String>,
        username_var: impl Into<String>,
        password_var: impl Into<String>,
    ) -> crate::Result<Self> {
        let extractor = Self {
            program: program.into(),
            username_var: username_var.into(),
            password_var: password_var.into(),
            timeout: None,
        };

        if extractor.program.trim().is_empty() {
            return Err(OcError::InvalidConfig(
                "shell program must not be empty".to_string(),
            ));
        }
        for name in [&extractor.username_var, &extractor.password_var] {
            if !is_shell_identifier(name) {
                return Err(OcError::InvalidConfig(format!(
                    "'{}' is not a valid shell variable name",
                    name
                )));
            }
        }

        Ok(extractor)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn username_var(&self) -> &str {
        &self.username_var
    }

    pub fn password_var(&self) -> &str {
        &self.password_var
    }

    /// Kill the shell and fail with `OcError::Timeout` if the script runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `script` and return the username/password it exports.
    ///
    /// Unset variables come back as empty strings. A non-zero shell exit
    /// status is `OcError::Execution`; a shell that cannot be started is
    /// `OcError::Spawn`. Values that are not UTF-8 are
    /// `OcError::NonUtf8Credential`.
    pub async fn extract(&self, script: impl AsRef<[u8]>) -> crate::Result<UsernamePassword> {
        let delimiter = random_delimiter()?;
        let wrapped = script_arg(self.wrap_script(script.as_ref(), &delimiter))?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-c")
            .arg(wrapped)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Dropping the output future on timeout drops the child, which kills it
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_elapsed| OcError::Timeout(self.program.clone(), timeout))?,
            None => cmd.output().await,
        }
        .map_err(|e| OcError::Spawn(self.program.clone(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            tracing::debug!(
                shell = %self.program,
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "credentials script failed"
            );
            // stdout may already hold a credential, keep it out of the error
            return Err(OcError::Execution {
                command: self.program.clone(),
                code: output.status.code(),
                stdout: String::new(),
                stderr,
            });
        }

        split_on_delimiter(&output.stdout, &delimiter)
    }

    fn wrap_script(&self, script: &[u8], delimiter: &str) -> Vec<u8> {
        let trailer = format!(
            "\nprintf '%s%s%s%s%s' '{d}' \"${{{user}-}}\" '{d}' \"${{{pass}-}}\" '{d}'\n",
            d = delimiter,
            user = self.username_var,
            pass = self.password_var,
        );
        let mut wrapped = Vec::with_capacity(script.len() + trailer.len());
        wrapped.extend_from_slice(script);
        wrapped.extend_from_slice(trailer.as_bytes());
        wrapped
    }
}

#[cfg(unix)]
fn script_arg(script: Vec<u8>) -> crate::Result<OsString> {
    use std::os::unix::ffi::OsStringExt;
    Ok(OsString::from_vec(script))
}

#[cfg(not(unix))]
fn script_arg(script: Vec<u8>) -> crate::Result<OsString> {
    String::from_utf8(script)
        .map(OsString::from)
        .map_err(|_| OcError::InvalidConfig("credentials script is not valid UTF-8".to_string()))
}

/// Take the fields after the first and second delimiter; anything before the
/// first one is script noise. Missing fields are empty.
fn split_on_delimiter(output: &[u8], delimiter: &str) -> crate::Result<UsernamePassword> {
    let mut fields = split_bytes(output, delimiter.as_bytes()).into_iter().skip(1);
    let username = utf8_field(fields.next().unwrap_or_default(), "username")?;
    let password = utf8_field(fields.next().unwrap_or_default(), "password")?;
    Ok(UsernamePassword::new(username, password))
}

fn split_bytes<'a>(haystack: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut fields = Vec::new();
    let mut rest = haystack;
    while let Some(pos) = rest
        .windows(delimiter.len())
        .position(|window| window == delimiter)
    {
        fields.push(&rest[..pos]);
        rest = &rest[pos + delimiter.len()..];
    }
    fields.push(rest);
    fields
}

// The value itself never goes into the error
fn utf8_field(bytes: &[u8], field: &'static str) -> crate::Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| OcError::NonUtf8Credential(field))
}

fn is_shell_identifier(name: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
        .is_match(name)
}

fn random_delimiter() -> crate::Result<String> {
    let mut bytes = [0u8; DELIMITER_BYTES];
    fill_random(&mut bytes).map_err(|err| OcError::Entropy(err.to_string()))?;
    Ok(hex_encode(&bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn extract(script: impl AsRef<[u8]>) -> (String, String) {
        let pair = get_credentials_exported_by(script).await.unwrap();
        (pair.username, pair.password.expose().to_string())
    }

    #[tokio::test]
    async fn test_username_and_password_from_a_shell_script() {
        let creds = extract(
            r#"
    export OC2RTA_USERNAME=alice
    export OC2RTA_PASSWORD=t0ps3cret
    "#,
        )
        .await;
        assert_eq!(creds, ("alice".to_string(), "t0ps3cret".to_string()));
    }

    #[tokio::test]
    async fn test_password_with_weird_characters() {
        let creds = extract(
            r#"
    export OC2RTA_USERNAME=alice
    export OC2RTA_PASSWORD=':!@#$a%^&*(b)"'
    "#,
        )
        .await;
        assert_eq!(creds.1, r#":!@#$a%^&*(b)""#);
    }

    #[tokio::test]
    async fn test_password_with_single_quote() {
        let creds = extract(
            r#"
    export OC2RTA_USERNAME=alice
    export OC2RTA_PASSWORD="'"
    "#,
        )
        .await;
        assert_eq!(creds.1, "'");
    }

    #[tokio::test]
    async fn test_password_with_newline() {
        let creds = extract(
            "
    export OC2RTA_USERNAME=alice
    export OC2RTA_PASSWORD=\"
\"
    ",
        )
        .await;
        assert_eq!(creds, ("alice".to_string(), "\n".to_string()));
    }

    #[tokio::test]
    async fn test_password_with_dashes() {
        let creds = extract(
            r#"
    export OC2RTA_USERNAME=alice
    export OC2RTA_PASSWORD="--not-a-flag"
    "#,
        )
        .await;
        assert_eq!(creds.1, "--not-a-flag");
    }

    #[tokio::test]
    async fn test_password_with_surrounding_whitespace() {
        let creds = extract(
            r#"
    export OC2RTA_USERNAME=" alice "
    export OC2RTA_PASSWORD="  two  spaces  "
    "#,
        )
        .await;
        assert_eq!(
            creds,
            (" alice ".to_string(), "  two  spaces  ".to_string())
        );
    }

    #[tokio::test]
    async fn test_script_that_echoes_things() {
        let creds = extract(
            r#"
    echo "mess you up"
    export OC2RTA_USERNAME=alice
    export OC2RTA_PASSWORD=password
    "#,
        )
        .await;
        assert_eq!(creds, ("alice".to_string(), "password".to_string()));
    }

    #[tokio::test]
    async fn test_script_with_no_newline_at_the_end() {
        let creds = extract(
            "
    export OC2RTA_USERNAME=alice
    export OC2RTA_PASSWORD=password",
        )
        .await;
        assert_eq!(creds, ("alice".to_string(), "password".to_string()));
    }

    #[tokio::test]
    async fn test_script_that_defines_nothing() {
        assert_eq!(extract("").await, (String::new(), String::new()));
    }

    #[tokio::test]
    async fn test_script_that_sets_only_username() {
        let creds = extract("OC2RTA_USERNAME=alice").await;
        assert_eq!(creds, ("alice".to_string(), String::new()));
    }

    #[tokio::test]
    async fn test_custom_variable_names() {
        let extractor = ShellExtractor::new("sh", "MY_USER", "MY_PASS").unwrap();
        let pair = extractor
            .extract("export MY_USER=bob\nexport MY_PASS=hunter2\n")
            .await
            .unwrap();
        assert_eq!(pair, UsernamePassword::new("bob", "hunter2"));
    }

    #[tokio::test]
    async fn test_failing_script_is_an_execution_error() {
        let result = get_credentials_exported_by("export OC2RTA_USERNAME=alice\nexit 3").await;
        assert!(
            matches!(result, Err(OcError::Execution { code: Some(3), ref stdout, .. }) if stdout.is_empty()),
            "non-zero exit should fail: {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_missing_shell_is_a_spawn_error() {
        let extractor = ShellExtractor::new(
            "oc-client-no-such-shell",
            DEFAULT_USERNAME_VAR,
            DEFAULT_PASSWORD_VAR,
        )
        .unwrap();
        let result = extractor.extract("true").await;
        assert!(matches!(result, Err(OcError::Spawn(ref program, _)) if program == "oc-client-no-such-shell"));
    }

    #[test]
    fn test_rejects_invalid_variable_names() {
        assert!(ShellExtractor::new("sh", "OK_NAME", "1BAD").is_err());
        assert!(ShellExtractor::new("sh", "$(touch /tmp/x)", "PASS").is_err());
        assert!(ShellExtractor::new("", "USER", "PASS").is_err());
        let extractor = ShellExtractor::new("bash", "_user2", "PASS").unwrap();
        assert_eq!(extractor.program(), "bash");
        assert_eq!(extractor.username_var(), "_user2");
        assert_eq!(extractor.password_var(), "PASS");
        assert_eq!(extractor.timeout(), None);
    }

    #[tokio::test]
    async fn test_non_utf8_script_bytes_reach_the_shell() {
        // Latin-1 comment, UTF-8 values
        let creds = extract(b"# caf\xe9\nexport OC2RTA_USERNAME=alice\nexport OC2RTA_PASSWORD=caf\xc3\xa9\n")
            .await;
        assert_eq!(creds, ("alice".to_string(), "café".to_string()));
    }

    #[tokio::test]
    async fn test_non_utf8_password_is_an_error() {
        let result =
            get_credentials_exported_by(b"export OC2RTA_USERNAME=alice\nexport OC2RTA_PASSWORD=caf\xe9\n")
                .await;
        assert!(
            matches!(result, Err(OcError::NonUtf8Credential("password"))),
            "unexpected result: {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_slow_script_times_out() {
        let extractor = ShellExtractor::default().with_timeout(Duration::from_millis(200));
        assert_eq!(extractor.timeout(), Some(Duration::from_millis(200)));
        let start = std::time::Instant::now();
        let result = extractor.extract("sleep 5").await;
        assert!(matches!(result, Err(OcError::Timeout(ref shell, _)) if shell == "sh"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_split_discards_leading_noise() {
        let pair = split_on_delimiter(b"noise\nXXuserXXpa\nssXX", "XX").unwrap();
        assert_eq!(pair, UsernamePassword::new("user", "pa\nss"));
    }

    #[test]
    fn test_split_without_delimiter_yields_empty_fields() {
        let pair = split_on_delimiter(b"the script exited early", "XX").unwrap();
        assert_eq!(pair, UsernamePassword::new("", ""));
    }

    #[test]
    fn test_split_rejects_non_utf8_username() {
        let result = split_on_delimiter(b"XX\xffXXpassXX", "XX");
        assert!(matches!(result, Err(OcError::NonUtf8Credential("username"))));
    }

    #[test]
    fn test_random_delimiter_shape() {
        let a = random_delimiter().unwrap();
        let b = random_delimiter().unwrap();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0x0f, 0xa5, 0xff]), "000fa5ff");
    }
}
