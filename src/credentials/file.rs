//! Credentials read from a shell-script file such as `~/.ocrc`.

use std::path::{Path, PathBuf};

use tokio::sync::OnceCell;

use crate::credentials::{ShellExtractor, UsernamePassword};

/// Credentials backed by a shell script on disk.
///
/// The file is read and evaluated on the first `resolve()` only; the outcome
/// (a pair, or "no credentials" when the file cannot be read) is cached for the
/// lifetime of this value. Equality compares the path and extractor settings,
/// never the cache.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
    extractor: ShellExtractor,
    resolved: OnceCell<Option<UsernamePassword>>,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extractor: ShellExtractor::default(),
            resolved: OnceCell::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: ShellExtractor) -> Self {
        self.extractor = extractor;
        self.resolved = OnceCell::new();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once the file has been read (or found missing).
    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }

    /// Resolve the credentials, reading and evaluating the file on first call.
    ///
    /// A file that cannot be opened or read resolves to `Ok(None)`. Its contents
    /// are passed to the shell as raw bytes. A script that fails to run, or
    /// exports a value that is not UTF-8, is returned as an error and not
    /// cached, so a later call retries.
    pub async fn resolve(&self) -> crate::Result<Option<&UsernamePassword>> {
        let resolved = self
            .resolved
            .get_or_try_init(|| async {
                let script = match tokio::fs::read(&self.path).await {
                    Ok(script) => script,
                    Err(e) => {
                        tracing::debug!(
                            path = %self.path.display(),
                            error = %e,
                            "credentials file unavailable, continuing without credentials"
                        );
                        return Ok(None);
                    }
                };

                let pair = self.extractor.extract(&script).await?;
                tracing::debug!(
                    path = %self.path.display(),
                    username = %pair.username,
                    "loaded credentials from file"
                );
                Ok::<_, crate::OcError>(Some(pair))
            })
            .await?;

        Ok(resolved.as_ref())
    }
}

impl PartialEq for FileCredentials {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.extractor == other.extractor
    }
}

impl Eq for FileCredentials {}
