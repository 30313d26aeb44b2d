//! Signing secret sources.
//!
//! The token codec asks its source for the secret on every issue and verify,
//! so replacing the secret (new file contents, new env value) applies to the
//! next token operation without a restart. An unset or blank secret is an
//! error; there is no built-in fallback value.

use secrecy::{ExposeSecret, SecretString};
use std::{fmt, fs, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("signing secret variable {0} is not set")]
    Unset(String),
    #[error("signing secret from {0} is empty")]
    Empty(String),
    #[error("failed to read signing secret file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where the HMAC signing secret comes from.
pub trait SecretSource: Send + Sync + fmt::Debug {
    /// Resolve the current secret.
    ///
    /// # Errors
    /// Returns an error when the secret is missing, blank, or unreadable.
    fn current(&self) -> Result<SecretString, SecretError>;
}

/// A fixed secret, mostly for tests and embedding.
#[derive(Clone)]
pub struct StaticSecret(SecretString);

impl StaticSecret {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::from(secret.into()))
    }
}

impl fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticSecret([REDACTED])")
    }
}

impl SecretSource for StaticSecret {
    fn current(&self) -> Result<SecretString, SecretError> {
        non_empty(self.0.clone(), "static configuration")
    }
}

/// Reads the named environment variable on every call.
#[derive(Clone, Debug)]
pub struct EnvSecret {
    var: String,
}

impl EnvSecret {
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretSource for EnvSecret {
    fn current(&self) -> Result<SecretString, SecretError> {
        let value = std::env::var(&self.var).map_err(|_| SecretError::Unset(self.var.clone()))?;
        non_empty(SecretString::from(value), &self.var)
    }
}

/// Reads the file on every call; trailing newlines are ignored.
#[derive(Clone, Debug)]
pub struct FileSecret {
    path: PathBuf,
}

impl FileSecret {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretSource for FileSecret {
    fn current(&self) -> Result<SecretString, SecretError> {
        let display = self.path.display().to_string();
        let contents = fs::read_to_string(&self.path).map_err(|source| SecretError::Read {
            path: display.clone(),
            source,
        })?;
        let trimmed = contents.trim_end_matches(['\r', '\n']).to_string();
        non_empty(SecretString::from(trimmed), &display)
    }
}

fn non_empty(secret: SecretString, origin: &str) -> Result<SecretString, SecretError> {
    if secret.expose_secret().trim().is_empty() {
        Err(SecretError::Empty(origin.to_string()))
    } else {
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn static_secret_resolves() -> Result<(), SecretError> {
        let source = StaticSecret::new("s3cr3t");
        assert_eq!(source.current()?.expose_secret(), "s3cr3t");
        assert!(!format!("{source:?}").contains("s3cr3t"));
        Ok(())
    }

    #[test]
    fn static_secret_rejects_blank() {
        let source = StaticSecret::new("   ");
        assert!(matches!(source.current(), Err(SecretError::Empty(_))));
    }

    #[test]
    fn env_secret_reads_on_every_call() {
        let source = EnvSecret::new("AFRIDAUTH_TEST_ROTATING_SECRET");
        temp_env::with_var("AFRIDAUTH_TEST_ROTATING_SECRET", Some("first"), || {
            let value = source.current().map(|s| s.expose_secret().to_string());
            assert_eq!(value.ok().as_deref(), Some("first"));
        });
        temp_env::with_var("AFRIDAUTH_TEST_ROTATING_SECRET", Some("second"), || {
            let value = source.current().map(|s| s.expose_secret().to_string());
            assert_eq!(value.ok().as_deref(), Some("second"));
        });
    }

    #[test]
    fn env_secret_unset_is_an_error() {
        temp_env::with_var_unset("AFRIDAUTH_TEST_MISSING_SECRET", || {
            let source = EnvSecret::new("AFRIDAUTH_TEST_MISSING_SECRET");
            assert!(matches!(source.current(), Err(SecretError::Unset(_))));
        });
    }

    #[test]
    fn env_secret_empty_is_an_error() {
        temp_env::with_var("AFRIDAUTH_TEST_EMPTY_SECRET", Some(""), || {
            let source = EnvSecret::new("AFRIDAUTH_TEST_EMPTY_SECRET");
            assert!(matches!(source.current(), Err(SecretError::Empty(_))));
        });
    }

    #[test]
    fn file_secret_picks_up_rotation() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!("afridauth-secret-{}", ulid::Ulid::new()));
        fs::write(&path, "first\n")?;
        let source = FileSecret::new(&path);
        assert_eq!(source.current()?.expose_secret(), "first");

        let mut file = fs::File::create(&path)?;
        file.write_all(b"second")?;
        drop(file);
        assert_eq!(source.current()?.expose_secret(), "second");

        fs::remove_file(&path)?;
        assert!(matches!(source.current(), Err(SecretError::Read { .. })));
        Ok(())
    }
}
