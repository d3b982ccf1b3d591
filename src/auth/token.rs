//! Drift authorization secret.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::RngCore;

/// Random bytes in a generated token (rendered as twice as many hex chars).
pub const TOKEN_BYTES: usize = 32;

/// Errors loading or creating the token file.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to read token file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write token file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("token file {0} is empty")]
    Empty(PathBuf),
}

/// Process-wide shared secret gating Drift uploads.
///
/// Built once at startup and never mutated; clones share the same storage.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationToken(Arc<str>);

impl AuthorizationToken {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        let mut raw = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        Self::new(hex)
    }

    /// Compare a claimed token in time independent of where they differ.
    pub fn verify(&self, claimed: &str) -> bool {
        let expected = self.0.as_bytes();
        let claimed = claimed.as_bytes();

        let mut diff = expected.len() ^ claimed.len();
        for (i, byte) in expected.iter().enumerate() {
            let other = claimed.get(i).copied().unwrap_or(0);
            diff |= usize::from(byte ^ other);
        }
        diff == 0
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthorizationToken").field(&"<redacted>").finish()
    }
}

/// File-backed token persistence.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the token, generating and persisting one if the file is absent.
    pub fn load_or_create(&self) -> Result<AuthorizationToken, TokenError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                if token.is_empty() {
                    return Err(TokenError::Empty(self.path.clone()));
                }
                tracing::info!(path = %self.path.display(), "Loaded Drift token");
                Ok(AuthorizationToken::new(token))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => self.create(),
            Err(source) => Err(TokenError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn create(&self) -> Result<AuthorizationToken, TokenError> {
        let token = AuthorizationToken::generate();
        let write_err = |source| TokenError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut file = open_private(&self.path).map_err(write_err)?;
        file.write_all(token.expose().as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;

        tracing::info!(path = %self.path.display(), "Generated new Drift token");
        Ok(token)
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_matches_only_identical_tokens() {
        let token = AuthorizationToken::new("VALIDTOKEN");
        assert!(token.verify("VALIDTOKEN"));
        assert!(!token.verify("VALIDTOKEM"));
        assert!(!token.verify("VALIDTOKE"));
        assert!(!token.verify("VALIDTOKENX"));
        assert!(!token.verify(""));
    }

    #[test]
    fn generated_token_is_hex() {
        let token = AuthorizationToken::generate();
        assert_eq!(token.expose().len(), TOKEN_BYTES * 2);
        assert!(token.expose().bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(token, AuthorizationToken::generate());
    }

    #[test]
    fn debug_does_not_leak() {
        let token = AuthorizationToken::new("secret");
        assert!(!format!("{token:?}").contains("secret"));
    }

    #[test]
    fn creates_then_reloads_same_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join("drift_token.txt"));

        let created = store.load_or_create().unwrap();
        let loaded = store.load_or_create().unwrap();
        assert_eq!(created, loaded);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift_token.txt");
        fs::write(&path, "abc123\n").unwrap();

        let token = TokenStore::new(&path).load_or_create().unwrap();
        assert!(token.verify("abc123"));
    }

    #[test]
    fn empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift_token.txt");
        fs::write(&path, "  \n").unwrap();

        let err = TokenStore::new(&path).load_or_create().unwrap_err();
        assert!(matches!(err, TokenError::Empty(_)));
    }

    #[cfg(unix)]
    #[test]
    fn generated_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift_token.txt");
        TokenStore::new(&path).load_or_create().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
