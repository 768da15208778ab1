//! Persistence for the session token pair.
//!
//! Two string credentials under one fixed file, nothing more: no shape
//! checks, no expiry tracking. An expired access token is only discovered by
//! a failed request.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::Tokens;

const TOKENS_FILE: &str = "tokens.json";

/// File-backed store for the access/refresh token pair.
///
/// The constructor takes the directory so tests can point it at a tempdir;
/// the app uses [`TokenStore::from_config_dir`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(TOKENS_FILE),
        }
    }

    pub fn from_config_dir() -> Result<Self> {
        Ok(Self::new(&Config::config_dir()?))
    }

    /// Persist both tokens, creating the directory on first use.
    pub fn save(&self, tokens: &Tokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(tokens)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        debug!("Saved session tokens to {:?}", self.path);
        Ok(())
    }

    /// Load the stored pair. A missing file, or a file missing either token,
    /// reads as absent.
    pub fn get(&self) -> Option<Tokens> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Tokens>(&content) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                warn!("Stored tokens are unreadable, treating as absent: {}", e);
                None
            }
        }
    }

    /// Remove both tokens. Missing file is fine.
    pub fn clear(&self) {
        if self.path.exists() {
            let _ = std::fs::remove_file(&self.path);
            debug!("Cleared session tokens");
        }
    }

    /// True iff both tokens are present.
    pub fn has(&self) -> bool {
        self.get().is_some()
    }
}
