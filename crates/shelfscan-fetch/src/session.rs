//! Persistence of rendered-session credentials across runs.
//!
//! A verified session is worth keeping: reusing its cookies lets later runs
//! skip the challenges an unseasoned session would hit. The blob is one JSON
//! file per catalog source, written atomically (temp file + rename) so a
//! concurrent reader never observes a partial write.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One cookie from the rendering session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Opaque-to-the-pipeline credential state of the rendering session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,

    /// Set when a challenge was last resolved against this session.
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
}

impl SessionState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Stamps the session as operator-verified now.
    pub fn mark_verified(&mut self) {
        self.verified_at = Some(Utc::now());
    }
}

/// File-backed store for one catalog source's [`SessionState`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted session, if any.
    ///
    /// A missing file is `Ok(None)`; first runs have no session.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::SessionUnavailable`] if the file exists but
    /// cannot be read or parsed. Callers treat this as non-fatal: proceed
    /// without a session and expect more challenges.
    pub async fn load(&self) -> Result<Option<SessionState>, FetchError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FetchError::SessionUnavailable {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };
        let state = serde_json::from_slice::<SessionState>(&raw).map_err(|e| {
            FetchError::SessionUnavailable {
                path: self.path.display().to_string(),
                reason: format!("corrupt session blob: {e}"),
            }
        })?;
        Ok(Some(state))
    }

    /// Persists the session atomically: write to `<path>.tmp`, then rename
    /// over the destination.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::SessionUnavailable`] on any I/O failure.
    pub async fn save(&self, state: &SessionState) -> Result<(), FetchError> {
        let unavailable = |reason: String| FetchError::SessionUnavailable {
            path: self.path.display().to_string(),
            reason,
        };

        let json =
            serde_json::to_vec_pretty(state).map_err(|e| unavailable(format!("serialize: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| unavailable(format!("write temp file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| unavailable(format!("rename into place: {e}")))?;

        tracing::debug!(path = %self.path.display(), cookies = state.cookies.len(), "session persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> SessionState {
        SessionState {
            cookies: vec![SessionCookie {
                name: "sid".to_owned(),
                value: "abc123".to_owned(),
                domain: Some(".catalog.example".to_owned()),
                path: Some("/".to_owned()),
            }],
            verified_at: None,
        }
    }

    #[tokio::test]
    async fn load_returns_none_for_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("session.json"));
        let loaded = store.load().await.expect("missing file is not an error");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("session.json"));
        let mut state = sample_state();
        state.mark_verified();

        store.save(&state).await.expect("save should succeed");
        let loaded = store
            .load()
            .await
            .expect("load should succeed")
            .expect("state should be present");
        assert_eq!(loaded, state);
        assert!(loaded.verified_at.is_some());
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let store = SessionStore::new(path.clone());
        store.save(&sample_state()).await.expect("save");
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_blob_is_session_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"{ not json")
            .await
            .expect("write fixture");
        let store = SessionStore::new(path);
        let result = store.load().await;
        assert!(matches!(
            result,
            Err(FetchError::SessionUnavailable { .. })
        ));
    }
}
