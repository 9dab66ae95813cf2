//! Session store — opaque session tokens mapped to auth flag and progress.
//!
//! Sessions live in the external key-value service (the `kv` table behind
//! the `Database` trait); no other module touches the session keys. The auth
//! flag and the onboarding progress are separate keys because they carry
//! different TTLs (30 days vs 7 days).

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::store::Database;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// Token length in hex characters (16 random bytes = 128 bits of entropy).
const TOKEN_HEX_LEN: usize = 32;

/// Per-session onboarding progress.
///
/// `completed` is a set — completing a step twice stores it once. `next` is
/// an explicit override for the computed next step; the sequencer keeps it
/// in sync after every completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Result of resolving the request cookie to a session.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub id: String,
    /// True when a new token was minted; the caller must set the cookie.
    pub is_new: bool,
}

/// Session persistence over the key-value store.
pub struct SessionStore {
    db: Arc<dyn Database>,
    auth_ttl: Duration,
    progress_ttl: Duration,
}

impl SessionStore {
    pub fn new(db: Arc<dyn Database>, auth_ttl: Duration, progress_ttl: Duration) -> Self {
        Self {
            db,
            auth_ttl,
            progress_ttl,
        }
    }

    /// Cookie max age, shared with the auth flag TTL.
    pub fn cookie_max_age(&self) -> Duration {
        self.auth_ttl
    }

    /// Resolve the `Cookie` request header to a session id.
    ///
    /// A well-formed existing token is reused as-is (the session record may
    /// have expired server-side; that just reads as unauthenticated / empty
    /// progress). Anything else gets a freshly minted token.
    pub fn resolve_session(&self, cookie_header: Option<&str>) -> ResolvedSession {
        if let Some(token) = cookie_header.and_then(session_token_from_cookies) {
            return ResolvedSession {
                id: token,
                is_new: false,
            };
        }
        let id = mint_token();
        debug!(sid = %id, "Minted new session token");
        ResolvedSession { id, is_new: true }
    }

    /// Read the auth flag; absent or expired reads as `false`.
    pub async fn is_authenticated(&self, sid: &str) -> Result<bool, StoreError> {
        Ok(self.db.kv_get(&auth_key(sid)).await?.as_deref() == Some("1"))
    }

    /// Write the auth flag with the 30-day TTL. Setting `false` deletes the
    /// key rather than storing a tombstone.
    pub async fn set_authenticated(&self, sid: &str, authenticated: bool) -> Result<(), StoreError> {
        if authenticated {
            self.db.kv_put(&auth_key(sid), "1", self.auth_ttl).await
        } else {
            self.db.kv_delete(&auth_key(sid)).await
        }
    }

    /// Read progress; absent or expired reads as empty.
    pub async fn get_progress(&self, sid: &str) -> Result<Progress, StoreError> {
        match self.db.kv_get(&progress_key(sid)).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| StoreError::Serialization(format!("Invalid progress blob: {e}"))),
            None => Ok(Progress::default()),
        }
    }

    /// Write progress with the 7-day TTL.
    ///
    /// Plain read-modify-write: two concurrent writers race and the later
    /// write wins, possibly dropping the earlier completion. Accepted
    /// weak-consistency tradeoff of the external store.
    pub async fn set_progress(&self, sid: &str, progress: &Progress) -> Result<(), StoreError> {
        let raw = serde_json::to_string(progress)
            .map_err(|e| StoreError::Serialization(format!("Failed to encode progress: {e}")))?;
        self.db.kv_put(&progress_key(sid), &raw, self.progress_ttl).await
    }

    /// Destroy the session record: auth flag and progress both go.
    pub async fn clear(&self, sid: &str) -> Result<(), StoreError> {
        self.db.kv_delete(&auth_key(sid)).await?;
        self.db.kv_delete(&progress_key(sid)).await?;
        debug!(sid = %sid, "Session cleared");
        Ok(())
    }
}

fn auth_key(sid: &str) -> String {
    format!("auth:{sid}")
}

fn progress_key(sid: &str) -> String {
    format!("progress:{sid}")
}

/// Mint a 128-bit random token, hex-encoded.
fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_HEX_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Extract a well-formed session token from a `Cookie` header value.
fn session_token_from_cookies(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name != SESSION_COOKIE {
            return None;
        }
        let value = value.trim();
        (value.len() == TOKEN_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit()))
            .then(|| value.to_ascii_lowercase())
    })
}

/// Build the `Set-Cookie` header for a freshly minted session.
pub fn build_set_cookie(sid: &str, max_age: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={sid}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Lax",
        max_age.as_secs()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    async fn store() -> SessionStore {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        SessionStore::new(db, Duration::from_secs(3600), Duration::from_secs(3600))
    }

    fn progress_of(slugs: &[&str]) -> Progress {
        Progress {
            completed: slugs.iter().map(|s| s.to_string()).collect(),
            next: None,
        }
    }

    #[test]
    fn minted_tokens_are_well_formed_and_distinct() {
        let a = mint_token();
        let b = mint_token();
        assert_eq!(a.len(), TOKEN_HEX_LEN);
        assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn cookie_parsing() {
        let token = mint_token();

        let header = format!("theme=dark; sid={token}; lang=en");
        assert_eq!(session_token_from_cookies(&header), Some(token.clone()));

        // Wrong name, malformed value, wrong length
        assert_eq!(session_token_from_cookies("sid2=abc"), None);
        assert_eq!(session_token_from_cookies("sid=not-hex!"), None);
        assert_eq!(session_token_from_cookies("sid=abcd"), None);
    }

    #[test]
    fn set_cookie_header_carries_contract_attributes() {
        let header = build_set_cookie("deadbeef", Duration::from_secs(2_592_000));
        assert!(header.starts_with("sid=deadbeef; Max-Age=2592000"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Path=/"));
    }

    #[tokio::test]
    async fn resolve_reuses_valid_token_and_remints_otherwise() {
        let store = store().await;

        let fresh = store.resolve_session(None);
        assert!(fresh.is_new);

        let header = format!("sid={}", fresh.id);
        let again = store.resolve_session(Some(&header));
        assert!(!again.is_new);
        assert_eq!(again.id, fresh.id);

        let remint = store.resolve_session(Some("sid=garbage"));
        assert!(remint.is_new);
        assert_ne!(remint.id, fresh.id);
    }

    #[tokio::test]
    async fn auth_flag_roundtrip() {
        let store = store().await;
        let sid = mint_token();

        assert!(!store.is_authenticated(&sid).await.unwrap());
        store.set_authenticated(&sid, true).await.unwrap();
        assert!(store.is_authenticated(&sid).await.unwrap());
        store.set_authenticated(&sid, false).await.unwrap();
        assert!(!store.is_authenticated(&sid).await.unwrap());
    }

    #[tokio::test]
    async fn progress_roundtrip_and_default() {
        let store = store().await;
        let sid = mint_token();

        assert_eq!(store.get_progress(&sid).await.unwrap(), Progress::default());

        let mut progress = progress_of(&["signin", "connect-data"]);
        progress.next = Some("business-setup".into());
        store.set_progress(&sid, &progress).await.unwrap();
        assert_eq!(store.get_progress(&sid).await.unwrap(), progress);
    }

    #[tokio::test]
    async fn clear_removes_auth_and_progress() {
        let store = store().await;
        let sid = mint_token();

        store.set_authenticated(&sid, true).await.unwrap();
        store
            .set_progress(&sid, &progress_of(&["signin"]))
            .await
            .unwrap();

        store.clear(&sid).await.unwrap();
        assert!(!store.is_authenticated(&sid).await.unwrap());
        assert_eq!(store.get_progress(&sid).await.unwrap(), Progress::default());
    }

    /// Documents the accepted weak-consistency tradeoff: progress updates are
    /// read-modify-write without compare-and-swap, so the later of two
    /// concurrent writers drops the earlier completion.
    #[tokio::test]
    async fn concurrent_progress_writes_are_last_write_wins() {
        let store = store().await;
        let sid = mint_token();

        // Both "requests" read the same starting snapshot...
        let snapshot_a = store.get_progress(&sid).await.unwrap();
        let snapshot_b = store.get_progress(&sid).await.unwrap();

        // ...then each adds a different completion and writes back.
        let mut a = snapshot_a;
        a.completed.insert("signin".into());
        store.set_progress(&sid, &a).await.unwrap();

        let mut b = snapshot_b;
        b.completed.insert("connect-data".into());
        store.set_progress(&sid, &b).await.unwrap();

        // The second write won; the first completion was lost.
        let merged = store.get_progress(&sid).await.unwrap();
        assert!(merged.completed.contains("connect-data"));
        assert!(!merged.completed.contains("signin"));
    }
}
