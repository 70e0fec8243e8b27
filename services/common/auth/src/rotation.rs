use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::codec::SignedToken;
use crate::error::{AuthError, AuthResult};
use crate::factory::{IssuedToken, TokenFactory};

type TokenDigest = [u8; 32];

fn digest(token: &str) -> TokenDigest {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Tracks the single active refresh token per subject.
///
/// Implementations must make `compare_and_swap` and `revoke` atomic per subject:
/// of two concurrent calls presenting the same token, at most one may succeed.
pub trait RefreshTokenStore: Send + Sync {
    /// Records `token` as the active refresh token, replacing any previous one.
    fn issue_initial(&self, subject: &str, token: &SignedToken);

    /// Replaces the active token with `replacement` iff it equals `presented`.
    ///
    /// Fails with [`AuthError::StaleRefreshToken`] and leaves the store untouched otherwise.
    fn compare_and_swap(
        &self,
        subject: &str,
        presented: &str,
        replacement: &SignedToken,
    ) -> AuthResult<()>;

    /// Clears the active token iff it equals `presented`.
    fn revoke(&self, subject: &str, presented: &str) -> AuthResult<()>;

    fn is_active(&self, subject: &str, token: &str) -> bool;

    /// Mints a new refresh token for `subject` and swaps it in for `presented`.
    fn rotate(
        &self,
        subject: &str,
        presented: &str,
        factory: &TokenFactory,
    ) -> AuthResult<IssuedToken> {
        let next = factory.issue_refresh_token(subject)?;
        self.compare_and_swap(subject, presented, &next.token)?;
        debug!(subject, "refresh token rotated");
        Ok(next)
    }
}

type Slot = Arc<Mutex<Option<TokenDigest>>>;

/// Process-local store keyed by subject. Only SHA-256 digests of tokens are retained.
#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subjects currently holding an active refresh token.
    pub fn active_count(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }

    fn existing_slot(&self, subject: &str) -> Option<Slot> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(subject).cloned()
    }

    fn slot(&self, subject: &str) -> Slot {
        if let Some(slot) = self.existing_slot(subject) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.entry(subject.to_string()).or_default().clone()
    }

    fn with_matching_slot<F>(&self, subject: &str, presented: &str, update: F) -> AuthResult<()>
    where
        F: FnOnce(&mut Option<TokenDigest>),
    {
        let slot = self.existing_slot(subject).ok_or_else(|| {
            warn!(subject, "refresh token presented for subject without active session");
            AuthError::StaleRefreshToken
        })?;

        let mut active = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if *active != Some(digest(presented)) {
            warn!(subject, "superseded refresh token presented");
            return Err(AuthError::StaleRefreshToken);
        }
        update(&mut active);
        Ok(())
    }
}

impl RefreshTokenStore for InMemoryRefreshTokenStore {
    fn issue_initial(&self, subject: &str, token: &SignedToken) {
        let slot = self.slot(subject);
        let mut active = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            debug!(subject, "replacing previous refresh token");
        }
        *active = Some(digest(token.as_str()));
    }

    fn compare_and_swap(
        &self,
        subject: &str,
        presented: &str,
        replacement: &SignedToken,
    ) -> AuthResult<()> {
        let next = digest(replacement.as_str());
        self.with_matching_slot(subject, presented, |active| *active = Some(next))
    }

    fn revoke(&self, subject: &str, presented: &str) -> AuthResult<()> {
        self.with_matching_slot(subject, presented, |active| *active = None)
    }

    fn is_active(&self, subject: &str, token: &str) -> bool {
        match self.existing_slot(subject) {
            Some(slot) => {
                *slot.lock().unwrap_or_else(PoisonError::into_inner) == Some(digest(token))
            }
            None => false,
        }
    }
}
