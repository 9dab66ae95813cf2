//! Sequencer — completion tracking and the step access guard.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{SequencerError, StoreError};
use crate::session::SessionStore;

use super::sequence::{StepSequence, compute_next};

/// Outcome of an access check for a step page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAccess {
    Allow,
    /// The slug the session should be sent to instead.
    Redirect(String),
}

/// The onboarding state machine over a session store.
///
/// Holds no per-request state of its own; every operation reads and writes
/// through the session store, so concurrent requests see the store's
/// last-write-wins semantics (no compare-and-swap, by contract).
pub struct Sequencer {
    sessions: Arc<SessionStore>,
    sequence: StepSequence,
}

impl Sequencer {
    pub fn new(sessions: Arc<SessionStore>, sequence: StepSequence) -> Self {
        Self { sessions, sequence }
    }

    pub fn sequence(&self) -> &StepSequence {
        &self.sequence
    }

    /// Record a completion and return the recomputed next slug.
    ///
    /// Completing any slug other than the entry slug requires an
    /// authenticated session. Idempotent: re-completing a slug only
    /// recomputes `next`.
    pub async fn mark_complete(&self, sid: &str, slug: &str) -> Result<String, SequencerError> {
        if !self.sequence.contains(slug) {
            return Err(SequencerError::UnknownStep(slug.to_string()));
        }
        if slug != self.sequence.entry() && !self.sessions.is_authenticated(sid).await? {
            warn!(sid = %sid, step = %slug, "Completion rejected: not signed in");
            return Err(SequencerError::Unauthorized);
        }

        let mut progress = self.sessions.get_progress(sid).await?;
        progress.completed.insert(slug.to_string());

        // Recompute from the completed set; a stale override must not win.
        progress.next = None;
        let next = compute_next(&self.sequence, &progress).to_string();
        progress.next = Some(next.clone());

        self.sessions.set_progress(sid, &progress).await?;
        info!(sid = %sid, step = %slug, next = %next, "Step completed");
        Ok(next)
    }

    /// No-skip-ahead guard for step pages.
    ///
    /// A session may view its computed current step or anything at or before
    /// it, never a step strictly ahead of the first incomplete one. Every
    /// step besides the entry also requires authentication. Unknown slugs
    /// are guarded as if they were the entry step; whether they exist is the
    /// catalog's question, not the guard's.
    pub async fn authorize_step_access(
        &self,
        sid: &str,
        slug: &str,
    ) -> Result<StepAccess, StoreError> {
        let position = self.sequence.guard_index(slug);

        if position > 0 && !self.sessions.is_authenticated(sid).await? {
            return Ok(StepAccess::Redirect(self.sequence.entry().to_string()));
        }

        let progress = self.sessions.get_progress(sid).await?;
        let current = compute_next(&self.sequence, &progress);
        if position > self.sequence.guard_index(current) {
            return Ok(StepAccess::Redirect(current.to_string()));
        }

        Ok(StepAccess::Allow)
    }
}
