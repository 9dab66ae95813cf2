//! The canonical step sequence and the pure next-step computation.

use crate::session::Progress;

/// The fixed progression order. The first slug is the entry step (the only
/// one reachable unauthenticated), the last is the terminal step.
pub const CANONICAL_ORDER: [&str; 11] = [
    "signin",
    "connect-data",
    "business-setup",
    "settings-setup",
    "dashboard-preview",
    "analytics-trends",
    "profiles",
    "reports",
    "forecasting",
    "alerts",
    "assistant",
];

/// An ordered list of known slugs, defined once at startup and immutable
/// thereafter. Authoritative for the no-skip-ahead guard; the catalog's
/// `next_slug` pointers must agree with it (checked at startup).
#[derive(Debug, Clone)]
pub struct StepSequence {
    slugs: Vec<String>,
}

impl StepSequence {
    /// The production sequence.
    pub fn canonical() -> Self {
        Self::new(&CANONICAL_ORDER)
    }

    pub fn new(slugs: &[&str]) -> Self {
        assert!(!slugs.is_empty(), "step sequence cannot be empty");
        Self {
            slugs: slugs.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    pub fn slugs(&self) -> &[String] {
        &self.slugs
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.slugs.get(index).map(String::as_str)
    }

    /// The entry slug (`signin` in the canonical sequence).
    pub fn entry(&self) -> &str {
        &self.slugs[0]
    }

    /// The terminal slug (`assistant` in the canonical sequence).
    pub fn terminal(&self) -> &str {
        &self.slugs[self.slugs.len() - 1]
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.index_of(slug).is_some()
    }

    pub fn index_of(&self, slug: &str) -> Option<usize> {
        self.slugs.iter().position(|s| s == slug)
    }

    /// Position used by the access guard. Unknown slugs count as the entry
    /// position, so they can never unlock anything ahead of it.
    pub fn guard_index(&self, slug: &str) -> usize {
        self.index_of(slug).unwrap_or(0)
    }
}

/// Compute the next step for the given progress. Pure.
///
/// An explicit `next` override wins when it names a known slug. Otherwise
/// the next step is the first slug in canonical order not yet completed;
/// once everything is complete, it stays at the terminal slug.
pub fn compute_next<'a>(sequence: &'a StepSequence, progress: &Progress) -> &'a str {
    if let Some(next) = progress.next.as_deref() {
        if let Some(slug) = sequence.slugs().iter().find(|s| s.as_str() == next) {
            return slug;
        }
    }
    sequence
        .slugs()
        .iter()
        .find(|slug| !progress.completed.contains(*slug))
        .map(String::as_str)
        .unwrap_or_else(|| sequence.terminal())
}
