//! Step catalog — read-only lookup of onboarding step content.
//!
//! Content authoring is external: the core never writes the `steps` table
//! beyond the seed migration. Ordering for guards comes from the canonical
//! [`StepSequence`](crate::onboarding::StepSequence); the catalog's
//! `next_slug` pointer is only the rendered "continue" link, and the two are
//! reconciled once at startup by [`StepCatalog::verify_chain`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, StoreError};
use crate::onboarding::StepSequence;
use crate::store::Database;

/// An immutable catalog entry, one row of the `steps` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// URL-safe unique identifier.
    pub slug: String,
    pub title: String,
    pub body_html: String,
    /// Label for the "continue" button; `None` on the terminal step.
    pub cta_label: Option<String>,
    /// Forward pointer; `None` on the terminal step.
    pub next_slug: Option<String>,
}

/// Read-only step lookup backed by the relational store.
pub struct StepCatalog {
    db: Arc<dyn Database>,
}

impl StepCatalog {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Single-row lookup by slug. Absent slug is an ordinary `None`, not an
    /// error; storage failure surfaces as [`StoreError`].
    pub async fn get_step(&self, slug: &str) -> Result<Option<Step>, StoreError> {
        self.db.get_step(slug).await
    }

    /// Startup consistency check: walk the `next_slug` chain from the entry
    /// step and require it to reproduce the canonical order exactly.
    ///
    /// Progression authority is the canonical sequence; a catalog whose
    /// pointers disagree would render "continue" links that the
    /// no-skip-ahead guard then rejects. Fail loudly instead of picking one.
    pub async fn verify_chain(&self, sequence: &StepSequence) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        let mut chain: Vec<String> = Vec::with_capacity(sequence.len());
        let mut cursor = Some(sequence.entry().to_string());

        while let Some(slug) = cursor {
            if !seen.insert(slug.clone()) {
                return Err(CatalogError::Cycle(slug));
            }
            let step = self
                .get_step(&slug)
                .await?
                .ok_or_else(|| CatalogError::MissingStep(slug.clone()))?;
            chain.push(slug);
            cursor = step.next_slug;
        }

        for i in 0..sequence.len().max(chain.len()) {
            let expected = sequence.get(i);
            let found = chain.get(i).map(String::as_str);
            if expected != found {
                // The diverging pointer belongs to the previous step in the
                // walk (i is never 0: the walk starts at the entry slug).
                let at = chain.get(i.saturating_sub(1)).cloned().unwrap_or_default();
                return Err(CatalogError::ChainDiverged {
                    slug: at,
                    expected: expected.map(str::to_string),
                    found: found.map(str::to_string),
                });
            }
        }

        Ok(())
    }
}
