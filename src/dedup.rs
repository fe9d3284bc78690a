// Deduplication module for product candidates
//
// Uses string similarity to detect and filter candidates that repeat
// names already accepted in earlier runs.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::candidate::CandidateRecord;
use crate::history::History;
use crate::similarity::{normalize, score_if_at_least};

/// Outcome of checking one candidate against the history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Novel,
    /// Empty or whitespace-only name
    Malformed,
    ExactDuplicate { entry: String },
    FuzzyDuplicate { entry: String, score: f64 },
}

impl Verdict {
    pub fn is_novel(&self) -> bool {
        matches!(self, Verdict::Novel)
    }
}

/// A candidate dropped by the filter, with the reason
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub name: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub novel: Vec<CandidateRecord>,
    pub rejected: Vec<Rejection>,
}

impl FilterOutcome {
    pub fn malformed_count(&self) -> usize {
        self.rejected
            .iter()
            .filter(|r| r.verdict == Verdict::Malformed)
            .count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.rejected.len() - self.malformed_count()
    }
}

/// Classify a single candidate against the full history
pub fn classify(candidate: &CandidateRecord, history: &History, threshold: f64) -> Verdict {
    let name = normalize(&candidate.name);
    if name.is_empty() {
        return Verdict::Malformed;
    }

    if history.contains(&name) {
        return Verdict::ExactDuplicate { entry: name };
    }

    history
        .iter()
        .find_map(|entry| {
            score_if_at_least(&name, entry, threshold).map(|score| Verdict::FuzzyDuplicate {
                entry: entry.to_string(),
                score,
            })
        })
        .unwrap_or(Verdict::Novel)
}

/// Check if a candidate repeats any history entry
pub fn is_duplicate(candidate: &CandidateRecord, history: &History, threshold: f64) -> bool {
    matches!(
        classify(candidate, history, threshold),
        Verdict::ExactDuplicate { .. } | Verdict::FuzzyDuplicate { .. }
    )
}

/// Filter out duplicate and malformed candidates.
/// Survivors keep their original generation order.
pub fn filter_duplicates(
    candidates: &[CandidateRecord],
    history: &History,
    threshold: f64,
) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    for candidate in candidates {
        match classify(candidate, history, threshold) {
            Verdict::Novel => outcome.novel.push(candidate.clone()),
            verdict => {
                match &verdict {
                    Verdict::ExactDuplicate { entry } => info!(
                        "Duplicate detected: '{}' already in history as '{}'",
                        candidate.name, entry
                    ),
                    Verdict::FuzzyDuplicate { entry, score } => info!(
                        "Duplicate detected: '{}' similar to '{}' (similarity: {:.2})",
                        candidate.name, entry, score
                    ),
                    _ => debug!("Dropping candidate with blank name"),
                }
                outcome.rejected.push(Rejection {
                    name: candidate.name.clone(),
                    verdict,
                });
            }
        }
    }

    let malformed = outcome.malformed_count();
    if malformed > 0 {
        warn!("Dropped {} malformed candidate(s) with blank names", malformed);
    }

    let removed = outcome.duplicate_count();
    if removed > 0 {
        info!(
            "Deduplication: removed {} duplicate candidates (threshold: {:.2})",
            removed, threshold
        );
    }

    outcome
}
