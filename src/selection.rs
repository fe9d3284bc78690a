//! Selection pipeline.
//!
//! Takes an over-generated candidate batch and produces the accepted subset
//! plus the history that should be persisted for the next run:
//! filter, sanitize links, cap to quota, merge accepted names.
//!
//! The pipeline does no I/O and borrows its inputs, so identical inputs and
//! an identical history snapshot always give identical output.

use tracing::info;

use crate::candidate::CandidateRecord;
use crate::config::ScoutSettings;
use crate::dedup::{filter_duplicates, Rejection};
use crate::history::History;
use crate::links::LinkPolicy;

/// Per-run selection parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub threshold: f64,
    pub quota: usize,
    pub link_policy: LinkPolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        ScoutSettings::default().into()
    }
}

impl From<&ScoutSettings> for SelectionConfig {
    fn from(settings: &ScoutSettings) -> Self {
        Self {
            threshold: settings.similarity_threshold,
            quota: settings.quota,
            link_policy: settings.link_policy(),
        }
    }
}

impl From<ScoutSettings> for SelectionConfig {
    fn from(settings: ScoutSettings) -> Self {
        Self::from(&settings)
    }
}

#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    /// Accepted candidates, sanitized, in generation order
    pub accepted: Vec<CandidateRecord>,
    /// History including the accepted names
    pub history: History,
    pub rejected: Vec<Rejection>,
    /// Candidates that passed the filter, before the quota cap
    pub survivors: usize,
}

/// Run filter -> sanitize -> cap -> merge over a raw batch
pub fn select(raw: &[CandidateRecord], history: &History, config: &SelectionConfig) -> SelectionOutcome {
    let filtered = filter_duplicates(raw, history, config.threshold);
    let survivors = filtered.novel.len();

    let accepted: Vec<CandidateRecord> = filtered
        .novel
        .iter()
        .map(|candidate| config.link_policy.sanitize(candidate))
        .take(config.quota)
        .collect();

    let history = if accepted.is_empty() {
        history.clone()
    } else {
        history.merge(accepted.iter().map(|c| c.name.as_str()))
    };

    info!(
        "Selection: {} generated, {} after filtering, {} accepted (quota: {})",
        raw.len(),
        survivors,
        accepted.len(),
        config.quota
    );

    SelectionOutcome {
        accepted,
        history,
        rejected: filtered.rejected,
        survivors,
    }
}
