//! One selection run against a history store.
//!
//! Loads the history, selects from the raw batch and persists the updated
//! history before anything is handed to delivery, so a later delivery
//! failure never lets the same candidates resurface.

use serde::Serialize;
use tracing::{info, warn};

use crate::candidate::CandidateRecord;
use crate::dedup::Rejection;
use crate::history::{HistoryError, HistoryStore};
use crate::selection::{select, SelectionConfig};

/// Result of a selection run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub accepted: Vec<CandidateRecord>,
    pub rejected: Vec<Rejection>,
    pub history_len: usize,
    /// False when nothing was accepted or saving was skipped
    pub saved: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaveMode {
    #[default]
    Persist,
    DryRun,
}

/// Run selection and persist the history.
/// A save failure is returned; the caller must not report success.
pub fn run_selection<S: HistoryStore + ?Sized>(
    store: &S,
    raw: &[CandidateRecord],
    config: &SelectionConfig,
    mode: SaveMode,
) -> Result<RunResult, HistoryError> {
    let history = store.load();
    let outcome = select(raw, &history, config);

    let saved = if outcome.accepted.is_empty() {
        info!("No candidates accepted, history left as is");
        false
    } else if mode == SaveMode::DryRun {
        info!("Dry run: {} candidate(s) would be added to history", outcome.accepted.len());
        false
    } else {
        store.save(&outcome.history).inspect_err(|e| {
            warn!("History save failed: {}", e);
        })?;
        true
    };

    Ok(RunResult {
        accepted: outcome.accepted,
        rejected: outcome.rejected,
        history_len: outcome.history.len(),
        saved,
    })
}
