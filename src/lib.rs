// Scout Library - candidate deduplication and history engine
//
// Filters freshly generated product candidates against the names accepted
// in earlier runs, sanitizes their links and keeps a bounded history.

pub mod candidate;
pub mod config;
pub mod dedup;
pub mod history;
pub mod links;
pub mod run;
pub mod selection;
pub mod similarity;

// Re-export key types for convenience
pub use candidate::{parse_generation_output, CandidateRecord, GenerationBatch};
pub use config::{
    ensure_config_dir, get_config_dir, read_settings, requested_count, write_settings,
    ScoutSettings,
};
pub use dedup::{classify, filter_duplicates, FilterOutcome, Rejection, Verdict};
pub use history::{
    format_history_for_prompt, FileHistoryStore, History, HistoryError, HistoryStore,
    MemoryHistoryStore,
};
pub use links::LinkPolicy;
pub use run::{run_selection, RunResult, SaveMode};
pub use selection::{select, SelectionConfig, SelectionOutcome};
pub use similarity::similarity;
