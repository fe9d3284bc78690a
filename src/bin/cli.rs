// Scout CLI - batch path for the candidate deduplication engine
//
// Usage: scout <command> [options]

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use tracing::Level;

use scout::config::validate_threshold;
use scout::{
    format_history_for_prompt, get_config_dir, parse_generation_output, read_settings,
    run_selection, write_settings, FileHistoryStore, History, HistoryStore, SaveMode,
    ScoutSettings, SelectionConfig, Verdict,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Helper to safely serialize JSON for output. Returns error JSON if serialization fails.
fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"JSON serialization failed: {}\"}}", e))
}

#[derive(Parser)]
#[command(
    name = "scout",
    version = VERSION,
    about = "Product scout CLI - filter generated candidates against past runs",
    long_about = None
)]
struct Cli {
    /// Output as JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select novel candidates from a generator response and record them
    Select {
        /// Generator output file (JSON), or '-' for stdin
        input: PathBuf,
        /// Override the configured similarity threshold
        #[arg(short, long)]
        threshold: Option<f64>,
        /// Override the configured quota
        #[arg(short, long)]
        quota: Option<usize>,
        /// Don't write the updated history
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect and manage the accepted-name history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show how many candidates to request from the generator
    Plan,
}

// ============================================================================
// History Commands
// ============================================================================

#[derive(Subcommand)]
enum HistoryAction {
    /// List history entries, newest last
    Show {
        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Print the exclusion hint for the generator prompt
    Hint,
    /// Remove all history entries
    Clear,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays clean
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Select {
            input,
            threshold,
            quota,
            dry_run,
        } => handle_select(input, threshold, quota, dry_run, cli.json),
        Commands::History { action } => handle_history(action, cli.json),
        Commands::Config { action } => handle_config(action, cli.json),
        Commands::Plan => handle_plan(cli.json),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn open_store(settings: &ScoutSettings) -> Result<FileHistoryStore, String> {
    Ok(FileHistoryStore::new(
        settings.history_path()?,
        settings.history_cap,
    ))
}

fn read_input(input: &Path) -> Result<String, String> {
    if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(buf);
    }
    std::fs::read_to_string(input)
        .map_err(|e| format!("Failed to read {}: {}", input.display(), e))
}

// ============================================================================
// Select Handler
// ============================================================================

fn handle_select(
    input: PathBuf,
    threshold: Option<f64>,
    quota: Option<usize>,
    dry_run: bool,
    json: bool,
) -> Result<(), String> {
    let settings = read_settings()?;
    let mut config = SelectionConfig::from(&settings);
    if let Some(threshold) = threshold {
        validate_threshold(threshold)?;
        config.threshold = threshold;
    }
    if let Some(quota) = quota {
        if quota == 0 {
            return Err("quota must be at least 1".to_string());
        }
        config.quota = quota;
    }

    let batch = parse_generation_output(&read_input(&input)?)?;
    let store = open_store(&settings)?;
    let mode = if dry_run { SaveMode::DryRun } else { SaveMode::Persist };

    let result = run_selection(&store, &batch.products, &config, mode).map_err(|e| e.to_string())?;

    if json {
        println!(
            "{}",
            to_json(&serde_json::json!({
                "summary": batch.summary,
                "products": result.accepted,
                "rejected": result.rejected,
                "history_len": result.history_len,
                "saved": result.saved,
            }))
        );
        return Ok(());
    }

    if result.accepted.is_empty() {
        println!("{}", "No novel candidates in this batch.".yellow());
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["#", "Name", "Match", "Price", "Link"]);

        for (i, candidate) in result.accepted.iter().enumerate() {
            table.add_row(vec![
                (i + 1).to_string(),
                candidate.name.clone(),
                candidate.match_score.to_string(),
                candidate.price.clone().unwrap_or_else(|| "-".to_string()),
                candidate.url.clone().unwrap_or_default(),
            ]);
        }
        println!("{table}");
    }

    for rejection in &result.rejected {
        let reason = match &rejection.verdict {
            Verdict::Malformed => "blank name".to_string(),
            Verdict::ExactDuplicate { entry } => format!("already seen as '{}'", entry),
            Verdict::FuzzyDuplicate { entry, score } => {
                format!("similar to '{}' ({:.0}%)", entry, score * 100.0)
            }
            Verdict::Novel => continue,
        };
        println!("  {} '{}' {}", "✗".red(), rejection.name, reason.dimmed());
    }

    println!(
        "\n{} of {} candidates accepted (threshold {:.2}, quota {})",
        result.accepted.len(),
        batch.products.len(),
        config.threshold,
        config.quota
    );
    if result.saved {
        println!("{} History saved ({} entries)", "✓".green(), result.history_len);
    } else if dry_run {
        println!("{}", "Dry run: history not written".dimmed());
    }

    Ok(())
}

// ============================================================================
// History Handlers
// ============================================================================

fn handle_history(action: HistoryAction, json: bool) -> Result<(), String> {
    let settings = read_settings()?;
    let store = open_store(&settings)?;

    match action {
        HistoryAction::Show { limit } => {
            let history = store.load();
            let entries = history.recent(limit.unwrap_or(history.len()));

            if json {
                println!(
                    "{}",
                    to_json(&serde_json::json!({
                        "path": store.path().display().to_string(),
                        "total": history.len(),
                        "cap": history.cap(),
                        "entries": entries,
                    }))
                );
            } else if entries.is_empty() {
                println!("{}", "History is empty.".yellow());
            } else {
                for entry in &entries {
                    println!("  {}", entry);
                }
                println!("\n{} of {} entries (cap {})", entries.len(), history.len(), history.cap());
            }
        }

        HistoryAction::Hint => {
            let hint = format_history_for_prompt(&store.load(), settings.prompt_history_limit);
            if json {
                println!("{}", serde_json::json!({ "hint": hint }));
            } else if hint.is_empty() {
                println!("{}", "History is empty, no exclusion hint.".yellow());
            } else {
                println!("{}", hint);
            }
        }

        HistoryAction::Clear => {
            store
                .save(&History::with_cap(settings.history_cap))
                .map_err(|e| e.to_string())?;

            if json {
                println!("{}", serde_json::json!({ "status": "cleared" }));
            } else {
                println!("{} History cleared", "✓".green());
            }
        }
    }

    Ok(())
}

// ============================================================================
// Config Handlers
// ============================================================================

fn handle_config(action: ConfigAction, json: bool) -> Result<(), String> {
    match action {
        ConfigAction::Show => {
            let settings = read_settings()?;
            let config_dir = get_config_dir()?;
            let history_path = settings.history_path()?;

            if json {
                println!(
                    "{}",
                    to_json(&serde_json::json!({
                        "config_dir": config_dir.display().to_string(),
                        "history_path": history_path.display().to_string(),
                        "settings": settings,
                    }))
                );
            } else {
                println!("{}", "Configuration".bold());
                println!();
                println!(
                    "  Config directory: {}",
                    config_dir.display().to_string().dimmed()
                );
                println!(
                    "  History file: {}",
                    history_path.display().to_string().dimmed()
                );
                println!();
                println!("{}", "Selection Settings".bold());
                println!();
                println!(
                    "  Similarity threshold: {}",
                    settings.similarity_threshold.to_string().cyan()
                );
                println!("  Quota: {}", settings.quota);
                println!("  Over-generation factor: {}", settings.over_generation_factor);
                println!("  History cap: {}", settings.history_cap);
                println!("  Prompt history limit: {}", settings.prompt_history_limit);
                println!("  Search base URL: {}", settings.search_base_url);
                println!("  Trusted URL prefix: {}", settings.trusted_url_prefix);
                println!(
                    "  Reserved path segments: {}",
                    settings.reserved_path_segments.join(", ")
                );
            }
        }

        ConfigAction::Set { key, value } => {
            let mut settings = read_settings()?;

            match key.as_str() {
                "threshold" | "similarity_threshold" => {
                    settings.similarity_threshold = value
                        .parse()
                        .map_err(|_| "Invalid number for similarity_threshold")?;
                }
                "quota" => {
                    settings.quota = value.parse().map_err(|_| "Invalid number for quota")?;
                }
                "factor" | "over_generation_factor" => {
                    settings.over_generation_factor = value
                        .parse()
                        .map_err(|_| "Invalid number for over_generation_factor")?;
                }
                "history_cap" => {
                    settings.history_cap = value
                        .parse()
                        .map_err(|_| "Invalid number for history_cap")?;
                }
                "prompt_history_limit" => {
                    settings.prompt_history_limit = value
                        .parse()
                        .map_err(|_| "Invalid number for prompt_history_limit")?;
                }
                "history_file" => settings.history_file = Some(PathBuf::from(&value)),
                "search_base_url" => settings.search_base_url = value.clone(),
                "trusted_url_prefix" => settings.trusted_url_prefix = value.clone(),
                "reserved_path_segments" => {
                    settings.reserved_path_segments = value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
                _ => return Err(format!("Unknown config key: {}", key)),
            }

            write_settings(&settings)?;

            if json {
                println!("{}", serde_json::json!({ "updated": key, "value": value }));
            } else {
                println!("{} Set {} = {}", "✓".green(), key, value);
            }
        }
    }

    Ok(())
}

fn handle_plan(json: bool) -> Result<(), String> {
    let settings = read_settings()?;
    let requested = settings.requested_count();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "requested": requested,
                "quota": settings.quota,
                "over_generation_factor": settings.over_generation_factor,
            })
        );
    } else {
        println!(
            "Request {} candidates to select {} (factor {})",
            requested.to_string().cyan(),
            settings.quota,
            settings.over_generation_factor
        );
    }

    Ok(())
}
