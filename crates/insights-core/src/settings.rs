use clap::Parser;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::{InsightsError, Result};
use crate::time_utils::{parse_date, DateRange};

/// Metrics the change explainer accepts.
pub const EXPLAIN_METRICS: [&str; 3] = ["total_watch_minutes", "active_users", "titles_watched"];

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Viewing-history analytics with AI-generated summaries
#[derive(Parser, Debug, Clone)]
#[command(
    name = "watch-insights",
    about = "Viewing-history analytics with AI-generated summaries",
    version
)]
pub struct Settings {
    /// Directory holding the catalog and watch-history CSV files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Catalog file name (relative to the data directory)
    #[arg(long, default_value = "movies.csv")]
    pub content_file: String,

    /// Watch-history file name (relative to the data directory)
    #[arg(long, default_value = "watch_history.csv")]
    pub events_file: String,

    /// First day of the selected period (YYYY-MM-DD, defaults to the earliest watch date)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Last day of the selected period (YYYY-MM-DD, defaults to the latest watch date)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Genre filter ("All" disables it)
    #[arg(long, default_value = "All")]
    pub genre: String,

    /// Entries kept per top-N breakdown
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u16).range(1..=50))]
    pub top_n: u16,

    /// What to produce
    #[arg(long, default_value = "dashboard", value_parser = ["dashboard", "evidence", "summary", "explain", "insights"])]
    pub view: String,

    /// Metric the change explanation focuses on
    #[arg(long, default_value = "total_watch_minutes", value_parser = EXPLAIN_METRICS)]
    pub metric: String,

    /// Preferred language model
    #[arg(long, default_value = "gpt-5.2")]
    pub model: String,

    /// Models tried in order when the preferred one fails
    #[arg(long, value_delimiter = ',', default_value = "gpt-5.2-mini,gpt-4o-mini")]
    pub fallback_models: Vec<String>,

    /// API key for the chat-completions endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Project identifier sent with every request
    #[arg(long, env = "OPENAI_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Base URL of the chat-completions API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub api_base: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    pub timeout_secs: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but over an explicit argument list.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Self {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The preferred model followed by the fallbacks, as given on the
    /// command line.
    pub fn model_candidates(&self) -> Vec<String> {
        std::iter::once(&self.model)
            .chain(self.fallback_models.iter())
            .cloned()
            .collect()
    }

    /// Resolve the selected period against the dataset `span`.
    ///
    /// Unset bounds fall back to the span's. Fails when a bound does not
    /// parse, when no span exists to default from, or when start > end.
    pub fn date_range(&self, span: Option<(NaiveDate, NaiveDate)>) -> Result<DateRange> {
        let start = match &self.start_date {
            Some(s) => parse_date(s)?,
            None => span.map(|(lo, _)| lo).ok_or_else(|| {
                InsightsError::Config("--start-date is required for an empty dataset".to_string())
            })?,
        };
        let end = match &self.end_date {
            Some(s) => parse_date(s)?,
            None => span.map(|(_, hi)| hi).ok_or_else(|| {
                InsightsError::Config("--end-date is required for an empty dataset".to_string())
            })?,
        };
        DateRange::new(start, end)
    }

    /// The data directory, or an error when none was given or discovered.
    pub fn require_data_dir(&self) -> Result<&PathBuf> {
        self.data_dir.as_ref().ok_or_else(|| {
            InsightsError::Config(
                "no data directory found; pass --data-dir or create ./datasets".to_string(),
            )
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
