use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directory name looked up next to the working directory and under
/// `~/.watch-insights/`.
const DATASETS_DIR: &str = "datasets";

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a level name such as `WARNING` or `CRITICAL` to a tracing filter
/// directive.
///
/// Unknown strings are passed through so `EnvFilter` syntax such as
/// `insights_data=debug` keeps working.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to `log_file` (appended, created with its parent directory
/// if needed) when given, otherwise to stderr. Falls back to `info` if the
/// level string is not a valid filter.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let stderr_layer = log_file.is_none().then(|| {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}

// ── Data-dir discovery ─────────────────────────────────────────────────────────

/// Locate the directory holding the CSV datasets.
///
/// Checks `./datasets` then `~/.watch-insights/datasets` and returns the
/// first that exists.
pub fn discover_data_dir() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    discover_data_dir_in(cwd.as_deref(), dirs::home_dir().as_deref())
}

fn discover_data_dir_in(cwd: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    let candidates = [
        cwd.map(|d| d.join(DATASETS_DIR)),
        home.map(|h| h.join(".watch-insights").join(DATASETS_DIR)),
    ];
    candidates.into_iter().flatten().find(|p| p.is_dir())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── level_directive ───────────────────────────────────────────────────────

    #[test]
    fn test_level_directive_maps_level_names() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("insights_data=trace"), "insights_data=trace");
    }

    // ── discover_data_dir ─────────────────────────────────────────────────────

    #[test]
    fn test_discover_prefers_working_directory() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        let local = cwd.path().join("datasets");
        std::fs::create_dir_all(&local).unwrap();
        std::fs::create_dir_all(home.path().join(".watch-insights").join("datasets")).unwrap();

        assert_eq!(
            discover_data_dir_in(Some(cwd.path()), Some(home.path())),
            Some(local)
        );
    }

    #[test]
    fn test_discover_falls_back_to_home() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        let shared = home.path().join(".watch-insights").join("datasets");
        std::fs::create_dir_all(&shared).unwrap();

        assert_eq!(
            discover_data_dir_in(Some(cwd.path()), Some(home.path())),
            Some(shared)
        );
    }

    #[test]
    fn test_discover_returns_none_when_absent() {
        let cwd = TempDir::new().expect("tempdir");
        assert_eq!(discover_data_dir_in(Some(cwd.path()), None), None);
        assert_eq!(discover_data_dir_in(None, None), None);
    }

    #[test]
    fn test_discover_ignores_plain_files() {
        let cwd = TempDir::new().expect("tempdir");
        std::fs::write(cwd.path().join("datasets"), "not a dir").unwrap();
        assert_eq!(discover_data_dir_in(Some(cwd.path()), None), None);
    }
}
