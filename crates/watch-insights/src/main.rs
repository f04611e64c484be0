mod bootstrap;
mod report;

use std::time::Duration;

use anyhow::Result;
use insights_core::settings::Settings;
use insights_data::evidence::build_evidence;
use insights_runtime::openai::OpenAiBackend;
use insights_runtime::session::DashboardSession;
use insights_runtime::summarizer::{ModelChain, Summarizer};

/// Summarizer for the configured endpoint and model candidates.
fn build_summarizer(settings: &Settings) -> Result<Summarizer<OpenAiBackend>> {
    let api_key = settings.api_key.clone().ok_or_else(|| {
        anyhow::anyhow!("no API key configured; set OPENAI_API_KEY or pass --api-key")
    })?;
    let backend = OpenAiBackend::new(
        &settings.api_base,
        api_key,
        settings.project_id.clone(),
        Duration::from_secs(settings.timeout_secs),
    )?;
    Ok(Summarizer::new(
        backend,
        ModelChain::from(settings.model_candidates()),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Watch Insights v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.data_dir.is_none() {
        settings.data_dir = bootstrap::discover_data_dir();
    }

    let session = DashboardSession::load_from_settings(&settings)?;
    let filters = session.filters(&settings)?;
    let filtered = session.select(&filters);
    let packet = build_evidence(session.table(), &filtered, &filters);
    let top_n = usize::from(settings.top_n);

    tracing::info!(
        "View: {}, period: {} .. {}, genre: {}, rows: {}",
        settings.view,
        filters.range.start(),
        filters.range.end(),
        filters.genre,
        filtered.len()
    );

    match settings.view.as_str() {
        "dashboard" => {
            println!("{}", report::render_dashboard(&filtered, &packet, top_n));
        }

        "evidence" => {
            println!("{}", serde_json::to_string_pretty(&packet)?);
        }

        view @ ("summary" | "explain" | "insights") => {
            if view == "insights" {
                println!("{}", report::render_dashboard(&filtered, &packet, top_n));
            }

            let summarizer = match build_summarizer(&settings) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("Summarizer unavailable: {e}");
                    eprintln!("AI insights unavailable: {e}");
                    return Ok(());
                }
            };
            tracing::info!("Model candidates: {:?}", summarizer.chain().models());

            let want_summary = view != "explain";
            let want_explain = view != "summary";
            let metric = settings.metric.as_str();

            // Both requests only read the packet, so they can run side by side.
            let (summary, explanation) = tokio::join!(
                async {
                    if want_summary {
                        Some(summarizer.summarize_dashboard(&packet).await)
                    } else {
                        None
                    }
                },
                async {
                    if want_explain {
                        Some(summarizer.explain_change(&packet, metric).await)
                    } else {
                        None
                    }
                },
            );

            match summary {
                Some(Ok(insight)) => println!("{}", report::render_summary(&insight)),
                Some(Err(e)) => {
                    tracing::error!("Dashboard summary failed: {e}");
                    eprintln!("AI summary failed: {e}");
                }
                None => {}
            }
            match explanation {
                Some(Ok(insight)) => println!("{}", report::render_explanation(&insight, metric)),
                Some(Err(e)) => {
                    tracing::error!("Change explanation failed: {e}");
                    eprintln!("AI explanation failed: {e}");
                }
                None => {}
            }
        }

        unknown => {
            eprintln!("Unknown view: {}", unknown);
        }
    }

    Ok(())
}
