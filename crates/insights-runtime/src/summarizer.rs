//! Language-model summaries grounded in an evidence packet.
//!
//! The summarizer sends the packet to a chat-completions backend, walking
//! an ordered [`ModelChain`] until one model answers, and recovers the
//! reply into a fixed JSON shape. Replies that are not valid JSON are kept
//! as a single bullet under a generic headline rather than dropped.

use std::sync::OnceLock;

use async_trait::async_trait;
use insights_core::error::{InsightsError, Result};
use insights_core::settings::EXPLAIN_METRICS;
use insights_data::evidence::EvidencePacket;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

/// Sampling temperature used for every summary request.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

// ── Chat types ────────────────────────────────────────────────────────────────

/// One message of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A chat-completions endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `messages` to `model` and return the text of the first choice.
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String>;
}

// ── ModelChain ────────────────────────────────────────────────────────────────

/// Ordered, duplicate-free list of model identifiers to try.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelChain {
    models: Vec<String>,
}

impl ModelChain {
    /// `preferred` followed by `fallbacks`. Blank identifiers are skipped
    /// and repeats keep their first position.
    pub fn new<I, S>(preferred: &str, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chain = Self::default();
        chain.push(preferred);
        for model in fallbacks {
            chain.push(model.as_ref());
        }
        chain
    }

    fn push(&mut self, model: &str) {
        let model = model.trim();
        if !model.is_empty() && !self.models.iter().any(|m| m == model) {
            self.models.push(model.to_string());
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }
}

impl From<Vec<String>> for ModelChain {
    fn from(candidates: Vec<String>) -> Self {
        let mut chain = Self::default();
        for model in &candidates {
            chain.push(model);
        }
        chain
    }
}

/// Try each model of `chain` in order and return the first reply together
/// with the model that produced it.
///
/// Fails with the last error when every model fails, or with
/// [`InsightsError::NoModelsConfigured`] when the chain is empty.
pub async fn call_with_fallback(
    backend: &dyn ChatBackend,
    chain: &ModelChain,
    messages: &[ChatMessage],
    temperature: f32,
) -> Result<(String, String)> {
    let mut last_err = None;

    for (attempt, model) in chain.models().iter().enumerate() {
        match backend.complete(model, messages, temperature).await {
            Ok(text) => {
                debug!(attempt, model = %model, "model call succeeded");
                return Ok((text, model.clone()));
            }
            Err(e) => {
                warn!(attempt, model = %model, error = %e, "model call failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(InsightsError::NoModelsConfigured))
}

// ── Response shapes ───────────────────────────────────────────────────────────

/// A structured reply body with a fallback for unparseable text.
pub trait InsightBody: DeserializeOwned + Serialize {
    /// Wrap raw model output that did not parse.
    fn fallback(raw: String) -> Self;
}

/// Executive summary of the current dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSummary {
    pub headline: String,
    pub summary_bullets: Vec<String>,
    pub key_changes: Vec<String>,
    pub next_checks: Vec<String>,
}

impl InsightBody for DashboardSummary {
    fn fallback(raw: String) -> Self {
        Self {
            headline: "AI Summary".to_string(),
            summary_bullets: vec![raw],
            ..Default::default()
        }
    }
}

/// Explanation of why one metric moved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeExplanation {
    pub headline: String,
    pub what_changed: Vec<String>,
    pub likely_drivers: Vec<String>,
    pub next_checks: Vec<String>,
}

impl InsightBody for ChangeExplanation {
    fn fallback(raw: String) -> Self {
        Self {
            headline: "AI Explanation".to_string(),
            what_changed: vec![raw],
            ..Default::default()
        }
    }
}

/// A reply body annotated with the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight<T> {
    #[serde(flatten)]
    pub body: T,
    #[serde(rename = "_model_used")]
    pub model_used: String,
}

// ── Summarizer ────────────────────────────────────────────────────────────────

/// Evidence-grounded summaries over a [`ChatBackend`].
pub struct Summarizer<B> {
    backend: B,
    chain: ModelChain,
    temperature: f32,
}

impl<B: ChatBackend> Summarizer<B> {
    pub fn new(backend: B, chain: ModelChain) -> Self {
        Self {
            backend,
            chain,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn chain(&self) -> &ModelChain {
        &self.chain
    }

    /// Headline, summary bullets, key changes and next checks for the
    /// whole dashboard.
    pub async fn summarize_dashboard(
        &self,
        evidence: &EvidencePacket,
    ) -> Result<Insight<DashboardSummary>> {
        let system = "You are an analytics assistant. Summarize the dashboard using ONLY the \
                      provided evidence. Be specific with numbers (percent changes, totals, top \
                      titles). Return JSON only with keys: headline, summary_bullets, \
                      key_changes, next_checks.";
        let payload = json!({
            "evidence": evidence,
            "rules": [
                "Do not invent numbers. Use only provided evidence.",
                "summary_bullets: 3-5 bullets",
                "key_changes: 2-4 bullets (use % changes if available)",
                "next_checks: 2-4 bullets phrased as analytics breakdowns (by device/country/title), avoid generic marketing advice",
            ],
            "output_format": {
                "headline": "string",
                "summary_bullets": ["..."],
                "key_changes": ["..."],
                "next_checks": ["..."],
            },
        });

        info!("Requesting dashboard summary");
        self.request(system, &payload).await
    }

    /// Facts, likely drivers and next checks explaining the movement of
    /// `metric`, one of [`EXPLAIN_METRICS`].
    pub async fn explain_change(
        &self,
        evidence: &EvidencePacket,
        metric: &str,
    ) -> Result<Insight<ChangeExplanation>> {
        if !EXPLAIN_METRICS.contains(&metric) {
            return Err(InsightsError::Config(format!(
                "cannot explain metric {metric:?}; expected one of {}",
                EXPLAIN_METRICS.join(", ")
            )));
        }

        let system = "You are an analytics assistant. Explain WHY the selected metric changed \
                      using ONLY the evidence. Separate facts from hypotheses. Avoid unsupported \
                      causality. Return JSON only with keys: headline, what_changed, \
                      likely_drivers, next_checks.";
        let payload = json!({
            "metric_to_explain": metric,
            "evidence": evidence,
            "rules": [
                "Do not invent numbers. Use only provided evidence.",
                "what_changed: facts with numbers (2-4 bullets).",
                "likely_drivers: grounded drivers referencing device/country/title (3-6 bullets).",
                "If you must speculate, label it as 'Hypothesis:' and keep it minimal.",
                "next_checks: 2-4 bullets phrased as analytics breakdowns (segment/compare), not generic advice.",
            ],
            "output_format": {
                "headline": "string",
                "what_changed": ["..."],
                "likely_drivers": ["..."],
                "next_checks": ["..."],
            },
        });

        info!(metric, "Requesting change explanation");
        self.request(system, &payload).await
    }

    async fn request<T: InsightBody>(
        &self,
        system: &str,
        payload: &serde_json::Value,
    ) -> Result<Insight<T>> {
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(serde_json::to_string(payload)?),
        ];
        let (text, model_used) =
            call_with_fallback(&self.backend, &self.chain, &messages, self.temperature).await?;

        Ok(Insight {
            body: parse_reply(&text),
            model_used,
        })
    }
}

// ── Reply recovery ────────────────────────────────────────────────────────────

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?\s*```\s*$")
            .expect("regex is valid")
    })
}

/// Strip a markdown code fence wrapping the whole reply, if any.
fn strip_code_fence(text: &str) -> &str {
    fence_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str())
}

/// Deserialize `text` into `T`, falling back to [`InsightBody::fallback`].
pub fn parse_reply<T: InsightBody>(text: &str) -> T {
    match serde_json::from_str(strip_code_fence(text).trim()) {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "model reply is not the expected JSON; using fallback");
            T::fallback(text.to_string())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
