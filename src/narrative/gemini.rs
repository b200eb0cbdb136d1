//! Gemini `generateContent` client.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use super::{NarrativeService, NarrativeServiceError};
use crate::error::PipelineError;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest error body we keep from a failed response.
const MAX_ERROR_BODY: usize = 200;

/// Settings for the narrative client, passed in explicitly at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeConfig {
    /// `None` means no service is available and the fallback is used.
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NarrativeConfig {
    /// Read `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_ENDPOINT` and
    /// `GEMINI_TIMEOUT_SECS` from the environment (and `.env`, if present).
    ///
    /// The narrative is optional, so an unusable timeout is logged and the
    /// default kept rather than failing the run.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = Self::default();
        config.api_key = non_empty("GEMINI_API_KEY");
        if let Some(model) = non_empty("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(endpoint) = non_empty("GEMINI_ENDPOINT") {
            config.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(raw) = non_empty("GEMINI_TIMEOUT_SECS") {
            match raw.parse::<u64>().ok().filter(|&s| s > 0) {
                Some(secs) => config.timeout_secs = secs,
                None => tracing::warn!(
                    value = %raw,
                    default = config.timeout_secs,
                    "GEMINI_TIMEOUT_SECS is not a positive integer; using default"
                ),
            }
        }
        config
    }
}

pub struct GeminiNarrator {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout_secs: u64,
}

impl GeminiNarrator {
    /// Build a client, or `None` when no API key is configured.
    pub fn from_config(config: &NarrativeConfig) -> Result<Option<Self>, PipelineError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Some(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            timeout_secs: config.timeout_secs,
        }))
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl NarrativeService for GeminiNarrator {
    fn label(&self) -> String {
        format!("Gemini ({})", self.model)
    }

    fn generate(&self, anomaly_table: &str) -> Result<String, NarrativeServiceError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(anomaly_table) }] }]
        });

        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    NarrativeServiceError::Timeout(self.timeout_secs)
                } else {
                    NarrativeServiceError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(NarrativeServiceError::Status {
                status: status.as_u16(),
                body: truncate(body.trim(), MAX_ERROR_BODY),
            });
        }

        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| NarrativeServiceError::Malformed(e.to_string()))?;

        extract_text(parsed)
    }
}

/// Prompt sent to the model; the anomaly table is embedded verbatim.
pub fn build_prompt(anomaly_table: &str) -> String {
    format!(
        "Act as a Senior Data Analyst. Here is a dataset of detected sales anomalies:\n\
         {anomaly_table}\n\
         \n\
         Task:\n\
         1. Write a short executive summary (max 3-4 sentences).\n\
         2. Explain that these dates show statistically impossible revenue spikes.\n\
         3. Suggest 2 actionable steps.\n"
    )
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

fn extract_text(resp: GenerateResponse) -> Result<String, NarrativeServiceError> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(NarrativeServiceError::Empty);
    }
    Ok(text)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn config_defaults_without_env() {
        let config = NarrativeConfig::from_lookup(lookup(&[]));
        assert_eq!(config, NarrativeConfig::default());
        assert!(GeminiNarrator::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn config_reads_overrides() {
        let config = NarrativeConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", " secret "),
            ("GEMINI_MODEL", "gemini-2.5-flash"),
            ("GEMINI_ENDPOINT", "http://localhost:9/v1beta/"),
            ("GEMINI_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.endpoint, "http://localhost:9/v1beta");
        assert_eq!(config.timeout_secs, 5);

        let narrator = GeminiNarrator::from_config(&config).unwrap().unwrap();
        assert_eq!(narrator.url(), "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent");
    }

    #[test]
    fn unusable_timeout_keeps_default() {
        for raw in ["soon", "0", "-5"] {
            let config = NarrativeConfig::from_lookup(lookup(&[("GEMINI_TIMEOUT_SECS", raw)]));
            assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS, "{raw}");
        }
    }

    #[test]
    fn extracts_concatenated_parts() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(resp).unwrap(), "Hello world");
    }

    #[test]
    fn blocked_response_is_empty() {
        let resp: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(extract_text(resp), Err(NarrativeServiceError::Empty)));
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        let config = NarrativeConfig {
            api_key: Some("k".to_string()),
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..NarrativeConfig::default()
        };
        let narrator = GeminiNarrator::from_config(&config).unwrap().unwrap();
        let err = narrator.generate("table").unwrap_err();
        assert!(matches!(
            err,
            NarrativeServiceError::Transport(_) | NarrativeServiceError::Timeout(_)
        ));
    }

    #[test]
    fn prompt_embeds_table() {
        let prompt = build_prompt("2019-01-15  54731.77  9.17");
        assert!(prompt.contains("2019-01-15  54731.77  9.17"));
        assert!(prompt.starts_with("Act as a Senior Data Analyst."));
    }
}
