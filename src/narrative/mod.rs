//! Narrative summary from an external generative-text service.
//!
//! The pipeline only depends on the [`NarrativeService`] trait. Whatever the
//! service does wrong (no key, timeout, quota, garbage body) is absorbed by
//! [`resolve_narrative`], which substitutes [`FALLBACK_NARRATIVE`] verbatim.
//! A run never fails because of the narrative.

use serde::Serialize;
use thiserror::Error;

use crate::domain::Anomaly;
use crate::report::format_anomaly_table;

pub mod gemini;

pub use gemini::{GeminiNarrator, NarrativeConfig};

/// Text used in place of the generated narrative when the service is
/// unavailable or fails.
pub const FALLBACK_NARRATIVE: &str = "\
Executive Summary:
The automated narrative service was unavailable for this run, so this summary \
was produced without it. The statistical results below are complete: every day \
listed in the anomaly table deviates from the mean daily revenue by more than \
the configured number of standard deviations.

Statistical Anomaly Analysis:
Days flagged with a large positive z-score indicate revenue far above the normal \
daily level, which usually points to bulk orders, duplicated invoices, or data \
entry errors. Large negative z-scores indicate unusually weak days.

Actionable Steps:
1. Audit the invoice records for each flagged date to confirm whether the revenue is legitimate.
2. Add an automated alert for daily totals outside the normal range so transactions can be validated as they happen.";

/// Failure modes of a narrative service call.
#[derive(Debug, Error)]
pub enum NarrativeServiceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response contained no text")]
    Empty,
}

/// An external collaborator producing prose about the detected anomalies.
pub trait NarrativeService {
    /// Short description of the backing service, shown in the report.
    fn label(&self) -> String;

    /// Produce a narrative for the given plain-text anomaly table.
    fn generate(&self, anomaly_table: &str) -> Result<String, NarrativeServiceError>;
}

/// Where the narrative text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NarrativeSource {
    Service { label: String },
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Narrative {
    pub text: String,
    pub source: NarrativeSource,
}

impl Narrative {
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            text: FALLBACK_NARRATIVE.to_string(),
            source: NarrativeSource::Fallback {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, NarrativeSource::Fallback { .. })
    }
}

/// Ask `service` for a narrative, substituting the fallback on any failure.
pub fn resolve_narrative(service: Option<&dyn NarrativeService>, anomalies: &[Anomaly]) -> Narrative {
    let Some(service) = service else {
        tracing::warn!("no narrative service configured; using fallback narrative");
        return Narrative::fallback("narrative service not configured");
    };

    let table = format_anomaly_table(anomalies);
    let label = service.label();
    tracing::info!(service = %label, anomalies = anomalies.len(), "requesting narrative");

    match service.generate(&table) {
        Ok(text) if !text.trim().is_empty() => Narrative {
            text,
            source: NarrativeSource::Service { label },
        },
        Ok(_) => {
            let err = NarrativeServiceError::Empty;
            tracing::warn!(service = %label, error = %err, "narrative service failed; using fallback narrative");
            Narrative::fallback(err.to_string())
        }
        Err(err) => {
            tracing::warn!(service = %label, error = %err, "narrative service failed; using fallback narrative");
            Narrative::fallback(err.to_string())
        }
    }
}
