use crate::models::{CaseEvidence, SearchMode, TriggerDecision};
use crate::signals::{extract_case_reference, extract_years, reference_is_covered};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerConfig {
    pub low_confidence_threshold: f64,
    pub sparse_below: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.5,
            sparse_below: 2,
        }
    }
}

/// Evidence and query signals the decision was made from.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSignals {
    pub avg_score: f64,
    pub evidence_count: usize,
    pub requested_year: Option<i32>,
    pub latest_evidence_year: i32,
    pub case_reference: Option<String>,
}

impl TriggerSignals {
    pub fn collect(query_text: &str, evidence: &[CaseEvidence]) -> Self {
        let avg_score = if evidence.is_empty() {
            0.0
        } else {
            evidence.iter().map(|item| item.relevance_score).sum::<f64>() / evidence.len() as f64
        };

        Self {
            avg_score,
            evidence_count: evidence.len(),
            requested_year: extract_years(query_text).into_iter().max(),
            latest_evidence_year: evidence.iter().map(|item| item.year).max().unwrap_or(0),
            case_reference: extract_case_reference(query_text),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerEvaluator {
    config: TriggerConfig,
}

impl TriggerEvaluator {
    pub fn new(config: TriggerConfig) -> Self {
        Self { config }
    }

    /// `CorpusOnly` never triggers and records no reasons.
    pub fn evaluate(
        &self,
        mode: SearchMode,
        query_text: &str,
        evidence: &[CaseEvidence],
    ) -> TriggerDecision {
        if mode == SearchMode::CorpusOnly {
            return TriggerDecision::skipped();
        }

        let signals = TriggerSignals::collect(query_text, evidence);
        self.decide(&signals, evidence)
    }

    /// Every true predicate adds a reason; none short-circuits the others.
    pub fn decide(&self, signals: &TriggerSignals, evidence: &[CaseEvidence]) -> TriggerDecision {
        let mut reasons = Vec::new();

        if signals.avg_score < self.config.low_confidence_threshold {
            reasons.push(format!(
                "Low confidence: average relevance {:.2} is below {:.2}",
                signals.avg_score, self.config.low_confidence_threshold
            ));
        }

        if signals.evidence_count < self.config.sparse_below {
            reasons.push(format!(
                "Sparse results: only {} case(s) retrieved from the corpus",
                signals.evidence_count
            ));
        }

        if let Some(requested) = signals.requested_year {
            if requested > signals.latest_evidence_year {
                reasons.push(format!(
                    "Recency gap: query references {} but the newest retrieved case is from {}",
                    requested, signals.latest_evidence_year
                ));
            }
        }

        if let Some(reference) = &signals.case_reference {
            if !reference_is_covered(reference, evidence) {
                reasons.push(format!(
                    "Missing reference: '{reference}' is not among the retrieved cases"
                ));
            }
        }

        TriggerDecision {
            triggered: !reasons.is_empty(),
            reasons,
        }
    }
}
