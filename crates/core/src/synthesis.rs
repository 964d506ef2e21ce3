use crate::error::BackendError;
use crate::models::{CaseEvidence, CitationUsed, SynthesizedAnswer, WebEvidence};
use crate::traits::{AnswerGenerator, GenerationRequest};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

pub const LEGAL_SYSTEM_PROMPT: &str = "You are a legal research assistant for U.S. case law. \
Answer the question using only the case law and web sources supplied in the context. \
Cite cases by name and reporter citation (for example \"Miranda v. Arizona, 384 U.S. 436 (1966)\") \
whenever you rely on them, and attribute each legal principle to the case it comes from. \
Structure the analysis as issue, rule, application, and conclusion. \
Note the court and jurisdiction, and whether the authority is binding or persuasive. \
If the sources do not answer the question, say so plainly. \
You provide legal information, not legal advice; recommend consulting a licensed attorney for specific matters.";

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

const FACTS_LIMIT: usize = 500;
const REASONING_LIMIT: usize = 800;
const WEB_CONTENT_LIMIT: usize = 500;

pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Case evidence always comes first; the web section is present only when non-empty.
pub fn build_context(cases: &[CaseEvidence], web: &[WebEvidence]) -> String {
    let mut context = String::from("RELEVANT CASE LAW:\n");

    for (index, case) in cases.iter().enumerate() {
        let _ = write!(context, "\n{}. {}", index + 1, case.name);
        if !case.citation.is_empty() {
            let _ = write!(context, " - {}", case.citation);
        }
        match (case.court.is_empty(), case.year) {
            (false, year) if year > 0 => {
                let _ = write!(context, " ({}, {})", case.court, year);
            }
            (false, _) => {
                let _ = write!(context, " ({})", case.court);
            }
            (true, year) if year > 0 => {
                let _ = write!(context, " ({year})");
            }
            _ => {}
        }
        context.push('\n');

        if let Some(holding) = case.holding.as_deref().filter(|text| !text.is_empty()) {
            let _ = writeln!(context, "Holding: {holding}");
        }
        if let Some(facts) = case.facts.as_deref().filter(|text| !text.is_empty()) {
            let _ = writeln!(context, "Facts: {}", truncate_chars(facts, FACTS_LIMIT));
        }
        if let Some(reasoning) = case.reasoning.as_deref().filter(|text| !text.is_empty()) {
            let _ = writeln!(context, "Reasoning: {}", truncate_chars(reasoning, REASONING_LIMIT));
        }
    }

    if !web.is_empty() {
        context.push_str("\n\nADDITIONAL WEB SOURCES:\n");
        for (index, source) in web.iter().enumerate() {
            let _ = write!(context, "\n{}. {}", index + 1, source.title);
            if !source.url.is_empty() {
                let _ = write!(context, "\nURL: {}", source.url);
            }
            if !source.content.is_empty() {
                let _ = write!(
                    context,
                    "\nContent: {}",
                    truncate_chars(&source.content, WEB_CONTENT_LIMIT)
                );
            }
            context.push('\n');
        }
    }

    context
}

/// Verbatim substring presence of citation or case name; empty strings never match.
pub fn extract_citations(answer: &str, cases: &[CaseEvidence]) -> Vec<CitationUsed> {
    cases
        .iter()
        .filter(|case| {
            (!case.citation.is_empty() && answer.contains(&case.citation))
                || (!case.name.is_empty() && answer.contains(&case.name))
        })
        .map(|case| CitationUsed {
            name: case.name.clone(),
            citation: case.citation.clone(),
            case_id: case.case_id,
        })
        .collect()
}

#[derive(Clone)]
pub struct AnswerSynthesizer {
    generator: Arc<dyn AnswerGenerator>,
    system_prompt: String,
    temperature: f32,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            generator,
            system_prompt: LEGAL_SYSTEM_PROMPT.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Provider failure is returned as-is; there is no fallback answer.
    pub async fn synthesize(
        &self,
        query: &str,
        cases: &[CaseEvidence],
        web: &[WebEvidence],
    ) -> Result<SynthesizedAnswer, BackendError> {
        let context = build_context(cases, web);
        let text = self
            .generator
            .generate(GenerationRequest {
                system_prompt: &self.system_prompt,
                context: &context,
                query,
                temperature: self.temperature,
            })
            .await?;

        let citations_used = extract_citations(&text, cases);
        info!(
            answer_chars = text.len(),
            citations = citations_used.len(),
            "answer synthesized"
        );

        Ok(SynthesizedAnswer {
            text,
            citations_used,
        })
    }
}
