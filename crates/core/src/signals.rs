//! Signals derived from raw query text: referenced years and the first
//! `"<Name> v. <Name>"` case reference.

use crate::models::CaseEvidence;
use regex::{Captures, Regex};
use std::sync::OnceLock;

const YEAR_PATTERN: &str = r"\b(18\d{2}|19\d{2}|20\d{2})\b";

const NAME: &str = r"[A-Z][\w'&\-]*\.?(?:\s+(?:(?:of|the|and|for|ex|rel\.)\s+)*[A-Z][\w'&\-]*\.?)*";

const ABBREVIATION_PATTERN: &str = r"\b(co|corp)\.";

/// Leading words that start a question rather than a party name.
const LEADING_NOISE: &[&str] = &[
    "what", "when", "where", "which", "who", "why", "how", "is", "are", "was", "were", "does",
    "do", "did", "can", "could", "should", "would", "will", "has", "have", "in", "under",
    "after", "since", "explain", "summarize", "describe", "compare", "tell", "please", "find",
];

/// Lowercase words allowed between the capitalised words of a party name.
const CONNECTORS: &[&str] = &["of", "the", "and", "for", "ex", "rel"];

/// Capitalised words that follow a case name in a question, never part of it.
const NON_PARTY_WORDS: &[&str] = &[
    "overruled", "overturned", "upheld", "reversed", "affirmed", "decided", "held", "hold",
    "holds", "holding", "ruled", "ruling", "decision", "established", "establish", "mean",
    "means", "say", "says", "apply", "applies", "still", "change", "changed", "affect",
    "affected", "today", "then", "now",
];

/// Abbreviations that legitimately end a party name with a period.
const TRAILING_ABBREVIATIONS: &[&str] = &[
    "co", "corp", "inc", "ltd", "bros", "assn", "bd", "dept", "ass'n", "llc", "l.l.c",
];

fn year_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(YEAR_PATTERN).ok()).as_ref()
}

fn reference_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(&format!(r"({NAME})\s+(?i:v\.)\s+({NAME})")).ok())
        .as_ref()
}

fn abbreviation_regex() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(ABBREVIATION_PATTERN).ok()).as_ref()
}

/// Four-digit years in 1800..=2099, in order of occurrence, duplicates kept.
pub fn extract_years(text: &str) -> Vec<i32> {
    let Some(pattern) = year_regex() else {
        return Vec::new();
    };

    pattern
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .filter_map(|found| found.as_str().parse::<i32>().ok())
        .collect()
}

/// First `"<Name> v. <Name>"` reference in the text. Later references are ignored.
///
/// Party names must start with a capital letter, so all-lowercase references
/// such as `"roe v. wade"` are not recognised.
pub fn extract_case_reference(text: &str) -> Option<String> {
    let captures = reference_regex()?.captures(text)?;
    let left = left_party(captures.get(1)?.as_str());
    let right = right_party(captures.get(2)?.as_str());

    if left.is_empty() || right.is_empty() {
        return None;
    }

    Some(format!("{left} v. {right}"))
}

fn bare_lowercase(token: &str) -> String {
    token.trim_end_matches('.').to_lowercase()
}

fn is_connector(token: &str) -> bool {
    CONNECTORS.contains(&bare_lowercase(token).as_str())
}

/// A period closes the sentence unless it belongs to an abbreviation or `rel.`.
fn ends_sentence(token: &str) -> bool {
    token.ends_with('.')
        && !is_connector(token)
        && !TRAILING_ABBREVIATIONS.contains(&bare_lowercase(token).as_str())
}

/// Keeps the words after the last sentence break, minus leading question words.
fn left_party(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let sentence_start = tokens[..tokens.len().saturating_sub(1)]
        .iter()
        .rposition(|token| ends_sentence(token))
        .map_or(0, |index| index + 1);

    tokens[sentence_start..]
        .iter()
        .skip_while(|token| {
            LEADING_NOISE.contains(&bare_lowercase(token).as_str()) || is_connector(token)
        })
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stops at the first sentence break or at a capitalised word that cannot
/// belong to a party name.
fn right_party(name: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for token in name.split_whitespace() {
        let lowered = bare_lowercase(token);
        let ends_name = NON_PARTY_WORDS.contains(&lowered.as_str())
            || LEADING_NOISE.contains(&lowered.as_str());
        if !kept.is_empty() && ends_name {
            break;
        }
        if ends_sentence(token) {
            kept.push(token.trim_end_matches('.'));
            break;
        }
        kept.push(token);
    }

    while kept.last().is_some_and(|token| is_connector(token)) {
        kept.pop();
    }
    kept.join(" ")
}

/// Lowercases and expands `co.` / `corp.`.
pub fn normalize_case_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match abbreviation_regex() {
        Some(pattern) => pattern
            .replace_all(&lowered, |captures: &Captures<'_>| {
                match captures.get(1).map(|found| found.as_str()) {
                    Some("corp") => "corporation",
                    _ => "company",
                }
            })
            .into_owned(),
        None => lowered,
    }
}

/// Conservative containment check. False positives are accepted.
pub fn reference_is_covered(reference: &str, evidence: &[CaseEvidence]) -> bool {
    let reference_lower = reference.trim().to_lowercase();
    if reference_lower.is_empty() {
        return true;
    }
    let reference_normalized = normalize_case_name(reference);

    evidence.iter().any(|item| {
        item.name.to_lowercase().contains(&reference_lower)
            || item.citation.to_lowercase().contains(&reference_lower)
            || normalize_case_name(&item.name).contains(&reference_normalized)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence_named(name: &str) -> CaseEvidence {
        CaseEvidence {
            case_id: 1,
            name: name.to_string(),
            citation: "1 U.S. 1".to_string(),
            court: "Supreme Court".to_string(),
            year: 1950,
            facts: None,
            holding: None,
            reasoning: None,
            relevance_score: 0.9,
            url: String::new(),
        }
    }

    #[test]
    fn years_keep_order_and_duplicates() {
        let years =
            extract_years("Compare 2023 rulings with 1966, then 2023 again; not 1799 or 21000");
        assert_eq!(years, vec![2023, 1966, 2023]);
    }

    #[test]
    fn years_ignore_embedded_digits() {
        assert!(extract_years("case no. 120234 and 384 U.S. 436").is_empty());
    }

    #[test]
    fn reference_takes_first_match_only() {
        let reference =
            extract_case_reference("How did Miranda v. Arizona change Terry v. Ohio?");
        assert_eq!(reference.as_deref(), Some("Miranda v. Arizona"));
    }

    #[test]
    fn reference_is_case_insensitive_on_separator() {
        let reference = extract_case_reference("Is Smith Co. V. Jones still good law?");
        assert_eq!(reference.as_deref(), Some("Smith Co. v. Jones"));
    }

    #[test]
    fn reference_keeps_multi_word_parties() {
        let reference = extract_case_reference("Explain Brown v. Board of Education.");
        assert_eq!(reference.as_deref(), Some("Brown v. Board of Education"));

        let reference = extract_case_reference("what did New York Times Co. v. Sullivan hold");
        assert_eq!(reference.as_deref(), Some("New York Times Co. v. Sullivan"));
    }

    #[test]
    fn reference_stops_at_sentence_break() {
        let reference = extract_case_reference("Explain Roe v. Wade. What changed after Dobbs?");
        assert_eq!(reference.as_deref(), Some("Roe v. Wade"));

        let reference = extract_case_reference("See Gideon. Compare Terry v. Ohio.");
        assert_eq!(reference.as_deref(), Some("Terry v. Ohio"));
    }

    #[test]
    fn reference_stops_before_trailing_capitalized_verb() {
        let reference = extract_case_reference("Was Roe v. Wade Overruled?");
        assert_eq!(reference.as_deref(), Some("Roe v. Wade"));

        let reference =
            extract_case_reference("Citizens United v. Federal Election Commission Decided what?");
        assert_eq!(
            reference.as_deref(),
            Some("Citizens United v. Federal Election Commission")
        );
    }

    #[test]
    fn reference_keeps_relator_connector() {
        let reference = extract_case_reference("United States ex rel. Toth v. Quarles");
        assert_eq!(reference.as_deref(), Some("United States ex rel. Toth v. Quarles"));
    }

    #[test]
    fn lowercase_reference_is_not_recognised() {
        assert_eq!(extract_case_reference("roe v. wade overturned?"), None);
    }

    #[test]
    fn reference_absent_without_separator() {
        assert_eq!(extract_case_reference("What are Miranda rights?"), None);
    }

    #[test]
    fn normalization_expands_known_abbreviations() {
        assert_eq!(
            normalize_case_name("Smith Co. v. Jones Corp."),
            "smith company v. jones corporation"
        );
        assert_eq!(normalize_case_name("Mexico. v. Texaco"), "mexico. v. texaco");
    }

    #[test]
    fn coverage_uses_abbreviation_expansion() {
        let covered = vec![evidence_named("Smith Company v. Jones Corp.")];
        let uncovered = vec![evidence_named("Smith Co. v. Brown")];

        assert!(reference_is_covered("Smith Co. v. Jones", &covered));
        assert!(!reference_is_covered("Smith Co. v. Jones", &uncovered));
    }

    #[test]
    fn coverage_matches_citation_text() {
        let mut evidence = evidence_named("Ernesto Miranda v. State of Arizona");
        evidence.citation = "Miranda v. Arizona, 384 U.S. 436".to_string();
        assert!(reference_is_covered("miranda v. arizona", &[evidence]));
    }
}
