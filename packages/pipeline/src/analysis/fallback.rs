//! Deterministic keyword analyzer used whenever the model path is
//! unavailable or returns something unusable.

use regex::Regex;
use std::sync::LazyLock;

use crate::analysis::types::{
    complexity_from_text, AlertIcon, AlertSeverity, Analysis, Clause, ContractType,
    FinancialExposure, Importance, NegotiationPoint, Obligation, ObligationCategory, Perspective,
    Priority, RiskAlert, RiskCategory, RiskLevel, RiskMetric, RoleAnalysis,
};

/// Characters of context kept on each side of a matched term.
const CONTEXT_CHARS: usize = 50;

const MAX_CLAUSES: usize = 3;

/// Risk indicators in scan order, each bound to a category and level.
const RISK_TERMS: [(&str, RiskCategory, RiskLevel); 6] = [
    ("indemnif", RiskCategory::Liability, RiskLevel::High),
    ("liabilit", RiskCategory::Liability, RiskLevel::Medium),
    ("confident", RiskCategory::Confidentiality, RiskLevel::Medium),
    ("terminat", RiskCategory::Termination, RiskLevel::Medium),
    ("payment", RiskCategory::Payment, RiskLevel::Low),
    ("intellectual", RiskCategory::IntellectualProperty, RiskLevel::High),
];

const SCORE_PER_CLAUSE: u32 = 30;
const SCORE_PER_CLAUSE_QUOTA: u32 = 25;

const QUOTA_NOTICE: &str = "AI analysis is temporarily unavailable because the model quota was \
                            exceeded, so this is a basic keyword analysis.";

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static EMPLOYMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(employment|employee|employees)\b").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static RENTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(rent|rental|rented|lease|leased|leases|lessee|lessor)\b").expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NDA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(nda|confidentiality)\b").expect("valid regex"));

fn category_weight(category: RiskCategory) -> u32 {
    match category {
        RiskCategory::Liability => 40,
        RiskCategory::Payment => 20,
        RiskCategory::IntellectualProperty => 35,
        RiskCategory::Termination => 30,
        RiskCategory::Confidentiality => 25,
        RiskCategory::Indemnification => 45,
    }
}

/// A risk term found in the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TermMatch {
    term: &'static str,
    category: RiskCategory,
    level: RiskLevel,
    context: String,
}

/// Build a lower-fidelity [`Analysis`] from keyword matches. Total over any
/// input string.
pub fn analyze(contract_text: &str, document_title: &str, quota_exceeded: bool) -> Analysis {
    let word_count = contract_text.split_whitespace().count();
    // ASCII lowercasing keeps byte offsets aligned with the original text.
    let lowered = contract_text.to_ascii_lowercase();

    let matches = scan_terms(contract_text, &lowered);
    let clauses: Vec<Clause> = matches.iter().take(MAX_CLAUSES).map(clause_for).collect();

    let per_clause = if quota_exceeded {
        SCORE_PER_CLAUSE_QUOTA
    } else {
        SCORE_PER_CLAUSE
    };
    let risk_score = (clauses.len() as u32 * per_clause).min(100) as u8;
    let overall_risk = overall_risk_for(clauses.len(), risk_score);

    let risk_metrics = RiskCategory::ALL
        .iter()
        .map(|&category| {
            let count = matches
                .iter()
                .take(MAX_CLAUSES)
                .filter(|m| m.category == category)
                .count() as u32;
            RiskMetric {
                category,
                score: (count * category_weight(category)).min(100) as u8,
            }
        })
        .collect();

    let mut summary = format!(
        "Automated keyword review of \"{}\" ({} words) found {} potential risk clause(s). \
         Configure the AI integration for a detailed, clause-by-clause analysis.",
        document_title,
        word_count,
        clauses.len()
    );
    if quota_exceeded {
        summary = format!("{QUOTA_NOTICE} {summary}");
    }

    let risk_alerts = if quota_exceeded {
        vec![RiskAlert {
            severity: AlertSeverity::High,
            title: "AI analysis quota exceeded".into(),
            message: "This result comes from keyword matching only. Re-run the analysis later \
                      for a full review."
                .into(),
            icon: AlertIcon::Legal,
        }]
    } else {
        Vec::new()
    };

    Analysis {
        contract_type: detect_contract_type(&lowered),
        overall_risk,
        risk_score,
        complexity_score: Some(complexity_from_text(contract_text)),
        summary,
        financial_exposure: FinancialExposure {
            estimated_costs: "Not assessed".into(),
            penalties: "Not assessed".into(),
            liability_caps: "Not assessed".into(),
            best_case: "Not assessed".into(),
            worst_case: "Not assessed".into(),
        },
        role_analysis: RoleAnalysis {
            primary_role: "First party".into(),
            secondary_role: "Second party".into(),
            primary_perspective: generic_perspective(),
            secondary_perspective: generic_perspective(),
        },
        risk_metrics,
        clauses,
        obligations: vec![Obligation {
            title: "Review contract terms before signing".into(),
            category: ObligationCategory::Communication,
            importance: Importance::Important,
            deadline: "Before signing".into(),
            description: "Read the full contract and confirm every term is understood.".into(),
            consequences: "Unreviewed terms may become binding obligations.".into(),
        }],
        negotiation_points: vec![NegotiationPoint {
            priority: Priority::Medium,
            title: "Enable full AI analysis".into(),
            current_terms: "Keyword-based analysis only".into(),
            proposed_terms: "Configure the AI model integration for a complete review".into(),
            rationale: "Keyword matching cannot judge how favourable a clause is.".into(),
            talking_points: vec![
                "Set the model API key for the analysis service".into(),
                "Re-run the analysis once the integration is available".into(),
            ],
            priority_score: 50,
        }],
        risk_alerts,
    }
}

/// First occurrence of each term, in term order. `lowered` must be the ASCII
/// lowercase of `text`.
fn scan_terms(text: &str, lowered: &str) -> Vec<TermMatch> {
    RISK_TERMS
        .iter()
        .filter_map(|&(term, category, level)| {
            lowered.find(term).map(|idx| TermMatch {
                term,
                category,
                level,
                context: context_window(text, idx, term.len()),
            })
        })
        .collect()
}

/// Text around `[start, start + len)`, widened by `CONTEXT_CHARS` on each
/// side and clipped to the text.
fn context_window(text: &str, start: usize, len: usize) -> String {
    let before = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let match_end = start + len;
    let after = text[match_end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map(|(i, _)| match_end + i)
        .unwrap_or(text.len());
    text[before..after].trim().to_string()
}

fn clause_for(m: &TermMatch) -> Clause {
    let title = capitalize(m.term);
    Clause {
        title: format!("{title} clause"),
        risk_level: m.level,
        category: m.category.to_string(),
        page: 1,
        clause_text: m.context.clone(),
        explanation: format!(
            "This contract contains {title} terms that may carry {} risk.",
            m.level
        ),
        impact: "Review this clause carefully before signing.".into(),
        suggestions: vec![
            "Have a legal professional review this clause".into(),
            "Ask the other party to clarify the scope of this clause".into(),
        ],
        financial_impact: None,
    }
}

fn overall_risk_for(clause_count: usize, score: u8) -> RiskLevel {
    match (clause_count, score) {
        (0, _) => RiskLevel::Low,
        (_, s) if s >= 70 => RiskLevel::High,
        (_, s) if s >= 40 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

fn detect_contract_type(lowered: &str) -> ContractType {
    if EMPLOYMENT.is_match(lowered) {
        ContractType::Employment
    } else if RENTAL.is_match(lowered) {
        ContractType::Rental
    } else if NDA.is_match(lowered) {
        ContractType::Nda
    } else {
        ContractType::Other
    }
}

fn generic_perspective() -> Perspective {
    Perspective {
        risks: vec!["Terms have not been reviewed by the AI model".into()],
        benefits: Vec::new(),
        key_considerations: vec!["Read every clause before signing".into()],
    }
}

fn capitalize(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
