//! Validation boundary between sanitized model output and [`Analysis`].
//!
//! The candidate is parsed as untyped JSON first and then read field by
//! field. Required scalars (`overallRisk`, `riskScore`, `summary`) must be
//! present; everything else gets its default here, once. Type errors are
//! collected and reported together as a schema violation.

use std::collections::HashSet;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;

use crate::analysis::types::{
    AlertIcon, AlertSeverity, Analysis, Clause, ContractType, FinancialExposure, Importance,
    NegotiationPoint, Obligation, ObligationCategory, Perspective, Priority, RiskAlert,
    RiskCategory, RiskLevel, RiskMetric, RoleAnalysis,
};
use crate::error::{PipelineError, Result};

type Object = Map<String, Value>;

/// Parse sanitized model output into a fully typed [`Analysis`].
///
/// All-or-nothing: any error means no record is returned.
pub fn parse_analysis(candidate: &str) -> Result<Analysis> {
    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| PipelineError::MalformedPayload(e.to_string()))?;

    let root = value.as_object().ok_or_else(|| {
        PipelineError::MalformedPayload(format!("expected a JSON object, found {}", kind(&value)))
    })?;

    let mut errors = Vec::new();
    let analysis = read_analysis(root, &mut errors);

    match analysis {
        Some(analysis) if errors.is_empty() => Ok(analysis),
        _ => Err(PipelineError::SchemaViolation { errors }),
    }
}

fn read_analysis(root: &Object, errors: &mut Vec<String>) -> Option<Analysis> {
    let overall_risk = enum_field::<RiskLevel>(root, "overallRisk", "", errors);
    if overall_risk.is_none() && !errors.iter().any(|e| e.starts_with("overallRisk")) {
        errors.push("overallRisk: required field missing or not a known risk level".into());
    }

    let risk_score = score_field(root, "riskScore", "", errors);
    if risk_score.is_none() && !errors.iter().any(|e| e.starts_with("riskScore")) {
        errors.push("riskScore: required field missing".into());
    }

    let summary = match root.get("summary") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            errors.push(format!("summary: expected string, found {}", kind(other)));
            None
        }
        None => {
            errors.push("summary: required field missing".into());
            None
        }
    };

    let contract_type = enum_field::<ContractType>(root, "contractType", "", errors)
        .unwrap_or(ContractType::Other);
    let complexity_score = score_field(root, "complexityScore", "", errors);

    let financial_exposure = match object_field(root, "financialExposure", "", errors) {
        Some(obj) => read_financial_exposure(obj, "financialExposure", errors),
        None => FinancialExposure::default(),
    };

    let role_analysis = match object_field(root, "roleAnalysis", "", errors) {
        Some(obj) => read_role_analysis(obj, "roleAnalysis", errors),
        None => RoleAnalysis::default(),
    };

    let risk_metrics = read_risk_metrics(root, errors);

    let clauses = object_list(root, "clauses", "", errors)
        .into_iter()
        .map(|(path, obj)| read_clause(obj, &path, errors))
        .collect();

    let obligations = object_list(root, "obligations", "", errors)
        .into_iter()
        .map(|(path, obj)| read_obligation(obj, &path, errors))
        .collect();

    let negotiation_points = object_list(root, "negotiationPoints", "", errors)
        .into_iter()
        .map(|(path, obj)| read_negotiation_point(obj, &path, errors))
        .collect();

    let risk_alerts = object_list(root, "riskAlerts", "", errors)
        .into_iter()
        .map(|(path, obj)| read_risk_alert(obj, &path, errors))
        .collect();

    Some(Analysis {
        contract_type,
        overall_risk: overall_risk?,
        risk_score: risk_score?,
        complexity_score,
        summary: summary?,
        financial_exposure,
        role_analysis,
        risk_metrics,
        clauses,
        obligations,
        negotiation_points,
        risk_alerts,
    })
}

fn read_financial_exposure(obj: &Object, path: &str, errors: &mut Vec<String>) -> FinancialExposure {
    FinancialExposure {
        estimated_costs: str_field(obj, "estimatedCosts", path, errors),
        penalties: str_field(obj, "penalties", path, errors),
        liability_caps: str_field(obj, "liabilityCaps", path, errors),
        best_case: str_field(obj, "bestCase", path, errors),
        worst_case: str_field(obj, "worstCase", path, errors),
    }
}

fn read_perspective(obj: &Object, path: &str, errors: &mut Vec<String>) -> Perspective {
    Perspective {
        risks: string_list(obj, "risks", path, errors),
        benefits: string_list(obj, "benefits", path, errors),
        key_considerations: string_list(obj, "keyConsiderations", path, errors),
    }
}

fn read_role_analysis(obj: &Object, path: &str, errors: &mut Vec<String>) -> RoleAnalysis {
    let primary_perspective = object_field(obj, "primaryPerspective", path, errors)
        .map(|p| read_perspective(p, &join(path, "primaryPerspective"), errors))
        .unwrap_or_default();
    let secondary_perspective = object_field(obj, "secondaryPerspective", path, errors)
        .map(|p| read_perspective(p, &join(path, "secondaryPerspective"), errors))
        .unwrap_or_default();

    RoleAnalysis {
        primary_role: str_field(obj, "primaryRole", path, errors),
        secondary_role: str_field(obj, "secondaryRole", path, errors),
        primary_perspective,
        secondary_perspective,
    }
}

/// One metric per category, first occurrence wins; unknown categories are
/// dropped rather than failing the whole record.
fn read_risk_metrics(root: &Object, errors: &mut Vec<String>) -> Vec<RiskMetric> {
    let mut seen = HashSet::new();
    let mut metrics = Vec::new();

    for (path, obj) in object_list(root, "riskMetrics", "", errors) {
        let Some(category) = obj
            .get("category")
            .and_then(Value::as_str)
            .and_then(|c| RiskCategory::from_str(c.trim()).ok())
        else {
            debug!(path = %path, "dropping risk metric with unknown category");
            continue;
        };
        if !seen.insert(category) {
            debug!(path = %path, "dropping duplicate risk metric");
            continue;
        }
        let score = score_field(obj, "score", &path, errors).unwrap_or(0);
        metrics.push(RiskMetric { category, score });
    }

    metrics
}

fn read_clause(obj: &Object, path: &str, errors: &mut Vec<String>) -> Clause {
    let page = match obj.get("page") {
        None | Some(Value::Null) => 1,
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|p| p.round().clamp(1.0, u32::MAX as f64) as u32)
            .unwrap_or(1),
        Some(other) => {
            errors.push(format!("{}: expected number, found {}", join(path, "page"), kind(other)));
            1
        }
    };

    Clause {
        title: str_field(obj, "title", path, errors),
        risk_level: enum_field(obj, "riskLevel", path, errors).unwrap_or(RiskLevel::Medium),
        category: str_field(obj, "category", path, errors),
        page,
        clause_text: str_field(obj, "clauseText", path, errors),
        explanation: str_field(obj, "explanation", path, errors),
        impact: str_field(obj, "impact", path, errors),
        suggestions: string_list(obj, "suggestions", path, errors),
        financial_impact: opt_str_field(obj, "financialImpact", path, errors),
    }
}

fn read_obligation(obj: &Object, path: &str, errors: &mut Vec<String>) -> Obligation {
    Obligation {
        title: str_field(obj, "title", path, errors),
        category: enum_field(obj, "category", path, errors)
            .unwrap_or(ObligationCategory::Communication),
        importance: enum_field(obj, "importance", path, errors).unwrap_or(Importance::Normal),
        deadline: str_field(obj, "deadline", path, errors),
        description: str_field(obj, "description", path, errors),
        consequences: str_field(obj, "consequences", path, errors),
    }
}

fn read_negotiation_point(obj: &Object, path: &str, errors: &mut Vec<String>) -> NegotiationPoint {
    NegotiationPoint {
        priority: enum_field(obj, "priority", path, errors).unwrap_or(Priority::Medium),
        title: str_field(obj, "title", path, errors),
        current_terms: str_field(obj, "currentTerms", path, errors),
        proposed_terms: str_field(obj, "proposedTerms", path, errors),
        rationale: str_field(obj, "rationale", path, errors),
        talking_points: string_list(obj, "talkingPoints", path, errors),
        priority_score: score_field(obj, "priorityScore", path, errors).unwrap_or(50),
    }
}

fn read_risk_alert(obj: &Object, path: &str, errors: &mut Vec<String>) -> RiskAlert {
    RiskAlert {
        severity: enum_field(obj, "severity", path, errors).unwrap_or(AlertSeverity::Medium),
        title: str_field(obj, "title", path, errors),
        message: str_field(obj, "message", path, errors),
        icon: enum_field(obj, "icon", path, errors).unwrap_or(AlertIcon::Legal),
    }
}

// --- field readers ---

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn opt_str_field(obj: &Object, key: &str, path: &str, errors: &mut Vec<String>) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            errors.push(format!("{}: expected string, found {}", join(path, key), kind(other)));
            None
        }
    }
}

fn str_field(obj: &Object, key: &str, path: &str, errors: &mut Vec<String>) -> String {
    opt_str_field(obj, key, path, errors).unwrap_or_default()
}

fn string_list(obj: &Object, key: &str, path: &str, errors: &mut Vec<String>) -> Vec<String> {
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::String(s) => Some(s.clone()),
                other => {
                    errors.push(format!(
                        "{}[{i}]: expected string, found {}",
                        join(path, key),
                        kind(other)
                    ));
                    None
                }
            })
            .collect(),
        Some(other) => {
            errors.push(format!("{}: expected array, found {}", join(path, key), kind(other)));
            Vec::new()
        }
    }
}

/// Scores accept numbers (rounded, clamped to 0..=100) and numeric strings.
fn score_field(obj: &Object, key: &str, path: &str, errors: &mut Vec<String>) -> Option<u8> {
    let raw = match obj.get(key) {
        None | Some(Value::Null) => return None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match raw {
        Some(v) if v.is_finite() => Some(v.round().clamp(0.0, 100.0) as u8),
        _ => {
            errors.push(format!("{}: expected a number between 0 and 100", join(path, key)));
            None
        }
    }
}

/// Enum values are matched case-insensitively. Unknown values fall back to
/// the caller's default; only a non-string value is an error.
fn enum_field<T: FromStr>(obj: &Object, key: &str, path: &str, errors: &mut Vec<String>) -> Option<T> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let parsed = T::from_str(s.trim()).ok();
            if parsed.is_none() {
                debug!(field = %join(path, key), value = %s, "unrecognized enum value");
            }
            parsed
        }
        Some(other) => {
            errors.push(format!("{}: expected string, found {}", join(path, key), kind(other)));
            None
        }
    }
}

fn object_field<'a>(
    obj: &'a Object,
    key: &str,
    path: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Object> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(inner)) => Some(inner),
        Some(other) => {
            errors.push(format!("{}: expected object, found {}", join(path, key), kind(other)));
            None
        }
    }
}

fn object_list<'a>(
    obj: &'a Object,
    key: &str,
    path: &str,
    errors: &mut Vec<String>,
) -> Vec<(String, &'a Object)> {
    let field = join(path, key);
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Object(inner) => Some((format!("{field}[{i}]"), inner)),
                other => {
                    errors.push(format!("{field}[{i}]: expected object, found {}", kind(other)));
                    None
                }
            })
            .collect(),
        Some(other) => {
            errors.push(format!("{field}: expected array, found {}", kind(other)));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sanitizer::sanitize;
    use pretty_assertions::assert_eq;

    fn minimal_json() -> &'static str {
        r#"{"overallRisk":"medium","riskScore":55,"summary":"ok"}"#
    }

    #[test]
    fn test_minimal_payload_defaults_optional_fields() {
        let analysis = parse_analysis(minimal_json()).unwrap();
        assert_eq!(analysis.overall_risk, RiskLevel::Medium);
        assert_eq!(analysis.risk_score, 55);
        assert_eq!(analysis.contract_type, ContractType::Other);
        assert_eq!(analysis.complexity_score, None);
        assert!(analysis.clauses.is_empty());
        assert!(analysis.obligations.is_empty());
        assert!(analysis.negotiation_points.is_empty());
        assert!(analysis.risk_metrics.is_empty());
        assert!(analysis.risk_alerts.is_empty());
        assert_eq!(analysis.role_analysis, RoleAnalysis::default());
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = parse_analysis("{not json").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedPayload(_)));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = parse_analysis("[1, 2]").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedPayload(_)));
    }

    #[test]
    fn test_missing_required_fields_are_reported() {
        let err = parse_analysis(r#"{"clauses":[]}"#).unwrap_err();
        let PipelineError::SchemaViolation { errors } = err else {
            panic!("expected schema violation");
        };
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.starts_with("overallRisk")));
        assert!(errors.iter().any(|e| e.starts_with("riskScore")));
        assert!(errors.iter().any(|e| e.starts_with("summary")));
    }

    #[test]
    fn test_wrong_type_in_list_fails_whole_record() {
        let json = r#"{"overallRisk":"low","riskScore":1,"summary":"s","clauses":"none"}"#;
        let err = parse_analysis(json).unwrap_err();
        let PipelineError::SchemaViolation { errors } = err else {
            panic!("expected schema violation");
        };
        assert_eq!(errors, vec!["clauses: expected array, found string".to_string()]);
    }

    #[test]
    fn test_unknown_overall_risk_is_violation() {
        let json = r#"{"overallRisk":"catastrophic","riskScore":1,"summary":"s"}"#;
        assert!(matches!(
            parse_analysis(json),
            Err(PipelineError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_scores_are_rounded_and_clamped() {
        let json = r#"{"overallRisk":"HIGH","riskScore":140.6,"complexityScore":"12.4","summary":"s"}"#;
        let analysis = parse_analysis(json).unwrap();
        assert_eq!(analysis.overall_risk, RiskLevel::High);
        assert_eq!(analysis.risk_score, 100);
        assert_eq!(analysis.complexity_score, Some(12));
    }

    #[test]
    fn test_risk_metrics_deduplicated_and_unknown_dropped() {
        let json = r#"{
            "overallRisk":"low","riskScore":10,"summary":"s",
            "riskMetrics":[
                {"category":"payment","score":30},
                {"category":"weather","score":99},
                {"category":"payment","score":80},
                {"category":"intellectual_property","score":45}
            ]
        }"#;
        let analysis = parse_analysis(json).unwrap();
        assert_eq!(
            analysis.risk_metrics,
            vec![
                RiskMetric { category: RiskCategory::Payment, score: 30 },
                RiskMetric { category: RiskCategory::IntellectualProperty, score: 45 },
            ]
        );
    }

    #[test]
    fn test_duplicate_metric_with_bad_score_is_ignored() {
        let json = r#"{
            "overallRisk":"low","riskScore":10,"summary":"s",
            "riskMetrics":[
                {"category":"payment","score":5},
                {"category":"payment","score":"n/a"}
            ]
        }"#;
        let analysis = parse_analysis(json).unwrap();
        assert_eq!(
            analysis.risk_metrics,
            vec![RiskMetric { category: RiskCategory::Payment, score: 5 }]
        );
    }

    #[test]
    fn test_full_clause_and_nested_records() {
        let json = r#"{
            "contractType":"employment",
            "overallRisk":"high","riskScore":80,"summary":"s",
            "financialExposure":{"penalties":"$5,000"},
            "roleAnalysis":{"primaryRole":"employee","primaryPerspective":{"risks":["non-compete"]}},
            "clauses":[{"title":"Non-compete","riskLevel":"high","category":"termination","page":0,
                        "clauseText":"...","explanation":"e","impact":"i","suggestions":["narrow it"],
                        "financialImpact":"lost income"}],
            "obligations":[{"title":"Notice","category":"communication","importance":"critical",
                            "deadline":"30 days","description":"d","consequences":"c"}],
            "negotiationPoints":[{"priority":"high","title":"t","currentTerms":"a","proposedTerms":"b",
                                  "rationale":"r","talkingPoints":["x"],"priorityScore":90}],
            "riskAlerts":[{"severity":"critical","title":"t","message":"m","icon":"time"}]
        }"#;
        let analysis = parse_analysis(json).unwrap();

        assert_eq!(analysis.contract_type, ContractType::Employment);
        assert_eq!(analysis.financial_exposure.penalties, "$5,000");
        assert_eq!(analysis.financial_exposure.worst_case, "");
        assert_eq!(analysis.role_analysis.primary_perspective.risks, vec!["non-compete"]);
        assert!(analysis.role_analysis.secondary_perspective.benefits.is_empty());

        let clause = &analysis.clauses[0];
        assert_eq!(clause.page, 1);
        assert_eq!(clause.risk_level, RiskLevel::High);
        assert_eq!(clause.financial_impact.as_deref(), Some("lost income"));

        assert_eq!(analysis.obligations[0].importance, Importance::Critical);
        assert_eq!(analysis.negotiation_points[0].priority_score, 90);
        assert_eq!(analysis.risk_alerts[0].icon, AlertIcon::Time);
    }

    #[test]
    fn test_unknown_nested_enum_values_use_defaults() {
        let json = r#"{"overallRisk":"low","riskScore":5,"summary":"s","contractType":"lease",
            "clauses":[{"title":"t","riskLevel":"moderate"}]}"#;
        let analysis = parse_analysis(json).unwrap();
        assert_eq!(analysis.contract_type, ContractType::Other);
        assert_eq!(analysis.clauses[0].risk_level, RiskLevel::Medium);
        assert!(analysis.clauses[0].suggestions.is_empty());
    }

    #[test]
    fn test_prose_wrapped_fenced_reply_recovers() {
        let raw = "Here is the result:\n```json\n{\"overallRisk\":\"high\",\"riskScore\":90,\"summary\":\"bad\",\"riskMetrics\":[],\"clauses\":[],\"obligations\":[],\"negotiationPoints\":[]}\n```\nHope this helps!";
        let analysis = parse_analysis(&sanitize(raw)).unwrap();
        assert_eq!(analysis.overall_risk, RiskLevel::High);
        assert_eq!(analysis.risk_score, 90);
        assert_eq!(analysis.summary, "bad");
    }
}
