use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Input for prompt construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub contract_text: String,
    pub document_title: String,
}

impl AnalysisRequest {
    pub fn new(contract_text: impl Into<String>, document_title: impl Into<String>) -> Self {
        Self {
            contract_text: contract_text.into(),
            document_title: document_title.into(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContractType {
    Employment,
    Rental,
    Service,
    Nda,
    Partnership,
    Freelance,
    Sales,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RiskCategory {
    Liability,
    Payment,
    IntellectualProperty,
    Termination,
    Confidentiality,
    Indemnification,
}

impl RiskCategory {
    /// Every category, in the order risk metrics are reported.
    pub const ALL: [RiskCategory; 6] = [
        RiskCategory::Liability,
        RiskCategory::Payment,
        RiskCategory::IntellectualProperty,
        RiskCategory::Termination,
        RiskCategory::Confidentiality,
        RiskCategory::Indemnification,
    ];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ObligationCategory {
    Reporting,
    Payment,
    Delivery,
    Confidentiality,
    Communication,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Importance {
    Critical,
    Important,
    Normal,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlertIcon {
    Money,
    Liability,
    Time,
    Legal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialExposure {
    pub estimated_costs: String,
    pub penalties: String,
    pub liability_caps: String,
    pub best_case: String,
    pub worst_case: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Perspective {
    pub risks: Vec<String>,
    pub benefits: Vec<String>,
    pub key_considerations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleAnalysis {
    pub primary_role: String,
    pub secondary_role: String,
    pub primary_perspective: Perspective,
    pub secondary_perspective: Perspective,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMetric {
    pub category: RiskCategory,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    pub title: String,
    pub risk_level: RiskLevel,
    pub category: String,
    pub page: u32,
    pub clause_text: String,
    pub explanation: String,
    pub impact: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_impact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obligation {
    pub title: String,
    pub category: ObligationCategory,
    pub importance: Importance,
    pub deadline: String,
    pub description: String,
    pub consequences: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationPoint {
    pub priority: Priority,
    pub title: String,
    pub current_terms: String,
    pub proposed_terms: String,
    pub rationale: String,
    #[serde(default)]
    pub talking_points: Vec<String>,
    pub priority_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub icon: AlertIcon,
}

/// The structured risk assessment for one contract.
///
/// List fields are always present; absent input normalizes to an empty `Vec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub contract_type: ContractType,
    pub overall_risk: RiskLevel,
    pub risk_score: u8,
    #[serde(default)]
    pub complexity_score: Option<u8>,
    pub summary: String,
    #[serde(default)]
    pub financial_exposure: FinancialExposure,
    #[serde(default)]
    pub role_analysis: RoleAnalysis,
    #[serde(default)]
    pub risk_metrics: Vec<RiskMetric>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
    #[serde(default)]
    pub negotiation_points: Vec<NegotiationPoint>,
    #[serde(default)]
    pub risk_alerts: Vec<RiskAlert>,
}

impl Analysis {
    /// Fill `complexity_score` from the contract text when the model omitted it.
    pub fn with_default_complexity(mut self, contract_text: &str) -> Self {
        if self.complexity_score.is_none() {
            self.complexity_score = Some(complexity_from_text(contract_text));
        }
        self
    }

    /// Produce a new record with every field set in `patch` replaced.
    pub fn apply(&self, patch: AnalysisPatch) -> Analysis {
        let current = self.clone();
        Analysis {
            contract_type: patch.contract_type.unwrap_or(current.contract_type),
            overall_risk: patch.overall_risk.unwrap_or(current.overall_risk),
            risk_score: patch.risk_score.map(clamp_score).unwrap_or(current.risk_score),
            complexity_score: patch
                .complexity_score
                .map(|s| Some(clamp_score(s)))
                .unwrap_or(current.complexity_score),
            summary: patch.summary.unwrap_or(current.summary),
            financial_exposure: patch
                .financial_exposure
                .unwrap_or(current.financial_exposure),
            role_analysis: patch.role_analysis.unwrap_or(current.role_analysis),
            risk_metrics: patch.risk_metrics.unwrap_or(current.risk_metrics),
            clauses: patch.clauses.unwrap_or(current.clauses),
            obligations: patch.obligations.unwrap_or(current.obligations),
            negotiation_points: patch
                .negotiation_points
                .unwrap_or(current.negotiation_points),
            risk_alerts: patch.risk_alerts.unwrap_or(current.risk_alerts),
        }
    }
}

/// Replacement values for an explicit analysis update. Unset fields keep
/// their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisPatch {
    pub contract_type: Option<ContractType>,
    pub overall_risk: Option<RiskLevel>,
    pub risk_score: Option<u8>,
    pub complexity_score: Option<u8>,
    pub summary: Option<String>,
    pub financial_exposure: Option<FinancialExposure>,
    pub role_analysis: Option<RoleAnalysis>,
    pub risk_metrics: Option<Vec<RiskMetric>>,
    pub clauses: Option<Vec<Clause>>,
    pub obligations: Option<Vec<Obligation>>,
    pub negotiation_points: Option<Vec<NegotiationPoint>>,
    pub risk_alerts: Option<Vec<RiskAlert>>,
}

pub(crate) fn clamp_score(score: u8) -> u8 {
    score.min(100)
}

/// Word-count based complexity: one point per hundred words, capped at 100.
pub fn complexity_from_text(text: &str) -> u8 {
    let words = text.split_whitespace().count();
    let score = (words as f64 / 100.0).round().min(100.0);
    score as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn minimal() -> Analysis {
        Analysis {
            contract_type: ContractType::Other,
            overall_risk: RiskLevel::Low,
            risk_score: 10,
            complexity_score: None,
            summary: "fine".into(),
            financial_exposure: FinancialExposure::default(),
            role_analysis: RoleAnalysis::default(),
            risk_metrics: vec![],
            clauses: vec![],
            obligations: vec![],
            negotiation_points: vec![],
            risk_alerts: vec![],
        }
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(RiskCategory::IntellectualProperty.as_ref(), "intellectual_property");
        assert_eq!(
            serde_json::to_value(RiskCategory::IntellectualProperty).unwrap(),
            "intellectual_property"
        );
        assert_eq!(ContractType::from_str("NDA").unwrap(), ContractType::Nda);
        assert_eq!(RiskLevel::from_str("High").unwrap(), RiskLevel::High);
    }

    #[test]
    fn test_missing_lists_deserialize_as_empty() {
        let json = r#"{"contractType":"other","overallRisk":"low","riskScore":3,"summary":"x"}"#;
        let analysis: Analysis = serde_json::from_str(json).unwrap();
        assert!(analysis.clauses.is_empty());
        assert!(analysis.risk_alerts.is_empty());
        assert_eq!(analysis.financial_exposure, FinancialExposure::default());
    }

    #[test]
    fn test_serializes_lists_as_arrays_not_null() {
        let value = serde_json::to_value(minimal()).unwrap();
        assert_eq!(value["clauses"], serde_json::json!([]));
        assert_eq!(value["riskMetrics"], serde_json::json!([]));
        assert_eq!(value["negotiationPoints"], serde_json::json!([]));
    }

    #[test]
    fn test_complexity_from_text() {
        assert_eq!(complexity_from_text(""), 0);
        assert_eq!(complexity_from_text(&"word ".repeat(149)), 1);
        assert_eq!(complexity_from_text(&"word ".repeat(150)), 2);
        assert_eq!(complexity_from_text(&"word ".repeat(20_000)), 100);
    }

    #[test]
    fn test_with_default_complexity_keeps_model_value() {
        let mut analysis = minimal();
        analysis.complexity_score = Some(42);
        let analysis = analysis.with_default_complexity(&"word ".repeat(1000));
        assert_eq!(analysis.complexity_score, Some(42));

        let analysis = minimal().with_default_complexity(&"word ".repeat(1000));
        assert_eq!(analysis.complexity_score, Some(10));
    }

    #[test]
    fn test_apply_patch_replaces_only_set_fields() {
        let original = minimal();
        let patch = AnalysisPatch {
            overall_risk: Some(RiskLevel::High),
            risk_score: Some(250),
            ..Default::default()
        };
        let updated = original.apply(patch);
        assert_eq!(updated.overall_risk, RiskLevel::High);
        assert_eq!(updated.risk_score, 100);
        assert_eq!(updated.summary, original.summary);
    }
}
