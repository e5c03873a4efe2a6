//! Results presentation binding.
//!
//! A pure projection of a completed analysis into the shape the
//! presentation collaborator renders; no state machine of its own beyond
//! present-or-absent.

use serde::Serialize;

use crate::analysis::AnalysisResult;

/// Flattened, display-ready view of an analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub skin_type: String,
    /// Confidence rounded to the nearest integer percentage.
    pub confidence_percent: u8,
    pub issues: Vec<String>,
    pub home_remedies: Vec<String>,
    pub chemicals: Vec<String>,
}

impl From<&AnalysisResult> for AnalysisReport {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            skin_type: result.skin_type.to_string(),
            confidence_percent: (result.confidence * 100.0).round() as u8,
            issues: result.issues.clone(),
            home_remedies: result.advice.home_remedies.clone(),
            chemicals: result.advice.chemicals.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analysis::{Advice, SkinType};

    fn result(confidence: f32) -> AnalysisResult {
        AnalysisResult {
            skin_type: SkinType::Combination,
            confidence,
            issues: vec!["mild acne".into(), "dry patches".into()],
            advice: Advice {
                home_remedies: vec![
                    "Gentle honey mask twice weekly for natural antibacterial benefits".into(),
                ],
                chemicals: vec![
                    "Salicylic acid (BHA) - Gentle exfoliant for acne-prone areas.".into(),
                ],
            },
        }
    }

    #[test]
    fn confidence_renders_as_rounded_percent() {
        assert_eq!(AnalysisReport::from(&result(0.85)).confidence_percent, 85);
        assert_eq!(AnalysisReport::from(&result(0.854)).confidence_percent, 85);
        assert_eq!(AnalysisReport::from(&result(0.856)).confidence_percent, 86);
        assert_eq!(AnalysisReport::from(&result(0.0)).confidence_percent, 0);
        assert_eq!(AnalysisReport::from(&result(1.0)).confidence_percent, 100);
    }

    #[test]
    fn projection_preserves_structure_and_order() {
        let report = AnalysisReport::from(&result(0.85));
        assert_eq!(report.skin_type, "Combination");
        assert_eq!(report.issues, vec!["mild acne", "dry patches"]);
        assert_eq!(report.home_remedies.len(), 1);
        assert_eq!(report.chemicals.len(), 1);
    }
}
