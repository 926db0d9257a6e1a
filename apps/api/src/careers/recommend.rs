//! Career recommendation phase: profile in, up to three typed careers out.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::careers::coerce;
use crate::careers::prompts::RECOMMEND_PROMPT_TEMPLATE;
use crate::errors::AppError;
use crate::llm_client::extract::extract_payload;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::retry::ResilientInvoker;

pub const MAX_RECOMMENDATIONS: usize = 3;
pub const RECOMMEND_FAILED: &str = "Recommendation failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareerRecommendation {
    pub career_title: String,
    pub description: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub required_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub recommendations: Vec<CareerRecommendation>,
}

pub async fn recommend_careers(
    llm: &ResilientInvoker,
    profile: &Value,
) -> Result<Recommendations, AppError> {
    let profile_json = serde_json::to_string_pretty(profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;
    let prompt = RECOMMEND_PROMPT_TEMPLATE
        .replace("{max_recommendations}", &MAX_RECOMMENDATIONS.to_string())
        .replace("{profile_json}", &profile_json)
        .replace("{json_only}", JSON_ONLY_INSTRUCTION);

    let response = llm
        .invoke(&prompt)
        .await
        .map_err(AppError::llm(RECOMMEND_FAILED))?;

    let extracted = extract_payload(&response);
    if extracted.outcome.is_degraded() {
        warn!("Recommendation response unusable ({:?})", extracted.outcome);
    }

    let recommendations = coerce_recommendations(&extracted.value);
    info!("Parsed {} career recommendations", recommendations.len());
    Ok(Recommendations { recommendations })
}

/// Reads `{"recommendations": [...]}` (or a bare array) into at most
/// `MAX_RECOMMENDATIONS` careers. Non-object items are skipped.
pub fn coerce_recommendations(payload: &Value) -> Vec<CareerRecommendation> {
    let items = payload
        .get("recommendations")
        .unwrap_or(payload)
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| CareerRecommendation {
            career_title: coerce::field_text(item, &["career_title", "title"])
                .unwrap_or_else(|| "Unknown".to_string()),
            description: coerce::field_text(item, &["description"]).unwrap_or_default(),
            reason: coerce::field_text(item, &["reason"]).unwrap_or_default(),
            confidence: item.get("confidence").and_then(coerce::number),
            required_skills: coerce::field_list(item, &["required_skills", "requiredSkills"]),
        })
        .take(MAX_RECOMMENDATIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_wrapped_recommendations() {
        let payload = json!({
            "recommendations": [
                {
                    "career_title": "Data Analyst",
                    "description": "Analyses data",
                    "reason": "Strong with numbers",
                    "confidence": "0.9",
                    "required_skills": ["SQL", "Excel"]
                },
                {"title": "Web Developer", "requiredSkills": "HTML, CSS, JavaScript"}
            ]
        });
        let recs = coerce_recommendations(&payload);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].confidence, Some(0.9));
        assert_eq!(recs[1].career_title, "Web Developer");
        assert_eq!(recs[1].required_skills, vec!["HTML", "CSS", "JavaScript"]);
        assert_eq!(recs[1].reason, "");
    }

    #[test]
    fn test_coerce_caps_at_three_and_skips_junk() {
        let payload = json!([
            "not a career",
            {"career_title": "A"},
            {"career_title": "B"},
            {},
            {"career_title": "D"}
        ]);
        let recs = coerce_recommendations(&payload);
        let titles: Vec<_> = recs.iter().map(|r| r.career_title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "Unknown"]);
    }

    #[test]
    fn test_coerce_unusable_payload_is_empty() {
        assert!(coerce_recommendations(&json!({})).is_empty());
        assert!(coerce_recommendations(&json!({"recommendations": "none"})).is_empty());
    }

    #[test]
    fn test_confidence_is_omitted_when_absent() {
        let recs = coerce_recommendations(&json!([{"career_title": "A"}]));
        let json = serde_json::to_value(&recs[0]).unwrap();
        assert!(json.get("confidence").is_none());
        assert_eq!(json["required_skills"], json!([]));
    }
}
