use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::careers::coerce;

/// Normalised form of a skill token: trimmed and case-folded.
/// Used for equality and lookup only, never for display.
pub fn normalize_skill(skill: &str) -> String {
    skill.trim().to_lowercase()
}

/// A career produced by the recommendation phase, passed back in verbatim by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareerCandidate {
    #[serde(rename = "career_title")]
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
}

impl CareerCandidate {
    /// Lenient read of a client-supplied career object.
    /// Accepts `career_title`/`title` and `required_skills`/`requiredSkills`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Some(Self {
            title: coerce::field_text(value, &["career_title", "title"])
                .unwrap_or_else(|| "Unknown".to_string()),
            description: coerce::field_text(value, &["description"]).unwrap_or_default(),
            required_skills: coerce::field_list(value, &["required_skills", "requiredSkills"]),
        })
    }
}

/// A free learning resource from the catalog or picked by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LearningResource {
    /// Coerces one resource from loosely-shaped JSON. Needs at least a name or a link.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let name = coerce::field_text(value, &["name", "title"]).unwrap_or_default();
        let link = coerce::field_text(value, &["link", "url"]).unwrap_or_default();
        if name.is_empty() && link.is_empty() {
            return None;
        }
        Some(Self {
            name,
            platform: coerce::field_text(value, &["platform"]).unwrap_or_default(),
            link,
            level: coerce::field_text(value, &["level"]),
            duration: coerce::field_text(value, &["duration"]),
            notes: coerce::field_text(value, &["notes"]),
        })
    }

    /// De-duplication key: the link, or the name when there is no link.
    pub fn identity(&self) -> String {
        let link = self.link.trim();
        if link.is_empty() {
            format!("name:{}", self.name.trim().to_lowercase())
        } else {
            link.to_string()
        }
    }
}

/// Resources chosen for one missing skill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillMatch {
    pub skill: String,
    #[serde(rename = "selected_resources")]
    pub resources: Vec<LearningResource>,
}

/// Final skill-gap result for one career.
///
/// Invariants: possessed and missing skills are disjoint (normalised), and
/// `skill_matches` holds exactly one entry per missing skill, in the same order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillGapEntry {
    pub career_title: String,
    pub description: String,
    #[serde(rename = "skills_already_possessed")]
    pub possessed_skills: Vec<String>,
    #[serde(rename = "skills_missing")]
    pub missing_skills: Vec<String>,
    #[serde(rename = "skill_match")]
    pub skill_matches: Vec<SkillMatch>,
    /// Where the resource selection came from. Not sent to clients.
    #[serde(skip)]
    pub curation: Curation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curation {
    /// No missing skills, so the model was never asked.
    NotNeeded,
    /// The model's selection was used; `backfilled` skills it omitted got the fallback.
    Model { backfilled: usize },
    /// The model's answer for this career was unusable; every skill got the fallback.
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoModelEntry,
    MalformedSkillMatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_skill() {
        assert_eq!(normalize_skill("  Machine Learning "), "machine learning");
        assert_eq!(normalize_skill("SQL"), normalize_skill("sql"));
    }

    #[test]
    fn test_career_candidate_aliases() {
        let career = CareerCandidate::from_value(&json!({
            "title": "Cloud Engineer",
            "requiredSkills": ["AWS", "Terraform"]
        }))
        .unwrap();
        assert_eq!(career.title, "Cloud Engineer");
        assert_eq!(career.description, "");
        assert_eq!(career.required_skills, vec!["AWS", "Terraform"]);

        let untitled = CareerCandidate::from_value(&json!({"required_skills": []})).unwrap();
        assert_eq!(untitled.title, "Unknown");
        assert!(CareerCandidate::from_value(&json!("Cloud Engineer")).is_none());
    }

    #[test]
    fn test_learning_resource_coercion() {
        let resource = LearningResource::from_value(&json!({
            "name": "Database Management Systems",
            "platform": "NPTEL",
            "link": "https://nptel.ac.in/courses/106105175",
            "duration": 12,
            "level": null
        }))
        .unwrap();
        assert_eq!(resource.duration.as_deref(), Some("12"));
        assert!(resource.level.is_none());

        assert!(LearningResource::from_value(&json!({"platform": "SWAYAM"})).is_none());
        assert!(LearningResource::from_value(&json!("https://swayam.gov.in")).is_none());
    }

    #[test]
    fn test_identity_prefers_link() {
        let with_link = LearningResource::from_value(&json!({"name": "A", "link": " https://x.test/a "})).unwrap();
        assert_eq!(with_link.identity(), "https://x.test/a");
        let without_link = LearningResource::from_value(&json!({"name": "Intro SQL"})).unwrap();
        assert_eq!(without_link.identity(), "name:intro sql");
    }

    #[test]
    fn test_skill_gap_entry_wire_names() {
        let entry = SkillGapEntry {
            career_title: "Data Analyst".to_string(),
            description: "Turns data into decisions".to_string(),
            possessed_skills: vec!["Python".to_string()],
            missing_skills: vec!["SQL".to_string()],
            skill_matches: vec![SkillMatch {
                skill: "SQL".to_string(),
                resources: vec![],
            }],
            curation: Curation::Fallback(FallbackReason::NoModelEntry),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            json!({
                "career_title": "Data Analyst",
                "description": "Turns data into decisions",
                "skills_already_possessed": ["Python"],
                "skills_missing": ["SQL"],
                "skill_match": [{"skill": "SQL", "selected_resources": []}]
            })
        );
    }
}
