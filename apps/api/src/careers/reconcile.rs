//! Skill-Gap Reconciler: merges the model's resource curation with a
//! deterministic gap computation so every entry stays self-consistent.
//!
//! Flow: partition skills → catalog lookup per missing skill → (skip if nothing
//! is missing) → ask the model to curate → merge, falling back per career or
//! per skill wherever the model's answer is absent or malformed.
//!
//! The model payload is hostile input: only skills in a career's deterministic
//! missing list are ever taken from it.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::careers::catalog::{ResourceCatalog, SkillMatcher};
use crate::careers::models::{
    normalize_skill, CareerCandidate, Curation, FallbackReason, LearningResource, SkillGapEntry,
    SkillMatch,
};
use crate::careers::prompts::SKILLGAP_PROMPT_TEMPLATE;
use crate::errors::AppError;
use crate::llm_client::extract::extract_payload;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::retry::ResilientInvoker;

/// Candidates per skill sent to the model, bounding prompt size.
pub const PROMPT_CANDIDATES_PER_SKILL: usize = 6;
/// Upper bound on resources kept per skill from the model's selection.
pub const MAX_SELECTED_RESOURCES: usize = 3;
/// Resources per skill when the deterministic fallback is used.
pub const FALLBACK_RESOURCES: usize = 2;

/// Message returned to the caller when the curation call fails.
pub const CURATION_FAILED: &str = "Gemini API call failed";

// ────────────────────────────────────────────────────────────────────────────
// Deterministic partition and lookup
// ────────────────────────────────────────────────────────────────────────────

/// Required skills split by the user's possessed set, display casing kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillPartition {
    pub possessed: Vec<String>,
    pub missing: Vec<String>,
}

pub fn normalized_set(skills: &[String]) -> HashSet<String> {
    skills
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Partitions `required` into possessed and missing skills.
///
/// Tokens are trimmed for display; blank tokens are dropped and repeated skills
/// (by normalised form) keep only their first occurrence.
pub fn partition_skills(required: &[String], possessed: &HashSet<String>) -> SkillPartition {
    let mut seen = HashSet::new();
    let mut partition = SkillPartition {
        possessed: Vec::new(),
        missing: Vec::new(),
    };

    for skill in required {
        let display = skill.trim();
        let normalized = normalize_skill(display);
        if normalized.is_empty() || !seen.insert(normalized.clone()) {
            continue;
        }
        if possessed.contains(&normalized) {
            partition.possessed.push(display.to_string());
        } else {
            partition.missing.push(display.to_string());
        }
    }

    partition
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingSkill {
    pub skill: String,
    pub candidates: Vec<LearningResource>,
}

impl MissingSkill {
    fn fallback(&self) -> SkillMatch {
        SkillMatch {
            skill: self.skill.clone(),
            resources: dedup_capped(self.candidates.iter().cloned(), FALLBACK_RESOURCES),
        }
    }
}

/// Deterministic result for one career before the model is consulted.
#[derive(Debug, Clone, PartialEq)]
pub struct CareerGap {
    pub career_title: String,
    pub description: String,
    pub possessed: Vec<String>,
    pub missing: Vec<MissingSkill>,
}

impl CareerGap {
    fn into_entry(self, skill_matches: Vec<SkillMatch>, curation: Curation) -> SkillGapEntry {
        SkillGapEntry {
            career_title: self.career_title,
            description: self.description,
            possessed_skills: self.possessed,
            missing_skills: self.missing.into_iter().map(|m| m.skill).collect(),
            skill_matches,
            curation,
        }
    }

    fn fallback_entry(self, reason: FallbackReason) -> SkillGapEntry {
        let matches = self.missing.iter().map(MissingSkill::fallback).collect();
        self.into_entry(matches, Curation::Fallback(reason))
    }
}

/// Partitions every career against the possessed skills and looks up catalog
/// candidates for each missing skill. Never consults the model.
pub fn compute_gaps(
    possessed_skills: &[String],
    careers: &[CareerCandidate],
    catalog: &ResourceCatalog,
    matcher: &dyn SkillMatcher,
) -> Vec<CareerGap> {
    let possessed = normalized_set(possessed_skills);

    careers
        .iter()
        .map(|career| {
            let partition = partition_skills(&career.required_skills, &possessed);
            let missing = partition
                .missing
                .into_iter()
                .map(|skill| MissingSkill {
                    candidates: catalog.candidates(&skill, matcher),
                    skill,
                })
                .collect();
            CareerGap {
                career_title: career.title.clone(),
                description: career.description.clone(),
                possessed: partition.possessed,
                missing,
            }
        })
        .collect()
}

/// The model is only worth asking when some career is missing something.
pub fn needs_curation(gaps: &[CareerGap]) -> bool {
    gaps.iter().any(|gap| !gap.missing.is_empty())
}

/// Reduced view of the gaps sent to the model.
pub fn curation_payload(gaps: &[CareerGap]) -> Value {
    Value::Array(
        gaps.iter()
            .map(|gap| {
                json!({
                    "career_title": gap.career_title,
                    "skills_missing": gap.missing.iter().map(|m| &m.skill).collect::<Vec<_>>(),
                    "candidates": gap.missing.iter().map(|m| json!({
                        "skill": m.skill,
                        "candidates": m.candidates.iter().take(PROMPT_CANDIDATES_PER_SKILL).collect::<Vec<_>>(),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}

pub fn build_curation_prompt(gaps: &[CareerGap]) -> Result<String, AppError> {
    let payload_json = serde_json::to_string_pretty(&curation_payload(gaps))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize gaps: {e}")))?;

    Ok(SKILLGAP_PROMPT_TEMPLATE
        .replace("{max_selected}", &MAX_SELECTED_RESOURCES.to_string())
        .replace("{payload_json}", &payload_json)
        .replace("{json_only}", JSON_ONLY_INSTRUCTION))
}

// ────────────────────────────────────────────────────────────────────────────
// Merge
// ────────────────────────────────────────────────────────────────────────────

/// Merges an untrusted model payload into the deterministic gaps.
///
/// Per career: no matching title (case-insensitive) or a `skill_match` that is
/// not an array → every skill gets the fallback. Otherwise each missing skill
/// takes the model's selection when one exists for it, else the fallback.
pub fn merge_curation(gaps: Vec<CareerGap>, payload: &Value) -> Vec<SkillGapEntry> {
    let model_entries = payload.as_array().map(Vec::as_slice).unwrap_or_default();

    gaps.into_iter()
        .map(|gap| {
            if gap.missing.is_empty() {
                return gap.into_entry(Vec::new(), Curation::NotNeeded);
            }

            let Some(model_entry) = find_model_entry(model_entries, &gap.career_title) else {
                warn!("No model curation for '{}'; using fallback", gap.career_title);
                return gap.fallback_entry(FallbackReason::NoModelEntry);
            };
            let Some(skill_match) = model_entry.get("skill_match").and_then(Value::as_array)
            else {
                warn!(
                    "Malformed skill_match for '{}'; using fallback",
                    gap.career_title
                );
                return gap.fallback_entry(FallbackReason::MalformedSkillMatch);
            };

            let selections = model_selections(skill_match);
            let mut backfilled = 0;
            let matches = gap
                .missing
                .iter()
                .map(|missing| match selections.get(&normalize_skill(&missing.skill)) {
                    Some(resources) => SkillMatch {
                        skill: missing.skill.clone(),
                        resources: resources.clone(),
                    },
                    None => {
                        backfilled += 1;
                        missing.fallback()
                    }
                })
                .collect();

            if backfilled > 0 {
                warn!(
                    "Model omitted {backfilled} skill(s) for '{}'; backfilled",
                    gap.career_title
                );
            }
            gap.into_entry(matches, Curation::Model { backfilled })
        })
        .collect()
}

fn find_model_entry<'a>(entries: &'a [Value], title: &str) -> Option<&'a Value> {
    let title = title.trim().to_lowercase();
    entries.iter().find(|entry| {
        entry
            .get("career_title")
            .and_then(Value::as_str)
            .is_some_and(|t| t.trim().to_lowercase() == title)
    })
}

/// Usable per-skill selections keyed by normalised skill; first entry per skill wins.
///
/// A skill entry without a string `skill` or an array `selected_resources` is
/// skipped, as is one whose non-empty list held no usable resource. An explicitly
/// empty list is kept.
fn model_selections(skill_match: &[Value]) -> HashMap<String, Vec<LearningResource>> {
    let mut selections = HashMap::new();

    for item in skill_match {
        let Some(skill) = item.get("skill").and_then(Value::as_str) else {
            continue;
        };
        let Some(raw) = item.get("selected_resources").and_then(Value::as_array) else {
            continue;
        };
        let resources = dedup_capped(
            raw.iter().filter_map(LearningResource::from_value),
            MAX_SELECTED_RESOURCES,
        );
        if !raw.is_empty() && resources.is_empty() {
            continue;
        }
        selections
            .entry(normalize_skill(skill))
            .or_insert(resources);
    }

    selections
}

fn dedup_capped<I>(resources: I, cap: usize) -> Vec<LearningResource>
where
    I: Iterator<Item = LearningResource>,
{
    let mut seen = HashSet::new();
    resources
        .filter(|r| seen.insert(r.identity()))
        .take(cap)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the skill-gap pipeline for one request.
///
/// The model is not called when nothing is missing. A failed model call is an
/// error; a malformed model answer is not.
pub async fn analyze_skill_gap(
    llm: &ResilientInvoker,
    catalog: &ResourceCatalog,
    matcher: &dyn SkillMatcher,
    possessed_skills: &[String],
    careers: &[CareerCandidate],
) -> Result<Vec<SkillGapEntry>, AppError> {
    let gaps = compute_gaps(possessed_skills, careers, catalog, matcher);

    if !needs_curation(&gaps) {
        info!("No missing skills across {} careers; skipping model call", gaps.len());
        return Ok(merge_curation(gaps, &Value::Null));
    }

    let prompt = build_curation_prompt(&gaps)?;
    info!("Requesting resource curation for {} careers", gaps.len());

    let response = llm
        .invoke(&prompt)
        .await
        .map_err(AppError::llm(CURATION_FAILED))?;

    let extracted = extract_payload(&response);
    if extracted.outcome.is_degraded() {
        warn!(
            "Curation response unusable ({:?}); all careers fall back",
            extracted.outcome
        );
    }

    let entries = merge_curation(gaps, &extracted.value);
    let (mut unmatched, mut malformed, mut backfilled) = (0, 0, 0);
    for entry in &entries {
        match entry.curation {
            Curation::Fallback(FallbackReason::NoModelEntry) => unmatched += 1,
            Curation::Fallback(FallbackReason::MalformedSkillMatch) => malformed += 1,
            Curation::Model { backfilled: n } => backfilled += n,
            Curation::NotNeeded => {}
        }
    }
    info!(
        "Skill gap reconciled: {} careers ({} unmatched, {} malformed, {} skills backfilled)",
        entries.len(),
        unmatched,
        malformed,
        backfilled
    );

    Ok(entries)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
