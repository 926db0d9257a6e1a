//! Resource catalog: static map from skill key to free learning resources.
//!
//! Loaded once at startup and shared read-only behind an `Arc`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::careers::models::{normalize_skill, LearningResource};

/// Decides whether a catalog key is close enough to a missing skill.
/// Both arguments arrive normalised.
pub trait SkillMatcher: Send + Sync {
    fn matches(&self, catalog_key: &str, skill: &str) -> bool;
}

/// Either string contains the other. Short keys over-match ("c" hits "c++" and "c#").
pub struct SubstringMatcher;

impl SkillMatcher for SubstringMatcher {
    fn matches(&self, catalog_key: &str, skill: &str) -> bool {
        catalog_key.contains(skill) || skill.contains(catalog_key)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    skills: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    skills: BTreeMap<String, Vec<LearningResource>>,
    loaded_at: DateTime<Utc>,
}

impl ResourceCatalog {
    /// Builds a catalog, normalising keys. Keys that collide after
    /// normalisation have their resources concatenated; blank keys are dropped.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<LearningResource>)>,
    {
        let mut skills: BTreeMap<String, Vec<LearningResource>> = BTreeMap::new();
        for (key, resources) in entries {
            let key = normalize_skill(&key);
            if key.is_empty() {
                continue;
            }
            skills.entry(key).or_default().extend(resources);
        }
        Self {
            skills,
            loaded_at: Utc::now(),
        }
    }

    /// Parses `{"skills": {...}}`. Only a syntax or top-level shape error fails;
    /// entries are coerced one by one and unusable ones are skipped.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(raw).context("Resource catalog is not valid JSON")?;

        let entries = file.skills.into_iter().map(|(key, raw_resources)| {
            let total = raw_resources.len();
            let resources: Vec<LearningResource> = raw_resources
                .iter()
                .filter_map(LearningResource::from_value)
                .collect();
            if resources.len() < total {
                warn!(
                    "Skipped {} unusable catalog entries under '{}'",
                    total - resources.len(),
                    key
                );
            }
            (key, resources)
        });
        Ok(Self::from_entries(entries))
    }

    /// Reads the catalog file. A missing file is `Ok(None)`; the skill-gap
    /// endpoint reports it per request. Unreadable or malformed files are errors.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            warn!("Resource catalog not found at {}", path.display());
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read resource catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&raw)
            .with_context(|| format!("Failed to load resource catalog {}", path.display()))?;
        info!(
            "Resource catalog loaded: {} skills from {}",
            catalog.len(),
            path.display()
        );
        Ok(Some(catalog))
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Candidate resources for a skill: the exact (normalised) key if it has any,
    /// otherwise the union of every key the matcher accepts, de-duplicated.
    pub fn candidates(&self, skill: &str, matcher: &dyn SkillMatcher) -> Vec<LearningResource> {
        let skill = normalize_skill(skill);
        if let Some(direct) = self.skills.get(&skill).filter(|r| !r.is_empty()) {
            return direct.clone();
        }

        let mut seen = HashSet::new();
        self.skills
            .iter()
            .filter(|(key, _)| matcher.matches(key, &skill))
            .flat_map(|(_, resources)| resources.iter())
            .filter(|resource| seen.insert(resource.identity()))
            .cloned()
            .collect()
    }
}
