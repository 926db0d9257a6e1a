//! Axum route handlers for the career pipeline.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::careers::coerce;
use crate::careers::jobs::{find_jobs, CareerJobs, JobSearchInput};
use crate::careers::models::{CareerCandidate, SkillGapEntry};
use crate::careers::recommend::{recommend_careers, Recommendations};
use crate::careers::reconcile::analyze_skill_gap;
use crate::errors::{ApiJson, AppError};
use crate::state::AppState;

const CATALOG_MISSING: &str = "Resource dataset missing on server.";

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub user_profile: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGapRequest {
    #[serde(default)]
    pub user_skills: Value,
    pub career_recommendations: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsRequest {
    pub user_profile: Option<Value>,
    pub career_recommendations: Option<Value>,
    pub skill_gap_results: Option<Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/recommend
pub async fn handle_recommend(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RecommendRequest>,
) -> Result<Json<Recommendations>, AppError> {
    let profile = request
        .user_profile
        .ok_or_else(|| AppError::Validation("Missing userProfile".to_string()))?;

    let recommendations = recommend_careers(&state.llm, &profile)
        .instrument(info_span!("recommend", request_id = %Uuid::new_v4()))
        .await?;
    Ok(Json(recommendations))
}

/// POST /api/skillgap
///
/// Returns one entry per career; every missing skill carries a `skill_match`
/// even when the model's curation is unusable.
pub async fn handle_skillgap(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SkillGapRequest>,
) -> Result<Json<Vec<SkillGapEntry>>, AppError> {
    let careers = request
        .career_recommendations
        .ok_or_else(|| AppError::Validation("Missing careerRecommendations".to_string()))?;
    let careers = careers.as_array().ok_or_else(|| {
        AppError::Validation("careerRecommendations must be an array".to_string())
    })?;

    let candidates: Vec<CareerCandidate> =
        careers.iter().filter_map(CareerCandidate::from_value).collect();
    if candidates.len() < careers.len() {
        warn!(
            "Skipped {} career entries that were not objects",
            careers.len() - candidates.len()
        );
    }
    let user_skills = coerce::text_list(&request.user_skills);

    let catalog = state
        .catalog
        .as_deref()
        .ok_or_else(|| AppError::Configuration(CATALOG_MISSING.to_string()))?;

    let entries = analyze_skill_gap(
        &state.llm,
        catalog,
        state.matcher.as_ref(),
        &user_skills,
        &candidates,
    )
    .instrument(info_span!("skillgap", request_id = %Uuid::new_v4()))
    .await?;

    Ok(Json(entries))
}

/// POST /api/jobs
pub async fn handle_jobs(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<JobsRequest>,
) -> Result<Json<Vec<CareerJobs>>, AppError> {
    let (Some(profile), Some(recommendations), Some(skill_gaps)) = (
        request.user_profile,
        request.career_recommendations,
        request.skill_gap_results,
    ) else {
        return Err(AppError::Validation(
            "Missing required inputs (userProfile, careerRecommendations, skillGapResults)"
                .to_string(),
        ));
    };

    let input = JobSearchInput {
        profile: &profile,
        recommendations: &recommendations,
        skill_gaps: &skill_gaps,
    };
    let jobs = find_jobs(&state.llm, input)
        .instrument(info_span!("jobs", request_id = %Uuid::new_v4()))
        .await?;
    Ok(Json(jobs))
}
