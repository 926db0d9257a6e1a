//! Job listing phase: profile, careers and skill gaps in, listings per career out.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::careers::coerce;
use crate::careers::prompts::JOBS_PROMPT_TEMPLATE;
use crate::errors::AppError;
use crate::llm_client::extract::extract_payload;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::retry::ResilientInvoker;

pub const JOBS_FAILED: &str = "Job recommendation failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobListing {
    pub job_title: String,
    pub company_name: String,
    pub salary_range: String,
    pub skill_match_score: String,
    pub apply_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareerJobs {
    pub career_title: String,
    pub job_listings: Vec<JobListing>,
}

pub struct JobSearchInput<'a> {
    pub profile: &'a Value,
    pub recommendations: &'a Value,
    pub skill_gaps: &'a Value,
}

pub async fn find_jobs(
    llm: &ResilientInvoker,
    input: JobSearchInput<'_>,
) -> Result<Vec<CareerJobs>, AppError> {
    let prompt = JOBS_PROMPT_TEMPLATE
        .replace("{profile_json}", &pretty(input.profile)?)
        .replace("{recommendations_json}", &pretty(input.recommendations)?)
        .replace("{skillgap_json}", &pretty(input.skill_gaps)?)
        .replace("{json_only}", JSON_ONLY_INSTRUCTION);

    let response = llm
        .invoke(&prompt)
        .await
        .map_err(AppError::llm(JOBS_FAILED))?;

    let extracted = extract_payload(&response);
    if extracted.outcome.is_degraded() {
        warn!("Job listing response unusable ({:?})", extracted.outcome);
    }

    let jobs = coerce_job_results(&extracted.value);
    info!(
        "Parsed job listings for {} careers ({} listings)",
        jobs.len(),
        jobs.iter().map(|j| j.job_listings.len()).sum::<usize>()
    );
    Ok(jobs)
}

fn pretty(value: &Value) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize job input: {e}")))
}

/// Reads the model's job payload. Accepts a bare array, a single career object,
/// or an object wrapping the array under its first array-valued field.
pub fn coerce_job_results(payload: &Value) -> Vec<CareerJobs> {
    let single;
    let items: &[Value] = match payload {
        Value::Array(items) => items,
        Value::Object(map) if map.contains_key("career_title") => {
            single = [payload.clone()];
            &single
        }
        Value::Object(map) => map
            .values()
            .find_map(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| CareerJobs {
            career_title: coerce::field_text(item, &["career_title", "title"])
                .unwrap_or_else(|| "Unknown".to_string()),
            job_listings: item
                .get("job_listings")
                .and_then(Value::as_array)
                .map(|listings| listings.iter().filter_map(coerce_listing).collect())
                .unwrap_or_default(),
        })
        .collect()
}

fn coerce_listing(value: &Value) -> Option<JobListing> {
    let job_title = coerce::field_text(value, &["job_title", "title"])?;
    let field = |keys: &[&str]| coerce::field_text(value, keys).unwrap_or_default();
    Some(JobListing {
        job_title,
        company_name: field(&["company_name", "company"]),
        salary_range: field(&["salary_range", "salary"]),
        skill_match_score: field(&["skill_match_score"]),
        apply_link: field(&["apply_link", "link", "url"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_array_of_careers() {
        let payload = json!([{
            "career_title": "Data Analyst",
            "job_listings": [
                {
                    "job_title": "Junior Data Analyst",
                    "company_name": "Acme",
                    "salary_range": "4-6 LPA",
                    "skill_match_score": 85,
                    "apply_link": "https://jobs.test/1"
                },
                {"company_name": "No Title Inc"},
                "junk"
            ]
        }]);
        let jobs = coerce_job_results(&payload);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_listings.len(), 1);
        assert_eq!(jobs[0].job_listings[0].skill_match_score, "85");
    }

    #[test]
    fn test_coerce_single_object_and_wrapped_array() {
        let single = json!({"career_title": "QA Engineer", "job_listings": []});
        assert_eq!(coerce_job_results(&single)[0].career_title, "QA Engineer");

        let wrapped = json!({"results": [{"career_title": "DevOps", "job_listings": "none"}]});
        let jobs = coerce_job_results(&wrapped);
        assert_eq!(jobs[0].career_title, "DevOps");
        assert!(jobs[0].job_listings.is_empty());
    }

    #[test]
    fn test_coerce_unusable_payload_is_empty() {
        assert!(coerce_job_results(&json!({})).is_empty());
        assert!(coerce_job_results(&json!("jobs")).is_empty());
    }
}
