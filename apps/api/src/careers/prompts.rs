// Prompt templates for the three career phases.
// Placeholders are filled with `str::replace`; `{json_only}` takes
// `llm_client::prompts::JSON_ONLY_INSTRUCTION`.

/// Career recommendation prompt. Replace: {profile_json}, {max_recommendations}, {json_only}
pub const RECOMMEND_PROMPT_TEMPLATE: &str = r#"You are an assistant that suggests up to {max_recommendations} career paths for a user.
User profile:
{profile_json}

Return a JSON object with key "recommendations" containing an array of:
{
  "career_title": "...",
  "description": "...",
  "reason": "...",
  "confidence": 0.0,
  "required_skills": ["skill1", "skill2", "..."]
}

{json_only}"#;

/// Resource curation prompt. Replace: {max_selected}, {payload_json}, {json_only}
pub const SKILLGAP_PROMPT_TEMPLATE: &str = r#"You are an assistant that, given a list of missing skills and a list of candidate free learning resources
(from SWAYAM, NPTEL, DIKSHA), chooses up to {max_selected} best resources per missing skill. Be concise.

Input (array):
{payload_json}

For each career entry, return:
{
  "career_title": "...",
  "skill_match": [
    {
      "skill": "SQL",
      "selected_resources": [
         {"name": "...", "platform": "...", "link": "...", "level": "...", "duration": "...", "notes": "..."}
      ]
    }
  ]
}

Return a JSON array with one entry per career, using the career titles and skills exactly as given.
{json_only}"#;

/// Job listing prompt. Replace: {profile_json}, {recommendations_json}, {skillgap_json}, {json_only}
pub const JOBS_PROMPT_TEMPLATE: &str = r#"You are an AI career assistant helping a student or professional find relevant jobs and internships.

User Profile:
{profile_json}

Career Recommendations (from previous AI step):
{recommendations_json}

Skill Gap Results:
{skillgap_json}

Find internship and job openings for these particular job roles.
Prefer postings from LinkedIn, Naukri, AICTE, and Internshala.

Return a JSON array with each entry formatted as:
{
  "career_title": "...",
  "job_listings": [
    {
      "job_title": "...",
      "company_name": "...",
      "salary_range": "...",
      "skill_match_score": "90%",
      "apply_link": "https://..."
    }
  ]
}

{json_only}"#;
