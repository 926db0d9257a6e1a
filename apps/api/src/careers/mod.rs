// Career guidance pipeline: recommendations, skill-gap reconciliation, job listings.
// Model calls go through llm_client, never a provider SDK directly.

pub mod catalog;
pub mod coerce;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod prompts;
pub mod recommend;
pub mod reconcile;
