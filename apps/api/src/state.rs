use std::sync::Arc;

use crate::careers::catalog::{ResourceCatalog, SkillMatcher};
use crate::llm_client::retry::ResilientInvoker;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only for the lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    pub llm: ResilientInvoker,
    /// `None` when the catalog file was absent at startup; skill-gap requests then fail.
    pub catalog: Option<Arc<ResourceCatalog>>,
    /// Fuzzy lookup strategy for skills with no exact catalog key.
    pub matcher: Arc<dyn SkillMatcher>,
}
