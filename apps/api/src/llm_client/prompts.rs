// Shared prompt fragments. Each phase that calls the model keeps its own
// templates in `careers::prompts`; cross-cutting instructions live here.

/// Appended to every prompt: the extractor tolerates prose, but the model is asked not to send any.
pub const JSON_ONLY_INSTRUCTION: &str = "Only return valid JSON. \
    Do NOT include any text outside the JSON value. \
    Do NOT include commentary, explanations or apologies.";
