use crate::config::SummarizationConfig;

/// Instruction the summarizer runs under when no override is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes and extracts action points.";

/// Resolve the system prompt: the configured override, or the built-in
/// default when the config leaves it empty.
pub fn system_prompt(config: &SummarizationConfig) -> &str {
    let configured = config.system_prompt.trim();
    if configured.is_empty() {
        DEFAULT_SYSTEM_PROMPT
    } else {
        configured
    }
}

/// Wrap the consolidated transcript in the fixed summarization request.
pub fn build_user_prompt(consolidated: &str) -> String {
    format!(
        "Here is a set of transcriptions from various voice notes. Please provide a \
         summary of the key points, and list actionable items.\n\n\
         Transcriptions:\n{consolidated}"
    )
}
