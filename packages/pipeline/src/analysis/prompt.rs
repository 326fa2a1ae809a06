use crate::analysis::types::AnalysisRequest;

const SYSTEM_ANALYSIS: &str = include_str!("../../prompts/system_analysis.txt");
const ANALYSIS_SCHEMA: &str = include_str!("../../prompts/analysis_schema.txt");

/// Build the system prompt for contract analysis.
pub fn build_system_prompt() -> &'static str {
    SYSTEM_ANALYSIS
}

/// Keep the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the user prompt for analyzing a single contract.
///
/// The contract text is cut to its first `max_chars` characters so the
/// request size stays bounded.
pub fn build_analysis_prompt(request: &AnalysisRequest, max_chars: usize) -> String {
    let contract_text = truncate_chars(&request.contract_text, max_chars);

    let mut prompt = String::new();

    prompt.push_str(
        "Analyze the following contract and provide a comprehensive risk analysis in JSON format.\n\n",
    );
    prompt.push_str(&format!("Contract Title: {}\n\n", request.document_title));
    prompt.push_str("Contract Text:\n");
    prompt.push_str(contract_text);
    if contract_text.len() < request.contract_text.len() {
        prompt.push_str("\n[... contract text truncated ...]");
    }
    prompt.push_str("\n\n");

    prompt.push_str("Provide your analysis in the following JSON structure:\n");
    prompt.push_str(ANALYSIS_SCHEMA);
    prompt.push('\n');

    prompt.push_str(
        "Important:\n\
         - Focus on identifying risky, unfair, or unusual clauses\n\
         - Explain everything in plain, simple English\n\
         - Provide actionable suggestions\n\
         - Include exactly one riskMetrics entry per category\n\
         - Use only the enum values listed above\n\
         - Return ONLY the JSON object. No markdown fences, comments, or explanations.",
    );

    prompt
}
