//! Question normalization.

/// Collapse runs of whitespace and trim the ends. This is the text stored on
/// the job.
pub fn normalize_question(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key under which answers are cached: the normalized question, lowercased,
/// without trailing punctuation.
pub fn cache_key(question: &str) -> String {
    normalize_question(question)
        .to_lowercase()
        .trim_end_matches(['?', '!', '.'])
        .trim_end()
        .to_string()
}
