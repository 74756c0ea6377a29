//! Show title normalization and comparison

/// Turn a raw show token from a filename into a catalog search query.
///
/// Dots become spaces, whitespace is collapsed, and separators left hanging
/// at either end by a lazy capture (`"the.wire."`, `"show -"`) are trimmed.
pub fn normalize_show_title(token: &str) -> String {
    token
        .replace('.', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == ' ' || c == '-' || c == '_')
        .to_string()
}

/// Similarity between a search query and a catalog title (0.0 to 1.0)
pub fn title_similarity(query: &str, title: &str) -> f64 {
    strsim::normalized_levenshtein(&query.to_lowercase(), &title.to_lowercase())
}
