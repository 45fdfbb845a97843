/// Split text into lowercase terms.
///
/// Any non-alphanumeric character separates terms, so `"Alex's"` yields
/// `["alex", "s"]`. Queries and documents must go through this same function.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}
