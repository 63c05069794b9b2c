// src/matcher.rs
//! Keyword matcher: case-insensitive substring test, first configured keyword wins.

/// Returns the first keyword (in configured order) contained in `text`, ignoring case.
/// Blank keywords never match.
pub fn match_keyword<'a, S: AsRef<str>>(text: &str, keywords: &'a [S]) -> Option<&'a str> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .map(AsRef::as_ref)
        .filter(|kw| !kw.trim().is_empty())
        .find(|kw| haystack.contains(&kw.to_lowercase()))
}
