//! Display-name slugification for output filenames.

use unicode_normalization::UnicodeNormalization;

/// Converts a video display name into a filesystem-safe slug.
///
/// - NFKD-decomposes and drops everything outside ASCII (best-effort
///   transliteration; characters with no ASCII-compatible decomposition
///   are removed, not substituted)
/// - Lowercases
/// - Drops characters that are not alphanumeric, `_`, whitespace, or `-`
/// - Collapses each run of whitespace and/or hyphens into a single `-`
/// - Trims leading/trailing `-` and `_`
///
/// Total function: never fails, returns an empty string for all-non-ASCII
/// input. The output cannot contain path separators.
pub fn slugify(text: &str) -> String {
    let folded: String = text.nfkd().filter(char::is_ascii).collect();
    let lowered = folded.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;
    for c in lowered.chars() {
        if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        }
        // everything else is dropped without ending a hyphen run
    }

    out.trim_matches(|c| c == '-' || c == '_').to_string()
}
