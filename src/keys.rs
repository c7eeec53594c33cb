//! Per-project issue key allocation ("ALPHA-7").
//!
//! Keys are computed as max(existing numeric suffix) + 1 and are never
//! reused. The allocator must run inside the engine's store transaction so
//! the computation and the issue insert commit atomically; two concurrent
//! creations can then never observe the same maximum.

/// Numeric suffix of `key` if it belongs to `project_key`.
/// "ALPHA-12" with project "ALPHA" -> Some(12); foreign prefixes and
/// malformed suffixes are ignored.
pub fn parse_suffix(key: &str, project_key: &str) -> Option<u64> {
    let rest = key.strip_prefix(project_key)?;
    let digits = rest.strip_prefix('-')?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Next key for a project given the keys of its existing issues.
pub fn next_key<'a>(project_key: &str, existing: impl Iterator<Item = &'a str>) -> String {
    let max = existing
        .filter_map(|k| parse_suffix(k, project_key))
        .max()
        .unwrap_or(0);
    format!("{}-{}", project_key, max + 1)
}
