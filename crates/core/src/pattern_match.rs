//! SQL LIKE pattern matching used by query filters.
//!
//! Two wildcards are supported:
//! - `%` matches zero or more characters
//! - `_` matches exactly one character
//!
//! [`like`] is case-sensitive and operates on Unicode scalar values.
//! [`ilike`] folds ASCII letters before comparing, which is what an
//! interactive search box wants.

use alloc::vec::Vec;

/// SQL LIKE pattern matching.
///
/// ```
/// use stagehand_core::pattern_match::like;
/// assert!(like("hello", "h%o"));
/// assert!(like("hello", "_ello"));
/// assert!(!like("hello", "world"));
/// ```
pub fn like(value: &str, pattern: &str) -> bool {
    let v: Vec<char> = value.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    like_chars(&v, &p)
}

/// Case-insensitive (ASCII) LIKE.
///
/// ```
/// use stagehand_core::pattern_match::ilike;
/// assert!(ilike("Bouke Beumer", "%bouke%"));
/// ```
pub fn ilike(value: &str, pattern: &str) -> bool {
    let v: Vec<char> = value.chars().map(|c| c.to_ascii_lowercase()).collect();
    let p: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    like_chars(&v, &p)
}

/// Wraps `text` as a "contains" pattern: `%text%`.
pub fn contains_pattern(text: &str) -> alloc::string::String {
    alloc::format!("%{}%", text)
}

fn like_chars(v: &[char], p: &[char]) -> bool {
    like_recursive(v, p, 0, 0)
}

fn like_recursive(v: &[char], p: &[char], vi: usize, pi: usize) -> bool {
    if pi == p.len() {
        return vi == v.len();
    }
    match p[pi] {
        '%' => {
            // collapse runs of %
            if pi + 1 < p.len() && p[pi + 1] == '%' {
                return like_recursive(v, p, vi, pi + 1);
            }
            (vi..=v.len()).any(|skip| like_recursive(v, p, skip, pi + 1))
        }
        '_' => vi < v.len() && like_recursive(v, p, vi + 1, pi + 1),
        ch => vi < v.len() && v[vi] == ch && like_recursive(v, p, vi + 1, pi + 1),
    }
}
