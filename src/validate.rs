//! Input validation run before any table write.
//!
//! Priorities resolve in three tiers: exact match → synonym lookup → error
//! with the closest suggestion. Text fields are trimmed and must be
//! non-empty; labels are trimmed and deduplicated.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::Priority;

// ── Valid value sets (O(1) lookups) ──────────────────────────

pub static VALID_PRIORITIES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["low", "medium", "high"].into_iter().collect());

// ── Synonym maps ─────────────────────────────────────────────

pub static PRIORITY_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("critical", "high"),
        ("crit", "high"),
        ("urgent", "high"),
        ("highest", "high"),
        ("important", "high"),
        ("p1", "high"),
        ("normal", "medium"),
        ("default", "medium"),
        ("med", "medium"),
        ("p2", "medium"),
        ("minor", "low"),
        ("lowest", "low"),
        ("trivial", "low"),
        ("p3", "low"),
    ]
    .into_iter()
    .collect()
});

/// Normalize a priority string via exact match or synonym lookup.
///
/// # Errors
///
/// Returns `InvalidPriority` (with a suggestion when one is close) for
/// anything else.
pub fn normalize_priority(input: &str) -> Result<Priority> {
    let lower = input.trim().to_lowercase();

    let canonical = if VALID_PRIORITIES.contains(lower.as_str()) {
        Some(lower.as_str())
    } else {
        PRIORITY_SYNONYMS.get(lower.as_str()).copied()
    };

    match canonical {
        Some("low") => Ok(Priority::Low),
        Some("medium") => Ok(Priority::Medium),
        Some("high") => Ok(Priority::High),
        _ => Err(Error::InvalidPriority {
            input: input.to_string(),
            suggestion: find_closest_match(&lower, &VALID_PRIORITIES, &PRIORITY_SYNONYMS),
        }),
    }
}

/// Trim `value` and require it to be non-empty.
///
/// # Errors
///
/// Returns `RequiredField` naming `field` when the trimmed value is empty.
pub fn require_text(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::RequiredField { field });
    }
    Ok(trimmed.to_string())
}

/// Require a completion percentage in `0..=100`.
///
/// # Errors
///
/// Returns `Validation` for values above 100.
pub fn validate_percent(percent: u8) -> Result<u8> {
    if percent > 100 {
        return Err(Error::Validation(format!(
            "percent_complete must be 0-100, got {percent}"
        )));
    }
    Ok(percent)
}

/// Trim labels, drop empty ones and remove duplicates (first wins).
#[must_use]
pub fn normalize_labels<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .filter_map(|label| {
            let trimmed = label.as_ref().trim();
            (!trimmed.is_empty() && seen.insert(trimmed.to_lowercase()))
                .then(|| trimmed.to_string())
        })
        .collect()
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, best_dist)| dist < best_dist) {
            // For synonyms, show what it maps to
            let shown = synonyms.get(v).copied().unwrap_or(v);
            best = Some((shown, dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
