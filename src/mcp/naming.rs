//! Unique name generation.
//!
//! Names collide case-insensitively. A clashing name gets a `" (k)"` suffix
//! with the smallest `k >= 1` whose candidate is free.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// Upper bound on suffix attempts before falling back to a timestamp suffix.
///
/// Only reachable when the taken set is at least this large: among
/// `(1)..=(n + 1)` at least one candidate is free for a set of `n` names.
pub const MAX_SUFFIX_ATTEMPTS: usize = 100_000;

/// Lowercased key used for name comparisons.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Collect the comparison keys of a set of names.
pub fn taken_names<'a, I>(names: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().map(name_key).collect()
}

/// Return `desired` if no taken name matches it, otherwise the first free
/// `"{desired} (k)"`.
///
/// `taken` must hold keys produced by [`name_key`]. `now` only feeds the
/// timestamp suffix used past [`MAX_SUFFIX_ATTEMPTS`].
pub fn resolve_unique_name(
    desired: &str,
    taken: &HashSet<String>,
    now: DateTime<Utc>,
) -> String {
    resolve_with_ceiling(desired, taken, now, MAX_SUFFIX_ATTEMPTS)
}

fn resolve_with_ceiling(
    desired: &str,
    taken: &HashSet<String>,
    now: DateTime<Utc>,
    ceiling: usize,
) -> String {
    let desired = desired.trim();
    if !taken.contains(&name_key(desired)) {
        return desired.to_string();
    }

    let limit = taken.len().saturating_add(1).min(ceiling);
    for k in 1..=limit {
        let candidate = format!("{} ({})", desired, k);
        if !taken.contains(&name_key(&candidate)) {
            return candidate;
        }
    }

    tracing::warn!(
        name = desired,
        taken = taken.len(),
        "Unique name search hit its ceiling, using timestamp suffix"
    );
    let stamp = now.format("%Y%m%d%H%M%S%3f").to_string();
    let candidate = format!("{} ({})", desired, stamp);
    if !taken.contains(&name_key(&candidate)) {
        return candidate;
    }
    format!("{} ({}-{})", desired, stamp, taken.len())
}

/// Name for a copy of `source`.
///
/// A copy of a copy (`"Files (2)"`) is numbered from the original
/// (`"Files (3)"`) while that original name is still taken. Otherwise the
/// numeric tail is part of the name itself (`"Node (18)"`) and the copy
/// becomes `"Node (18) (1)"`.
pub fn copy_name(source: &str, taken: &HashSet<String>, now: DateTime<Utc>) -> String {
    let source = source.trim();
    let base = base_name(source);
    let seed = if base != source && taken.contains(&name_key(base)) {
        base
    } else {
        source
    };
    resolve_unique_name(seed, taken, now)
}

/// Strip a trailing `" (k)"` disambiguation suffix, if any.
///
/// `"Files (2)"` becomes `"Files"`; `"Files (beta)"` is left alone.
pub fn base_name(name: &str) -> &str {
    let trimmed = name.trim_end();
    let Some(stripped) = trimmed.strip_suffix(')') else {
        return trimmed;
    };
    let Some(open) = stripped.rfind(" (") else {
        return trimmed;
    };
    let digits = &stripped[open + 2..];
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && open > 0 {
        &trimmed[..open]
    } else {
        trimmed
    }
}
