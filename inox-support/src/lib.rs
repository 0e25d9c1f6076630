use std::borrow::Cow;
use std::fmt;

/// Maximum edit distance for a name to be proposed as a "did you mean" suggestion.
pub const MAX_SUGGESTION_DISTANCE: usize = 2;

fn escape_single_quotes(input: &str) -> Cow<'_, str> {
    if input.contains('\'') {
        Cow::Owned(input.replace('\'', "\\'"))
    } else {
        Cow::Borrowed(input)
    }
}

pub fn quoted(name: &str) -> String {
    format!("'{}'", escape_single_quotes(name))
}

/// Formats `value` the way checker messages refer to a kind of value: `a(n) int`.
pub fn a_or_an(value: impl fmt::Display) -> String {
    format!("a(n) {value}")
}

/// Joins names with a per-name prefix: `join_prefixed(["a", "b"], ".")` gives `.a, .b`.
pub fn join_prefixed<I, S>(names: I, prefix: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| format!("{prefix}{}", name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Returns the candidate closest to `name` when it is within `max_distance` edits.
///
/// Ties are resolved in favor of the candidate that comes first, so callers wanting
/// stable output should pass candidates in a stable order.
pub fn closest_name<'a, I>(name: &str, candidates: I, max_distance: usize) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, usize)> = None;
    for candidate in candidates {
        if candidate == name {
            continue;
        }
        let distance = strsim::levenshtein(name, candidate);
        if distance > max_distance {
            continue;
        }
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Formats a message prefixed by the tool that produced it and the source location.
pub fn located(tool: &str, location: &str, message: impl fmt::Display) -> String {
    if location.is_empty() {
        format!("{tool}: {message}")
    } else {
        format!("{tool}: {location}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_name_respects_threshold() {
        let names = ["name", "count", "items"];
        assert_eq!(closest_name("nme", names, MAX_SUGGESTION_DISTANCE), Some("name"));
        assert_eq!(closest_name("itms", names, MAX_SUGGESTION_DISTANCE), Some("items"));
        assert_eq!(closest_name("zzzzz", names, MAX_SUGGESTION_DISTANCE), None);
    }

    #[test]
    fn closest_name_prefers_first_candidate_on_ties() {
        let names = ["ab", "ac"];
        assert_eq!(closest_name("aa", names, 1), Some("ab"));
    }

    #[test]
    fn quoted_escapes_single_quotes() {
        assert_eq!(quoted("it's"), "'it\\'s'");
        assert_eq!(join_prefixed(["a", "b"], "."), ".a, .b");
        assert_eq!(a_or_an("int"), "a(n) int");
    }

    #[test]
    fn located_omits_empty_location() {
        assert_eq!(located("check", "", "oops"), "check: oops");
        assert_eq!(located("check", "main.ix:1:2", "oops"), "check: main.ix:1:2: oops");
    }
}
