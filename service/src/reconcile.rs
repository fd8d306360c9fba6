//! Matching of locally stored tournament names against the event the feed is
//! currently reporting. Every write of feed data onto a tournament goes through
//! [`matches`] first.

const SPONSOR_SUFFIXES: [&str; 2] = [" presented by mastercard", " pga tour"];

pub fn normalize(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut normalized = lowered
        .strip_prefix("the ")
        .map(str::to_string)
        .unwrap_or(lowered);
    for suffix in SPONSOR_SUFFIXES {
        normalized = normalized.replace(suffix, "");
    }
    normalized.trim().to_string()
}

/// True when both names refer to the same event: equal after normalisation, or
/// one contained in the other. A blank name on either side never matches.
pub fn matches(local_name: &str, feed_name: &str) -> bool {
    let local = normalize(local_name);
    let feed = normalize(feed_name);
    if local.is_empty() || feed.is_empty() {
        return false;
    }
    local == feed || local.contains(&feed) || feed.contains(&local)
}

/// Checks every name a tournament is known by.
pub fn matches_any<'a>(mut local_names: impl Iterator<Item = &'a str>, feed_name: &str) -> bool {
    local_names.any(|name| matches(name, feed_name))
}
