use std::sync::atomic::{AtomicBool, Ordering};

/// Case-insensitive key match: prefix hits first, then substring hits,
/// each group in candidate order. An empty query matches everything.
///
/// Polls `stop` every `check_interval` candidates and once more at the end;
/// returns `None` as soon as it is raised.
pub fn rank(
    query: &str,
    candidates: &[String],
    stop: &AtomicBool,
    check_interval: usize,
) -> Option<Vec<String>> {
    let needle = query.to_lowercase();
    let check_interval = check_interval.max(1);
    let mut prefixed = Vec::new();
    let mut contained = Vec::new();

    for (scanned, candidate) in candidates.iter().enumerate() {
        if scanned % check_interval == 0 && stop.load(Ordering::Relaxed) {
            return None;
        }
        let haystack = candidate.to_lowercase();
        if haystack.starts_with(&needle) {
            prefixed.push(candidate.clone());
        } else if haystack.contains(&needle) {
            contained.push(candidate.clone());
        }
    }

    if stop.load(Ordering::Relaxed) {
        return None;
    }
    prefixed.extend(contained);
    Some(prefixed)
}
